//! Postgres-backed tool registries, one per phase.
//!
//! Every handler opens its own scoped connection through `DbHandle`; the
//! database URL travels as a tool argument, extracted by the model from
//! the request text.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use querypilot_ai::ToolDefinition;
use querypilot_db::{self as db, DbError, DbHandle};

use crate::registry::ToolRegistry;
use crate::AgentError;

fn parse_args<T: DeserializeOwned>(tool: &'static str, args: Value) -> Result<T, AgentError> {
    serde_json::from_value(args).map_err(|e| AgentError::InvalidArguments {
        tool: tool.to_string(),
        message: e.to_string(),
    })
}

#[derive(Debug, Deserialize)]
struct TableNamesArgs {
    db_url: String,
}

#[derive(Debug, Deserialize)]
struct TableStructureArgs {
    db_url: String,
    required_tables: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct QueryArgs {
    db_url: String,
    query: String,
}

/// Phase 1 tool set: `get_table_names`.
pub fn table_names_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(
        ToolDefinition {
            name: "get_table_names".into(),
            description: "Get the list of table names from the database.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "db_url": {
                        "type": "string",
                        "description": "Database URL"
                    }
                },
                "required": ["db_url"]
            }),
        },
        Arc::new(|args| {
            Box::pin(async move {
                let args: TableNamesArgs = parse_args("get_table_names", args)?;
                let handle = DbHandle::new(args.db_url);
                let tables = db::list_tables(&handle).await?;
                Ok(serde_json::to_string(&tables).unwrap_or_default())
            })
        }),
    );
    registry
}

/// Phase 2 tool set: `get_table_structure`.
pub fn table_structure_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(
        ToolDefinition {
            name: "get_table_structure".into(),
            description: "Get the structure of specified tables from the database.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "db_url": {
                        "type": "string",
                        "description": "Database URL"
                    },
                    "required_tables": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Array of schema-qualified table names"
                    }
                },
                "required": ["db_url", "required_tables"]
            }),
        },
        Arc::new(|args| {
            Box::pin(async move {
                let args: TableStructureArgs = parse_args("get_table_structure", args)?;
                let handle = DbHandle::new(args.db_url);
                let structures = db::describe_tables(&handle, &args.required_tables).await?;
                Ok(serde_json::to_string(&structures).unwrap_or_default())
            })
        }),
    );
    registry
}

/// Phase 3 tool set: `query`.
///
/// Execution failures come back as a string result so the model sees the
/// error; connection failures still abort the request.
pub fn query_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(
        ToolDefinition {
            name: "query".into(),
            description: "Execute a postgres query and get the results or data.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "db_url": {
                        "type": "string",
                        "description": "Database URL"
                    },
                    "query": {
                        "type": "string",
                        "description": "Postgres query to execute against the database"
                    }
                },
                "required": ["db_url", "query"]
            }),
        },
        Arc::new(|args| {
            Box::pin(async move {
                let args: QueryArgs = parse_args("query", args)?;
                let handle = DbHandle::new(args.db_url);
                match db::run_query(&handle, &args.query).await {
                    Ok(rows) => Ok(serde_json::to_string_pretty(&rows).unwrap_or_default()),
                    Err(DbError::Query(message)) => {
                        Ok(format!("Error executing query: {message}"))
                    }
                    Err(other) => Err(other.into()),
                }
            })
        }),
    );
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registries_declare_their_single_tool() {
        assert_eq!(table_names_registry().definitions()[0].name, "get_table_names");
        assert_eq!(
            table_structure_registry().definitions()[0].name,
            "get_table_structure"
        );
        assert_eq!(query_registry().definitions()[0].name, "query");
    }

    #[test]
    fn argument_schemas_require_the_db_url() {
        for registry in [
            table_names_registry(),
            table_structure_registry(),
            query_registry(),
        ] {
            let definition = &registry.definitions()[0];
            let required = definition.parameters["required"].as_array().unwrap();
            assert!(required.iter().any(|v| v == "db_url"));
        }
    }

    #[test]
    fn bad_arguments_are_rejected_with_the_tool_name() {
        let err = parse_args::<QueryArgs>("query", json!({"db_url": "x"})).unwrap_err();
        match err {
            AgentError::InvalidArguments { tool, message } => {
                assert_eq!(tool, "query");
                assert!(message.contains("query"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
