//! Catalog introspection: table names, column structure, enum expansion.
//!
//! All queries go against `information_schema` / `pg_catalog`; the only
//! read of user data is the `LIMIT 1` sample row per described table.

use std::collections::HashSet;

use serde::Serialize;

use crate::query::row_to_json;
use crate::{DbError, DbHandle};

/// Table names never reported to the model, regardless of schema.
pub const TABLE_DENYLIST: &[&str] = &[
    "SequelizeMeta",
    "property_v2",
    "raw_properties",
    "property_data",
    "urls",
    "graph_data",
    "new_timeseries_data",
];

const LIST_TABLES_SQL: &str = "SELECT table_name \
     FROM information_schema.tables \
     WHERE table_schema NOT IN ('pg_catalog', 'information_schema') \
       AND table_name <> ALL($1)";

const COLUMNS_SQL: &str = "SELECT column_name, data_type, is_nullable, column_default, udt_name \
     FROM information_schema.columns \
     WHERE table_schema = $1 AND table_name = $2 \
     ORDER BY ordinal_position";

const ENUM_LABELS_SQL: &str = "SELECT e.enumlabel \
     FROM pg_type t \
     JOIN pg_enum e ON t.oid = e.enumtypid \
     WHERE t.typname = $1 \
     ORDER BY e.enumsortorder";

#[derive(Debug, Clone, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub nullable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableStructure {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample: Option<serde_json::Value>,
}

/// List user table names, excluding system schemas and the denylist.
pub async fn list_tables(handle: &DbHandle) -> Result<Vec<String>, DbError> {
    let client = handle.connect().await?;

    let denylist: Vec<String> = TABLE_DENYLIST.iter().map(|s| s.to_string()).collect();
    let rows = client
        .query(LIST_TABLES_SQL, &[&denylist])
        .await
        .map_err(|e| DbError::Query(e.to_string()))?;

    Ok(rows.iter().map(|row| row.get(0)).collect())
}

/// Describe the named tables: columns, one sample row, enum label sets.
///
/// Names may be schema-qualified (`schema.table`); bare names default to
/// `public`. A failure on any table aborts the whole call.
pub async fn describe_tables(
    handle: &DbHandle,
    names: &[String],
) -> Result<Vec<TableStructure>, DbError> {
    let client = handle.connect().await?;

    let mut tables = Vec::with_capacity(names.len());
    let mut enum_udts: HashSet<String> = HashSet::new();
    // (table index, column index, udt name) for enum columns to fill in.
    let mut enum_slots: Vec<(usize, usize, String)> = Vec::new();

    for name in names {
        let (schema, table) = split_qualified(name);

        let column_rows = client
            .query(COLUMNS_SQL, &[&schema, &table])
            .await
            .map_err(|e| DbError::Query(e.to_string()))?;

        let mut columns = Vec::with_capacity(column_rows.len());
        for row in &column_rows {
            let data_type: String = row.get(1);
            let udt_name: String = row.get(4);
            let data_type = if data_type == "USER-DEFINED" {
                let rendered = format!("enum({udt_name})");
                enum_udts.insert(udt_name.clone());
                enum_slots.push((tables.len(), columns.len(), udt_name));
                rendered
            } else {
                data_type
            };
            columns.push(ColumnInfo {
                name: row.get(0),
                data_type,
                nullable: row.get::<_, String>(2) == "YES",
                default: row.get(3),
                enum_values: None,
            });
        }

        let sample_sql = format!(
            "SELECT * FROM {}.{} LIMIT 1",
            quote_ident(&schema),
            quote_ident(&table)
        );
        let sample_rows = client
            .query(&sample_sql, &[])
            .await
            .map_err(|e| DbError::Query(e.to_string()))?;
        let sample = sample_rows.first().map(row_to_json);

        tables.push(TableStructure {
            name: name.clone(),
            columns,
            sample,
        });
    }

    // Resolve each user-defined type once, then attach labels to the
    // columns that reference it.
    for udt in &enum_udts {
        let label_rows = client
            .query(ENUM_LABELS_SQL, &[udt])
            .await
            .map_err(|e| DbError::Query(e.to_string()))?;
        let labels: Vec<String> = label_rows.iter().map(|row| row.get(0)).collect();

        for (table_idx, column_idx, slot_udt) in &enum_slots {
            if slot_udt == udt {
                tables[*table_idx].columns[*column_idx].enum_values = Some(labels.clone());
            }
        }
    }

    Ok(tables)
}

/// Split an optionally schema-qualified table name, defaulting to `public`.
fn split_qualified(name: &str) -> (String, String) {
    match name.split_once('.') {
        Some((schema, table)) if !table.is_empty() => (schema.to_string(), table.to_string()),
        _ => ("public".to_string(), name.to_string()),
    }
}

/// Double-quote an identifier, doubling any embedded quotes.
fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_excludes_system_schemas_and_denylist() {
        assert!(LIST_TABLES_SQL.contains("NOT IN ('pg_catalog', 'information_schema')"));
        assert!(LIST_TABLES_SQL.contains("table_name <> ALL($1)"));
        assert!(TABLE_DENYLIST.contains(&"SequelizeMeta"));
    }

    #[test]
    fn split_qualified_defaults_to_public() {
        assert_eq!(
            split_qualified("User"),
            ("public".to_string(), "User".to_string())
        );
        assert_eq!(
            split_qualified("auth.sessions"),
            ("auth".to_string(), "sessions".to_string())
        );
        // A trailing dot is not a qualification.
        assert_eq!(
            split_qualified("weird."),
            ("public".to_string(), "weird.".to_string())
        );
    }

    #[test]
    fn quote_ident_doubles_embedded_quotes() {
        assert_eq!(quote_ident("User"), "\"User\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn structure_serializes_enum_labels() {
        let structure = TableStructure {
            name: "User".into(),
            columns: vec![ColumnInfo {
                name: "status".into(),
                data_type: "enum(user_status)".into(),
                nullable: false,
                default: None,
                enum_values: Some(vec!["active".into(), "banned".into()]),
            }],
            sample: None,
        };
        let json = serde_json::to_value(&structure).unwrap();
        assert_eq!(json["columns"][0]["type"], "enum(user_status)");
        assert_eq!(json["columns"][0]["enum_values"][1], "banned");
        assert!(json["columns"][0].get("default").is_none());
        assert!(json.get("sample").is_none());
    }
}
