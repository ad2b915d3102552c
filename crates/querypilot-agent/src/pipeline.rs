//! The full request pipeline: discovery phases, SQL synthesis, execution.
//!
//! One pipeline instance is built at process start with its client and
//! tool registries injected; each `run` is independent and shares no
//! mutable state with any other.

use std::sync::Arc;

use querypilot_ai::{prompts, ChatClient, Gateway, Message};
use tracing::info;

use crate::events::{StepEvent, StepSink};
use crate::phase::Phase;
use crate::registry::ToolRegistry;
use crate::{tools, AgentError};

/// The structured seed for the execution phase: the synthesized SQL and
/// the original natural-language instruction, kept as separate fields
/// instead of being fished back out of free text.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub sql: String,
    pub instruction: String,
}

impl QueryRequest {
    pub fn render(&self) -> String {
        format!(
            "Execute this SQL statement against the database.\n\nSQL:\n{}\n\nContext:\n{}",
            self.sql, self.instruction
        )
    }
}

pub struct Pipeline {
    client: Arc<dyn ChatClient>,
    table_names: ToolRegistry,
    table_structure: ToolRegistry,
    query: ToolRegistry,
}

impl Pipeline {
    pub fn new(
        client: Arc<dyn ChatClient>,
        table_names: ToolRegistry,
        table_structure: ToolRegistry,
        query: ToolRegistry,
    ) -> Self {
        Self {
            client,
            table_names,
            table_structure,
            query,
        }
    }

    /// Pipeline wired to the postgres-backed tool registries.
    pub fn with_postgres_tools(client: Arc<dyn ChatClient>) -> Self {
        Self::new(
            client,
            tools::table_names_registry(),
            tools::table_structure_registry(),
            tools::query_registry(),
        )
    }

    /// Run the whole pipeline for one natural-language request, emitting
    /// every intermediate step into `sink`.
    pub async fn run(&self, query: &str, sink: &StepSink) -> Result<(), AgentError> {
        let conversation = vec![Message::user(format!(
            "get table and table structure {query}"
        ))];

        let names_phase = Phase::new(
            "table_names",
            Gateway::new(
                self.client.clone(),
                prompts::TABLE_DISCOVERY,
                self.table_names.definitions(),
            ),
            &self.table_names,
        );
        let run = names_phase.run(conversation, sink).await?;

        let structure_phase = Phase::new(
            "table_structure",
            Gateway::new(
                self.client.clone(),
                prompts::STRUCTURE_DISCOVERY,
                self.table_structure.definitions(),
            ),
            &self.table_structure,
        );
        let run = structure_phase.run(run.conversation, sink).await?;

        let table_structure = run
            .tool_outputs
            .iter()
            .map(|output| output.payload.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let sql = self.synthesize(&table_structure, query).await?;
        info!(%sql, "synthesized query");
        sink.emit(StepEvent::GeneratedSql(sql.clone()));

        // The execution phase starts from a fresh conversation seeded with
        // the structured request; nothing from discovery carries over.
        let request = QueryRequest {
            sql,
            instruction: query.to_string(),
        };
        let query_phase = Phase::new(
            "query",
            Gateway::new(
                self.client.clone(),
                prompts::QUERY_EXECUTION,
                self.query.definitions(),
            ),
            &self.query,
        );
        query_phase
            .run(vec![Message::user(request.render())], sink)
            .await?;

        Ok(())
    }

    /// The one-shot, non-agentic synthesis call: no tools bound, output
    /// trusted verbatim.
    async fn synthesize(
        &self,
        table_structure: &str,
        requirement: &str,
    ) -> Result<String, AgentError> {
        let prompt = prompts::synthesis(table_structure, requirement);
        let response = self
            .client
            .send_message(&[Message::user(prompt)], &[])
            .await?;
        Ok(response.content.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_request_renders_both_fields() {
        let request = QueryRequest {
            sql: "SELECT \"id\" FROM \"User\"".into(),
            instruction: "show me all users on postgres://localhost/app".into(),
        };
        let rendered = request.render();
        assert!(rendered.contains("SQL:\nSELECT \"id\" FROM \"User\""));
        assert!(rendered.contains("Context:\nshow me all users"));
    }
}
