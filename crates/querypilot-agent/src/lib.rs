//! Agent orchestration for querypilot.
//!
//! Wires the LLM gateway to the database tools: a tool registry maps the
//! names the model knows to executable handlers, a single-pass phase
//! runner resolves one round of tool calls per phase, and the pipeline
//! drives the three phases (table names, table structure, query) plus the
//! non-agentic SQL synthesis step in between.

pub mod events;
pub mod phase;
pub mod pipeline;
pub mod registry;
pub mod tools;

pub use events::{StepEvent, StepSink};
pub use phase::{Phase, PhaseRun, ToolOutput};
pub use pipeline::{Pipeline, QueryRequest};
pub use registry::{ToolHandler, ToolRegistry};

use querypilot_ai::ProviderError;
use querypilot_db::DbError;

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error("invalid arguments for tool {tool}: {message}")]
    InvalidArguments { tool: String, message: String },
}
