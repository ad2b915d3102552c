//! Step events: every intermediate value the pipeline produces, in the
//! order it is produced. The transport turns these into NDJSON lines; each
//! line is a single-key object named after the phase or tool it came from.

use querypilot_ai::{ChatResponse, ToolCall};
use serde_json::{json, Value};
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub enum StepEvent {
    /// Raw model response, tagged with the phase that made the call.
    ModelResponse {
        phase: &'static str,
        content: String,
        tool_calls: Vec<ToolCall>,
    },
    /// Raw tool output, keyed by the tool that produced it.
    ToolOutput { tool: String, payload: Value },
    /// The synthesized SQL statement, before execution.
    GeneratedSql(String),
    /// Terminal error line; details stay in the server log.
    Error(String),
}

impl StepEvent {
    pub fn model_response(phase: &'static str, response: &ChatResponse) -> Self {
        Self::ModelResponse {
            phase,
            content: response.content.clone(),
            tool_calls: response.tool_calls.clone(),
        }
    }

    /// Tool payloads are JSON where the tool produced JSON, plain strings
    /// otherwise (e.g. an execution-error message).
    pub fn tool_output(tool: &str, raw: &str) -> Self {
        let payload =
            serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        Self::ToolOutput {
            tool: tool.to_string(),
            payload,
        }
    }

    /// The wire shape: one object, one key, named after the source.
    pub fn to_json(&self) -> Value {
        match self {
            Self::ModelResponse {
                phase,
                content,
                tool_calls,
            } => json!({
                "model_response": {
                    "phase": phase,
                    "content": content,
                    "tool_calls": tool_calls,
                }
            }),
            Self::ToolOutput { tool, payload } => {
                let mut object = serde_json::Map::with_capacity(1);
                object.insert(tool.clone(), payload.clone());
                Value::Object(object)
            }
            Self::GeneratedSql(sql) => json!({ "generated_sql": sql }),
            Self::Error(message) => json!({ "error": message }),
        }
    }
}

/// Observer handle the pipeline emits into. A closed receiver means the
/// consumer went away; emission then becomes a no-op rather than an error.
#[derive(Clone)]
pub struct StepSink {
    tx: mpsc::UnboundedSender<StepEvent>,
}

impl StepSink {
    pub fn new(tx: mpsc::UnboundedSender<StepEvent>) -> Self {
        Self { tx }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<StepEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn emit(&self, event: StepEvent) {
        let _ = self.tx.send(event);
    }
}
