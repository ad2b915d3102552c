//! Tool registry: a static mapping from tool name to an executable handler
//! with its declared argument schema.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use querypilot_ai::{ToolCall, ToolDefinition};
use serde_json::Value;
use tracing::debug;

use crate::AgentError;

/// An executable tool body. Arguments arrive as the JSON object the model
/// supplied; the handler validates them against its own argument struct.
pub type ToolHandler =
    Arc<dyn Fn(Value) -> BoxFuture<'static, Result<String, AgentError>> + Send + Sync>;

struct RegisteredTool {
    definition: ToolDefinition,
    handler: ToolHandler,
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, RegisteredTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, definition: ToolDefinition, handler: ToolHandler) {
        self.tools.insert(
            definition.name.clone(),
            RegisteredTool {
                definition,
                handler,
            },
        );
    }

    /// The definitions handed to the gateway; this is the model's entire
    /// capability set for a phase.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .values()
            .map(|tool| tool.definition.clone())
            .collect()
    }

    /// Run one tool call.
    ///
    /// Panics on an unknown name: the model can only name tools from the
    /// definitions this registry produced, so a miss is a bug here, not a
    /// recoverable request error.
    pub fn dispatch(&self, call: &ToolCall) -> BoxFuture<'static, Result<String, AgentError>> {
        let tool = self
            .tools
            .get(&call.name)
            .unwrap_or_else(|| panic!("tool {} is not registered", call.name));
        debug!(tool = %call.name, "dispatching tool call");
        (tool.handler)(call.arguments.clone())
    }
}
