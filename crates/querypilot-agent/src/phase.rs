//! Single-pass phase runner.
//!
//! A phase is one gateway call followed by at most one round of tool
//! resolution. The control flow is written as a straight two-state
//! transition rather than a loop: after the first batch of tool calls is
//! resolved and spliced back into the conversation, the phase is done —
//! even if a further model call would request more tools. Multi-round
//! agents are out of contract here.

use futures_util::future::try_join_all;
use querypilot_ai::{Gateway, Message};
use tracing::debug;

use crate::events::{StepEvent, StepSink};
use crate::registry::ToolRegistry;
use crate::AgentError;

pub struct Phase<'a> {
    name: &'static str,
    gateway: Gateway,
    registry: &'a ToolRegistry,
}

/// What a phase leaves behind: the (possibly extended) conversation and
/// the raw payloads of any tools that ran.
pub struct PhaseRun {
    pub conversation: Vec<Message>,
    pub tool_outputs: Vec<ToolOutput>,
}

#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub tool: String,
    pub payload: String,
}

impl<'a> Phase<'a> {
    pub fn new(name: &'static str, gateway: Gateway, registry: &'a ToolRegistry) -> Self {
        Self {
            name,
            gateway,
            registry,
        }
    }

    /// Drive the phase to completion.
    ///
    /// Zero tool calls: the conversation is returned unchanged. Otherwise
    /// all sibling tool calls run concurrently (all-or-nothing join), the
    /// assistant message is appended, then one tool-result message per
    /// call in the order the calls were returned.
    pub async fn run(
        &self,
        mut conversation: Vec<Message>,
        sink: &StepSink,
    ) -> Result<PhaseRun, AgentError> {
        let response = self.gateway.invoke(&conversation).await?;
        sink.emit(StepEvent::model_response(self.name, &response));

        if response.tool_calls.is_empty() {
            debug!(phase = self.name, "no tool calls, phase done");
            return Ok(PhaseRun {
                conversation,
                tool_outputs: Vec::new(),
            });
        }

        debug!(
            phase = self.name,
            calls = response.tool_calls.len(),
            "resolving tool calls"
        );
        let payloads = try_join_all(
            response
                .tool_calls
                .iter()
                .map(|call| self.registry.dispatch(call)),
        )
        .await?;

        conversation.push(Message::assistant(response.content.clone()));
        let mut tool_outputs = Vec::with_capacity(payloads.len());
        for (call, payload) in response.tool_calls.iter().zip(payloads) {
            sink.emit(StepEvent::tool_output(&call.name, &payload));
            conversation.push(Message::tool(format!(
                "[Tool Result: {}]\n{}",
                call.name, payload
            )));
            tool_outputs.push(ToolOutput {
                tool: call.name.clone(),
                payload,
            });
        }

        Ok(PhaseRun {
            conversation,
            tool_outputs,
        })
    }
}
