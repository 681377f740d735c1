use crate::assembler::ClosedToolCall;
use crate::conversation::{Conversation, Message};
use crate::tools::registry::ToolRegistry;
use futures::FutureExt;
use serde_json::{json, Value};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// How a dispatched call ended
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchStatus {
    Executed,
    NotFound,
    InvalidArguments(String),
    Failed(String),
    TimedOut,
}

impl DispatchStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, DispatchStatus::Executed)
    }
}

/// Result of dispatching one closed tool_use block
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    /// Structured input that replaces the block's raw buffer
    pub input: Value,
    /// tool_result message correlated to the call id
    pub result: Message,
    pub status: DispatchStatus,
    pub duration_ms: u64,
}

/// Validates and runs tool calls against a registry.
///
/// Every failure mode is folded into the returned tool_result so the model
/// can react to it; nothing here aborts a conversation.
#[derive(Clone)]
pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
    timeout: Option<Duration>,
}

impl ToolDispatcher {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry, timeout: None }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Dispatch `call`, update its tool_use block and append the result message
    pub async fn dispatch_into(&self, conversation: &mut Conversation, call: &ClosedToolCall) -> DispatchOutcome {
        let outcome = self.dispatch(call).await;
        conversation.resolve_tool_input(call.location, outcome.input.clone());
        conversation.push(outcome.result.clone());
        outcome
    }

    pub async fn dispatch(&self, call: &ClosedToolCall) -> DispatchOutcome {
        let start = Instant::now();
        let finish = |input: Value, content: String, status: DispatchStatus| {
            let is_error = !status.is_ok();
            DispatchOutcome {
                input,
                result: Message::tool_result(call.id.clone(), content, is_error),
                status,
                duration_ms: start.elapsed().as_millis() as u64,
            }
        };

        let parsed = parse_raw_input(&call.raw_input);

        let Some(tool) = self.registry.get(&call.name) else {
            warn!(tool = %call.name, id = %call.id, "model called an unknown tool");
            return finish(
                parsed.map(object_or_empty).unwrap_or_else(|_| json!({})),
                format!("Error: Tool {} not found", call.name),
                DispatchStatus::NotFound,
            );
        };

        let raw_args = match parsed {
            Ok(value) => value,
            Err(e) => {
                let message = format!("malformed JSON input: {}", e);
                warn!(tool = %call.name, id = %call.id, error = %e, "tool input is not valid JSON");
                return finish(
                    json!({}),
                    format!("Error: Invalid tool use: {}", message),
                    DispatchStatus::InvalidArguments(message),
                );
            }
        };

        let args = match tool.schema.validate(&raw_args) {
            Ok(args) => args,
            Err(e) => {
                warn!(tool = %call.name, id = %call.id, error = %e, "tool arguments failed validation");
                return finish(
                    object_or_empty(raw_args),
                    format!("Error: Invalid tool use: {}", e),
                    DispatchStatus::InvalidArguments(e.to_string()),
                );
            }
        };

        info!(tool = %call.name, id = %call.id, "executing tool");
        let execution = AssertUnwindSafe(tool.action.execute(args.clone())).catch_unwind();
        let result = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, execution).await {
                Ok(result) => Some(result),
                Err(_) => None,
            },
            None => Some(execution.await),
        };

        let outcome = match result {
            Some(Ok(Ok(output))) => finish(args, output, DispatchStatus::Executed),
            Some(Ok(Err(e))) => {
                warn!(tool = %call.name, id = %call.id, error = %e, "tool returned an error");
                finish(
                    args,
                    format!("Error executing tool {}: {}", call.name, e),
                    DispatchStatus::Failed(e.to_string()),
                )
            }
            Some(Err(_panic)) => {
                warn!(tool = %call.name, id = %call.id, "tool panicked");
                finish(
                    args,
                    format!("Error executing tool {}", call.name),
                    DispatchStatus::Failed("panicked".to_string()),
                )
            }
            None => {
                let limit_ms = self.timeout.map(|d| d.as_millis()).unwrap_or_default();
                warn!(tool = %call.name, id = %call.id, limit_ms = limit_ms as u64, "tool timed out");
                finish(
                    args,
                    format!("Error executing tool {}: timed out after {} ms", call.name, limit_ms),
                    DispatchStatus::TimedOut,
                )
            }
        };

        info!(
            tool = %call.name,
            id = %call.id,
            ok = outcome.status.is_ok(),
            duration_ms = outcome.duration_ms,
            "tool finished"
        );
        outcome
    }
}

/// An empty buffer means the model sent no arguments at all
fn parse_raw_input(raw: &str) -> Result<Value, serde_json::Error> {
    if raw.trim().is_empty() {
        return Ok(json!({}));
    }
    serde_json::from_str(raw)
}

/// tool_use input must stay an object on the wire
fn object_or_empty(value: Value) -> Value {
    if value.is_object() {
        value
    } else {
        json!({})
    }
}
