use crate::agent::{AgentError, AgentInfo, ModelClient, ModelRequest};
use crate::assembler::{Assembler, ClosedToolCall, ProtocolError};
use crate::config::AgentConfig;
use crate::conversation::{Conversation, Message, Role};
use crate::events::{AppEvent, EventSender};
use crate::tools::{ToolDispatcher, ToolRegistry};
use futures::StreamExt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Where the session is in a user turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    AwaitingUserInput,
    Streaming { cycle: usize },
    ToolPending { cycle: usize },
}

/// Summary of a completed turn
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    /// Number of model requests issued
    pub cycles: usize,
    /// Text of the final assistant message
    pub final_text: String,
}

/// Errors that abort a turn
#[derive(Error, Debug, Clone)]
pub enum TurnError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error("Stopped after {0} model requests without a final answer")]
    CycleLimitReached(usize),
}

/// Owns one conversation and drives it turn by turn
pub struct Session {
    conversation: Conversation,
    client: Arc<dyn ModelClient>,
    dispatcher: ToolDispatcher,
    event_sender: EventSender,
    max_cycles: usize,
    state: TurnState,
}

impl Session {
    /// Create a new session with the given client and tools
    pub fn new(client: Arc<dyn ModelClient>, registry: Arc<ToolRegistry>, event_sender: EventSender) -> Self {
        Self {
            conversation: Conversation::new(),
            client,
            dispatcher: ToolDispatcher::new(registry),
            event_sender,
            max_cycles: crate::config::DEFAULT_MAX_CYCLES,
            state: TurnState::AwaitingUserInput,
        }
    }

    /// Create a session with limits taken from `config`
    pub fn from_config(
        config: &AgentConfig,
        client: Arc<dyn ModelClient>,
        registry: Arc<ToolRegistry>,
        event_sender: EventSender,
    ) -> Self {
        let mut session = Self::new(client, registry, event_sender).with_max_cycles(config.max_cycles);
        if let Some(timeout) = config.tool_timeout {
            session.dispatcher = session.dispatcher.with_timeout(timeout);
        }
        session
    }

    pub fn with_max_cycles(mut self, max_cycles: usize) -> Self {
        self.max_cycles = max_cycles.max(1);
        self
    }

    /// Get all messages in the session
    pub fn messages(&self) -> &[Message] {
        self.conversation.messages()
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    /// Get model client information
    pub fn agent_info(&self) -> AgentInfo {
        self.client.info()
    }

    /// Clear all messages
    pub fn clear(&mut self) {
        self.conversation.clear();
        self.publish_snapshot();
    }

    /// Append a user message and run the model until it answers in plain text.
    ///
    /// Tool results trigger a follow-up request without new input. A
    /// protocol or transport error aborts the turn and discards the partial
    /// response of the failing request; earlier cycles stay in the history.
    pub async fn handle_user_input(&mut self, input: String) -> Result<TurnOutcome, TurnError> {
        self.conversation.push(Message::user(input));
        self.publish_snapshot();

        let result = self.run_turn().await;
        self.state = TurnState::AwaitingUserInput;

        match &result {
            Ok(outcome) => {
                info!(cycles = outcome.cycles, "turn completed");
                let _ = self.event_sender.send(AppEvent::TurnCompleted { cycles: outcome.cycles });
            }
            Err(e) => {
                error!(error = %e, "turn aborted");
                let _ = self.event_sender.send(AppEvent::TurnFailed { message: e.to_string() });
            }
        }
        result
    }

    async fn run_turn(&mut self) -> Result<TurnOutcome, TurnError> {
        let mut cycle = 0;
        loop {
            if cycle >= self.max_cycles {
                warn!(max_cycles = self.max_cycles, "cycle limit reached with tool results pending");
                return Err(TurnError::CycleLimitReached(self.max_cycles));
            }
            cycle += 1;
            self.state = TurnState::Streaming { cycle };
            let _ = self.event_sender.send(AppEvent::CycleStarted { cycle });

            let checkpoint = self.conversation.len();
            if let Err(e) = self.stream_cycle().await {
                self.conversation.truncate(checkpoint);
                self.publish_snapshot();
                return Err(e);
            }

            if self.conversation.ends_with_tool_result() {
                debug!(cycle, "tool result pending, requesting follow-up");
                self.state = TurnState::ToolPending { cycle };
                continue;
            }

            let final_text = self
                .conversation
                .last()
                .filter(|m| m.role == Role::Assistant)
                .map(Message::text)
                .unwrap_or_default();
            return Ok(TurnOutcome { cycles: cycle, final_text });
        }
    }

    /// One model request: stream events into the conversation, dispatching
    /// each tool call as its block closes.
    async fn stream_cycle(&mut self) -> Result<(), TurnError> {
        let request = ModelRequest {
            messages: self.conversation.snapshot(),
            tools: self.dispatcher.registry().get_all_specs(),
        };
        let mut events = self.client.stream(&request).await?;
        let mut assembler = Assembler::new();

        while let Some(event) = events.next().await {
            let closed = assembler.apply(&mut self.conversation, event?)?;
            self.publish_snapshot();

            if let Some(call) = closed {
                self.run_tool(&call).await;
            }
        }

        assembler.finish()?;
        Ok(())
    }

    async fn run_tool(&mut self, call: &ClosedToolCall) {
        let _ = self.event_sender.send(AppEvent::ToolBegin {
            id: call.id.clone(),
            name: call.name.clone(),
        });

        let outcome = self.dispatcher.dispatch_into(&mut self.conversation, call).await;

        let _ = self.event_sender.send(AppEvent::ToolEnd {
            id: call.id.clone(),
            name: call.name.clone(),
            ok: outcome.status.is_ok(),
            duration_ms: outcome.duration_ms,
        });
        self.publish_snapshot();
    }

    fn publish_snapshot(&self) {
        let _ = self.event_sender.send_snapshot(self.conversation.snapshot());
    }
}
