use super::{AgentError, AgentInfo, EventStream, ModelClient, ModelRequest};
use crate::stream::{BlockDelta, BlockStart, StreamEvent};
use async_trait::async_trait;
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// One canned response
pub type Script = Vec<Result<StreamEvent, AgentError>>;

/// Model client that replays queued scripts, one per request, and records
/// every request it receives.
pub struct ScriptedClient {
    info: AgentInfo,
    scripts: Mutex<VecDeque<Script>>,
    fallback: Option<Script>,
    requests: Mutex<Vec<ModelRequest>>,
    delay: Duration,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self {
            info: AgentInfo {
                name: "Scripted".to_string(),
                description: "Replays canned block events".to_string(),
                model: "scripted".to_string(),
            },
            scripts: Mutex::new(VecDeque::new()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
        }
    }

    /// Client used when no API key is configured
    pub fn offline() -> Self {
        let mut client = Self::new().with_fallback(text_reply(
            "No ANTHROPIC_API_KEY is configured, so I can't reach the model. \
             Set it in the environment or a .env file and restart.",
        ));
        client.info.name = "Offline".to_string();
        client
    }

    /// Queue a script of events that always succeed
    pub fn with_script(self, events: Vec<StreamEvent>) -> Self {
        self.with_raw_script(events.into_iter().map(Ok).collect())
    }

    /// Queue a script that may contain errors
    pub fn with_raw_script(self, script: Script) -> Self {
        self.push_script(script);
        self
    }

    /// Script replayed once the queue is empty
    pub fn with_fallback(mut self, events: Vec<StreamEvent>) -> Self {
        self.fallback = Some(events.into_iter().map(Ok).collect());
        self
    }

    /// Pause between replayed events
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn push_script(&self, script: Script) {
        if let Ok(mut scripts) = self.scripts.lock() {
            scripts.push_back(script);
        }
    }

    /// Requests received so far, in order
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }
}

impl Default for ScriptedClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelClient for ScriptedClient {
    async fn stream(&self, request: &ModelRequest) -> Result<EventStream, AgentError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        let next = self.scripts.lock().ok().and_then(|mut s| s.pop_front());
        let script = next
            .or_else(|| self.fallback.clone())
            .ok_or_else(|| AgentError::Unavailable("no scripted response left".to_string()))?;

        let delay = self.delay;
        let stream = futures::stream::iter(script).then(move |event| async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            event
        });
        Ok(stream.boxed())
    }

    fn info(&self) -> AgentInfo {
        self.info.clone()
    }
}

/// A single text block carrying `text` as one delta
pub fn text_reply(text: &str) -> Vec<StreamEvent> {
    text_block(&[text])
}

/// A text block streamed as the given chunks
pub fn text_block(chunks: &[&str]) -> Vec<StreamEvent> {
    let mut events = vec![StreamEvent::BlockStart(BlockStart::Text)];
    events.extend(
        chunks
            .iter()
            .map(|chunk| StreamEvent::BlockDelta(BlockDelta::Text(chunk.to_string()))),
    );
    events.push(StreamEvent::BlockStop);
    events
}

/// A tool_use block whose input arrives as the given JSON fragments
pub fn tool_call(id: &str, name: &str, fragments: &[&str]) -> Vec<StreamEvent> {
    let mut events = vec![StreamEvent::BlockStart(BlockStart::ToolUse {
        id: id.to_string(),
        name: name.to_string(),
    })];
    events.extend(
        fragments
            .iter()
            .map(|fragment| StreamEvent::BlockDelta(BlockDelta::InputJson(fragment.to_string()))),
    );
    events.push(StreamEvent::BlockStop);
    events
}
