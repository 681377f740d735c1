//! Streaming client for the Anthropic Messages API.
//!
//! The response is a server-sent event stream. Each `data:` line carries one
//! JSON event; block events are forwarded to the session and message-level
//! framing (`message_start`, `message_delta`, `message_stop`, `ping`) is
//! dropped here.

use crate::agent::{AgentError, AgentInfo, EventStream, ModelClient, ModelRequest};
use crate::config::AgentConfig;
use crate::conversation::{ContentBlock, Message, MessageContent, ToolInput};
use crate::stream::{BlockDelta, BlockStart, StreamEvent};
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::fmt::Display;
use tracing::{debug, warn};

const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicClient {
    info: AgentInfo,
    config: AgentConfig,
    http: reqwest::Client,
}

impl AnthropicClient {
    pub fn new(config: AgentConfig) -> Result<Self, AgentError> {
        if config.api_key.is_none() {
            return Err(AgentError::Configuration("Missing ANTHROPIC_API_KEY".to_string()));
        }

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| AgentError::Configuration(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            info: AgentInfo {
                name: "Anthropic".to_string(),
                description: "Claude via the streaming Messages API".to_string(),
                model: config.model.clone(),
            },
            config,
            http,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.config.base_url)
    }

    fn build_body(&self, request: &ModelRequest) -> Value {
        json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "stream": true,
            "messages": wire_messages(&request.messages),
            "tools": request.tools,
        })
    }
}

#[async_trait]
impl ModelClient for AnthropicClient {
    async fn stream(&self, request: &ModelRequest) -> Result<EventStream, AgentError> {
        let body = self.build_body(request);
        let api_key = self.config.api_key.as_deref().unwrap_or_default();

        debug!(model = %self.config.model, messages = request.messages.len(), "opening message stream");
        let resp = self
            .http
            .post(self.endpoint())
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| AgentError::Network(format!("request error: {}", e)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            warn!(%status, "model request rejected");
            return Err(AgentError::Api(format!("{}: {}", status, text)));
        }

        Ok(decode_sse(Box::pin(resp.bytes_stream())))
    }

    fn info(&self) -> AgentInfo {
        self.info.clone()
    }
}

/// Request form of the history: empty text blocks are dropped, as are
/// messages left with nothing to say.
fn wire_messages(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .filter_map(|message| {
            let content = match &message.content {
                MessageContent::Text(text) if text.is_empty() => return None,
                MessageContent::Text(text) => MessageContent::Text(text.clone()),
                MessageContent::Blocks(blocks) => {
                    let blocks: Vec<ContentBlock> = blocks
                        .iter()
                        .filter(|b| !matches!(b, ContentBlock::Text { text } if text.is_empty()))
                        .cloned()
                        .map(|block| match block {
                            ContentBlock::ToolUse { id, name, input: ToolInput::Pending(_) } => ContentBlock::ToolUse {
                                id,
                                name,
                                input: ToolInput::Resolved(json!({})),
                            },
                            other => other,
                        })
                        .collect();
                    if blocks.is_empty() {
                        return None;
                    }
                    MessageContent::Blocks(blocks)
                }
            };
            serde_json::to_value(Message { role: message.role, content }).ok()
        })
        .collect()
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireEvent {
    MessageStart,
    ContentBlockStart { content_block: BlockStart },
    ContentBlockDelta { delta: BlockDelta },
    ContentBlockStop,
    MessageDelta,
    MessageStop,
    Ping,
    Error { error: ApiErrorBody },
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    message: String,
}

/// Decode one `data:` payload; `Ok(None)` for framing events
pub fn decode_data(payload: &str) -> Result<Option<StreamEvent>, AgentError> {
    let event: WireEvent = serde_json::from_str(payload)
        .map_err(|e| AgentError::Protocol(format!("unrecognized stream event {}: {}", payload, e)))?;

    match event {
        WireEvent::ContentBlockStart { content_block } => Ok(Some(StreamEvent::BlockStart(content_block))),
        WireEvent::ContentBlockDelta { delta } => Ok(Some(StreamEvent::BlockDelta(delta))),
        WireEvent::ContentBlockStop => Ok(Some(StreamEvent::BlockStop)),
        WireEvent::MessageStart | WireEvent::MessageDelta | WireEvent::MessageStop | WireEvent::Ping => Ok(None),
        WireEvent::Error { error } => Err(AgentError::Api(format!("{}: {}", error.kind, error.message))),
    }
}

/// Splits a byte stream into complete SSE lines and collects `data:` payloads
#[derive(Debug, Default)]
pub struct SseBuffer {
    buf: Vec<u8>,
}

impl SseBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return the payloads of every completed data line
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut payloads = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            if let Some(payload) = data_payload(&line) {
                payloads.push(payload);
            }
        }
        payloads
    }

    /// Flush a trailing line that had no newline
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buf);
        data_payload(&rest)
    }
}

fn data_payload(line: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim_end_matches(&['\r', '\n'][..]);
    let payload = line.strip_prefix("data:")?.trim_start();
    if payload.is_empty() {
        None
    } else {
        Some(payload.to_string())
    }
}

struct DecodeState<S> {
    inner: S,
    buffer: SseBuffer,
    pending: VecDeque<Result<StreamEvent, AgentError>>,
    done: bool,
}

impl<S> DecodeState<S> {
    fn enqueue(&mut self, payload: &str) {
        match decode_data(payload) {
            Ok(Some(event)) => self.pending.push_back(Ok(event)),
            Ok(None) => {}
            Err(e) => self.pending.push_back(Err(e)),
        }
    }
}

/// Turn a raw SSE byte stream into block events. The stream ends after the
/// first error.
pub fn decode_sse<S, B, E>(inner: S) -> EventStream
where
    S: Stream<Item = Result<B, E>> + Send + Unpin + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = DecodeState {
        inner,
        buffer: SseBuffer::new(),
        pending: VecDeque::new(),
        done: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                if item.is_err() {
                    state.pending.clear();
                    state.done = true;
                }
                return Some((item, state));
            }
            if state.done {
                return None;
            }

            match state.inner.next().await {
                Some(Ok(chunk)) => {
                    for payload in state.buffer.push(chunk.as_ref()) {
                        state.enqueue(&payload);
                    }
                }
                Some(Err(e)) => {
                    state.pending.push_back(Err(AgentError::Network(format!("stream error: {}", e))));
                }
                None => {
                    if let Some(payload) = state.buffer.finish() {
                        state.enqueue(&payload);
                    }
                    state.done = true;
                }
            }
        }
    })
    .boxed()
}
