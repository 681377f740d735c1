use crate::config::AgentConfig;
use crate::conversation::Message;
use crate::stream::StreamEvent;
use crate::tools::ToolSpec;
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::sync::Arc;
use thiserror::Error;

pub mod anthropic;
pub mod mock;

pub use anthropic::AnthropicClient;
pub use mock::ScriptedClient;

/// Ordered block events of one model response
pub type EventStream = BoxStream<'static, Result<StreamEvent, AgentError>>;

/// Everything a model needs for one request
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub messages: Vec<Message>,
    pub tools: Vec<ToolSpec>,
}

/// A language model that answers with a stream of block events
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Open a response stream for `request`
    async fn stream(&self, request: &ModelRequest) -> Result<EventStream, AgentError>;

    /// Get client information
    fn info(&self) -> AgentInfo;
}

/// Information about a model client
#[derive(Debug, Clone)]
pub struct AgentInfo {
    pub name: String,
    pub description: String,
    pub model: String,
}

/// Errors raised while talking to the model
#[derive(Error, Debug, Clone)]
pub enum AgentError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Agent configuration error: {0}")]
    Configuration(String),

    #[error("Stream protocol error: {0}")]
    Protocol(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Agent unavailable: {0}")]
    Unavailable(String),
}

/// Factory for creating model clients
pub struct AgentFactory;

impl AgentFactory {
    /// Live Anthropic client. Requires `api_key` in the config.
    pub fn create_anthropic(config: &AgentConfig) -> Result<Arc<dyn ModelClient>, AgentError> {
        let client = AnthropicClient::new(config.clone())?;
        Ok(Arc::new(client))
    }

    /// Use the live client when a key is configured, otherwise an offline
    /// client that explains how to configure one.
    pub fn create_from_config(config: &AgentConfig) -> Result<Arc<dyn ModelClient>, AgentError> {
        if config.api_key.is_some() {
            Self::create_anthropic(config)
        } else {
            Ok(Arc::new(ScriptedClient::offline()))
        }
    }
}
