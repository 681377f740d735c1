pub mod agent;
pub mod assembler;
pub mod config;
pub mod conversation;
pub mod events;
pub mod session;
pub mod stream;
pub mod tools;

// Re-export main types for convenience
pub use agent::{AgentError, AgentFactory, AgentInfo, ModelClient, ModelRequest};
pub use assembler::{Assembler, ClosedToolCall, ProtocolError};
pub use config::AgentConfig;
pub use conversation::{ContentBlock, Conversation, Message, MessageContent, Role, ToolInput};
pub use events::{AppEvent, EventBus, EventSender};
pub use session::{Session, TurnError, TurnOutcome, TurnState};
pub use stream::{BlockDelta, BlockStart, StreamEvent};
pub use tools::{ToolDispatcher, ToolRegistry, ToolSpec};
