use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A message body is either plain text or a list of blocks, never both
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

/// One unit of structured content inside a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: ToolInput,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(default, skip_serializing_if = "is_false")]
        is_error: bool,
    },
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Input of a tool_use block.
///
/// While the block is open the model streams raw JSON fragments into
/// `Pending`. Once the call is dispatched the buffer is replaced by the
/// structured arguments and never goes back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolInput {
    Pending(String),
    Resolved(Value),
}

impl ToolInput {
    pub fn is_pending(&self) -> bool {
        matches!(self, ToolInput::Pending(_))
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            ToolInput::Resolved(value) => Some(value),
            ToolInput::Pending(_) => None,
        }
    }
}

/// A single turn in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
}

impl Message {
    /// Plain text message typed by the user
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn assistant(blocks: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Blocks(blocks),
        }
    }

    /// User-role message carrying the outcome of a tool call
    pub fn tool_result(tool_use_id: impl Into<String>, content: impl Into<String>, is_error: bool) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Blocks(vec![ContentBlock::ToolResult {
                tool_use_id: tool_use_id.into(),
                content: content.into(),
                is_error,
            }]),
        }
    }

    pub fn blocks(&self) -> &[ContentBlock] {
        match &self.content {
            MessageContent::Blocks(blocks) => blocks,
            MessageContent::Text(_) => &[],
        }
    }

    /// Concatenated text of the message, ignoring tool blocks
    pub fn text(&self) -> String {
        match &self.content {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Blocks(blocks) => blocks
                .iter()
                .filter_map(|block| match block {
                    ContentBlock::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect(),
        }
    }

    pub fn is_tool_result(&self) -> bool {
        matches!(self.blocks().last(), Some(ContentBlock::ToolResult { .. }))
    }
}

/// Position of a block inside the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockCursor {
    pub message: usize,
    pub block: usize,
}

/// Ordered, append-only message history owned by a session
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Immutable copy handed to the display layer
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Drop every message at or after `len`
    pub fn truncate(&mut self, len: usize) {
        self.messages.truncate(len);
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn ends_with_tool_result(&self) -> bool {
        self.last().map(Message::is_tool_result).unwrap_or(false)
    }

    /// Append a block to the message at `message`, returning its cursor
    pub(crate) fn append_block(&mut self, message: usize, block: ContentBlock) -> Option<BlockCursor> {
        let target = self.messages.get_mut(message)?;
        match &mut target.content {
            MessageContent::Blocks(blocks) => {
                blocks.push(block);
                Some(BlockCursor {
                    message,
                    block: blocks.len() - 1,
                })
            }
            MessageContent::Text(_) => None,
        }
    }

    /// Mutable access to the block at `cursor`, only if it is the tail block
    /// of the tail message.
    pub(crate) fn tail_block_mut(&mut self, cursor: BlockCursor) -> Option<&mut ContentBlock> {
        if cursor.message + 1 != self.messages.len() {
            return None;
        }
        match &mut self.messages[cursor.message].content {
            MessageContent::Blocks(blocks) if cursor.block + 1 == blocks.len() => blocks.get_mut(cursor.block),
            _ => None,
        }
    }

    pub fn block(&self, cursor: BlockCursor) -> Option<&ContentBlock> {
        self.messages.get(cursor.message)?.blocks().get(cursor.block)
    }

    /// Replace the provisional input of a tool_use block with structured arguments
    pub(crate) fn resolve_tool_input(&mut self, cursor: BlockCursor, value: Value) -> bool {
        let Some(message) = self.messages.get_mut(cursor.message) else {
            return false;
        };
        let MessageContent::Blocks(blocks) = &mut message.content else {
            return false;
        };
        match blocks.get_mut(cursor.block) {
            Some(ContentBlock::ToolUse { input, .. }) => {
                *input = ToolInput::Resolved(value);
                true
            }
            _ => false,
        }
    }
}
