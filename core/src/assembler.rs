//! Incremental reconstruction of assistant messages from block events.
//!
//! The assembler keeps a cursor to the single open block. Deltas may only
//! touch that block, and a tool_use block's raw input is handed out for
//! dispatch exactly once, when the block is stopped.

use crate::conversation::{BlockCursor, ContentBlock, Conversation, Message, Role, ToolInput};
use crate::stream::{BlockDelta, BlockStart, StreamEvent};
use thiserror::Error;
use tracing::debug;

/// Violations of the upstream event contract. Each one aborts the turn.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    #[error("Unknown content block type: {0}")]
    UnknownBlockType(String),

    #[error("Unknown content block delta type: {0}")]
    UnknownDeltaType(String),

    #[error("Received a block event while no block is open")]
    NoOpenBlock,

    #[error("Received block start while another block is still open")]
    BlockAlreadyOpen,

    #[error("Delta of type {delta} cannot be applied to a {block} block")]
    DeltaTypeMismatch { delta: String, block: &'static str },

    #[error("Stream ended while a block was still open")]
    UnterminatedBlock,
}

/// A tool_use block that has just been closed and is ready for dispatch
#[derive(Debug, Clone, PartialEq)]
pub struct ClosedToolCall {
    pub id: String,
    pub name: String,
    pub raw_input: String,
    pub location: BlockCursor,
}

/// Per-stream assembly state
#[derive(Debug, Default)]
pub struct Assembler {
    open: Option<BlockCursor>,
    current_message: Option<usize>,
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_open_block(&self) -> bool {
        self.open.is_some()
    }

    /// Feed one event, returning the closed tool call when a tool_use block stops
    pub fn apply(
        &mut self,
        conversation: &mut Conversation,
        event: StreamEvent,
    ) -> Result<Option<ClosedToolCall>, ProtocolError> {
        match event {
            StreamEvent::BlockStart(start) => self.on_block_start(conversation, start).map(|_| None),
            StreamEvent::BlockDelta(delta) => self.on_block_delta(conversation, delta).map(|_| None),
            StreamEvent::BlockStop => self.on_block_stop(conversation),
        }
    }

    pub fn on_block_start(&mut self, conversation: &mut Conversation, start: BlockStart) -> Result<BlockCursor, ProtocolError> {
        if self.open.is_some() {
            return Err(ProtocolError::BlockAlreadyOpen);
        }

        let block = match start {
            BlockStart::Text => ContentBlock::Text { text: String::new() },
            BlockStart::ToolUse { id, name } => ContentBlock::ToolUse {
                id,
                name,
                input: ToolInput::Pending(String::new()),
            },
            BlockStart::Unrecognized(kind) => return Err(ProtocolError::UnknownBlockType(kind)),
        };

        // Extend the assistant message this stream opened, unless something
        // (a tool result) has been appended after it in the meantime.
        let extend = self
            .current_message
            .filter(|&index| index + 1 == conversation.len())
            .filter(|_| matches!(conversation.last(), Some(m) if m.role == Role::Assistant));

        let cursor = match extend.and_then(|index| conversation.append_block(index, block.clone())) {
            Some(cursor) => cursor,
            None => {
                conversation.push(Message::assistant(vec![block]));
                let index = conversation.len() - 1;
                self.current_message = Some(index);
                BlockCursor { message: index, block: 0 }
            }
        };

        debug!(message = cursor.message, block = cursor.block, "block opened");
        self.open = Some(cursor);
        Ok(cursor)
    }

    pub fn on_block_delta(&mut self, conversation: &mut Conversation, delta: BlockDelta) -> Result<(), ProtocolError> {
        let cursor = self.open.ok_or(ProtocolError::NoOpenBlock)?;
        let block = conversation
            .tail_block_mut(cursor)
            .ok_or(ProtocolError::NoOpenBlock)?;

        match (delta, block) {
            (BlockDelta::Unrecognized(kind), _) => Err(ProtocolError::UnknownDeltaType(kind)),
            (BlockDelta::Text(chunk), ContentBlock::Text { text }) => {
                text.push_str(&chunk);
                Ok(())
            }
            (BlockDelta::InputJson(fragment), ContentBlock::ToolUse { input: ToolInput::Pending(buffer), .. }) => {
                buffer.push_str(&fragment);
                Ok(())
            }
            (delta, block) => Err(ProtocolError::DeltaTypeMismatch {
                delta: delta.kind().to_string(),
                block: block_kind(block),
            }),
        }
    }

    pub fn on_block_stop(&mut self, conversation: &mut Conversation) -> Result<Option<ClosedToolCall>, ProtocolError> {
        let cursor = self.open.take().ok_or(ProtocolError::NoOpenBlock)?;

        match conversation.block(cursor) {
            Some(ContentBlock::ToolUse { id, name, input: ToolInput::Pending(raw) }) => {
                debug!(id = %id, name = %name, "tool_use block closed");
                Ok(Some(ClosedToolCall {
                    id: id.clone(),
                    name: name.clone(),
                    raw_input: raw.clone(),
                    location: cursor,
                }))
            }
            Some(_) => Ok(None),
            None => Err(ProtocolError::NoOpenBlock),
        }
    }

    /// Called when the stream is exhausted
    pub fn finish(&self) -> Result<(), ProtocolError> {
        if self.has_open_block() {
            return Err(ProtocolError::UnterminatedBlock);
        }
        Ok(())
    }
}

fn block_kind(block: &ContentBlock) -> &'static str {
    match block {
        ContentBlock::Text { .. } => "text",
        ContentBlock::ToolUse { .. } => "tool_use",
        ContentBlock::ToolResult { .. } => "tool_result",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_events(chunks: &[&str]) -> Vec<StreamEvent> {
        let mut events = vec![StreamEvent::BlockStart(BlockStart::Text)];
        events.extend(chunks.iter().map(|c| StreamEvent::BlockDelta(BlockDelta::Text(c.to_string()))));
        events.push(StreamEvent::BlockStop);
        events
    }

    fn tool_events(id: &str, name: &str, fragments: &[&str]) -> Vec<StreamEvent> {
        let mut events = vec![StreamEvent::BlockStart(BlockStart::ToolUse {
            id: id.to_string(),
            name: name.to_string(),
        })];
        events.extend(fragments.iter().map(|f| StreamEvent::BlockDelta(BlockDelta::InputJson(f.to_string()))));
        events.push(StreamEvent::BlockStop);
        events
    }

    fn run(events: Vec<StreamEvent>) -> (Conversation, Vec<ClosedToolCall>) {
        let mut conversation = Conversation::new();
        let mut assembler = Assembler::new();
        let mut closed = Vec::new();
        for event in events {
            if let Some(call) = assembler.apply(&mut conversation, event).unwrap() {
                closed.push(call);
            }
        }
        assembler.finish().unwrap();
        (conversation, closed)
    }

    #[test]
    fn test_text_block_accumulates_deltas() {
        let (conversation, closed) = run(text_events(&["x", "y"]));
        assert!(closed.is_empty());
        assert_eq!(conversation.len(), 1);
        assert_eq!(conversation.messages()[0].role, Role::Assistant);
        assert_eq!(conversation.messages()[0].text(), "xy");
    }

    #[test]
    fn test_text_block_without_deltas_is_empty() {
        let (conversation, _) = run(text_events(&[]));
        assert_eq!(conversation.messages()[0].text(), "");
    }

    #[test]
    fn test_chunking_does_not_change_content() {
        let payload = "The quick brown fox → jumps over the lazy dog";
        let chars: Vec<char> = payload.chars().collect();

        for size in 1..=chars.len() {
            let chunks: Vec<String> = chars.chunks(size).map(|c| c.iter().collect()).collect();
            let refs: Vec<&str> = chunks.iter().map(String::as_str).collect();
            let (conversation, _) = run(text_events(&refs));
            assert_eq!(conversation.messages()[0].text(), payload, "chunk size {}", size);
        }
    }

    #[test]
    fn test_tool_input_split_at_every_boundary() {
        let payload = "{\"path\":\"/tmp/caf\u{e9} \u{2192} \u{1f600}.txt\",\"n\":[1,2]}";
        let boundaries: Vec<usize> = (1..payload.len()).filter(|&i| payload.is_char_boundary(i)).collect();

        for split in boundaries {
            let (head, tail) = payload.split_at(split);
            let (_, closed) = run(tool_events("t1", "create_file", &[head, "", tail]));
            assert_eq!(closed.len(), 1);
            assert_eq!(closed[0].raw_input, payload, "split at {}", split);
        }

        let chars: Vec<String> = payload.chars().map(String::from).collect();
        let refs: Vec<&str> = chars.iter().map(String::as_str).collect();
        let (_, closed) = run(tool_events("t1", "create_file", &refs));
        assert_eq!(closed[0].raw_input, payload);
    }

    #[test]
    fn test_tool_input_is_not_parsed_before_stop() {
        let mut conversation = Conversation::new();
        let mut assembler = Assembler::new();
        assembler
            .on_block_start(
                &mut conversation,
                BlockStart::ToolUse { id: "t1".to_string(), name: "read_file".to_string() },
            )
            .unwrap();
        assembler
            .on_block_delta(&mut conversation, BlockDelta::InputJson("{\"path\":".to_string()))
            .unwrap();

        match &conversation.messages()[0].blocks()[0] {
            ContentBlock::ToolUse { input, .. } => assert_eq!(input, &ToolInput::Pending("{\"path\":".to_string())),
            other => panic!("unexpected block {:?}", other),
        }

        assembler
            .on_block_delta(&mut conversation, BlockDelta::InputJson("\"/tmp/a.txt\"}".to_string()))
            .unwrap();
        let closed = assembler.on_block_stop(&mut conversation).unwrap().unwrap();
        assert_eq!(closed.id, "t1");
        assert_eq!(closed.name, "read_file");
        assert_eq!(closed.raw_input, "{\"path\":\"/tmp/a.txt\"}");
        assert_eq!(closed.location, BlockCursor { message: 0, block: 0 });
    }

    #[test]
    fn test_text_then_tool_use_share_one_message() {
        let mut events = text_events(&["Reading it now."]);
        events.extend(tool_events("t1", "read_file", &["{}"]));
        let (conversation, closed) = run(events);

        assert_eq!(conversation.len(), 1);
        assert_eq!(conversation.messages()[0].blocks().len(), 2);
        assert_eq!(closed[0].location, BlockCursor { message: 0, block: 1 });
    }

    #[test]
    fn test_block_after_tool_result_opens_new_message() {
        let mut conversation = Conversation::new();
        let mut assembler = Assembler::new();
        for event in tool_events("t1", "read_file", &["{}"]) {
            assembler.apply(&mut conversation, event).unwrap();
        }
        conversation.push(Message::tool_result("t1", "contents", false));

        for event in text_events(&["done"]) {
            assembler.apply(&mut conversation, event).unwrap();
        }
        assert_eq!(conversation.len(), 3);
        assert_eq!(conversation.messages()[2].text(), "done");
    }

    #[test]
    fn test_unknown_block_type_is_rejected() {
        let mut conversation = Conversation::new();
        let mut assembler = Assembler::new();
        let err = assembler
            .on_block_start(&mut conversation, BlockStart::Unrecognized("image".to_string()))
            .unwrap_err();
        assert_eq!(err, ProtocolError::UnknownBlockType("image".to_string()));
        assert!(conversation.is_empty());
    }

    #[test]
    fn test_unknown_delta_type_is_rejected() {
        let mut conversation = Conversation::new();
        let mut assembler = Assembler::new();
        assembler.on_block_start(&mut conversation, BlockStart::Text).unwrap();
        let err = assembler
            .on_block_delta(&mut conversation, BlockDelta::Unrecognized("citations_delta".to_string()))
            .unwrap_err();
        assert_eq!(err, ProtocolError::UnknownDeltaType("citations_delta".to_string()));
    }

    #[test]
    fn test_delta_without_open_block_is_rejected() {
        let mut conversation = Conversation::new();
        let mut assembler = Assembler::new();
        let err = assembler
            .on_block_delta(&mut conversation, BlockDelta::Text("x".to_string()))
            .unwrap_err();
        assert_eq!(err, ProtocolError::NoOpenBlock);
    }

    #[test]
    fn test_delta_after_stop_is_rejected() {
        let mut conversation = Conversation::new();
        let mut assembler = Assembler::new();
        for event in text_events(&["a"]) {
            assembler.apply(&mut conversation, event).unwrap();
        }
        let err = assembler
            .apply(&mut conversation, StreamEvent::BlockDelta(BlockDelta::Text("b".to_string())))
            .unwrap_err();
        assert_eq!(err, ProtocolError::NoOpenBlock);
        assert_eq!(conversation.messages()[0].text(), "a");
    }

    #[test]
    fn test_double_start_and_stray_stop_are_rejected() {
        let mut conversation = Conversation::new();
        let mut assembler = Assembler::new();
        assert_eq!(assembler.on_block_stop(&mut conversation).unwrap_err(), ProtocolError::NoOpenBlock);

        assembler.on_block_start(&mut conversation, BlockStart::Text).unwrap();
        assert_eq!(
            assembler.on_block_start(&mut conversation, BlockStart::Text).unwrap_err(),
            ProtocolError::BlockAlreadyOpen
        );
        assert!(assembler.has_open_block());
        assert_eq!(assembler.finish().unwrap_err(), ProtocolError::UnterminatedBlock);
    }

    #[test]
    fn test_json_delta_into_text_block_is_a_mismatch() {
        let mut conversation = Conversation::new();
        let mut assembler = Assembler::new();
        assembler.on_block_start(&mut conversation, BlockStart::Text).unwrap();
        let err = assembler
            .on_block_delta(&mut conversation, BlockDelta::InputJson("{}".to_string()))
            .unwrap_err();
        assert_eq!(
            err,
            ProtocolError::DeltaTypeMismatch { delta: "input_json_delta".to_string(), block: "text" }
        );
    }
}
