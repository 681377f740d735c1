use serde::Deserialize;

/// Block-level events the assembler consumes, in arrival order
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    BlockStart(BlockStart),
    BlockDelta(BlockDelta),
    BlockStop,
}

/// Kind of block being opened.
///
/// Tags outside the known set are kept as `Unrecognized` so the assembler
/// can reject them loudly instead of the decoder dropping them.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawBlockStart")]
pub enum BlockStart {
    Text,
    ToolUse { id: String, name: String },
    Unrecognized(String),
}

/// Incremental update for the open block
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawBlockDelta")]
pub enum BlockDelta {
    Text(String),
    InputJson(String),
    Unrecognized(String),
}

impl BlockDelta {
    pub fn kind(&self) -> &str {
        match self {
            BlockDelta::Text(_) => "text_delta",
            BlockDelta::InputJson(_) => "input_json_delta",
            BlockDelta::Unrecognized(kind) => kind,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawBlockStart {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

impl TryFrom<RawBlockStart> for BlockStart {
    type Error = String;

    fn try_from(raw: RawBlockStart) -> Result<Self, Self::Error> {
        match raw.block_type.as_str() {
            "text" => Ok(BlockStart::Text),
            "tool_use" => match (raw.id, raw.name) {
                (Some(id), Some(name)) => Ok(BlockStart::ToolUse { id, name }),
                _ => Err("tool_use block is missing its id or name".to_string()),
            },
            _ => Ok(BlockStart::Unrecognized(raw.block_type)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawBlockDelta {
    #[serde(rename = "type")]
    delta_type: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    partial_json: Option<String>,
}

impl TryFrom<RawBlockDelta> for BlockDelta {
    type Error = String;

    fn try_from(raw: RawBlockDelta) -> Result<Self, Self::Error> {
        match raw.delta_type.as_str() {
            "text_delta" => raw
                .text
                .map(BlockDelta::Text)
                .ok_or_else(|| "text_delta without text".to_string()),
            "input_json_delta" => raw
                .partial_json
                .map(BlockDelta::InputJson)
                .ok_or_else(|| "input_json_delta without partial_json".to_string()),
            _ => Ok(BlockDelta::Unrecognized(raw.delta_type)),
        }
    }
}
