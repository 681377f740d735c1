use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Executable side of a tool. Receives arguments that already passed
/// schema validation and returns the text shown to the model.
#[async_trait]
pub trait ToolAction: Send + Sync {
    async fn execute(&self, args: Value) -> anyhow::Result<String>;
}

/// Tool advertisement sent with every model request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub input_schema: Value, // JSON Schema
}

// Filesystem tool arguments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadFileArgs {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFileArgs {
    pub path: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditFileArgs {
    pub path: String,
    pub old_string: String,
    pub new_string: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListFilesArgs {
    pub path: String,
}
