pub mod registry_tests;

// Test utilities
use crate::assembler::ClosedToolCall;
use crate::conversation::BlockCursor;
use crate::tools::types::ToolAction;
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::fs;

/// Test helper to create a temporary directory
pub async fn create_temp_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}

/// Test helper to create a temporary file with content
pub async fn create_temp_file(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.expect("Failed to create parent directory");
    }
    fs::write(&path, content).await.expect("Failed to write temp file");
    path
}

/// Test helper to build a closed tool call at the head of a conversation
pub fn closed_call(id: &str, name: &str, raw_input: &str) -> ClosedToolCall {
    ClosedToolCall {
        id: id.to_string(),
        name: name.to_string(),
        raw_input: raw_input.to_string(),
        location: BlockCursor { message: 0, block: 0 },
    }
}

/// Action that counts invocations and echoes its arguments
#[derive(Clone, Default)]
pub struct CountingAction {
    pub calls: Arc<AtomicUsize>,
}

impl CountingAction {
    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ToolAction for CountingAction {
    async fn execute(&self, args: Value) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("called with {}", args))
    }
}

/// Action that always fails
pub struct FailingAction;

#[async_trait]
impl ToolAction for FailingAction {
    async fn execute(&self, _args: Value) -> anyhow::Result<String> {
        anyhow::bail!("disk on fire")
    }
}

/// Action that panics
pub struct PanickingAction;

#[async_trait]
impl ToolAction for PanickingAction {
    async fn execute(&self, _args: Value) -> anyhow::Result<String> {
        panic!("unexpected state")
    }
}
