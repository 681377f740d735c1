use crate::tools::types::*;
use async_trait::async_trait;
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde_json::Value;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// Directory names hidden from `list_files`
pub const DEFAULT_IGNORED: &[&str] = &["node_modules", ".git", "dist", "build", ".next", ".vscode", "coverage"];

// Missing paths are ordinary output, not errors
fn missing_file_message(path: &str) -> String {
    format!("File does not exist at {}", path)
}

pub struct ReadFile;

#[async_trait]
impl ToolAction for ReadFile {
    async fn execute(&self, args: Value) -> anyhow::Result<String> {
        let args: ReadFileArgs = serde_json::from_value(args)?;
        read_path(&args.path).await
    }
}

async fn read_path(path_str: &str) -> anyhow::Result<String> {
    let path = Path::new(path_str);
    if !path.exists() {
        return Ok(missing_file_message(path_str));
    }

    if path.is_dir() {
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(path).await?;
        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        names.sort();
        return Ok(format!("This is a directory. Contents:\n{}", names.join("\n")));
    }

    let bytes = tokio::fs::read(path).await?;
    Ok(String::from_utf8_lossy(&bytes).to_string())
}

pub struct CreateFile;

#[async_trait]
impl ToolAction for CreateFile {
    async fn execute(&self, args: Value) -> anyhow::Result<String> {
        let args: CreateFileArgs = serde_json::from_value(args)?;
        let path = Path::new(&args.path);

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, &args.content).await?;

        debug!(path = %args.path, bytes = args.content.len(), "file created");
        Ok(format!("File {} created successfully", args.path))
    }
}

pub struct EditFile;

#[async_trait]
impl ToolAction for EditFile {
    async fn execute(&self, args: Value) -> anyhow::Result<String> {
        let args: EditFileArgs = serde_json::from_value(args)?;
        let path = Path::new(&args.path);

        if !path.is_file() {
            return Ok(missing_file_message(&args.path));
        }

        let content = tokio::fs::read_to_string(path).await?;
        let updated = content.replacen(&args.old_string, &args.new_string, 1);
        tokio::fs::write(path, updated).await?;

        Ok(format!("Updated {} with new content", args.path))
    }
}

pub struct ListFiles;

#[async_trait]
impl ToolAction for ListFiles {
    async fn execute(&self, args: Value) -> anyhow::Result<String> {
        let args: ListFilesArgs = serde_json::from_value(args)?;
        let root = args.path.clone();
        // Directory walks are blocking
        tokio::task::spawn_blocking(move || list_tree(&root, DEFAULT_IGNORED)).await?
    }
}

fn build_ignore_set(patterns: &[&str]) -> anyhow::Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

/// Render `root` as an indented tree, directories suffixed with `/`
pub fn list_tree(root: &str, ignored: &[&str]) -> anyhow::Result<String> {
    let root_path = Path::new(root);
    if !root_path.is_dir() {
        return Ok(format!("Directory not found: {}", root));
    }

    let ignore = build_ignore_set(ignored)?;
    let mut lines = vec![root.to_string()];

    let walker = WalkDir::new(root_path)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !ignore.is_match(entry.file_name()));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!(error = %e, "skipping unreadable entry");
                continue;
            }
        };

        let indent = "  ".repeat(entry.depth());
        let name = entry.file_name().to_string_lossy();
        if entry.file_type().is_dir() {
            lines.push(format!("{}{}/", indent, name));
        } else {
            lines.push(format!("{}{}", indent, name));
        }
    }

    Ok(lines.join("\n"))
}
