use super::*;
use crate::tools::{ArgSchema, FieldType, RegistryError, ToolDefinition, ToolRegistry};
use serde_json::json;

#[tokio::test]
async fn test_tool_registry_creation() {
    let registry = ToolRegistry::new();
    assert!(registry.is_empty());
    assert!(registry.get_all_specs().is_empty());
}

#[tokio::test]
async fn test_builtin_tools_in_registration_order() {
    let registry = ToolRegistry::with_builtin_tools();

    assert_eq!(registry.names(), vec!["read_file", "create_file", "edit_file", "list_files"]);

    let specs = registry.get_all_specs();
    let spec_names: Vec<&str> = specs.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(spec_names, registry.names());

    // Verify each tool has required fields
    for spec in &specs {
        assert!(!spec.description.is_empty());
        assert_eq!(spec.input_schema["type"], "object");
        assert!(spec.input_schema["properties"].is_object());
    }
}

#[tokio::test]
async fn test_tool_registry_get_by_name() {
    let registry = ToolRegistry::with_builtin_tools();

    let edit = registry.get("edit_file").unwrap();
    assert_eq!(edit.description, "Edit a file in the local file system");
    let required: Vec<&str> = edit
        .schema
        .fields()
        .iter()
        .filter(|f| f.required)
        .map(|f| f.name.as_str())
        .collect();
    assert_eq!(required, vec!["path", "old_string", "new_string"]);

    assert!(registry.get("delete_file").is_none());
    // Lookups are exact
    assert!(registry.get("READ_FILE").is_none());
}

#[tokio::test]
async fn test_lookup_is_stable() {
    let registry = ToolRegistry::with_builtin_tools();
    let first = registry.get("list_files").map(|t| t.name.clone());
    let second = registry.get("list_files").map(|t| t.name.clone());
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_duplicate_names_are_rejected() {
    let mut registry = ToolRegistry::with_builtin_tools();
    let duplicate = ToolDefinition::new(
        "read_file",
        "A second reader",
        ArgSchema::new().required("path", FieldType::String),
        CountingAction::default(),
    );

    let result = registry.register(duplicate);
    assert_eq!(result, Err(RegistryError::DuplicateTool("read_file".to_string())));
    assert_eq!(registry.len(), 4);
    assert_eq!(registry.get("read_file").unwrap().description, "Read a file from the local file system");
}

#[tokio::test]
async fn test_builtins_after_custom_tools() {
    let mut registry = ToolRegistry::new()
        .with_tool(ToolDefinition::new("echo", "Echo arguments", ArgSchema::new(), CountingAction::default()))
        .unwrap();
    registry.register_builtin_tools().unwrap();
    assert_eq!(registry.names(), vec!["echo", "read_file", "create_file", "edit_file", "list_files"]);

    let mut clashing = ToolRegistry::new()
        .with_tool(ToolDefinition::new(
            "create_file",
            "Custom writer",
            ArgSchema::new().required("path", FieldType::String),
            CountingAction::default(),
        ))
        .unwrap();
    let result = clashing.register_builtin_tools();
    assert_eq!(result, Err(RegistryError::DuplicateTool("create_file".to_string())));
    assert_eq!(clashing.get("create_file").unwrap().description, "Custom writer");
}

#[tokio::test]
async fn test_custom_tool_advertisement() {
    let registry = ToolRegistry::new()
        .with_tool(ToolDefinition::new(
            "word_count",
            "Count words in a file",
            ArgSchema::new()
                .field("path", FieldType::String, true, Some("File to count"))
                .optional("unique", FieldType::Boolean),
            CountingAction::default(),
        ))
        .unwrap();

    let spec = &registry.get_all_specs()[0];
    assert_eq!(spec.name, "word_count");
    assert_eq!(
        spec.input_schema,
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "File to count" },
                "unique": { "type": "boolean" }
            },
            "required": ["path"],
            "additionalProperties": false
        })
    );
}
