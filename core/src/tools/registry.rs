use crate::tools::executors::{CreateFile, EditFile, ListFiles, ReadFile};
use crate::tools::schema::{ArgSchema, FieldType};
use crate::tools::types::{ToolAction, ToolSpec};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::error;

/// A tool the model may call
#[derive(Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub schema: ArgSchema,
    pub action: Arc<dyn ToolAction>,
}

impl ToolDefinition {
    pub fn new(name: &str, description: &str, schema: ArgSchema, action: impl ToolAction + 'static) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            schema,
            action: Arc::new(action),
        }
    }

    pub fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.schema.to_json_schema(),
        }
    }
}

impl fmt::Debug for ToolDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDefinition")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("Tool {0} is already registered")]
    DuplicateTool(String),
}

/// Order-preserving table of tools, built once at startup
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDefinition>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in filesystem tools
    pub fn with_builtin_tools() -> Self {
        let mut registry = Self::new();
        if let Err(e) = registry.register_builtin_tools() {
            error!(error = %e, "built-in tools clash with each other");
        }
        registry
    }

    /// Add the built-in filesystem tools after any already registered.
    /// Fails on the first name that is already taken.
    pub fn register_builtin_tools(&mut self) -> Result<(), RegistryError> {
        let path_only = || ArgSchema::new().required("path", FieldType::String);

        let builtins = [
            ToolDefinition::new("read_file", "Read a file from the local file system", path_only(), ReadFile),
            ToolDefinition::new(
                "create_file",
                "Create a file in the local file system",
                ArgSchema::new()
                    .required("path", FieldType::String)
                    .required("content", FieldType::String),
                CreateFile,
            ),
            ToolDefinition::new(
                "edit_file",
                "Edit a file in the local file system",
                ArgSchema::new()
                    .required("path", FieldType::String)
                    .required("old_string", FieldType::String)
                    .required("new_string", FieldType::String),
                EditFile,
            ),
            ToolDefinition::new("list_files", "List files in a directory", path_only(), ListFiles),
        ];

        for tool in builtins {
            self.register(tool)?;
        }
        Ok(())
    }

    /// Add a tool. Names must be unique.
    pub fn register(&mut self, tool: ToolDefinition) -> Result<(), RegistryError> {
        if self.index.contains_key(&tool.name) {
            return Err(RegistryError::DuplicateTool(tool.name));
        }
        self.index.insert(tool.name.clone(), self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Builder form of [`register`](Self::register)
    pub fn with_tool(mut self, tool: ToolDefinition) -> Result<Self, RegistryError> {
        self.register(tool)?;
        Ok(self)
    }

    /// Advertisement list, in registration order
    pub fn get_all_specs(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(ToolDefinition::spec).collect()
    }

    /// Look up a tool by name
    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
