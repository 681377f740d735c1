pub mod types;
pub mod schema;
pub mod registry;
pub mod dispatcher;
pub mod executors;

#[cfg(test)]
pub mod tests;

pub use types::*;
pub use schema::{ArgSchema, FieldType, SchemaError};
pub use registry::{RegistryError, ToolDefinition, ToolRegistry};
pub use dispatcher::{DispatchOutcome, DispatchStatus, ToolDispatcher};
