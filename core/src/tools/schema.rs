//! Data-driven argument schemas.
//!
//! A schema is a list of named fields with a primitive type. It renders to
//! JSON Schema for the tool advertisement and validates completed calls.

use serde_json::{json, Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl FieldType {
    pub fn json_name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Array => "array",
            FieldType::Object => "object",
        }
    }

    fn accepts(&self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Integer => value.is_i64() || value.is_u64(),
            FieldType::Number => value.is_number(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Array => value.is_array(),
            FieldType::Object => value.is_object(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub field_type: FieldType,
    pub required: bool,
    pub description: Option<String>,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("Arguments must be an object, got {0}")]
    NotAnObject(&'static str),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Field {field} must be of type {expected}, got {actual}")]
    WrongType {
        field: String,
        expected: &'static str,
        actual: &'static str,
    },
}

/// Ordered set of fields a tool accepts
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgSchema {
    fields: Vec<FieldSpec>,
}

impl ArgSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(self, name: &str, field_type: FieldType) -> Self {
        self.field(name, field_type, true, None)
    }

    pub fn optional(self, name: &str, field_type: FieldType) -> Self {
        self.field(name, field_type, false, None)
    }

    pub fn field(mut self, name: &str, field_type: FieldType, required: bool, description: Option<&str>) -> Self {
        self.fields.push(FieldSpec {
            name: name.to_string(),
            field_type,
            required,
            description: description.map(str::to_string),
        });
        self
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// JSON Schema object advertised to the model
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for field in &self.fields {
            let mut property = json!({ "type": field.field_type.json_name() });
            if let Some(description) = &field.description {
                property["description"] = json!(description);
            }
            properties.insert(field.name.clone(), property);
        }

        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false
        })
    }

    /// Check `args` against the schema and return the accepted fields.
    ///
    /// Keys the schema does not declare are dropped from the result rather
    /// than rejected. A `null` optional field counts as absent.
    pub fn validate(&self, args: &Value) -> Result<Value, SchemaError> {
        let obj = args
            .as_object()
            .ok_or_else(|| SchemaError::NotAnObject(value_kind(args)))?;

        let mut accepted = Map::new();
        for field in &self.fields {
            match obj.get(&field.name) {
                None | Some(Value::Null) if field.required => {
                    return Err(SchemaError::MissingField(field.name.clone()));
                }
                None | Some(Value::Null) => {}
                Some(value) if !field.field_type.accepts(value) => {
                    return Err(SchemaError::WrongType {
                        field: field.name.clone(),
                        expected: field.field_type.json_name(),
                        actual: value_kind(value),
                    });
                }
                Some(value) => {
                    accepted.insert(field.name.clone(), value.clone());
                }
            }
        }

        Ok(Value::Object(accepted))
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
