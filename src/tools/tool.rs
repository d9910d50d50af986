//! Tool trait and types.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::context::InvocationContext;

/// Error type for tool invocation.
///
/// Upstream failures are not errors: they come back inside a successful
/// [`ToolOutput`] so the caller can read status and body.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}

/// Output from a tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    pub result: Value,
    pub duration: Duration,
    /// Human-readable line for display: the rendered summary or error text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl ToolOutput {
    pub fn success(result: Value, duration: Duration) -> Self {
        Self {
            result,
            duration,
            raw: None,
        }
    }

    pub fn with_raw(mut self, raw: impl Into<String>) -> Self {
        self.raw = Some(raw.into());
        self
    }
}

/// A tool as advertised to the calling framework.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// A callable tool.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema for the tool's arguments.
    fn parameters_schema(&self) -> Value;

    /// Invoke the tool with caller-supplied arguments.
    async fn execute(
        &self,
        params: Value,
        ctx: &InvocationContext,
    ) -> Result<ToolOutput, ToolError>;

    /// Longest time one invocation may take.
    fn execution_timeout(&self) -> Duration {
        Duration::from_secs(60)
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

const PROPERTY_TYPES: [&str; 6] = ["string", "number", "integer", "boolean", "object", "array"];

/// Registration-time sanity check of a tool's argument schema.
///
/// Returns one message per problem; empty means the schema is usable.
///
/// - the root (and any nested object) is `"type": "object"` with `"properties"`
/// - every `"required"` key names a declared property
/// - property types are known JSON Schema types, and arrays declare `"items"`
/// - `enum` on a string property lists only strings
///
/// Properties with no `"type"` are accepted as freeform.
pub fn validate_tool_schema(schema: &Value, path: &str) -> Vec<String> {
    let mut errors = Vec::new();
    check_object_schema(schema, path, &mut errors);
    errors
}

fn check_object_schema(schema: &Value, path: &str, errors: &mut Vec<String>) {
    match schema.get("type").and_then(Value::as_str) {
        Some("object") => {}
        Some(other) => {
            errors.push(format!("{path}: expected type \"object\", got \"{other}\""));
            return;
        }
        None => {
            errors.push(format!("{path}: missing \"type\": \"object\""));
            return;
        }
    }

    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        errors.push(format!("{path}: missing or non-object \"properties\""));
        return;
    };

    match schema.get("required") {
        None => {}
        Some(Value::Array(required)) => {
            for key in required {
                match key.as_str() {
                    Some(key) if properties.contains_key(key) => {}
                    Some(key) => errors.push(format!(
                        "{path}: required key \"{key}\" not found in properties"
                    )),
                    None => errors.push(format!("{path}: \"required\" entries must be strings")),
                }
            }
        }
        Some(_) => errors.push(format!("{path}: \"required\" must be an array")),
    }

    for (key, prop) in properties {
        check_property(prop, &format!("{path}.{key}"), errors);
    }
}

fn check_property(prop: &Value, path: &str, errors: &mut Vec<String>) {
    let Some(prop_type) = prop.get("type").and_then(Value::as_str) else {
        return;
    };

    match prop_type {
        "object" => check_object_schema(prop, path, errors),
        "array" => match prop.get("items") {
            Some(items) if items.get("type").and_then(Value::as_str) == Some("object") => {
                check_object_schema(items, &format!("{path}.items"), errors);
            }
            Some(_) => {}
            None => errors.push(format!("{path}: array property missing \"items\"")),
        },
        "string" => {
            if let Some(values) = prop.get("enum")
                && !values
                    .as_array()
                    .is_some_and(|items| items.iter().all(Value::is_string))
            {
                errors.push(format!("{path}: string enum must list only strings"));
            }
        }
        other if !PROPERTY_TYPES.contains(&other) => {
            errors.push(format!("{path}: unknown type \"{other}\""));
        }
        _ => {}
    }
}
