//! Adapter exposing a definition through the [`Tool`] trait.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::context::InvocationContext;
use crate::tools::declarative::definition::ToolDefinition;
use crate::tools::declarative::executor::HttpExecutor;
use crate::tools::declarative::schema::parameters_schema;
use crate::tools::tool::{Tool, ToolError, ToolOutput};

/// A loaded definition bound to a shared executor.
pub struct DeclarativeTool {
    definition: Arc<ToolDefinition>,
    executor: Arc<HttpExecutor>,
    schema: Value,
}

impl DeclarativeTool {
    pub fn new(definition: ToolDefinition, executor: Arc<HttpExecutor>) -> Self {
        let schema = parameters_schema(&definition.parameters);
        Self {
            definition: Arc::new(definition),
            executor,
            schema,
        }
    }
}

impl std::fmt::Debug for DeclarativeTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeclarativeTool")
            .field("name", &self.definition.name)
            .field("allowed_hosts", &self.definition.allowed_hosts)
            .finish()
    }
}

#[async_trait]
impl Tool for DeclarativeTool {
    fn name(&self) -> &str {
        &self.definition.name
    }

    fn description(&self) -> &str {
        &self.definition.description
    }

    fn parameters_schema(&self) -> Value {
        self.schema.clone()
    }

    async fn execute(
        &self,
        params: Value,
        ctx: &InvocationContext,
    ) -> Result<ToolOutput, ToolError> {
        let params = match params {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(ToolError::InvalidParameters(format!(
                    "expected an object of arguments, got {}",
                    json_kind(&other)
                )));
            }
        };

        let start = Instant::now();
        let result = self
            .executor
            .execute(&self.definition, &params, &ctx.env_overrides)
            .await;
        let raw = result.summary.clone().or_else(|| result.error.clone());

        let value = serde_json::to_value(&result)
            .map_err(|e| ToolError::ExecutionFailed(format!("failed to encode result: {e}")))?;
        let output = ToolOutput::success(value, start.elapsed());

        Ok(match raw {
            Some(raw) => output.with_raw(raw),
            None => output,
        })
    }

    fn execution_timeout(&self) -> Duration {
        self.executor.timeout_for(&self.definition)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
