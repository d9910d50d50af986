//! Test helpers shared by unit tests.

use std::sync::Arc;

use serde_json::Value;

use crate::context::StaticEnv;
use crate::tools::declarative::{ExecutorLimits, HttpExecutor, ToolDefinition, validate_definition};

/// Build a definition from a JSON literal, panicking on violations.
pub(crate) fn definition(raw: Value) -> ToolDefinition {
    validate_definition(&raw)
        .into_result()
        .unwrap_or_else(|violations| panic!("invalid test definition: {violations:?}"))
}

/// An executor over a fixed environment with default limits.
pub(crate) fn executor(env: StaticEnv) -> HttpExecutor {
    HttpExecutor::new(Arc::new(env), ExecutorLimits::default()).expect("HTTP client builds")
}
