//! Per-invocation context and environment access.

mod env;

use std::collections::HashMap;

pub use env::{EnvProvider, ProcessEnv, StaticEnv};

/// Data the host hands over with each tool invocation.
#[derive(Debug, Clone, Default)]
pub struct InvocationContext {
    /// Call-scoped environment overrides, layered on top of the provider's snapshot.
    pub env_overrides: HashMap<String, String>,
}

impl InvocationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a call-scoped environment override.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_overrides.insert(key.into(), value.into());
        self
    }
}
