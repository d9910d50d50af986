//! Environment variable providers.
//!
//! Tool execution never reads `std::env` directly. It asks an [`EnvProvider`]
//! for a snapshot, so tests and embedding hosts can supply a deterministic
//! environment without touching process-global state.

use std::collections::HashMap;

/// Source of environment variables.
pub trait EnvProvider: Send + Sync {
    /// Look up a single variable.
    fn get(&self, key: &str) -> Option<String>;

    /// Snapshot of every variable this provider exposes.
    fn snapshot(&self) -> HashMap<String, String>;

    /// Snapshot overlaid with call-scoped overrides (overrides win).
    fn merged(&self, overrides: &HashMap<String, String>) -> HashMap<String, String> {
        let mut env = self.snapshot();
        env.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        env
    }
}

/// The real process environment.
///
/// Variables whose name or value is not valid unicode are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvProvider for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }

    fn snapshot(&self) -> HashMap<String, String> {
        std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect()
    }
}

/// A fixed, in-memory environment.
#[derive(Debug, Clone, Default)]
pub struct StaticEnv {
    vars: HashMap<String, String>,
}

impl StaticEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }
}

impl<K, V> FromIterator<(K, V)> for StaticEnv
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl EnvProvider for StaticEnv {
    fn get(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }

    fn snapshot(&self) -> HashMap<String, String> {
        self.vars.clone()
    }
}
