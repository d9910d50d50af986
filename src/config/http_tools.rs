use std::path::PathBuf;
use std::time::Duration;

use crate::config::helpers::{optional_env, parse_positive_env};
use crate::context::EnvProvider;
use crate::error::ConfigError;
use crate::tools::declarative::{DEFAULT_TIMEOUT, ExecutorLimits, MAX_RESPONSE_SIZE, MAX_TIMEOUT};

/// Declarative HTTP tool configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpToolsConfig {
    /// Base directory; definitions are read from its `tools/` subdirectory
    /// (default: ~/.apiclaw/).
    pub base_dir: PathBuf,
    /// Timeout for definitions that do not declare one. Never above the ceiling.
    pub default_timeout: Duration,
    /// Response body size cap in bytes.
    pub max_response_bytes: usize,
}

impl HttpToolsConfig {
    pub(crate) fn resolve(
        env: &dyn EnvProvider,
        base_dir: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let base_dir = match base_dir {
            Some(dir) => dir,
            None => match optional_env(env, "HTTP_TOOLS_DIR") {
                Some(dir) => PathBuf::from(dir),
                None => default_base_dir()?,
            },
        };

        let timeout_ms = parse_positive_env(
            env,
            "HTTP_TOOLS_DEFAULT_TIMEOUT_MS",
            DEFAULT_TIMEOUT.as_millis() as u64,
        )?;
        let default_timeout = Duration::from_millis(timeout_ms);
        if default_timeout > MAX_TIMEOUT {
            tracing::warn!(
                configured_ms = timeout_ms,
                ceiling_ms = MAX_TIMEOUT.as_millis() as u64,
                "Default timeout exceeds ceiling, clamping"
            );
        }

        Ok(Self {
            base_dir,
            default_timeout: default_timeout.min(MAX_TIMEOUT),
            max_response_bytes: parse_positive_env(
                env,
                "HTTP_TOOLS_MAX_RESPONSE_BYTES",
                MAX_RESPONSE_SIZE,
            )?,
        })
    }

    /// Executor limits derived from this config.
    pub fn limits(&self) -> ExecutorLimits {
        ExecutorLimits {
            default_timeout: self.default_timeout,
            max_response_bytes: self.max_response_bytes,
        }
    }
}

fn default_base_dir() -> Result<PathBuf, ConfigError> {
    dirs::home_dir()
        .map(|home| home.join(".apiclaw"))
        .ok_or_else(|| ConfigError::MissingRequired {
            key: "HTTP_TOOLS_DIR".to_string(),
            hint: "No home directory found; set HTTP_TOOLS_DIR explicitly".to_string(),
        })
}
