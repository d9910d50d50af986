//! Configuration.
//!
//! Values come from an [`EnvProvider`]; the binary loads `.env` first, so a
//! `.env` file and real environment variables are interchangeable.

mod helpers;
mod http_tools;

use std::path::PathBuf;

pub use http_tools::HttpToolsConfig;

use crate::context::{EnvProvider, ProcessEnv};

/// Main configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub http_tools: HttpToolsConfig,
}

impl Config {
    /// Resolve configuration from the process environment.
    ///
    /// `base_dir` (CLI `--dir`) wins over `HTTP_TOOLS_DIR`; the home
    /// directory is only consulted when neither is set.
    pub fn from_env(base_dir: Option<PathBuf>) -> crate::Result<Self> {
        Self::resolve(&ProcessEnv, base_dir)
    }

    /// Resolve configuration from any environment provider.
    pub fn resolve(env: &dyn EnvProvider, base_dir: Option<PathBuf>) -> crate::Result<Self> {
        Ok(Self {
            http_tools: HttpToolsConfig::resolve(env, base_dir)?,
        })
    }
}
