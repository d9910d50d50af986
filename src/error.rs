//! Error types for apiclaw.

use std::time::Duration;

use crate::safety::EgressDenial;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Template resolution errors.
///
/// Only strict-mode `env` lookups can fail; every other scope degrades to an
/// empty string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
}

/// Reasons a single invocation stops before a usable response is obtained.
///
/// These never escape the executor; they are rendered into
/// [`ExecutionResult::error`](crate::tools::declarative::ExecutionResult).
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("Missing required environment variables: {}", .0.join(", "))]
    MissingEnvironment(Vec<String>),

    #[error("Template resolution failed: {0}")]
    Template(#[from] TemplateError),

    #[error("Egress blocked: {0}")]
    EgressBlocked(#[from] EgressDenial),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Response body exceeds maximum allowed size ({0} bytes)")]
    ResponseTooLarge(usize),
}

pub type Result<T> = std::result::Result<T, Error>;
