//! Declarative HTTP tools for AI agents.
//!
//! A tool is a YAML or JSON file describing one outbound HTTP call: the request
//! template, the parameters an agent may supply, the environment variables it
//! needs and the hosts it may reach. This crate loads and validates those files,
//! derives a JSON Schema for each tool's arguments, and executes one guarded
//! request per invocation.
//!
//! # Architecture
//!
//! ```text
//!   <base>/tools/*.yaml ──► Loader ──► ToolDefinition ──┬──► Schema builder ──► JSON Schema
//!                                                       │
//!   params + env overrides ─────────────────────────────┴──► HttpExecutor ──► ExecutionResult
//!                                                                │
//!                                   template engine ◄────────────┤
//!                                   egress guard    ◄────────────┘
//! ```
//!
//! # Safety
//!
//! - Private, loopback, link-local and cloud-metadata hosts are always blocked
//! - DNS answers pointing at such addresses fail the connection
//! - Every other host must match the definition's allow-list
//! - Required environment variables are checked before any network access
//! - Request timeouts are clamped to a hard ceiling and redirects are never followed

pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod safety;
pub mod tools;

#[cfg(test)]
pub(crate) mod testing;

pub use config::Config;
pub use error::{Error, Result};
