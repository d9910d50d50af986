//! Tool system.
//!
//! Tools are the agent's interface to external HTTP APIs. Each one is
//! described declaratively and executed by a shared, guarded executor.

pub mod declarative;

mod registry;
mod tool;

pub use registry::{ToolRegistry, declarative_tools};
pub use tool::{Tool, ToolError, ToolOutput, ToolSchema, validate_tool_schema};
