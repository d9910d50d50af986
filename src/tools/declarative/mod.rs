//! Declarative HTTP tools.
//!
//! A tool is a YAML or JSON file describing one HTTP call: its parameters,
//! a templated request, the hosts it may reach and the env vars it needs.
//!
//! ```text
//! <base>/tools/*.yaml ──► loader ──► ToolDefinition ──► schema (advertised)
//!                                          │
//!                      call args + env ──► executor ──► ExecutionResult
//!                                          │
//!                              template ◄──┴──► safety (egress guard)
//! ```

mod definition;
mod executor;
mod loader;
mod schema;
mod template;
mod tool;

pub use definition::{
    BodyKind, BodyTemplate, HttpMethod, ParameterSpec, ParameterType, RequestTemplate,
    ResponseTemplates, ToolDefinition,
};
pub use executor::{
    DEFAULT_TIMEOUT, ExecutionResult, ExecutorLimits, HttpExecutor, MAX_RESPONSE_SIZE,
    MAX_TIMEOUT, effective_timeout,
};
pub use loader::{
    DefinitionLoader, LoadReport, RejectedDefinition, SourceFormat, TOOLS_SUBDIR,
    ValidationOutcome, Violation, load_definitions, parse_definition, validate_definition,
};
pub use schema::parameters_schema;
pub use template::{
    CallContext, EnvMode, interpolate_str, interpolate_url, interpolate_value, value_to_text,
};
pub use tool::DeclarativeTool;
