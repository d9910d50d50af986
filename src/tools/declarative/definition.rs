//! Tool definition types.
//!
//! A [`ToolDefinition`] is the typed form of one declarative tool file. It is
//! only ever produced by the validator in `loader.rs`, so every instance
//! satisfies the structural invariants checked there.
//!
//! # Example definition file
//!
//! ```yaml
//! name: slack_post
//! description: Post a message to a Slack channel
//! parameters:
//!   channel: { type: string, required: true, description: Channel ID }
//!   text: { type: string, required: true }
//! request:
//!   method: POST
//!   url: https://slack.com/api/chat.postMessage
//!   headers:
//!     Authorization: "Bearer {{env.SLACK_BOT_TOKEN}}"
//!   body:
//!     type: json
//!     content: { channel: "{{params.channel}}", text: "{{params.text}}" }
//!   timeout_ms: 10000
//! response:
//!   summary: "Posted message {{response.ts}}"
//!   error_template: "Slack returned {{response.status}}: {{response.error}}"
//! requires_env: [SLACK_BOT_TOKEN]
//! allowed_hosts: [slack.com]
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// One declarative HTTP tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, ParameterSpec>,
    pub request: RequestTemplate,
    #[serde(default)]
    pub response: ResponseTemplates,
    #[serde(default)]
    pub requires_env: Vec<String>,
    pub allowed_hosts: Vec<String>,
}

/// Primitive type of a declared parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    String,
    Number,
    Integer,
    Boolean,
}

impl ParameterType {
    pub const ALL: [&'static str; 4] = ["string", "number", "integer", "boolean"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "string" => Some(Self::String),
            "number" => Some(Self::Number),
            "integer" => Some(Self::Integer),
            "boolean" => Some(Self::Boolean),
            _ => None,
        }
    }
}

/// Declaration of a single call parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    #[serde(rename = "type")]
    pub param_type: ParameterType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
    /// Closed value set. Only valid on string parameters.
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}

/// HTTP method of the request template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub const ALL: [&'static str; 5] = ["GET", "POST", "PUT", "PATCH", "DELETE"];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "PATCH" => Some(Self::Patch),
            "DELETE" => Some(Self::Delete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outbound request, with `{{scope.key}}` placeholders still unresolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestTemplate {
    pub method: HttpMethod,
    pub url: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<BodyTemplate>,
    /// Requested timeout. Clamped to the executor's ceiling at call time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

/// How the request body is serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyKind {
    Json,
    Form,
    Text,
}

impl BodyKind {
    pub const ALL: [&'static str; 3] = ["json", "form", "text"];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyTemplate {
    #[serde(rename = "type")]
    pub kind: BodyKind,
    #[serde(default)]
    pub content: serde_json::Value,
}

/// Post-call rendering templates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseTemplates {
    /// Rendered on a 2xx response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Rendered on any other status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_template: Option<String>,
}
