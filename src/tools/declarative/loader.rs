//! Definition loading and structural validation.
//!
//! Tool files live in `<base>/tools/` as YAML (`.yaml`, `.yml`) or JSON
//! (`.json`). Each file is parsed into a generic tree, normalized, and checked
//! field by field. Validation returns a [`ValidationOutcome`] rather than
//! logging and bailing, so rejection reasons can be inspected and tested.
//!
//! One bad file never affects its siblings: it is reported in
//! [`LoadReport::rejected`] and logged, and loading continues. Nothing is
//! cached; every [`DefinitionLoader::load`] call re-reads the directory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::tools::declarative::definition::{BodyKind, HttpMethod, ParameterType, ToolDefinition};

/// Subdirectory of the base directory holding tool files.
pub const TOOLS_SUBDIR: &str = "tools";

const MAX_NAME_LEN: usize = 64;

static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9_]*$").expect("name pattern is a valid regex"));

/// A single structural problem with a definition file.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Violation {
    #[error("failed to read file: {0}")]
    Unreadable(String),

    #[error("failed to parse: {0}")]
    Parse(String),

    #[error("definition must be a mapping at the top level")]
    NotAMapping,

    #[error("missing required field '{0}'")]
    MissingField(String),

    #[error("field '{field}' must be {expected}")]
    WrongType {
        field: String,
        expected: &'static str,
    },

    #[error("field '{0}' must not be empty")]
    Empty(String),

    #[error("name '{0}' must be a lowercase identifier (^[a-z][a-z0-9_]*$, at most 64 chars)")]
    InvalidName(String),

    #[error("unsupported HTTP method '{0}' (expected one of GET, POST, PUT, PATCH, DELETE)")]
    InvalidMethod(String),

    #[error("parameter '{param}' has unknown type '{found}' (want string/number/integer/boolean)")]
    UnknownParameterType { param: String, found: String },

    #[error("parameter '{0}' declares 'enum', which is only supported on string parameters")]
    EnumOnNonString(String),

    #[error("unknown body type '{0}' (expected json, form or text)")]
    InvalidBodyKind(String),

    #[error("a definition named '{name}' was already loaded from {first}")]
    DuplicateName { name: String, first: String },

    #[error("malformed definition: {0}")]
    Malformed(String),
}

/// Result of validating one definition.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    Valid(ToolDefinition),
    Invalid(Vec<Violation>),
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    pub fn into_result(self) -> Result<ToolDefinition, Vec<Violation>> {
        match self {
            Self::Valid(def) => Ok(def),
            Self::Invalid(violations) => Err(violations),
        }
    }
}

/// Serialization format of a definition file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Yaml,
    Json,
}

impl SourceFormat {
    /// Detect the format from the file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// A file that failed validation.
#[derive(Debug, Clone)]
pub struct RejectedDefinition {
    pub path: PathBuf,
    pub violations: Vec<Violation>,
}

/// Everything one load pass found.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub definitions: Vec<ToolDefinition>,
    pub rejected: Vec<RejectedDefinition>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Reads tool definitions from `<base>/tools/`.
#[derive(Debug, Clone)]
pub struct DefinitionLoader {
    dir: PathBuf,
}

impl DefinitionLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            dir: base_dir.as_ref().join(TOOLS_SUBDIR),
        }
    }

    /// The directory scanned for tool files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Scan the directory and validate every tool file.
    ///
    /// A missing directory yields an empty report.
    pub fn load(&self) -> LoadReport {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(dir = %self.dir.display(), "No tool definitions directory");
                return LoadReport::default();
            }
            Err(e) => {
                tracing::warn!(
                    dir = %self.dir.display(),
                    error = %e,
                    "Failed to read tool definitions directory"
                );
                return LoadReport::default();
            }
        };

        let mut paths: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        paths.sort();

        let mut report = LoadReport::default();
        let mut seen: HashMap<String, PathBuf> = HashMap::new();

        for path in paths {
            let Some(format) = SourceFormat::from_path(&path) else {
                tracing::debug!(path = %path.display(), "Skipping non-definition file");
                continue;
            };

            let outcome = match std::fs::read_to_string(&path) {
                Ok(source) => parse_definition(&source, format),
                Err(e) => ValidationOutcome::Invalid(vec![Violation::Unreadable(e.to_string())]),
            };

            let violations = match outcome {
                ValidationOutcome::Valid(def) => match seen.get(&def.name) {
                    Some(first) => vec![Violation::DuplicateName {
                        name: def.name,
                        first: first.display().to_string(),
                    }],
                    None => {
                        seen.insert(def.name.clone(), path);
                        report.definitions.push(def);
                        continue;
                    }
                },
                ValidationOutcome::Invalid(violations) => violations,
            };

            tracing::warn!(
                path = %path.display(),
                violations = %join_violations(&violations),
                "Rejected tool definition"
            );
            report.rejected.push(RejectedDefinition { path, violations });
        }

        tracing::info!(
            dir = %self.dir.display(),
            loaded = report.definitions.len(),
            rejected = report.rejected.len(),
            "Loaded declarative tool definitions"
        );

        report
    }
}

/// Load the valid definitions under `<base_dir>/tools/`, discarding the rest.
pub fn load_definitions(base_dir: impl AsRef<Path>) -> Vec<ToolDefinition> {
    DefinitionLoader::new(base_dir).load().definitions
}

/// Parse and validate a definition from source text.
pub fn parse_definition(source: &str, format: SourceFormat) -> ValidationOutcome {
    let parsed = match format {
        SourceFormat::Yaml => serde_yml::from_str::<Value>(source).map_err(|e| e.to_string()),
        SourceFormat::Json => serde_json::from_str::<Value>(source).map_err(|e| e.to_string()),
    };

    match parsed {
        Ok(raw) => validate_definition(&raw),
        Err(e) => ValidationOutcome::Invalid(vec![Violation::Parse(e)]),
    }
}

/// Validate a parsed definition tree.
///
/// Every violation found is reported, not just the first.
pub fn validate_definition(raw: &Value) -> ValidationOutcome {
    let Some(obj) = raw.as_object() else {
        return ValidationOutcome::Invalid(vec![Violation::NotAMapping]);
    };
    let normalized = normalize(obj);

    let mut violations = Vec::new();
    check_name(normalized.get("name"), &mut violations);
    check_description(normalized.get("description"), &mut violations);
    check_request(normalized.get("request"), &mut violations);
    check_allowed_hosts(normalized.get("allowed_hosts"), &mut violations);
    if let Some(params) = normalized.get("parameters") {
        check_parameters(params, &mut violations);
    }
    if let Some(required) = normalized.get("requires_env")
        && !is_string_list(required)
    {
        violations.push(Violation::WrongType {
            field: "requires_env".to_string(),
            expected: "a list of non-empty strings",
        });
    }
    if let Some(response) = normalized.get("response") {
        check_response(response, &mut violations);
    }

    if !violations.is_empty() {
        return ValidationOutcome::Invalid(violations);
    }

    match serde_json::from_value::<ToolDefinition>(Value::Object(normalized)) {
        Ok(def) => ValidationOutcome::Valid(def),
        Err(e) => ValidationOutcome::Invalid(vec![Violation::Malformed(e.to_string())]),
    }
}

/// Treat `null` as absent in structural positions, uppercase the method and
/// stringify scalar header values (`X-Version: 2` in YAML).
///
/// Body content and parameter defaults are left exactly as written.
fn normalize(raw: &Map<String, Value>) -> Map<String, Value> {
    let mut top = without_nulls(raw);

    if let Some(Value::Object(request)) = top.get_mut("request") {
        *request = without_nulls(request);
        if let Some(Value::String(method)) = request.get_mut("method") {
            *method = method.trim().to_uppercase();
        }
        if let Some(Value::Object(headers)) = request.get_mut("headers") {
            for value in headers.values_mut() {
                if let Value::Number(_) | Value::Bool(_) = value {
                    *value = Value::String(value.to_string());
                }
            }
        }
    }

    if let Some(Value::Object(response)) = top.get_mut("response") {
        *response = without_nulls(response);
    }

    if let Some(Value::Object(params)) = top.get_mut("parameters") {
        for spec in params.values_mut() {
            if let Value::Object(fields) = spec {
                *fields = without_nulls(fields);
            }
        }
    }

    top
}

fn without_nulls(map: &Map<String, Value>) -> Map<String, Value> {
    map.iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

fn is_valid_name(name: &str) -> bool {
    name.len() <= MAX_NAME_LEN && NAME_PATTERN.is_match(name)
}

fn is_string_list(value: &Value) -> bool {
    value.as_array().is_some_and(|items| {
        items
            .iter()
            .all(|item| item.as_str().is_some_and(|s| !s.trim().is_empty()))
    })
}

fn wrong_type(field: impl Into<String>, expected: &'static str) -> Violation {
    Violation::WrongType {
        field: field.into(),
        expected,
    }
}

fn check_name(value: Option<&Value>, violations: &mut Vec<Violation>) {
    match value {
        None => violations.push(Violation::MissingField("name".to_string())),
        Some(Value::String(name)) if !is_valid_name(name) => {
            violations.push(Violation::InvalidName(name.clone()));
        }
        Some(Value::String(_)) => {}
        Some(_) => violations.push(wrong_type("name", "a string")),
    }
}

fn check_description(value: Option<&Value>, violations: &mut Vec<Violation>) {
    match value {
        None => violations.push(Violation::MissingField("description".to_string())),
        Some(Value::String(s)) if s.trim().is_empty() => {
            violations.push(Violation::Empty("description".to_string()));
        }
        Some(Value::String(_)) => {}
        Some(_) => violations.push(wrong_type("description", "a string")),
    }
}

fn check_request(value: Option<&Value>, violations: &mut Vec<Violation>) {
    let request = match value {
        None => {
            violations.push(Violation::MissingField("request".to_string()));
            return;
        }
        Some(Value::Object(request)) => request,
        Some(_) => {
            violations.push(wrong_type("request", "a mapping"));
            return;
        }
    };

    match request.get("method") {
        None => violations.push(Violation::MissingField("request.method".to_string())),
        Some(Value::String(m)) if HttpMethod::parse(m).is_none() => {
            violations.push(Violation::InvalidMethod(m.clone()));
        }
        Some(Value::String(_)) => {}
        Some(_) => violations.push(wrong_type("request.method", "a string")),
    }

    match request.get("url") {
        None => violations.push(Violation::MissingField("request.url".to_string())),
        Some(Value::String(url)) if url.trim().is_empty() => {
            violations.push(Violation::Empty("request.url".to_string()));
        }
        Some(Value::String(_)) => {}
        Some(_) => violations.push(wrong_type("request.url", "a string")),
    }

    match request.get("headers") {
        None => {}
        Some(Value::Object(headers)) => {
            for (name, value) in headers {
                if !value.is_string() {
                    violations.push(wrong_type(format!("request.headers.{name}"), "a string"));
                }
            }
        }
        Some(_) => violations.push(wrong_type("request.headers", "a mapping of strings")),
    }

    match request.get("body") {
        None => {}
        Some(Value::Object(body)) => match body.get("type") {
            None | Some(Value::Null) => {
                violations.push(Violation::MissingField("request.body.type".to_string()));
            }
            Some(Value::String(kind)) if !BodyKind::ALL.contains(&kind.as_str()) => {
                violations.push(Violation::InvalidBodyKind(kind.clone()));
            }
            Some(Value::String(kind)) => {
                if kind == "form" && !body.get("content").is_some_and(Value::is_object) {
                    violations.push(wrong_type(
                        "request.body.content",
                        "a mapping for form bodies",
                    ));
                }
            }
            Some(_) => violations.push(wrong_type("request.body.type", "a string")),
        },
        Some(_) => violations.push(wrong_type(
            "request.body",
            "a mapping with 'type' and 'content'",
        )),
    }

    if let Some(timeout) = request.get("timeout_ms")
        && !timeout.as_u64().is_some_and(|ms| ms > 0)
    {
        violations.push(wrong_type("request.timeout_ms", "a positive integer"));
    }
}

fn check_allowed_hosts(value: Option<&Value>, violations: &mut Vec<Violation>) {
    match value {
        None => violations.push(Violation::MissingField("allowed_hosts".to_string())),
        Some(Value::Array(hosts)) if hosts.is_empty() => {
            violations.push(Violation::Empty("allowed_hosts".to_string()));
        }
        Some(hosts) if is_string_list(hosts) => {}
        Some(_) => violations.push(wrong_type("allowed_hosts", "a list of non-empty strings")),
    }
}

fn check_parameters(value: &Value, violations: &mut Vec<Violation>) {
    let Some(params) = value.as_object() else {
        violations.push(wrong_type("parameters", "a mapping"));
        return;
    };

    for (name, spec) in params {
        let Some(spec) = spec.as_object() else {
            violations.push(wrong_type(format!("parameters.{name}"), "a mapping"));
            continue;
        };

        let param_type = match spec.get("type") {
            None => {
                violations.push(Violation::MissingField(format!("parameters.{name}.type")));
                None
            }
            Some(Value::String(found)) => {
                let parsed = ParameterType::parse(found);
                if parsed.is_none() {
                    violations.push(Violation::UnknownParameterType {
                        param: name.clone(),
                        found: found.clone(),
                    });
                }
                parsed
            }
            Some(_) => {
                violations.push(wrong_type(format!("parameters.{name}.type"), "a string"));
                None
            }
        };

        if spec.get("required").is_some_and(|r| !r.is_boolean()) {
            violations.push(wrong_type(format!("parameters.{name}.required"), "a boolean"));
        }
        if spec.get("description").is_some_and(|d| !d.is_string()) {
            violations.push(wrong_type(
                format!("parameters.{name}.description"),
                "a string",
            ));
        }

        if let Some(values) = spec.get("enum") {
            if param_type.is_some_and(|t| t != ParameterType::String) {
                violations.push(Violation::EnumOnNonString(name.clone()));
            } else if !values
                .as_array()
                .is_some_and(|items| !items.is_empty() && items.iter().all(Value::is_string))
            {
                violations.push(wrong_type(
                    format!("parameters.{name}.enum"),
                    "a non-empty list of strings",
                ));
            }
        }
    }
}

fn check_response(value: &Value, violations: &mut Vec<Violation>) {
    let Some(response) = value.as_object() else {
        violations.push(wrong_type("response", "a mapping"));
        return;
    };
    for field in ["summary", "error_template"] {
        if response.get(field).is_some_and(|v| !v.is_string()) {
            violations.push(wrong_type(format!("response.{field}"), "a string"));
        }
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(Violation::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
