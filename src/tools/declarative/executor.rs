//! Guarded HTTP executor.
//!
//! One [`HttpExecutor::execute`] call turns a definition plus call arguments
//! into exactly one HTTP exchange:
//!
//! 1. required env vars present (all missing names reported together)
//! 2. URL resolved in strict mode, then checked by the egress guard
//! 3. headers and body resolved in strict mode
//! 4. request sent under a deadline clamped to [`MAX_TIMEOUT`]
//! 5. response parsed, summary or error template rendered leniently
//!
//! The executor never returns an error: every failure is folded into an
//! [`ExecutionResult`] with `success: false`.

use std::collections::{BTreeMap, HashMap};
use std::error::Error as _;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

use crate::context::EnvProvider;
use crate::error::ExecutionError;
use crate::safety::{GuardedResolver, HostAllowlist, check_egress};
use crate::tools::declarative::definition::{BodyKind, BodyTemplate, ToolDefinition};
use crate::tools::declarative::template::{
    CallContext, EnvMode, interpolate_str, interpolate_url, interpolate_value, value_to_text,
};

/// Timeout used when a definition does not declare one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Hard ceiling on any request, whatever the definition or config asks for.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(120);

/// Maximum response body size (5 MB).
pub const MAX_RESPONSE_SIZE: usize = 5 * 1024 * 1024;

/// Normalized outcome of one invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl ExecutionResult {
    /// A failure that never produced a response.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            status: None,
            data: None,
            error: Some(error.into()),
            summary: None,
        }
    }
}

/// Tunable limits, both clamped against the hard constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorLimits {
    pub default_timeout: Duration,
    pub max_response_bytes: usize,
}

impl Default for ExecutorLimits {
    fn default() -> Self {
        Self {
            default_timeout: DEFAULT_TIMEOUT,
            max_response_bytes: MAX_RESPONSE_SIZE,
        }
    }
}

/// The timeout actually applied: declared (or default), never above [`MAX_TIMEOUT`].
pub fn effective_timeout(declared_ms: Option<u64>, default: Duration) -> Duration {
    declared_ms
        .map(Duration::from_millis)
        .unwrap_or(default)
        .min(MAX_TIMEOUT)
}

/// Executes declarative tool definitions.
///
/// Holds no per-call state; one executor can serve concurrent invocations.
pub struct HttpExecutor {
    client: Client,
    env: Arc<dyn EnvProvider>,
    limits: ExecutorLimits,
}

impl HttpExecutor {
    /// Create an executor with its own HTTP client.
    ///
    /// The client never follows redirects: a 3xx could point at an internal
    /// host the egress guard never saw. Names resolve through
    /// [`GuardedResolver`], so an allow-listed host whose DNS answer is
    /// private fails to connect.
    pub fn new(env: Arc<dyn EnvProvider>, limits: ExecutorLimits) -> crate::Result<Self> {
        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .dns_resolver(Arc::new(GuardedResolver))
            .user_agent(concat!("apiclaw/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self::with_client(client, env, limits))
    }

    /// Create an executor around an existing client.
    ///
    /// The caller is responsible for the client's redirect policy.
    pub fn with_client(client: Client, env: Arc<dyn EnvProvider>, limits: ExecutorLimits) -> Self {
        Self { client, env, limits }
    }

    pub fn limits(&self) -> ExecutorLimits {
        self.limits
    }

    /// Effective timeout for a definition under this executor's limits.
    pub fn timeout_for(&self, def: &ToolDefinition) -> Duration {
        effective_timeout(def.request.timeout_ms, self.limits.default_timeout)
    }

    /// Run one invocation. Always returns a result.
    pub async fn execute(
        &self,
        def: &ToolDefinition,
        params: &Map<String, Value>,
        env_overrides: &HashMap<String, String>,
    ) -> ExecutionResult {
        let start = Instant::now();

        let result = match self.run(def, params, env_overrides).await {
            Ok(result) => result,
            Err(e) => {
                tracing::debug!(tool = %def.name, error = %e, "Tool invocation failed");
                ExecutionResult::failure(e.to_string())
            }
        };

        tracing::debug!(
            tool = %def.name,
            success = result.success,
            status = ?result.status,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Tool invocation finished"
        );

        result
    }

    async fn run(
        &self,
        def: &ToolDefinition,
        params: &Map<String, Value>,
        env_overrides: &HashMap<String, String>,
    ) -> Result<ExecutionResult, ExecutionError> {
        let env = self.env.merged(env_overrides);
        let missing: Vec<String> = def
            .requires_env
            .iter()
            .filter(|key| !env.contains_key(key.as_str()))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(ExecutionError::MissingEnvironment(missing));
        }

        let ctx = CallContext::new(env, params.clone());

        let resolved = interpolate_url(&def.request.url, &ctx)?;
        // The resolved URL may carry secrets, so it is never echoed back.
        let url = Url::parse(resolved.trim()).map_err(|e| {
            ExecutionError::InvalidRequest(format!("resolved URL is not a valid absolute URL: {e}"))
        })?;
        let host = check_egress(&url, &HostAllowlist::new(&def.allowed_hosts))?;

        let mut headers = build_headers(&def.request.headers, &ctx)?;
        let body = def
            .request
            .body
            .as_ref()
            .map(|template| encode_body(template, &ctx, &mut headers))
            .transpose()?;

        let timeout = self.timeout_for(def);

        tracing::debug!(
            tool = %def.name,
            method = %def.request.method,
            host = %host,
            timeout_ms = timeout.as_millis() as u64,
            "Sending tool request"
        );

        let mut request = self
            .client
            .request(def.request.method.into(), url)
            .headers(headers);
        if let Some(body) = body {
            request = request.body(body);
        }

        // Dropping the exchange future on expiry aborts the request and
        // releases its connection.
        let (status, data) = tokio::time::timeout(timeout, self.exchange(request))
            .await
            .map_err(|_| ExecutionError::Timeout(timeout))??;

        Ok(finish(def, ctx, status, data))
    }

    /// Send the request and read the body under the size cap.
    async fn exchange(
        &self,
        request: RequestBuilder,
    ) -> Result<(StatusCode, Value), ExecutionError> {
        let max = self.limits.max_response_bytes;
        let response = request.send().await.map_err(network_error)?;
        let status = response.status();

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(is_json_content_type);

        // Reject obviously oversized responses before downloading anything.
        if let Some(len) = response.content_length()
            && len > max as u64
        {
            tracing::warn!(
                content_length = len,
                max,
                "Rejected response: Content-Length exceeds limit"
            );
            return Err(ExecutionError::ResponseTooLarge(max));
        }

        // Content-Length may be absent or wrong, so the cap is enforced while streaming.
        let mut body = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(network_error)?;
            if body.len() + chunk.len() > max {
                return Err(ExecutionError::ResponseTooLarge(max));
            }
            body.extend_from_slice(&chunk);
        }

        Ok((status, parse_payload(&body, is_json)))
    }
}

fn build_headers(
    templates: &BTreeMap<String, String>,
    ctx: &CallContext,
) -> Result<HeaderMap, ExecutionError> {
    let mut headers = HeaderMap::with_capacity(templates.len());
    for (name, template) in templates {
        let value = interpolate_str(template, ctx, EnvMode::Strict)?;
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ExecutionError::InvalidRequest(format!("invalid header name '{name}'")))?;
        let header_value = HeaderValue::from_str(&value).map_err(|_| {
            ExecutionError::InvalidRequest(format!("header '{name}' resolved to an invalid value"))
        })?;
        headers.insert(header_name, header_value);
    }
    Ok(headers)
}

/// Resolve and serialize the body, adding a default content type where the
/// body kind has one and no header already sets it.
fn encode_body(
    template: &BodyTemplate,
    ctx: &CallContext,
    headers: &mut HeaderMap,
) -> Result<Vec<u8>, ExecutionError> {
    let content = interpolate_value(&template.content, ctx, EnvMode::Strict)?;

    match template.kind {
        BodyKind::Json => {
            if !headers.contains_key(CONTENT_TYPE) {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            }
            serde_json::to_vec(&content).map_err(|e| {
                ExecutionError::InvalidRequest(format!("failed to serialize JSON body: {e}"))
            })
        }
        BodyKind::Form => {
            let Value::Object(fields) = &content else {
                return Err(ExecutionError::InvalidRequest(
                    "form body content must be a mapping".to_string(),
                ));
            };
            let mut form = url::form_urlencoded::Serializer::new(String::new());
            for (key, value) in fields {
                form.append_pair(key, &value_to_text(value));
            }
            if !headers.contains_key(CONTENT_TYPE) {
                headers.insert(
                    CONTENT_TYPE,
                    HeaderValue::from_static("application/x-www-form-urlencoded"),
                );
            }
            Ok(form.finish().into_bytes())
        }
        BodyKind::Text => Ok(value_to_text(&content).into_bytes()),
    }
}

fn is_json_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence.ends_with("/json") || essence.ends_with("+json")
}

/// JSON when the content type says so and it parses, otherwise text.
fn parse_payload(body: &[u8], is_json: bool) -> Value {
    if is_json
        && let Ok(value) = serde_json::from_slice::<Value>(body)
    {
        return value;
    }
    Value::String(String::from_utf8_lossy(body).into_owned())
}

/// Build the result and render the summary or error template.
fn finish(
    def: &ToolDefinition,
    ctx: CallContext,
    status: StatusCode,
    data: Value,
) -> ExecutionResult {
    let success = status.is_success();
    let mut result = ExecutionResult {
        success,
        status: Some(status.as_u16()),
        data: None,
        error: None,
        summary: None,
    };

    if success {
        if let Some(template) = &def.response.summary {
            let ctx = ctx.with_response(response_scope(&data, None));
            result.summary = render(&def.name, template, &ctx);
        }
    } else {
        let rendered = def.response.error_template.as_ref().and_then(|template| {
            let ctx = ctx.with_response(response_scope(&data, Some(status)));
            render(&def.name, template, &ctx)
        });
        result.error = Some(rendered.unwrap_or_else(|| default_error(status)));
    }

    result.data = Some(data);
    result
}

/// Response scope for post-call templates. Non-object payloads are wrapped
/// as `{value: payload}`; error rendering also gets the numeric `status`.
fn response_scope(payload: &Value, status: Option<StatusCode>) -> Value {
    let mut scope = match payload {
        Value::Object(map) => map.clone(),
        other => Map::from_iter([("value".to_string(), other.clone())]),
    };
    if let Some(status) = status {
        scope.insert("status".to_string(), Value::from(status.as_u16()));
    }
    Value::Object(scope)
}

fn render(tool: &str, template: &str, ctx: &CallContext) -> Option<String> {
    match interpolate_str(template, ctx, EnvMode::Lenient) {
        Ok(text) => Some(text),
        Err(e) => {
            tracing::warn!(tool, error = %e, "Failed to render response template");
            None
        }
    }
}

fn default_error(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("HTTP {} {}", status.as_u16(), reason),
        None => format!("HTTP {}", status.as_u16()),
    }
}

/// Describe a transport error without the request URL, which may hold secrets.
fn network_error(e: reqwest::Error) -> ExecutionError {
    if e.is_timeout() {
        return ExecutionError::Network("request timed out".to_string());
    }
    let e = e.without_url();
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    ExecutionError::Network(message)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::context::StaticEnv;
    use crate::testing::{definition, executor};

    fn ping(url: &str, hosts: &[&str]) -> ToolDefinition {
        definition(json!({
            "name": "ping",
            "description": "Ping",
            "request": { "method": "GET", "url": url },
            "allowed_hosts": hosts
        }))
    }

    #[tokio::test]
    async fn test_missing_env_lists_every_name() {
        let mut def = ping("https://api.example.com/", &["api.example.com"]);
        def.requires_env = vec![
            "NONEXISTENT_VAR_X".into(),
            "PRESENT".into(),
            "ALSO_MISSING".into(),
        ];
        let exec = executor(StaticEnv::new().with("PRESENT", "1"));

        let result = exec.execute(&def, &Map::new(), &HashMap::new()).await;
        assert!(!result.success);
        assert_eq!(result.status, None);
        let error = result.error.unwrap();
        assert!(error.contains("NONEXISTENT_VAR_X"), "{error}");
        assert!(error.contains("ALSO_MISSING"), "{error}");
        assert!(!error.contains("PRESENT,"), "{error}");
    }

    #[tokio::test]
    async fn test_env_overrides_satisfy_requirements() {
        // Requirement met by the override, then the request is stopped by the
        // egress guard, proving the env check passed.
        let mut def = ping("https://evil.com/", &["api.example.com"]);
        def.requires_env = vec!["TOKEN".into()];
        let exec = executor(StaticEnv::new());
        let overrides = HashMap::from([("TOKEN".to_string(), "abc".to_string())]);

        let result = exec.execute(&def, &Map::new(), &overrides).await;
        let error = result.error.unwrap();
        assert!(error.contains("not in the allowed hosts list"), "{error}");
    }

    #[tokio::test]
    async fn test_localhost_blocked_even_if_allowlisted() {
        let def = ping("http://localhost:8080/api", &["localhost"]);
        let result = executor(StaticEnv::new())
            .execute(&def, &Map::new(), &HashMap::new())
            .await;

        assert!(!result.success);
        assert!(result.error.unwrap().contains("private/internal"));
    }

    #[tokio::test]
    async fn test_host_not_allowlisted() {
        let def = ping("https://evil.com/steal", &["api.example.com"]);
        let result = executor(StaticEnv::new())
            .execute(&def, &Map::new(), &HashMap::new())
            .await;

        assert!(!result.success);
        let error = result.error.unwrap();
        assert!(error.contains("evil.com"), "{error}");
        assert!(error.contains("not in the allowed hosts list"), "{error}");
    }

    #[tokio::test]
    async fn test_templated_host_still_checked() {
        let def = ping("https://{{params.host}}/x", &["api.example.com"]);
        let params = json!({"host": "169.254.169.254"});
        let result = executor(StaticEnv::new())
            .execute(&def, params.as_object().unwrap(), &HashMap::new())
            .await;

        assert!(result.error.unwrap().contains("private/internal"));
    }

    #[tokio::test]
    async fn test_strict_url_template_failure() {
        let def = ping("https://api.example.com/?key={{env.API_KEY}}", &["api.example.com"]);
        let result = executor(StaticEnv::new())
            .execute(&def, &Map::new(), &HashMap::new())
            .await;

        let error = result.error.unwrap();
        assert!(error.contains("Template resolution failed"), "{error}");
        assert!(error.contains("API_KEY"), "{error}");
    }

    #[tokio::test]
    async fn test_strict_header_template_failure() {
        let mut def = ping("https://api.example.com/", &["api.example.com"]);
        def.request
            .headers
            .insert("Authorization".into(), "Bearer {{env.TOKEN}}".into());
        let result = executor(StaticEnv::new())
            .execute(&def, &Map::new(), &HashMap::new())
            .await;

        assert!(result.error.unwrap().contains("TOKEN"));
    }

    #[tokio::test]
    async fn test_relative_url_rejected_without_echo() {
        let def = ping("/relative?key={{env.KEY}}", &["api.example.com"]);
        let result = executor(StaticEnv::new().with("KEY", "s3cr3t"))
            .execute(&def, &Map::new(), &HashMap::new())
            .await;

        let error = result.error.unwrap();
        assert!(error.contains("not a valid absolute URL"), "{error}");
        assert!(!error.contains("s3cr3t"), "{error}");
    }

    #[test]
    fn test_effective_timeout_clamped() {
        assert_eq!(effective_timeout(None, DEFAULT_TIMEOUT), DEFAULT_TIMEOUT);
        assert_eq!(
            effective_timeout(Some(1500), DEFAULT_TIMEOUT),
            Duration::from_millis(1500)
        );
        assert_eq!(effective_timeout(Some(10_000_000), DEFAULT_TIMEOUT), MAX_TIMEOUT);
        assert_eq!(effective_timeout(None, Duration::from_secs(3600)), MAX_TIMEOUT);
    }

    #[test]
    fn test_executor_timeout_for_definition() {
        let mut def = ping("https://api.example.com/", &["api.example.com"]);
        def.request.timeout_ms = Some(u64::MAX);
        assert_eq!(executor(StaticEnv::new()).timeout_for(&def), MAX_TIMEOUT);
    }

    fn body_ctx() -> CallContext {
        let params = json!({"message": "Hello World", "n": 3});
        CallContext::new(
            HashMap::from([("TOKEN".to_string(), "abc".to_string())]),
            params.as_object().unwrap().clone(),
        )
    }

    #[test]
    fn test_json_body_sets_default_content_type() {
        let template = BodyTemplate {
            kind: BodyKind::Json,
            content: json!({"text": "{{params.message}}", "n": 1}),
        };
        let mut headers = HeaderMap::new();
        let bytes = encode_body(&template, &body_ctx(), &mut headers).unwrap();

        assert_eq!(headers[CONTENT_TYPE], "application/json");
        let sent: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(sent, json!({"text": "Hello World", "n": 1}));
    }

    #[test]
    fn test_json_body_keeps_declared_content_type() {
        let template = BodyTemplate {
            kind: BodyKind::Json,
            content: json!({"a": 1}),
        };
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/vnd.api+json"));
        encode_body(&template, &body_ctx(), &mut headers).unwrap();

        assert_eq!(headers[CONTENT_TYPE], "application/vnd.api+json");
    }

    #[test]
    fn test_form_body_flattens_top_level_keys() {
        let template = BodyTemplate {
            kind: BodyKind::Form,
            content: json!({"msg": "{{params.message}}", "n": "{{params.n}}", "flag": true}),
        };
        let mut headers = HeaderMap::new();
        let bytes = encode_body(&template, &body_ctx(), &mut headers).unwrap();

        assert_eq!(headers[CONTENT_TYPE], "application/x-www-form-urlencoded");
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "flag=true&msg=Hello+World&n=3"
        );
    }

    #[test]
    fn test_text_body_has_no_default_content_type() {
        let template = BodyTemplate {
            kind: BodyKind::Text,
            content: json!("token={{env.TOKEN}}"),
        };
        let mut headers = HeaderMap::new();
        let bytes = encode_body(&template, &body_ctx(), &mut headers).unwrap();

        assert!(!headers.contains_key(CONTENT_TYPE));
        assert_eq!(bytes, b"token=abc");
    }

    #[test]
    fn test_body_strict_env_failure() {
        let template = BodyTemplate {
            kind: BodyKind::Json,
            content: json!({"k": "{{env.NOPE}}"}),
        };
        let err = encode_body(&template, &body_ctx(), &mut HeaderMap::new()).unwrap_err();
        assert!(matches!(err, ExecutionError::Template(_)));
    }

    #[test]
    fn test_json_content_type_detection() {
        assert!(is_json_content_type("application/json"));
        assert!(is_json_content_type("application/json; charset=utf-8"));
        assert!(is_json_content_type("application/problem+json"));
        assert!(is_json_content_type("Application/JSON"));
        assert!(!is_json_content_type("text/plain"));
        assert!(!is_json_content_type("text/html; charset=json"));
    }

    #[test]
    fn test_parse_payload_falls_back_to_text() {
        assert_eq!(parse_payload(br#"{"a":1}"#, true), json!({"a": 1}));
        assert_eq!(parse_payload(br#"{"a":1}"#, false), json!(r#"{"a":1}"#));
        assert_eq!(parse_payload(b"not json", true), json!("not json"));
    }

    #[test]
    fn test_response_scope_wraps_non_objects() {
        assert_eq!(response_scope(&json!({"id": 1}), None), json!({"id": 1}));
        assert_eq!(response_scope(&json!([1, 2]), None), json!({"value": [1, 2]}));
        assert_eq!(
            response_scope(&json!("oops"), Some(StatusCode::BAD_GATEWAY)),
            json!({"value": "oops", "status": 502})
        );
    }

    #[test]
    fn test_finish_renders_summary_on_success() {
        let mut def = ping("https://api.example.com/", &["api.example.com"]);
        def.response.summary = Some("Created {{response.id}}{{env.OPTIONAL}}".into());
        def.response.error_template = Some("never".into());

        let result = finish(&def, body_ctx(), StatusCode::CREATED, json!({"id": "x1"}));
        assert_eq!(
            result,
            ExecutionResult {
                success: true,
                status: Some(201),
                data: Some(json!({"id": "x1"})),
                error: None,
                summary: Some("Created x1".into()),
            }
        );
    }

    #[test]
    fn test_finish_renders_error_template() {
        let mut def = ping("https://api.example.com/", &["api.example.com"]);
        def.response.summary = Some("never".into());
        def.response.error_template =
            Some("Failed ({{response.status}}): {{response.message}}".into());

        let result = finish(
            &def,
            body_ctx(),
            StatusCode::NOT_FOUND,
            json!({"message": "no such user"}),
        );
        assert!(!result.success);
        assert_eq!(result.status, Some(404));
        assert_eq!(result.error.as_deref(), Some("Failed (404): no such user"));
        assert_eq!(result.summary, None);
        assert_eq!(result.data, Some(json!({"message": "no such user"})));
    }

    #[test]
    fn test_finish_default_error_without_template() {
        let def = ping("https://api.example.com/", &["api.example.com"]);
        let result = finish(&def, body_ctx(), StatusCode::SERVICE_UNAVAILABLE, json!("down"));
        assert_eq!(result.error.as_deref(), Some("HTTP 503 Service Unavailable"));
        assert_eq!(result.data, Some(json!("down")));
    }

    #[test]
    fn test_failure_serializes_compactly() {
        let value = serde_json::to_value(ExecutionResult::failure("boom")).unwrap();
        assert_eq!(value, json!({"success": false, "error": "boom"}));
    }
}
