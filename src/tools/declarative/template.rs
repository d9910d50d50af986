//! `{{scope.key}}` template resolution.
//!
//! Three scopes are recognized:
//!
//! | scope      | source                          | missing key                          |
//! |------------|---------------------------------|--------------------------------------|
//! | `env`      | merged environment snapshot     | error in [`EnvMode::Strict`], else `""` |
//! | `params`   | call arguments                  | `""`                                 |
//! | `response` | parsed response (post-call only)| `""`                                 |
//!
//! Any other scope is left untouched so unrelated `{{...}}` syntax inside a
//! body passes through verbatim.
//!
//! URL templates go through [`interpolate_url`]: `params` and `response`
//! values are percent-encoded there, `env` values are inserted as written.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::{Map, Value};

use crate::error::TemplateError;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\.([^{}\s]+)\s*\}\}")
        .expect("placeholder pattern is a valid regex")
});

/// How a missing `env` variable is handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EnvMode {
    /// Missing variable aborts resolution.
    #[default]
    Strict,
    /// Missing variable renders as an empty string.
    Lenient,
}

/// The lookup scope for one invocation.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    env: HashMap<String, String>,
    params: Map<String, Value>,
    response: Option<Value>,
}

impl CallContext {
    pub fn new(env: HashMap<String, String>, params: Map<String, Value>) -> Self {
        Self {
            env,
            params,
            response: None,
        }
    }

    /// Attach the parsed response for post-call rendering.
    pub fn with_response(mut self, response: Value) -> Self {
        self.response = Some(response);
        self
    }

    /// Resolve one placeholder. `Ok(None)` means the scope is not ours.
    fn resolve(
        &self,
        scope: &str,
        key: &str,
        mode: EnvMode,
    ) -> Result<Option<String>, TemplateError> {
        let text = match scope {
            "env" => match self.env.get(key) {
                Some(value) => value.clone(),
                None if mode == EnvMode::Strict => {
                    return Err(TemplateError::MissingVariable(key.to_string()));
                }
                None => String::new(),
            },
            "params" => lookup_path(&self.params, key)
                .map(value_to_text)
                .unwrap_or_default(),
            "response" => self
                .response
                .as_ref()
                .and_then(Value::as_object)
                .and_then(|obj| lookup_path(obj, key))
                .map(value_to_text)
                .unwrap_or_default(),
            _ => return Ok(None),
        };
        Ok(Some(text))
    }
}

/// Resolve every placeholder in a string.
pub fn interpolate_str(
    template: &str,
    ctx: &CallContext,
    mode: EnvMode,
) -> Result<String, TemplateError> {
    substitute(template, ctx, mode, false)
}

/// Resolve a URL template in strict mode.
///
/// Caller-supplied values are percent-encoded, so `Paris&units=x#` stays one
/// query value (or one path segment) instead of rewriting the URL around it.
pub fn interpolate_url(template: &str, ctx: &CallContext) -> Result<String, TemplateError> {
    substitute(template, ctx, EnvMode::Strict, true)
}

fn substitute(
    template: &str,
    ctx: &CallContext,
    mode: EnvMode,
    encode: bool,
) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;

    for caps in PLACEHOLDER.captures_iter(template) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        out.push_str(&template[last..whole.start()]);
        match resolve_captures(&caps, ctx, mode)? {
            Some(text) if encode && &caps[1] != "env" => {
                out.push_str(&urlencoding::encode(&text));
            }
            Some(text) => out.push_str(&text),
            None => out.push_str(whole.as_str()),
        }
        last = whole.end();
    }

    out.push_str(&template[last..]);
    Ok(out)
}

/// Resolve placeholders in every string leaf of a JSON structure.
///
/// Object keys, numbers, booleans and nulls are left as they are.
pub fn interpolate_value(
    value: &Value,
    ctx: &CallContext,
    mode: EnvMode,
) -> Result<Value, TemplateError> {
    Ok(match value {
        Value::String(s) => Value::String(interpolate_str(s, ctx, mode)?),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| interpolate_value(item, ctx, mode))
                .collect::<Result<_, _>>()?,
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| Ok((k.clone(), interpolate_value(v, ctx, mode)?)))
                .collect::<Result<_, TemplateError>>()?,
        ),
        other => other.clone(),
    })
}

/// Textual form of a JSON value for substitution.
///
/// Strings are inserted raw, `null` renders empty, everything else as compact JSON.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn resolve_captures(
    caps: &Captures<'_>,
    ctx: &CallContext,
    mode: EnvMode,
) -> Result<Option<String>, TemplateError> {
    let scope = &caps[1];
    let key = &caps[2];
    ctx.resolve(scope, key, mode)
}

/// Exact key first, then a dotted path through objects and arrays.
fn lookup_path<'a>(root: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    if let Some(value) = root.get(key) {
        return Some(value);
    }

    let mut segments = key.split('.');
    let mut current = root.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn ctx(env: &[(&str, &str)], params: Value) -> CallContext {
        let env = env
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let params = match params {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        CallContext::new(env, params)
    }

    #[test]
    fn test_env_substitution() {
        let ctx = ctx(&[("API_KEY", "secret123")], json!({}));
        let out = interpolate_str("Bearer {{env.API_KEY}}", &ctx, EnvMode::Strict).unwrap();
        assert_eq!(out, "Bearer secret123");
    }

    #[test]
    fn test_strict_missing_env_names_key() {
        let ctx = ctx(&[], json!({}));
        let err = interpolate_str("Bearer {{env.API_KEY}}", &ctx, EnvMode::Strict).unwrap_err();
        assert_eq!(err, TemplateError::MissingVariable("API_KEY".to_string()));
        assert!(err.to_string().contains("API_KEY"));
    }

    #[test]
    fn test_lenient_missing_env_is_empty() {
        let ctx = ctx(&[], json!({}));
        let out = interpolate_str("[{{env.API_KEY}}]", &ctx, EnvMode::Lenient).unwrap();
        assert_eq!(out, "[]");
    }

    #[test]
    fn test_params_substitution() {
        let ctx = ctx(&[], json!({"name": "World"}));
        let out = interpolate_str("Hello {{params.name}}", &ctx, EnvMode::Strict).unwrap();
        assert_eq!(out, "Hello World");
    }

    #[test]
    fn test_missing_param_is_empty_even_in_strict_mode() {
        let ctx = ctx(&[], json!({}));
        let out = interpolate_str("q={{params.query}}&x=1", &ctx, EnvMode::Strict).unwrap();
        assert_eq!(out, "q=&x=1");
    }

    #[test]
    fn test_non_string_values_render_as_text() {
        let ctx = ctx(
            &[],
            json!({"n": 42, "f": 1.5, "b": true, "nil": null, "list": [1, 2]}),
        );
        let out = interpolate_str(
            "{{params.n}} {{params.f}} {{params.b}} [{{params.nil}}] {{params.list}}",
            &ctx,
            EnvMode::Strict,
        )
        .unwrap();
        assert_eq!(out, "42 1.5 true [] [1,2]");
    }

    #[test]
    fn test_unknown_scope_left_verbatim() {
        let ctx = ctx(&[], json!({"x": "1"}));
        let out = interpolate_str(
            "{{secrets.TOKEN}} {{ other }} {{params.x}}",
            &ctx,
            EnvMode::Strict,
        )
        .unwrap();
        assert_eq!(out, "{{secrets.TOKEN}} {{ other }} 1");
    }

    #[test]
    fn test_whitespace_inside_braces() {
        let ctx = ctx(&[("A", "a")], json!({}));
        let out = interpolate_str("{{ env.A }}", &ctx, EnvMode::Strict).unwrap();
        assert_eq!(out, "a");
    }

    #[test]
    fn test_response_scope_requires_payload() {
        let without = ctx(&[], json!({}));
        let out = interpolate_str("id={{response.id}}", &without, EnvMode::Strict).unwrap();
        assert_eq!(out, "id=");

        let with = ctx(&[], json!({})).with_response(json!({"id": 7, "user": {"name": "ada"}}));
        let out = interpolate_str(
            "id={{response.id}} user={{response.user.name}}",
            &with,
            EnvMode::Strict,
        )
        .unwrap();
        assert_eq!(out, "id=7 user=ada");
    }

    #[test]
    fn test_dotted_path_through_arrays() {
        let ctx = ctx(&[], json!({})).with_response(json!({"items": [{"id": "a"}, {"id": "b"}]}));
        let out = interpolate_str("{{response.items.1.id}}", &ctx, EnvMode::Strict).unwrap();
        assert_eq!(out, "b");
    }

    #[test]
    fn test_exact_dotted_key_wins_over_path() {
        let ctx = ctx(&[], json!({"a.b": "exact", "a": {"b": "nested"}}));
        let out = interpolate_str("{{params.a.b}}", &ctx, EnvMode::Strict).unwrap();
        assert_eq!(out, "exact");
    }

    #[test]
    fn test_strict_failure_aborts_whole_string() {
        let ctx = ctx(&[("A", "a")], json!({}));
        let result = interpolate_str("{{env.A}}-{{env.B}}", &ctx, EnvMode::Strict);
        assert!(result.is_err());
    }

    #[test]
    fn test_deep_interpolation_preserves_structure() {
        let ctx = ctx(&[("TOKEN", "abc")], json!({"msg": "hello"}));
        let template = json!({
            "header": "Bearer {{env.TOKEN}}",
            "body": {"text": "{{params.msg}}", "count": 3, "flag": false, "none": null},
            "list": ["{{params.msg}}", 1]
        });

        let out = interpolate_value(&template, &ctx, EnvMode::Strict).unwrap();
        assert_eq!(
            out,
            json!({
                "header": "Bearer abc",
                "body": {"text": "hello", "count": 3, "flag": false, "none": null},
                "list": ["hello", 1]
            })
        );
    }

    #[test]
    fn test_deep_interpolation_strict_error_propagates() {
        let ctx = ctx(&[], json!({}));
        let template = json!({"nested": {"auth": "{{env.MISSING}}"}});
        let err = interpolate_value(&template, &ctx, EnvMode::Strict).unwrap_err();
        assert_eq!(err, TemplateError::MissingVariable("MISSING".to_string()));
    }

    #[test]
    fn test_url_params_percent_encoded() {
        let ctx = ctx(
            &[("API_KEY", "k3y"), ("BASE", "https://api.example.com/v1")],
            json!({"city": "Paris&units=x#", "owner": "a/b c"}),
        );
        let out = interpolate_url(
            "{{env.BASE}}/{{params.owner}}?q={{params.city}}&appid={{env.API_KEY}}",
            &ctx,
        )
        .unwrap();
        assert_eq!(
            out,
            "https://api.example.com/v1/a%2Fb%20c?q=Paris%26units%3Dx%23&appid=k3y"
        );
    }

    #[test]
    fn test_url_is_strict_about_env() {
        let ctx = ctx(&[], json!({"q": "x"}));
        let err = interpolate_url("https://api.example.com/?key={{env.KEY}}", &ctx).unwrap_err();
        assert_eq!(err, TemplateError::MissingVariable("KEY".to_string()));
    }
}
