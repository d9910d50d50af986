//! JSON Schema for a definition's call arguments.

use std::collections::BTreeMap;

use serde_json::{Map, Value, json};

use crate::tools::declarative::definition::{ParameterSpec, ParameterType};

/// Build the argument schema advertised to the calling framework.
///
/// Only parameters declared `required: true` land in `"required"`. A string
/// parameter with an `enum` becomes a closed value set. With no parameters the
/// schema accepts only an empty object.
pub fn parameters_schema(parameters: &BTreeMap<String, ParameterSpec>) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for (name, spec) in parameters {
        properties.insert(name.clone(), property_schema(spec));
        if spec.required {
            required.push(Value::String(name.clone()));
        }
    }

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false
    })
}

fn property_schema(spec: &ParameterSpec) -> Value {
    let mut prop = Map::new();
    prop.insert("type".into(), json!(spec.param_type.as_str()));

    if spec.param_type == ParameterType::String
        && let Some(values) = &spec.enum_values
    {
        prop.insert("enum".into(), json!(values));
    }
    if let Some(description) = &spec.description {
        prop.insert("description".into(), json!(description));
    }
    if let Some(default) = &spec.default {
        prop.insert("default".into(), default.clone());
    }

    Value::Object(prop)
}
