//! Argument schemas and boundary coercion
//!
//! Tool arguments arrive as untyped JSON values from clients that are known
//! to send numbers and booleans as strings. Each argument gets a small
//! parser that coerces where the contract allows and fails with a precise
//! message where it does not.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::document::ArgSpec;

/// Scalar argument kinds accepted in prompt documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgType {
    String,
    Number,
    Boolean,
}

impl ArgType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }
}

/// One resolved argument definition.
#[derive(Debug, Clone, Serialize)]
pub struct ArgDef {
    pub name: String,
    pub arg_type: ArgType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    pub required: bool,
}

/// The full argument schema of one prompt, in stable (name) order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ArgSchema {
    pub args: Vec<ArgDef>,
}

impl ArgSchema {
    /// Resolve the authored `args` mapping into definitions.
    ///
    /// Requiredness: an explicit `required` wins; else a `default` or the
    /// token `optional` in the description makes the argument optional;
    /// else the token `(required)` (or nothing at all) makes it required.
    pub fn from_document(args: &BTreeMap<String, ArgSpec>) -> Self {
        let defs = args
            .iter()
            .map(|(name, spec)| {
                let description_lower = spec
                    .description
                    .as_deref()
                    .unwrap_or_default()
                    .to_lowercase();
                let default = spec.default.as_ref().and_then(yaml_to_json);

                let required = if let Some(explicit) = spec.required {
                    explicit
                } else if default.is_some() || description_lower.contains("optional") {
                    false
                } else {
                    // "(required)" in the description and the bare fallback
                    // agree; the token only matters for documentation.
                    true
                };

                ArgDef {
                    name: name.clone(),
                    arg_type: spec.arg_type,
                    description: spec.description.clone(),
                    default,
                    required,
                }
            })
            .collect();
        Self { args: defs }
    }

    /// Emit the JSON schema advertised in the tool definition.
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for def in &self.args {
            let mut prop = Map::new();
            prop.insert("type".into(), json!(def.arg_type.as_str()));
            if let Some(desc) = &def.description {
                prop.insert("description".into(), json!(desc));
            }
            if let Some(default) = &def.default {
                prop.insert("default".into(), default.clone());
            }
            properties.insert(def.name.clone(), Value::Object(prop));
            if def.required {
                required.push(json!(def.name));
            }
        }
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Coerce raw invocation arguments against this schema.
    ///
    /// Missing optional arguments receive their default when one exists.
    ///
    /// # Errors
    ///
    /// Returns a message naming the offending argument when a required one
    /// is missing or a value cannot be coerced.
    pub fn coerce(&self, input: &Value) -> std::result::Result<Map<String, Value>, String> {
        let empty = Map::new();
        let input = match input {
            Value::Null => &empty,
            Value::Object(map) => map,
            other => return Err(format!("arguments must be an object, got {other}")),
        };

        let mut out = Map::new();
        for def in &self.args {
            match input.get(&def.name) {
                Some(value) => {
                    let coerced = coerce_value(def.arg_type, value)
                        .map_err(|e| format!("argument '{}': {e}", def.name))?;
                    out.insert(def.name.clone(), coerced);
                }
                None if def.required => {
                    return Err(format!("missing required argument '{}'", def.name));
                }
                None => {
                    if let Some(default) = &def.default {
                        out.insert(def.name.clone(), default.clone());
                    }
                }
            }
        }
        Ok(out)
    }
}

/// Coerce one value to the target kind.
///
/// Numbers accept numeric strings; booleans accept `"true"` / `"false"`.
/// This is a hard contract: upstream clients are known to send strings.
pub fn coerce_value(ty: ArgType, value: &Value) -> std::result::Result<Value, String> {
    match ty {
        ArgType::String => match value {
            Value::String(_) => Ok(value.clone()),
            other => Err(format!("expected a string, got {other}")),
        },
        ArgType::Number => match value {
            Value::Number(_) => Ok(value.clone()),
            Value::String(s) => {
                let trimmed = s.trim();
                if let Ok(i) = trimmed.parse::<i64>() {
                    Ok(json!(i))
                } else if let Ok(f) = trimmed.parse::<f64>() {
                    Ok(json!(f))
                } else {
                    Err(format!("expected a number, got '{s}'"))
                }
            }
            other => Err(format!("expected a number, got {other}")),
        },
        ArgType::Boolean => match value {
            Value::Bool(_) => Ok(value.clone()),
            Value::String(s) => match s.trim() {
                "true" => Ok(json!(true)),
                "false" => Ok(json!(false)),
                other => Err(format!("expected a boolean, got '{other}'")),
            },
            other => Err(format!("expected a boolean, got {other}")),
        },
    }
}

fn yaml_to_json(value: &serde_yaml::Value) -> Option<Value> {
    serde_json::to_value(value).ok()
}
