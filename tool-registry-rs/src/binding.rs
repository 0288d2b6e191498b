//! Argument binding
//!
//! Planner output is loosely typed: numbers arrive as strings, unused
//! parameters as `""` or `null`, and extra keys appear that no tool declares.
//! Binding walks the declared schema, takes the supplied value or the
//! default, coerces it to the declared type and ignores everything else.

use log::debug;
use serde_json::{Map, Number, Value};

use crate::registry::{ParamType, ToolError, ToolMetadata};

/// Arguments that passed binding, keyed by declared parameter name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArguments {
    values: Map<String, Value>,
}

impl ToolArguments {
    pub fn new(values: Map<String, Value>) -> Self {
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Trimmed, non-empty string value.
    pub fn str(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn i64(&self, name: &str) -> Option<i64> {
        self.values.get(name).and_then(Value::as_i64)
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.values.get(name).and_then(Value::as_bool)
    }

    pub fn require_str(&self, tool: &str, name: &str) -> Result<&str, ToolError> {
        self.str(name).ok_or_else(|| ToolError::MissingParameter {
            tool: tool.to_string(),
            parameter: name.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.values
    }
}

/// Bind `supplied` against the schema in `metadata`.
pub fn bind_arguments(
    metadata: &ToolMetadata,
    supplied: &Map<String, Value>,
) -> Result<ToolArguments, ToolError> {
    let mut values = Map::new();

    for param in &metadata.parameters {
        let provided = supplied.get(&param.name).filter(|v| !is_absent(v));

        match (provided, &param.default) {
            (Some(value), _) => {
                values.insert(param.name.clone(), coerce(&param.name, param.param_type, value)?);
            }
            (None, Some(default)) => {
                values.insert(param.name.clone(), default.clone());
            }
            (None, None) if param.required => {
                return Err(ToolError::MissingParameter {
                    tool: metadata.name.clone(),
                    parameter: param.name.clone(),
                });
            }
            (None, None) => {}
        }
    }

    let ignored: Vec<&String> = supplied
        .keys()
        .filter(|key| !metadata.parameters.iter().any(|p| &p.name == *key))
        .collect();
    if !ignored.is_empty() {
        debug!("Ignoring undeclared argument(s) for {}: {:?}", metadata.name, ignored);
    }

    Ok(ToolArguments::new(values))
}

fn is_absent(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn coerce(name: &str, expected: ParamType, value: &Value) -> Result<Value, ToolError> {
    let invalid = || ToolError::InvalidParameter {
        parameter: name.to_string(),
        expected,
        got: value.to_string(),
    };

    match expected {
        ParamType::Any => Ok(value.clone()),
        ParamType::String => match value {
            Value::String(s) => Ok(Value::String(s.trim().to_string())),
            Value::Number(n) => Ok(Value::String(n.to_string())),
            Value::Bool(b) => Ok(Value::String(b.to_string())),
            _ => Err(invalid()),
        },
        ParamType::Integer => match value {
            Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => Ok(Value::from(i)),
                (None, Some(f)) if f.fract() == 0.0 => Ok(Value::from(f as i64)),
                _ => Err(invalid()),
            },
            // "2", "2nd", "year 3"
            Value::String(s) => leading_integer(s).map(Value::from).ok_or_else(invalid),
            _ => Err(invalid()),
        },
        ParamType::Number => match value {
            Value::Number(_) => Ok(value.clone()),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(invalid),
            _ => Err(invalid()),
        },
        ParamType::Boolean => match value {
            Value::Bool(_) => Ok(value.clone()),
            Value::String(s) => match s.trim().to_lowercase().as_str() {
                "true" | "yes" | "1" => Ok(Value::Bool(true)),
                "false" | "no" | "0" => Ok(Value::Bool(false)),
                _ => Err(invalid()),
            },
            Value::Number(n) => Ok(Value::Bool(n.as_f64().map_or(false, |f| f != 0.0))),
            _ => Err(invalid()),
        },
        ParamType::List => match value {
            Value::Array(_) => Ok(value.clone()),
            Value::Object(_) => Err(invalid()),
            scalar => Ok(Value::Array(vec![scalar.clone()])),
        },
        ParamType::Object => match value {
            Value::Object(_) => Ok(value.clone()),
            _ => Err(invalid()),
        },
    }
}

fn leading_integer(text: &str) -> Option<i64> {
    let digits: String = text
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}
