// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Node configuration parameters.
//!
//! Each node type declares a [`ConfigSpec`]; the values given in a graph
//! description are checked against it when the node is instantiated, and
//! defaults are filled in.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    String,
    Int,
    Float,
    Bool,
    List,
    /// Any JSON value
    Json,
}

impl ParamKind {
    fn accepts(&self, value: &Value) -> bool {
        match self {
            ParamKind::String => value.is_string(),
            ParamKind::Int => value.is_i64() || value.is_u64(),
            ParamKind::Float => value.is_number(),
            ParamKind::Bool => value.is_boolean(),
            ParamKind::List => value.is_array(),
            ParamKind::Json => true,
        }
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ParamKind::String => "string",
            ParamKind::Int => "int",
            ParamKind::Float => "float",
            ParamKind::Bool => "bool",
            ParamKind::List => "list",
            ParamKind::Json => "json",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub kind: ParamKind,
    pub optional: bool,
    pub default: Option<Value>,
}

impl ParamSpec {
    pub fn new(kind: ParamKind) -> Self {
        Self {
            kind,
            optional: false,
            default: None,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }
}

/// Parameters accepted by a node type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigSpec {
    params: BTreeMap<String, ParamSpec>,
}

impl ConfigSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, name: impl Into<String>, spec: ParamSpec) -> Self {
        self.params.insert(name.into(), spec);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ParamSpec> {
        self.params.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Checks `values` and returns them with defaults filled in.
    ///
    /// Unknown names, missing mandatory values and values of the wrong kind
    /// are rejected. A `null` counts as absent.
    pub fn validate(&self, values: &ConfigValues) -> Result<ConfigValues, ConfigError> {
        if let Some(unknown) = values.0.keys().find(|k| !self.params.contains_key(*k)) {
            return Err(ConfigError::UnknownParam(unknown.clone()));
        }

        let mut validated = ConfigValues::default();
        for (name, spec) in &self.params {
            match values.get(name).filter(|v| !v.is_null()) {
                Some(value) => {
                    if !spec.kind.accepts(value) {
                        return Err(ConfigError::InvalidType {
                            name: name.clone(),
                            expected: spec.kind,
                            actual: describe_value(value).to_string(),
                        });
                    }
                    validated.insert(name.clone(), value.clone());
                }
                None => match &spec.default {
                    Some(default) => {
                        validated.insert(name.clone(), default.clone());
                    }
                    None if spec.optional => {}
                    None => return Err(ConfigError::MissingParam(name.clone())),
                },
            }
        }
        Ok(validated)
    }
}

fn describe_value(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

/// Config values of one node, keyed by parameter name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigValues(BTreeMap<String, Value>);

impl ConfigValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_f64)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ConfigValues {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        ConfigValues(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec() -> ConfigSpec {
        ConfigSpec::new()
            .param("name", ParamSpec::new(ParamKind::String))
            .param("count", ParamSpec::new(ParamKind::Int).with_default(3))
            .param("ratio", ParamSpec::new(ParamKind::Float).optional())
    }

    #[test]
    fn test_defaults_are_filled() {
        let values = ConfigValues::new().with("name", "x");
        let validated = spec().validate(&values).unwrap();

        assert_eq!(validated.get_str("name"), Some("x"));
        assert_eq!(validated.get_i64("count"), Some(3));
        assert_eq!(validated.get("ratio"), None);
    }

    #[test]
    fn test_validation_failures() {
        let cases = vec![
            (
                ConfigValues::new(),
                ConfigError::MissingParam("name".into()),
            ),
            (
                ConfigValues::new().with("name", "x").with("other", 1),
                ConfigError::UnknownParam("other".into()),
            ),
            (
                ConfigValues::new().with("name", "x").with("count", 1.5),
                ConfigError::InvalidType {
                    name: "count".into(),
                    expected: ParamKind::Int,
                    actual: "float".into(),
                },
            ),
            (
                ConfigValues::new().with("name", json!(null)),
                ConfigError::MissingParam("name".into()),
            ),
        ];

        for (values, expected) in cases {
            assert_eq!(spec().validate(&values).unwrap_err(), expected);
        }
    }

    #[test]
    fn test_float_accepts_integers() {
        let values = ConfigValues::new().with("name", "x").with("ratio", 2);
        assert!(spec().validate(&values).is_ok());
    }
}
