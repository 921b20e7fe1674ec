//! Attribute value tree
//!
//! Declared configuration, planned values and resource state are all
//! represented as [`Value`] trees. `Unknown` only ever appears in planned
//! values, for computed attributes whose value is decided by the remote side.

use crate::error::{Error, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fmt;

/// Attribute map of an object value
pub type Object = BTreeMap<String, Value>;

/// Marker key used to encode `Unknown` on the JSON wire
pub const UNKNOWN_WIRE_KEY: &str = "$unknown";

/// A dynamically typed attribute value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    /// Value known only after apply
    Unknown,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    List(Vec<Value>),
    Object(Object),
}

impl Value {
    /// Build a string value
    pub fn string(s: impl Into<String>) -> Self {
        Self::String(s.into())
    }

    /// Build a list of string values
    pub fn string_list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::List(items.into_iter().map(|s| Self::String(s.into())).collect())
    }

    /// Build an object value from key/value pairs
    pub fn object<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// `true` when no `Unknown` appears anywhere in the tree
    pub fn is_fully_known(&self) -> bool {
        match self {
            Self::Unknown => false,
            Self::List(items) => items.iter().all(Value::is_fully_known),
            Self::Object(map) => map.values().all(Value::is_fully_known),
            _ => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut Object> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Look up an attribute of an object value; `Null` for anything else
    pub fn get(&self, key: &str) -> &Value {
        static NULL: Value = Value::Null;
        self.as_object().and_then(|m| m.get(key)).unwrap_or(&NULL)
    }

    /// Short type label used in diagnostics
    pub fn type_label(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Unknown => "unknown",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Object(_) => "object",
        }
    }

    /// Convert to JSON, failing on `Unknown`
    pub fn to_json(&self) -> Result<serde_json::Value> {
        if !self.is_fully_known() {
            return Err(Error::decode("value contains unknown elements"));
        }
        Ok(self.to_json_lossy())
    }

    /// Convert to JSON, mapping `Unknown` to `null`
    pub fn to_json_lossy(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Self::Null | Self::Unknown => Json::Null,
            Self::Bool(b) => Json::Bool(*b),
            Self::Number(n) => Json::Number(n.clone()),
            Self::String(s) => Json::String(s.clone()),
            Self::List(items) => Json::Array(items.iter().map(Value::to_json_lossy).collect()),
            Self::Object(map) => Json::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json_lossy()))
                    .collect(),
            ),
        }
    }

    /// Decode from the JSON wire form, where `{"$unknown": true}` is `Unknown`
    pub fn from_wire(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match json {
            Json::Object(map) if is_unknown_marker(&map) => Self::Unknown,
            Json::Object(map) => {
                Self::Object(map.into_iter().map(|(k, v)| (k, Self::from_wire(v))).collect())
            }
            Json::Array(items) => Self::List(items.into_iter().map(Self::from_wire).collect()),
            other => Self::from(other),
        }
    }

    /// Encode to the JSON wire form
    pub fn to_wire(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Self::Unknown => serde_json::json!({ UNKNOWN_WIRE_KEY: true }),
            Self::List(items) => Json::Array(items.iter().map(Value::to_wire).collect()),
            Self::Object(map) => {
                Json::Object(map.iter().map(|(k, v)| (k.clone(), v.to_wire())).collect())
            }
            other => other.to_json_lossy(),
        }
    }

    /// Decode into a typed model; `Unknown` leaves are read as `null`
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.to_json_lossy())
            .map_err(|e| Error::decode(format!("cannot decode {} value: {}", self.type_label(), e)))
    }

    /// Encode a typed model into a value tree
    pub fn encode<T: Serialize>(model: &T) -> Result<Self> {
        Ok(Self::from(serde_json::to_value(model)?))
    }
}

fn is_unknown_marker(map: &serde_json::Map<String, serde_json::Value>) -> bool {
    map.len() == 1 && map.get(UNKNOWN_WIRE_KEY) == Some(&serde_json::Value::Bool(true))
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match json {
            Json::Null => Self::Null,
            Json::Bool(b) => Self::Bool(b),
            Json::Number(n) => Self::Number(n),
            Json::String(s) => Self::String(s),
            Json::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            Json::Object(map) => Self::Object(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// One step of an attribute path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathStep {
    Attribute(String),
    Index(usize),
}

/// Location of an attribute inside a value tree, rendered as `monitor[0].id`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AttributePath(Vec<PathStep>);

impl AttributePath {
    pub fn root(name: impl Into<String>) -> Self {
        Self(vec![PathStep::Attribute(name.into())])
    }

    pub fn attribute(mut self, name: impl Into<String>) -> Self {
        self.0.push(PathStep::Attribute(name.into()));
        self
    }

    pub fn index(mut self, index: usize) -> Self {
        self.0.push(PathStep::Index(index));
        self
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.0
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.0.iter().enumerate() {
            match step {
                PathStep::Attribute(name) if i == 0 => write!(f, "{name}")?,
                PathStep::Attribute(name) => write!(f, ".{name}")?,
                PathStep::Index(idx) => write!(f, "[{idx}]")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_is_not_fully_known() {
        let v = Value::object([("id", Value::Unknown), ("name", Value::string("a"))]);
        assert!(!v.is_fully_known());
        assert!(v.to_json().is_err());
        assert_eq!(v.to_json_lossy(), json!({"id": null, "name": "a"}));
    }

    #[test]
    fn test_wire_marker() {
        let v = Value::from_wire(json!({"id": {"$unknown": true}, "tags": ["a"]}));
        assert!(v.get("id").is_unknown());
        assert_eq!(v.get("tags"), &Value::string_list(["a"]));
        assert_eq!(v.to_wire(), json!({"id": {"$unknown": true}, "tags": ["a"]}));
    }

    #[test]
    fn test_path_display() {
        let p = AttributePath::root("monitor").index(0).attribute("id");
        assert_eq!(p.to_string(), "monitor[0].id");
    }
}
