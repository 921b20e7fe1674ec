//! Dynamic attribute access for legacy implementations
//!
//! Legacy CRUD functions read and write attributes by name instead of going
//! through a typed model. An empty id after read means the remote object is
//! gone.

use crate::schema::Schema;
use crate::value::{Object, Value};

#[derive(Debug, Clone, Default)]
pub struct ResourceData {
    id: String,
    values: Object,
}

impl ResourceData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a state, planned or configuration value
    pub fn from_value(value: &Value) -> Self {
        let values = value.as_object().cloned().unwrap_or_default();
        let id = values
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Self { id, values }
    }

    /// Start from an identity only, as import does
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            values: Object::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    pub fn is_gone(&self) -> bool {
        self.id.is_empty()
    }

    pub fn get(&self, key: &str) -> &Value {
        self.values.get(key).unwrap_or(&Value::Null)
    }

    /// String attribute; empty when unset
    pub fn get_str(&self, key: &str) -> &str {
        self.get(key).as_str().unwrap_or_default()
    }

    /// Bool attribute; `false` when unset
    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key).as_bool().unwrap_or_default()
    }

    /// Elements of a string set or list attribute
    pub fn get_string_set(&self, key: &str) -> Vec<String> {
        self.get(key)
            .as_list()
            .unwrap_or_default()
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect()
    }

    /// Elements of a nested block
    pub fn get_blocks(&self, key: &str) -> &[Value] {
        self.get(key).as_list().unwrap_or_default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    /// Final state: `None` when gone, otherwise every schema attribute
    /// present, leftover unknowns cleared and sets normalized
    pub fn into_state(self, schema: &Schema) -> Option<Value> {
        if self.is_gone() {
            return None;
        }
        let mut values = self.values;
        for name in schema.attributes.keys() {
            let entry = values.entry(name.clone()).or_insert(Value::Null);
            if !entry.is_fully_known() {
                *entry = Value::from(entry.to_json_lossy());
            }
        }
        values.insert("id".to_string(), Value::String(self.id));
        values.retain(|name, _| schema.attributes.contains_key(name) || schema.blocks.contains_key(name));
        Some(schema.normalize(&Value::Object(values)))
    }
}
