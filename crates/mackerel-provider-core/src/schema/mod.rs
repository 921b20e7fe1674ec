//! Resource schemas
//!
//! A [`Schema`] describes the attributes and nested blocks of one resource,
//! data source or provider configuration. Both engine generations describe
//! their types with it, so validation, planning and set normalization behave
//! identically whichever generation serves a type.
//!
//! ```text
//!   Schema
//!   ├── attributes: name → Attribute (kind, required/optional/computed, validators)
//!   └── blocks:     name → Block (set/list nesting, identity fields, nested Schema)
//! ```

pub mod plan;

pub use plan::{PlanAction, PlannedChange, plan};

use crate::error::{Diagnostic, Error, Result};
use crate::normalize::normalize_values;
use crate::validators::ValidatorRef;
use crate::value::{AttributePath, Object, Value};
use serde_json::json;
use std::collections::BTreeMap;

/// Value type of an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    String,
    Bool,
    Number,
    StringSet,
    StringList,
}

impl AttributeKind {
    fn label(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Bool => "bool",
            Self::Number => "number",
            Self::StringSet => "set of string",
            Self::StringList => "list of string",
        }
    }

    fn accepts(self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null | Value::Unknown) => true,
            (Self::String, Value::String(_)) => true,
            (Self::Bool, Value::Bool(_)) => true,
            (Self::Number, Value::Number(_)) => true,
            (Self::StringSet | Self::StringList, Value::List(items)) => items
                .iter()
                .all(|item| matches!(item, Value::String(_) | Value::Unknown)),
            _ => false,
        }
    }
}

/// One attribute of a schema
#[derive(Debug, Clone)]
pub struct Attribute {
    pub kind: AttributeKind,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub sensitive: bool,
    /// A planned change of this attribute forces destroy-and-recreate
    pub requires_replace: bool,
    /// Value planned when the configuration leaves the attribute unset
    pub default: Option<Value>,
    pub description: String,
    pub validators: Vec<ValidatorRef>,
}

impl Attribute {
    fn new(kind: AttributeKind) -> Self {
        Self {
            kind,
            required: false,
            optional: false,
            computed: false,
            sensitive: false,
            requires_replace: false,
            default: None,
            description: String::new(),
            validators: Vec::new(),
        }
    }

    pub fn string() -> Self {
        Self::new(AttributeKind::String)
    }

    pub fn bool() -> Self {
        Self::new(AttributeKind::Bool)
    }

    pub fn number() -> Self {
        Self::new(AttributeKind::Number)
    }

    pub fn string_set() -> Self {
        Self::new(AttributeKind::StringSet)
    }

    pub fn string_list() -> Self {
        Self::new(AttributeKind::StringList)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn requires_replace(mut self) -> Self {
        self.requires_replace = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn validator(mut self, validator: ValidatorRef) -> Self {
        self.validators.push(validator);
        self
    }

    /// Computed and never settable from configuration
    pub fn is_read_only(&self) -> bool {
        self.computed && !self.optional && !self.required
    }

    fn describe_json(&self) -> serde_json::Value {
        json!({
            "type": self.kind.label(),
            "required": self.required,
            "optional": self.optional,
            "computed": self.computed,
            "sensitive": self.sensitive,
            "requires_replace": self.requires_replace,
            "description": self.description,
        })
    }
}

/// How the elements of a nested block are collected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nesting {
    /// Unordered, duplicate-free by identity
    Set,
    /// Ordered
    List,
}

/// A nested block of a schema
#[derive(Debug, Clone)]
pub struct Block {
    pub nesting: Nesting,
    pub schema: Schema,
    pub min_items: usize,
    pub max_items: Option<usize>,
    /// Fields forming the identity key of a set element (empty = whole element)
    pub identity: Vec<&'static str>,
    pub requires_replace: bool,
    /// Filled by the provider only; configuring it is an error
    pub computed: bool,
}

impl Block {
    pub fn set(schema: Schema) -> Self {
        Self {
            nesting: Nesting::Set,
            schema,
            min_items: 0,
            max_items: None,
            identity: Vec::new(),
            requires_replace: false,
            computed: false,
        }
    }

    pub fn list(schema: Schema) -> Self {
        Self {
            nesting: Nesting::List,
            ..Self::set(schema)
        }
    }

    pub fn identity(mut self, fields: &[&'static str]) -> Self {
        self.identity = fields.to_vec();
        self
    }

    pub fn max_items(mut self, max: usize) -> Self {
        self.max_items = Some(max);
        self
    }

    pub fn requires_replace(mut self) -> Self {
        self.requires_replace = true;
        self
    }

    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }
}

/// Attributes and blocks of one type
#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub description: String,
    pub attributes: BTreeMap<String, Attribute>,
    pub blocks: BTreeMap<String, Block>,
}

impl Schema {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::default()
        }
    }

    pub fn attribute(mut self, name: impl Into<String>, attribute: Attribute) -> Self {
        self.attributes.insert(name.into(), attribute);
        self
    }

    pub fn block(mut self, name: impl Into<String>, block: Block) -> Self {
        self.blocks.insert(name.into(), block);
        self
    }

    /// Collect every configuration diagnostic for `config`
    pub fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        self.validate_at(config, None, &mut out);
        out
    }

    /// Validate and fail with a configuration error on any diagnostic
    pub fn ensure_valid(&self, config: &Value) -> Result<()> {
        let diagnostics = self.validate(config);
        if diagnostics.is_empty() {
            Ok(())
        } else {
            Err(Error::Configuration(diagnostics))
        }
    }

    fn validate_at(&self, config: &Value, prefix: Option<&AttributePath>, out: &mut Vec<Diagnostic>) {
        let empty = Object::new();
        let object = match config {
            Value::Object(map) => map,
            Value::Null => &empty,
            Value::Unknown => return,
            other => {
                out.push(
                    Diagnostic::error(
                        "Invalid Configuration",
                        format!("expected an object, got {}", other.type_label()),
                    )
                    .with_path(prefix.cloned()),
                );
                return;
            }
        };

        for key in object.keys() {
            if !self.attributes.contains_key(key) && !self.blocks.contains_key(key) {
                out.push(
                    Diagnostic::error(
                        "Unsupported argument",
                        format!("An argument named {key:?} is not expected here."),
                    )
                    .with_path(Some(child(prefix, key))),
                );
            }
        }

        for (name, attribute) in &self.attributes {
            let value = object.get(name).unwrap_or(&Value::Null);
            let path = child(prefix, name);

            if value.is_null() {
                if attribute.required {
                    out.push(
                        Diagnostic::error(
                            "Missing required argument",
                            format!("The argument {name:?} is required, but no definition was found."),
                        )
                        .with_path(Some(path)),
                    );
                }
                continue;
            }
            if attribute.is_read_only() {
                out.push(
                    Diagnostic::error(
                        "Invalid Configuration for Read-Only Attribute",
                        format!("Cannot set value for the read-only attribute {name:?}."),
                    )
                    .with_path(Some(path)),
                );
                continue;
            }
            if !attribute.kind.accepts(value) {
                out.push(
                    Diagnostic::error(
                        "Incorrect attribute value type",
                        format!(
                            "Inappropriate value for attribute {name:?}: {} required, got {}.",
                            attribute.kind.label(),
                            value.type_label()
                        ),
                    )
                    .with_path(Some(path)),
                );
                continue;
            }
            for validator in &attribute.validators {
                if let Err(message) = validator.validate(value) {
                    out.push(Diagnostic::error("Invalid Attribute Value", message).with_path(Some(path.clone())));
                }
            }
        }

        for (name, block) in &self.blocks {
            let path = child(prefix, name);
            let items = match object.get(name).unwrap_or(&Value::Null) {
                Value::Null => &[][..],
                Value::Unknown => continue,
                Value::List(items) => items.as_slice(),
                other => {
                    out.push(
                        Diagnostic::error(
                            "Invalid Configuration",
                            format!("block {name:?} must be a list of objects, got {}", other.type_label()),
                        )
                        .with_path(Some(path)),
                    );
                    continue;
                }
            };
            if block.computed {
                if !items.is_empty() {
                    out.push(
                        Diagnostic::error(
                            "Invalid Configuration for Read-Only Attribute",
                            format!("Cannot set value for the read-only block {name:?}."),
                        )
                        .with_path(Some(path)),
                    );
                }
                continue;
            }
            let count = match block.nesting {
                Nesting::Set => normalize_values(&Value::List(items.to_vec()), &block.identity)
                    .as_list()
                    .map_or(0, <[Value]>::len),
                Nesting::List => items.len(),
            };
            if count < block.min_items {
                out.push(
                    Diagnostic::error(
                        "Insufficient blocks",
                        format!("At least {} {name:?} blocks are required.", block.min_items),
                    )
                    .with_path(Some(path.clone())),
                );
            }
            if let Some(max) = block.max_items {
                if count > max {
                    out.push(
                        Diagnostic::error(
                            "Too many blocks",
                            format!("No more than {max} {name:?} blocks are allowed."),
                        )
                        .with_path(Some(path.clone())),
                    );
                }
            }
            for (i, item) in items.iter().enumerate() {
                block.schema.validate_at(item, Some(&path.clone().index(i)), out);
            }
        }
    }

    /// Normalize a state or planned value: absent blocks become empty,
    /// set blocks and string sets lose duplicates (first occurrence wins)
    pub fn normalize(&self, value: &Value) -> Value {
        let Some(object) = value.as_object() else {
            return value.clone();
        };
        let mut out = object.clone();
        for (name, attribute) in &self.attributes {
            if attribute.kind == AttributeKind::StringSet {
                if let Some(v) = out.get_mut(name) {
                    *v = normalize_values(v, &[]);
                }
            }
        }
        for (name, block) in &self.blocks {
            let current = out.remove(name).unwrap_or(Value::Null);
            let items: Vec<Value> = match current {
                Value::Unknown => {
                    out.insert(name.clone(), Value::Unknown);
                    continue;
                }
                Value::List(items) => items.iter().map(|item| block.schema.normalize(item)).collect(),
                _ => Vec::new(),
            };
            let normalized = match block.nesting {
                Nesting::Set => normalize_values(&Value::List(items), &block.identity),
                Nesting::List => Value::List(items),
            };
            out.insert(name.clone(), normalized);
        }
        Value::Object(out)
    }

    /// Order-insensitive form used for comparing values: set elements sorted
    pub fn canonical(&self, value: &Value) -> Value {
        let Some(object) = value.as_object() else {
            return value.clone();
        };
        let mut out = object.clone();
        for (name, attribute) in &self.attributes {
            if attribute.kind == AttributeKind::StringSet {
                if let Some(v) = out.get_mut(name) {
                    *v = sorted(normalize_values(v, &[]));
                }
            }
        }
        for (name, block) in &self.blocks {
            if let Some(Value::List(items)) = out.get(name) {
                let items: Vec<Value> = items.iter().map(|item| block.schema.canonical(item)).collect();
                let collected = match block.nesting {
                    Nesting::Set => sorted(normalize_values(&Value::List(items), &block.identity)),
                    Nesting::List => Value::List(items),
                };
                out.insert(name.clone(), collected);
            }
        }
        Value::Object(out)
    }

    /// Compare two values ignoring set ordering
    pub fn semantically_equal(&self, a: &Value, b: &Value) -> bool {
        self.canonical(a) == self.canonical(b)
    }

    /// Machine-readable description returned by schema requests
    pub fn describe(&self) -> serde_json::Value {
        let attributes: serde_json::Map<String, serde_json::Value> = self
            .attributes
            .iter()
            .map(|(name, a)| (name.clone(), a.describe_json()))
            .collect();
        let blocks: serde_json::Map<String, serde_json::Value> = self
            .blocks
            .iter()
            .map(|(name, b)| {
                (
                    name.clone(),
                    json!({
                        "nesting": match b.nesting { Nesting::Set => "set", Nesting::List => "list" },
                        "min_items": b.min_items,
                        "computed": b.computed,
                        "max_items": b.max_items,
                        "schema": b.schema.describe(),
                    }),
                )
            })
            .collect();
        json!({
            "description": self.description,
            "attributes": attributes,
            "blocks": blocks,
        })
    }
}

fn child(prefix: Option<&AttributePath>, name: &str) -> AttributePath {
    match prefix {
        Some(p) => p.clone().attribute(name),
        None => AttributePath::root(name),
    }
}

fn sorted(value: Value) -> Value {
    match value {
        Value::List(mut items) => {
            items.sort_by_cached_key(|item| item.to_wire().to_string());
            Value::List(items)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators;

    fn group_schema() -> Schema {
        Schema::new("test")
            .attribute("id", Attribute::string().computed())
            .attribute("name", Attribute::string().required())
            .attribute(
                "level",
                Attribute::string()
                    .optional()
                    .validator(validators::one_of(["all", "critical"])),
            )
            .block(
                "monitor",
                Block::set(
                    Schema::new("")
                        .attribute("id", Attribute::string().required())
                        .attribute("skip_default", Attribute::bool().optional()),
                )
                .identity(&["id"]),
            )
    }

    #[test]
    fn test_validate_collects_paths() {
        let config = Value::object([
            ("id", Value::string("x")),
            ("level", Value::string("loud")),
            ("bogus", Value::Bool(true)),
            ("monitor", Value::List(vec![Value::object([("skip_default", Value::Bool(true))])])),
        ]);
        let diags = group_schema().validate(&config);
        let paths: Vec<_> = diags.iter().filter_map(|d| d.attribute.clone()).collect();
        assert!(paths.contains(&"bogus".to_string()));
        assert!(paths.contains(&"id".to_string()));
        assert!(paths.contains(&"name".to_string()));
        assert!(paths.contains(&"level".to_string()));
        assert!(paths.contains(&"monitor[0].id".to_string()));
    }

    #[test]
    fn test_normalize_fills_empty_blocks() {
        let v = group_schema().normalize(&Value::object([("name", Value::string("g"))]));
        assert_eq!(v.get("monitor"), &Value::List(vec![]));
    }

    #[test]
    fn test_sets_compare_order_insensitively() {
        let schema = Schema::new("").attribute("ids", Attribute::string_set().optional());
        let a = Value::object([("ids", Value::string_list(["a", "b"]))]);
        let b = Value::object([("ids", Value::string_list(["b", "a", "a"]))]);
        assert!(schema.semantically_equal(&a, &b));
    }
}
