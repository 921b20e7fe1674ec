//! Change planning
//!
//! Computes the planned state for a resource from its prior state and
//! declared configuration:
//!
//! - configured values win; schema defaults fill unset optional attributes
//! - computed attributes the configuration leaves unset keep their prior
//!   value, or become unknown on create and replace
//! - set blocks are normalized by their identity fields
//! - a change to any requires-replace attribute turns the plan into a replace

use super::{Nesting, Schema};
use crate::error::Result;
use crate::normalize::normalize_values;
use crate::value::{AttributePath, Object, Value};
use serde::{Deserialize, Serialize};

/// What applying a plan will do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanAction {
    Create,
    Update,
    Replace,
    Delete,
    #[serde(rename = "noop")]
    NoOp,
}

/// Result of planning one resource
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedChange {
    /// Planned state; `None` when the resource is to be destroyed
    pub planned: Option<Value>,
    /// Attributes whose change forces destroy-and-recreate
    pub requires_replace: Vec<AttributePath>,
    pub action: PlanAction,
}

/// Plan a change for one resource
///
/// Fails with a configuration error if `config` does not satisfy `schema`.
pub fn plan(schema: &Schema, prior: Option<&Value>, config: Option<&Value>) -> Result<PlannedChange> {
    let Some(config) = config else {
        let action = if prior.is_some() {
            PlanAction::Delete
        } else {
            PlanAction::NoOp
        };
        return Ok(PlannedChange {
            planned: None,
            requires_replace: Vec::new(),
            action,
        });
    };

    schema.ensure_valid(config)?;

    let Some(prior) = prior else {
        return Ok(PlannedChange {
            planned: Some(plan_object(schema, None, config)),
            requires_replace: Vec::new(),
            action: PlanAction::Create,
        });
    };

    let planned = plan_object(schema, Some(prior), config);
    let requires_replace = replace_paths(schema, prior, &planned);

    if !requires_replace.is_empty() {
        return Ok(PlannedChange {
            planned: Some(plan_object(schema, None, config)),
            requires_replace,
            action: PlanAction::Replace,
        });
    }

    let action = if schema.semantically_equal(&planned, prior) {
        PlanAction::NoOp
    } else {
        PlanAction::Update
    };
    Ok(PlannedChange {
        planned: Some(planned),
        requires_replace,
        action,
    })
}

fn plan_object(schema: &Schema, prior: Option<&Value>, config: &Value) -> Value {
    let mut out = Object::new();

    for (name, attribute) in &schema.attributes {
        let configured = config.get(name);
        let value = if !configured.is_null() {
            configured.clone()
        } else if let Some(default) = &attribute.default {
            default.clone()
        } else if attribute.computed {
            match prior {
                Some(prior) => prior.get(name).clone(),
                None => Value::Unknown,
            }
        } else {
            Value::Null
        };
        out.insert(name.clone(), value);
    }

    for (name, block) in &schema.blocks {
        let items = match config.get(name) {
            Value::List(items) => items
                .iter()
                .map(|item| plan_object(&block.schema, None, item))
                .collect(),
            _ => Vec::new(),
        };
        let value = match block.nesting {
            Nesting::Set => normalize_values(&Value::List(items), &block.identity),
            Nesting::List => Value::List(items),
        };
        out.insert(name.clone(), value);
    }

    schema.normalize(&Value::Object(out))
}

fn replace_paths(schema: &Schema, prior: &Value, planned: &Value) -> Vec<AttributePath> {
    let prior = schema.canonical(prior);
    let planned = schema.canonical(planned);
    let mut paths = Vec::new();

    for (name, attribute) in &schema.attributes {
        if !attribute.requires_replace {
            continue;
        }
        // An unknown value may resolve to anything, so it counts as a change
        if planned.get(name) != prior.get(name) {
            paths.push(AttributePath::root(name.clone()));
        }
    }
    for (name, block) in &schema.blocks {
        if block.requires_replace && planned.get(name) != prior.get(name) {
            paths.push(AttributePath::root(name.clone()));
        }
    }
    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, Block};

    fn service_schema() -> Schema {
        Schema::new("service")
            .attribute("id", Attribute::string().computed())
            .attribute("name", Attribute::string().required().requires_replace())
            .attribute("memo", Attribute::string().optional().requires_replace().default_value(""))
    }

    fn state(name: &str) -> Value {
        Value::object([
            ("id", Value::string(name)),
            ("name", Value::string(name)),
            ("memo", Value::string("")),
        ])
    }

    #[test]
    fn test_create_marks_computed_unknown() {
        let config = Value::object([("name", Value::string("svc"))]);
        let change = plan(&service_schema(), None, Some(&config)).unwrap();
        assert_eq!(change.action, PlanAction::Create);
        let planned = change.planned.unwrap();
        assert!(planned.get("id").is_unknown());
        assert_eq!(planned.get("memo"), &Value::string(""));
    }

    #[test]
    fn test_unchanged_config_is_noop() {
        let config = Value::object([("name", Value::string("svc"))]);
        let change = plan(&service_schema(), Some(&state("svc")), Some(&config)).unwrap();
        assert_eq!(change.action, PlanAction::NoOp);
        assert_eq!(change.planned.unwrap().get("id"), &Value::string("svc"));
    }

    #[test]
    fn test_renaming_requires_replace() {
        let config = Value::object([("name", Value::string("other"))]);
        let change = plan(&service_schema(), Some(&state("svc")), Some(&config)).unwrap();
        assert_eq!(change.action, PlanAction::Replace);
        assert_eq!(change.requires_replace, vec![AttributePath::root("name")]);
        assert!(change.planned.unwrap().get("id").is_unknown());
    }

    #[test]
    fn test_unknown_immutable_value_requires_replace() {
        let config = Value::object([("name", Value::Unknown)]);
        let change = plan(&service_schema(), Some(&state("svc")), Some(&config)).unwrap();
        assert_eq!(change.action, PlanAction::Replace);
        assert_eq!(change.requires_replace, vec![AttributePath::root("name")]);
        assert!(change.planned.unwrap().get("name").is_unknown());
    }

    #[test]
    fn test_removed_config_is_delete() {
        let change = plan(&service_schema(), Some(&state("svc")), None).unwrap();
        assert_eq!(change.action, PlanAction::Delete);
        assert!(change.planned.is_none());
    }

    #[test]
    fn test_reordered_set_block_is_noop() {
        let schema = Schema::new("group")
            .attribute("name", Attribute::string().required())
            .block(
                "service",
                Block::set(Schema::new("").attribute("name", Attribute::string().required())).identity(&["name"]),
            );
        let svc = |n: &str| Value::object([("name", Value::string(n))]);
        let prior = Value::object([
            ("name", Value::string("g")),
            ("service", Value::List(vec![svc("a"), svc("b")])),
        ]);
        let config = Value::object([
            ("name", Value::string("g")),
            ("service", Value::List(vec![svc("b"), svc("a"), svc("b")])),
        ]);
        let change = plan(&schema, Some(&prior), Some(&config)).unwrap();
        assert_eq!(change.action, PlanAction::NoOp);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = Value::object([("memo", Value::string("x"))]);
        assert!(plan(&service_schema(), None, Some(&config)).is_err());
    }
}
