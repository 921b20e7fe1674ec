//! Association normalizer
//!
//! Set-valued relationships (a notification group's monitors, services,
//! child groups...) may be declared with repeated elements. Normalization
//! collapses elements sharing an identity key to the first occurrence, keeping
//! declaration order otherwise.
//!
//! ```text
//!   [ {id: m1, skip: true}, {id: m2}, {id: m1, skip: false} ]
//!                      │ normalize (identity = id)
//!                      ▼
//!   [ {id: m1, skip: true}, {id: m2} ]
//! ```
//!
//! Non-identity fields of a discarded duplicate are dropped, never merged.
//! The operation is pure and total: it cannot fail.

use crate::value::Value;
use std::collections::HashSet;
use std::hash::Hash;

/// An element of a set-valued relationship
pub trait Association {
    /// Identity key type
    type Key: Eq + Hash + Clone;

    /// The identity key used for duplicate elimination
    fn identity(&self) -> Self::Key;
}

/// Remove duplicates by [`Association::identity`], first occurrence wins
pub fn normalize<T: Association>(elements: impl IntoIterator<Item = T>) -> Vec<T> {
    normalize_by(elements, Association::identity)
}

/// Remove duplicates by an arbitrary key function, first occurrence wins
pub fn normalize_by<T, K, F>(elements: impl IntoIterator<Item = T>, mut key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: FnMut(&T) -> K,
{
    let mut seen = HashSet::new();
    elements
        .into_iter()
        .filter(|element| seen.insert(key(element)))
        .collect()
}

/// Normalize a list of object values using the named identity fields
///
/// With no identity fields the whole element is the key. Non-list values
/// (null, unknown) are returned unchanged.
pub fn normalize_values(value: &Value, identity_fields: &[&str]) -> Value {
    let Some(items) = value.as_list() else {
        return value.clone();
    };
    let normalized = normalize_by(items.iter().cloned(), |item| identity_key(item, identity_fields));
    Value::List(normalized)
}

fn identity_key(item: &Value, identity_fields: &[&str]) -> String {
    if identity_fields.is_empty() {
        return item.to_wire().to_string();
    }
    let key: Vec<serde_json::Value> = identity_fields
        .iter()
        .map(|field| item.get(field).to_wire())
        .collect();
    serde_json::Value::Array(key).to_string()
}

impl Association for String {
    type Key = String;

    fn identity(&self) -> String {
        self.clone()
    }
}
