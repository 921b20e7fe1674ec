//! Type registry
//!
//! A [`Registry`] maps type names to factories so provider servers can
//! instantiate a fresh handler per request, avoiding hardcoded match chains.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mackerel_provider_core::registry::{Registry, TypeFilter};
//!
//! let mut registry = Registry::new("resource");
//! registry.register("mackerel_service", LifecycleController::<ServiceResource>::boxed)?;
//!
//! // Keep only what the operator enabled
//! let filter = TypeFilter::default().disable(["mackerel_role"]);
//! let registry = registry.filtered(&filter);
//! ```
//!
//! ## Filtering
//!
//! Inclusion and exclusion lists are applied once, when a provider server is
//! built. An unset or empty list imposes no constraint; with both set, a type
//! must pass both.
//!
//! ## Thread Safety
//!
//! A registry is built before the server starts and is never mutated while
//! serving, so lookups take no locks.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Inclusion and exclusion lists for type names
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeFilter {
    /// Only these types are kept (empty = all)
    #[serde(default)]
    pub enabled: Vec<String>,
    /// These types are dropped
    #[serde(default)]
    pub disabled: Vec<String>,
}

impl TypeFilter {
    /// Restrict to the given type names
    pub fn enable<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enabled.extend(names.into_iter().map(Into::into));
        self
    }

    /// Drop the given type names
    pub fn disable<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.disabled.extend(names.into_iter().map(Into::into));
        self
    }

    /// Whether `name` passes both lists
    pub fn allows(&self, name: &str) -> bool {
        let included = self.enabled.is_empty() || self.enabled.iter().any(|n| n == name);
        let excluded = self.disabled.iter().any(|n| n == name);
        included && !excluded
    }
}

/// Ordered, name-unique collection of factories
#[derive(Debug, Clone)]
pub struct Registry<F> {
    kind: &'static str,
    entries: Vec<(String, F)>,
}

impl<F> Registry<F> {
    /// Create an empty registry; `kind` names the entries in errors
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entries: Vec::new(),
        }
    }

    /// Register a factory under a unique type name
    ///
    /// # Returns
    ///
    /// - `Ok(())`: The factory was added
    /// - `Err(Error::DuplicateType)`: The name is already registered
    pub fn register(&mut self, name: impl Into<String>, factory: F) -> Result<()> {
        let name = name.into();
        if self.contains(&name) {
            return Err(Error::DuplicateType {
                kind: self.kind,
                name,
            });
        }
        self.entries.push((name, factory));
        Ok(())
    }

    /// Build a registry from `(name, factory)` pairs
    pub fn from_entries<I, S>(kind: &'static str, entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, F)>,
        S: Into<String>,
    {
        let mut registry = Self::new(kind);
        for (name, factory) in entries {
            registry.register(name, factory)?;
        }
        Ok(registry)
    }

    /// Keep only the entries allowed by `filter`
    pub fn filtered(self, filter: &TypeFilter) -> Self {
        Self {
            kind: self.kind,
            entries: self
                .entries
                .into_iter()
                .filter(|(name, _)| filter.allows(name))
                .collect(),
        }
    }

    /// Remove an entry, returning its factory
    pub fn remove(&mut self, name: &str) -> Option<F> {
        let pos = self.entries.iter().position(|(n, _)| n == name)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn get(&self, name: &str) -> Option<&F> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, f)| f)
    }

    /// Look up a factory, failing with an unknown-type error
    pub fn lookup(&self, name: &str) -> Result<&F> {
        self.get(name).ok_or_else(|| Error::UnknownType {
            kind: self.kind,
            name: name.to_string(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Registered names in registration order
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Registry<u8> {
        Registry::from_entries("resource", [("a", 1), ("b", 2), ("c", 3)]).unwrap()
    }

    #[test]
    fn test_registry_registration() {
        let mut registry = Registry::new("resource");

        // Initially empty
        assert!(!registry.contains("mock"));

        registry.register("mock", 1u8).unwrap();

        // Now present
        assert!(registry.contains("mock"));
        assert_eq!(registry.names(), vec!["mock".to_string()]);
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let mut registry = registry();
        let err = registry.register("a", 9).unwrap_err();
        assert!(matches!(err, Error::DuplicateType { name, .. } if name == "a"));
        assert_eq!(registry.get("a"), Some(&1));
    }

    #[test]
    fn test_empty_filter_keeps_everything() {
        assert_eq!(registry().filtered(&TypeFilter::default()).len(), 3);
    }

    #[test]
    fn test_enable_and_disable_combine() {
        let filter = TypeFilter::default().enable(["a", "b"]).disable(["b"]);
        assert_eq!(registry().filtered(&filter).names(), vec!["a".to_string()]);
    }

    #[test]
    fn test_lookup_unknown_type() {
        assert!(matches!(registry().lookup("z"), Err(Error::UnknownType { .. })));
    }
}
