//! Caller protocol
//!
//! The operation surface the orchestrator drives. Both engine generations and
//! the multiplexer in front of them implement [`ProviderServer`], so a caller
//! cannot tell which generation serves a given type.

use crate::error::Result;
use crate::schema::{PlannedChange, Schema, plan};
use crate::value::Value;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a registered type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    Resource,
    DataSource,
}

impl Kind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Resource => "resource",
            Self::DataSource => "data source",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Engine generation serving a type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Generation {
    /// Schema-driven implementation
    Legacy,
    /// Strongly-typed implementation
    Current,
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Legacy => f.write_str("legacy"),
            Self::Current => f.write_str("current"),
        }
    }
}

/// A provider server
///
/// `configure` must complete before any lifecycle operation; operations on an
/// unconfigured server fail with a client-unavailable error.
#[async_trait]
pub trait ProviderServer: Send + Sync {
    /// Resource type names served, in registration order
    fn resource_types(&self) -> Vec<String>;

    /// Data source type names served, in registration order
    fn data_source_types(&self) -> Vec<String>;

    fn provider_schema(&self) -> Schema;

    fn resource_schema(&self, type_name: &str) -> Result<Schema>;

    fn data_source_schema(&self, type_name: &str) -> Result<Schema>;

    /// Bind the remote client handle from the provider configuration
    async fn configure(&self, config: &Value) -> Result<()>;

    async fn validate_resource_config(&self, type_name: &str, config: &Value) -> Result<()> {
        self.resource_schema(type_name)?.ensure_valid(config)
    }

    async fn validate_data_source_config(&self, type_name: &str, config: &Value) -> Result<()> {
        self.data_source_schema(type_name)?.ensure_valid(config)
    }

    async fn plan_resource_change(
        &self,
        type_name: &str,
        prior: Option<&Value>,
        config: Option<&Value>,
    ) -> Result<PlannedChange> {
        if let Some(config) = config {
            self.validate_resource_config(type_name, config).await?;
        }
        plan(&self.resource_schema(type_name)?, prior, config)
    }

    /// Apply a planned change
    ///
    /// `prior = None` creates, `planned = None` deletes, both present updates.
    /// Returns the new state, `None` after a delete.
    async fn apply_resource_change(
        &self,
        type_name: &str,
        prior: Option<&Value>,
        planned: Option<&Value>,
    ) -> Result<Option<Value>>;

    /// Refresh a state snapshot; `None` means the remote object is gone
    async fn read_resource(&self, type_name: &str, state: &Value) -> Result<Option<Value>>;

    async fn import_resource_state(&self, type_name: &str, id: &str) -> Result<Value>;

    async fn read_data_source(&self, type_name: &str, config: &Value) -> Result<Value>;
}
