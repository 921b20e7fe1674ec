// # Mackerel Client Trait
//
// Defines the remote client handle every lifecycle controller talks to.
//
// ## Implementations
//
// - HTTP: `mackerel-client-http` crate
// - In-memory: `crate::memory::MemoryClient` (tests and offline runs)
//
// ## Usage
//
// ```rust,ignore
// use mackerel_provider_core::traits::{ClientConfig, ClientFactory};
//
// let client = factory.connect(&ClientConfig::new("api-key"))?;
// let services = client.find_services().await?;
// ```

use crate::error::{ClientError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Default Mackerel API endpoint
pub const DEFAULT_API_BASE: &str = "https://api.mackerelio.com/";

/// A Mackerel service
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub name: String,
    #[serde(default)]
    pub memo: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Body of a service creation request
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ServiceParam {
    pub name: String,
    pub memo: String,
}

/// A role belonging to a service
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub name: String,
    #[serde(default)]
    pub memo: String,
}

/// A notification group
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationGroup {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    pub notification_level: String,
    #[serde(default)]
    pub child_notification_group_ids: Vec<String>,
    #[serde(default)]
    pub child_channel_ids: Vec<String>,
    #[serde(default)]
    pub monitors: Vec<NotificationGroupMonitor>,
    #[serde(default)]
    pub services: Vec<NotificationGroupService>,
}

/// Monitor reference of a notification group
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationGroupMonitor {
    pub id: String,
    #[serde(default)]
    pub skip_default: bool,
}

/// Service reference of a notification group
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NotificationGroupService {
    pub name: String,
}

/// A notification channel (email, slack or webhook)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emails: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled_graph_image: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<String>>,
}

/// Remote client handle for the Mackerel API
///
/// Each method performs exactly one remote call. Implementations never retry;
/// failures are returned to the lifecycle controller as-is.
///
/// # Thread Safety
///
/// A single handle is shared by every controller of a provider server, so
/// implementations must be usable concurrently.
#[async_trait]
pub trait MackerelClient: Send + Sync {
    async fn find_services(&self) -> std::result::Result<Vec<Service>, ClientError>;

    async fn create_service(&self, param: &ServiceParam) -> std::result::Result<Service, ClientError>;

    async fn delete_service(&self, name: &str) -> std::result::Result<Service, ClientError>;

    async fn find_roles(&self, service: &str) -> std::result::Result<Vec<Role>, ClientError>;

    async fn create_role(&self, service: &str, role: &Role) -> std::result::Result<Role, ClientError>;

    async fn delete_role(&self, service: &str, role: &str) -> std::result::Result<Role, ClientError>;

    async fn find_notification_groups(&self) -> std::result::Result<Vec<NotificationGroup>, ClientError>;

    async fn create_notification_group(
        &self,
        group: &NotificationGroup,
    ) -> std::result::Result<NotificationGroup, ClientError>;

    async fn update_notification_group(
        &self,
        id: &str,
        group: &NotificationGroup,
    ) -> std::result::Result<NotificationGroup, ClientError>;

    async fn delete_notification_group(&self, id: &str) -> std::result::Result<NotificationGroup, ClientError>;

    async fn find_channels(&self) -> std::result::Result<Vec<Channel>, ClientError>;

    async fn create_channel(&self, channel: &Channel) -> std::result::Result<Channel, ClientError>;

    async fn delete_channel(&self, id: &str) -> std::result::Result<Channel, ClientError>;

    /// Metric names posted to a service
    async fn list_service_metric_names(&self, service: &str) -> std::result::Result<Vec<String>, ClientError>;

    /// Find one service by name
    async fn find_service(&self, name: &str) -> std::result::Result<Service, ClientError> {
        self.find_services()
            .await?
            .into_iter()
            .find(|s| s.name == name)
            .ok_or_else(|| ClientError::not_found(format!("the name '{name}' does not match any service")))
    }

    /// Find one role of a service by name
    async fn find_role(&self, service: &str, name: &str) -> std::result::Result<Role, ClientError> {
        self.find_roles(service)
            .await?
            .into_iter()
            .find(|r| r.name == name)
            .ok_or_else(|| {
                ClientError::not_found(format!("the name '{name}' does not match any role in '{service}'"))
            })
    }

    /// Find one notification group by id
    async fn find_notification_group(&self, id: &str) -> std::result::Result<NotificationGroup, ClientError> {
        self.find_notification_groups()
            .await?
            .into_iter()
            .find(|g| g.id == id)
            .ok_or_else(|| ClientError::not_found(format!("the ID '{id}' does not match any notification group")))
    }

    /// Find one channel by id
    async fn find_channel(&self, id: &str) -> std::result::Result<Channel, ClientError> {
        self.find_channels()
            .await?
            .into_iter()
            .find(|c| c.id == id)
            .ok_or_else(|| ClientError::not_found(format!("the ID '{id}' does not match any channel")))
    }
}

/// Connection settings of a client handle
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub api_key: String,
    pub api_base: String,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }
}

// The API key is never printed
impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"<redacted>")
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// Factory for creating client handles
///
/// Mirrors how provider servers obtain their handle during `configure`.
pub trait ClientFactory: Send + Sync {
    fn connect(&self, config: &ClientConfig) -> Result<Arc<dyn MackerelClient>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_debug_redacts_key() {
        let config = ClientConfig::new("secret-key");
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret-key"));
        assert!(debug.contains(DEFAULT_API_BASE));
    }

    #[test]
    fn test_notification_group_wire_names() {
        let group: NotificationGroup = serde_json::from_value(serde_json::json!({
            "id": "ng1",
            "name": "ops",
            "notificationLevel": "all",
            "childNotificationGroupIds": [],
            "childChannelIds": ["c1"],
            "monitors": [{"id": "m1", "skipDefault": true}],
            "services": [{"name": "web"}]
        }))
        .unwrap();
        assert_eq!(group.child_channel_ids, vec!["c1".to_string()]);
        assert!(group.monitors[0].skip_default);
    }
}
