//! `mackerel_notification_group` resource and data source
//!
//! The server assigns the identity. Monitor and service references are sets
//! keyed by monitor id and service name; repeated declarations collapse to
//! the first occurrence before anything is sent. Child id sets are null
//! rather than empty when nothing is referenced.

use crate::error::{ClientError, Error, Result};
use crate::normalize::{Association, normalize};
use crate::schema::{Attribute, Block, Schema};
use crate::traits::client::{
    MackerelClient, NotificationGroup, NotificationGroupMonitor, NotificationGroupService,
};
use crate::traits::resource::{DataSourceMapper, ResourceMapper};
use crate::validators::{self, NOTIFICATION_LEVELS};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const TYPE_NAME: &str = "mackerel_notification_group";

const DEFAULT_LEVEL: &str = "all";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationGroupModel {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub notification_level: Option<String>,
    #[serde(default)]
    pub child_notification_group_ids: Option<Vec<String>>,
    #[serde(default)]
    pub child_channel_ids: Option<Vec<String>>,
    #[serde(default)]
    pub monitor: Vec<MonitorRef>,
    #[serde(default)]
    pub service: Vec<ServiceRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitorRef {
    pub id: String,
    #[serde(default)]
    pub skip_default: Option<bool>,
}

impl Association for MonitorRef {
    type Key = String;

    fn identity(&self) -> String {
        self.id.clone()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceRef {
    pub name: String,
}

impl Association for ServiceRef {
    type Key = String;

    fn identity(&self) -> String {
        self.name.clone()
    }
}

fn none_if_empty(ids: Vec<String>) -> Option<Vec<String>> {
    if ids.is_empty() { None } else { Some(normalize(ids)) }
}

impl From<NotificationGroup> for NotificationGroupModel {
    fn from(group: NotificationGroup) -> Self {
        Self {
            id: Some(group.id),
            name: group.name,
            notification_level: Some(group.notification_level),
            child_notification_group_ids: none_if_empty(group.child_notification_group_ids),
            child_channel_ids: none_if_empty(group.child_channel_ids),
            monitor: normalize(group.monitors.into_iter().map(|m| MonitorRef {
                id: m.id,
                skip_default: Some(m.skip_default),
            })),
            service: normalize(group.services.into_iter().map(|s| ServiceRef { name: s.name })),
        }
    }
}

fn monitor_schema() -> Schema {
    Schema::new("")
        .attribute("id", Attribute::string().required().describe("The monitor ID."))
        .attribute(
            "skip_default",
            Attribute::bool()
                .optional()
                .default_value(false)
                .describe("Whether to skip the default notification for the monitor."),
        )
}

fn service_ref_schema() -> Schema {
    Schema::new("").attribute(
        "name",
        Attribute::string()
            .required()
            .validator(validators::service_name())
            .describe("The service name."),
    )
}

#[derive(Debug, Default)]
pub struct NotificationGroupResource;

#[async_trait]
impl ResourceMapper for NotificationGroupResource {
    type Model = NotificationGroupModel;
    type Entity = NotificationGroup;
    type Payload = NotificationGroup;

    const TYPE_NAME: &'static str = TYPE_NAME;
    const DISPLAY_NAME: &'static str = "NotificationGroup";

    fn schema(&self) -> Schema {
        Schema::new("The `mackerel_notification_group` resource allows creating and management of notification groups.")
            .attribute("id", Attribute::string().computed())
            .attribute(
                "name",
                Attribute::string()
                    .required()
                    .validator(validators::length_between(1, 255))
                    .describe("The name of the notification group."),
            )
            .attribute(
                "notification_level",
                Attribute::string()
                    .optional()
                    .default_value(DEFAULT_LEVEL)
                    .validator(validators::one_of(NOTIFICATION_LEVELS))
                    .describe("The notification level. Valid values are `all` and `critical`."),
            )
            .attribute(
                "child_notification_group_ids",
                Attribute::string_set()
                    .optional()
                    .validator(validators::size_at_least(1))
                    .describe("A set of notification group IDs."),
            )
            .attribute(
                "child_channel_ids",
                Attribute::string_set()
                    .optional()
                    .validator(validators::size_at_least(1))
                    .describe("A set of notification channel IDs."),
            )
            .block("monitor", Block::set(monitor_schema()).identity(&["id"]))
            .block("service", Block::set(service_ref_schema()).identity(&["name"]))
    }

    fn to_create_payload(&self, model: &NotificationGroupModel) -> Result<NotificationGroup> {
        let level = model.notification_level.as_deref().unwrap_or(DEFAULT_LEVEL);
        if !NOTIFICATION_LEVELS.contains(&level) {
            return Err(Error::configuration(
                Some(crate::value::AttributePath::root("notification_level")),
                format!("unsupported notification level {level:?}"),
            ));
        }
        Ok(NotificationGroup {
            id: String::new(),
            name: model.name.clone(),
            notification_level: level.to_string(),
            child_notification_group_ids: normalize(model.child_notification_group_ids.clone().unwrap_or_default()),
            child_channel_ids: normalize(model.child_channel_ids.clone().unwrap_or_default()),
            monitors: normalize(model.monitor.iter().cloned())
                .into_iter()
                .map(|m| NotificationGroupMonitor {
                    id: m.id,
                    skip_default: m.skip_default.unwrap_or(false),
                })
                .collect(),
            services: normalize(model.service.iter().cloned())
                .into_iter()
                .map(|s| NotificationGroupService { name: s.name })
                .collect(),
        })
    }

    fn from_remote_entity(&self, entity: NotificationGroup) -> Result<NotificationGroupModel> {
        if entity.id.is_empty() {
            return Err(Error::decode("notification group without id"));
        }
        Ok(entity.into())
    }

    fn identity_of(&self, _model: &NotificationGroupModel) -> Option<String> {
        None
    }

    fn entity_identity(&self, entity: &NotificationGroup) -> String {
        entity.id.clone()
    }

    fn is_immutable(&self, _field: &str) -> bool {
        false
    }

    fn update_supported(&self) -> bool {
        true
    }

    async fn remote_create(
        &self,
        client: &dyn MackerelClient,
        payload: NotificationGroup,
    ) -> std::result::Result<NotificationGroup, ClientError> {
        client.create_notification_group(&payload).await
    }

    async fn remote_read(
        &self,
        client: &dyn MackerelClient,
        id: &str,
    ) -> std::result::Result<NotificationGroup, ClientError> {
        client.find_notification_group(id).await
    }

    async fn remote_update(
        &self,
        client: &dyn MackerelClient,
        id: &str,
        payload: NotificationGroup,
    ) -> std::result::Result<NotificationGroup, ClientError> {
        client.update_notification_group(id, &payload).await
    }

    async fn remote_delete(&self, client: &dyn MackerelClient, id: &str) -> std::result::Result<(), ClientError> {
        client.delete_notification_group(id).await.map(|_| ())
    }
}

#[derive(Debug, Default)]
pub struct NotificationGroupDataSource;

#[async_trait]
impl DataSourceMapper for NotificationGroupDataSource {
    type Model = NotificationGroupModel;
    type Entity = NotificationGroup;

    const TYPE_NAME: &'static str = TYPE_NAME;
    const DISPLAY_NAME: &'static str = "NotificationGroup";

    fn schema(&self) -> Schema {
        Schema::new("This data source allows access to details of a specific notification group.")
            .attribute("id", Attribute::string().required().describe("The ID of the notification group."))
            .attribute("name", Attribute::string().computed())
            .attribute("notification_level", Attribute::string().computed())
            .attribute("child_notification_group_ids", Attribute::string_set().computed())
            .attribute("child_channel_ids", Attribute::string_set().computed())
            .block("monitor", Block::set(monitor_schema()).identity(&["id"]).computed())
            .block("service", Block::set(service_ref_schema()).identity(&["name"]).computed())
    }

    fn lookup_identity(&self, model: &NotificationGroupModel) -> Result<String> {
        model
            .id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::configuration(Some(crate::value::AttributePath::root("id")), "id is required"))
    }

    fn from_remote_entity(&self, entity: NotificationGroup) -> Result<NotificationGroupModel> {
        Ok(entity.into())
    }

    async fn remote_read(
        &self,
        client: &dyn MackerelClient,
        id: &str,
    ) -> std::result::Result<NotificationGroup, ClientError> {
        client.find_notification_group(id).await
    }
}
