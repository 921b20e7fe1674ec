use super::{LegacyCrud, LegacyDataSource, LegacyRead, LegacyResource, ResourceData, delete_result, read_error};
use crate::error::{Error, Result};
use crate::normalize::normalize_by;
use crate::schema::{Attribute, Block, Schema};
use crate::traits::client::{
    MackerelClient, NotificationGroup, NotificationGroupMonitor, NotificationGroupService,
};
use crate::validators::{self, NOTIFICATION_LEVELS};
use crate::value::Value;
use async_trait::async_trait;

pub const TYPE_NAME: &str = "mackerel_notification_group";

const DISPLAY_NAME: &str = "NotificationGroup";

fn monitor_block(computed: bool) -> Block {
    let block = Block::set(
        Schema::new("")
            .attribute("id", Attribute::string().required())
            .attribute("skip_default", Attribute::bool().optional().default_value(false)),
    )
    .identity(&["id"]);
    if computed { block.computed() } else { block }
}

fn service_block(computed: bool) -> Block {
    let block = Block::set(
        Schema::new("").attribute("name", Attribute::string().required().validator(validators::service_name())),
    )
    .identity(&["name"]);
    if computed { block.computed() } else { block }
}

pub fn resource() -> LegacyResource {
    let schema = Schema::new("Manages a Mackerel notification group.")
        .attribute("id", Attribute::string().computed())
        .attribute("name", Attribute::string().required().validator(validators::length_between(1, 255)))
        .attribute(
            "notification_level",
            Attribute::string()
                .optional()
                .default_value("all")
                .validator(validators::one_of(NOTIFICATION_LEVELS)),
        )
        .attribute(
            "child_notification_group_ids",
            Attribute::string_set().optional().validator(validators::size_at_least(1)),
        )
        .attribute(
            "child_channel_ids",
            Attribute::string_set().optional().validator(validators::size_at_least(1)),
        )
        .block("monitor", monitor_block(false))
        .block("service", service_block(false));
    LegacyResource::new(schema, NotificationGroupCrud)
}

pub fn data_source() -> LegacyDataSource {
    let schema = Schema::new("Looks up a Mackerel notification group by id.")
        .attribute("id", Attribute::string().required())
        .attribute("name", Attribute::string().computed())
        .attribute("notification_level", Attribute::string().computed())
        .attribute("child_notification_group_ids", Attribute::string_set().computed())
        .attribute("child_channel_ids", Attribute::string_set().computed())
        .block("monitor", monitor_block(true))
        .block("service", service_block(true));
    LegacyDataSource::new(schema, NotificationGroupLookup)
}

fn expand(d: &ResourceData) -> NotificationGroup {
    let monitors = normalize_by(
        d.get_blocks("monitor").iter().map(|m| NotificationGroupMonitor {
            id: m.get("id").as_str().unwrap_or_default().to_string(),
            skip_default: m.get("skip_default").as_bool().unwrap_or_default(),
        }),
        |m| m.id.clone(),
    );
    let services = normalize_by(
        d.get_blocks("service").iter().map(|s| NotificationGroupService {
            name: s.get("name").as_str().unwrap_or_default().to_string(),
        }),
        |s| s.name.clone(),
    );
    let level = match d.get_str("notification_level") {
        "" => "all",
        level => level,
    };
    NotificationGroup {
        id: String::new(),
        name: d.get_str("name").to_string(),
        notification_level: level.to_string(),
        child_notification_group_ids: normalize_by(d.get_string_set("child_notification_group_ids"), String::clone),
        child_channel_ids: normalize_by(d.get_string_set("child_channel_ids"), String::clone),
        monitors,
        services,
    }
}

fn id_set(ids: Vec<String>) -> Value {
    if ids.is_empty() { Value::Null } else { Value::string_list(ids) }
}

fn flatten(group: NotificationGroup, d: &mut ResourceData) {
    d.set("name", group.name);
    d.set("notification_level", group.notification_level);
    d.set("child_notification_group_ids", id_set(group.child_notification_group_ids));
    d.set("child_channel_ids", id_set(group.child_channel_ids));
    d.set(
        "monitor",
        Value::List(
            group
                .monitors
                .into_iter()
                .map(|m| Value::object([("id", Value::string(m.id)), ("skip_default", Value::Bool(m.skip_default))]))
                .collect(),
        ),
    );
    d.set(
        "service",
        Value::List(
            group
                .services
                .into_iter()
                .map(|s| Value::object([("name", Value::string(s.name))]))
                .collect(),
        ),
    );
}

struct NotificationGroupCrud;

#[async_trait]
impl LegacyCrud for NotificationGroupCrud {
    fn display_name(&self) -> &'static str {
        DISPLAY_NAME
    }

    async fn create(&self, d: &mut ResourceData, client: &dyn MackerelClient) -> Result<()> {
        let group = client
            .create_notification_group(&expand(d))
            .await
            .map_err(|e| Error::Create {
                type_name: DISPLAY_NAME.to_string(),
                message: e.to_string(),
            })?;
        d.set_id(group.id);
        self.read(d, client).await
    }

    async fn read(&self, d: &mut ResourceData, client: &dyn MackerelClient) -> Result<()> {
        let id = d.id().to_string();
        match client.find_notification_group(&id).await {
            Ok(group) => {
                flatten(group, d);
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                d.set_id("");
                Ok(())
            }
            Err(e) => Err(read_error(DISPLAY_NAME, &id, e)),
        }
    }

    async fn update(&self, d: &mut ResourceData, client: &dyn MackerelClient) -> Result<()> {
        let id = d.id().to_string();
        client
            .update_notification_group(&id, &expand(d))
            .await
            .map_err(|e| Error::Update {
                type_name: DISPLAY_NAME.to_string(),
                id: id.clone(),
                message: e.to_string(),
            })?;
        self.read(d, client).await
    }

    async fn delete(&self, d: &ResourceData, client: &dyn MackerelClient) -> Result<()> {
        delete_result(DISPLAY_NAME, d.id(), client.delete_notification_group(d.id()).await)
    }
}

struct NotificationGroupLookup;

#[async_trait]
impl LegacyRead for NotificationGroupLookup {
    async fn read(&self, d: &mut ResourceData, client: &dyn MackerelClient) -> Result<()> {
        let id = d.get_str("id").to_string();
        let group = client
            .find_notification_group(&id)
            .await
            .map_err(|e| read_error(DISPLAY_NAME, &id, e))?;
        d.set_id(id);
        flatten(group, d);
        Ok(())
    }
}
