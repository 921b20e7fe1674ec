//! `mackerel_channel`
//!
//! Only served by the legacy generation. A channel is exactly one of an
//! email, slack or webhook block. Mackerel has no channel update API, so
//! every attribute forces replacement.

use super::{LegacyCrud, LegacyDataSource, LegacyRead, LegacyResource, ResourceData, delete_result, read_error};
use crate::error::{Error, Result};
use crate::schema::{Attribute, Block, Schema};
use crate::traits::client::{Channel, MackerelClient};
use crate::validators::{self, CHANNEL_EVENTS};
use crate::value::Value;
use async_trait::async_trait;

pub const TYPE_NAME: &str = "mackerel_channel";

const DISPLAY_NAME: &str = "Channel";

const KINDS: [&str; 3] = ["email", "slack", "webhook"];

fn events() -> Attribute {
    Attribute::string_set()
        .optional()
        .validator(validators::each_value(validators::one_of(CHANNEL_EVENTS)))
}

fn kind_blocks(schema: Schema, computed: bool) -> Schema {
    let email = Schema::new("")
        .attribute("emails", Attribute::string_set().optional())
        .attribute("user_ids", Attribute::string_set().optional())
        .attribute("events", events());
    let slack = Schema::new("")
        .attribute(
            "url",
            Attribute::string()
                .required()
                .sensitive()
                .validator(validators::is_url_with_http_or_https()),
        )
        .attribute("enabled_graph_image", Attribute::bool().optional().default_value(false))
        .attribute("events", events());
    let webhook = Schema::new("")
        .attribute(
            "url",
            Attribute::string()
                .required()
                .validator(validators::is_url_with_http_or_https()),
        )
        .attribute("events", events());

    let block = |s: Schema| {
        let b = Block::list(s).max_items(1);
        if computed { b.computed() } else { b.requires_replace() }
    };
    schema
        .block("email", block(email))
        .block("slack", block(slack))
        .block("webhook", block(webhook))
}

pub fn resource() -> LegacyResource {
    let schema = Schema::new("Manages a Mackerel notification channel.")
        .attribute("id", Attribute::string().computed())
        .attribute(
            "name",
            Attribute::string()
                .required()
                .requires_replace()
                .validator(validators::length_between(1, 255)),
        );
    LegacyResource::new(kind_blocks(schema, false), ChannelCrud).exactly_one_of(&KINDS)
}

pub fn data_source() -> LegacyDataSource {
    let schema = Schema::new("Looks up a Mackerel notification channel by id.")
        .attribute("id", Attribute::string().required())
        .attribute("name", Attribute::string().computed());
    LegacyDataSource::new(kind_blocks(schema, true), ChannelLookup)
}

fn strings(block: &Value, key: &str) -> Option<Vec<String>> {
    block
        .get(key)
        .as_list()
        .map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
}

fn expand(d: &ResourceData) -> Result<Channel> {
    let mut channel = Channel {
        name: d.get_str("name").to_string(),
        ..Channel::default()
    };
    let Some((kind, block)) = KINDS
        .iter()
        .find_map(|kind| d.get_blocks(kind).first().map(|block| (*kind, block)))
    else {
        return Err(Error::configuration(
            None,
            format!("exactly one of {} must be specified", KINDS.join(", ")),
        ));
    };
    channel.kind = kind.to_string();
    channel.events = Some(strings(block, "events").unwrap_or_default());
    match kind {
        "email" => {
            channel.emails = Some(strings(block, "emails").unwrap_or_default());
            channel.user_ids = Some(strings(block, "user_ids").unwrap_or_default());
        }
        "slack" => {
            channel.url = block.get("url").as_str().map(str::to_string);
            channel.enabled_graph_image = Some(block.get("enabled_graph_image").as_bool().unwrap_or_default());
        }
        _ => {
            channel.url = block.get("url").as_str().map(str::to_string);
        }
    }
    Ok(channel)
}

fn optional_set(items: Option<Vec<String>>) -> Value {
    match items {
        Some(items) if !items.is_empty() => Value::string_list(items),
        _ => Value::Null,
    }
}

fn flatten(channel: Channel, d: &mut ResourceData) {
    d.set("name", channel.name);
    for kind in KINDS {
        d.set(kind, Value::List(Vec::new()));
    }
    let events = optional_set(channel.events);
    let block = match channel.kind.as_str() {
        "email" => Value::object([
            ("emails", optional_set(channel.emails)),
            ("user_ids", optional_set(channel.user_ids)),
            ("events", events),
        ]),
        "slack" => Value::object([
            ("url", channel.url.map(Value::String).unwrap_or_default()),
            (
                "enabled_graph_image",
                Value::Bool(channel.enabled_graph_image.unwrap_or_default()),
            ),
            ("events", events),
        ]),
        "webhook" => Value::object([
            ("url", channel.url.map(Value::String).unwrap_or_default()),
            ("events", events),
        ]),
        // line, chatwork, typetalk... are readable but not manageable here
        _ => return,
    };
    d.set(channel.kind, Value::List(vec![block]));
}

struct ChannelCrud;

#[async_trait]
impl LegacyCrud for ChannelCrud {
    fn display_name(&self) -> &'static str {
        DISPLAY_NAME
    }

    async fn create(&self, d: &mut ResourceData, client: &dyn MackerelClient) -> Result<()> {
        let channel = client.create_channel(&expand(d)?).await.map_err(|e| Error::Create {
            type_name: DISPLAY_NAME.to_string(),
            message: e.to_string(),
        })?;
        d.set_id(channel.id);
        self.read(d, client).await
    }

    async fn read(&self, d: &mut ResourceData, client: &dyn MackerelClient) -> Result<()> {
        let id = d.id().to_string();
        match client.find_channel(&id).await {
            Ok(channel) => {
                flatten(channel, d);
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                d.set_id("");
                Ok(())
            }
            Err(e) => Err(read_error(DISPLAY_NAME, &id, e)),
        }
    }

    async fn delete(&self, d: &ResourceData, client: &dyn MackerelClient) -> Result<()> {
        delete_result(DISPLAY_NAME, d.id(), client.delete_channel(d.id()).await)
    }
}

struct ChannelLookup;

#[async_trait]
impl LegacyRead for ChannelLookup {
    async fn read(&self, d: &mut ResourceData, client: &dyn MackerelClient) -> Result<()> {
        let id = d.get_str("id").to_string();
        let channel = client.find_channel(&id).await.map_err(|e| read_error(DISPLAY_NAME, &id, e))?;
        d.set_id(id);
        flatten(channel, d);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_slack_block() {
        let d = ResourceData::from_value(&Value::object([
            ("name", Value::string("alerts")),
            (
                "slack",
                Value::List(vec![Value::object([
                    ("url", Value::string("https://hooks.slack.com/services/x")),
                    ("events", Value::string_list(["alert"])),
                ])]),
            ),
        ]));
        let channel = expand(&d).unwrap();
        assert_eq!(channel.kind, "slack");
        assert_eq!(channel.enabled_graph_image, Some(false));
        assert_eq!(channel.events, Some(vec!["alert".to_string()]));
    }

    #[test]
    fn test_expand_without_kind_block_fails() {
        let d = ResourceData::from_value(&Value::object([("name", Value::string("alerts"))]));
        assert!(expand(&d).is_err());
    }

    #[test]
    fn test_flatten_resets_other_kinds() {
        let mut d = ResourceData::with_id("c1");
        flatten(
            Channel {
                id: "c1".to_string(),
                name: "ops".to_string(),
                kind: "email".to_string(),
                emails: Some(vec!["ops@example.com".to_string()]),
                ..Channel::default()
            },
            &mut d,
        );
        assert_eq!(d.get_blocks("email").len(), 1);
        assert!(d.get_blocks("slack").is_empty());
        assert_eq!(d.get_blocks("email")[0].get("user_ids"), &Value::Null);
    }
}
