//! `mackerel_service_metric_names` data source
//!
//! Lists the metric names posted to a service, optionally narrowed by prefix.

use super::{LegacyDataSource, LegacyRead, ResourceData, read_error};
use crate::error::Result;
use crate::schema::{Attribute, Schema};
use crate::traits::client::MackerelClient;
use crate::validators;
use crate::value::Value;
use async_trait::async_trait;

pub const TYPE_NAME: &str = "mackerel_service_metric_names";

pub fn data_source() -> LegacyDataSource {
    let schema = Schema::new("Lists the metric names of a Mackerel service.")
        .attribute("id", Attribute::string().computed())
        .attribute("service_name", Attribute::string().required().validator(validators::service_name()))
        .attribute("prefix", Attribute::string().optional())
        .attribute("names", Attribute::string_set().computed());
    LegacyDataSource::new(schema, MetricNamesLookup)
}

struct MetricNamesLookup;

#[async_trait]
impl LegacyRead for MetricNamesLookup {
    async fn read(&self, d: &mut ResourceData, client: &dyn MackerelClient) -> Result<()> {
        let service = d.get_str("service_name").to_string();
        let prefix = d.get_str("prefix").to_string();
        let names: Vec<String> = client
            .list_service_metric_names(&service)
            .await
            .map_err(|e| read_error("ServiceMetricNames", &service, e))?
            .into_iter()
            .filter(|name| name.starts_with(&prefix))
            .collect();
        d.set_id(service);
        d.set("names", Value::string_list(names));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryClient;
    use crate::traits::client::ServiceParam;

    #[tokio::test]
    async fn test_names_are_filtered_by_prefix() {
        let client = MemoryClient::new();
        let param = ServiceParam {
            name: "web".to_string(),
            memo: String::new(),
        };
        client.create_service(&param).await.unwrap();
        client
            .seed_metric_names("web", ["custom.app.requests", "custom.app.errors", "custom.db.lag"])
            .await
            .unwrap();

        let mut d = ResourceData::from_value(&Value::object([
            ("service_name", Value::string("web")),
            ("prefix", Value::string("custom.app.")),
        ]));
        MetricNamesLookup.read(&mut d, &client).await.unwrap();

        assert_eq!(d.id(), "web");
        assert_eq!(d.get_string_set("names"), vec!["custom.app.requests", "custom.app.errors"]);
    }

    #[tokio::test]
    async fn test_unknown_service_is_a_read_error() {
        let client = MemoryClient::new();
        let mut d = ResourceData::from_value(&Value::object([("service_name", Value::string("web"))]));
        assert!(MetricNamesLookup.read(&mut d, &client).await.is_err());
    }
}
