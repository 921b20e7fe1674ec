use super::{LegacyCrud, LegacyDataSource, LegacyRead, LegacyResource, ResourceData, delete_result, read_error};
use crate::error::{Error, Result};
use crate::schema::{Attribute, Schema};
use crate::traits::client::{MackerelClient, Service, ServiceParam};
use crate::validators;
use crate::value::Value;
use async_trait::async_trait;

pub const TYPE_NAME: &str = "mackerel_service";

const DISPLAY_NAME: &str = "Service";

pub fn resource() -> LegacyResource {
    let schema = Schema::new("Manages a Mackerel service.")
        .attribute("id", Attribute::string().computed())
        .attribute(
            "name",
            Attribute::string()
                .required()
                .requires_replace()
                .validator(validators::service_name()),
        )
        .attribute("memo", Attribute::string().optional().requires_replace().default_value(""))
        .attribute("roles", Attribute::string_set().computed());
    LegacyResource::new(schema, ServiceCrud)
}

pub fn data_source() -> LegacyDataSource {
    let schema = Schema::new("Looks up a Mackerel service by name.")
        .attribute("id", Attribute::string().computed())
        .attribute("name", Attribute::string().required().validator(validators::service_name()))
        .attribute("memo", Attribute::string().computed())
        .attribute("roles", Attribute::string_set().computed());
    LegacyDataSource::new(schema, ServiceLookup)
}

fn flatten(service: Service, d: &mut ResourceData) {
    d.set("name", service.name);
    d.set("memo", service.memo);
    d.set("roles", Value::string_list(service.roles));
}

struct ServiceCrud;

#[async_trait]
impl LegacyCrud for ServiceCrud {
    fn display_name(&self) -> &'static str {
        DISPLAY_NAME
    }

    async fn create(&self, d: &mut ResourceData, client: &dyn MackerelClient) -> Result<()> {
        let param = ServiceParam {
            name: d.get_str("name").to_string(),
            memo: d.get_str("memo").to_string(),
        };
        let service = client.create_service(&param).await.map_err(|e| Error::Create {
            type_name: DISPLAY_NAME.to_string(),
            message: e.to_string(),
        })?;
        d.set_id(service.name);
        self.read(d, client).await
    }

    async fn read(&self, d: &mut ResourceData, client: &dyn MackerelClient) -> Result<()> {
        let id = d.id().to_string();
        match client.find_service(&id).await {
            Ok(service) => {
                flatten(service, d);
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
        delete_result(DISPLAY_NAME, d.id(), client.delete_service(d.id()).await)
    }
}

struct ServiceLookup;

#[async_trait]
impl LegacyRead for ServiceLookup {
    async fn read(&self, d: &mut ResourceData, client: &dyn MackerelClient) -> Result<()> {
        let name = d.get_str("name").to_string();
        let service = client
            .find_service(&name)
            .await
            .map_err(|e| read_error(DISPLAY_NAME, &name, e))?;
        d.set_id(service.name.clone());
        flatten(service, d);
        Ok(())
    }
}
