//! `mackerel_service` resource and data source
//!
//! A service is identified by its name. Mackerel cannot rename a service or
//! edit its memo, so every declared change is a replacement.

use crate::error::{ClientError, Result};
use crate::schema::{Attribute, Schema};
use crate::traits::client::{MackerelClient, Service, ServiceParam};
use crate::traits::resource::{DataSourceMapper, ResourceMapper};
use crate::validators;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const TYPE_NAME: &str = "mackerel_service";

/// State model shared by the resource and the data source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceModel {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub memo: Option<String>,
    #[serde(default)]
    pub roles: Option<Vec<String>>,
}

impl From<Service> for ServiceModel {
    fn from(service: Service) -> Self {
        Self {
            id: Some(service.name.clone()),
            name: service.name,
            memo: Some(service.memo),
            roles: Some(service.roles),
        }
    }
}

#[derive(Debug, Default)]
pub struct ServiceResource;

#[async_trait]
impl ResourceMapper for ServiceResource {
    type Model = ServiceModel;
    type Entity = Service;
    type Payload = ServiceParam;

    const TYPE_NAME: &'static str = TYPE_NAME;
    const DISPLAY_NAME: &'static str = "Service";

    fn schema(&self) -> Schema {
        Schema::new("The `mackerel_service` resource allows creating and management of Service.")
            .attribute("id", Attribute::string().computed())
            .attribute(
                "name",
                Attribute::string()
                    .required()
                    .requires_replace()
                    .validator(validators::service_name())
                    .describe("The name of service."),
            )
            .attribute(
                "memo",
                Attribute::string()
                    .optional()
                    .requires_replace()
                    .default_value("")
                    .describe("Notes related to this service."),
            )
            .attribute(
                "roles",
                Attribute::string_set()
                    .computed()
                    .describe("Names of the roles belonging to this service."),
            )
    }

    fn to_create_payload(&self, model: &ServiceModel) -> Result<ServiceParam> {
        Ok(ServiceParam {
            name: model.name.clone(),
            memo: model.memo.clone().unwrap_or_default(),
        })
    }

    fn from_remote_entity(&self, entity: Service) -> Result<ServiceModel> {
        Ok(entity.into())
    }

    fn identity_of(&self, model: &ServiceModel) -> Option<String> {
        Some(model.name.clone())
    }

    fn entity_identity(&self, entity: &Service) -> String {
        entity.name.clone()
    }

    fn is_immutable(&self, field: &str) -> bool {
        matches!(field, "name" | "memo")
    }

    fn update_supported(&self) -> bool {
        false
    }

    async fn remote_create(
        &self,
        client: &dyn MackerelClient,
        payload: ServiceParam,
    ) -> std::result::Result<Service, ClientError> {
        client.create_service(&payload).await
    }

    async fn remote_read(&self, client: &dyn MackerelClient, id: &str) -> std::result::Result<Service, ClientError> {
        client.find_service(id).await
    }

    async fn remote_delete(&self, client: &dyn MackerelClient, id: &str) -> std::result::Result<(), ClientError> {
        client.delete_service(id).await.map(|_| ())
    }
}

#[derive(Debug, Default)]
pub struct ServiceDataSource;

#[async_trait]
impl DataSourceMapper for ServiceDataSource {
    type Model = ServiceModel;
    type Entity = Service;

    const TYPE_NAME: &'static str = TYPE_NAME;
    const DISPLAY_NAME: &'static str = "Service";

    fn schema(&self) -> Schema {
        Schema::new("This data source allows access to details of a specific Service.")
            .attribute("id", Attribute::string().computed())
            .attribute(
                "name",
                Attribute::string()
                    .required()
                    .validator(validators::service_name())
                    .describe("The name of service."),
            )
            .attribute("memo", Attribute::string().computed())
            .attribute("roles", Attribute::string_set().computed())
    }

    fn lookup_identity(&self, model: &ServiceModel) -> Result<String> {
        Ok(model.name.clone())
    }

    fn from_remote_entity(&self, entity: Service) -> Result<ServiceModel> {
        Ok(entity.into())
    }

    async fn remote_read(&self, client: &dyn MackerelClient, id: &str) -> std::result::Result<Service, ClientError> {
        client.find_service(id).await
    }
}
