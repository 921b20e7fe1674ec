//! `mackerel_role` resource and data source
//!
//! Roles live under a service and are addressed as `<service>:<role>`.

use crate::error::{ClientError, Error, Result};
use crate::schema::{Attribute, Schema};
use crate::traits::client::{MackerelClient, Role};
use crate::traits::resource::{DataSourceMapper, ResourceMapper};
use crate::validators;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const TYPE_NAME: &str = "mackerel_role";

/// Split a `<service>:<role>` identity
pub fn parse_role_id(id: &str) -> Option<(&str, &str)> {
    match id.split_once(':') {
        Some((service, role)) if !service.is_empty() && !role.is_empty() && !role.contains(':') => {
            Some((service, role))
        }
        _ => None,
    }
}

pub fn role_id(service: &str, role: &str) -> String {
    format!("{service}:{role}")
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleModel {
    #[serde(default)]
    pub id: Option<String>,
    pub service: String,
    pub name: String,
    #[serde(default)]
    pub memo: Option<String>,
}

/// A role together with the service it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRole {
    pub service: String,
    pub role: Role,
}

impl From<ServiceRole> for RoleModel {
    fn from(entity: ServiceRole) -> Self {
        Self {
            id: Some(role_id(&entity.service, &entity.role.name)),
            service: entity.service,
            name: entity.role.name,
            memo: Some(entity.role.memo),
        }
    }
}

async fn read_role(client: &dyn MackerelClient, id: &str) -> std::result::Result<ServiceRole, ClientError> {
    let (service, name) =
        parse_role_id(id).ok_or_else(|| ClientError::not_found(format!("'{id}' is not a <service>:<role> id")))?;
    let role = client.find_role(service, name).await?;
    Ok(ServiceRole {
        service: service.to_string(),
        role,
    })
}

#[derive(Debug, Default)]
pub struct RoleResource;

#[async_trait]
impl ResourceMapper for RoleResource {
    type Model = RoleModel;
    type Entity = ServiceRole;
    type Payload = ServiceRole;

    const TYPE_NAME: &'static str = TYPE_NAME;
    const DISPLAY_NAME: &'static str = "Role";

    fn schema(&self) -> Schema {
        Schema::new("The `mackerel_role` resource allows creating and management of Role.")
            .attribute("id", Attribute::string().computed())
            .attribute(
                "service",
                Attribute::string()
                    .required()
                    .requires_replace()
                    .validator(validators::service_name())
                    .describe("The name of the service the role belongs to."),
            )
            .attribute(
                "name",
                Attribute::string()
                    .required()
                    .requires_replace()
                    .validator(validators::role_name())
                    .describe("The name of role."),
            )
            .attribute(
                "memo",
                Attribute::string()
                    .optional()
                    .requires_replace()
                    .default_value("")
                    .describe("Notes related to this role."),
            )
    }

    fn to_create_payload(&self, model: &RoleModel) -> Result<ServiceRole> {
        Ok(ServiceRole {
            service: model.service.clone(),
            role: Role {
                name: model.name.clone(),
                memo: model.memo.clone().unwrap_or_default(),
            },
        })
    }

    fn from_remote_entity(&self, entity: ServiceRole) -> Result<RoleModel> {
        Ok(entity.into())
    }

    fn identity_of(&self, model: &RoleModel) -> Option<String> {
        Some(role_id(&model.service, &model.name))
    }

    fn entity_identity(&self, entity: &ServiceRole) -> String {
        role_id(&entity.service, &entity.role.name)
    }

    fn is_immutable(&self, field: &str) -> bool {
        matches!(field, "service" | "name" | "memo")
    }

    fn update_supported(&self) -> bool {
        false
    }

    fn check_identity(&self, id: &str) -> Result<()> {
        match parse_role_id(id) {
            Some(_) => Ok(()),
            None => Err(Error::configuration(
                None,
                format!("The ID must be in the form '<service name>:<role name>', got {id:?}"),
            )),
        }
    }

    async fn remote_create(
        &self,
        client: &dyn MackerelClient,
        payload: ServiceRole,
    ) -> std::result::Result<ServiceRole, ClientError> {
        let role = client.create_role(&payload.service, &payload.role).await?;
        Ok(ServiceRole {
            service: payload.service,
            role,
        })
    }

    async fn remote_read(&self, client: &dyn MackerelClient, id: &str) -> std::result::Result<ServiceRole, ClientError> {
        read_role(client, id).await
    }

    async fn remote_delete(&self, client: &dyn MackerelClient, id: &str) -> std::result::Result<(), ClientError> {
        let (service, name) =
            parse_role_id(id).ok_or_else(|| ClientError::not_found(format!("'{id}' is not a <service>:<role> id")))?;
        client.delete_role(service, name).await.map(|_| ())
    }
}

#[derive(Debug, Default)]
pub struct RoleDataSource;

#[async_trait]
impl DataSourceMapper for RoleDataSource {
    type Model = RoleModel;
    type Entity = ServiceRole;

    const TYPE_NAME: &'static str = TYPE_NAME;
    const DISPLAY_NAME: &'static str = "Role";

    fn schema(&self) -> Schema {
        Schema::new("This data source allows access to details of a specific Role.")
            .attribute("id", Attribute::string().computed())
            .attribute(
                "service",
                Attribute::string().required().validator(validators::service_name()),
            )
            .attribute("name", Attribute::string().required().validator(validators::role_name()))
            .attribute("memo", Attribute::string().computed())
    }

    fn lookup_identity(&self, model: &RoleModel) -> Result<String> {
        Ok(role_id(&model.service, &model.name))
    }

    fn from_remote_entity(&self, entity: ServiceRole) -> Result<RoleModel> {
        Ok(entity.into())
    }

    async fn remote_read(&self, client: &dyn MackerelClient, id: &str) -> std::result::Result<ServiceRole, ClientError> {
        read_role(client, id).await
    }
}
