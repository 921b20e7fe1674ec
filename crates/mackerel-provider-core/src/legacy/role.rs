use super::{LegacyCrud, LegacyDataSource, LegacyRead, LegacyResource, ResourceData, delete_result, read_error};
use crate::error::{ClientError, Error, Result};
use crate::resources::role::{parse_role_id, role_id};
use crate::schema::{Attribute, Schema};
use crate::traits::client::{MackerelClient, Role};
use crate::validators;
use async_trait::async_trait;

pub const TYPE_NAME: &str = "mackerel_role";

const DISPLAY_NAME: &str = "Role";

pub fn resource() -> LegacyResource {
    let schema = Schema::new("Manages a role of a Mackerel service.")
        .attribute("id", Attribute::string().computed())
        .attribute(
            "service",
            Attribute::string()
                .required()
                .requires_replace()
                .validator(validators::service_name()),
        )
        .attribute(
            "name",
            Attribute::string()
                .required()
                .requires_replace()
                .validator(validators::role_name()),
        )
        .attribute("memo", Attribute::string().optional().requires_replace().default_value(""));
    LegacyResource::new(schema, RoleCrud)
}

pub fn data_source() -> LegacyDataSource {
    let schema = Schema::new("Looks up a role of a Mackerel service.")
        .attribute("id", Attribute::string().computed())
        .attribute("service", Attribute::string().required().validator(validators::service_name()))
        .attribute("name", Attribute::string().required().validator(validators::role_name()))
        .attribute("memo", Attribute::string().computed());
    LegacyDataSource::new(schema, RoleLookup)
}

async fn find(client: &dyn MackerelClient, id: &str) -> std::result::Result<(String, Role), ClientError> {
    let (service, name) =
        parse_role_id(id).ok_or_else(|| ClientError::not_found(format!("'{id}' is not a <service>:<role> id")))?;
    let role = client.find_role(service, name).await?;
    Ok((service.to_string(), role))
}

fn flatten(service: String, role: Role, d: &mut ResourceData) {
    d.set("service", service);
    d.set("name", role.name);
    d.set("memo", role.memo);
}

struct RoleCrud;

#[async_trait]
impl LegacyCrud for RoleCrud {
    fn display_name(&self) -> &'static str {
        DISPLAY_NAME
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

    async fn create(&self, d: &mut ResourceData, client: &dyn MackerelClient) -> Result<()> {
        let service = d.get_str("service").to_string();
        let param = Role {
            name: d.get_str("name").to_string(),
            memo: d.get_str("memo").to_string(),
        };
        let role = client.create_role(&service, &param).await.map_err(|e| Error::Create {
            type_name: DISPLAY_NAME.to_string(),
            message: e.to_string(),
        })?;
        d.set_id(role_id(&service, &role.name));
        self.read(d, client).await
    }

    async fn read(&self, d: &mut ResourceData, client: &dyn MackerelClient) -> Result<()> {
        let id = d.id().to_string();
        match find(client, &id).await {
            Ok((service, role)) => {
                flatten(service, role, d);
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
        let Some((service, name)) = parse_role_id(d.id()) else {
            return Err(Error::Delete {
                type_name: DISPLAY_NAME.to_string(),
                id: d.id().to_string(),
                message: "the ID must be in the form '<service name>:<role name>'".to_string(),
            });
        };
        delete_result(DISPLAY_NAME, d.id(), client.delete_role(service, name).await)
    }
}

struct RoleLookup;

#[async_trait]
impl LegacyRead for RoleLookup {
    async fn read(&self, d: &mut ResourceData, client: &dyn MackerelClient) -> Result<()> {
        let id = role_id(d.get_str("service"), d.get_str("name"));
        let (service, role) = find(client, &id).await.map_err(|e| read_error(DISPLAY_NAME, &id, e))?;
        d.set_id(id);
        flatten(service, role, d);
        Ok(())
    }
}
