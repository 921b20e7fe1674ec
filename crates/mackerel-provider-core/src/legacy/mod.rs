//! Legacy-generation provider server
//!
//! Schema-driven implementations: each type is a [`Schema`] plus CRUD
//! functions working on a dynamic [`ResourceData`]. This generation serves
//! every type the current generation does not override.
//!
//! ## Driver Rules
//!
//! 1. Create and update functions end by reading the object back
//! 2. A read that finds nothing clears the id; the driver reports removal
//! 3. Delete functions treat an already-absent object as deleted
//! 4. Import sets the id and runs read
//!
//! The configured API key takes precedence over the environment.

pub mod channel;
pub mod metric_names;
pub mod notification_group;
pub mod resource_data;
pub mod role;
pub mod service;

pub use resource_data::ResourceData;

use crate::config::{CredentialPrecedence, EnvCredentials, ProviderConfigModel, provider_schema};
use crate::engine::{unconfigured_message, update_unsupported_message};
use crate::error::{ClientError, Diagnostic, Error, Result};
use crate::registry::{Registry, TypeFilter};
use crate::schema::Schema;
use crate::traits::client::{ClientFactory, MackerelClient};
use crate::traits::server::ProviderServer;
use crate::value::{AttributePath, Value};
use async_trait::async_trait;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

/// CRUD functions of one legacy resource type
#[async_trait]
pub trait LegacyCrud: Send + Sync {
    async fn create(&self, d: &mut ResourceData, client: &dyn MackerelClient) -> Result<()>;

    async fn read(&self, d: &mut ResourceData, client: &dyn MackerelClient) -> Result<()>;

    /// In-place update; types without one reject every update
    async fn update(&self, _d: &mut ResourceData, _client: &dyn MackerelClient) -> Result<()> {
        Err(Error::unsupported(self.display_name(), update_unsupported_message(self.display_name())))
    }

    async fn delete(&self, d: &ResourceData, client: &dyn MackerelClient) -> Result<()>;

    fn display_name(&self) -> &'static str;

    /// Reject import identities of the wrong shape
    fn check_identity(&self, _id: &str) -> Result<()> {
        Ok(())
    }
}

/// Read function of one legacy data source type
#[async_trait]
pub trait LegacyRead: Send + Sync {
    async fn read(&self, d: &mut ResourceData, client: &dyn MackerelClient) -> Result<()>;
}

/// A legacy resource type
#[derive(Clone)]
pub struct LegacyResource {
    pub schema: Schema,
    pub crud: Arc<dyn LegacyCrud>,
    /// Blocks of which exactly one must be declared
    pub exactly_one_of: Vec<&'static str>,
}

impl LegacyResource {
    pub fn new(schema: Schema, crud: impl LegacyCrud + 'static) -> Self {
        Self {
            schema,
            crud: Arc::new(crud),
            exactly_one_of: Vec::new(),
        }
    }

    pub fn exactly_one_of(mut self, blocks: &[&'static str]) -> Self {
        self.exactly_one_of = blocks.to_vec();
        self
    }

    fn validate(&self, config: &Value) -> Result<()> {
        let mut diagnostics = self.schema.validate(config);
        if !self.exactly_one_of.is_empty() {
            let declared: Vec<&str> = self
                .exactly_one_of
                .iter()
                .copied()
                .filter(|name| config.get(name).as_list().is_some_and(|items| !items.is_empty()))
                .collect();
            if declared.len() != 1 {
                diagnostics.push(Diagnostic::error(
                    "Invalid combination of arguments",
                    format!(
                        "exactly one of {} must be specified, got {}",
                        self.exactly_one_of.join(", "),
                        if declared.is_empty() { "none".to_string() } else { declared.join(", ") }
                    ),
                ));
            }
        }
        if diagnostics.is_empty() {
            Ok(())
        } else {
            Err(Error::Configuration(diagnostics))
        }
    }
}

/// A legacy data source type
#[derive(Clone)]
pub struct LegacyDataSource {
    pub schema: Schema,
    pub read: Arc<dyn LegacyRead>,
}

impl LegacyDataSource {
    pub fn new(schema: Schema, read: impl LegacyRead + 'static) -> Self {
        Self {
            schema,
            read: Arc::new(read),
        }
    }
}

/// Every legacy resource type, in registration order
pub fn resource_types() -> Vec<(&'static str, LegacyResource)> {
    vec![
        (channel::TYPE_NAME, channel::resource()),
        (notification_group::TYPE_NAME, notification_group::resource()),
        (role::TYPE_NAME, role::resource()),
        (service::TYPE_NAME, service::resource()),
    ]
}

/// Every legacy data source type, in registration order
pub fn data_source_types() -> Vec<(&'static str, LegacyDataSource)> {
    vec![
        (channel::TYPE_NAME, channel::data_source()),
        (notification_group::TYPE_NAME, notification_group::data_source()),
        (role::TYPE_NAME, role::data_source()),
        (service::TYPE_NAME, service::data_source()),
        (metric_names::TYPE_NAME, metric_names::data_source()),
    ]
}

/// Error for a failed remote read of a legacy type
pub(crate) fn read_error(display_name: &str, id: &str, err: ClientError) -> Error {
    Error::Read {
        type_name: display_name.to_string(),
        id: id.to_string(),
        message: err.to_string(),
    }
}

/// Map a remote delete result, treating an absent object as deleted
pub(crate) fn delete_result<T>(
    display_name: &str,
    id: &str,
    result: std::result::Result<T, ClientError>,
) -> Result<()> {
    match result {
        Ok(_) => Ok(()),
        Err(ClientError::NotFound(_)) => {
            warn!("{} {} was already deleted", display_name, id);
            Ok(())
        }
        Err(e) => Err(Error::Delete {
            type_name: display_name.to_string(),
            id: id.to_string(),
            message: e.to_string(),
        }),
    }
}

/// Schema-driven provider server
pub struct LegacyProvider {
    resources: Registry<LegacyResource>,
    data_sources: Registry<LegacyDataSource>,
    env: EnvCredentials,
    client_factory: Arc<dyn ClientFactory>,
    client: OnceLock<Arc<dyn MackerelClient>>,
}

impl LegacyProvider {
    /// Build a server with every legacy type allowed by the filters
    pub fn new(
        client_factory: Arc<dyn ClientFactory>,
        env: EnvCredentials,
        resource_filter: &TypeFilter,
        data_source_filter: &TypeFilter,
    ) -> Result<Self> {
        let resources = Registry::from_entries("resource", resource_types())?.filtered(resource_filter);
        let data_sources = Registry::from_entries("data source", data_source_types())?.filtered(data_source_filter);
        debug!(
            "Legacy generation serves resources {:?} and data sources {:?}",
            resources.names(),
            data_sources.names()
        );
        Ok(Self {
            resources,
            data_sources,
            env,
            client_factory,
            client: OnceLock::new(),
        })
    }

    fn client(&self) -> Result<&dyn MackerelClient> {
        self.client
            .get()
            .map(Arc::as_ref)
            .ok_or_else(|| Error::client_unavailable(unconfigured_message()))
    }
}

#[async_trait]
impl ProviderServer for LegacyProvider {
    fn resource_types(&self) -> Vec<String> {
        self.resources.names()
    }

    fn data_source_types(&self) -> Vec<String> {
        self.data_sources.names()
    }

    fn provider_schema(&self) -> Schema {
        provider_schema()
    }

    fn resource_schema(&self, type_name: &str) -> Result<Schema> {
        Ok(self.resources.lookup(type_name)?.schema.clone())
    }

    fn data_source_schema(&self, type_name: &str) -> Result<Schema> {
        Ok(self.data_sources.lookup(type_name)?.schema.clone())
    }

    async fn configure(&self, config: &Value) -> Result<()> {
        provider_schema().ensure_valid(config)?;
        let client_config =
            ProviderConfigModel::from_value(config)?.resolve(&self.env, CredentialPrecedence::ConfigFirst)?;
        if self.client.get().is_some() {
            debug!("Mackerel client already configured, keeping the existing one");
            return Ok(());
        }
        let client = self.client_factory.connect(&client_config)?;
        if self.client.set(client).is_ok() {
            info!("Configured Mackerel client for {}", client_config.api_base);
        }
        Ok(())
    }

    async fn validate_resource_config(&self, type_name: &str, config: &Value) -> Result<()> {
        self.resources.lookup(type_name)?.validate(config)
    }

    async fn apply_resource_change(
        &self,
        type_name: &str,
        prior: Option<&Value>,
        planned: Option<&Value>,
    ) -> Result<Option<Value>> {
        let resource = self.resources.lookup(type_name)?;
        let client = self.client()?;
        let display_name = resource.crud.display_name();

        match (prior, planned) {
            (None, Some(planned)) => {
                let mut d = ResourceData::from_value(planned);
                d.set_id("");
                resource.crud.create(&mut d, client).await?;
                let id = d.id().to_string();
                let state = d.into_state(&resource.schema).ok_or_else(|| Error::Create {
                    type_name: display_name.to_string(),
                    message: "the remote object disappeared right after it was created".to_string(),
                })?;
                info!("Created {} {}", type_name, id);
                Ok(Some(state))
            }
            (Some(prior), Some(planned)) => {
                let mut d = ResourceData::from_value(planned);
                let id = ResourceData::from_value(prior).id().to_string();
                d.set_id(id.clone());
                resource.crud.update(&mut d, client).await?;
                let state = d.into_state(&resource.schema).ok_or_else(|| Error::Update {
                    type_name: display_name.to_string(),
                    id: id.clone(),
                    message: "the remote object disappeared right after it was updated".to_string(),
                })?;
                info!("Updated {} {}", type_name, id);
                Ok(Some(state))
            }
            (Some(prior), None) => {
                let d = ResourceData::from_value(prior);
                resource.crud.delete(&d, client).await?;
                info!("Deleted {} {}", type_name, d.id());
                Ok(None)
            }
            (None, None) => Ok(None),
        }
    }

    async fn read_resource(&self, type_name: &str, state: &Value) -> Result<Option<Value>> {
        let resource = self.resources.lookup(type_name)?;
        let client = self.client()?;
        let mut d = ResourceData::from_value(state);
        let id = d.id().to_string();
        resource.crud.read(&mut d, client).await?;
        let refreshed = d.into_state(&resource.schema);
        if refreshed.is_none() {
            warn!("{} {} no longer exists, removing from state", type_name, id);
        }
        Ok(refreshed)
    }

    async fn import_resource_state(&self, type_name: &str, id: &str) -> Result<Value> {
        let resource = self.resources.lookup(type_name)?;
        let client = self.client()?;
        resource.crud.check_identity(id)?;
        let mut d = ResourceData::with_id(id);
        resource.crud.read(&mut d, client).await?;
        d.into_state(&resource.schema).ok_or_else(|| Error::ImportNotFound {
            type_name: type_name.to_string(),
            id: id.to_string(),
        })
    }

    async fn read_data_source(&self, type_name: &str, config: &Value) -> Result<Value> {
        let data_source = self.data_sources.lookup(type_name)?;
        data_source.schema.ensure_valid(config)?;
        let client = self.client()?;
        let mut d = ResourceData::from_value(config);
        data_source.read.read(&mut d, client).await?;
        d.into_state(&data_source.schema).ok_or_else(|| {
            Error::configuration(
                Some(AttributePath::root("id")),
                format!("{type_name} lookup did not produce an id"),
            )
        })
    }
}
