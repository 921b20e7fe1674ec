//! Current-generation provider server
//!
//! Serves the strongly-typed resource and data source implementations from
//! [`crate::resources`]. The set of types served is fixed at construction by
//! inclusion and exclusion filters:
//!
//! ```text
//!   resources::resource_factories()
//!            │ TypeFilter { enabled, disabled }
//!            ▼
//!   Registry<ResourceFactory> ──► per request: factory() → configure(client) → operation
//! ```
//!
//! Credentials from the environment take precedence over the provider block.

use crate::config::{CredentialPrecedence, EnvCredentials, ProviderConfigModel, provider_schema};
use crate::error::Result;
use crate::registry::{Registry, TypeFilter};
use crate::resources;
use crate::schema::Schema;
use crate::traits::client::{ClientFactory, MackerelClient};
use crate::traits::resource::{DataSourceFactory, DataSourceHandler, ResourceFactory, ResourceHandler};
use crate::traits::server::ProviderServer;
use crate::value::Value;
use async_trait::async_trait;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info};

/// Strongly-typed provider server
pub struct FrameworkProvider {
    resources: Registry<ResourceFactory>,
    data_sources: Registry<DataSourceFactory>,
    env: EnvCredentials,
    client_factory: Arc<dyn ClientFactory>,
    client: OnceLock<Arc<dyn MackerelClient>>,
}

impl FrameworkProvider {
    /// Build a server with every strongly-typed implementation allowed by the filters
    pub fn new(
        client_factory: Arc<dyn ClientFactory>,
        env: EnvCredentials,
        resource_filter: &TypeFilter,
        data_source_filter: &TypeFilter,
    ) -> Result<Self> {
        let resources = Registry::from_entries("resource", resources::resource_factories())?.filtered(resource_filter);
        let data_sources =
            Registry::from_entries("data source", resources::data_source_factories())?.filtered(data_source_filter);
        debug!(
            "Current generation serves resources {:?} and data sources {:?}",
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

    fn resource(&self, type_name: &str) -> Result<Box<dyn ResourceHandler>> {
        let factory = self.resources.lookup(type_name)?;
        let mut handler = factory();
        handler.configure(self.client.get().cloned())?;
        Ok(handler)
    }

    fn data_source(&self, type_name: &str) -> Result<Box<dyn DataSourceHandler>> {
        let factory = self.data_sources.lookup(type_name)?;
        let mut handler = factory();
        handler.configure(self.client.get().cloned())?;
        Ok(handler)
    }
}

#[async_trait]
impl ProviderServer for FrameworkProvider {
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
        let factory = self.resources.lookup(type_name)?;
        Ok(factory().schema())
    }

    fn data_source_schema(&self, type_name: &str) -> Result<Schema> {
        let factory = self.data_sources.lookup(type_name)?;
        Ok(factory().schema())
    }

    async fn configure(&self, config: &Value) -> Result<()> {
        provider_schema().ensure_valid(config)?;
        let client_config =
            ProviderConfigModel::from_value(config)?.resolve(&self.env, CredentialPrecedence::EnvFirst)?;
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

    async fn apply_resource_change(
        &self,
        type_name: &str,
        prior: Option<&Value>,
        planned: Option<&Value>,
    ) -> Result<Option<Value>> {
        let handler = self.resource(type_name)?;
        match (prior, planned) {
            (None, Some(planned)) => handler.create(planned).await.map(Some),
            (Some(prior), Some(planned)) => handler.update(prior, planned).await.map(Some),
            (Some(prior), None) => handler.delete(prior).await.map(|()| None),
            (None, None) => Ok(None),
        }
    }

    async fn read_resource(&self, type_name: &str, state: &Value) -> Result<Option<Value>> {
        self.resource(type_name)?.read(state).await
    }

    async fn import_resource_state(&self, type_name: &str, id: &str) -> Result<Value> {
        self.resource(type_name)?.import(id).await
    }

    async fn read_data_source(&self, type_name: &str, config: &Value) -> Result<Value> {
        self.validate_data_source_config(type_name, config).await?;
        self.data_source(type_name)?.read(config).await
    }
}
