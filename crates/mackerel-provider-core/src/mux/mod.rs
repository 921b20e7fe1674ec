//! Protocol multiplexer
//!
//! Presents the two engine generations as one provider server. Every type
//! name is served by exactly one generation; the routing table is built once
//! and never changes afterwards.
//!
//! ```text
//!                      ┌──────────────┐
//!   request ──────────►│  MuxServer   │
//!                      │ (kind, name) │
//!                      └──────┬───────┘
//!               ┌─────────────┴─────────────┐
//!               ▼                           ▼
//!     FrameworkProvider              LegacyProvider
//!   (current generation)   (every type current doesn't serve)
//! ```
//!
//! When `MACKEREL_EXPERIMENTAL_TFFRAMEWORK` is off the multiplexer is not
//! built at all and the legacy server is returned directly.

use crate::config::ServerOptions;
use crate::error::{Error, Result};
use crate::framework::FrameworkProvider;
use crate::legacy::LegacyProvider;
use crate::registry::TypeFilter;
use crate::schema::{PlannedChange, Schema};
use crate::traits::client::ClientFactory;
use crate::traits::server::{Generation, Kind, ProviderServer};
use crate::value::Value;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Provider server routing each type to its generation
pub struct MuxServer {
    current: Arc<dyn ProviderServer>,
    legacy: Arc<dyn ProviderServer>,
    routes: HashMap<(Kind, String), Generation>,
    resource_order: Vec<String>,
    data_source_order: Vec<String>,
}

impl MuxServer {
    /// Compose two servers; a type served by both is an error
    pub fn new(current: Arc<dyn ProviderServer>, legacy: Arc<dyn ProviderServer>) -> Result<Self> {
        let mut routes = HashMap::new();
        let mut resource_order = Vec::new();
        let mut data_source_order = Vec::new();

        let sources = [
            (Generation::Current, &current),
            (Generation::Legacy, &legacy),
        ];
        for (generation, server) in sources {
            for (kind, names) in [
                (Kind::Resource, server.resource_types()),
                (Kind::DataSource, server.data_source_types()),
            ] {
                for name in names {
                    if routes.insert((kind, name.clone()), generation).is_some() {
                        return Err(Error::DuplicateType {
                            kind: kind.label(),
                            name,
                        });
                    }
                    match kind {
                        Kind::Resource => resource_order.push(name),
                        Kind::DataSource => data_source_order.push(name),
                    }
                }
            }
        }

        resource_order.sort();
        data_source_order.sort();
        Ok(Self {
            current,
            legacy,
            routes,
            resource_order,
            data_source_order,
        })
    }

    /// Generation serving a type, if any
    pub fn generation_of(&self, kind: Kind, type_name: &str) -> Option<Generation> {
        self.routes.get(&(kind, type_name.to_string())).copied()
    }

    fn route(&self, kind: Kind, type_name: &str) -> Result<&dyn ProviderServer> {
        let generation = self.generation_of(kind, type_name).ok_or_else(|| Error::UnknownType {
            kind: kind.label(),
            name: type_name.to_string(),
        })?;
        debug!("Routing {} {} to the {} generation", kind, type_name, generation);
        Ok(match generation {
            Generation::Current => self.current.as_ref(),
            Generation::Legacy => self.legacy.as_ref(),
        })
    }
}

/// Compose a current-generation server with a legacy one built around it
///
/// `legacy` receives exclusion filters naming every type the current
/// generation already serves.
pub fn compose<F>(current: Arc<dyn ProviderServer>, legacy: F) -> Result<MuxServer>
where
    F: FnOnce(&TypeFilter, &TypeFilter) -> Result<Arc<dyn ProviderServer>>,
{
    let resource_exclusions = TypeFilter::default().disable(current.resource_types());
    let data_source_exclusions = TypeFilter::default().disable(current.data_source_types());
    let legacy = legacy(&resource_exclusions, &data_source_exclusions)?;
    MuxServer::new(current, legacy)
}

/// Build the provider server selected by the startup options
pub fn build_server(options: &ServerOptions, client_factory: Arc<dyn ClientFactory>) -> Result<Arc<dyn ProviderServer>> {
    let env = options.credentials.clone();

    if !options.framework_enabled {
        let legacy = LegacyProvider::new(
            client_factory,
            env,
            &TypeFilter::default().disable(options.disabled_resources.clone()),
            &TypeFilter::default().disable(options.disabled_data_sources.clone()),
        )?;
        info!("Serving {} resource types from the legacy generation", legacy.resource_types().len());
        return Ok(Arc::new(legacy));
    }

    Ok(Arc::new(build_mux(options, client_factory)?))
}

/// Build the multiplexed server used when the experimental toggle is on
///
/// The current generation serves the types its inclusion lists allow; the
/// legacy generation serves the rest.
pub fn build_mux(options: &ServerOptions, client_factory: Arc<dyn ClientFactory>) -> Result<MuxServer> {
    let env = options.credentials.clone();
    let current: Arc<dyn ProviderServer> = Arc::new(FrameworkProvider::new(
        client_factory.clone(),
        env.clone(),
        &options.current_resource_filter(),
        &options.current_data_source_filter(),
    )?);
    info!(
        "Experimental framework enabled: current generation serves resources {:?} and data sources {:?}",
        current.resource_types(),
        current.data_source_types()
    );

    compose(current, |resources, data_sources| {
        let resources = resources.clone().disable(options.disabled_resources.clone());
        let data_sources = data_sources.clone().disable(options.disabled_data_sources.clone());
        let legacy = LegacyProvider::new(client_factory, env, &resources, &data_sources)?;
        Ok(Arc::new(legacy) as Arc<dyn ProviderServer>)
    })
}

#[async_trait]
impl ProviderServer for MuxServer {
    fn resource_types(&self) -> Vec<String> {
        self.resource_order.clone()
    }

    fn data_source_types(&self) -> Vec<String> {
        self.data_source_order.clone()
    }

    fn provider_schema(&self) -> Schema {
        self.legacy.provider_schema()
    }

    fn resource_schema(&self, type_name: &str) -> Result<Schema> {
        self.route(Kind::Resource, type_name)?.resource_schema(type_name)
    }

    fn data_source_schema(&self, type_name: &str) -> Result<Schema> {
        self.route(Kind::DataSource, type_name)?.data_source_schema(type_name)
    }

    async fn configure(&self, config: &Value) -> Result<()> {
        // Both generations are configured even when one of them fails
        let current = self.current.configure(config).await;
        let legacy = self.legacy.configure(config).await;
        match (current, legacy) {
            (Ok(()), Ok(())) => Ok(()),
            (Err(Error::Configuration(mut diagnostics)), Err(Error::Configuration(more))) => {
                for diagnostic in more {
                    if !diagnostics.contains(&diagnostic) {
                        diagnostics.push(diagnostic);
                    }
                }
                Err(Error::Configuration(diagnostics))
            }
            (Err(e), _) | (Ok(()), Err(e)) => Err(e),
        }
    }

    async fn validate_resource_config(&self, type_name: &str, config: &Value) -> Result<()> {
        self.route(Kind::Resource, type_name)?
            .validate_resource_config(type_name, config)
            .await
    }

    async fn validate_data_source_config(&self, type_name: &str, config: &Value) -> Result<()> {
        self.route(Kind::DataSource, type_name)?
            .validate_data_source_config(type_name, config)
            .await
    }

    async fn plan_resource_change(
        &self,
        type_name: &str,
        prior: Option<&Value>,
        config: Option<&Value>,
    ) -> Result<PlannedChange> {
        self.route(Kind::Resource, type_name)?
            .plan_resource_change(type_name, prior, config)
            .await
    }

    async fn apply_resource_change(
        &self,
        type_name: &str,
        prior: Option<&Value>,
        planned: Option<&Value>,
    ) -> Result<Option<Value>> {
        self.route(Kind::Resource, type_name)?
            .apply_resource_change(type_name, prior, planned)
            .await
    }

    async fn read_resource(&self, type_name: &str, state: &Value) -> Result<Option<Value>> {
        self.route(Kind::Resource, type_name)?.read_resource(type_name, state).await
    }

    async fn import_resource_state(&self, type_name: &str, id: &str) -> Result<Value> {
        self.route(Kind::Resource, type_name)?
            .import_resource_state(type_name, id)
            .await
    }

    async fn read_data_source(&self, type_name: &str, config: &Value) -> Result<Value> {
        self.route(Kind::DataSource, type_name)?
            .read_data_source(type_name, config)
            .await
    }
}
