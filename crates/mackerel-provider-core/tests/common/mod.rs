//! Test doubles and common utilities for architecture contract tests
//!
//! Servers are wired to a [`MemoryClient`] remote; [`StubServer`] stands in
//! for an engine generation when only routing is under test.

#![allow(dead_code)]

use async_trait::async_trait;
use mackerel_provider_core::config::{GenerationOptions, ServerOptions};
use mackerel_provider_core::error::{Diagnostic, Error, Result};
use mackerel_provider_core::memory::MemoryClient;
use mackerel_provider_core::mux::{build_mux, build_server};
use mackerel_provider_core::schema::Schema;
use mackerel_provider_core::traits::{Generation, Kind, ProviderServer};
use mackerel_provider_core::value::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Provider configuration block with a test API key
pub fn provider_config() -> Value {
    Value::object([("api_key", Value::string("test-api-key"))])
}

/// Build and configure the whole provider server against an in-memory remote
pub async fn configured_server(framework_enabled: bool) -> (Arc<dyn ProviderServer>, MemoryClient) {
    let remote = MemoryClient::new();
    let options = ServerOptions {
        framework_enabled,
        ..ServerOptions::default()
    };
    let server = build_server(&options, Arc::new(remote.clone())).expect("server construction succeeds");
    server
        .configure(&provider_config())
        .await
        .expect("configure succeeds");
    (server, remote)
}

/// How a test server splits types between the two engine generations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routing {
    /// Toggle off: every type is served by the legacy generation
    Legacy,
    /// Toggle on with the default inclusion lists
    Baseline,
    /// Every type with a strongly-typed implementation is served by it
    Current,
}

pub const ROUTINGS: [Routing; 3] = [Routing::Legacy, Routing::Baseline, Routing::Current];

/// Types the current generation implements
pub const CURRENT_TYPES: [&str; 3] = ["mackerel_notification_group", "mackerel_role", "mackerel_service"];

/// Options that route every [`CURRENT_TYPES`] entry to the current generation
pub fn all_current_options() -> ServerOptions {
    ServerOptions {
        framework_enabled: true,
        current: GenerationOptions::default(),
        ..ServerOptions::default()
    }
}

/// Startup options for the given routing
pub fn routing_options(routing: Routing) -> ServerOptions {
    match routing {
        Routing::Legacy => ServerOptions::default(),
        Routing::Baseline => ServerOptions {
            framework_enabled: true,
            ..ServerOptions::default()
        },
        Routing::Current => all_current_options(),
    }
}

/// Build and configure a server with the given routing
pub async fn routed_server(routing: Routing) -> (Arc<dyn ProviderServer>, MemoryClient) {
    match routing {
        Routing::Legacy => configured_server(false).await,
        Routing::Baseline => configured_server(true).await,
        Routing::Current => {
            let remote = MemoryClient::new();
            let mux = build_mux(&all_current_options(), Arc::new(remote.clone())).expect("server construction succeeds");
            for name in CURRENT_TYPES {
                assert_eq!(mux.generation_of(Kind::Resource, name), Some(Generation::Current), "{name}");
                assert_eq!(mux.generation_of(Kind::DataSource, name), Some(Generation::Current), "{name}");
            }
            let server: Arc<dyn ProviderServer> = Arc::new(mux);
            server.configure(&provider_config()).await.expect("configure succeeds");
            (server, remote)
        }
    }
}

/// Plan and apply a create, returning the new state
pub async fn create(server: &dyn ProviderServer, type_name: &str, config: &Value) -> Result<Value> {
    let change = server.plan_resource_change(type_name, None, Some(config)).await?;
    let state = server
        .apply_resource_change(type_name, None, change.planned.as_ref())
        .await?;
    Ok(state.expect("create returns a state"))
}

/// Plan and apply a change against an existing state
pub async fn change(server: &dyn ProviderServer, type_name: &str, prior: &Value, config: &Value) -> Result<Value> {
    let change = server
        .plan_resource_change(type_name, Some(prior), Some(config))
        .await?;
    let state = server
        .apply_resource_change(type_name, Some(prior), change.planned.as_ref())
        .await?;
    Ok(state.expect("update returns a state"))
}

/// A provider server that serves fixed type names and counts calls
pub struct StubServer {
    tag: &'static str,
    resources: Vec<String>,
    data_sources: Vec<String>,
    /// Call counter for lifecycle operations
    call_count: Arc<AtomicUsize>,
    /// Call counter for configure()
    configure_count: Arc<AtomicUsize>,
    /// Diagnostic summary returned by configure(), if it should fail
    configure_failure: Option<&'static str>,
}

impl StubServer {
    pub fn new(tag: &'static str, resources: &[&str], data_sources: &[&str]) -> Self {
        Self {
            tag,
            resources: resources.iter().map(|s| s.to_string()).collect(),
            data_sources: data_sources.iter().map(|s| s.to_string()).collect(),
            call_count: Arc::new(AtomicUsize::new(0)),
            configure_count: Arc::new(AtomicUsize::new(0)),
            configure_failure: None,
        }
    }

    /// Make configure() fail with a configuration diagnostic
    pub fn failing_configure(mut self, summary: &'static str) -> Self {
        self.configure_failure = Some(summary);
        self
    }

    /// Get the number of lifecycle operations served
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Get the number of times configure() was called
    pub fn configure_count(&self) -> usize {
        self.configure_count.load(Ordering::SeqCst)
    }

    fn served(&self) -> Value {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        Value::object([("served_by", Value::string(self.tag))])
    }
}

/// Which stub answered a routed call
pub fn served_by(value: &Value) -> &str {
    value.get("served_by").as_str().unwrap_or_default()
}

#[async_trait]
impl ProviderServer for StubServer {
    fn resource_types(&self) -> Vec<String> {
        self.resources.clone()
    }

    fn data_source_types(&self) -> Vec<String> {
        self.data_sources.clone()
    }

    fn provider_schema(&self) -> Schema {
        Schema::new(self.tag)
    }

    fn resource_schema(&self, _type_name: &str) -> Result<Schema> {
        Ok(Schema::new(self.tag))
    }

    fn data_source_schema(&self, _type_name: &str) -> Result<Schema> {
        Ok(Schema::new(self.tag))
    }

    async fn configure(&self, _config: &Value) -> Result<()> {
        self.configure_count.fetch_add(1, Ordering::SeqCst);
        match self.configure_failure {
            Some(summary) => Err(Error::Configuration(vec![Diagnostic::error(summary, self.tag)])),
            None => Ok(()),
        }
    }

    async fn apply_resource_change(
        &self,
        _type_name: &str,
        _prior: Option<&Value>,
        _planned: Option<&Value>,
    ) -> Result<Option<Value>> {
        Ok(Some(self.served()))
    }

    async fn read_resource(&self, _type_name: &str, _state: &Value) -> Result<Option<Value>> {
        Ok(Some(self.served()))
    }

    async fn import_resource_state(&self, _type_name: &str, _id: &str) -> Result<Value> {
        Ok(self.served())
    }

    async fn read_data_source(&self, _type_name: &str, _config: &Value) -> Result<Value> {
        Ok(self.served())
    }
}
