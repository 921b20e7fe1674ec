// # Resource Traits
//
// Two layers describe a resource type:
//
// - `ResourceMapper`: the per-type translation between the declared model,
//   request payloads and remote entities, plus the remote calls themselves.
//   Mappers hold no state.
// - `ResourceHandler`: the object-safe lifecycle surface a provider server
//   drives. `engine::LifecycleController` implements it for every mapper.

use crate::error::{ClientError, Result};
use crate::schema::Schema;
use crate::traits::client::MackerelClient;
use crate::value::Value;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Lifecycle surface of one resource type
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    fn type_name(&self) -> &'static str;

    fn schema(&self) -> Schema;

    /// Bind the client handle; `None` fails with a client-unavailable error
    fn configure(&mut self, client: Option<Arc<dyn MackerelClient>>) -> Result<()>;

    async fn create(&self, planned: &Value) -> Result<Value>;

    async fn read(&self, state: &Value) -> Result<Option<Value>>;

    async fn update(&self, prior: &Value, planned: &Value) -> Result<Value>;

    async fn delete(&self, state: &Value) -> Result<()>;

    async fn import(&self, id: &str) -> Result<Value>;
}

/// Lookup surface of one data source type
#[async_trait]
pub trait DataSourceHandler: Send + Sync {
    fn type_name(&self) -> &'static str;

    fn schema(&self) -> Schema;

    fn configure(&mut self, client: Option<Arc<dyn MackerelClient>>) -> Result<()>;

    async fn read(&self, config: &Value) -> Result<Value>;
}

/// Factory for a fresh, unconfigured resource handler
pub type ResourceFactory = fn() -> Box<dyn ResourceHandler>;

/// Factory for a fresh, unconfigured data source handler
pub type DataSourceFactory = fn() -> Box<dyn DataSourceHandler>;

/// Translation between a resource's declared model and the remote API
///
/// # Identity
///
/// A type either derives its identity from declared fields
/// ([`identity_of`](Self::identity_of) returns `Some`) or takes the one the
/// server assigns on create ([`entity_identity`](Self::entity_identity)).
#[async_trait]
pub trait ResourceMapper: Default + Send + Sync + 'static {
    /// Declared model, encoded to and from state values
    type Model: Serialize + DeserializeOwned + Send + Sync;
    /// Remote entity returned by the client
    type Entity: Send + Sync;
    /// Create/update request body
    type Payload: Send + Sync;

    /// Registered type name, e.g. `mackerel_service`
    const TYPE_NAME: &'static str;
    /// Name used in operator-facing messages, e.g. `Service`
    const DISPLAY_NAME: &'static str;

    fn schema(&self) -> Schema;

    /// Build the create payload, checking local cross-field invariants
    fn to_create_payload(&self, model: &Self::Model) -> Result<Self::Payload>;

    fn to_update_payload(&self, model: &Self::Model) -> Result<Self::Payload> {
        self.to_create_payload(model)
    }

    /// Build the state model from a remote entity
    fn from_remote_entity(&self, entity: Self::Entity) -> Result<Self::Model>;

    /// Client-derived identity, if the type has one
    fn identity_of(&self, model: &Self::Model) -> Option<String>;

    /// Identity assigned by the server
    fn entity_identity(&self, entity: &Self::Entity) -> String;

    /// Whether a change of `field` can only be applied by replacement
    fn is_immutable(&self, field: &str) -> bool;

    fn update_supported(&self) -> bool;

    /// Reject identities of the wrong shape, on import and delete
    fn check_identity(&self, _id: &str) -> Result<()> {
        Ok(())
    }

    async fn remote_create(
        &self,
        client: &dyn MackerelClient,
        payload: Self::Payload,
    ) -> std::result::Result<Self::Entity, ClientError>;

    async fn remote_read(&self, client: &dyn MackerelClient, id: &str) -> std::result::Result<Self::Entity, ClientError>;

    async fn remote_update(
        &self,
        _client: &dyn MackerelClient,
        _id: &str,
        _payload: Self::Payload,
    ) -> std::result::Result<Self::Entity, ClientError> {
        Err(ClientError::api(
            405,
            format!("{} does not support in-place updates", Self::DISPLAY_NAME),
        ))
    }

    async fn remote_delete(&self, client: &dyn MackerelClient, id: &str) -> std::result::Result<(), ClientError>;
}

/// Translation between a data source's lookup arguments and the remote API
#[async_trait]
pub trait DataSourceMapper: Default + Send + Sync + 'static {
    type Model: Serialize + DeserializeOwned + Send + Sync;
    type Entity: Send + Sync;

    const TYPE_NAME: &'static str;
    const DISPLAY_NAME: &'static str;

    fn schema(&self) -> Schema;

    /// Identity to look up, taken from the declared arguments
    fn lookup_identity(&self, model: &Self::Model) -> Result<String>;

    fn from_remote_entity(&self, entity: Self::Entity) -> Result<Self::Model>;

    async fn remote_read(&self, client: &dyn MackerelClient, id: &str) -> std::result::Result<Self::Entity, ClientError>;
}
