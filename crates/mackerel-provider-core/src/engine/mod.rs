//! Lifecycle controllers
//!
//! A [`LifecycleController`] drives one resource type through its lifecycle
//! using that type's [`ResourceMapper`]:
//!
//! ```text
//!                      configure(None) ──► ClientUnavailable
//!   ┌──────────────┐   configure(Some)   ┌────────────┐
//!   │ Unconfigured │ ──────────────────► │ Configured │
//!   └──────────────┘                     └────────────┘
//!                                          │        │
//!                      create / import ok  │        │ read: not found
//!                                          ▼        ▼
//!                                    ┌─────────┐  ┌────────┐
//!                                    │ Created │  │ Absent │
//!                                    └─────────┘  └────────┘
//! ```
//!
//! ## Operation Flow
//!
//! 1. Create: mapper payload → remote create → identity → immediate read
//! 2. Read: not found means the resource was removed out of band
//! 3. Update: rejected for immutable types and fields, otherwise
//!    remote update followed by a read
//! 4. Delete: an already-absent identity counts as deleted
//! 5. Import: read by identity; absent is an error
//!
//! Every remote call is attempted exactly once; failures surface as
//! diagnostics. A controller is created per request and holds no state
//! besides the client handle.

use crate::error::{ClientError, Error, Result};
use crate::traits::client::MackerelClient;
use crate::traits::resource::{DataSourceHandler, DataSourceMapper, ResourceHandler, ResourceMapper};
use crate::schema::Schema;
use crate::value::Value;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Message shown when an update reaches a type that cannot change in place
pub fn update_unsupported_message(display_name: &str) -> String {
    format!(
        "Mackerel {}s cannot be updated in-place. Please report this issue.",
        display_name.to_lowercase()
    )
}

/// Generic lifecycle controller for one resource type
pub struct LifecycleController<M: ResourceMapper> {
    mapper: M,
    client: Option<Arc<dyn MackerelClient>>,
}

impl<M: ResourceMapper> LifecycleController<M> {
    pub fn new() -> Self {
        Self {
            mapper: M::default(),
            client: None,
        }
    }

    /// Factory suitable for a provider registry
    pub fn boxed() -> Box<dyn ResourceHandler> {
        Box::new(Self::new())
    }

    fn client(&self) -> Result<&dyn MackerelClient> {
        self.client
            .as_deref()
            .ok_or_else(|| Error::client_unavailable(unconfigured_message()))
    }

    fn state_identity(state: &Value) -> Result<String> {
        match state.get("id").as_str() {
            Some(id) if !id.is_empty() => Ok(id.to_string()),
            _ => Err(Error::decode(format!("{} state has no id", M::DISPLAY_NAME))),
        }
    }

    /// Read the remote object by identity; `None` if it does not exist
    async fn read_by_identity(&self, id: &str) -> Result<Option<Value>> {
        let client = self.client()?;
        let entity = match self.mapper.remote_read(client, id).await {
            Ok(entity) => entity,
            Err(ClientError::NotFound(_)) => return Ok(None),
            Err(e) => {
                return Err(Error::Read {
                    type_name: M::DISPLAY_NAME.to_string(),
                    id: id.to_string(),
                    message: e.to_string(),
                });
            }
        };
        let model = self.mapper.from_remote_entity(entity)?;
        let state = self.mapper.schema().normalize(&Value::encode(&model)?);
        if !state.is_fully_known() {
            return Err(Error::decode(format!(
                "{} {id}: remote object left computed attributes unknown",
                M::DISPLAY_NAME
            )));
        }
        Ok(Some(state))
    }

    async fn read_back(&self, id: &str) -> Result<Value> {
        self.read_by_identity(id).await?.ok_or_else(|| Error::Read {
            type_name: M::DISPLAY_NAME.to_string(),
            id: id.to_string(),
            message: "the remote object disappeared right after it was written".to_string(),
        })
    }
}

impl<M: ResourceMapper> Default for LifecycleController<M> {
    fn default() -> Self {
        Self::new()
    }
}

/// Detail of the client-unavailable diagnostic
pub fn unconfigured_message() -> &'static str {
    "Expected configured Mackerel client. Please report this issue to the provider developers."
}

#[async_trait]
impl<M: ResourceMapper> ResourceHandler for LifecycleController<M> {
    fn type_name(&self) -> &'static str {
        M::TYPE_NAME
    }

    fn schema(&self) -> Schema {
        self.mapper.schema()
    }

    fn configure(&mut self, client: Option<Arc<dyn MackerelClient>>) -> Result<()> {
        match client {
            Some(client) => {
                self.client = Some(client);
                Ok(())
            }
            None => Err(Error::client_unavailable(unconfigured_message())),
        }
    }

    async fn create(&self, planned: &Value) -> Result<Value> {
        let client = self.client()?;
        let model: M::Model = planned.decode()?;
        let payload = self.mapper.to_create_payload(&model)?;

        let entity = self
            .mapper
            .remote_create(client, payload)
            .await
            .map_err(|e| Error::Create {
                type_name: M::DISPLAY_NAME.to_string(),
                message: e.to_string(),
            })?;

        let id = self
            .mapper
            .identity_of(&model)
            .unwrap_or_else(|| self.mapper.entity_identity(&entity));
        info!("Created {} {}", M::TYPE_NAME, id);

        self.read_back(&id).await
    }

    async fn read(&self, state: &Value) -> Result<Option<Value>> {
        let id = Self::state_identity(state)?;
        let refreshed = self.read_by_identity(&id).await?;
        if refreshed.is_none() {
            warn!("{} {} no longer exists, removing from state", M::TYPE_NAME, id);
        }
        Ok(refreshed)
    }

    async fn update(&self, prior: &Value, planned: &Value) -> Result<Value> {
        let client = self.client()?;
        if !self.mapper.update_supported() {
            return Err(Error::unsupported(
                M::DISPLAY_NAME,
                update_unsupported_message(M::DISPLAY_NAME),
            ));
        }

        let schema = self.mapper.schema();
        let (prior_c, planned_c) = (schema.canonical(prior), schema.canonical(planned));
        if let Some(object) = planned_c.as_object() {
            if let Some(field) = object
                .iter()
                .find(|(field, value)| self.mapper.is_immutable(field) && prior_c.get(field) != *value)
                .map(|(field, _)| field)
            {
                return Err(Error::unsupported(
                    M::DISPLAY_NAME,
                    format!("{field:?} cannot be changed in-place. Please report this issue."),
                ));
            }
        }

        let id = Self::state_identity(prior)?;
        let model: M::Model = planned.decode()?;
        let payload = self.mapper.to_update_payload(&model)?;
        self.mapper
            .remote_update(client, &id, payload)
            .await
            .map_err(|e| Error::Update {
                type_name: M::DISPLAY_NAME.to_string(),
                id: id.clone(),
                message: e.to_string(),
            })?;
        info!("Updated {} {}", M::TYPE_NAME, id);

        self.read_back(&id).await
    }

    async fn delete(&self, state: &Value) -> Result<()> {
        let client = self.client()?;
        let id = Self::state_identity(state)?;
        if let Err(e) = self.mapper.check_identity(&id) {
            return Err(Error::Delete {
                type_name: M::DISPLAY_NAME.to_string(),
                id,
                message: e.to_string(),
            });
        }
        match self.mapper.remote_delete(client, &id).await {
            Ok(()) => {
                info!("Deleted {} {}", M::TYPE_NAME, id);
                Ok(())
            }
            Err(ClientError::NotFound(_)) => {
                warn!("{} {} was already deleted", M::TYPE_NAME, id);
                Ok(())
            }
            Err(e) => Err(Error::Delete {
                type_name: M::DISPLAY_NAME.to_string(),
                id,
                message: e.to_string(),
            }),
        }
    }

    async fn import(&self, id: &str) -> Result<Value> {
        self.mapper.check_identity(id)?;
        debug!("Importing {} {}", M::TYPE_NAME, id);
        self.read_by_identity(id).await?.ok_or_else(|| Error::ImportNotFound {
            type_name: M::TYPE_NAME.to_string(),
            id: id.to_string(),
        })
    }
}

/// Generic controller for one data source type
pub struct DataSourceController<M: DataSourceMapper> {
    mapper: M,
    client: Option<Arc<dyn MackerelClient>>,
}

impl<M: DataSourceMapper> DataSourceController<M> {
    pub fn new() -> Self {
        Self {
            mapper: M::default(),
            client: None,
        }
    }

    pub fn boxed() -> Box<dyn DataSourceHandler> {
        Box::new(Self::new())
    }
}

impl<M: DataSourceMapper> Default for DataSourceController<M> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<M: DataSourceMapper> DataSourceHandler for DataSourceController<M> {
    fn type_name(&self) -> &'static str {
        M::TYPE_NAME
    }

    fn schema(&self) -> Schema {
        self.mapper.schema()
    }

    fn configure(&mut self, client: Option<Arc<dyn MackerelClient>>) -> Result<()> {
        match client {
            Some(client) => {
                self.client = Some(client);
                Ok(())
            }
            None => Err(Error::client_unavailable(unconfigured_message())),
        }
    }

    async fn read(&self, config: &Value) -> Result<Value> {
        let client = self
            .client
            .as_deref()
            .ok_or_else(|| Error::client_unavailable(unconfigured_message()))?;
        let model: M::Model = config.decode()?;
        let id = self.mapper.lookup_identity(&model)?;
        let entity = self
            .mapper
            .remote_read(client, &id)
            .await
            .map_err(|e| Error::Read {
                type_name: M::DISPLAY_NAME.to_string(),
                id: id.clone(),
                message: e.to_string(),
            })?;
        let model = self.mapper.from_remote_entity(entity)?;
        Ok(self.mapper.schema().normalize(&Value::encode(&model)?))
    }
}
