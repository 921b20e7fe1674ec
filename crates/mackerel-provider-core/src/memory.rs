// # Memory Client
//
// In-memory implementation of MackerelClient.
//
// ## Purpose
//
// Stands in for the Mackerel API in tests and offline runs. It keeps the
// same observable rules as the service:
//
// - service and role names are unique (duplicates answer HTTP 400)
// - deleting a service deletes its roles
// - notification groups and channels get server-assigned ids
// - a missing entity answers "not found"
//
// ## Call Log
//
// Every remote call is recorded by method name so tests can assert which
// calls a lifecycle operation made (and which it must never make).

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{ClientError, Result};
use crate::traits::client::{
    Channel, ClientConfig, ClientFactory, MackerelClient, NotificationGroup, Role, Service, ServiceParam,
};

type ClientResult<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Default)]
struct Remote {
    services: BTreeMap<String, ServiceEntry>,
    notification_groups: Vec<NotificationGroup>,
    channels: Vec<Channel>,
    next_id: u64,
    calls: Vec<String>,
    failures: HashMap<String, VecDeque<ClientError>>,
}

#[derive(Debug, Default)]
struct ServiceEntry {
    memo: String,
    roles: Vec<Role>,
    metric_names: Vec<String>,
}

impl ServiceEntry {
    fn to_service(&self, name: &str) -> Service {
        Service {
            name: name.to_string(),
            memo: self.memo.clone(),
            roles: self.roles.iter().map(|r| r.name.clone()).collect(),
        }
    }
}

impl Remote {
    /// Record a call and pop an injected failure for it, if any
    fn call(&mut self, method: &str) -> ClientResult<()> {
        self.calls.push(method.to_string());
        match self.failures.get_mut(method).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn assign_id(&mut self) -> String {
        self.next_id += 1;
        format!("{:011x}", self.next_id)
    }

    fn service(&mut self, name: &str) -> ClientResult<&mut ServiceEntry> {
        self.services
            .get_mut(name)
            .ok_or_else(|| ClientError::not_found(format!("Service not found: {name}")))
    }
}

/// In-memory Mackerel remote
///
/// Clones share the same remote state.
#[derive(Debug, Clone, Default)]
pub struct MemoryClient {
    inner: Arc<RwLock<Remote>>,
    connections: Arc<Mutex<Vec<ClientConfig>>>,
}

impl MemoryClient {
    /// Create an empty remote
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the metric names posted to an existing service
    pub async fn seed_metric_names<I, S>(&self, service: &str, names: I) -> ClientResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut remote = self.inner.write().await;
        remote.service(service)?.metric_names = names.into_iter().map(Into::into).collect();
        Ok(())
    }

    /// Make the next call to `method` fail with `err`
    pub async fn fail_next(&self, method: &str, err: ClientError) {
        self.inner
            .write()
            .await
            .failures
            .entry(method.to_string())
            .or_default()
            .push_back(err);
    }

    /// Method names of every call made so far, in order
    pub async fn calls(&self) -> Vec<String> {
        self.inner.read().await.calls.clone()
    }

    /// Number of calls made to `method`
    pub async fn call_count(&self, method: &str) -> usize {
        self.inner.read().await.calls.iter().filter(|c| *c == method).count()
    }

    /// Configurations this client was connected with through [`ClientFactory`]
    pub fn connections(&self) -> Vec<ClientConfig> {
        self.connections.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl ClientFactory for MemoryClient {
    fn connect(&self, config: &ClientConfig) -> Result<Arc<dyn MackerelClient>> {
        debug!("Connecting in-memory Mackerel client for {}", config.api_base);
        if let Ok(mut connections) = self.connections.lock() {
            connections.push(config.clone());
        }
        Ok(Arc::new(self.clone()))
    }
}

#[async_trait]
impl MackerelClient for MemoryClient {
    async fn find_services(&self) -> ClientResult<Vec<Service>> {
        let mut remote = self.inner.write().await;
        remote.call("find_services")?;
        Ok(remote.services.iter().map(|(name, entry)| entry.to_service(name)).collect())
    }

    async fn create_service(&self, param: &ServiceParam) -> ClientResult<Service> {
        let mut remote = self.inner.write().await;
        remote.call("create_service")?;
        if remote.services.contains_key(&param.name) {
            return Err(ClientError::api(400, format!("Service with the same name already exists: {}", param.name)));
        }
        let entry = ServiceEntry {
            memo: param.memo.clone(),
            ..ServiceEntry::default()
        };
        let service = entry.to_service(&param.name);
        remote.services.insert(param.name.clone(), entry);
        Ok(service)
    }

    async fn delete_service(&self, name: &str) -> ClientResult<Service> {
        let mut remote = self.inner.write().await;
        remote.call("delete_service")?;
        remote
            .services
            .remove(name)
            .map(|entry| entry.to_service(name))
            .ok_or_else(|| ClientError::not_found(format!("Service not found: {name}")))
    }

    async fn find_roles(&self, service: &str) -> ClientResult<Vec<Role>> {
        let mut remote = self.inner.write().await;
        remote.call("find_roles")?;
        Ok(remote.service(service)?.roles.clone())
    }

    async fn create_role(&self, service: &str, role: &Role) -> ClientResult<Role> {
        let mut remote = self.inner.write().await;
        remote.call("create_role")?;
        let entry = remote.service(service)?;
        if entry.roles.iter().any(|r| r.name == role.name) {
            return Err(ClientError::api(400, format!("Role with the same name already exists: {}", role.name)));
        }
        entry.roles.push(role.clone());
        Ok(role.clone())
    }

    async fn delete_role(&self, service: &str, role: &str) -> ClientResult<Role> {
        let mut remote = self.inner.write().await;
        remote.call("delete_role")?;
        let entry = remote.service(service)?;
        let index = entry
            .roles
            .iter()
            .position(|r| r.name == role)
            .ok_or_else(|| ClientError::not_found(format!("Role not found: {service}:{role}")))?;
        Ok(entry.roles.remove(index))
    }

    async fn find_notification_groups(&self) -> ClientResult<Vec<NotificationGroup>> {
        let mut remote = self.inner.write().await;
        remote.call("find_notification_groups")?;
        Ok(remote.notification_groups.clone())
    }

    async fn create_notification_group(&self, group: &NotificationGroup) -> ClientResult<NotificationGroup> {
        let mut remote = self.inner.write().await;
        remote.call("create_notification_group")?;
        let created = NotificationGroup {
            id: remote.assign_id(),
            ..group.clone()
        };
        remote.notification_groups.push(created.clone());
        Ok(created)
    }

    async fn update_notification_group(&self, id: &str, group: &NotificationGroup) -> ClientResult<NotificationGroup> {
        let mut remote = self.inner.write().await;
        remote.call("update_notification_group")?;
        let existing = remote
            .notification_groups
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or_else(|| ClientError::not_found(format!("Notification group not found: {id}")))?;
        *existing = NotificationGroup {
            id: id.to_string(),
            ..group.clone()
        };
        Ok(existing.clone())
    }

    async fn delete_notification_group(&self, id: &str) -> ClientResult<NotificationGroup> {
        let mut remote = self.inner.write().await;
        remote.call("delete_notification_group")?;
        let index = remote
            .notification_groups
            .iter()
            .position(|g| g.id == id)
            .ok_or_else(|| ClientError::not_found(format!("Notification group not found: {id}")))?;
        Ok(remote.notification_groups.remove(index))
    }

    async fn find_channels(&self) -> ClientResult<Vec<Channel>> {
        let mut remote = self.inner.write().await;
        remote.call("find_channels")?;
        Ok(remote.channels.clone())
    }

    async fn create_channel(&self, channel: &Channel) -> ClientResult<Channel> {
        let mut remote = self.inner.write().await;
        remote.call("create_channel")?;
        let created = Channel {
            id: remote.assign_id(),
            ..channel.clone()
        };
        remote.channels.push(created.clone());
        Ok(created)
    }

    async fn delete_channel(&self, id: &str) -> ClientResult<Channel> {
        let mut remote = self.inner.write().await;
        remote.call("delete_channel")?;
        let index = remote
            .channels
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| ClientError::not_found(format!("Channel not found: {id}")))?;
        Ok(remote.channels.remove(index))
    }

    async fn list_service_metric_names(&self, service: &str) -> ClientResult<Vec<String>> {
        let mut remote = self.inner.write().await;
        remote.call("list_service_metric_names")?;
        Ok(remote.service(service)?.metric_names.clone())
    }
}
