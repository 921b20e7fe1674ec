//! Core traits of the provider
//!
//! - [`MackerelClient`]: remote client handle for the Mackerel API
//! - [`ResourceMapper`] / [`DataSourceMapper`]: per-type translation to the API
//! - [`ResourceHandler`] / [`DataSourceHandler`]: object-safe lifecycle surface
//! - [`ProviderServer`]: the caller protocol served by each engine generation

pub mod client;
pub mod resource;
pub mod server;

pub use client::{
    Channel, ClientConfig, ClientFactory, DEFAULT_API_BASE, MackerelClient, NotificationGroup,
    NotificationGroupMonitor, NotificationGroupService, Role, Service, ServiceParam,
};
pub use resource::{
    DataSourceFactory, DataSourceHandler, DataSourceMapper, ResourceFactory, ResourceHandler, ResourceMapper,
};
pub use server::{Generation, Kind, ProviderServer};
