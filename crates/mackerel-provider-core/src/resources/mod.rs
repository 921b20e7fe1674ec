//! Strongly-typed resource mappers
//!
//! One module per remote resource type. Each provides a [`ResourceMapper`]
//! and, where the type can be looked up, a [`DataSourceMapper`]; the generic
//! controllers in [`crate::engine`] turn them into registry factories.
//!
//! [`ResourceMapper`]: crate::traits::ResourceMapper
//! [`DataSourceMapper`]: crate::traits::DataSourceMapper

pub mod notification_group;
pub mod role;
pub mod service;

use crate::engine::{DataSourceController, LifecycleController};
use crate::traits::resource::{DataSourceFactory, ResourceFactory};

pub use notification_group::{NotificationGroupDataSource, NotificationGroupResource};
pub use role::{RoleDataSource, RoleResource};
pub use service::{ServiceDataSource, ServiceResource};

/// Every resource type with a strongly-typed implementation, in registration order
pub fn resource_factories() -> Vec<(&'static str, ResourceFactory)> {
    vec![
        (service::TYPE_NAME, LifecycleController::<ServiceResource>::boxed as ResourceFactory),
        (role::TYPE_NAME, LifecycleController::<RoleResource>::boxed),
        (notification_group::TYPE_NAME, LifecycleController::<NotificationGroupResource>::boxed),
    ]
}

/// Every data source type with a strongly-typed implementation
pub fn data_source_factories() -> Vec<(&'static str, DataSourceFactory)> {
    vec![
        (service::TYPE_NAME, DataSourceController::<ServiceDataSource>::boxed as DataSourceFactory),
        (role::TYPE_NAME, DataSourceController::<RoleDataSource>::boxed),
        (notification_group::TYPE_NAME, DataSourceController::<NotificationGroupDataSource>::boxed),
    ]
}
