//! Port definitions (interfaces)
//!
//! Ports define the boundaries between the templating engine and external systems.
//! Each port is a trait that can be implemented by adapters in the infrastructure layer.

mod clock;
mod dashboard_repository;
mod datasource;
mod events;
mod location;

pub use clock::Clock;
pub use dashboard_repository::{DashboardError, DashboardRepository};
pub use datasource::{
    DataSource, DataSourceError, DataSourceRegistry, MetricFindQueryOptions, VariableSupport,
    VariableSupportType,
};
pub use events::{DashboardEvents, Notification, NotificationLevel, VariablesChanged};
pub use location::{LocationError, LocationService, UrlQueryMap, UrlQueryUpdate};
