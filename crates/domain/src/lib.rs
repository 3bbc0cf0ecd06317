//! Stencil Domain - Core templating types
//!
//! This crate defines the data model of the template variable engine: variables
//! and their kinds, scoped bindings, async request and transaction state, time
//! ranges, data source shapes and dashboards. All types here are pure Rust with
//! no I/O dependencies.

pub mod async_request;
pub mod dashboard;
pub mod datasource;
pub mod error;
pub mod id;
pub mod scoped;
pub mod settings;
pub mod time_range;
pub mod transaction;
pub mod variable;

pub use async_request::{
    AsyncRequestAction, AsyncRequestMap, AsyncRequestState, RequestId, RequestIdGenerator,
    SerializedError,
};
pub use dashboard::{Dashboard, OrgInfo, Templating, UserInfo};
pub use datasource::{
    DEFAULT_DATASOURCE_NAME, DataFrame, DataQuery, DataQueryRequest, DataQueryResponse,
    DataSourceInstanceSettings, Field, MetricFindValue, PanelData,
};
pub use error::{DomainError, DomainResult};
pub use id::generate_id;
pub use scoped::{ScopedLookup, ScopedVar, ScopedVars};
pub use settings::EngineSettings;
pub use time_range::{Interval, RawTimeRange, TimeRange, calculate_interval, interval_to_ms};
pub use transaction::{TransactionState, TransactionStatus};
pub use variable::*;
