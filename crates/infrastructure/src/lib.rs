//! Stencil Infrastructure - Adapters and implementations
//!
//! This crate provides concrete implementations of the ports defined in the
//! application layer: file-based dashboard and settings storage, an in-memory
//! URL location, a tracing-backed event sink, and fixture data sources.

pub mod adapters;
pub mod datasource;
pub mod persistence;
pub mod serialization;

pub use adapters::{InMemoryLocation, SystemClock, TracingEvents};
pub use datasource::{
    DataSourceFixture, FixtureError, FixtureMode, FixtureValue, InMemoryDataSourceRegistry,
    StaticDataSource, load_fixtures,
};
pub use persistence::{
    FileDashboardRepository, SettingsError, SettingsRepository, apply_env_overrides,
};
pub use serialization::{
    SerializationError, from_json, from_json_bytes, to_json_stable, to_json_stable_bytes,
};
