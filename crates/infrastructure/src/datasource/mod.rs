//! Data sources backed by JSON fixtures.
//!
//! A fixture file holds an array of data sources. Each one answers variable
//! queries from a fixed table, and can pose as any of the variable support
//! strategies so every query runner path can be exercised without a backend.

mod fixture;
mod registry;

pub use fixture::{DataSourceFixture, FixtureError, FixtureMode, FixtureValue, StaticDataSource, load_fixtures};
pub use registry::InMemoryDataSourceRegistry;
