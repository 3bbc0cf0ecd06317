//! Data source ports
//!
//! The engine never talks to a query backend directly. It consumes two capability
//! contracts: the legacy `metric_find_query`, and the structured
//! [`VariableSupport`] a data source may expose.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use stencil_domain::{
    DataQuery, DataQueryRequest, DataQueryResponse, DataSourceInstanceSettings, DataSourceRef,
    MetricFindValue, ScopedVars, TimeRange, VariableIdentifier,
};

/// Errors raised by data sources and the data source registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DataSourceError {
    /// No data source matches the reference.
    #[error("data source not found: {0}")]
    NotFound(String),

    /// The data source lacks the requested capability.
    #[error("data source {uid} does not support {operation}")]
    NotSupported {
        /// Data source uid.
        uid: String,
        /// The missing capability.
        operation: &'static str,
    },

    /// The query itself failed.
    #[error("{message}")]
    Query {
        /// Failure message.
        message: String,
        /// Backend error code, if any.
        code: Option<String>,
    },
}

impl DataSourceError {
    /// Creates a query failure without a code.
    #[must_use]
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
            code: None,
        }
    }
}

/// Options passed to [`DataSource::metric_find_query`].
#[derive(Debug, Clone, Default)]
pub struct MetricFindQueryOptions {
    /// Time context; only set for variables that refresh with time.
    pub range: Option<TimeRange>,
    /// Text typed into the picker.
    pub search_filter: Option<String>,
    /// The variable being refreshed.
    pub variable: Option<VariableIdentifier>,
    /// Scoped bindings for interpolation inside the data source.
    pub scoped_vars: ScopedVars,
}

/// How a data source supports variable queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableSupportType {
    /// Only `metric_find_query`.
    Legacy,
    /// Structured queries built with `to_data_query` and run through `query`.
    Standard,
    /// The data source executes variable queries itself.
    Custom,
    /// Variable queries are ordinary data source queries.
    Datasource,
}

/// Structured variable query capability of a data source.
#[async_trait]
pub trait VariableSupport: Send + Sync {
    /// Declares which strategy the data source supports.
    fn support_type(&self) -> VariableSupportType;

    /// Converts a raw variable query into a data query. Required for `Standard`.
    fn to_data_query(&self, _raw: &Value) -> Option<DataQuery> {
        None
    }

    /// Returns true if [`VariableSupport::query`] overrides generic execution.
    fn has_query(&self) -> bool {
        false
    }

    /// Runs a variable query with data-source specific execution.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or is not supported.
    async fn query(&self, _request: DataQueryRequest) -> Result<DataQueryResponse, DataSourceError> {
        Err(DataSourceError::NotSupported {
            uid: String::new(),
            operation: "variables.query",
        })
    }
}

/// A data source instance.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Returns the registered settings.
    fn settings(&self) -> &DataSourceInstanceSettings;

    /// Returns true if [`DataSource::metric_find_query`] is implemented.
    fn supports_metric_find_query(&self) -> bool {
        false
    }

    /// Finds metric values for a text query.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or is not supported.
    async fn metric_find_query(
        &self,
        _query: &str,
        _options: MetricFindQueryOptions,
    ) -> Result<Vec<MetricFindValue>, DataSourceError> {
        Err(DataSourceError::NotSupported {
            uid: self.settings().uid.clone(),
            operation: "metricFindQuery",
        })
    }

    /// Returns the structured variable support, if any.
    fn variables(&self) -> Option<&dyn VariableSupport> {
        None
    }

    /// Runs a generic data query.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    async fn query(&self, request: DataQueryRequest) -> Result<DataQueryResponse, DataSourceError>;
}

/// Lookup of registered data sources.
#[async_trait]
pub trait DataSourceRegistry: Send + Sync {
    /// Returns the settings of the data source with this uid or name;
    /// `None` or `"default"` selects the default data source.
    fn get_instance_settings(&self, name_or_uid: Option<&str>)
    -> Option<DataSourceInstanceSettings>;

    /// Lists every registered data source.
    fn get_list(&self) -> Vec<DataSourceInstanceSettings>;

    /// Resolves a reference to a live data source.
    ///
    /// # Errors
    ///
    /// Returns [`DataSourceError::NotFound`] if nothing matches.
    async fn get(&self, reference: Option<&DataSourceRef>)
    -> Result<Arc<dyn DataSource>, DataSourceError>;
}
