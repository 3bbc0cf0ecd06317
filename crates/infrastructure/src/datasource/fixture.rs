//! Static data source fixtures.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use stencil_application::ports::{
    DataSource, DataSourceError, MetricFindQueryOptions, VariableSupport, VariableSupportType,
};
use stencil_application::query_runner::metric_find_values_to_frame;
use stencil_domain::{
    DataQuery, DataQueryRequest, DataQueryResponse, DataSourceInstanceSettings, MetricFindValue,
};
use tokio::fs;
use tracing::debug;

use crate::serialization::{SerializationError, from_json_bytes};

/// Error type for fixture loading.
#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    /// IO error while reading the fixture file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The fixture file is not valid JSON.
    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),
}

/// Which variable support strategy a fixture exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixtureMode {
    /// `metric_find_query` with the interpolated query text.
    #[default]
    Legacy,
    /// Structured queries converted with `to_data_query`.
    Standard,
    /// Variable queries run by the data source itself.
    Custom,
    /// Variable queries are plain data source queries.
    Datasource,
}

/// One fixture result row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FixtureValue {
    /// Text doubling as value.
    Text(String),
    /// Distinct text and value.
    Pair {
        /// Display text.
        text: String,
        /// Value; the text is used when absent.
        #[serde(default)]
        value: Option<String>,
    },
}

impl From<&FixtureValue> for MetricFindValue {
    fn from(value: &FixtureValue) -> Self {
        match value {
            FixtureValue::Text(text) => Self::text(text.clone()),
            FixtureValue::Pair { text, value: None } => Self::text(text.clone()),
            FixtureValue::Pair {
                text,
                value: Some(value),
            } => Self::with_value(text.clone(), value.clone()),
        }
    }
}

/// JSON form of a fixture data source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSourceFixture {
    /// Registered settings.
    #[serde(flatten)]
    pub settings: DataSourceInstanceSettings,

    /// Variable support strategy.
    #[serde(default)]
    pub mode: FixtureMode,

    /// Results by query text.
    #[serde(default)]
    pub queries: HashMap<String, Vec<FixtureValue>>,

    /// Failure messages by query text.
    #[serde(default)]
    pub errors: HashMap<String, String>,
}

/// A data source answering from a [`DataSourceFixture`].
///
/// Unknown queries yield no rows. In the legacy mode the lookup key is the
/// interpolated query; otherwise it is the `query` field of the first target,
/// since interpolation is left to the data source.
#[derive(Debug, Clone)]
pub struct StaticDataSource {
    fixture: DataSourceFixture,
}

impl StaticDataSource {
    /// Wraps a fixture.
    #[must_use]
    pub const fn new(fixture: DataSourceFixture) -> Self {
        Self { fixture }
    }

    fn lookup(&self, query: &str) -> Result<Vec<MetricFindValue>, DataSourceError> {
        debug!(datasource = %self.fixture.settings.uid, query, "fixture lookup");
        if let Some(message) = self.fixture.errors.get(query) {
            return Err(DataSourceError::query(message.clone()));
        }
        Ok(self
            .fixture
            .queries
            .get(query)
            .map(|rows| rows.iter().map(MetricFindValue::from).collect())
            .unwrap_or_default())
    }

    fn respond(&self, request: &DataQueryRequest) -> Result<DataQueryResponse, DataSourceError> {
        let mut data = Vec::new();
        for target in &request.targets {
            let query = target
                .fields
                .get("query")
                .and_then(Value::as_str)
                .unwrap_or_default();
            let values = self.lookup(query)?;
            if values.is_empty() {
                continue;
            }
            let mut frame = metric_find_values_to_frame(&values);
            frame.ref_id = Some(target.ref_id.clone());
            data.push(frame);
        }
        Ok(DataQueryResponse { data })
    }
}

#[async_trait]
impl DataSource for StaticDataSource {
    fn settings(&self) -> &DataSourceInstanceSettings {
        &self.fixture.settings
    }

    fn supports_metric_find_query(&self) -> bool {
        self.fixture.mode == FixtureMode::Legacy
    }

    async fn metric_find_query(
        &self,
        query: &str,
        _options: MetricFindQueryOptions,
    ) -> Result<Vec<MetricFindValue>, DataSourceError> {
        self.lookup(query)
    }

    fn variables(&self) -> Option<&dyn VariableSupport> {
        match self.fixture.mode {
            FixtureMode::Legacy => None,
            _ => Some(self),
        }
    }

    async fn query(&self, request: DataQueryRequest) -> Result<DataQueryResponse, DataSourceError> {
        self.respond(&request)
    }
}

#[async_trait]
impl VariableSupport for StaticDataSource {
    fn support_type(&self) -> VariableSupportType {
        match self.fixture.mode {
            FixtureMode::Legacy => VariableSupportType::Legacy,
            FixtureMode::Standard => VariableSupportType::Standard,
            FixtureMode::Custom => VariableSupportType::Custom,
            FixtureMode::Datasource => VariableSupportType::Datasource,
        }
    }

    fn to_data_query(&self, raw: &Value) -> Option<DataQuery> {
        let mut query = DataQuery::from_value(raw);
        if query.ref_id.is_empty() {
            query.ref_id = "A".to_string();
        }
        Some(query)
    }

    fn has_query(&self) -> bool {
        self.fixture.mode == FixtureMode::Custom
    }

    async fn query(&self, request: DataQueryRequest) -> Result<DataQueryResponse, DataSourceError> {
        self.respond(&request)
    }
}

/// Reads an array of fixtures from a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub async fn load_fixtures(path: &Path) -> Result<Vec<StaticDataSource>, FixtureError> {
    let content = fs::read(path).await?;
    let fixtures: Vec<DataSourceFixture> = from_json_bytes(&content)?;
    Ok(fixtures.into_iter().map(StaticDataSource::new).collect())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn fixture(mode: &str) -> StaticDataSource {
        let fixture: DataSourceFixture = serde_json::from_value(json!({
            "uid": "prom",
            "name": "Prometheus",
            "type": "prometheus",
            "mode": mode,
            "queries": {
                "regions": ["us", {"text": "Europe", "value": "eu"}]
            },
            "errors": {"broken": "backend timeout"}
        }))
        .unwrap();
        StaticDataSource::new(fixture)
    }

    #[tokio::test]
    async fn test_legacy_lookup() {
        let ds = fixture("legacy");
        assert!(ds.supports_metric_find_query());
        assert!(ds.variables().is_none());

        let values = ds
            .metric_find_query("regions", MetricFindQueryOptions::default())
            .await
            .unwrap();
        assert_eq!(
            values,
            vec![MetricFindValue::text("us"), MetricFindValue::with_value("Europe", "eu")]
        );
        assert!(
            ds.metric_find_query("unknown", MetricFindQueryOptions::default())
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_configured_error() {
        let ds = fixture("legacy");
        let err = ds
            .metric_find_query("broken", MetricFindQueryOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "backend timeout");
    }

    #[tokio::test]
    async fn test_standard_mode_answers_structured_queries() {
        let ds = fixture("standard");
        let support = ds.variables().unwrap();
        assert_eq!(support.support_type(), VariableSupportType::Standard);
        assert!(!support.has_query());

        let target = support.to_data_query(&json!("regions")).unwrap();
        assert_eq!(target.ref_id, "A");
        let request = DataQueryRequest {
            targets: vec![target],
            ..DataQueryRequest::default()
        };
        let response = DataSource::query(&ds, request).await.unwrap();
        assert_eq!(response.data.len(), 1);
        assert_eq!(response.data[0].ref_id.as_deref(), Some("A"));
        assert_eq!(response.data[0].len(), 2);
    }

    #[test]
    fn test_custom_mode_has_query() {
        let ds = fixture("custom");
        assert!(ds.variables().unwrap().has_query());
        assert!(!ds.supports_metric_find_query());
    }

    #[tokio::test]
    async fn test_load_fixtures_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("datasources.json");
        std::fs::write(
            &path,
            r#"[{"uid": "a", "name": "A", "type": "test", "isDefault": true}]"#,
        )
        .unwrap();

        let sources = load_fixtures(&path).await.unwrap();
        assert_eq!(sources.len(), 1);
        assert!(sources[0].settings().is_default);
        assert_eq!(sources[0].fixture.mode, FixtureMode::Legacy);
    }
}
