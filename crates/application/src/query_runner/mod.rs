//! Query runners for query variables
//!
//! A data source supports variable queries in one of four ways (see
//! [`VariableSupportType`]). [`QueryRunner::select`] picks the strategy once per
//! refresh, and every strategy normalizes its result to [`PanelData`].

mod frames;

use serde_json::Value;
use stencil_domain::{
    DataQuery, DataQueryRequest, DataSourceInstanceSettings, PanelData, QueryVariable,
    ScopedVars, TimeRange, VariableModel,
};
use thiserror::Error;
use tracing::debug;

use crate::error::ApplicationResult;
use crate::ports::{
    DataSource, DataSourceError, MetricFindQueryOptions, VariableSupport, VariableSupportType,
};

pub use frames::{metric_find_values_to_frame, to_metric_find_values};

/// `refId` given to data-source style variable queries that lack one.
pub const VARIABLE_QUERY_REF_ID: &str = "variable-query";

/// Errors raised while selecting or running a runner.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunnerError {
    /// The data source offers no way to run variable queries.
    #[error("data source {0} does not support variable queries")]
    Unsupported(String),

    /// Standard support was declared without a query converter.
    #[error("couldn't create a target for data source {0}")]
    NoTarget(String),

    /// The query result holds no string field to take values from.
    #[error("couldn't find any field of type string in the results")]
    NoStringField,
}

/// A variable query execution strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryRunner {
    /// `metric_find_query` with the interpolated query text.
    Legacy,
    /// `to_data_query` followed by a generic request.
    Standard,
    /// The data source's own variable query executor.
    Custom,
    /// The variable query is an ordinary data source query.
    Datasource,
}

/// Inputs of one runner call.
#[derive(Debug, Clone)]
pub struct RunnerArgs<'a> {
    /// The variable being refreshed.
    pub variable: &'a VariableModel,
    /// Its query settings.
    pub query: &'a QueryVariable,
    /// Query text with references substituted, for legacy data sources.
    pub interpolated_query: String,
    /// Time range; only set for variables that refresh with time.
    pub range: Option<TimeRange>,
    /// Text typed into the picker.
    pub search_filter: Option<String>,
    /// Scoped bindings handed to the data source.
    pub scoped_vars: ScopedVars,
    /// Request id for the generic request.
    pub request_id: String,
}

impl QueryRunner {
    /// Picks the runner for a data source.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Unsupported`] when the data source has neither
    /// variable support nor `metric_find_query`.
    pub fn select(datasource: &dyn DataSource) -> Result<Self, RunnerError> {
        match datasource.variables().map(VariableSupport::support_type) {
            Some(VariableSupportType::Standard) => Ok(Self::Standard),
            Some(VariableSupportType::Custom) => Ok(Self::Custom),
            Some(VariableSupportType::Datasource) => Ok(Self::Datasource),
            Some(VariableSupportType::Legacy) => Ok(Self::Legacy),
            None if datasource.supports_metric_find_query() => Ok(Self::Legacy),
            None => Err(RunnerError::Unsupported(datasource.settings().uid.clone())),
        }
    }

    /// Builds the query target.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::NoTarget`] when a standard data source cannot
    /// convert the query.
    pub fn target(
        self,
        datasource: &dyn DataSource,
        query: &Value,
    ) -> Result<DataQuery, RunnerError> {
        let uid = || datasource.settings().uid.clone();
        match self {
            Self::Legacy | Self::Custom => Ok(DataQuery::from_value(query)),
            Self::Standard => datasource
                .variables()
                .and_then(|support| support.to_data_query(query))
                .ok_or_else(|| RunnerError::NoTarget(uid())),
            Self::Datasource => {
                let mut target = DataQuery::from_value(query);
                if target.ref_id.is_empty() {
                    target.ref_id = VARIABLE_QUERY_REF_ID.to_string();
                }
                Ok(target)
            }
        }
    }

    /// Runs the variable query.
    ///
    /// # Errors
    ///
    /// Returns an error if target creation or the data source call fails.
    pub async fn run(
        self,
        datasource: &dyn DataSource,
        args: RunnerArgs<'_>,
    ) -> ApplicationResult<PanelData> {
        debug!(
            runner = ?self,
            datasource = %datasource.settings().uid,
            variable = %args.variable.name,
            "running variable query"
        );
        if self == Self::Legacy {
            let options = MetricFindQueryOptions {
                range: args.range.clone(),
                search_filter: args.search_filter.clone(),
                variable: Some(args.variable.identifier()),
                scoped_vars: args.scoped_vars.clone(),
            };
            let values = datasource
                .metric_find_query(&args.interpolated_query, options)
                .await?;
            let series = if values.is_empty() {
                Vec::new()
            } else {
                vec![metric_find_values_to_frame(&values)]
            };
            return Ok(PanelData::done(series, args.range));
        }

        let target = self.target(datasource, &args.query.query)?;
        let request = DataQueryRequest {
            request_id: args.request_id,
            targets: vec![target],
            range: args.range,
            scoped_vars: args.scoped_vars,
            search_filter: args.search_filter,
            ..DataQueryRequest::default()
        };
        let support = datasource.variables();
        match self {
            Self::Standard => {
                let custom = support.filter(|s| s.has_query());
                run_request(datasource, request, custom).await
            }
            Self::Custom => match support {
                Some(support) => run_request(datasource, request, Some(support)).await,
                None => Err(RunnerError::Unsupported(datasource.settings().uid.clone()).into()),
            },
            Self::Datasource | Self::Legacy => run_request(datasource, request, None).await,
        }
    }
}

/// Runs a request through the data source, or through `custom` when given.
///
/// # Errors
///
/// Returns the data source error.
pub async fn run_request(
    datasource: &dyn DataSource,
    request: DataQueryRequest,
    custom: Option<&dyn VariableSupport>,
) -> ApplicationResult<PanelData> {
    let range = request.range.clone();
    let response = match custom {
        Some(support) => support.query(request).await,
        None => datasource.query(request).await,
    }
    .map_err(|error| with_uid(error, datasource.settings()))?;
    Ok(PanelData::done(response.data, range))
}

fn with_uid(error: DataSourceError, settings: &DataSourceInstanceSettings) -> DataSourceError {
    match error {
        DataSourceError::NotSupported { uid, operation } if uid.is_empty() => {
            DataSourceError::NotSupported {
                uid: settings.uid.clone(),
                operation,
            }
        }
        other => other,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use stencil_domain::{
        DataFrame, DataQueryResponse, Field, MetricFindValue, VariableKind,
    };

    struct Support {
        kind: VariableSupportType,
        converts: bool,
        custom_query: bool,
    }

    #[async_trait]
    impl VariableSupport for Support {
        fn support_type(&self) -> VariableSupportType {
            self.kind
        }

        fn to_data_query(&self, raw: &Value) -> Option<DataQuery> {
            self.converts.then(|| DataQuery {
                ref_id: "std".to_string(),
                ..DataQuery::from_value(raw)
            })
        }

        fn has_query(&self) -> bool {
            self.custom_query
        }

        async fn query(&self, request: DataQueryRequest) -> Result<DataQueryResponse, DataSourceError> {
            Ok(DataQueryResponse {
                data: vec![DataFrame {
                    fields: vec![Field::strings("text", [format!("custom:{}", request.targets[0].ref_id)])],
                    ..DataFrame::default()
                }],
            })
        }
    }

    struct MockDataSource {
        settings: DataSourceInstanceSettings,
        legacy: bool,
        support: Option<Support>,
        requests: Mutex<Vec<DataQueryRequest>>,
        ranges: Mutex<Vec<Option<TimeRange>>>,
    }

    impl MockDataSource {
        fn new(legacy: bool, support: Option<Support>) -> Self {
            Self {
                settings: DataSourceInstanceSettings {
                    uid: "ds1".to_string(),
                    name: "DS".to_string(),
                    plugin_id: "test".to_string(),
                    is_default: false,
                },
                legacy,
                support,
                requests: Mutex::new(Vec::new()),
                ranges: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl DataSource for MockDataSource {
        fn settings(&self) -> &DataSourceInstanceSettings {
            &self.settings
        }

        fn supports_metric_find_query(&self) -> bool {
            self.legacy
        }

        async fn metric_find_query(
            &self,
            query: &str,
            options: MetricFindQueryOptions,
        ) -> Result<Vec<MetricFindValue>, DataSourceError> {
            assert!(options.variable.is_some());
            self.ranges.lock().push(options.range);
            Ok(vec![MetricFindValue::text(format!("legacy:{query}"))])
        }

        fn variables(&self) -> Option<&dyn VariableSupport> {
            self.support.as_ref().map(|s| s as &dyn VariableSupport)
        }

        async fn query(&self, request: DataQueryRequest) -> Result<DataQueryResponse, DataSourceError> {
            let ref_id = request.targets[0].ref_id.clone();
            self.requests.lock().push(request);
            Ok(DataQueryResponse {
                data: vec![DataFrame {
                    fields: vec![Field::strings("text", [format!("generic:{ref_id}")])],
                    ..DataFrame::default()
                }],
            })
        }
    }

    fn variable() -> (VariableModel, QueryVariable) {
        let query = QueryVariable {
            query: json!("up"),
            ..QueryVariable::default()
        };
        (
            VariableModel::new("v", VariableKind::Query(query.clone())),
            query,
        )
    }

    async fn run(ds: &MockDataSource) -> ApplicationResult<Vec<String>> {
        run_with_range(ds, None).await
    }

    async fn run_with_range(
        ds: &MockDataSource,
        range: Option<TimeRange>,
    ) -> ApplicationResult<Vec<String>> {
        let runner = QueryRunner::select(ds)?;
        let (variable, query) = variable();
        let data = runner
            .run(
                ds,
                RunnerArgs {
                    variable: &variable,
                    query: &query,
                    interpolated_query: "up".to_string(),
                    range,
                    search_filter: None,
                    scoped_vars: ScopedVars::new(),
                    request_id: "r1".to_string(),
                },
            )
            .await?;
        Ok(to_metric_find_values(&data.series)?
            .into_iter()
            .map(|v| v.text)
            .collect())
    }

    #[test]
    fn test_selection_by_capability() {
        let none = MockDataSource::new(false, None);
        assert_eq!(
            QueryRunner::select(&none),
            Err(RunnerError::Unsupported("ds1".to_string()))
        );
        assert_eq!(QueryRunner::select(&MockDataSource::new(true, None)), Ok(QueryRunner::Legacy));
        let custom = MockDataSource::new(
            true,
            Some(Support {
                kind: VariableSupportType::Custom,
                converts: false,
                custom_query: true,
            }),
        );
        assert_eq!(QueryRunner::select(&custom), Ok(QueryRunner::Custom));
    }

    #[tokio::test]
    async fn test_legacy_runner_uses_metric_find_query() {
        let ds = MockDataSource::new(true, None);
        assert_eq!(run(&ds).await.unwrap(), vec!["legacy:up"]);
    }

    #[tokio::test]
    async fn test_standard_runner_converts_then_runs_generic_request() {
        let ds = MockDataSource::new(
            false,
            Some(Support {
                kind: VariableSupportType::Standard,
                converts: true,
                custom_query: false,
            }),
        );
        assert_eq!(run(&ds).await.unwrap(), vec!["generic:std"]);
        assert_eq!(ds.requests.lock()[0].request_id, "r1");
    }

    #[tokio::test]
    async fn test_standard_runner_prefers_custom_query() {
        let ds = MockDataSource::new(
            false,
            Some(Support {
                kind: VariableSupportType::Standard,
                converts: true,
                custom_query: true,
            }),
        );
        assert_eq!(run(&ds).await.unwrap(), vec!["custom:std"]);
        assert!(ds.requests.lock().is_empty());
    }

    #[tokio::test]
    async fn test_standard_runner_without_converter_fails() {
        let ds = MockDataSource::new(
            false,
            Some(Support {
                kind: VariableSupportType::Standard,
                converts: false,
                custom_query: false,
            }),
        );
        let err = run(&ds).await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::ApplicationError::Runner(RunnerError::NoTarget(_))
        ));
    }

    #[tokio::test]
    async fn test_datasource_runner_sets_ref_id() {
        let ds = MockDataSource::new(
            false,
            Some(Support {
                kind: VariableSupportType::Datasource,
                converts: false,
                custom_query: false,
            }),
        );
        assert_eq!(run(&ds).await.unwrap(), vec!["generic:variable-query"]);
    }

    fn hour() -> TimeRange {
        let to = chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        TimeRange {
            from: to - chrono::Duration::hours(1),
            to,
            raw: stencil_domain::RawTimeRange {
                from: "now-1h".to_string(),
                to: "now".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_custom_runner_forwards_target_to_variable_support() {
        let ds = MockDataSource::new(
            false,
            Some(Support {
                kind: VariableSupportType::Custom,
                converts: false,
                custom_query: true,
            }),
        );
        assert_eq!(QueryRunner::select(&ds).unwrap(), QueryRunner::Custom);
        assert_eq!(run(&ds).await.unwrap(), vec!["custom:"]);
        assert!(ds.requests.lock().is_empty());
    }

    #[tokio::test]
    async fn test_custom_runner_without_support_is_unsupported() {
        let ds = MockDataSource::new(true, None);
        let (variable, query) = variable();
        let err = QueryRunner::Custom
            .run(
                &ds,
                RunnerArgs {
                    variable: &variable,
                    query: &query,
                    interpolated_query: "up".to_string(),
                    range: None,
                    search_filter: None,
                    scoped_vars: ScopedVars::new(),
                    request_id: "r1".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::ApplicationError::Runner(RunnerError::Unsupported(uid)) if uid == "ds1"
        ));
    }

    #[tokio::test]
    async fn test_range_is_forwarded_to_legacy_and_generic_calls() {
        let legacy = MockDataSource::new(true, None);
        run_with_range(&legacy, Some(hour())).await.unwrap();
        run_with_range(&legacy, None).await.unwrap();
        assert_eq!(legacy.ranges.lock().clone(), vec![Some(hour()), None]);

        let generic = MockDataSource::new(
            false,
            Some(Support {
                kind: VariableSupportType::Datasource,
                converts: false,
                custom_query: false,
            }),
        );
        run_with_range(&generic, Some(hour())).await.unwrap();
        assert_eq!(generic.requests.lock()[0].range, Some(hour()));
    }
}
