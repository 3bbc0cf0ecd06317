//! Data source descriptors and the query/response shapes exchanged with them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::scoped::ScopedVars;
use crate::time_range::TimeRange;
use crate::variable::LoadingState;

/// Reserved name that resolves to the default data source.
pub const DEFAULT_DATASOURCE_NAME: &str = "default";

/// Registered data source instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceInstanceSettings {
    /// Unique id.
    pub uid: String,

    /// Display name.
    pub name: String,

    /// Plugin id, e.g. `prometheus`.
    #[serde(rename = "type")]
    pub plugin_id: String,

    /// Whether this is the default data source.
    #[serde(default)]
    pub is_default: bool,
}

/// One value returned by a metric find query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricFindValue {
    /// Display text.
    pub text: String,

    /// Value; the text is used when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Whether the value has children.
    #[serde(default)]
    pub expandable: bool,
}

impl MetricFindValue {
    /// Creates a value whose text doubles as value.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            value: None,
            expandable: false,
        }
    }

    /// Creates a value with distinct text and value.
    #[must_use]
    pub fn with_value(text: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            value: Some(value.into()),
            expandable: false,
        }
    }

    /// Returns the value, falling back to the text.
    #[must_use]
    pub fn value_or_text(&self) -> &str {
        self.value.as_deref().unwrap_or(&self.text)
    }
}

/// A structured query addressed by `refId`; the rest is data-source specific.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataQuery {
    /// Query reference id; empty when not yet assigned.
    #[serde(default)]
    pub ref_id: String,

    /// Data-source specific fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl DataQuery {
    /// Builds a query from JSON; strings become `{"query": <string>}`.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(map) => {
                let mut fields = map.clone();
                let ref_id = match fields.remove("refId") {
                    Some(Value::String(ref_id)) => ref_id,
                    _ => String::new(),
                };
                Self { ref_id, fields }
            }
            other => {
                let mut fields = Map::new();
                fields.insert("query".to_string(), other.clone());
                Self {
                    ref_id: String::new(),
                    fields,
                }
            }
        }
    }
}

/// A query request handed to a data source.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataQueryRequest {
    /// Request id, used to correlate responses.
    pub request_id: String,

    /// Queries to run.
    pub targets: Vec<DataQuery>,

    /// Time context; absent when the variable does not refresh with time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<TimeRange>,

    /// Scoped bindings for interpolation inside the data source.
    #[serde(skip)]
    pub scoped_vars: ScopedVars,

    /// Interval text, e.g. `1m`.
    #[serde(default)]
    pub interval: String,

    /// Interval in milliseconds.
    #[serde(default)]
    pub interval_ms: i64,

    /// Text typed into the picker to narrow results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_filter: Option<String>,
}

/// A named column of values.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Field {
    /// Column name.
    pub name: String,
    /// Column values.
    #[serde(default)]
    pub values: Vec<Value>,
}

impl Field {
    /// Creates a field from string values.
    #[must_use]
    pub fn strings<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            values: values
                .into_iter()
                .map(|v| Value::String(v.into()))
                .collect(),
        }
    }
}

/// Columnar result of a query.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataFrame {
    /// Frame name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Query the frame answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<String>,
    /// Columns.
    #[serde(default)]
    pub fields: Vec<Field>,
}

impl DataFrame {
    /// Number of rows, taken from the longest field.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.iter().map(|f| f.values.len()).max().unwrap_or(0)
    }

    /// Returns true if the frame has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Raw response of a data source query.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DataQueryResponse {
    /// Result frames.
    #[serde(default)]
    pub data: Vec<DataFrame>,
}

/// Normalized result of a variable query run.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelData {
    /// Result frames.
    pub series: Vec<DataFrame>,
    /// Outcome.
    pub state: LoadingState,
    /// Range the query ran against.
    pub time_range: Option<TimeRange>,
}

impl PanelData {
    /// A completed result.
    #[must_use]
    pub const fn done(series: Vec<DataFrame>, time_range: Option<TimeRange>) -> Self {
        Self {
            series,
            state: LoadingState::Done,
            time_range,
        }
    }
}
