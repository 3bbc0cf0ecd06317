//! Variable kinds and their kind-specific settings.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::filter::AdHocFilter;
use crate::error::DomainError;

/// Discriminant of a variable kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableType {
    /// Options come from a data source query.
    Query,
    /// Options come from a comma-separated list.
    Custom,
    /// A hidden, fixed value.
    Constant,
    /// A list of time intervals, optionally with an automatic one.
    Interval,
    /// A free-form text input.
    TextBox,
    /// A list of data sources of one plugin type.
    DataSource,
    /// Free-form key/operator/value filters.
    AdHoc,
    /// Built-in values such as the dashboard or the user.
    System,
}

impl VariableType {
    /// Every kind in registration order.
    pub const ALL: [Self; 8] = [
        Self::Query,
        Self::Custom,
        Self::TextBox,
        Self::Constant,
        Self::DataSource,
        Self::Interval,
        Self::AdHoc,
        Self::System,
    ];

    /// Returns the wire name of the kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Custom => "custom",
            Self::Constant => "constant",
            Self::Interval => "interval",
            Self::TextBox => "textbox",
            Self::DataSource => "datasource",
            Self::AdHoc => "adhoc",
            Self::System => "system",
        }
    }
}

impl fmt::Display for VariableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for VariableType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|ty| ty.as_str() == s)
            .ok_or_else(|| DomainError::UnknownVariableType(s.to_string()))
    }
}

macro_rules! numeric_enum {
    ($name:ident, $kind:literal, { $($variant:ident = $value:literal),+ $(,)? }) => {
        impl TryFrom<u8> for $name {
            type Error = DomainError;

            fn try_from(value: u8) -> Result<Self, Self::Error> {
                match value {
                    $($value => Ok(Self::$variant),)+
                    other => Err(DomainError::InvalidDiscriminant { kind: $kind, value: other }),
                }
            }
        }

        impl From<$name> for u8 {
            fn from(value: $name) -> Self {
                match value {
                    $($name::$variant => $value,)+
                }
            }
        }
    };
}

/// How a variable picker is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum VariableHide {
    /// Label and picker are shown.
    #[default]
    DontHide,
    /// Only the picker is shown.
    HideLabel,
    /// Nothing is shown.
    HideVariable,
}

numeric_enum!(VariableHide, "hide", { DontHide = 0, HideLabel = 1, HideVariable = 2 });

/// When a variable re-derives its options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum VariableRefresh {
    /// Options are persisted with the dashboard and never refreshed.
    Never,
    /// Options are refreshed once when the dashboard loads.
    #[default]
    OnDashboardLoad,
    /// Options are refreshed on load and whenever the time range changes.
    OnTimeRangeChanged,
}

numeric_enum!(VariableRefresh, "refresh", { Never = 0, OnDashboardLoad = 1, OnTimeRangeChanged = 2 });

/// Sort order applied to query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum VariableSort {
    /// Keep data source order.
    #[default]
    Disabled,
    /// Alphabetical, ascending.
    AlphabeticalAsc,
    /// Alphabetical, descending.
    AlphabeticalDesc,
    /// By the first number in the text, ascending.
    NumericalAsc,
    /// By the first number in the text, descending.
    NumericalDesc,
    /// Alphabetical ignoring case, ascending.
    AlphabeticalCaseInsensitiveAsc,
    /// Alphabetical ignoring case, descending.
    AlphabeticalCaseInsensitiveDesc,
}

numeric_enum!(VariableSort, "sort", {
    Disabled = 0,
    AlphabeticalAsc = 1,
    AlphabeticalDesc = 2,
    NumericalAsc = 3,
    NumericalDesc = 4,
    AlphabeticalCaseInsensitiveAsc = 5,
    AlphabeticalCaseInsensitiveDesc = 6,
});

/// Loading state of a variable or a query result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LoadingState {
    /// Nothing requested yet.
    #[default]
    NotStarted,
    /// A refresh is in flight.
    Loading,
    /// The last refresh completed.
    Done,
    /// The last refresh failed.
    Error,
}

/// Reference to a data source, by uid and plugin type.
///
/// Older dashboards store a plain data source name; it is read into `uid`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "DataSourceRefRepr")]
pub struct DataSourceRef {
    /// Data source uid (or legacy name).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,

    /// Plugin id of the data source.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub plugin_type: Option<String>,
}

impl DataSourceRef {
    /// Creates a reference by uid.
    #[must_use]
    pub fn uid(uid: impl Into<String>) -> Self {
        Self {
            uid: Some(uid.into()),
            plugin_type: None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DataSourceRefRepr {
    Name(String),
    Ref {
        #[serde(default)]
        uid: Option<String>,
        #[serde(rename = "type", default)]
        plugin_type: Option<String>,
    },
}

impl From<DataSourceRefRepr> for DataSourceRef {
    fn from(repr: DataSourceRefRepr) -> Self {
        match repr {
            DataSourceRefRepr::Name(name) => Self::uid(name),
            DataSourceRefRepr::Ref { uid, plugin_type } => Self { uid, plugin_type },
        }
    }
}

/// Multi-select settings shared by kinds with an option list.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionOptions {
    /// Whether several options may be selected.
    #[serde(default)]
    pub multi: bool,

    /// Whether an "All" option is offered.
    #[serde(default)]
    pub include_all: bool,

    /// Custom value interpolated when "All" is selected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_value: Option<String>,
}

fn empty_query() -> serde_json::Value {
    serde_json::Value::String(String::new())
}

/// Settings of a query variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryVariable {
    /// The query: a string for legacy data sources, an object otherwise.
    #[serde(default = "empty_query")]
    pub query: serde_json::Value,

    /// Data source the query runs against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datasource: Option<DataSourceRef>,

    /// Human-readable form of the query.
    #[serde(default)]
    pub definition: String,

    /// Regex applied to results.
    #[serde(default)]
    pub regex: String,

    /// When options are refreshed.
    #[serde(default)]
    pub refresh: VariableRefresh,

    /// Result ordering.
    #[serde(default)]
    pub sort: VariableSort,

    /// Multi-select settings.
    #[serde(flatten)]
    pub selection: SelectionOptions,
}

impl Default for QueryVariable {
    fn default() -> Self {
        Self {
            query: empty_query(),
            datasource: None,
            definition: String::new(),
            regex: String::new(),
            refresh: VariableRefresh::OnDashboardLoad,
            sort: VariableSort::Disabled,
            selection: SelectionOptions::default(),
        }
    }
}

/// Settings of a custom variable.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomVariable {
    /// Comma-separated values, optionally `text : value` pairs.
    #[serde(default)]
    pub query: String,

    /// Multi-select settings.
    #[serde(flatten)]
    pub selection: SelectionOptions,
}

/// Settings of a constant variable.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConstantVariable {
    /// The constant value.
    #[serde(default)]
    pub query: String,
}

/// Settings of a text box variable.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TextBoxVariable {
    /// The current text.
    #[serde(default)]
    pub query: String,

    /// The text as loaded from the dashboard, before any edit.
    #[serde(skip)]
    pub original_query: Option<String>,
}

const fn default_auto_count() -> u32 {
    30
}

fn default_auto_min() -> String {
    "10s".to_string()
}

const fn default_interval_refresh() -> VariableRefresh {
    VariableRefresh::OnTimeRangeChanged
}

/// Settings of an interval variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntervalVariable {
    /// Comma-separated interval list such as `1m,10m,1h`.
    #[serde(default)]
    pub query: String,

    /// Whether an automatic interval option is offered.
    #[serde(default)]
    pub auto: bool,

    /// Number of steps the time range is divided into for the automatic interval.
    #[serde(default = "default_auto_count", rename = "auto_count")]
    pub auto_count: u32,

    /// Lower bound of the automatic interval.
    #[serde(default = "default_auto_min", rename = "auto_min")]
    pub auto_min: String,

    /// When options are refreshed.
    #[serde(default = "default_interval_refresh")]
    pub refresh: VariableRefresh,
}

impl Default for IntervalVariable {
    fn default() -> Self {
        Self {
            query: "1m,10m,30m,1h,6h,12h,1d,7d,14d,30d".to_string(),
            auto: false,
            auto_count: default_auto_count(),
            auto_min: default_auto_min(),
            refresh: default_interval_refresh(),
        }
    }
}

/// Settings of a data source variable.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceVariable {
    /// Plugin id the listed data sources must have.
    #[serde(default)]
    pub query: String,

    /// Regex the data source names must match.
    #[serde(default)]
    pub regex: String,

    /// When options are refreshed.
    #[serde(default)]
    pub refresh: VariableRefresh,

    /// Multi-select settings.
    #[serde(flatten)]
    pub selection: SelectionOptions,
}

/// Settings of an ad-hoc filter variable.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AdHocVariable {
    /// Data source the filters apply to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datasource: Option<DataSourceRef>,

    /// The active filters.
    #[serde(default)]
    pub filters: Vec<AdHocFilter>,
}

/// Settings of a built-in system variable.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SystemVariable {
    /// Structured value, addressable through field paths.
    #[serde(default)]
    pub value: serde_json::Value,
}

/// Kind-specific part of a variable, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum VariableKind {
    /// See [`QueryVariable`].
    Query(QueryVariable),
    /// See [`CustomVariable`].
    Custom(CustomVariable),
    /// See [`ConstantVariable`].
    Constant(ConstantVariable),
    /// See [`IntervalVariable`].
    Interval(IntervalVariable),
    /// See [`TextBoxVariable`].
    TextBox(TextBoxVariable),
    /// See [`DataSourceVariable`].
    DataSource(DataSourceVariable),
    /// See [`AdHocVariable`].
    AdHoc(AdHocVariable),
    /// See [`SystemVariable`].
    System(SystemVariable),
}

impl VariableKind {
    /// Returns the default settings for a kind.
    #[must_use]
    pub fn initial(variable_type: VariableType) -> Self {
        match variable_type {
            VariableType::Query => Self::Query(QueryVariable::default()),
            VariableType::Custom => Self::Custom(CustomVariable::default()),
            VariableType::Constant => Self::Constant(ConstantVariable::default()),
            VariableType::Interval => Self::Interval(IntervalVariable::default()),
            VariableType::TextBox => Self::TextBox(TextBoxVariable::default()),
            VariableType::DataSource => Self::DataSource(DataSourceVariable::default()),
            VariableType::AdHoc => Self::AdHoc(AdHocVariable::default()),
            VariableType::System => Self::System(SystemVariable::default()),
        }
    }

    /// Returns the discriminant.
    #[must_use]
    pub const fn variable_type(&self) -> VariableType {
        match self {
            Self::Query(_) => VariableType::Query,
            Self::Custom(_) => VariableType::Custom,
            Self::Constant(_) => VariableType::Constant,
            Self::Interval(_) => VariableType::Interval,
            Self::TextBox(_) => VariableType::TextBox,
            Self::DataSource(_) => VariableType::DataSource,
            Self::AdHoc(_) => VariableType::AdHoc,
            Self::System(_) => VariableType::System,
        }
    }

    /// Returns the refresh mode for kinds that refresh.
    #[must_use]
    pub const fn refresh(&self) -> Option<VariableRefresh> {
        match self {
            Self::Query(v) => Some(v.refresh),
            Self::Interval(v) => Some(v.refresh),
            Self::DataSource(v) => Some(v.refresh),
            _ => None,
        }
    }

    /// Returns the multi-select settings for kinds that have them.
    #[must_use]
    pub const fn selection(&self) -> Option<&SelectionOptions> {
        match self {
            Self::Query(v) => Some(&v.selection),
            Self::Custom(v) => Some(&v.selection),
            Self::DataSource(v) => Some(&v.selection),
            _ => None,
        }
    }

    /// Mutable access to the multi-select settings.
    pub const fn selection_mut(&mut self) -> Option<&mut SelectionOptions> {
        match self {
            Self::Query(v) => Some(&mut v.selection),
            Self::Custom(v) => Some(&mut v.selection),
            Self::DataSource(v) => Some(&mut v.selection),
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_type_round_trips_through_str() {
        for ty in VariableType::ALL {
            assert_eq!(ty.as_str().parse::<VariableType>().unwrap(), ty);
        }
        assert!("panel".parse::<VariableType>().is_err());
    }

    #[test]
    fn test_refresh_is_numeric_on_the_wire() {
        let json = serde_json::to_string(&VariableRefresh::OnTimeRangeChanged).unwrap();
        assert_eq!(json, "2");
        let parsed: VariableRefresh = serde_json::from_str("0").unwrap();
        assert_eq!(parsed, VariableRefresh::Never);
        assert!(serde_json::from_str::<VariableRefresh>("7").is_err());
    }

    #[test]
    fn test_datasource_ref_accepts_legacy_name() {
        let legacy: DataSourceRef = serde_json::from_str("\"influx\"").unwrap();
        assert_eq!(legacy.uid.as_deref(), Some("influx"));

        let modern: DataSourceRef =
            serde_json::from_str(r#"{"uid":"abc","type":"prometheus"}"#).unwrap();
        assert_eq!(modern.uid.as_deref(), Some("abc"));
        assert_eq!(modern.plugin_type.as_deref(), Some("prometheus"));
    }

    #[test]
    fn test_kind_is_tagged_by_type() {
        let kind: VariableKind =
            serde_json::from_str(r#"{"type":"custom","query":"a,b","multi":true}"#).unwrap();
        let VariableKind::Custom(custom) = kind else {
            panic!("expected custom kind");
        };
        assert_eq!(custom.query, "a,b");
        assert!(custom.selection.multi);
    }
}
