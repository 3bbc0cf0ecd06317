//! Dashboard documents as far as templating is concerned.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::time_range::RawTimeRange;
use crate::variable::PersistedVariable;

/// The `templating` section of a dashboard.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Templating {
    /// Persisted variables in display order.
    #[serde(default)]
    pub list: Vec<PersistedVariable>,
}

/// A dashboard document.
///
/// Fields outside templating are kept untouched in `extra` so a load/save cycle
/// does not lose them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Dashboard {
    /// Dashboard uid.
    #[serde(default)]
    pub uid: String,

    /// Dashboard title.
    #[serde(default)]
    pub title: String,

    /// Default time range.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<RawTimeRange>,

    /// Template variables.
    #[serde(default)]
    pub templating: Templating,

    /// Everything else in the document.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Dashboard {
    /// Creates an empty dashboard.
    #[must_use]
    pub fn new(uid: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            title: title.into(),
            ..Self::default()
        }
    }

    /// Finds a persisted variable by name.
    #[must_use]
    pub fn variable(&self, name: &str) -> Option<&PersistedVariable> {
        self.templating.list.iter().find(|v| v.name == name)
    }
}

/// The signed-in user, exposed as `${__user.<field>}`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserInfo {
    /// Numeric id.
    pub id: i64,
    /// Login name.
    pub login: String,
    /// Email address.
    #[serde(default)]
    pub email: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
}

/// The current organization, exposed as `${__org.<field>}`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OrgInfo {
    /// Numeric id.
    pub id: i64,
    /// Organization name.
    pub name: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_unknown_fields_survive_round_trip() {
        let input = json!({
            "uid": "abc",
            "title": "Hosts",
            "panels": [{"id": 1}],
            "templating": {"list": [{"type": "constant", "name": "env", "query": "prod"}]}
        });
        let dashboard: Dashboard = serde_json::from_value(input).unwrap();
        assert_eq!(dashboard.templating.list.len(), 1);
        assert!(dashboard.variable("env").is_some());

        let output = serde_json::to_value(&dashboard).unwrap();
        assert_eq!(output["panels"], json!([{"id": 1}]));
    }
}
