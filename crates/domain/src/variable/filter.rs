//! Ad-hoc filters.

use serde::{Deserialize, Serialize};

/// One `key operator value` filter of an ad-hoc variable.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AdHocFilter {
    /// Label or column the filter applies to.
    pub key: String,

    /// Comparison operator such as `=` or `!~`.
    pub operator: String,

    /// Value compared against.
    pub value: String,

    /// Boolean condition joining this filter to the previous one.
    #[serde(default)]
    pub condition: String,
}

impl AdHocFilter {
    /// Creates a filter with an empty condition.
    #[must_use]
    pub fn new(
        key: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            operator: operator.into(),
            value: value.into(),
            condition: String::new(),
        }
    }

    /// Serializes the filter as `key|operator|value`.
    #[must_use]
    pub fn to_url_value(&self) -> String {
        format!("{}|{}|{}", self.key, self.operator, self.value)
    }

    /// Parses a `key|operator|value` URL value.
    ///
    /// Returns `None` when fewer than three parts are present. Everything after the
    /// second delimiter belongs to the value.
    #[must_use]
    pub fn from_url_value(raw: &str) -> Option<Self> {
        let mut parts = raw.splitn(3, '|');
        let key = parts.next()?;
        let operator = parts.next()?;
        let value = parts.next()?;
        Some(Self::new(key, operator, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_url_value() {
        let filter = AdHocFilter::new("host", "=", "web-1");
        assert_eq!(filter.to_url_value(), "host|=|web-1");
        assert_eq!(AdHocFilter::from_url_value("host|=|web-1"), Some(filter));
    }

    #[test]
    fn test_url_value_rejects_short_input() {
        assert_eq!(AdHocFilter::from_url_value("host|="), None);
        assert_eq!(AdHocFilter::from_url_value(""), None);
    }
}
