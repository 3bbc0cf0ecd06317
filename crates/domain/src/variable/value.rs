//! Variable values and selectable options.

use serde::{Deserialize, Serialize};

/// Text shown for the "select everything" option.
pub const ALL_VARIABLE_TEXT: &str = "All";

/// Reserved sentinel value meaning "every option".
pub const ALL_VARIABLE_VALUE: &str = "$__all";

/// Text shown when a refresh produced no options.
pub const NONE_VARIABLE_TEXT: &str = "None";

/// Value stored for the "None" option.
pub const NONE_VARIABLE_VALUE: &str = "";

/// Prefix of the auto-interval value of an interval variable.
pub const AUTO_INTERVAL_PREFIX: &str = "$__auto_interval_";

/// A variable value: either a single string or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariableValue {
    /// A single value.
    Single(String),
    /// A multi-value selection.
    Multi(Vec<String>),
}

impl VariableValue {
    /// Returns the value as a single string, if it is not a list.
    #[must_use]
    pub fn as_single(&self) -> Option<&str> {
        match self {
            Self::Single(value) => Some(value),
            Self::Multi(_) => None,
        }
    }

    /// Returns true if this is a list value.
    #[must_use]
    pub const fn is_multi(&self) -> bool {
        matches!(self, Self::Multi(_))
    }

    /// Returns true if the value is an empty string or an empty list.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Single(value) => value.is_empty(),
            Self::Multi(values) => values.is_empty(),
        }
    }

    /// Returns every contained value as a slice-like list.
    #[must_use]
    pub fn values(&self) -> Vec<&str> {
        match self {
            Self::Single(value) => vec![value.as_str()],
            Self::Multi(values) => values.iter().map(String::as_str).collect(),
        }
    }

    /// Returns true if `candidate` equals the value or is one of the values.
    #[must_use]
    pub fn contains(&self, candidate: &str) -> bool {
        match self {
            Self::Single(value) => value == candidate,
            Self::Multi(values) => values.iter().any(|v| v == candidate),
        }
    }

    /// Returns true if the value is the all sentinel.
    ///
    /// A list counts when its first element is the sentinel.
    #[must_use]
    pub fn is_all(&self) -> bool {
        match self {
            Self::Single(value) => value == ALL_VARIABLE_VALUE,
            Self::Multi(values) => values.first().is_some_and(|v| v == ALL_VARIABLE_VALUE),
        }
    }

    /// Converts into a list, wrapping a single value.
    #[must_use]
    pub fn into_multi(self) -> Self {
        match self {
            Self::Single(value) => Self::Multi(vec![value]),
            multi @ Self::Multi(_) => multi,
        }
    }

    /// Joins the contained values with `separator`.
    #[must_use]
    pub fn join(&self, separator: &str) -> String {
        match self {
            Self::Single(value) => value.clone(),
            Self::Multi(values) => values.join(separator),
        }
    }

    /// Normalizes for comparison: an empty list becomes `None`, a one-element list a scalar.
    #[must_use]
    pub fn normalized(&self) -> Option<Self> {
        match self {
            Self::Multi(values) if values.is_empty() => None,
            Self::Multi(values) if values.len() == 1 => Some(Self::Single(values[0].clone())),
            other => Some(other.clone()),
        }
    }
}

impl Default for VariableValue {
    fn default() -> Self {
        Self::Single(String::new())
    }
}

impl From<&str> for VariableValue {
    fn from(value: &str) -> Self {
        Self::Single(value.to_string())
    }
}

impl From<String> for VariableValue {
    fn from(value: String) -> Self {
        Self::Single(value)
    }
}

impl From<Vec<String>> for VariableValue {
    fn from(values: Vec<String>) -> Self {
        Self::Multi(values)
    }
}

impl From<Vec<&str>> for VariableValue {
    fn from(values: Vec<&str>) -> Self {
        Self::Multi(values.into_iter().map(str::to_string).collect())
    }
}

impl From<&VariableValue> for serde_json::Value {
    fn from(value: &VariableValue) -> Self {
        match value {
            VariableValue::Single(v) => Self::String(v.clone()),
            VariableValue::Multi(values) => {
                Self::Array(values.iter().cloned().map(Self::String).collect())
            }
        }
    }
}

const fn is_false(value: &bool) -> bool {
    !*value
}

/// One selectable option of a variable, also used for the current selection.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableOption {
    /// Display text.
    #[serde(default)]
    pub text: VariableValue,

    /// Interpolated value.
    #[serde(default)]
    pub value: VariableValue,

    /// Whether the option is part of the current selection.
    #[serde(default)]
    pub selected: bool,

    /// Marks the synthetic "None" option.
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_none: bool,
}

impl VariableOption {
    /// Creates an unselected option.
    #[must_use]
    pub fn new(text: impl Into<VariableValue>, value: impl Into<VariableValue>) -> Self {
        Self {
            text: text.into(),
            value: value.into(),
            selected: false,
            is_none: false,
        }
    }

    /// Creates an option whose text and value are the same string.
    #[must_use]
    pub fn same(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new(text.clone(), text)
    }

    /// The "All" option.
    #[must_use]
    pub fn all() -> Self {
        Self::new(ALL_VARIABLE_TEXT, ALL_VARIABLE_VALUE)
    }

    /// The "None" option produced when a refresh yields nothing.
    #[must_use]
    pub fn none() -> Self {
        Self {
            is_none: true,
            ..Self::new(NONE_VARIABLE_TEXT, NONE_VARIABLE_VALUE)
        }
    }

    /// Marks the option as selected.
    #[must_use]
    pub fn selected(mut self) -> Self {
        self.selected = true;
        self
    }

    /// Returns true if this is the "All" option.
    #[must_use]
    pub fn is_all(&self) -> bool {
        self.value.is_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_value_deserializes_string_or_list() {
        let single: VariableValue = serde_json::from_str("\"a\"").unwrap_or_default();
        let multi: VariableValue = serde_json::from_str("[\"a\",\"b\"]").unwrap_or_default();
        assert_eq!(single, VariableValue::from("a"));
        assert_eq!(multi, VariableValue::from(vec!["a", "b"]));
    }

    #[test]
    fn test_is_all() {
        assert!(VariableValue::from(ALL_VARIABLE_VALUE).is_all());
        assert!(VariableValue::from(vec![ALL_VARIABLE_VALUE, "x"]).is_all());
        assert!(!VariableValue::from(vec!["x", ALL_VARIABLE_VALUE]).is_all());
        assert!(!VariableValue::from("x").is_all());
    }

    #[test]
    fn test_normalized() {
        assert_eq!(VariableValue::Multi(vec![]).normalized(), None);
        assert_eq!(
            VariableValue::from(vec!["a"]).normalized(),
            Some(VariableValue::from("a"))
        );
        assert_eq!(
            VariableValue::from(vec!["a", "b"]).normalized(),
            Some(VariableValue::from(vec!["a", "b"]))
        );
    }

    #[test]
    fn test_none_option_flagged() {
        let none = VariableOption::none();
        assert!(none.is_none);
        assert_eq!(none.value, VariableValue::from(""));
        let json = serde_json::to_string(&VariableOption::same("a")).unwrap_or_default();
        assert!(!json.contains("isNone"));
    }
}
