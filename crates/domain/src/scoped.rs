//! Scoped variables: bindings valid for a single interpolation call.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One scoped binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopedVar {
    /// Display text.
    #[serde(default)]
    pub text: Value,

    /// Interpolated value; may be structured and addressed with a field path.
    #[serde(default)]
    pub value: Value,

    /// Excludes the binding from `queryparam` rendering.
    #[serde(default)]
    pub skip_url_sync: bool,
}

impl ScopedVar {
    /// Creates a binding with text and value.
    #[must_use]
    pub fn new(text: impl Into<Value>, value: impl Into<Value>) -> Self {
        Self {
            text: text.into(),
            value: value.into(),
            skip_url_sync: false,
        }
    }

    /// Creates a binding whose text and value are equal.
    #[must_use]
    pub fn value(value: impl Into<Value>) -> Self {
        let value = value.into();
        Self::new(value.clone(), value)
    }
}

/// Ordered name to binding map; takes precedence over registry values.
pub type ScopedVars = IndexMap<String, ScopedVar>;

/// Result of looking a name up in scope or registry.
///
/// Keeps "not bound" apart from "bound to null".
#[derive(Debug, Clone, PartialEq)]
pub enum ScopedLookup {
    /// No binding with that name.
    Absent,
    /// A binding exists and its value is null.
    Null,
    /// A binding with a value.
    Value(Value),
}

impl ScopedLookup {
    /// Wraps a JSON value, mapping `null` to [`ScopedLookup::Null`].
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        if value.is_null() {
            Self::Null
        } else {
            Self::Value(value)
        }
    }

    /// Returns true unless the lookup is [`ScopedLookup::Absent`].
    #[must_use]
    pub const fn is_present(&self) -> bool {
        !matches!(self, Self::Absent)
    }

    /// Returns the value, if one is bound.
    #[must_use]
    pub const fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }
}
