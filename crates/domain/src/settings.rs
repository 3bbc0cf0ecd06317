//! Engine settings.

use serde::{Deserialize, Serialize};

/// Tunables of the templating engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Format applied when a reference names none.
    pub default_format: String,

    /// Maximum nesting of recursive interpolation, e.g. custom all values.
    pub max_interpolation_depth: usize,

    /// Prefix of variable parameters in the URL query.
    pub url_param_prefix: String,

    /// Longest URL query the location service accepts.
    pub max_url_length: usize,

    /// Time zone for `date` formatting; `utc` or `browser`.
    pub timezone: String,

    /// Number of steps the time range is divided into for `$__interval`.
    pub interval_resolution: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            default_format: "glob".to_string(),
            max_interpolation_depth: 8,
            url_param_prefix: "var-".to_string(),
            max_url_length: 8_192,
            timezone: "utc".to_string(),
            interval_resolution: 1_000,
        }
    }
}

impl EngineSettings {
    /// Returns the URL parameter name of a variable.
    #[must_use]
    pub fn url_param(&self, name: &str) -> String {
        format!("{}{name}", self.url_param_prefix)
    }

    /// Returns the variable name of a URL parameter, if it carries the prefix.
    #[must_use]
    pub fn variable_name_of<'a>(&self, param: &'a str) -> Option<&'a str> {
        param.strip_prefix(self.url_param_prefix.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings: EngineSettings =
            serde_json::from_str(r#"{"max_url_length": 100}"#).unwrap();
        assert_eq!(settings.max_url_length, 100);
        assert_eq!(settings.default_format, "glob");
        assert_eq!(settings.url_param_prefix, "var-");
    }

    #[test]
    fn test_url_param_mapping() {
        let settings = EngineSettings::default();
        assert_eq!(settings.url_param("host"), "var-host");
        assert_eq!(settings.variable_name_of("var-host"), Some("host"));
        assert_eq!(settings.variable_name_of("from"), None);
    }
}
