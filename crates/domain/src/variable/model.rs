//! The variable model and its persisted form.

use serde::{Deserialize, Serialize};

use super::kind::{
    LoadingState, SelectionOptions, VariableHide, VariableKind, VariableRefresh, VariableType,
};
use super::value::{VariableOption, VariableValue};
use crate::async_request::SerializedError;

/// Identifies a variable by id and kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariableIdentifier {
    /// The variable id.
    pub id: String,
    /// The variable kind.
    pub variable_type: VariableType,
}

/// A template variable in the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableModel {
    /// Registry id; equal to the name unless the variable was duplicated.
    #[serde(default)]
    pub id: String,

    /// Name referenced from templates.
    pub name: String,

    /// Label shown instead of the name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Display mode.
    #[serde(default)]
    pub hide: VariableHide,

    /// Excludes the variable from the URL.
    #[serde(default)]
    pub skip_url_sync: bool,

    /// Current selection.
    #[serde(default)]
    pub current: VariableOption,

    /// Available options.
    #[serde(default)]
    pub options: Vec<VariableOption>,

    /// Position in the registry.
    #[serde(default)]
    pub index: usize,

    /// Whether the variable is shared across dashboards.
    #[serde(default)]
    pub global: bool,

    /// Loading state of the last refresh.
    #[serde(default)]
    pub state: LoadingState,

    /// Error of the last failed refresh.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<SerializedError>,

    /// Kind-specific settings.
    #[serde(flatten)]
    pub kind: VariableKind,
}

impl VariableModel {
    /// Creates a variable with default settings for its kind.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: VariableKind) -> Self {
        let name = name.into();
        Self {
            id: name.clone(),
            name,
            label: None,
            description: None,
            hide: VariableHide::DontHide,
            skip_url_sync: false,
            current: VariableOption::default(),
            options: Vec::new(),
            index: 0,
            global: false,
            state: LoadingState::NotStarted,
            error: None,
            kind,
        }
    }

    /// Builds a registry variable from a persisted one.
    #[must_use]
    pub fn from_persisted(persisted: PersistedVariable, index: usize, global: bool) -> Self {
        let id = persisted.name.clone();
        let mut kind = persisted.kind;
        if let VariableKind::TextBox(textbox) = &mut kind {
            textbox.original_query = Some(textbox.query.clone());
        }
        Self {
            id,
            name: persisted.name,
            label: persisted.label,
            description: persisted.description,
            hide: persisted.hide,
            skip_url_sync: persisted.skip_url_sync,
            current: persisted.current,
            options: persisted.options,
            index,
            global,
            state: LoadingState::NotStarted,
            error: None,
            kind,
        }
    }

    /// Sets the current selection.
    #[must_use]
    pub fn with_current(mut self, current: VariableOption) -> Self {
        self.current = current;
        self
    }

    /// Sets the options.
    #[must_use]
    pub fn with_options(mut self, options: Vec<VariableOption>) -> Self {
        self.options = options;
        self
    }

    /// Returns the kind discriminant.
    #[must_use]
    pub const fn variable_type(&self) -> VariableType {
        self.kind.variable_type()
    }

    /// Returns the identifier of this variable.
    #[must_use]
    pub fn identifier(&self) -> VariableIdentifier {
        VariableIdentifier {
            id: self.id.clone(),
            variable_type: self.variable_type(),
        }
    }

    /// Returns the refresh mode for kinds that refresh.
    #[must_use]
    pub const fn refresh(&self) -> Option<VariableRefresh> {
        self.kind.refresh()
    }

    /// Returns the multi-select settings for kinds that have them.
    #[must_use]
    pub const fn selection(&self) -> Option<&SelectionOptions> {
        self.kind.selection()
    }

    /// Returns true if several options may be selected.
    #[must_use]
    pub fn is_multi(&self) -> bool {
        self.selection().is_some_and(|s| s.multi)
    }

    /// Returns true if the kind offers an "All" option.
    #[must_use]
    pub fn include_all(&self) -> bool {
        self.selection().is_some_and(|s| s.include_all)
    }

    /// Returns the custom all value, if one is configured.
    #[must_use]
    pub fn all_value(&self) -> Option<&str> {
        self.selection()
            .and_then(|s| s.all_value.as_deref())
            .filter(|v| !v.is_empty())
    }

    /// Returns true if the current selection is the all sentinel.
    #[must_use]
    pub fn is_all_selected(&self) -> bool {
        self.current.value.is_all()
    }

    /// Returns true if the kind keeps a fixed option list.
    #[must_use]
    pub const fn has_fixed_options(&self) -> bool {
        matches!(
            self.kind,
            VariableKind::Query(_)
                | VariableKind::Custom(_)
                | VariableKind::DataSource(_)
                | VariableKind::Interval(_)
        )
    }

    /// Returns the current text as one string.
    #[must_use]
    pub fn current_text(&self) -> String {
        self.current.text.join(" + ")
    }
}

/// The persisted form of a variable: the model without runtime fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedVariable {
    /// Name referenced from templates.
    pub name: String,

    /// Label shown instead of the name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Display mode.
    #[serde(default)]
    pub hide: VariableHide,

    /// Excludes the variable from the URL.
    #[serde(default)]
    pub skip_url_sync: bool,

    /// Selection saved as default.
    #[serde(default)]
    pub current: VariableOption,

    /// Saved options; empty for kinds that recompute them on load.
    #[serde(default)]
    pub options: Vec<VariableOption>,

    /// Kind-specific settings.
    #[serde(flatten)]
    pub kind: VariableKind,
}

impl From<&VariableModel> for PersistedVariable {
    fn from(model: &VariableModel) -> Self {
        Self {
            name: model.name.clone(),
            label: model.label.clone(),
            description: model.description.clone(),
            hide: model.hide,
            skip_url_sync: model.skip_url_sync,
            current: model.current.clone(),
            options: model.options.clone(),
            kind: model.kind.clone(),
        }
    }
}

impl PersistedVariable {
    /// Returns the saved current value.
    #[must_use]
    pub const fn current_value(&self) -> &VariableValue {
        &self.current.value
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::variable::{CustomVariable, TextBoxVariable};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_persisted_round_trip_keeps_kind_fields() {
        let json = r#"{
            "type": "query",
            "name": "host",
            "query": "up",
            "datasource": {"uid": "prom"},
            "refresh": 2,
            "regex": "/web.*/",
            "multi": true,
            "includeAll": true,
            "current": {"text": "All", "value": "$__all"},
            "options": []
        }"#;
        let persisted: PersistedVariable = serde_json::from_str(json).unwrap();
        let model = VariableModel::from_persisted(persisted, 3, false);

        assert_eq!(model.id, "host");
        assert_eq!(model.index, 3);
        assert_eq!(model.refresh(), Some(VariableRefresh::OnTimeRangeChanged));
        assert!(model.is_multi());
        assert!(model.include_all());
        assert!(model.is_all_selected());
    }

    #[test]
    fn test_textbox_remembers_original_query() {
        let persisted = PersistedVariable::from(&VariableModel::new(
            "filter",
            VariableKind::TextBox(TextBoxVariable {
                query: "error".to_string(),
                original_query: None,
            }),
        ));
        let model = VariableModel::from_persisted(persisted, 0, false);
        let VariableKind::TextBox(textbox) = &model.kind else {
            panic!("expected textbox");
        };
        assert_eq!(textbox.original_query.as_deref(), Some("error"));
    }

    #[test]
    fn test_runtime_fields_not_persisted() {
        let mut model = VariableModel::new("env", VariableKind::Custom(CustomVariable::default()));
        model.index = 4;
        model.global = true;
        let json = serde_json::to_value(PersistedVariable::from(&model)).unwrap();
        assert!(json.get("index").is_none());
        assert!(json.get("global").is_none());
        assert!(json.get("state").is_none());
        assert!(json.get("id").is_none());
        assert_eq!(json["type"], "custom");
    }

    #[test]
    fn test_all_value_ignores_empty_string() {
        let mut custom = CustomVariable::default();
        custom.selection.all_value = Some(String::new());
        let model = VariableModel::new("env", VariableKind::Custom(custom));
        assert_eq!(model.all_value(), None);
    }
}
