//! Text box variables: free-form text.

use async_trait::async_trait;
use stencil_domain::{
    PersistedVariable, TextBoxVariable, VariableKind, VariableModel, VariableOption,
    VariableType, VariableValue,
};

use super::{OptionsUpdate, SelectionPolicy, UpdateContext, UrlValueChange, VariableAdapter};
use crate::error::{ApplicationError, ApplicationResult};

/// Adapter for `textbox` variables.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextBoxVariableAdapter;

#[async_trait]
impl VariableAdapter for TextBoxVariableAdapter {
    fn variable_type(&self) -> VariableType {
        VariableType::TextBox
    }

    fn name(&self) -> &'static str {
        "Text box"
    }

    fn description(&self) -> &'static str {
        "Define a textbox variable, where users can enter any arbitrary string"
    }

    async fn update_options(
        &self,
        variable: &VariableModel,
        _ctx: &UpdateContext,
    ) -> ApplicationResult<OptionsUpdate> {
        let VariableKind::TextBox(textbox) = &variable.kind else {
            return Err(ApplicationError::Unsupported {
                kind: variable.variable_type().as_str(),
                operation: "textbox options",
            });
        };
        Ok(OptionsUpdate {
            options: vec![VariableOption::same(textbox.query.trim())],
            selection: SelectionPolicy::First,
            auto_interval: None,
        })
    }

    fn value_from_url(&self, variable: &VariableModel, url_value: &VariableValue) -> UrlValueChange {
        let original_query = match &variable.kind {
            VariableKind::TextBox(textbox) => textbox.original_query.clone(),
            _ => None,
        };
        UrlValueChange::ReplaceKind(VariableKind::TextBox(TextBoxVariable {
            query: url_value.join(","),
            original_query,
        }))
    }

    fn get_save_model(&self, variable: &VariableModel, save_current_as_default: bool) -> PersistedVariable {
        let mut model = PersistedVariable::from(variable);
        let VariableKind::TextBox(textbox) = &variable.kind else {
            return model;
        };
        let unchanged = textbox
            .original_query
            .as_deref()
            .is_none_or(|original| original == textbox.query);
        if save_current_as_default || unchanged {
            return model;
        }
        let original = textbox.original_query.clone().unwrap_or_default();
        let current = VariableOption::same(original.clone());
        model.current = current.clone();
        model.options = vec![current];
        model.kind = VariableKind::TextBox(TextBoxVariable {
            query: original,
            original_query: None,
        });
        model
    }
}
