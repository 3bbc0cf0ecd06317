//! Two-way sync between current values and `var-<name>` URL parameters.

use futures::future::join_all;
use indexmap::IndexMap;
use stencil_domain::{
    EngineSettings, VariableKind, VariableModel, VariableType, VariableValue,
};
use tracing::debug;

use super::TemplatingSession;
use crate::adapters::{UrlValueChange, option_from_url, variable_adapter};
use crate::error::{ApplicationError, ApplicationResult};
use crate::ports::{UrlQueryMap, VariablesChanged};
use crate::store::TemplatingAction;

/// How a `var-` parameter differs between two URL states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateVarChange {
    /// The parameter has a new value.
    Changed(VariableValue),
    /// The parameter disappeared.
    Removed,
}

/// Changed `var-` parameters keyed by parameter name.
pub type TemplateVarChanges = IndexMap<String, TemplateVarChange>;

/// Diffs the variable parameters of two URL states.
///
/// Values are compared after normalization, so `[]` equals a missing key and
/// `["a"]` equals `"a"`. A parameter only present in `old` counts as removed,
/// unless its old value was an empty list. Returns `None` when nothing changed.
#[must_use]
pub fn find_template_var_changes(
    settings: &EngineSettings,
    new: &UrlQueryMap,
    old: &UrlQueryMap,
) -> Option<TemplateVarChanges> {
    let is_var = |key: &str| settings.variable_name_of(key).is_some();
    let mut changes = TemplateVarChanges::new();

    for (key, value) in new.iter().filter(|(k, _)| is_var(k.as_str())) {
        let previous = old.get(key).and_then(VariableValue::normalized);
        if value.normalized() != previous {
            changes.insert(key.clone(), TemplateVarChange::Changed(value.clone()));
        }
    }
    for (key, value) in old.iter().filter(|(k, _)| is_var(k.as_str())) {
        let empty_list = matches!(value, VariableValue::Multi(values) if values.is_empty());
        if !new.contains_key(key) && !empty_list {
            changes.insert(key.clone(), TemplateVarChange::Removed);
        }
    }

    (!changes.is_empty()).then_some(changes)
}

impl TemplatingSession {
    /// URL parameters of every variable that syncs to the URL.
    #[must_use]
    pub fn get_variables_url_params(&self) -> UrlQueryMap {
        self.variables()
            .iter()
            .filter(|v| !v.skip_url_sync && v.variable_type() != VariableType::System)
            .map(|v| {
                (
                    self.settings.url_param(&v.name),
                    variable_adapter(v.variable_type()).get_value_for_url(v),
                )
            })
            .collect()
    }

    /// Applies a URL value to a variable.
    pub(super) async fn set_value_from_url(
        &self,
        variable: &VariableModel,
        url_value: &VariableValue,
    ) -> ApplicationResult<()> {
        let id = variable.id.as_str();
        match variable_adapter(variable.variable_type()).value_from_url(variable, url_value) {
            UrlValueChange::SelectOption { refresh } => {
                let refresh = refresh
                    || (matches!(variable.kind, VariableKind::Custom(_)) && variable.options.is_empty());
                if refresh {
                    self.refresh_variable(id, None).await?;
                }
                let current = self.require(id)?;
                let option = option_from_url(&current, url_value);
                self.set_value(id, option, false).await
            }
            UrlValueChange::ReplaceKind(kind) => {
                self.store.dispatch(TemplatingAction::SetKind {
                    id: id.to_string(),
                    kind,
                });
                self.refresh_variable(id, None).await.map(|_| ())
            }
            UrlValueChange::Filters(filters) => {
                let mut kind = variable.kind.clone();
                if let VariableKind::AdHoc(adhoc) = &mut kind {
                    adhoc.filters = filters;
                }
                self.store.dispatch(TemplatingAction::SetKind {
                    id: id.to_string(),
                    kind,
                });
                self.variable_updated(id, true).await
            }
        }
    }

    /// Applies URL changes to the variables they name.
    ///
    /// Only variables whose URL value differs from the new one are touched. A
    /// removed parameter restores the value saved with the dashboard; ad-hoc
    /// variables lose their filters. Returns the names of updated variables.
    ///
    /// # Errors
    ///
    /// Fails if applying a value fails for a reason other than a fetch error.
    pub async fn template_vars_changed_in_url(
        &self,
        changes: &TemplateVarChanges,
    ) -> ApplicationResult<Vec<String>> {
        let saved = self.store.read(|state| state.dashboard.clone());
        let mut updates = Vec::new();

        for variable in self.variables() {
            let Some(change) = changes.get(&self.settings.url_param(&variable.name)) else {
                continue;
            };
            let target = match change {
                TemplateVarChange::Changed(value) => value.clone(),
                TemplateVarChange::Removed if matches!(variable.kind, VariableKind::AdHoc(_)) => {
                    VariableValue::Multi(Vec::new())
                }
                TemplateVarChange::Removed => {
                    match saved.as_ref().and_then(|d| d.variable(&variable.name)) {
                        Some(persisted) => persisted.current.value.clone(),
                        None => continue,
                    }
                }
            };
            let current = variable_adapter(variable.variable_type()).get_value_for_url(&variable);
            if current.normalized() == target.normalized() {
                continue;
            }
            updates.push((variable, target));
        }

        if updates.is_empty() {
            return Ok(Vec::new());
        }
        let names: Vec<String> = updates.iter().map(|(v, _)| v.name.clone()).collect();
        debug!(variables = ?names, "applying variable changes from the URL");

        let results = join_all(
            updates
                .iter()
                .map(|(variable, value)| self.set_value_from_url(variable, value)),
        )
        .await;
        for result in results {
            match result {
                Ok(()) | Err(ApplicationError::Cancelled) => {}
                Err(e) => return Err(e),
            }
        }

        self.ports.events.refresh_dashboard(&VariablesChanged {
            refresh_all: true,
            variables: names.clone(),
        });
        Ok(names)
    }

    /// Re-reads the location and applies what changed since `previous`.
    ///
    /// # Errors
    ///
    /// See [`Self::template_vars_changed_in_url`].
    pub async fn sync_from_url(&self, previous: &UrlQueryMap) -> ApplicationResult<Vec<String>> {
        let current = self.ports.location.get_search();
        match find_template_var_changes(&self.settings, &current, previous) {
            Some(changes) => self.template_vars_changed_in_url(&changes).await,
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn query(pairs: &[(&str, VariableValue)]) -> UrlQueryMap {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_changed_and_removed() {
        let settings = EngineSettings::default();
        let old = query(&[
            ("var-a", "1".into()),
            ("var-b", "x".into()),
            ("from", "now-1h".into()),
        ]);
        let new = query(&[("var-a", "2".into()), ("from", "now-6h".into())]);
        let changes = find_template_var_changes(&settings, &new, &old).unwrap();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes["var-a"], TemplateVarChange::Changed("2".into()));
        assert_eq!(changes["var-b"], TemplateVarChange::Removed);
    }

    #[test]
    fn test_normalized_values_equal() {
        let settings = EngineSettings::default();
        let old = query(&[("var-a", "1".into())]);
        let new = query(&[("var-a", vec!["1"].into())]);
        assert_eq!(find_template_var_changes(&settings, &new, &old), None);
    }

    #[test]
    fn test_empty_list_not_reported_removed() {
        let settings = EngineSettings::default();
        let old = query(&[("var-f", VariableValue::Multi(vec![]))]);
        assert_eq!(find_template_var_changes(&settings, &UrlQueryMap::new(), &old), None);
    }

    #[test]
    fn test_new_empty_list_equals_missing() {
        let settings = EngineSettings::default();
        let new = query(&[("var-f", VariableValue::Multi(vec![]))]);
        assert_eq!(find_template_var_changes(&settings, &new, &UrlQueryMap::new()), None);
    }
}
