//! Options refresh, selection and the cascade to dependent variables.

use std::sync::Arc;

use futures::FutureExt;
use futures::future::{BoxFuture, join_all};
use stencil_domain::{
    AdHocFilter, AsyncRequestAction, VariableKind, VariableOption, VariableRefresh, VariableValue,
};
use tracing::{debug, error, warn};

use super::TemplatingSession;
use crate::adapters::{
    SelectionPolicy, UpdateContext, VariableEvent, option_from_url, validate_variable_selection_state,
    variable_adapter,
};
use crate::error::{ApplicationError, ApplicationResult};
use crate::graph::DependencyGraph;
use crate::ports::{Notification, UrlQueryUpdate, VariablesChanged};
use crate::store::TemplatingAction;

const REFRESH_FAILED_TITLE: &str = "Template variable service failed";

impl TemplatingSession {
    pub(super) fn update_context(&self, search_filter: Option<String>) -> UpdateContext {
        self.store.read(|state| UpdateContext {
            variables: state.variables.clone(),
            builtins: state.builtins.clone(),
            settings: Arc::clone(&self.settings),
            field_paths: Arc::clone(&self.field_paths),
            datasources: Arc::clone(&self.ports.datasources),
            search_filter,
        })
    }

    pub(super) fn generation(&self) -> u64 {
        self.store.read(|state| state.generation)
    }

    /// Re-derives the options of a variable and re-validates its selection.
    ///
    /// A failed fetch leaves the variable in the error state and raises a
    /// notification; it is not returned as an error.
    ///
    /// # Errors
    ///
    /// Fails if no variable has this id.
    pub async fn update_options(
        &self,
        id: &str,
        search_filter: Option<String>,
    ) -> ApplicationResult<()> {
        match self.refresh_variable(id, search_filter).await {
            Ok(_) | Err(ApplicationError::Cancelled) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Refreshes one variable; returns true if its options changed.
    ///
    /// Returns [`ApplicationError::Cancelled`] if the registry was cleaned up
    /// while the fetch was in flight.
    pub(super) async fn refresh_variable(
        &self,
        id: &str,
        search_filter: Option<String>,
    ) -> ApplicationResult<bool> {
        let variable = self.require(id)?;
        let identifier = variable.identifier();
        let generation = self.generation();
        let request_id = self.request_ids.next_id();

        debug!(variable = %variable.name, ?request_id, "refreshing options");
        self.store
            .dispatch(TemplatingAction::VariableStateFetching(id.to_string()));
        self.store
            .dispatch(TemplatingAction::OptionsRequest(AsyncRequestAction::Pending {
                request_id,
                arg: identifier.clone(),
            }));

        let ctx = self.update_context(search_filter);
        let result = variable_adapter(variable.variable_type())
            .update_options(&variable, &ctx)
            .await;

        if self.generation() != generation {
            debug!(variable = %variable.name, "discarding refresh of a cleaned up registry");
            return Err(ApplicationError::Cancelled);
        }

        match result {
            Ok(update) => {
                let fulfilled = self.store.dispatch(TemplatingAction::OptionsRequest(
                    AsyncRequestAction::Fulfilled {
                        request_id,
                        arg: identifier,
                        payload: update.options.clone(),
                    },
                ));
                if !fulfilled {
                    warn!(variable = %variable.name, ?request_id, "discarding stale options response");
                    return Ok(false);
                }

                let changed = options_differ(&variable.options, &update.options);
                self.store.dispatch(TemplatingAction::SetOptions {
                    id: id.to_string(),
                    options: update.options,
                });
                if let Some(interval) = update.auto_interval {
                    self.store.dispatch(TemplatingAction::SetAutoInterval {
                        name: variable.name.clone(),
                        interval,
                    });
                }

                let selection = match update.selection {
                    SelectionPolicy::Validate { default_value } => {
                        let refreshed = self.require(id)?;
                        Some(validate_variable_selection_state(
                            &refreshed,
                            default_value.as_ref(),
                        ))
                    }
                    SelectionPolicy::First => Some(
                        self.require(id)?
                            .options
                            .first()
                            .cloned()
                            .unwrap_or_default(),
                    ),
                    SelectionPolicy::Keep => None,
                };
                if let Some(option) = selection {
                    self.set_value(id, option, false).await?;
                }

                self.store
                    .dispatch(TemplatingAction::VariableStateCompleted(id.to_string()));
                Ok(changed)
            }
            Err(e) => {
                let serialized = e.to_serialized();
                let rejected = self.store.dispatch(TemplatingAction::OptionsRequest(
                    AsyncRequestAction::Rejected {
                        request_id,
                        arg: identifier,
                        error: serialized.clone(),
                    },
                ));
                if !rejected {
                    warn!(variable = %variable.name, ?request_id, "discarding stale options failure");
                    return Ok(false);
                }
                error!(variable = %variable.name, error = %e, "variable options refresh failed");
                self.store.dispatch(TemplatingAction::VariableStateFailed {
                    id: id.to_string(),
                    error: serialized,
                });
                self.ports
                    .events
                    .notify(Notification::error(REFRESH_FAILED_TITLE, e.to_string()));
                Ok(false)
            }
        }
    }

    /// Makes `option` the current value and propagates the change.
    pub(super) async fn set_value(
        &self,
        id: &str,
        option: VariableOption,
        emit_changes: bool,
    ) -> ApplicationResult<()> {
        self.require(id)?;
        self.store.dispatch(TemplatingAction::SetCurrentValue {
            id: id.to_string(),
            current: option,
        });
        self.variable_updated(id, emit_changes).await
    }

    /// Selects `option` as the user would in a picker.
    ///
    /// Dependent variables are refreshed, the URL is updated and the dashboard
    /// is asked to refresh.
    ///
    /// # Errors
    ///
    /// Fails if no variable has this id.
    pub async fn set_option_as_current(
        &self,
        id: &str,
        option: VariableOption,
    ) -> ApplicationResult<()> {
        self.set_value(id, option, true).await
    }

    /// Selects the option matching `value` by text or value.
    ///
    /// # Errors
    ///
    /// Fails if no variable has this id.
    pub async fn select_value(&self, id: &str, value: VariableValue) -> ApplicationResult<()> {
        let variable = self.require(id)?;
        let option = option_from_url(&variable, &value);
        self.set_value(id, option, true).await
    }

    /// Refreshes the dependents of a changed variable.
    ///
    /// While a transaction is loading, dependents wait for their own turn and
    /// nothing cascades. With `emit_changes` the URL is synced and the dashboard
    /// asked to refresh.
    pub(super) fn variable_updated<'a>(
        &'a self,
        id: &'a str,
        emit_changes: bool,
    ) -> BoxFuture<'a, ApplicationResult<()>> {
        async move {
            let variable = self.require(id)?;
            let (fetching, dependents) = self.store.read(|state| {
                let graph = DependencyGraph::build(state.variables.values());
                let dependents: Vec<String> = graph
                    .optimized_dependents_of(id)
                    .into_iter()
                    .filter(|d| !state.pending_refresh.contains(d))
                    .collect();
                (state.transaction.is_fetching(), dependents)
            });

            if fetching {
                if variable.refresh() == Some(VariableRefresh::Never) {
                    self.store
                        .dispatch(TemplatingAction::VariableStateCompleted(id.to_string()));
                }
                return Ok(());
            }

            if !dependents.is_empty() {
                debug!(variable = %variable.name, ?dependents, "refreshing dependent variables");
            }
            let results = join_all(dependents.iter().map(|d| self.refresh_variable(d, None))).await;
            for result in results {
                match result {
                    Ok(_) | Err(ApplicationError::Cancelled) => {}
                    Err(e) => return Err(e),
                }
            }

            if emit_changes {
                self.sync_url();
                self.ports.events.refresh_dashboard(&VariablesChanged {
                    refresh_all: matches!(variable.kind, VariableKind::AdHoc(_)),
                    variables: vec![variable.name.clone()],
                });
            }
            Ok(())
        }
        .boxed()
    }

    /// Writes every variable's URL value to the location.
    ///
    /// A storage failure is logged and notified; state is unaffected.
    pub(super) fn sync_url(&self) {
        let update: UrlQueryUpdate = self
            .get_variables_url_params()
            .into_iter()
            .map(|(key, value)| (key, Some(value)))
            .collect();
        if let Err(e) = self.ports.location.partial(&update, true) {
            error!(error = %e, "failed to update the URL");
            self.ports
                .events
                .notify(Notification::error("Failed to update the URL", e.to_string()));
        }
    }

    async fn apply_variable_event(&self, id: &str, event: VariableEvent) -> ApplicationResult<()> {
        let mut variable = self.require(id)?;
        variable_adapter(variable.variable_type()).reduce(&mut variable, event)?;
        self.store.dispatch(TemplatingAction::SetKind {
            id: id.to_string(),
            kind: variable.kind,
        });
        self.variable_updated(id, true).await
    }

    /// Appends a filter to an ad-hoc variable.
    ///
    /// # Errors
    ///
    /// Fails if the variable is missing or not an ad-hoc variable.
    pub async fn add_filter(&self, id: &str, filter: AdHocFilter) -> ApplicationResult<()> {
        self.apply_variable_event(id, VariableEvent::AddFilter(filter)).await
    }

    /// Removes the filter at `index` of an ad-hoc variable.
    ///
    /// # Errors
    ///
    /// Fails if the variable is missing or not an ad-hoc variable.
    pub async fn remove_filter(&self, id: &str, index: usize) -> ApplicationResult<()> {
        self.apply_variable_event(id, VariableEvent::RemoveFilter(index)).await
    }

    /// Replaces the filter at `index` of an ad-hoc variable.
    ///
    /// # Errors
    ///
    /// Fails if the variable is missing or not an ad-hoc variable.
    pub async fn change_filter(
        &self,
        id: &str,
        index: usize,
        filter: AdHocFilter,
    ) -> ApplicationResult<()> {
        self.apply_variable_event(id, VariableEvent::ChangeFilter { index, filter })
            .await
    }

    /// Replaces every filter of an ad-hoc variable.
    ///
    /// # Errors
    ///
    /// Fails if the variable is missing or not an ad-hoc variable.
    pub async fn set_filters(&self, id: &str, filters: Vec<AdHocFilter>) -> ApplicationResult<()> {
        self.apply_variable_event(id, VariableEvent::SetFilters(filters))
            .await
    }
}

/// Compares option lists by text and value; the `selected` flag is ignored.
fn options_differ(current: &[VariableOption], refreshed: &[VariableOption]) -> bool {
    current.len() != refreshed.len()
        || current
            .iter()
            .zip(refreshed)
            .any(|(a, b)| a.text != b.text || a.value != b.value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_options_differ_ignores_selection() {
        let stored = vec![VariableOption::same("us").selected(), VariableOption::same("eu")];
        let fresh = vec![VariableOption::same("us"), VariableOption::same("eu")];
        assert!(!options_differ(&stored, &fresh));
        assert!(options_differ(&stored, &fresh[..1]));
        assert!(options_differ(&stored, &[VariableOption::same("us"), VariableOption::same("ap")]));
    }
}
