//! Templating session
//!
//! A [`TemplatingSession`] owns the variable registry of one dashboard together
//! with the ports it talks to. Independent sessions share nothing, so several
//! dashboards can be open side by side.
//!
//! The session is the only place that executes what adapters describe: it
//! refreshes options, applies selections, cascades to dependent variables and
//! keeps the URL in sync.

mod refresh;
mod transaction;
mod url_sync;

use std::sync::{Arc, LazyLock};

use regex::Regex;
use stencil_domain::{
    AdHocFilter, DomainError, EngineSettings, PersistedVariable, RequestIdGenerator, ScopedVars,
    TransactionStatus, VariableModel, VariableType, generate_id,
};
use tracing::{debug, info};

use crate::adapters::variable_adapter;
use crate::error::{ApplicationError, ApplicationResult};
use crate::ports::{Clock, DashboardEvents, DataSourceRegistry, LocationService};
use crate::store::{Store, TemplatingAction, TemplatingState, VariableProp};
use crate::variable_resolver::{FieldPathCache, Interpolator, ReplaceFormat, get_variable_name};

pub use transaction::InitOptions;
pub use url_sync::{TemplateVarChange, TemplateVarChanges, find_template_var_changes};

#[allow(clippy::expect_used)]
static VARIABLE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\w+$").expect("valid regex"));

/// Checks a user-chosen variable name.
///
/// # Errors
///
/// Returns [`DomainError::InvalidVariableName`] for empty names, names with
/// characters other than letters, digits and `_`, and names starting with `__`,
/// which are reserved for built-ins.
pub fn validate_variable_name(name: &str) -> Result<(), DomainError> {
    if name.starts_with("__") {
        return Err(DomainError::InvalidVariableName(format!(
            "{name}: names starting with __ are reserved"
        )));
    }
    if !VARIABLE_NAME.is_match(name) {
        return Err(DomainError::InvalidVariableName(format!(
            "{name}: only letters, digits and _ are allowed"
        )));
    }
    Ok(())
}

/// External systems a session talks to.
#[derive(Clone)]
pub struct SessionPorts {
    /// Data source lookup.
    pub datasources: Arc<dyn DataSourceRegistry>,
    /// The URL query.
    pub location: Arc<dyn LocationService>,
    /// Dashboard refreshes and notifications.
    pub events: Arc<dyn DashboardEvents>,
    /// Wall clock for relative time ranges.
    pub clock: Arc<dyn Clock>,
}

/// The templating state of one open dashboard.
pub struct TemplatingSession {
    id: String,
    store: Store,
    ports: SessionPorts,
    settings: Arc<EngineSettings>,
    field_paths: Arc<FieldPathCache>,
    request_ids: RequestIdGenerator,
}

impl std::fmt::Debug for TemplatingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplatingSession")
            .field("id", &self.id)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl TemplatingSession {
    /// Creates an empty session.
    #[must_use]
    pub fn new(ports: SessionPorts, settings: EngineSettings) -> Self {
        let id = generate_id();
        debug!(session = %id, "templating session created");
        Self {
            id,
            store: Store::new(),
            ports,
            settings: Arc::new(settings),
            field_paths: Arc::new(FieldPathCache::new()),
            request_ids: RequestIdGenerator::default(),
        }
    }

    /// Session id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Engine settings.
    #[must_use]
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// The underlying store.
    #[must_use]
    pub const fn store(&self) -> &Store {
        &self.store
    }

    /// Drops every variable and cancels a running transaction.
    pub fn teardown(&self) {
        info!(session = %self.id, "tearing down templating session");
        self.store.dispatch(TemplatingAction::TransactionCleanup);
    }

    /// Status of the current transaction.
    #[must_use]
    pub fn transaction_status(&self) -> TransactionStatus {
        self.store.read(|state| state.transaction.status)
    }

    /// Returns true once a registry edit happened after loading completed.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.store.read(|state| state.transaction.is_dirty)
    }

    /// Every variable, ordered by index.
    #[must_use]
    pub fn variables(&self) -> Vec<VariableModel> {
        self.store.variables()
    }

    /// A variable by name.
    #[must_use]
    pub fn variable(&self, name: &str) -> Option<VariableModel> {
        self.store.read(|state| state.variable_by_name(name).cloned())
    }

    fn with_interpolator<R>(&self, f: impl FnOnce(&Interpolator<'_>) -> R) -> R {
        self.store.read(|state| {
            f(&Interpolator::new(
                &state.variables,
                &state.builtins,
                &self.settings,
                &self.field_paths,
            ))
        })
    }

    /// Replaces every variable reference in `target`.
    #[must_use]
    pub fn replace(
        &self,
        target: Option<&str>,
        scoped_vars: Option<&ScopedVars>,
        format: Option<&ReplaceFormat>,
    ) -> String {
        self.with_interpolator(|interpolator| interpolator.replace(target, scoped_vars, format))
    }

    /// Returns the name of the first variable referenced in `expression`.
    #[must_use]
    pub fn get_variable_name(&self, expression: &str) -> Option<String> {
        get_variable_name(expression)
    }

    /// Returns true if `expression` references a known variable.
    #[must_use]
    pub fn variable_exists(&self, expression: &str) -> bool {
        self.with_interpolator(|interpolator| interpolator.variable_exists(expression))
    }

    /// Returns true if `target` references a known variable.
    #[must_use]
    pub fn contains_template(&self, target: &str) -> bool {
        self.with_interpolator(|interpolator| interpolator.contains_template(target))
    }

    /// Ad-hoc filters that apply to the named data source.
    #[must_use]
    pub fn get_adhoc_filters(&self, datasource_name: &str) -> Vec<AdHocFilter> {
        let Some(settings) = self
            .ports
            .datasources
            .get_instance_settings(Some(datasource_name))
        else {
            return Vec::new();
        };
        self.with_interpolator(|interpolator| {
            interpolator.get_adhoc_filters(&settings, datasource_name)
        })
    }

    /// Persisted form of every variable, ordered by index.
    #[must_use]
    pub fn get_save_models(&self, save_current_as_default: bool) -> Vec<PersistedVariable> {
        self.variables()
            .iter()
            .filter(|v| v.variable_type() != VariableType::System)
            .map(|v| variable_adapter(v.variable_type()).get_save_model(v, save_current_as_default))
            .collect()
    }

    fn require(&self, id: &str) -> ApplicationResult<VariableModel> {
        self.store
            .variable(id)
            .ok_or_else(|| ApplicationError::VariableNotFound(id.to_string()))
    }

    fn name_taken(state: &TemplatingState, name: &str, except: Option<&str>) -> bool {
        state
            .variables
            .values()
            .any(|v| v.name == name && Some(v.id.as_str()) != except)
    }

    /// Adds a variable at the end of the registry; returns its id.
    ///
    /// # Errors
    ///
    /// Fails if the name is invalid or already used.
    pub fn add_variable(&self, mut variable: VariableModel) -> ApplicationResult<String> {
        validate_variable_name(&variable.name)?;
        let duplicate = self.store.read(|state| {
            Self::name_taken(state, &variable.name, None) || state.variables.contains_key(&variable.id)
        });
        if duplicate {
            return Err(ApplicationError::DuplicateVariable(variable.name));
        }
        if variable.id.is_empty() {
            variable.id.clone_from(&variable.name);
        }
        variable.index = self.store.read(TemplatingState::next_variable_index);
        let id = variable.id.clone();
        self.store.dispatch(TemplatingAction::AddVariable(variable));
        Ok(id)
    }

    /// Removes a variable and renumbers the rest.
    ///
    /// # Errors
    ///
    /// Fails if no variable has this id.
    pub fn remove_variable(&self, id: &str) -> ApplicationResult<()> {
        self.require(id)?;
        self.store.dispatch(TemplatingAction::RemoveVariable {
            id: id.to_string(),
            reindex: true,
        });
        Ok(())
    }

    /// Copies a variable as `copy_of_<name>`; returns the id of the copy.
    ///
    /// The copy takes its name as id unless a renamed variable already holds
    /// that id, in which case a fresh one is generated.
    ///
    /// # Errors
    ///
    /// Fails if no variable has this id or the copy's name is taken.
    pub fn duplicate_variable(&self, id: &str) -> ApplicationResult<String> {
        let original = self.require(id)?;
        let name = format!("copy_of_{}", original.name);
        let (name_taken, id_taken) = self.store.read(|state| {
            (
                Self::name_taken(state, &name, None),
                state.variables.contains_key(&name),
            )
        });
        if name_taken {
            return Err(ApplicationError::DuplicateVariable(name));
        }
        let new_id = if id_taken { generate_id() } else { name };
        self.store.dispatch(TemplatingAction::DuplicateVariable {
            id: id.to_string(),
            new_id: Some(new_id.clone()),
        });
        Ok(new_id)
    }

    /// Moves a variable to another position.
    ///
    /// # Errors
    ///
    /// Fails if no variable has this id.
    pub fn change_variable_order(&self, id: &str, to: usize) -> ApplicationResult<()> {
        let variable = self.require(id)?;
        let last = self.store.read(|state| state.variables.len().saturating_sub(1));
        self.store.dispatch(TemplatingAction::ChangeVariableOrder {
            id: id.to_string(),
            from: variable.index,
            to: to.min(last),
        });
        Ok(())
    }

    /// Edits one property of a variable.
    ///
    /// # Errors
    ///
    /// Fails if no variable has this id.
    pub fn change_variable_prop(&self, id: &str, prop: VariableProp) -> ApplicationResult<()> {
        self.require(id)?;
        self.store.dispatch(TemplatingAction::ChangeVariableProp {
            id: id.to_string(),
            prop,
        });
        Ok(())
    }

    /// Renames a variable.
    ///
    /// # Errors
    ///
    /// Fails if the variable is missing, or the name is invalid or taken.
    pub fn change_variable_name(&self, id: &str, name: &str) -> ApplicationResult<()> {
        self.require(id)?;
        validate_variable_name(name)?;
        if self.store.read(|state| Self::name_taken(state, name, Some(id))) {
            return Err(ApplicationError::DuplicateVariable(name.to_string()));
        }
        self.store.dispatch(TemplatingAction::ChangeVariableName {
            id: id.to_string(),
            name: name.to_string(),
        });
        Ok(())
    }

    /// Resets a variable to another kind.
    ///
    /// # Errors
    ///
    /// Fails if no variable has this id.
    pub fn change_variable_type(
        &self,
        id: &str,
        variable_type: VariableType,
    ) -> ApplicationResult<()> {
        self.require(id)?;
        self.store.dispatch(TemplatingAction::ChangeVariableType {
            id: id.to_string(),
            variable_type,
        });
        Ok(())
    }
}
