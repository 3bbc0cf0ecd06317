//! Variable adapter table
//!
//! Every variable kind has one [`VariableAdapter`]: how its options are derived,
//! how it reads a URL value, what it persists and which other variables it
//! depends on. [`variable_adapter`] selects the adapter with a single `match` on
//! the kind discriminant.
//!
//! Adapters describe changes; the session applies them to the store.

mod adhoc;
mod constant;
mod custom;
mod datasource;
mod interval;
mod option_regex;
mod query;
mod selection;
mod system;
mod textbox;

use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use stencil_domain::{
    AdHocFilter, EngineSettings, PersistedVariable, TimeRange, VariableKind, VariableModel,
    VariableOption, VariableType, VariableValue,
};

use crate::error::{ApplicationError, ApplicationResult};
use crate::ports::DataSourceRegistry;
use crate::variable_resolver::{BuiltinVariables, FieldPathCache, Interpolator};

pub use adhoc::AdHocVariableAdapter;
pub use constant::ConstantVariableAdapter;
pub use custom::{CustomVariableAdapter, create_custom_options};
pub use datasource::{DataSourceVariableAdapter, create_datasource_options};
pub use interval::{IntervalVariableAdapter, create_interval_options};
pub use option_regex::{OptionRegex, metric_names_to_variable_values};
pub use query::QueryVariableAdapter;
pub use selection::{
    fix_selected_inconsistency, option_from_url, set_current_variable_value,
    validate_variable_selection_state,
};
pub use system::SystemVariableAdapter;
pub use textbox::TextBoxVariableAdapter;

/// A change to the kind-specific state of a variable, handled by its adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariableEvent {
    /// Appends an ad-hoc filter.
    AddFilter(AdHocFilter),
    /// Removes the ad-hoc filter at an index.
    RemoveFilter(usize),
    /// Replaces the ad-hoc filter at an index.
    ChangeFilter {
        /// Position of the filter.
        index: usize,
        /// The new filter.
        filter: AdHocFilter,
    },
    /// Replaces every ad-hoc filter.
    SetFilters(Vec<AdHocFilter>),
}

/// How the current value is chosen once new options are in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionPolicy {
    /// Keep the current value if it is still offered, else the default, else the first option.
    Validate {
        /// Text of the option to fall back to.
        default_value: Option<VariableValue>,
    },
    /// Select the first option.
    First,
    /// Leave the current value untouched.
    Keep,
}

/// Result of an options refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionsUpdate {
    /// The new option list.
    pub options: Vec<VariableOption>,
    /// How to pick the current value afterwards.
    pub selection: SelectionPolicy,
    /// Automatic interval computed for an interval variable.
    pub auto_interval: Option<String>,
}

impl OptionsUpdate {
    /// An update that validates the current value against `options`.
    #[must_use]
    pub const fn validated(options: Vec<VariableOption>) -> Self {
        Self {
            options,
            selection: SelectionPolicy::Validate {
                default_value: None,
            },
            auto_interval: None,
        }
    }
}

/// What applying a URL value to a variable involves.
#[derive(Debug, Clone, PartialEq)]
pub enum UrlValueChange {
    /// Select the option matching the URL value, refreshing options first if asked.
    SelectOption {
        /// Refresh the options before matching.
        refresh: bool,
    },
    /// Replace the kind settings, then select the matching option.
    ReplaceKind(VariableKind),
    /// Replace the ad-hoc filters.
    Filters(Vec<AdHocFilter>),
}

/// Everything an adapter may read while refreshing options.
///
/// Holds a snapshot of the registry taken when the refresh started, so the
/// refresh never holds the store lock across an await.
pub struct UpdateContext {
    /// Registry snapshot.
    pub variables: IndexMap<String, VariableModel>,
    /// Built-ins snapshot.
    pub builtins: BuiltinVariables,
    /// Engine settings.
    pub settings: Arc<EngineSettings>,
    /// Shared field path cache.
    pub field_paths: Arc<FieldPathCache>,
    /// Data sources.
    pub datasources: Arc<dyn DataSourceRegistry>,
    /// Text typed into the picker, if any.
    pub search_filter: Option<String>,
}

impl UpdateContext {
    /// Returns an interpolator over the snapshot.
    #[must_use]
    pub fn interpolator(&self) -> Interpolator<'_> {
        Interpolator::new(
            &self.variables,
            &self.builtins,
            &self.settings,
            &self.field_paths,
        )
    }

    /// Returns the dashboard time range, if set.
    #[must_use]
    pub const fn time_range(&self) -> Option<&TimeRange> {
        self.builtins.time_range()
    }
}

/// Behavior of one variable kind.
#[async_trait]
pub trait VariableAdapter: Send + Sync {
    /// The kind this adapter handles.
    fn variable_type(&self) -> VariableType;

    /// Display name of the kind.
    fn name(&self) -> &'static str;

    /// One-line description of the kind.
    fn description(&self) -> &'static str;

    /// Default kind settings for a new variable.
    fn initial_state(&self) -> VariableKind {
        VariableKind::initial(self.variable_type())
    }

    /// Applies a kind-specific event.
    ///
    /// # Errors
    ///
    /// Returns [`ApplicationError::Unsupported`] for kinds without events.
    fn reduce(&self, _variable: &mut VariableModel, _event: VariableEvent) -> ApplicationResult<()> {
        Err(ApplicationError::Unsupported {
            kind: self.variable_type().as_str(),
            operation: "reduce",
        })
    }

    /// Returns true if `variable` references `candidate`.
    fn depends_on(&self, _variable: &VariableModel, _candidate: &VariableModel) -> bool {
        false
    }

    /// Derives a fresh option list.
    ///
    /// # Errors
    ///
    /// Returns an error if the options cannot be fetched or derived.
    async fn update_options(
        &self,
        variable: &VariableModel,
        ctx: &UpdateContext,
    ) -> ApplicationResult<OptionsUpdate>;

    /// Describes how a URL value is applied.
    fn value_from_url(&self, variable: &VariableModel, _url_value: &VariableValue) -> UrlValueChange {
        UrlValueChange::SelectOption {
            refresh: variable
                .refresh()
                .is_some_and(|r| r != stencil_domain::VariableRefresh::Never),
        }
    }

    /// Builds the persisted form.
    fn get_save_model(
        &self,
        variable: &VariableModel,
        _save_current_as_default: bool,
    ) -> PersistedVariable {
        PersistedVariable::from(variable)
    }

    /// Returns the value written to the URL.
    fn get_value_for_url(&self, variable: &VariableModel) -> VariableValue {
        variable.current.value.clone()
    }
}

/// Returns the adapter for a kind.
#[must_use]
pub fn variable_adapter(variable_type: VariableType) -> &'static dyn VariableAdapter {
    match variable_type {
        VariableType::Query => &QueryVariableAdapter,
        VariableType::Custom => &CustomVariableAdapter,
        VariableType::Constant => &ConstantVariableAdapter,
        VariableType::Interval => &IntervalVariableAdapter,
        VariableType::TextBox => &TextBoxVariableAdapter,
        VariableType::DataSource => &DataSourceVariableAdapter,
        VariableType::AdHoc => &AdHocVariableAdapter,
        VariableType::System => &SystemVariableAdapter,
    }
}

/// A kind offered to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariableTypeInfo {
    /// Kind discriminant.
    pub variable_type: VariableType,
    /// Display name.
    pub name: &'static str,
    /// One-line description.
    pub description: &'static str,
}

/// Lists the kinds users can create; the system kind is excluded.
#[must_use]
pub fn get_variable_types() -> Vec<VariableTypeInfo> {
    VariableType::ALL
        .into_iter()
        .filter(|ty| *ty != VariableType::System)
        .map(|ty| {
            let adapter = variable_adapter(ty);
            VariableTypeInfo {
                variable_type: ty,
                name: adapter.name(),
                description: adapter.description(),
            }
        })
        .collect()
}

/// Prepends the "All" option when the variable offers one.
pub(crate) fn with_all_option(
    variable: &VariableModel,
    mut options: Vec<VariableOption>,
) -> Vec<VariableOption> {
    if variable.include_all() {
        options.insert(0, VariableOption::all());
    }
    options
}

/// URL value of option-list kinds: `All` while the all sentinel is selected.
pub(crate) fn url_value_for_options(variable: &VariableModel) -> VariableValue {
    if variable.is_all_selected() {
        VariableValue::Single(stencil_domain::ALL_VARIABLE_TEXT.to_string())
    } else {
        variable.current.value.clone()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_every_kind_has_its_adapter() {
        for ty in VariableType::ALL {
            assert_eq!(variable_adapter(ty).variable_type(), ty);
        }
    }

    #[test]
    fn test_variable_types_exclude_system() {
        let types: Vec<_> = get_variable_types()
            .into_iter()
            .map(|info| info.variable_type)
            .collect();
        assert_eq!(types.len(), 7);
        assert!(!types.contains(&VariableType::System));
        assert_eq!(types[0], VariableType::Query);
    }

    #[test]
    fn test_reduce_unsupported_outside_adhoc() {
        let mut variable = VariableModel::new("c", VariableKind::initial(VariableType::Custom));
        let result = variable_adapter(VariableType::Custom)
            .reduce(&mut variable, VariableEvent::SetFilters(vec![]));
        assert!(matches!(result, Err(ApplicationError::Unsupported { .. })));
    }
}
