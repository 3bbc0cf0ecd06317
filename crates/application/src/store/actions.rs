//! Actions accepted by the templating store.

use serde_json::Value;
use stencil_domain::{
    AsyncRequestAction, Dashboard, DataSourceRef, Interval, OrgInfo, SerializedError, TimeRange,
    UserInfo, VariableHide, VariableIdentifier, VariableKind, VariableModel, VariableOption,
    VariableRefresh, VariableSort, VariableType,
};

use crate::variable_resolver::DashboardInfo;

/// A single editable property of a variable.
#[derive(Debug, Clone, PartialEq)]
pub enum VariableProp {
    /// Display label.
    Label(Option<String>),
    /// Description.
    Description(Option<String>),
    /// Display mode.
    Hide(VariableHide),
    /// URL sync exclusion.
    SkipUrlSync(bool),
    /// The query; a string for every kind except structured query variables.
    Query(Value),
    /// Option filter regex of query and data source variables.
    Regex(String),
    /// Refresh mode.
    Refresh(VariableRefresh),
    /// Sort order of query results.
    Sort(VariableSort),
    /// Multi-select.
    Multi(bool),
    /// "All" option.
    IncludeAll(bool),
    /// Custom all value.
    AllValue(Option<String>),
    /// Data source of query and ad-hoc variables.
    Datasource(Option<DataSourceRef>),
    /// Human-readable query definition.
    Definition(String),
    /// Automatic interval option.
    Auto(bool),
    /// Steps of the automatic interval.
    AutoCount(u32),
    /// Lower bound of the automatic interval.
    AutoMin(String),
}

/// Options refresh request lifecycle, keyed by variable.
pub type OptionsRequestAction = AsyncRequestAction<VariableIdentifier, Vec<VariableOption>>;

/// A state transition of the templating store.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplatingAction {
    /// Registers a variable, replacing one with the same id.
    AddVariable(VariableModel),
    /// Removes a variable; `reindex` renumbers the remaining ones.
    RemoveVariable {
        /// Variable id.
        id: String,
        /// Renumber the remaining variables.
        reindex: bool,
    },
    /// Moves a variable from one index to another.
    ChangeVariableOrder {
        /// Variable id.
        id: String,
        /// Old index.
        from: usize,
        /// New index.
        to: usize,
    },
    /// Copies a variable as `copy_of_<name>` at the next free index.
    DuplicateVariable {
        /// Source variable id.
        id: String,
        /// Id of the copy; defaults to its name.
        new_id: Option<String>,
    },
    /// Resets a variable to another kind, keeping id, name, label, description and index.
    ChangeVariableType {
        /// Variable id.
        id: String,
        /// The new kind.
        variable_type: VariableType,
    },
    /// Edits one property.
    ChangeVariableProp {
        /// Variable id.
        id: String,
        /// The new property value.
        prop: VariableProp,
    },
    /// Renames a variable; the id is kept.
    ChangeVariableName {
        /// Variable id.
        id: String,
        /// New name.
        name: String,
    },
    /// Sets the current selection and flags the matching options.
    SetCurrentValue {
        /// Variable id.
        id: String,
        /// New selection.
        current: VariableOption,
    },
    /// Replaces the options.
    SetOptions {
        /// Variable id.
        id: String,
        /// New options.
        options: Vec<VariableOption>,
    },
    /// Replaces the kind settings.
    SetKind {
        /// Variable id.
        id: String,
        /// New settings.
        kind: VariableKind,
    },
    /// A refresh of the variable started.
    VariableStateFetching(String),
    /// A refresh of the variable finished.
    VariableStateCompleted(String),
    /// A refresh of the variable failed.
    VariableStateFailed {
        /// Variable id.
        id: String,
        /// The failure.
        error: SerializedError,
    },
    /// Options request lifecycle.
    OptionsRequest(OptionsRequestAction),
    /// Starts a transaction.
    TransactionInit(String),
    /// Completes a transaction.
    TransactionComplete(String),
    /// Drops all variables and request state, and bumps the generation.
    TransactionCleanup,
    /// Keeps the loaded dashboard for restoring persisted defaults.
    SetDashboard(Dashboard),
    /// Sets the time range and derived interval.
    SetTimeRange {
        /// The range.
        range: TimeRange,
        /// The derived interval.
        interval: Option<Interval>,
    },
    /// Records the automatic interval of an interval variable.
    SetAutoInterval {
        /// Variable name.
        name: String,
        /// Interval text.
        interval: String,
    },
    /// Sets the `__dashboard` built-in.
    SetDashboardInfo(DashboardInfo),
    /// Sets the `__user` built-in.
    SetUser(UserInfo),
    /// Sets the `__org` built-in.
    SetOrg(OrgInfo),
    /// Marks variables whose refresh is already scheduled.
    MarkPendingRefresh(Vec<String>),
    /// Clears a scheduled refresh mark.
    ClearPendingRefresh(String),
}

impl TemplatingAction {
    /// Returns true for registry edits that make a completed dashboard dirty.
    #[must_use]
    pub const fn is_dirty_action(&self) -> bool {
        matches!(
            self,
            Self::AddVariable(_)
                | Self::RemoveVariable { .. }
                | Self::ChangeVariableProp { .. }
                | Self::ChangeVariableOrder { .. }
                | Self::DuplicateVariable { .. }
                | Self::ChangeVariableType { .. }
        )
    }
}
