//! The templating state held by one session.

use std::collections::HashSet;

use indexmap::IndexMap;
use stencil_domain::{
    AsyncRequestMap, Dashboard, LoadingState, TransactionState, VariableIdentifier,
    VariableModel, VariableOption,
};

use crate::variable_resolver::BuiltinVariables;

fn variable_key(identifier: &VariableIdentifier) -> String {
    identifier.id.clone()
}

/// Options request slots, one per variable id.
pub type OptionRequests = AsyncRequestMap<VariableIdentifier, String, Vec<VariableOption>>;

/// Registry, transaction and request state of a session.
#[derive(Debug)]
pub struct TemplatingState {
    /// Variables by id, kept in index order.
    pub variables: IndexMap<String, VariableModel>,
    /// The current transaction.
    pub transaction: TransactionState,
    /// Options refresh requests.
    pub option_requests: OptionRequests,
    /// Built-in variable values.
    pub builtins: BuiltinVariables,
    /// Bumped on cleanup; completions of older generations are discarded.
    pub generation: u64,
    /// Variables whose refresh is already scheduled.
    pub pending_refresh: HashSet<String>,
    /// The dashboard the variables were loaded from.
    pub dashboard: Option<Dashboard>,
}

impl Default for TemplatingState {
    fn default() -> Self {
        Self {
            variables: IndexMap::new(),
            transaction: TransactionState::default(),
            option_requests: AsyncRequestMap::new(variable_key),
            builtins: BuiltinVariables::new(),
            generation: 0,
            pending_refresh: HashSet::new(),
            dashboard: None,
        }
    }
}

impl TemplatingState {
    /// Finds a variable by name.
    #[must_use]
    pub fn variable_by_name(&self, name: &str) -> Option<&VariableModel> {
        self.variables.values().find(|v| v.name == name)
    }

    /// Returns the index the next added variable gets.
    #[must_use]
    pub fn next_variable_index(&self) -> usize {
        self.variables
            .values()
            .map(|v| v.index + 1)
            .max()
            .unwrap_or(0)
    }

    /// Returns true once the variable finished loading, successfully or not.
    #[must_use]
    pub fn is_settled(&self, id: &str) -> bool {
        self.variables
            .get(id)
            .is_none_or(|v| matches!(v.state, LoadingState::Done | LoadingState::Error))
    }

    /// Re-sorts the registry by index.
    pub fn sort_by_index(&mut self) {
        self.variables.sort_by(|_, a, _, b| a.index.cmp(&b.index));
    }
}
