//! Templating store
//!
//! All session state lives in one [`TemplatingState`] behind a lock. Changes go
//! through [`Store::dispatch`], which runs the pure [`reduce`] function and then
//! publishes a new version so waiters can re-check their condition.
//!
//! The lock is never held across an `.await`: callers read a snapshot, await,
//! then dispatch the result.

mod actions;
mod reducers;
mod state;

use parking_lot::RwLock;
use stencil_domain::VariableModel;
use tokio::sync::watch;

pub use actions::{OptionsRequestAction, TemplatingAction, VariableProp};
pub use reducers::reduce;
pub use state::{OptionRequests, TemplatingState};

/// Shared, observable templating state.
#[derive(Debug)]
pub struct Store {
    state: RwLock<TemplatingState>,
    version: watch::Sender<u64>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        let (version, _) = watch::channel(0);
        Self {
            state: RwLock::new(TemplatingState::default()),
            version,
        }
    }

    /// Applies an action; returns false if the reducer ignored it.
    pub fn dispatch(&self, action: TemplatingAction) -> bool {
        let applied = reduce(&mut self.state.write(), action);
        if applied {
            self.version.send_modify(|v| *v += 1);
        }
        applied
    }

    /// Runs `f` with read access to the state.
    pub fn read<R>(&self, f: impl FnOnce(&TemplatingState) -> R) -> R {
        f(&self.state.read())
    }

    /// Returns a copy of a variable by id.
    #[must_use]
    pub fn variable(&self, id: &str) -> Option<VariableModel> {
        self.read(|state| state.variables.get(id).cloned())
    }

    /// Returns copies of every variable, ordered by index.
    #[must_use]
    pub fn variables(&self) -> Vec<VariableModel> {
        self.read(|state| {
            let mut variables: Vec<_> = state.variables.values().cloned().collect();
            variables.sort_by_key(|v| v.index);
            variables
        })
    }

    /// Waits until `predicate` holds for the state.
    ///
    /// The predicate is re-evaluated after every applied action.
    pub async fn wait_until(&self, predicate: impl Fn(&TemplatingState) -> bool) {
        let mut changes = self.version.subscribe();
        loop {
            if self.read(&predicate) {
                return;
            }
            // The sender lives as long as the store, so this only fails when it is dropped.
            if changes.changed().await.is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use stencil_domain::{ConstantVariable, VariableKind};

    fn constant(name: &str, index: usize) -> VariableModel {
        let mut variable = VariableModel::new(
            name,
            VariableKind::Constant(ConstantVariable {
                query: "x".to_string(),
            }),
        );
        variable.index = index;
        variable
    }

    #[test]
    fn test_variables_sorted_by_index() {
        let store = Store::new();
        store.dispatch(TemplatingAction::AddVariable(constant("b", 1)));
        store.dispatch(TemplatingAction::AddVariable(constant("a", 0)));
        let names: Vec<_> = store.variables().into_iter().map(|v| v.name).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_ignored_action_reported() {
        let store = Store::new();
        assert!(!store.dispatch(TemplatingAction::VariableStateCompleted("missing".to_string())));
    }

    #[tokio::test]
    async fn test_wait_until_wakes_on_dispatch() {
        let store = Arc::new(Store::new());
        store.dispatch(TemplatingAction::AddVariable(constant("a", 0)));

        let waiter = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                store.wait_until(|state| state.is_settled("a")).await;
            })
        };
        tokio::task::yield_now().await;
        store.dispatch(TemplatingAction::VariableStateCompleted("a".to_string()));
        waiter.await.unwrap();
        assert!(store.read(|state| state.is_settled("a")));
    }
}
