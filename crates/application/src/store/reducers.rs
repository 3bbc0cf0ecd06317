//! Pure state transitions.

use serde_json::Value;
use stencil_domain::{LoadingState, VariableKind, VariableModel};
use tracing::warn;

use super::actions::{TemplatingAction, VariableProp};
use super::state::TemplatingState;
use crate::adapters::{set_current_variable_value, variable_adapter};

/// Applies `action` to `state`; returns false if it was ignored.
pub fn reduce(state: &mut TemplatingState, action: TemplatingAction) -> bool {
    let dirty = action.is_dirty_action();
    let applied = apply(state, action);
    if applied && dirty {
        state.transaction.mark_dirty();
    }
    applied
}

fn with_variable(
    state: &mut TemplatingState,
    id: &str,
    f: impl FnOnce(&mut VariableModel),
) -> bool {
    match state.variables.get_mut(id) {
        Some(variable) => {
            f(variable);
            true
        }
        None => {
            warn!(variable = id, "action for unknown variable ignored");
            false
        }
    }
}

fn apply(state: &mut TemplatingState, action: TemplatingAction) -> bool {
    match action {
        TemplatingAction::AddVariable(variable) => {
            state.variables.insert(variable.id.clone(), variable);
            state.sort_by_index();
            true
        }
        TemplatingAction::RemoveVariable { id, reindex } => {
            if state.variables.shift_remove(&id).is_none() {
                return false;
            }
            state.option_requests.remove(&id);
            if reindex {
                for (index, variable) in state.variables.values_mut().enumerate() {
                    variable.index = index;
                }
            }
            true
        }
        TemplatingAction::ChangeVariableOrder { id, from, to } => {
            if !state.variables.contains_key(&id) {
                return false;
            }
            for variable in state.variables.values_mut() {
                if variable.index == from {
                    variable.index = to;
                } else if variable.index > from && variable.index <= to {
                    variable.index -= 1;
                } else if variable.index < from && variable.index >= to {
                    variable.index += 1;
                }
            }
            state.sort_by_index();
            true
        }
        TemplatingAction::DuplicateVariable { id, new_id } => {
            let Some(original) = state.variables.get(&id) else {
                return false;
            };
            let name = format!("copy_of_{}", original.name);
            let copy = VariableModel {
                id: new_id.unwrap_or_else(|| name.clone()),
                name,
                index: state.next_variable_index(),
                state: LoadingState::NotStarted,
                error: None,
                ..original.clone()
            };
            state.variables.insert(copy.id.clone(), copy);
            true
        }
        TemplatingAction::ChangeVariableType { id, variable_type } => {
            with_variable(state, &id, |variable| {
                let mut fresh = VariableModel::new(
                    variable.name.clone(),
                    variable_adapter(variable_type).initial_state(),
                );
                fresh.id.clone_from(&variable.id);
                fresh.label = variable.label.take();
                fresh.description = variable.description.take();
                fresh.index = variable.index;
                *variable = fresh;
            })
        }
        TemplatingAction::ChangeVariableProp { id, prop } => {
            with_variable(state, &id, |variable| apply_prop(variable, prop))
        }
        TemplatingAction::ChangeVariableName { id, name } => {
            with_variable(state, &id, |variable| variable.name = name)
        }
        TemplatingAction::SetCurrentValue { id, current } => {
            with_variable(state, &id, |variable| set_current_variable_value(variable, current))
        }
        TemplatingAction::SetOptions { id, options } => {
            with_variable(state, &id, |variable| variable.options = options)
        }
        TemplatingAction::SetKind { id, kind } => {
            with_variable(state, &id, |variable| variable.kind = kind)
        }
        TemplatingAction::VariableStateFetching(id) => with_variable(state, &id, |variable| {
            variable.state = LoadingState::Loading;
            variable.error = None;
        }),
        TemplatingAction::VariableStateCompleted(id) => with_variable(state, &id, |variable| {
            variable.state = LoadingState::Done;
            variable.error = None;
        }),
        TemplatingAction::VariableStateFailed { id, error } => {
            with_variable(state, &id, |variable| {
                variable.state = LoadingState::Error;
                variable.error = Some(error);
            })
        }
        TemplatingAction::OptionsRequest(request) => state.option_requests.reduce(request),
        TemplatingAction::TransactionInit(uid) => {
            state.transaction.init(uid);
            true
        }
        TemplatingAction::TransactionComplete(uid) => state.transaction.complete(&uid),
        TemplatingAction::TransactionCleanup => {
            state.variables.clear();
            state.option_requests.clear();
            state.pending_refresh.clear();
            state.transaction.clear();
            state.dashboard = None;
            state.generation += 1;
            true
        }
        TemplatingAction::SetDashboard(dashboard) => {
            state.dashboard = Some(dashboard);
            true
        }
        TemplatingAction::SetTimeRange { range, interval } => {
            state.builtins.set_time_range(range, interval);
            true
        }
        TemplatingAction::SetAutoInterval { name, interval } => {
            state.builtins.set_auto_interval(&name, &interval);
            true
        }
        TemplatingAction::SetDashboardInfo(info) => {
            state.builtins.set_dashboard(info);
            true
        }
        TemplatingAction::SetUser(user) => {
            state.builtins.set_user(user);
            true
        }
        TemplatingAction::SetOrg(org) => {
            state.builtins.set_org(org);
            true
        }
        TemplatingAction::MarkPendingRefresh(ids) => {
            state.pending_refresh.extend(ids);
            true
        }
        TemplatingAction::ClearPendingRefresh(id) => state.pending_refresh.remove(&id),
    }
}

fn query_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn apply_prop(variable: &mut VariableModel, prop: VariableProp) {
    let kind = variable.variable_type();
    let applied = match (prop, &mut variable.kind) {
        (VariableProp::Label(label), _) => {
            variable.label = label;
            true
        }
        (VariableProp::Description(description), _) => {
            variable.description = description;
            true
        }
        (VariableProp::Hide(hide), _) => {
            variable.hide = hide;
            true
        }
        (VariableProp::SkipUrlSync(skip), _) => {
            variable.skip_url_sync = skip;
            true
        }
        (VariableProp::Query(query), VariableKind::Query(q)) => {
            q.query = query;
            true
        }
        (VariableProp::Query(query), VariableKind::Custom(v)) => {
            v.query = query_string(&query);
            true
        }
        (VariableProp::Query(query), VariableKind::Constant(v)) => {
            v.query = query_string(&query);
            true
        }
        (VariableProp::Query(query), VariableKind::TextBox(v)) => {
            v.query = query_string(&query);
            true
        }
        (VariableProp::Query(query), VariableKind::Interval(v)) => {
            v.query = query_string(&query);
            true
        }
        (VariableProp::Query(query), VariableKind::DataSource(v)) => {
            v.query = query_string(&query);
            true
        }
        (VariableProp::Regex(regex), VariableKind::Query(q)) => {
            q.regex = regex;
            true
        }
        (VariableProp::Regex(regex), VariableKind::DataSource(v)) => {
            v.regex = regex;
            true
        }
        (VariableProp::Refresh(refresh), VariableKind::Query(q)) => {
            q.refresh = refresh;
            true
        }
        (VariableProp::Refresh(refresh), VariableKind::DataSource(v)) => {
            v.refresh = refresh;
            true
        }
        (VariableProp::Refresh(refresh), VariableKind::Interval(v)) => {
            v.refresh = refresh;
            true
        }
        (VariableProp::Sort(sort), VariableKind::Query(q)) => {
            q.sort = sort;
            true
        }
        (VariableProp::Definition(definition), VariableKind::Query(q)) => {
            q.definition = definition;
            true
        }
        (VariableProp::Datasource(datasource), VariableKind::Query(q)) => {
            q.datasource = datasource;
            true
        }
        (VariableProp::Datasource(datasource), VariableKind::AdHoc(v)) => {
            v.datasource = datasource;
            true
        }
        (VariableProp::Auto(auto), VariableKind::Interval(v)) => {
            v.auto = auto;
            true
        }
        (VariableProp::AutoCount(count), VariableKind::Interval(v)) => {
            v.auto_count = count;
            true
        }
        (VariableProp::AutoMin(min), VariableKind::Interval(v)) => {
            v.auto_min = min;
            true
        }
        (VariableProp::Multi(multi), other) => other.selection_mut().map(|s| s.multi = multi).is_some(),
        (VariableProp::IncludeAll(include), other) => other
            .selection_mut()
            .map(|s| s.include_all = include)
            .is_some(),
        (VariableProp::AllValue(all_value), other) => other
            .selection_mut()
            .map(|s| s.all_value = all_value)
            .is_some(),
        _ => false,
    };
    if !applied {
        warn!(variable = %variable.name, kind = %kind, "property does not apply to this kind");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use stencil_domain::{
        CustomVariable, TransactionStatus, VariableOption, VariableType, VariableValue,
    };

    fn custom(name: &str, index: usize) -> VariableModel {
        let mut variable = VariableModel::new(
            name,
            VariableKind::Custom(CustomVariable {
                query: "a,b".to_string(),
                ..CustomVariable::default()
            }),
        );
        variable.index = index;
        variable
    }

    fn state_with(names: &[&str]) -> TemplatingState {
        let mut state = TemplatingState::default();
        for (index, name) in names.iter().enumerate() {
            reduce(&mut state, TemplatingAction::AddVariable(custom(name, index)));
        }
        state
    }

    fn order(state: &TemplatingState) -> Vec<(String, usize)> {
        state
            .variables
            .values()
            .map(|v| (v.name.clone(), v.index))
            .collect()
    }

    #[test]
    fn test_remove_reindexes() {
        let mut state = state_with(&["a", "b", "c"]);
        assert!(reduce(
            &mut state,
            TemplatingAction::RemoveVariable {
                id: "a".to_string(),
                reindex: true
            }
        ));
        assert_eq!(
            order(&state),
            vec![("b".to_string(), 0), ("c".to_string(), 1)]
        );
    }

    #[test]
    fn test_change_order_shifts_between() {
        let mut state = state_with(&["a", "b", "c", "d"]);
        reduce(
            &mut state,
            TemplatingAction::ChangeVariableOrder {
                id: "a".to_string(),
                from: 0,
                to: 2,
            },
        );
        assert_eq!(
            order(&state),
            vec![
                ("b".to_string(), 0),
                ("c".to_string(), 1),
                ("a".to_string(), 2),
                ("d".to_string(), 3)
            ]
        );
    }

    #[test]
    fn test_duplicate_appends_copy() {
        let mut state = state_with(&["a", "b"]);
        reduce(
            &mut state,
            TemplatingAction::DuplicateVariable {
                id: "a".to_string(),
                new_id: None,
            },
        );
        let copy = state.variables.get("copy_of_a").unwrap();
        assert_eq!(copy.name, "copy_of_a");
        assert_eq!(copy.index, 2);
        assert_eq!(copy.kind, state.variables["a"].kind);
    }

    #[test]
    fn test_change_type_keeps_identity() {
        let mut state = state_with(&["a", "b"]);
        state.variables.get_mut("b").unwrap().label = Some("Bee".to_string());
        state.variables.get_mut("b").unwrap().current = VariableOption::same("a");
        reduce(
            &mut state,
            TemplatingAction::ChangeVariableType {
                id: "b".to_string(),
                variable_type: VariableType::TextBox,
            },
        );
        let b = &state.variables["b"];
        assert_eq!(b.variable_type(), VariableType::TextBox);
        assert_eq!(b.label.as_deref(), Some("Bee"));
        assert_eq!(b.index, 1);
        assert_eq!(b.current.value, VariableValue::from(""));
    }

    #[test]
    fn test_dirty_tracking_only_after_completion() {
        let mut state = TemplatingState::default();
        reduce(&mut state, TemplatingAction::TransactionInit("t1".to_string()));
        reduce(&mut state, TemplatingAction::AddVariable(custom("a", 0)));
        assert!(!state.transaction.is_dirty);

        reduce(&mut state, TemplatingAction::TransactionComplete("t1".to_string()));
        assert_eq!(state.transaction.status, TransactionStatus::Completed);
        reduce(
            &mut state,
            TemplatingAction::SetCurrentValue {
                id: "a".to_string(),
                current: VariableOption::same("b"),
            },
        );
        assert!(!state.transaction.is_dirty);

        reduce(
            &mut state,
            TemplatingAction::ChangeVariableProp {
                id: "a".to_string(),
                prop: VariableProp::Multi(true),
            },
        );
        assert!(state.transaction.is_dirty);
        assert!(state.variables["a"].is_multi());
    }

    #[test]
    fn test_stale_completion_ignored() {
        let mut state = TemplatingState::default();
        reduce(&mut state, TemplatingAction::TransactionInit("t1".to_string()));
        reduce(&mut state, TemplatingAction::TransactionInit("t2".to_string()));
        assert!(!reduce(
            &mut state,
            TemplatingAction::TransactionComplete("t1".to_string())
        ));
        assert!(state.transaction.is_fetching());
    }

    #[test]
    fn test_cleanup_bumps_generation() {
        let mut state = state_with(&["a"]);
        reduce(&mut state, TemplatingAction::TransactionCleanup);
        assert!(state.variables.is_empty());
        assert_eq!(state.generation, 1);
    }

    #[test]
    fn test_query_prop_on_custom_sets_text() {
        let mut state = state_with(&["a"]);
        reduce(
            &mut state,
            TemplatingAction::ChangeVariableProp {
                id: "a".to_string(),
                prop: VariableProp::Query(Value::String("x,y".to_string())),
            },
        );
        let VariableKind::Custom(custom) = &state.variables["a"].kind else {
            panic!("expected custom");
        };
        assert_eq!(custom.query, "x,y");
    }
}
