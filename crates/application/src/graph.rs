//! Dependency graph between variables.
//!
//! There is an edge `a -> b` when `a` references `b`, so `b` must be resolved
//! first. The input edges of a node are its dependents.

use std::collections::{HashMap, HashSet, VecDeque};

use stencil_domain::VariableModel;
use tracing::warn;

use crate::adapters::variable_adapter;

/// Result of ordering the graph.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TopologicalOrder {
    /// Variable ids, dependencies before dependents.
    pub order: Vec<String>,
    /// Ids that sit on or behind a cycle, in registry order.
    pub cyclic: Vec<String>,
}

/// Directed "depends on" graph over variable ids.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: Vec<String>,
    dependencies: HashMap<String, Vec<String>>,
    dependents: HashMap<String, Vec<String>>,
}

impl DependencyGraph {
    /// Builds the graph by asking each variable's adapter about every other variable.
    #[must_use]
    pub fn build<'a>(variables: impl IntoIterator<Item = &'a VariableModel>) -> Self {
        let variables: Vec<&VariableModel> = variables.into_iter().collect();
        let mut graph = Self {
            nodes: variables.iter().map(|v| v.id.clone()).collect(),
            ..Self::default()
        };
        for source in &variables {
            let adapter = variable_adapter(source.variable_type());
            for target in &variables {
                if source.id != target.id && adapter.depends_on(source, target) {
                    graph.link(&source.id, &target.id);
                }
            }
        }
        graph
    }

    fn link(&mut self, from: &str, to: &str) {
        self.dependencies
            .entry(from.to_string())
            .or_default()
            .push(to.to_string());
        self.dependents
            .entry(to.to_string())
            .or_default()
            .push(from.to_string());
    }

    /// Ids the variable references directly.
    #[must_use]
    pub fn dependencies_of(&self, id: &str) -> &[String] {
        self.dependencies.get(id).map_or(&[], Vec::as_slice)
    }

    /// Ids that reference the variable directly.
    #[must_use]
    pub fn dependents_of(&self, id: &str) -> &[String] {
        self.dependents.get(id).map_or(&[], Vec::as_slice)
    }

    /// Direct dependents that are not also reached through another dependent.
    ///
    /// Refreshing a dependent cascades to its own dependents, so a node that
    /// depends on both `id` and on another dependent of `id` is refreshed by that
    /// cascade and is dropped here.
    #[must_use]
    pub fn optimized_dependents_of(&self, id: &str) -> Vec<String> {
        let direct = self.dependents_of(id);
        direct
            .iter()
            .filter(|candidate| {
                !direct.iter().any(|other| {
                    other != *candidate && self.dependents_of(other).contains(candidate)
                })
            })
            .cloned()
            .collect()
    }

    /// Every id reachable through dependents, excluding `id` itself.
    #[must_use]
    pub fn transitive_dependents_of(&self, id: &str) -> HashSet<String> {
        let mut seen = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::from([id]);
        while let Some(current) = queue.pop_front() {
            for dependent in self.dependents_of(current) {
                if dependent != id && seen.insert(dependent.clone()) {
                    queue.push_back(dependent);
                }
            }
        }
        seen
    }

    /// Orders the graph so every variable follows its dependencies.
    ///
    /// Variables caught in a cycle cannot be ordered; they are reported in
    /// `cyclic` and logged.
    #[must_use]
    pub fn topological_order(&self) -> TopologicalOrder {
        let mut remaining: HashMap<&str, usize> = self
            .nodes
            .iter()
            .map(|id| (id.as_str(), self.dependencies_of(id).len()))
            .collect();
        let mut ready: VecDeque<&str> = self
            .nodes
            .iter()
            .map(String::as_str)
            .filter(|id| remaining.get(id) == Some(&0))
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(id) = ready.pop_front() {
            order.push(id.to_string());
            for dependent in self.dependents_of(id) {
                if let Some(count) = remaining.get_mut(dependent.as_str()) {
                    *count -= 1;
                    if *count == 0 {
                        ready.push_back(dependent);
                    }
                }
            }
        }

        let placed: HashSet<&str> = order.iter().map(String::as_str).collect();
        let cyclic: Vec<String> = self
            .nodes
            .iter()
            .filter(|id| !placed.contains(id.as_str()))
            .cloned()
            .collect();
        if !cyclic.is_empty() {
            warn!(variables = ?cyclic, "circular dependency between variables");
        }
        TopologicalOrder { order, cyclic }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::Value;
    use stencil_domain::{QueryVariable, VariableKind};

    fn query(name: &str, text: &str) -> VariableModel {
        VariableModel::new(
            name,
            VariableKind::Query(QueryVariable {
                query: Value::String(text.to_string()),
                ..QueryVariable::default()
            }),
        )
    }

    #[test]
    fn test_edges_follow_references() {
        let vars = [query("a", "1,2"), query("b", "$a"), query("c", "${a},$b")];
        let graph = DependencyGraph::build(&vars);
        assert_eq!(graph.dependencies_of("c"), ["a", "b"]);
        assert_eq!(graph.dependents_of("a"), ["b", "c"]);
        assert!(graph.dependencies_of("a").is_empty());
    }

    #[test]
    fn test_optimized_dependents_skip_transitive() {
        let vars = [query("a", "1"), query("b", "$a"), query("c", "$a $b")];
        let graph = DependencyGraph::build(&vars);
        assert_eq!(graph.optimized_dependents_of("a"), vec!["b".to_string()]);
        assert_eq!(graph.optimized_dependents_of("b"), vec!["c".to_string()]);
    }

    #[test]
    fn test_topological_order() {
        let vars = [query("c", "$b"), query("b", "$a"), query("a", "x")];
        let order = DependencyGraph::build(&vars).topological_order();
        assert_eq!(order.order, vec!["a", "b", "c"]);
        assert!(order.cyclic.is_empty());
    }

    #[test]
    fn test_cycles_reported() {
        let vars = [query("a", "$b"), query("b", "$a"), query("c", "x"), query("d", "$a")];
        let order = DependencyGraph::build(&vars).topological_order();
        assert_eq!(order.order, vec!["c"]);
        assert_eq!(order.cyclic, vec!["a", "b", "d"]);
    }

    #[test]
    fn test_transitive_dependents() {
        let vars = [query("a", "1"), query("b", "$a"), query("c", "$b"), query("d", "x")];
        let graph = DependencyGraph::build(&vars);
        let dependents = graph.transitive_dependents_of("a");
        assert_eq!(dependents.len(), 2);
        assert!(dependents.contains("c"));
    }
}
