//! Step graph and deterministic execution ordering.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::error::{ConvergeError, Result};

use super::{Step, StepId};

/// All steps for one run, keyed by ID.
///
/// Steps live in an arena (`Vec`) with an ID → index map; dependency edges
/// stay as IDs and are resolved through the map when sorting.
#[derive(Default)]
pub struct StepGraph {
    steps: Vec<Arc<dyn Step>>,
    index: HashMap<StepId, usize>,
}

impl StepGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a step.
    ///
    /// Fails if the ID is empty or already present.
    pub fn add<S: Step + 'static>(&mut self, step: S) -> Result<()> {
        self.add_shared(Arc::new(step))
    }

    /// Add a boxed step.
    pub fn add_boxed(&mut self, step: Box<dyn Step>) -> Result<()> {
        self.add_shared(Arc::from(step))
    }

    /// Add a shared step.
    pub fn add_shared(&mut self, step: Arc<dyn Step>) -> Result<()> {
        let id = step.id();
        if id.is_empty() {
            return Err(ConvergeError::EmptyStepId);
        }
        if self.index.contains_key(&id) {
            return Err(ConvergeError::DuplicateStep { id });
        }

        tracing::debug!("Adding step {}", id);
        self.index.insert(id, self.steps.len());
        self.steps.push(step);
        Ok(())
    }

    /// Look up a step by ID.
    pub fn get(&self, id: &str) -> Option<&Arc<dyn Step>> {
        self.index.get(id).map(|&idx| &self.steps[idx])
    }

    /// Check if a step exists in the graph.
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Get the number of steps in the graph.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Check if the graph is empty.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// All step IDs, sorted.
    pub fn ids(&self) -> Vec<StepId> {
        let mut ids: Vec<StepId> = self.index.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Steps that declare a direct dependency on `id`, sorted.
    pub fn dependents_of(&self, id: &str) -> Vec<StepId> {
        let mut dependents: Vec<StepId> = self
            .steps
            .iter()
            .filter(|step| step.depends_on().iter().any(|dep| dep.as_str() == id))
            .map(|step| step.id())
            .collect();
        dependents.sort();
        dependents
    }

    /// Returns steps in topological order (dependencies before dependents).
    ///
    /// Among steps that are ready at the same time, the smallest ID goes
    /// first, so the same step set always yields the same order.
    ///
    /// Returns an error if a dependency is missing or a cycle is detected.
    pub fn topological_sort(&self) -> Result<Vec<Arc<dyn Step>>> {
        let dependencies = self.resolve_dependencies()?;

        // Count incoming edges and build the reverse adjacency
        let mut in_degree: Vec<usize> = dependencies.iter().map(|deps| deps.len()).collect();
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); self.steps.len()];
        for (idx, deps) in dependencies.iter().enumerate() {
            for &dep in deps {
                dependents[dep].push(idx);
            }
        }

        // Ready set ordered by step ID
        let ids: Vec<StepId> = self.steps.iter().map(|s| s.id()).collect();
        let mut ready: BTreeSet<(&StepId, usize)> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, &degree)| degree == 0)
            .map(|(idx, _)| (&ids[idx], idx))
            .collect();

        let mut order = Vec::with_capacity(self.steps.len());

        while let Some((_, idx)) = ready.pop_first() {
            order.push(Arc::clone(&self.steps[idx]));

            for &dependent in &dependents[idx] {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    ready.insert((&ids[dependent], dependent));
                }
            }
        }

        // If we haven't processed all nodes, there's a cycle
        if order.len() != self.steps.len() {
            let cycle = self
                .find_cycle()
                .map(|path| join_ids(&path))
                .unwrap_or_else(|| {
                    let mut remaining: Vec<&StepId> = in_degree
                        .iter()
                        .enumerate()
                        .filter(|(_, &d)| d > 0)
                        .map(|(idx, _)| &ids[idx])
                        .collect();
                    remaining.sort();
                    remaining
                        .iter()
                        .map(|id| id.as_str())
                        .collect::<Vec<_>>()
                        .join(" -> ")
                });

            return Err(ConvergeError::CircularDependency { cycle });
        }

        Ok(order)
    }

    /// Find a cycle in the graph, returning the path if one exists.
    ///
    /// The path starts and ends with the same step. Dangling dependency
    /// references are ignored here.
    pub fn find_cycle(&self) -> Option<Vec<StepId>> {
        #[derive(Clone, Copy, PartialEq)]
        enum State {
            Unvisited,
            Visiting,
            Visited,
        }

        fn dfs(
            node: usize,
            graph: &StepGraph,
            state: &mut [State],
            path: &mut Vec<usize>,
        ) -> Option<Vec<usize>> {
            state[node] = State::Visiting;
            path.push(node);

            let mut deps: Vec<usize> = graph.steps[node]
                .depends_on()
                .iter()
                .filter_map(|dep| graph.index.get(dep).copied())
                .collect();
            deps.sort_by_key(|&idx| graph.steps[idx].id());

            for dep in deps {
                match state[dep] {
                    State::Visiting => {
                        // Found cycle - build the cycle path
                        let start = path.iter().position(|&n| n == dep).unwrap_or(0);
                        let mut cycle = path[start..].to_vec();
                        cycle.push(dep);
                        return Some(cycle);
                    }
                    State::Unvisited => {
                        if let Some(cycle) = dfs(dep, graph, state, path) {
                            return Some(cycle);
                        }
                    }
                    State::Visited => {}
                }
            }

            path.pop();
            state[node] = State::Visited;
            None
        }

        let mut state = vec![State::Unvisited; self.steps.len()];
        let mut path = Vec::new();

        let mut roots: Vec<usize> = (0..self.steps.len()).collect();
        roots.sort_by_key(|&idx| self.steps[idx].id());

        for root in roots {
            if state[root] == State::Unvisited {
                if let Some(cycle) = dfs(root, self, &mut state, &mut path) {
                    return Some(cycle.into_iter().map(|idx| self.steps[idx].id()).collect());
                }
            }
        }

        None
    }

    /// Resolve each step's declared dependencies to arena indices.
    ///
    /// Duplicate references are collapsed. Missing references are reported
    /// for the smallest step ID first, then in declaration order.
    fn resolve_dependencies(&self) -> Result<Vec<Vec<usize>>> {
        let mut order: Vec<usize> = (0..self.steps.len()).collect();
        order.sort_by_key(|&idx| self.steps[idx].id());

        let mut resolved = vec![Vec::new(); self.steps.len()];
        for idx in order {
            let step = &self.steps[idx];
            let mut seen = BTreeSet::new();
            for dep in step.depends_on() {
                let dep_idx =
                    *self
                        .index
                        .get(&dep)
                        .ok_or_else(|| ConvergeError::MissingDependency {
                            step: step.id(),
                            dependency: dep.clone(),
                        })?;
                if seen.insert(dep_idx) {
                    resolved[idx].push(dep_idx);
                }
            }
        }

        Ok(resolved)
    }
}

impl std::fmt::Debug for StepGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepGraph")
            .field("steps", &self.ids())
            .finish()
    }
}

fn join_ids(ids: &[StepId]) -> String {
    ids.iter()
        .map(|id| id.as_str())
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Diff, ExplainContext, Explanation, RunContext, StepStatus};

    struct Node {
        id: &'static str,
        deps: Vec<&'static str>,
    }

    fn node(id: &'static str, deps: &[&'static str]) -> Node {
        Node {
            id,
            deps: deps.to_vec(),
        }
    }

    impl Step for Node {
        fn id(&self) -> StepId {
            StepId::new(self.id)
        }

        fn depends_on(&self) -> Vec<StepId> {
            self.deps.iter().map(|d| StepId::new(*d)).collect()
        }

        fn check(&self, _ctx: &RunContext) -> anyhow::Result<StepStatus> {
            Ok(StepStatus::Satisfied)
        }

        fn plan(&self, _ctx: &RunContext) -> anyhow::Result<Diff> {
            Ok(Diff::default())
        }

        fn apply(&self, _ctx: &RunContext) -> anyhow::Result<()> {
            Ok(())
        }

        fn explain(&self, _ctx: &ExplainContext) -> Explanation {
            Explanation::new(self.id, "")
        }
    }

    fn graph(nodes: Vec<Node>) -> StepGraph {
        let mut graph = StepGraph::new();
        for n in nodes {
            graph.add(n).unwrap();
        }
        graph
    }

    fn order(graph: &StepGraph) -> Vec<String> {
        graph
            .topological_sort()
            .unwrap()
            .iter()
            .map(|s| s.id().to_string())
            .collect()
    }

    fn position(order: &[String], id: &str) -> usize {
        order.iter().position(|s| s == id).unwrap()
    }

    #[test]
    fn empty_graph() {
        let graph = StepGraph::new();
        assert!(graph.is_empty());
        assert!(graph.topological_sort().unwrap().is_empty());
    }

    #[test]
    fn add_rejects_duplicate_id() {
        let mut graph = StepGraph::new();
        graph.add(node("a", &[])).unwrap();
        let err = graph.add(node("a", &[])).unwrap_err();
        assert!(matches!(err, ConvergeError::DuplicateStep { .. }));
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn add_rejects_empty_id() {
        let mut graph = StepGraph::new();
        let err = graph.add(node("", &[])).unwrap_err();
        assert!(matches!(err, ConvergeError::EmptyStepId));
    }

    #[test]
    fn get_and_contains() {
        let graph = graph(vec![node("a", &[])]);
        assert!(graph.contains("a"));
        assert!(!graph.contains("b"));
        assert_eq!(graph.get("a").unwrap().id(), StepId::new("a"));
    }

    #[test]
    fn topo_sort_linear_chain() {
        let graph = graph(vec![
            node("third", &["second"]),
            node("first", &[]),
            node("second", &["first"]),
        ]);
        assert_eq!(order(&graph), vec!["first", "second", "third"]);
    }

    #[test]
    fn topo_sort_diamond_dependency() {
        let graph = graph(vec![
            node("d", &["b", "c"]),
            node("c", &["a"]),
            node("b", &["a"]),
            node("a", &[]),
        ]);

        let order = order(&graph);
        assert!(position(&order, "a") < position(&order, "b"));
        assert!(position(&order, "a") < position(&order, "c"));
        assert!(position(&order, "b") < position(&order, "d"));
        assert!(position(&order, "c") < position(&order, "d"));
    }

    #[test]
    fn topo_sort_breaks_ties_by_id() {
        let graph = graph(vec![
            node("zeta", &[]),
            node("alpha", &[]),
            node("mid", &["zeta"]),
            node("beta", &[]),
        ]);
        assert_eq!(order(&graph), vec!["alpha", "beta", "zeta", "mid"]);
    }

    #[test]
    fn topo_sort_is_deterministic() {
        let graph = graph(vec![
            node("c", &[]),
            node("b", &["c"]),
            node("a", &[]),
            node("e", &["a", "b"]),
            node("d", &[]),
        ]);
        assert_eq!(order(&graph), order(&graph));
    }

    #[test]
    fn topo_sort_ignores_repeated_dependency() {
        let graph = graph(vec![node("a", &[]), node("b", &["a", "a"])]);
        assert_eq!(order(&graph), vec!["a", "b"]);
    }

    #[test]
    fn topo_sort_detects_simple_cycle() {
        let graph = graph(vec![node("a", &["b"]), node("b", &["a"])]);
        let err = graph.topological_sort().err().unwrap();
        match err {
            ConvergeError::CircularDependency { cycle } => {
                assert_eq!(cycle, "a -> b -> a");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn topo_sort_detects_self_cycle() {
        let graph = graph(vec![node("a", &["a"])]);
        assert!(matches!(
            graph.topological_sort(),
            Err(ConvergeError::CircularDependency { .. })
        ));
    }

    #[test]
    fn topo_sort_reports_missing_dependency() {
        let graph = graph(vec![node("a", &["ghost"])]);
        match graph.topological_sort().err().unwrap() {
            ConvergeError::MissingDependency { step, dependency } => {
                assert_eq!(step.as_str(), "a");
                assert_eq!(dependency.as_str(), "ghost");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn no_cycle_returns_none() {
        let graph = graph(vec![node("a", &[]), node("b", &["a"])]);
        assert!(graph.find_cycle().is_none());
    }

    #[test]
    fn longer_cycle_returns_full_path() {
        let graph = graph(vec![
            node("a", &["c"]),
            node("b", &["a"]),
            node("c", &["b"]),
        ]);

        let path = graph.find_cycle().unwrap();
        assert_eq!(path.first(), path.last());
        assert!(path.contains(&StepId::new("a")));
        assert!(path.contains(&StepId::new("b")));
        assert!(path.contains(&StepId::new("c")));
    }

    #[test]
    fn dependents_of_lists_direct_dependents() {
        let graph = graph(vec![
            node("a", &[]),
            node("c", &["a"]),
            node("b", &["a"]),
            node("d", &["b"]),
        ]);
        assert_eq!(
            graph.dependents_of("a"),
            vec![StepId::new("b"), StepId::new("c")]
        );
    }

    #[test]
    fn ids_are_sorted() {
        let graph = graph(vec![node("b", &[]), node("a", &[])]);
        assert_eq!(graph.ids(), vec![StepId::new("a"), StepId::new("b")]);
    }
}
