//! Stack dependency graph management using `petgraph`.
//!
//! Builds a directed acyclic graph from explicit stack dependencies
//! and resolves topological ordering for template emission.

use petgraph::Direction;
use petgraph::graph::NodeIndex;

use stackforge_common::error::{Result, StackforgeError};
use stackforge_common::types::StackName;

/// A dependency graph of stacks.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    /// Internal petgraph representation.
    graph: petgraph::Graph<StackName, ()>,
}

impl DependencyGraph {
    /// Creates an empty dependency graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            graph: petgraph::Graph::new(),
        }
    }

    /// Adds a stack node to the graph.
    pub fn add_stack(&mut self, name: StackName) -> NodeIndex {
        self.graph.add_node(name)
    }

    /// Adds a dependency edge: `dependent` depends on `dependency`.
    ///
    /// The graph edge points from `dependency` to `dependent`
    /// so that topological sort yields dependencies first. Adding the
    /// same edge twice keeps a single edge.
    pub fn add_dependency(&mut self, dependent: NodeIndex, dependency: NodeIndex) {
        let _ = self.graph.update_edge(dependency, dependent, ());
    }

    /// Returns a topological ordering of stacks for deployment.
    ///
    /// Dependencies appear before the stacks that depend on them.
    ///
    /// # Errors
    ///
    /// Returns `CyclicDependency` if the graph contains cycles.
    pub fn resolve_order(&self) -> Result<Vec<StackName>> {
        match petgraph::algo::toposort(&self.graph, None) {
            Ok(indices) => Ok(indices
                .iter()
                .filter_map(|&idx| self.graph.node_weight(idx).cloned())
                .collect()),
            Err(cycle) => Err(StackforgeError::CyclicDependency {
                stack: self
                    .graph
                    .node_weight(cycle.node_id())
                    .map_or_else(String::new, ToString::to_string),
            }),
        }
    }

    /// Whether `upstream` must deploy before `downstream`, directly or transitively.
    #[must_use]
    pub fn is_upstream(&self, upstream: NodeIndex, downstream: NodeIndex) -> bool {
        upstream != downstream
            && petgraph::algo::has_path_connecting(&self.graph, upstream, downstream, None)
    }

    /// Direct dependencies of a stack, in the order they were added.
    #[must_use]
    pub fn dependencies_of(&self, node: NodeIndex) -> Vec<StackName> {
        let mut deps: Vec<(NodeIndex, StackName)> = self
            .graph
            .neighbors_directed(node, Direction::Incoming)
            .filter_map(|idx| self.graph.node_weight(idx).map(|n| (idx, n.clone())))
            .collect();
        deps.sort_by_key(|(idx, _)| *idx);
        deps.into_iter().map(|(_, name)| name).collect()
    }

    /// Every `(dependent, dependency)` edge.
    #[must_use]
    pub fn edges(&self) -> Vec<(StackName, StackName)> {
        self.graph
            .raw_edges()
            .iter()
            .filter_map(|edge| {
                let dependency = self.graph.node_weight(edge.source())?;
                let dependent = self.graph.node_weight(edge.target())?;
                Some((dependent.clone(), dependency.clone()))
            })
            .collect()
    }

    /// Number of stacks in the graph.
    #[must_use]
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Whether the graph has no stacks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(raw: &str) -> StackName {
        StackName::new(raw).expect("valid stack name")
    }

    #[test]
    fn empty_graph_resolves_to_empty() {
        let graph = DependencyGraph::new();
        let order = graph.resolve_order().expect("should resolve");
        assert!(order.is_empty());
        assert!(graph.is_empty());
    }

    #[test]
    fn linear_dependency_chain() {
        let mut graph = DependencyGraph::new();
        let pipeline = graph.add_stack(name("pipeline"));
        let build = graph.add_stack(name("build"));
        let code = graph.add_stack(name("code"));
        graph.add_dependency(pipeline, build);
        graph.add_dependency(build, code);

        let order = graph.resolve_order().expect("should resolve");
        let pos = |n: &str| order.iter().position(|s| s.as_str() == n).expect(n);
        assert!(pos("code") < pos("build"), "{order:?}");
        assert!(pos("build") < pos("pipeline"), "{order:?}");
    }

    #[test]
    fn fan_out_from_shared_dependency() {
        let mut graph = DependencyGraph::new();
        let code = graph.add_stack(name("code"));
        let build = graph.add_stack(name("build"));
        let pipeline = graph.add_stack(name("pipeline"));
        let batch = graph.add_stack(name("batch"));
        graph.add_dependency(build, code);
        graph.add_dependency(pipeline, build);
        graph.add_dependency(batch, build);

        let order = graph.resolve_order().expect("should resolve");
        assert_eq!(order.len(), 4);
        let pos = |n: &str| order.iter().position(|s| s.as_str() == n).expect(n);
        assert!(pos("build") < pos("pipeline"));
        assert!(pos("build") < pos("batch"));
        assert!(graph.is_upstream(code, pipeline));
        assert!(!graph.is_upstream(pipeline, code));
        assert!(!graph.is_upstream(batch, pipeline));
    }

    #[test]
    fn cycle_detection() {
        let mut graph = DependencyGraph::new();
        let a = graph.add_stack(name("a"));
        let b = graph.add_stack(name("b"));
        graph.add_dependency(a, b);
        graph.add_dependency(b, a);

        let result = graph.resolve_order();
        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("cyclic"), "got: {msg}");
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let mut graph = DependencyGraph::new();
        let a = graph.add_stack(name("a"));
        graph.add_dependency(a, a);
        assert!(graph.resolve_order().is_err());
    }

    #[test]
    fn repeated_edge_is_stored_once() {
        let mut graph = DependencyGraph::new();
        let a = graph.add_stack(name("a"));
        let b = graph.add_stack(name("b"));
        graph.add_dependency(a, b);
        graph.add_dependency(a, b);
        assert_eq!(graph.edges(), vec![(name("a"), name("b"))]);
    }

    #[test]
    fn dependencies_of_lists_direct_edges_only() {
        let mut graph = DependencyGraph::new();
        let code = graph.add_stack(name("code"));
        let build = graph.add_stack(name("build"));
        let pipeline = graph.add_stack(name("pipeline"));
        graph.add_dependency(build, code);
        graph.add_dependency(pipeline, build);
        assert_eq!(graph.dependencies_of(pipeline), vec![name("build")]);
        assert!(graph.dependencies_of(code).is_empty());
    }
}
