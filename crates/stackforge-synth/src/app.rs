//! The shared application context.
//!
//! An [`App`] owns every stack of one run, the parameter namespace they
//! share, and the dependency graph between them. Synthesis consumes the
//! `App`, so it happens at most once per run.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use petgraph::graph::NodeIndex;

use stackforge_common::constants::{AGNOSTIC_ENVIRONMENT, TEMPLATE_FILE_SUFFIX};
use stackforge_common::error::{Result, StackforgeError};
use stackforge_common::types::StackName;

use crate::asset::FileAsset;
use crate::assembly::{CloudAssembly, Manifest, StackArtifact};
use crate::graph::DependencyGraph;
use crate::parameters::ParameterStore;
use crate::stack::Stack;
use crate::validator;

static NEXT_APP_ID: AtomicU64 = AtomicU64::new(0);

/// Handle to a stack registered in an [`App`].
///
/// A handle is only valid in the `App` that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StackId {
    app: u64,
    index: usize,
}

#[derive(Debug)]
struct StackEntry {
    stack: Stack,
    node: NodeIndex,
}

/// Root of a composition.
#[derive(Debug)]
pub struct App {
    id: u64,
    entries: Vec<StackEntry>,
    by_name: HashMap<StackName, StackId>,
    graph: DependencyGraph,
    parameters: ParameterStore,
    tags: BTreeMap<String, String>,
}

impl Default for App {
    fn default() -> Self {
        Self {
            id: NEXT_APP_ID.fetch_add(1, Ordering::Relaxed),
            entries: Vec::new(),
            by_name: HashMap::new(),
            graph: DependencyGraph::default(),
            parameters: ParameterStore::default(),
            tags: BTreeMap::new(),
        }
    }
}

impl App {
    /// Creates an empty application.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an application whose stacks all carry `tags`.
    #[must_use]
    pub fn with_tags(tags: BTreeMap<String, String>) -> Self {
        Self {
            tags,
            ..Self::default()
        }
    }

    /// Registers a finished stack.
    ///
    /// Every parameter the stack reads must already be published by a
    /// registered stack. Registering a stack identical to one already
    /// present returns the existing handle, so repeating a deterministic
    /// composition adds no stacks and no parameter entries.
    ///
    /// # Errors
    ///
    /// - `DuplicateStack` if a different stack with the same name exists.
    /// - `UnresolvedParameter` if a read parameter has no registered producer.
    /// - `ParameterConflict` if a published key belongs to another stack.
    pub fn add_stack(&mut self, stack: Stack) -> Result<StackId> {
        if let Some(&id) = self.by_name.get(stack.name()) {
            if self.entries[id.index].stack == stack {
                tracing::debug!(stack = %stack.name(), "stack already registered");
                return Ok(id);
            }
            return Err(StackforgeError::DuplicateStack {
                name: stack.name().to_string(),
            });
        }

        for param in stack.consumed() {
            let _ = self.parameters.resolve(param, stack.name())?;
        }
        for key in stack.published() {
            if let Some(owner) = self.parameters.producer_of(key) {
                return Err(StackforgeError::ParameterConflict {
                    key: key.to_string(),
                    owner: owner.to_string(),
                    requested_by: stack.name().to_string(),
                });
            }
        }
        for key in stack.published() {
            self.parameters.publish(key, stack.name())?;
        }

        tracing::info!(
            stack = %stack.name(),
            resources = stack.template().resources.len(),
            "registered stack"
        );
        let id = StackId {
            app: self.id,
            index: self.entries.len(),
        };
        let node = self.graph.add_stack(stack.name().clone());
        let _ = self.by_name.insert(stack.name().clone(), id);
        self.entries.push(StackEntry { stack, node });
        Ok(id)
    }

    /// Records that `dependent` must deploy after `dependency`.
    ///
    /// Recording the same edge twice keeps one edge. Cycles are reported by
    /// [`validate`](Self::validate) and [`synth`](Self::synth).
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if either handle belongs to another `App`.
    pub fn add_dependency(&mut self, dependent: StackId, dependency: StackId) -> Result<()> {
        let dependent = self.entry(dependent)?;
        let dependency = self.entry(dependency)?;
        tracing::debug!(
            dependent = %dependent.stack.name(),
            dependency = %dependency.stack.name(),
            "adding stack dependency"
        );
        let (dependent_node, dependency_node) = (dependent.node, dependency.node);
        self.graph.add_dependency(dependent_node, dependency_node);
        Ok(())
    }

    /// Looks up a stack by handle.
    #[must_use]
    pub fn stack(&self, id: StackId) -> Option<&Stack> {
        self.entry(id).ok().map(|e| &e.stack)
    }

    /// Looks up a stack by name.
    #[must_use]
    pub fn stack_by_name(&self, name: &str) -> Option<&Stack> {
        self.entries
            .iter()
            .find(|e| e.stack.name().as_str() == name)
            .map(|e| &e.stack)
    }

    /// Stacks in registration order.
    pub fn stacks(&self) -> impl Iterator<Item = &Stack> {
        self.entries.iter().map(|e| &e.stack)
    }

    /// Number of registered stacks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no stack is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The shared parameter namespace.
    #[must_use]
    pub const fn parameters(&self) -> &ParameterStore {
        &self.parameters
    }

    /// Direct dependencies of a stack.
    #[must_use]
    pub fn dependencies_of(&self, id: StackId) -> Vec<StackName> {
        self.entry(id)
            .ok()
            .map(|e| self.graph.dependencies_of(e.node))
            .unwrap_or_default()
    }

    /// Every `(dependent, dependency)` edge.
    #[must_use]
    pub fn dependency_edges(&self) -> Vec<(StackName, StackName)> {
        self.graph.edges()
    }

    /// Whether `upstream` deploys before `downstream`. `None` if either is unknown.
    #[must_use]
    pub fn is_upstream(&self, upstream: &StackName, downstream: &StackName) -> Option<bool> {
        let up = self.by_name.get(upstream)?;
        let down = self.by_name.get(downstream)?;
        Some(
            self.graph
                .is_upstream(self.entries[up.index].node, self.entries[down.index].node),
        )
    }

    /// Stack names with dependencies first.
    ///
    /// # Errors
    ///
    /// Returns `CyclicDependency` if the graph has a cycle.
    pub fn deployment_order(&self) -> Result<Vec<StackName>> {
        self.graph.resolve_order()
    }

    /// Runs every pre-synthesis check.
    ///
    /// # Errors
    ///
    /// See [`validator::validate`].
    pub fn validate(&self) -> Result<()> {
        validator::validate(self)
    }

    /// Serializes every stack into a cloud assembly.
    ///
    /// # Errors
    ///
    /// Returns the first validation error; no partial assembly is produced.
    pub fn synth(self) -> Result<CloudAssembly> {
        self.validate()?;
        let order = self.deployment_order()?;
        tracing::info!(stacks = order.len(), "synthesizing cloud assembly");

        let dependencies: HashMap<StackName, Vec<StackName>> = self
            .entries
            .iter()
            .map(|e| (e.stack.name().clone(), self.graph.dependencies_of(e.node)))
            .collect();
        let mut remaining: HashMap<StackName, Stack> = self
            .entries
            .into_iter()
            .map(|e| (e.stack.name().clone(), e.stack))
            .collect();

        let mut artifacts = Vec::with_capacity(order.len());
        let mut templates = Vec::with_capacity(order.len());
        let mut assets: Vec<FileAsset> = Vec::new();

        for name in order {
            let Some(stack) = remaining.remove(&name) else {
                continue;
            };
            for asset in stack.assets() {
                if !assets.iter().any(|a| a.hash == asset.hash) {
                    assets.push(asset.clone());
                }
            }
            artifacts.push(StackArtifact {
                stack_name: name.clone(),
                template_file: format!("{name}{TEMPLATE_FILE_SUFFIX}"),
                environment: AGNOSTIC_ENVIRONMENT.to_string(),
                dependencies: dependencies.get(&name).cloned().unwrap_or_default(),
                tags: self.tags.clone(),
                parameters_published: stack.published().cloned().collect(),
                parameters_read: stack.consumed().map(|p| p.key().clone()).collect(),
            });
            tracing::debug!(stack = %name, "emitted template");
            templates.push((name, stack.into_template()));
        }

        Ok(CloudAssembly::new(Manifest::new(artifacts, assets), templates))
    }

    fn entry(&self, id: StackId) -> Result<&StackEntry> {
        if id.app != self.id {
            return Err(StackforgeError::NotFound {
                kind: "stack",
                id: format!("#{} of another app", id.index),
            });
        }
        self.entries.get(id.index).ok_or_else(|| StackforgeError::NotFound {
            kind: "stack",
            id: format!("#{}", id.index),
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use stackforge_common::types::ParameterKey;

    use super::*;
    use crate::template::Resource;

    fn stack(name: &str) -> Stack {
        let mut stack = Stack::new(StackName::new(name).expect("name"));
        let _ = stack
            .add_resource("Topic", Resource::new("AWS::SNS::Topic", json!({})))
            .expect("resource");
        stack
    }

    #[test]
    fn identical_stack_is_registered_once() {
        let mut app = App::new();
        let mut first = stack("app-code");
        let _ = first
            .publish_parameter("Name", ParameterKey::namespaced("app", "repository"), json!("r"), "d")
            .expect("publish");
        let again = first.clone();

        let a = app.add_stack(first).expect("first");
        let b = app.add_stack(again).expect("again");
        assert_eq!(a, b);
        assert_eq!(app.len(), 1);
        assert_eq!(app.parameters().len(), 1);
    }

    #[test]
    fn different_stack_with_same_name_is_rejected() {
        let mut app = App::new();
        let _ = app.add_stack(stack("dup")).expect("first");
        let mut other = stack("dup");
        let _ = other
            .add_resource("Queue", Resource::new("AWS::SQS::Queue", json!({})))
            .expect("resource");
        let err = app.add_stack(other).unwrap_err();
        assert!(matches!(err, StackforgeError::DuplicateStack { .. }), "got: {err}");
    }

    #[test]
    fn consumer_before_producer_is_rejected() {
        let mut producer = stack("producer");
        let param = producer
            .publish_parameter("Name", ParameterKey::namespaced("ns", "x"), json!("v"), "d")
            .expect("publish");
        let mut consumer = stack("consumer");
        let _ = consumer.consume_parameter("x", &param).expect("consume");

        let mut app = App::new();
        let err = app.add_stack(consumer).unwrap_err();
        assert!(matches!(err, StackforgeError::UnresolvedParameter { .. }), "got: {err}");
        assert!(app.is_empty());
    }

    #[test]
    fn key_published_by_two_stacks_conflicts() {
        let mut app = App::new();
        let key = ParameterKey::namespaced("ns", "x");
        let mut a = stack("a");
        let _ = a
            .publish_parameter("Name", key.clone(), json!("1"), "d")
            .expect("publish");
        let mut b = stack("b");
        let _ = b.publish_parameter("Name", key, json!("2"), "d").expect("publish");

        let _ = app.add_stack(a).expect("a");
        let err = app.add_stack(b).unwrap_err();
        assert!(matches!(err, StackforgeError::ParameterConflict { .. }), "got: {err}");
        assert_eq!(app.len(), 1);
    }

    #[test]
    fn foreign_handle_is_not_found() {
        let mut other = App::new();
        let _ = other.add_stack(stack("x")).expect("x");
        let foreign = other.add_stack(stack("y")).expect("y");

        let mut app = App::new();
        let local = app.add_stack(stack("z")).expect("z");
        let err = app.add_dependency(local, foreign).unwrap_err();
        assert!(matches!(err, StackforgeError::NotFound { .. }), "got: {err}");
    }

    #[test]
    fn foreign_handle_with_local_index_is_not_found() {
        let mut other = App::new();
        let foreign = other.add_stack(stack("other-build")).expect("other");

        let mut app = App::new();
        let _ = app.add_stack(stack("local-a")).expect("a");
        let local_b = app.add_stack(stack("local-b")).expect("b");

        let err = app.add_dependency(local_b, foreign).unwrap_err();
        assert!(matches!(err, StackforgeError::NotFound { .. }), "got: {err}");
        assert!(app.dependency_edges().is_empty());
        assert!(app.stack(foreign).is_none());
        assert!(app.dependencies_of(foreign).is_empty());
    }

    #[test]
    fn synth_orders_manifest_by_dependencies() {
        let mut app = App::with_tags(BTreeMap::from([("team".to_string(), "ci".to_string())]));
        let later = app.add_stack(stack("later")).expect("later");
        let earlier = app.add_stack(stack("earlier")).expect("earlier");
        app.add_dependency(later, earlier).expect("edge");

        let assembly = app.synth().expect("synth");
        let names: Vec<&str> = assembly
            .manifest()
            .stacks
            .iter()
            .map(|s| s.stack_name.as_str())
            .collect();
        assert_eq!(names, vec!["earlier", "later"]);
        let later = &assembly.manifest().stacks[1];
        assert_eq!(later.dependencies, vec![StackName::new("earlier").expect("name")]);
        assert_eq!(later.template_file, "later.template.json");
        assert_eq!(later.tags.get("team").map(String::as_str), Some("ci"));
    }

    #[test]
    fn synth_rejects_cycle() {
        let mut app = App::new();
        let a = app.add_stack(stack("a")).expect("a");
        let b = app.add_stack(stack("b")).expect("b");
        app.add_dependency(a, b).expect("edge");
        app.add_dependency(b, a).expect("edge");
        assert!(app.synth().is_err());
    }
}
