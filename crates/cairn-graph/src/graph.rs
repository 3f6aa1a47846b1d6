//! Composition graph over stacks.
//!
//! Accumulates stacks in registration order and derives the stack-level
//! dependency edges from cross-stack tokens and explicit dependencies.
//! Edges are recomputed on every query because construction may still be in
//! progress.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use cairn_common::error::{CairnError, Result};
use cairn_common::types::{NodeId, StackName};
use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;

use crate::stack::{Stack, TokenReference};
use crate::token::AttributeValue;

/// Why one stack must be provisioned before another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum EdgeCause {
    /// A node of the dependent stack consumes an output of the dependency.
    #[serde(rename_all = "camelCase")]
    Token {
        /// Producer node in the dependency stack.
        producer: NodeId,
        /// Produced attribute.
        output: String,
        /// Consumer node in the dependent stack.
        consumer: NodeId,
        /// Consumer attribute holding the token.
        input: String,
    },
    /// Declared with [`CompositionGraph::declare_dependency`].
    Explicit,
}

impl fmt::Display for EdgeCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token {
                producer,
                output,
                consumer,
                input,
            } => write!(f, "{producer}.{output} -> {consumer}.{input}"),
            Self::Explicit => f.write_str("explicit"),
        }
    }
}

/// Stack-level dependency edge: `from` must be provisioned before `to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edge {
    /// Dependency stack.
    pub from: StackName,
    /// Dependent stack.
    pub to: StackName,
    /// Every reason this edge exists, tokens first in declaration order.
    pub causes: Vec<EdgeCause>,
}

/// Directed graph of stacks built incrementally during composition.
#[derive(Debug, Default)]
pub struct CompositionGraph {
    stacks: Vec<Stack>,
    index: HashMap<StackName, usize>,
}

impl CompositionGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a stack.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateStack` if a stack with that name is already registered.
    pub fn add_stack(&mut self, stack: Stack) -> Result<()> {
        if self.index.contains_key(stack.name()) {
            return Err(CairnError::DuplicateStack {
                name: stack.name().to_string(),
            });
        }
        tracing::debug!(stack = %stack.name(), position = self.stacks.len(), "registered stack");
        let _ = self.index.insert(stack.name().clone(), self.stacks.len());
        self.stacks.push(stack);
        Ok(())
    }

    /// Declares that `dependent` must be provisioned after `dependency`,
    /// even though no token connects them.
    ///
    /// # Errors
    ///
    /// Returns `UnknownStack` if either stack is not registered.
    pub fn declare_dependency(&mut self, dependent: &str, dependency: &str) -> Result<()> {
        let dependency_name = self.require(dependency)?.name().clone();
        let position = self.position(dependent).ok_or_else(|| CairnError::UnknownStack {
            name: dependent.to_owned(),
        })?;
        if let Some(stack) = self.stacks.get_mut(position) {
            if stack.add_explicit_dependency(dependency_name) {
                tracing::debug!(dependent, dependency, "declared explicit dependency");
            }
        }
        Ok(())
    }

    /// Registered stacks in registration order.
    #[must_use]
    pub fn stacks(&self) -> &[Stack] {
        &self.stacks
    }

    /// Looks up a stack by name.
    #[must_use]
    pub fn stack(&self, name: &str) -> Option<&Stack> {
        self.position(name).and_then(|pos| self.stacks.get(pos))
    }

    /// Looks up a stack for further declarations.
    ///
    /// # Errors
    ///
    /// Returns `UnknownStack` if the stack is not registered.
    pub fn stack_mut(&mut self, name: &str) -> Result<&mut Stack> {
        let position = self.position(name).ok_or_else(|| CairnError::UnknownStack {
            name: name.to_owned(),
        })?;
        self.stacks
            .get_mut(position)
            .ok_or_else(|| CairnError::UnknownStack {
                name: name.to_owned(),
            })
    }

    /// Registration index of a stack.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(&StackName::new(name)).copied()
    }

    /// Requests an attribute of a node in a registered stack.
    ///
    /// # Errors
    ///
    /// Returns `UnknownStack`, `UnknownNode`, or `UnknownAttribute`.
    pub fn attribute(&self, stack: &str, node: &str, attribute: &str) -> Result<AttributeValue> {
        self.require(stack)?.attribute(node, attribute)
    }

    fn require(&self, name: &str) -> Result<&Stack> {
        self.stack(name).ok_or_else(|| CairnError::UnknownStack {
            name: name.to_owned(),
        })
    }

    /// Derives the full edge set: cross-stack tokens plus explicit dependencies.
    ///
    /// Tokens whose producer stack is not registered produce no edge; the
    /// synthesizer reports them. Edges are sorted by the registration order of
    /// their endpoints.
    #[must_use]
    pub fn edges(&self) -> Vec<Edge> {
        self.indexed_edges()
            .into_iter()
            .filter_map(|((from, to), causes)| {
                Some(Edge {
                    from: self.stacks.get(from)?.name().clone(),
                    to: self.stacks.get(to)?.name().clone(),
                    causes,
                })
            })
            .collect()
    }

    /// Edge set keyed by `(dependency, dependent)` registration indices.
    pub(crate) fn indexed_edges(&self) -> BTreeMap<(usize, usize), Vec<EdgeCause>> {
        let mut edges: BTreeMap<(usize, usize), Vec<EdgeCause>> = BTreeMap::new();

        for (to, stack) in self.stacks.iter().enumerate() {
            for TokenReference {
                consumer,
                attribute,
                token,
            } in stack.references()
            {
                let Some(from) = self.position(token.stack().as_str()) else {
                    continue;
                };
                if from == to {
                    continue;
                }
                edges.entry((from, to)).or_default().push(EdgeCause::Token {
                    producer: token.node().clone(),
                    output: token.attribute().to_owned(),
                    consumer: consumer.clone(),
                    input: attribute.clone(),
                });
            }
            for dependency in stack.explicit_dependencies() {
                if let Some(from) = self.position(dependency.as_str()) {
                    edges.entry((from, to)).or_default().push(EdgeCause::Explicit);
                }
            }
        }
        edges
    }

    /// Builds a `petgraph` view of the stack graph.
    ///
    /// Node indices follow registration order; each edge weight summarises
    /// its causes.
    #[must_use]
    pub fn to_petgraph(&self) -> DiGraph<String, String> {
        let mut graph = DiGraph::new();
        let indices: Vec<NodeIndex> = self
            .stacks
            .iter()
            .map(|stack| graph.add_node(stack.name().to_string()))
            .collect();

        for ((from, to), causes) in self.indexed_edges() {
            if let (Some(&a), Some(&b)) = (indices.get(from), indices.get(to)) {
                let label = causes
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("\n");
                let _ = graph.add_edge(a, b, label);
            }
        }
        graph
    }

    /// Renders the stack graph in Graphviz DOT format.
    #[must_use]
    pub fn to_dot(&self) -> String {
        let graph = self.to_petgraph();
        format!("{}", Dot::with_config(&graph, &[Config::EdgeNoLabel]))
    }

    /// Renders the stack graph in DOT format with edge causes as labels.
    #[must_use]
    pub fn to_dot_labelled(&self) -> String {
        let graph = self.to_petgraph();
        format!("{}", Dot::new(&graph))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use cairn_common::types::ResourceKind;

    use super::*;
    use crate::catalog::ResourceCatalog;
    use crate::node::ResourceNode;

    fn catalog() -> Arc<ResourceCatalog> {
        Arc::new(ResourceCatalog::aws())
    }

    #[test]
    fn empty_graph_has_no_edges() {
        let graph = CompositionGraph::new();
        assert!(graph.edges().is_empty());
        assert!(graph.stacks().is_empty());
    }

    #[test]
    fn duplicate_stack_rejected() {
        let mut graph = CompositionGraph::new();
        graph
            .add_stack(Stack::new("Network", catalog()))
            .expect("first");
        let err = graph
            .add_stack(Stack::new("Network", catalog()))
            .unwrap_err();
        assert!(matches!(err, CairnError::DuplicateStack { .. }), "got: {err}");
        assert_eq!(graph.stacks().len(), 1);
    }

    #[test]
    fn declare_dependency_on_unknown_stack_fails() {
        let mut graph = CompositionGraph::new();
        graph
            .add_stack(Stack::new("Cluster", catalog()))
            .expect("add");
        let err = graph.declare_dependency("Cluster", "Network").unwrap_err();
        assert!(err.to_string().contains("Network"), "got: {err}");
        let err = graph.declare_dependency("Ghost", "Cluster").unwrap_err();
        assert!(err.to_string().contains("Ghost"), "got: {err}");
    }

    #[test]
    fn explicit_dependency_yields_edge() {
        let mut graph = CompositionGraph::new();
        graph
            .add_stack(Stack::new("Network", catalog()))
            .expect("add");
        graph
            .add_stack(Stack::new("Cluster", catalog()))
            .expect("add");
        graph
            .declare_dependency("Cluster", "Network")
            .expect("declare");
        graph
            .declare_dependency("Cluster", "Network")
            .expect("redeclare is idempotent");

        let edges = graph.edges();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].from.as_str(), "Network");
        assert_eq!(edges[0].to.as_str(), "Cluster");
        assert_eq!(edges[0].causes, vec![EdgeCause::Explicit]);
    }

    #[test]
    fn cross_stack_token_yields_edge_and_same_stack_does_not() {
        let mut network = Stack::new("Network", catalog());
        network
            .declare(ResourceNode::new("vpc", ResourceKind::Network))
            .expect("vpc");
        let vpc_id = network.output("vpc", "vpcId").expect("token");
        network
            .declare(ResourceNode::new("sg", ResourceKind::SecurityGroup).with("vpcId", &vpc_id))
            .expect("sg");

        let mut balancer = Stack::new("Balancer", catalog());
        balancer
            .declare(ResourceNode::new("alb", ResourceKind::LoadBalancer).with("vpcId", &vpc_id))
            .expect("alb");

        let mut graph = CompositionGraph::new();
        graph.add_stack(network).expect("add");
        graph.add_stack(balancer).expect("add");

        let edges = graph.edges();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].from.as_str(), "Network");
        assert_eq!(edges[0].to.as_str(), "Balancer");
        assert_eq!(edges[0].causes[0].to_string(), "vpc.vpcId -> alb.vpcId");
    }

    #[test]
    fn edges_recomputed_after_mutation() {
        let mut graph = CompositionGraph::new();
        graph
            .add_stack(Stack::new("Network", catalog()))
            .expect("add");
        graph
            .add_stack(Stack::new("Balancer", catalog()))
            .expect("add");
        assert!(graph.edges().is_empty());

        graph
            .stack_mut("Network")
            .expect("network")
            .declare(ResourceNode::new("vpc", ResourceKind::Network))
            .expect("vpc");
        let vpc_id = graph.attribute("Network", "vpc", "vpcId").expect("token");
        graph
            .stack_mut("Balancer")
            .expect("balancer")
            .declare(ResourceNode::new("alb", ResourceKind::LoadBalancer).with("vpcId", vpc_id))
            .expect("alb");

        assert_eq!(graph.edges().len(), 1);
    }

    #[test]
    fn token_and_explicit_causes_merge() {
        let mut network = Stack::new("Network", catalog());
        network
            .declare(ResourceNode::new("vpc", ResourceKind::Network))
            .expect("vpc");
        let vpc_id = network.output("vpc", "vpcId").expect("token");
        let mut cluster = Stack::new("Cluster", catalog());
        cluster
            .declare(ResourceNode::new("ecs", ResourceKind::Compute).with("vpcId", vpc_id))
            .expect("ecs");

        let mut graph = CompositionGraph::new();
        graph.add_stack(network).expect("add");
        graph.add_stack(cluster).expect("add");
        graph
            .declare_dependency("Cluster", "Network")
            .expect("declare");

        let edges = graph.edges();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].causes.len(), 2);
        assert_eq!(edges[0].causes[1], EdgeCause::Explicit);
    }

    #[test]
    fn dot_output_lists_stacks() {
        let mut graph = CompositionGraph::new();
        graph
            .add_stack(Stack::new("Network", catalog()))
            .expect("add");
        graph
            .add_stack(Stack::new("Cluster", catalog()))
            .expect("add");
        graph
            .declare_dependency("Cluster", "Network")
            .expect("declare");

        let dot = graph.to_dot();
        assert!(dot.starts_with("digraph"), "got: {dot}");
        assert!(dot.contains("Network"));
        assert!(dot.contains("0 -> 1"), "got: {dot}");
    }

    #[test]
    fn token_read_through_intermediate_node_orders_after_it() {
        let mut network = Stack::new("Network", catalog());
        network
            .declare(ResourceNode::new("vpc", ResourceKind::Network))
            .expect("vpc");
        let vpc_id = network.output("vpc", "vpcId").expect("token");

        let mut cluster = Stack::new("Cluster", catalog());
        cluster
            .declare(ResourceNode::new("ecs", ResourceKind::Compute).with("vpcId", vpc_id))
            .expect("ecs");
        let cluster_vpc = cluster.output("ecs", "vpcId").expect("token");

        let mut sg = Stack::new("Sg", catalog());
        sg.declare(ResourceNode::new("sg", ResourceKind::SecurityGroup).with("vpcId", cluster_vpc))
            .expect("sg");

        let mut graph = CompositionGraph::new();
        graph.add_stack(network).expect("add");
        graph.add_stack(sg).expect("add");
        graph.add_stack(cluster).expect("add");

        let edges = graph.edges();
        assert!(
            edges
                .iter()
                .any(|e| e.from.as_str() == "Cluster" && e.to.as_str() == "Sg"),
            "got: {edges:?}"
        );
        let order = crate::order::deployment_order(&graph).expect("order");
        let names: Vec<&str> = order.iter().map(StackName::as_str).collect();
        assert_eq!(names, vec!["Network", "Cluster", "Sg"]);
    }

    #[test]
    fn labelled_dot_puts_each_cause_on_its_own_line() {
        let mut network = Stack::new("Network", catalog());
        network
            .declare(ResourceNode::new("vpc", ResourceKind::Network))
            .expect("vpc");
        let vpc_id = network.output("vpc", "vpcId").expect("token");
        let mut cluster = Stack::new("Cluster", catalog());
        cluster
            .declare(ResourceNode::new("ecs", ResourceKind::Compute).with("vpcId", vpc_id))
            .expect("ecs");

        let mut graph = CompositionGraph::new();
        graph.add_stack(network).expect("add");
        graph.add_stack(cluster).expect("add");
        graph
            .declare_dependency("Cluster", "Network")
            .expect("declare");

        let dot = graph.to_dot_labelled();
        assert!(dot.contains("vpc.vpcId -> ecs.vpcId\\lexplicit"), "got: {dot}");
        assert!(!dot.contains("\\\\n"), "got: {dot}");
    }
}
