//! Synthesis of a composition graph into a provisioning plan.
//!
//! Synthesis is a pure function over the graph: it orders the stacks,
//! checks every token against that order, and emits a flattened plan with
//! tokens replaced by placeholders. Nothing is provisioned here; an external
//! driver consumes the plan.

use std::collections::BTreeMap;

use cairn_common::constants::PLAN_FORMAT_VERSION;
use cairn_common::error::{CairnError, Result};
use cairn_common::types::{NodeOrigin, ResourceKind};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::graph::{CompositionGraph, EdgeCause};
use crate::node::ResourceNode;
use crate::order;
use crate::stack::Stack;
use crate::token::{AttributeValue, OutputToken};

/// Attribute value as it appears in a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PlannedValue {
    /// Passed through unchanged.
    Concrete(Value),
    /// Substituted by the driver once the producer is provisioned.
    Reference(PlannedReference),
    /// Ordered collection.
    List(Vec<PlannedValue>),
    /// Keyed collection.
    Map(BTreeMap<String, PlannedValue>),
}

/// A validated token in a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedReference {
    /// Placeholder string, e.g. `${Balancer.alb.dnsName}`.
    #[serde(rename = "ref")]
    pub placeholder: String,
    /// Producer stack.
    pub stack: String,
    /// Producer node.
    pub node: String,
    /// Produced attribute.
    pub attribute: String,
    /// Value pinned at declaration, when the producer chose it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pinned: Option<Value>,
}

/// A node with its attributes resolved for the plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedNode {
    /// Node id.
    pub id: String,
    /// Resource kind.
    pub kind: ResourceKind,
    /// Managed or imported.
    pub origin: NodeOrigin,
    /// Attribute views keyed by name.
    pub attributes: BTreeMap<String, PlannedValue>,
}

/// One stack in deployment position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedStack {
    /// Stack name.
    pub name: String,
    /// Zero-based deployment position.
    pub position: usize,
    /// Stacks that must be provisioned first, in plan order.
    pub depends_on: Vec<String>,
    /// Nodes in declaration order.
    pub nodes: Vec<PlannedNode>,
}

/// An edge that constrained the order, with its causes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedEdge {
    /// Dependency stack.
    pub from: String,
    /// Dependent stack.
    pub to: String,
    /// Why the edge exists.
    pub causes: Vec<EdgeCause>,
}

/// Ordered, validated output of synthesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisioningPlan {
    /// Plan format version.
    pub version: u32,
    /// Stacks in deployment order.
    pub stacks: Vec<PlannedStack>,
    /// Stack edges, sorted by plan position of their endpoints.
    pub edges: Vec<PlannedEdge>,
}

impl ProvisioningPlan {
    /// Stack names in deployment order.
    #[must_use]
    pub fn order(&self) -> Vec<&str> {
        self.stacks.iter().map(|s| s.name.as_str()).collect()
    }

    /// Looks up a planned stack by name.
    #[must_use]
    pub fn stack(&self, name: &str) -> Option<&PlannedStack> {
        self.stacks.iter().find(|s| s.name == name)
    }

    /// Total number of nodes across all stacks.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.stacks.iter().map(|s| s.nodes.len()).sum()
    }

    /// Pretty-printed JSON form of the plan.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// SHA-256 of the compact JSON form, hex encoded.
    ///
    /// Identical graphs produce identical fingerprints, so the value can key
    /// plan caches and diffs.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn fingerprint(&self) -> Result<String> {
        let bytes = serde_json::to_vec(self)?;
        Ok(format!("{:x}", Sha256::digest(&bytes)))
    }
}

/// Orders and validates a graph into a provisioning plan.
///
/// # Errors
///
/// - `CyclicDependency` if the stack graph is not a DAG.
/// - `UnresolvableToken` if a token refers to an unregistered stack, a
///   missing node or attribute, or a stack ordered after its consumer.
pub fn synthesize(graph: &CompositionGraph) -> Result<ProvisioningPlan> {
    let order = order::order_indices(graph)?;

    let mut plan_position = vec![usize::MAX; graph.stacks().len()];
    for (position, &idx) in order.iter().enumerate() {
        plan_position[idx] = position;
    }

    let indexed_edges = graph.indexed_edges();
    let mut stacks = Vec::with_capacity(order.len());
    for (position, &idx) in order.iter().enumerate() {
        let Some(stack) = graph.stacks().get(idx) else {
            continue;
        };
        let resolver = Resolver {
            graph,
            plan_position: &plan_position,
            consumer: stack,
            consumer_position: position,
        };
        let nodes = stack
            .nodes()
            .iter()
            .map(|node| resolver.node(node))
            .collect::<Result<Vec<_>>>()?;

        let mut dependencies: Vec<usize> = indexed_edges
            .keys()
            .filter(|&&(_, to)| to == idx)
            .map(|&(from, _)| from)
            .collect();
        dependencies.sort_by_key(|&from| plan_position[from]);

        stacks.push(PlannedStack {
            name: stack.name().to_string(),
            position,
            depends_on: dependencies
                .into_iter()
                .filter_map(|from| graph.stacks().get(from))
                .map(|s| s.name().to_string())
                .collect(),
            nodes,
        });
    }

    let mut edges: Vec<((usize, usize), PlannedEdge)> = indexed_edges
        .into_iter()
        .filter_map(|((from, to), causes)| {
            let edge = PlannedEdge {
                from: graph.stacks().get(from)?.name().to_string(),
                to: graph.stacks().get(to)?.name().to_string(),
                causes,
            };
            Some(((plan_position[from], plan_position[to]), edge))
        })
        .collect();
    edges.sort_by_key(|(key, _)| *key);

    let plan = ProvisioningPlan {
        version: PLAN_FORMAT_VERSION,
        stacks,
        edges: edges.into_iter().map(|(_, edge)| edge).collect(),
    };
    tracing::info!(
        stacks = plan.stacks.len(),
        nodes = plan.node_count(),
        edges = plan.edges.len(),
        "synthesized provisioning plan"
    );
    Ok(plan)
}

struct Resolver<'a> {
    graph: &'a CompositionGraph,
    plan_position: &'a [usize],
    consumer: &'a Stack,
    consumer_position: usize,
}

impl Resolver<'_> {
    fn node(&self, node: &ResourceNode) -> Result<PlannedNode> {
        let attributes = node
            .attributes()
            .iter()
            .map(|(name, value)| Ok((name.clone(), self.value(node, name, value)?)))
            .collect::<Result<BTreeMap<_, _>>>()?;
        Ok(PlannedNode {
            id: node.id().to_string(),
            kind: node.kind(),
            origin: node.origin().clone(),
            attributes,
        })
    }

    fn value(
        &self,
        node: &ResourceNode,
        attribute: &str,
        value: &AttributeValue,
    ) -> Result<PlannedValue> {
        match value {
            AttributeValue::Concrete(v) => Ok(PlannedValue::Concrete(v.clone())),
            AttributeValue::List(items) => items
                .iter()
                .map(|item| self.value(node, attribute, item))
                .collect::<Result<Vec<_>>>()
                .map(PlannedValue::List),
            AttributeValue::Map(entries) => entries
                .iter()
                .map(|(key, item)| Ok((key.clone(), self.value(node, attribute, item)?)))
                .collect::<Result<BTreeMap<_, _>>>()
                .map(PlannedValue::Map),
            AttributeValue::Token(token) => {
                self.check_token(node, attribute, token)?;
                Ok(PlannedValue::Reference(PlannedReference {
                    placeholder: token.placeholder(),
                    stack: token.stack().to_string(),
                    node: token.node().to_string(),
                    attribute: token.attribute().to_owned(),
                    pinned: token.resolved().cloned(),
                }))
            }
        }
    }

    /// Checks the ordering invariant edge derivation is supposed to guarantee.
    fn check_token(&self, node: &ResourceNode, attribute: &str, token: &OutputToken) -> Result<()> {
        let unresolvable = |reason: String| CairnError::UnresolvableToken {
            consumer: format!("{}.{}.{attribute}", self.consumer.name(), node.id()),
            token: token.placeholder(),
            producer_stack: token.stack().to_string(),
            consumer_stack: self.consumer.name().to_string(),
            reason,
        };

        let Some(producer_idx) = self.graph.position(token.stack().as_str()) else {
            return Err(unresolvable("producer stack is not registered".into()));
        };
        let producer_position = self.plan_position[producer_idx];
        if producer_position > self.consumer_position {
            return Err(unresolvable(format!(
                "producer is ordered at position {producer_position}, after its consumer at {}",
                self.consumer_position
            )));
        }

        let producer_stack = &self.graph.stacks()[producer_idx];
        let Some(producer) = producer_stack.node(token.node().as_str()) else {
            return Err(unresolvable("producer node does not exist".into()));
        };
        if producer_stack
            .catalog()
            .availability(producer.kind(), token.attribute())
            .is_none()
        {
            return Err(unresolvable(format!(
                "kind {} does not expose attribute {}",
                producer.kind(),
                token.attribute()
            )));
        }
        Ok(())
    }
}
