//! Integration tests for graph construction and plan synthesis.
//!
//! These tests drive the public API end to end:
//! 1. Declare nodes and pass tokens between stacks
//! 2. Register stacks and explicit dependencies
//! 3. Synthesize and check ordering, cycles, and determinism

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use std::collections::BTreeMap;
use std::sync::Arc;

use cairn_common::error::CairnError;
use cairn_common::types::ResourceKind;
use cairn_graph::synth::PlannedValue;
use cairn_graph::{
    Availability, CompositionGraph, KindSchema, ResourceCatalog, ResourceNode, Stack, synthesize,
};

fn schema(entries: &[(&str, Availability)]) -> KindSchema {
    KindSchema {
        attributes: entries
            .iter()
            .map(|(name, availability)| ((*name).to_owned(), *availability))
            .collect::<BTreeMap<_, _>>(),
    }
}

/// Minimal catalog where the load balancer itself exposes its listener ARN.
fn walkthrough_catalog() -> Arc<ResourceCatalog> {
    Arc::new(
        ResourceCatalog::new()
            .with_kind(
                ResourceKind::Network,
                schema(&[("cidr", Availability::Declared), ("vpcId", Availability::Deferred)]),
            )
            .with_kind(
                ResourceKind::Compute,
                schema(&[("arn", Availability::Deferred)]),
            )
            .with_kind(
                ResourceKind::LoadBalancer,
                schema(&[("listenerArn", Availability::Deferred)]),
            )
            .with_kind(
                ResourceKind::Service,
                schema(&[("listenerArn", Availability::Declared)]),
            ),
    )
}

// ── Walkthrough ──────────────────────────────────────────────────────

#[test]
fn network_cluster_balancer_service_order() {
    let catalog = walkthrough_catalog();

    let mut network = Stack::new("Network", Arc::clone(&catalog));
    network
        .declare(ResourceNode::new("vpc", ResourceKind::Network).with("cidr", "10.0.0.0/16"))
        .expect("vpc");

    let mut cluster = Stack::new("Cluster", Arc::clone(&catalog));
    cluster
        .declare(ResourceNode::new("ecs", ResourceKind::Compute))
        .expect("ecs");

    let mut balancer = Stack::new("Balancer", Arc::clone(&catalog));
    balancer
        .declare(ResourceNode::new("alb", ResourceKind::LoadBalancer))
        .expect("alb");
    let listener_arn = balancer.output("alb", "listenerArn").expect("token");

    let mut service = Stack::new("Service", Arc::clone(&catalog));
    service
        .declare(ResourceNode::new("svc", ResourceKind::Service).with("listenerArn", listener_arn))
        .expect("svc");

    let mut graph = CompositionGraph::new();
    graph.add_stack(network).expect("add");
    graph.add_stack(cluster).expect("add");
    graph.add_stack(balancer).expect("add");
    graph.add_stack(service).expect("add");
    graph
        .declare_dependency("Cluster", "Network")
        .expect("declare");

    let plan = synthesize(&graph).expect("synthesize");
    assert_eq!(plan.order(), vec!["Network", "Cluster", "Balancer", "Service"]);

    let svc = &plan.stack("Service").expect("service").nodes[0];
    let PlannedValue::Reference(reference) = &svc.attributes["listenerArn"] else {
        panic!("listenerArn should be a reference");
    };
    assert_eq!(reference.placeholder, "${Balancer.alb.listenerArn}");
    assert_eq!(plan.stack("Service").expect("service").depends_on, vec!["Balancer"]);
}

#[test]
fn token_edge_orders_producer_first_without_explicit_dependency() {
    let catalog = walkthrough_catalog();

    let mut balancer = Stack::new("Balancer", Arc::clone(&catalog));
    balancer
        .declare(ResourceNode::new("alb", ResourceKind::LoadBalancer))
        .expect("alb");
    let listener_arn = balancer.output("alb", "listenerArn").expect("token");

    let mut service = Stack::new("Service", Arc::clone(&catalog));
    service
        .declare(ResourceNode::new("svc", ResourceKind::Service).with("listenerArn", listener_arn))
        .expect("svc");

    // Consumer registered first on purpose.
    let mut graph = CompositionGraph::new();
    graph.add_stack(service).expect("add");
    graph.add_stack(balancer).expect("add");

    let edges = graph.edges();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].from.as_str(), "Balancer");
    assert_eq!(edges[0].to.as_str(), "Service");

    let plan = synthesize(&graph).expect("synthesize");
    assert_eq!(plan.order(), vec!["Balancer", "Service"]);
}

// ── Cycles ───────────────────────────────────────────────────────────

#[test]
fn mutual_token_references_are_cyclic() {
    let catalog = Arc::new(ResourceCatalog::aws());

    let mut a = Stack::new("A", Arc::clone(&catalog));
    a.declare(ResourceNode::new("role", ResourceKind::Role))
        .expect("role");
    let role_arn = a.output("role", "arn").expect("token");

    let mut b = Stack::new("B", Arc::clone(&catalog));
    b.declare(ResourceNode::new("fn", ResourceKind::Function).with("roleArn", role_arn))
        .expect("fn");
    let fn_arn = b.output("fn", "arn").expect("token");

    a.declare(
        ResourceNode::new("policy", ResourceKind::Role)
            .with("policyStatements", vec![cairn_graph::AttributeValue::from(fn_arn)]),
    )
    .expect("policy");

    let mut graph = CompositionGraph::new();
    graph.add_stack(a).expect("add");
    graph.add_stack(b).expect("add");

    match synthesize(&graph).unwrap_err() {
        CairnError::CyclicDependency { path } => assert_eq!(path, vec!["A", "B"]),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn cycle_through_explicit_and_token_edges_lists_every_member() {
    let catalog = Arc::new(ResourceCatalog::aws());

    let mut s1 = Stack::new("S1", Arc::clone(&catalog));
    s1.declare(ResourceNode::new("vpc", ResourceKind::Network))
        .expect("vpc");
    let vpc_id = s1.output("vpc", "vpcId").expect("token");

    let mut s2 = Stack::new("S2", Arc::clone(&catalog));
    s2.declare(ResourceNode::new("ecs", ResourceKind::Compute).with("vpcId", vpc_id))
        .expect("ecs");

    let mut graph = CompositionGraph::new();
    graph
        .add_stack(Stack::new("Root", Arc::clone(&catalog)))
        .expect("add");
    graph.add_stack(s1).expect("add");
    graph.add_stack(s2).expect("add");
    graph
        .add_stack(Stack::new("S3", Arc::clone(&catalog)))
        .expect("add");
    graph.declare_dependency("S1", "Root").expect("declare");
    graph.declare_dependency("S3", "S2").expect("declare");
    graph.declare_dependency("S1", "S3").expect("declare");

    match synthesize(&graph).unwrap_err() {
        CairnError::CyclicDependency { path } => assert_eq!(path, vec!["S1", "S2", "S3"]),
        other => panic!("unexpected error: {other}"),
    }
}

// ── Ordering properties ──────────────────────────────────────────────

/// Small deterministic generator so the property runs over many shapes.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        self.0 >> 33
    }
}

fn random_dag(seed: u64, size: usize) -> CompositionGraph {
    let catalog = Arc::new(ResourceCatalog::aws());
    let mut rng = Lcg(seed);
    let mut graph = CompositionGraph::new();
    // Registration order is a shuffled rank order, so edges point both ways
    // in registration terms while staying acyclic by rank.
    let mut ranks: Vec<usize> = (0..size).collect();
    for i in (1..size).rev() {
        let j = usize::try_from(rng.next()).unwrap_or(0) % (i + 1);
        ranks.swap(i, j);
    }
    for rank in &ranks {
        graph
            .add_stack(Stack::new(format!("s{rank}"), Arc::clone(&catalog)))
            .expect("add");
    }
    for dependent in 0..size {
        for dependency in 0..dependent {
            if rng.next() % 4 == 0 {
                graph
                    .declare_dependency(&format!("s{dependent}"), &format!("s{dependency}"))
                    .expect("declare");
            }
        }
    }
    graph
}

#[test]
fn every_edge_respects_plan_order() {
    for seed in 0..40 {
        let graph = random_dag(seed, 12);
        let plan = synthesize(&graph).expect("acyclic graph should synthesize");
        let order = plan.order();
        assert_eq!(order.len(), 12);
        let pos = |name: &str| order.iter().position(|n| *n == name).expect(name);
        for edge in graph.edges() {
            assert!(
                pos(edge.from.as_str()) < pos(edge.to.as_str()),
                "seed {seed}: {} must precede {} in {order:?}",
                edge.from,
                edge.to
            );
        }
    }
}

#[test]
fn synthesis_is_deterministic() {
    for seed in 0..10 {
        let first = synthesize(&random_dag(seed, 10)).expect("first");
        let second = synthesize(&random_dag(seed, 10)).expect("second");
        assert_eq!(first.order(), second.order());
        assert_eq!(
            first.fingerprint().expect("fingerprint"),
            second.fingerprint().expect("fingerprint")
        );
    }
}

// ── Declaration errors ───────────────────────────────────────────────

#[test]
fn duplicate_node_leaves_registered_stack_unchanged() {
    let catalog = Arc::new(ResourceCatalog::aws());
    let mut graph = CompositionGraph::new();
    graph
        .add_stack(Stack::new("Network", catalog))
        .expect("add");

    let network = graph.stack_mut("Network").expect("network");
    network
        .declare(ResourceNode::new("vpc", ResourceKind::Network).with("cidr", "10.0.0.0/16"))
        .expect("vpc");
    let err = network
        .declare(ResourceNode::new("vpc", ResourceKind::Network).with("cidr", "10.1.0.0/16"))
        .unwrap_err();
    assert!(matches!(err, CairnError::DuplicateNode { .. }), "got: {err}");

    let stack = graph.stack("Network").expect("network");
    assert_eq!(stack.nodes().len(), 1);
    let cidr = graph
        .attribute("Network", "vpc", "cidr")
        .expect("cidr");
    assert_eq!(cidr.as_concrete().and_then(|v| v.as_str()), Some("10.0.0.0/16"));
}

#[test]
fn unknown_stack_in_attribute_lookup() {
    let graph = CompositionGraph::new();
    let err = graph.attribute("Ghost", "vpc", "vpcId").unwrap_err();
    assert!(matches!(err, CairnError::UnknownStack { .. }), "got: {err}");
}
