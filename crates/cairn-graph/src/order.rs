//! Cycle detection and deterministic deployment ordering.
//!
//! Cycles are found with a three-colour depth-first traversal so the full
//! cycle path can be reported. The order itself is a stable topological
//! sort: whenever several stacks are ready, the one registered first goes
//! first.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use cairn_common::error::{CairnError, Result};
use cairn_common::types::StackName;

use crate::graph::CompositionGraph;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Adjacency lists over registration indices, successors sorted ascending.
fn adjacency(graph: &CompositionGraph) -> Vec<Vec<usize>> {
    let mut successors = vec![Vec::new(); graph.stacks().len()];
    for (from, to) in graph.indexed_edges().into_keys() {
        if let Some(list) = successors.get_mut(from) {
            list.push(to);
        }
    }
    successors
}

/// Returns the first cycle found, as registration indices in edge order.
fn find_cycle(successors: &[Vec<usize>]) -> Option<Vec<usize>> {
    let mut marks = vec![Mark::Unvisited; successors.len()];
    let mut path = Vec::new();
    (0..successors.len()).find_map(|root| visit(root, successors, &mut marks, &mut path))
}

fn visit(
    current: usize,
    successors: &[Vec<usize>],
    marks: &mut [Mark],
    path: &mut Vec<usize>,
) -> Option<Vec<usize>> {
    match marks.get(current).copied() {
        Some(Mark::Unvisited) => {}
        Some(Mark::InProgress) => {
            let start = path.iter().position(|&idx| idx == current)?;
            return path.get(start..).map(<[usize]>::to_vec);
        }
        Some(Mark::Done) | None => return None,
    }

    marks[current] = Mark::InProgress;
    path.push(current);
    for &next in successors.get(current).map_or(&[][..], Vec::as_slice) {
        if let Some(cycle) = visit(next, successors, marks, path) {
            return Some(cycle);
        }
    }
    let _ = path.pop();
    marks[current] = Mark::Done;
    None
}

/// Kahn's algorithm with a min-heap on registration index.
fn stable_topological_order(successors: &[Vec<usize>]) -> Vec<usize> {
    let mut in_degree = vec![0_usize; successors.len()];
    for targets in successors {
        for &to in targets {
            in_degree[to] += 1;
        }
    }

    let mut ready: BinaryHeap<Reverse<usize>> = in_degree
        .iter()
        .enumerate()
        .filter(|&(_, &degree)| degree == 0)
        .map(|(idx, _)| Reverse(idx))
        .collect();

    let mut order = Vec::with_capacity(successors.len());
    while let Some(Reverse(idx)) = ready.pop() {
        order.push(idx);
        for &to in &successors[idx] {
            in_degree[to] -= 1;
            if in_degree[to] == 0 {
                ready.push(Reverse(to));
            }
        }
    }
    order
}

/// Computes the registration indices of all stacks in deployment order.
pub(crate) fn order_indices(graph: &CompositionGraph) -> Result<Vec<usize>> {
    let successors = adjacency(graph);

    if let Some(cycle) = find_cycle(&successors) {
        let path: Vec<String> = cycle
            .iter()
            .filter_map(|&idx| graph.stacks().get(idx))
            .map(|stack| stack.name().to_string())
            .collect();
        tracing::warn!(cycle = ?path, "cyclic dependency detected");
        return Err(CairnError::CyclicDependency { path });
    }

    Ok(stable_topological_order(&successors))
}

/// Returns the deployment order of all registered stacks.
///
/// Dependencies come before their dependents; stacks with no ordering
/// constraint between them keep their registration order.
///
/// # Errors
///
/// Returns `CyclicDependency` listing every stack on the first cycle found.
pub fn deployment_order(graph: &CompositionGraph) -> Result<Vec<StackName>> {
    Ok(order_indices(graph)?
        .into_iter()
        .filter_map(|idx| graph.stacks().get(idx))
        .map(|stack| stack.name().clone())
        .collect())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::catalog::ResourceCatalog;
    use crate::stack::Stack;

    fn graph_of(names: &[&str], deps: &[(&str, &str)]) -> CompositionGraph {
        let catalog = Arc::new(ResourceCatalog::aws());
        let mut graph = CompositionGraph::new();
        for name in names {
            graph
                .add_stack(Stack::new(*name, Arc::clone(&catalog)))
                .expect("add stack");
        }
        for (dependent, dependency) in deps {
            graph
                .declare_dependency(dependent, dependency)
                .expect("declare");
        }
        graph
    }

    fn names(order: &[StackName]) -> Vec<&str> {
        order.iter().map(StackName::as_str).collect()
    }

    #[test]
    fn empty_graph_resolves_to_empty() {
        let graph = CompositionGraph::new();
        let order = deployment_order(&graph).expect("should resolve");
        assert!(order.is_empty());
    }

    #[test]
    fn unconstrained_stacks_keep_registration_order() {
        let graph = graph_of(&["z", "a", "m"], &[]);
        let order = deployment_order(&graph).expect("should resolve");
        assert_eq!(names(&order), vec!["z", "a", "m"]);
    }

    #[test]
    fn linear_dependency_chain() {
        let graph = graph_of(&["api", "db"], &[("api", "db")]);
        let order = deployment_order(&graph).expect("should resolve");
        assert_eq!(names(&order), vec!["db", "api"]);
    }

    #[test]
    fn ready_stacks_are_taken_by_registration_index() {
        // a waits for c; b is free and registered before c.
        let graph = graph_of(&["a", "b", "c"], &[("a", "c")]);
        let order = deployment_order(&graph).expect("should resolve");
        assert_eq!(names(&order), vec!["b", "c", "a"]);
    }

    #[test]
    fn diamond_dependency() {
        let graph = graph_of(
            &["a", "b", "c", "d"],
            &[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")],
        );
        let order = deployment_order(&graph).expect("should resolve");
        assert_eq!(names(&order), vec!["d", "b", "c", "a"]);
    }

    #[test]
    fn two_node_cycle_lists_both() {
        let graph = graph_of(&["a", "b"], &[("a", "b"), ("b", "a")]);
        let err = deployment_order(&graph).unwrap_err();
        match err {
            CairnError::CyclicDependency { path } => assert_eq!(path, vec!["a", "b"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn long_cycle_lists_exactly_its_members() {
        // entry -> s1 -> s2 -> s3 -> s1, plus an unrelated tail.
        let graph = graph_of(
            &["entry", "s1", "s2", "s3", "tail"],
            &[("s1", "entry"), ("s2", "s1"), ("s3", "s2"), ("s1", "s3"), ("tail", "entry")],
        );
        let err = deployment_order(&graph).unwrap_err();
        match err {
            CairnError::CyclicDependency { mut path } => {
                path.sort();
                assert_eq!(path, vec!["s1", "s2", "s3"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let graph = graph_of(&["solo"], &[("solo", "solo")]);
        let err = deployment_order(&graph).unwrap_err();
        assert!(err.to_string().contains("solo -> solo"), "got: {err}");
    }

    #[test]
    fn order_is_deterministic() {
        let build = || {
            graph_of(
                &["n", "c", "b", "s", "x"],
                &[("c", "n"), ("s", "b"), ("s", "c"), ("x", "n")],
            )
        };
        let first = deployment_order(&build()).expect("first");
        let second = deployment_order(&build()).expect("second");
        assert_eq!(first, second);
        assert_eq!(names(&first), vec!["n", "c", "b", "s", "x"]);
    }
}
