//! Dependency graph algorithms.
//!
//! Free functions over [`PortfolioInner`]'s petgraph state, composed by the
//! trait methods under one lock hold. Edge direction is always
//! prerequisite -> dependent.

use std::collections::HashSet;

use petgraph::algo;
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::domain::{DependencyEdge, EdgeKind, ItemId};
use crate::error::{Error, Result};

use super::inner::PortfolioInner;

/// Look up the graph node for an item, or fail with `ItemNotFound`.
pub(crate) fn node_of(inner: &PortfolioInner, id: ItemId) -> Result<petgraph::graph::NodeIndex> {
    inner
        .node_map
        .get(&id)
        .copied()
        .ok_or(Error::ItemNotFound(id))
}

/// Whether adding prerequisite -> dependent would close a cycle.
///
/// True iff a path already runs dependent -> prerequisite, regardless of the
/// edge kinds along it.
pub(crate) fn would_close_cycle(
    inner: &PortfolioInner,
    prerequisite: ItemId,
    dependent: ItemId,
) -> Result<bool> {
    let from = node_of(inner, dependent)?;
    let to = node_of(inner, prerequisite)?;
    Ok(algo::has_path_connecting(&inner.graph, from, to, None))
}

/// Prerequisites attached via `Blocks` edges, ordered by id.
pub(crate) fn blockers_of(inner: &PortfolioInner, item: ItemId) -> Result<Vec<ItemId>> {
    let node = node_of(inner, item)?;
    let mut result: Vec<ItemId> = inner
        .graph
        .edges_directed(node, Direction::Incoming)
        .filter(|e| *e.weight() == EdgeKind::Blocks)
        .map(|e| inner.graph[e.source()])
        .collect();
    result.sort_unstable();
    Ok(result)
}

/// Direct dependents, optionally filtered by edge kind, ordered by id.
pub(crate) fn downstream_of(
    inner: &PortfolioInner,
    item: ItemId,
    kind: Option<EdgeKind>,
) -> Result<Vec<ItemId>> {
    let node = node_of(inner, item)?;
    let mut result: Vec<ItemId> = inner
        .graph
        .edges_directed(node, Direction::Outgoing)
        .filter(|e| kind.is_none_or(|k| *e.weight() == k))
        .map(|e| inner.graph[e.target()])
        .collect();
    result.sort_unstable();
    Ok(result)
}

/// The transitive prerequisite closure of an item, any edge kind, ordered by
/// discovery depth then id. The item itself is not included.
pub(crate) fn upstream_chain(inner: &PortfolioInner, item: ItemId) -> Result<Vec<ItemId>> {
    let start = node_of(inner, item)?;

    let mut seen: HashSet<ItemId> = HashSet::from([item]);
    let mut result = Vec::new();
    let mut frontier = vec![start];

    while !frontier.is_empty() {
        let mut level: Vec<ItemId> = Vec::new();
        let mut next = Vec::new();
        for node in frontier {
            for edge in inner.graph.edges_directed(node, Direction::Incoming) {
                let upstream = inner.graph[edge.source()];
                if seen.insert(upstream) {
                    level.push(upstream);
                    next.push(edge.source());
                }
            }
        }
        level.sort_unstable();
        result.extend(level);
        frontier = next;
    }

    Ok(result)
}

/// All edges, ordered by `(prerequisite, dependent)`.
pub(crate) fn all_edges(inner: &PortfolioInner) -> Vec<DependencyEdge> {
    let mut edges: Vec<DependencyEdge> = inner
        .graph
        .edge_references()
        .map(|e| DependencyEdge {
            prerequisite: inner.graph[e.source()],
            dependent: inner.graph[e.target()],
            kind: *e.weight(),
        })
        .collect();
    edges.sort_unstable_by_key(|e| (e.prerequisite, e.dependent));
    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ItemStatus, PrincipalId, StreamId, WorkItem, Workstream};

    fn build(items: &[i64], edges: &[(i64, i64, EdgeKind)]) -> PortfolioInner {
        let mut inner = PortfolioInner::new(3);
        inner.insert_stream(Workstream {
            id: StreamId::new(1),
            name: "root".to_string(),
            parent: None,
            depth: 1,
            owner: PrincipalId::new(1),
        });
        for &id in items {
            inner.insert_item(WorkItem {
                id: ItemId::new(id),
                stream: StreamId::new(1),
                name: format!("i{id}"),
                status: ItemStatus::Pending,
                target_date: None,
                owner: None,
            });
        }
        for &(from, to, kind) in edges {
            let a = inner.node_map[&ItemId::new(from)];
            let b = inner.node_map[&ItemId::new(to)];
            inner.graph.add_edge(a, b, kind);
        }
        inner
    }

    fn raw(ids: &[ItemId]) -> Vec<i64> {
        ids.iter().map(|i| i.0).collect()
    }

    #[test]
    fn test_cycle_detection_transitive() {
        let inner = build(
            &[1, 2, 3],
            &[(1, 2, EdgeKind::Blocks), (2, 3, EdgeKind::Enables)],
        );

        // 3 -> 1 would close the loop even across mixed edge kinds.
        assert!(would_close_cycle(&inner, ItemId::new(3), ItemId::new(1)).unwrap());
        assert!(!would_close_cycle(&inner, ItemId::new(1), ItemId::new(3)).unwrap());
    }

    #[test]
    fn test_blockers_filters_kind() {
        let inner = build(
            &[1, 2, 3, 4],
            &[
                (1, 4, EdgeKind::Blocks),
                (2, 4, EdgeKind::Informs),
                (3, 4, EdgeKind::Blocks),
            ],
        );
        assert_eq!(raw(&blockers_of(&inner, ItemId::new(4)).unwrap()), vec![1, 3]);
    }

    #[test]
    fn test_downstream_optional_filter() {
        let inner = build(
            &[1, 2, 3],
            &[(1, 2, EdgeKind::Blocks), (1, 3, EdgeKind::Informs)],
        );
        assert_eq!(
            raw(&downstream_of(&inner, ItemId::new(1), None).unwrap()),
            vec![2, 3]
        );
        assert_eq!(
            raw(&downstream_of(&inner, ItemId::new(1), Some(EdgeKind::Informs)).unwrap()),
            vec![3]
        );
    }

    #[test]
    fn test_upstream_chain_breadth_first() {
        // 1 -> 3, 2 -> 3, 3 -> 4: the chain of 4 lists 3 before its inputs.
        let inner = build(
            &[1, 2, 3, 4],
            &[
                (1, 3, EdgeKind::Blocks),
                (2, 3, EdgeKind::Enables),
                (3, 4, EdgeKind::Blocks),
            ],
        );
        assert_eq!(
            raw(&upstream_chain(&inner, ItemId::new(4)).unwrap()),
            vec![3, 1, 2]
        );
    }

    #[test]
    fn test_upstream_chain_diamond_visits_once() {
        let inner = build(
            &[1, 2, 3, 4],
            &[
                (1, 2, EdgeKind::Blocks),
                (1, 3, EdgeKind::Blocks),
                (2, 4, EdgeKind::Blocks),
                (3, 4, EdgeKind::Blocks),
            ],
        );
        assert_eq!(
            raw(&upstream_chain(&inner, ItemId::new(4)).unwrap()),
            vec![2, 3, 1]
        );
    }

    #[test]
    fn test_all_edges_deterministic_order() {
        let inner = build(
            &[1, 2, 3],
            &[(2, 3, EdgeKind::Enables), (1, 2, EdgeKind::Blocks)],
        );
        let edges = all_edges(&inner);
        assert_eq!(edges[0].prerequisite, ItemId::new(1));
        assert_eq!(edges[1].prerequisite, ItemId::new(2));
    }

    #[test]
    fn test_missing_item_errors() {
        let inner = build(&[1], &[]);
        assert!(matches!(
            blockers_of(&inner, ItemId::new(9)),
            Err(Error::ItemNotFound(_))
        ));
    }
}
