//! Reachability queries
//!
//! Two kinds of question: multi-hop typed reachability over an adjacency map
//! (breadth-first, existence only), and single-hop anchor adjacency, which is
//! answered straight from the connection list.

use std::collections::{HashSet, VecDeque};
use tracing::trace;

use crate::core::{Adjacency, ConnectionKind, DeviceType, TopologyView, TypeIndex};

/// Returns true if any node of `source` reaches any node of `target`
pub fn exists_typed_path(
    adjacency: &Adjacency,
    types: &TypeIndex,
    source: &DeviceType,
    target: &DeviceType,
) -> bool {
    exists_path_to_any(adjacency, types, source, std::slice::from_ref(target))
}

/// Returns true if any node of `source` reaches a node whose type is one of
/// `targets`
///
/// Multi-source BFS seeded with every `source` node. Each node is visited at
/// most once, so cycles terminate and the run is O(V+E).
pub fn exists_path_to_any(
    adjacency: &Adjacency,
    types: &TypeIndex,
    source: &DeviceType,
    targets: &[DeviceType],
) -> bool {
    let seeds = types.nodes_of(source);
    if seeds.is_empty() || !targets.iter().any(|t| types.contains(t)) {
        return false;
    }

    let mut visited: HashSet<&str> = HashSet::with_capacity(adjacency.node_count() + seeds.len());
    let mut queue: VecDeque<&str> = VecDeque::new();
    for seed in seeds {
        if visited.insert(seed.as_str()) {
            queue.push_back(seed.as_str());
        }
    }

    while let Some(current) = queue.pop_front() {
        if types.type_of(current).is_some_and(|t| targets.contains(t)) {
            trace!(source = %source, reached = current, visited = visited.len(), "Typed path found");
            return true;
        }
        for next in adjacency.neighbors(current) {
            if visited.insert(next) {
                queue.push_back(next);
            }
        }
    }

    trace!(source = %source, visited = visited.len(), "No typed path");
    false
}

/// Returns true if the anchor is wired directly to a node of `target` over a
/// connection of `kind`
///
/// This is a single-hop check; it never walks the graph.
pub fn is_anchor_adjacent_to_type<T: TopologyView + ?Sized>(
    topology: &T,
    kind: ConnectionKind,
    target: &DeviceType,
) -> bool {
    topology
        .connections()
        .filter(|c| c.kind == kind)
        .filter_map(|c| c.anchor_peer())
        .filter_map(|peer| peer.node_id())
        .any(|id| topology.device_type(id) == Some(target))
}
