//! Adjacency building
//!
//! Turns the flat connection list into an undirected adjacency map for one
//! connection kind. Rebuilt from scratch on every recomputation; there is no
//! incremental state to get out of sync.

use std::collections::{HashMap, HashSet};
use tracing::{debug, trace};

use crate::core::{ConnectionKind, DeviceType, TopologyView};

/// Undirected adjacency for one connection kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Adjacency {
    neighbors: HashMap<String, HashSet<String>>,
}

impl Adjacency {
    /// Create an empty adjacency map
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an undirected link. Self-loops are ignored.
    pub fn link(&mut self, a: &str, b: &str) {
        if a == b {
            return;
        }
        self.neighbors
            .entry(a.to_string())
            .or_default()
            .insert(b.to_string());
        self.neighbors
            .entry(b.to_string())
            .or_default()
            .insert(a.to_string());
    }

    /// Neighbors of a node
    pub fn neighbors(&self, id: &str) -> impl Iterator<Item = &str> {
        self.neighbors
            .get(id)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    /// Returns true if the two nodes are directly linked
    pub fn has_link(&self, a: &str, b: &str) -> bool {
        self.neighbors.get(a).is_some_and(|set| set.contains(b))
    }

    /// Number of nodes with at least one link
    pub fn node_count(&self) -> usize {
        self.neighbors.len()
    }

    /// Number of distinct undirected links
    pub fn link_count(&self) -> usize {
        self.neighbors.values().map(HashSet::len).sum::<usize>() / 2
    }

    /// Returns true if there are no links
    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }
}

/// Build the adjacency map for connections of `kind`
///
/// Connections whose endpoints do not both resolve to existing nodes are
/// skipped, as are anchor connections and self-loops.
pub fn build_adjacency<T: TopologyView + ?Sized>(topology: &T, kind: ConnectionKind) -> Adjacency {
    let mut adjacency = Adjacency::new();

    for connection in topology.connections().filter(|c| c.kind == kind) {
        let (Some(a), Some(b)) = (connection.a.node_id(), connection.b.node_id()) else {
            trace!(connection_id = %connection.id, "Skipping anchor connection");
            continue;
        };
        if topology.node(a).is_none() || topology.node(b).is_none() {
            trace!(connection_id = %connection.id, a, b, "Skipping dangling connection");
            continue;
        }
        if a == b {
            trace!(connection_id = %connection.id, node_id = a, "Skipping self-loop");
            continue;
        }
        adjacency.link(a, b);
    }

    debug!(
        kind = %kind,
        node_count = adjacency.node_count(),
        link_count = adjacency.link_count(),
        "Adjacency built"
    );
    adjacency
}

/// Node IDs grouped by device type
#[derive(Debug, Clone, Default)]
pub struct TypeIndex {
    by_type: HashMap<DeviceType, Vec<String>>,
    type_of: HashMap<String, DeviceType>,
}

impl TypeIndex {
    /// Index every node of a topology by type
    pub fn from_topology<T: TopologyView + ?Sized>(topology: &T) -> Self {
        let mut index = TypeIndex::default();
        for node in topology.nodes() {
            index
                .by_type
                .entry(node.device_type.clone())
                .or_default()
                .push(node.id.clone());
            index
                .type_of
                .insert(node.id.clone(), node.device_type.clone());
        }
        index
    }

    /// Node IDs of a given type
    pub fn nodes_of(&self, device_type: &DeviceType) -> &[String] {
        self.by_type
            .get(device_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Type of a node
    pub fn type_of(&self, id: &str) -> Option<&DeviceType> {
        self.type_of.get(id)
    }

    /// Returns true if at least one node has the given type
    pub fn contains(&self, device_type: &DeviceType) -> bool {
        !self.nodes_of(device_type).is_empty()
    }
}
