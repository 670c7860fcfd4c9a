//! Topology storage and mutation
//!
//! The [`TopologyView`] trait is the read handle the engine works against.
//! [`Topology`] is the concrete, mutable implementation owned by the
//! interaction layer; the engine only ever reads it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, trace};

use crate::core::{Connection, ConnectionKind, DeviceType, Endpoint, NodeData, TopologyError};

/// Read-only access to a topology
///
/// Everything in the derivation engine is written against this trait so that
/// callers can hand in their own topology representation.
pub trait TopologyView {
    /// Get a node by ID
    fn node(&self, id: &str) -> Option<&NodeData>;

    /// Iterate over all nodes
    fn nodes(&self) -> impl Iterator<Item = &NodeData>;

    /// Iterate over all connections
    fn connections(&self) -> impl Iterator<Item = &Connection>;

    /// Get the number of nodes
    fn node_count(&self) -> usize;

    /// Get the number of connections
    fn connection_count(&self) -> usize;

    /// Get the type of a node, if it exists
    fn device_type(&self, id: &str) -> Option<&DeviceType> {
        self.node(id).map(|node| &node.device_type)
    }
}

/// A mutation event from the interaction layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopologyEvent {
    /// A device was placed on the canvas
    DeviceAdded(NodeData),
    /// A device was deleted (its connections go with it)
    DeviceRemoved { id: String },
    /// A cable was connected
    ConnectionAdded {
        kind: ConnectionKind,
        a: Endpoint,
        b: Endpoint,
    },
    /// A cable was deleted
    ConnectionRemoved { id: String },
}

impl TopologyEvent {
    /// Returns true for structural deletions
    ///
    /// Deletions are the only events allowed to regress persisted facts.
    pub fn is_deletion(&self) -> bool {
        matches!(
            self,
            TopologyEvent::DeviceRemoved { .. } | TopologyEvent::ConnectionRemoved { .. }
        )
    }

    /// Short name used as the sync reason
    pub fn reason(&self) -> &'static str {
        match self {
            TopologyEvent::DeviceAdded(_) => "addDevice",
            TopologyEvent::DeviceRemoved { .. } => "deleteDevice",
            TopologyEvent::ConnectionAdded { .. } => "createCable",
            TopologyEvent::ConnectionRemoved { .. } => "deleteCable",
        }
    }
}

/// Serializable form of a topology
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyDocument {
    #[serde(default)]
    pub nodes: Vec<NodeData>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

/// Concrete topology: devices plus cables
///
/// Maintains insertion order for deterministic iteration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "TopologyDocument", into = "TopologyDocument")]
pub struct Topology {
    /// Nodes indexed by ID
    nodes: HashMap<String, NodeData>,
    /// Node IDs in insertion order
    node_order: Vec<String>,
    /// Connections in insertion order
    connections: Vec<Connection>,
    /// Counter for generated node IDs
    node_counter: usize,
    /// Counter for generated connection IDs
    connection_counter: usize,
}

impl Topology {
    /// Create a new empty topology
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a topology from a document without validating it
    ///
    /// Dangling endpoints and duplicates are kept as-is; the engine tolerates
    /// both. Missing connection IDs are generated.
    pub fn from_document(document: TopologyDocument) -> Self {
        let mut topology = Topology::new();
        for node in document.nodes {
            if !topology.nodes.contains_key(&node.id) {
                topology.node_order.push(node.id.clone());
            }
            topology.nodes.insert(node.id.clone(), node);
        }
        for connection in document.connections {
            let mut connection = connection.normalized();
            if connection.id.is_empty() {
                connection.id = topology.next_connection_id();
            }
            topology.connections.push(connection);
        }
        debug!(
            node_count = topology.node_count(),
            connection_count = topology.connection_count(),
            "Topology loaded from document"
        );
        topology
    }

    /// Convert into the serializable document form
    pub fn to_document(&self) -> TopologyDocument {
        TopologyDocument {
            nodes: self.nodes().cloned().collect(),
            connections: self.connections.clone(),
        }
    }

    /// Check if a node exists
    pub fn has_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Get a connection by ID
    pub fn connection(&self, id: &str) -> Option<&Connection> {
        self.connections.iter().find(|c| c.id == id)
    }

    /// Get all connections touching a node
    pub fn connections_of(&self, node_id: &str) -> Vec<&Connection> {
        self.connections
            .iter()
            .filter(|c| c.touches_node(node_id))
            .collect()
    }

    /// Count nodes of a given type
    pub fn count_of(&self, device_type: &DeviceType) -> usize {
        self.nodes
            .values()
            .filter(|n| &n.device_type == device_type)
            .count()
    }

    /// Add a node
    pub fn add_node(&mut self, node: NodeData) -> Result<(), TopologyError> {
        trace!(node_id = %node.id, device_type = %node.device_type, "Adding node to topology");
        if self.nodes.contains_key(&node.id) {
            return Err(TopologyError::DuplicateNode { id: node.id });
        }
        self.node_order.push(node.id.clone());
        self.nodes.insert(node.id.clone(), node);
        debug!(node_count = self.node_count(), "Node added");
        Ok(())
    }

    /// Place a new device, generating its ID (`<type>-<n>`)
    pub fn add_device(&mut self, device_type: impl Into<DeviceType>) -> String {
        let device_type = device_type.into();
        let id = loop {
            self.node_counter += 1;
            let candidate = format!("{}-{}", device_type, self.node_counter);
            if !self.nodes.contains_key(&candidate) {
                break candidate;
            }
        };
        self.node_order.push(id.clone());
        self.nodes
            .insert(id.clone(), NodeData::new(id.clone(), device_type));
        debug!(node_id = %id, node_count = self.node_count(), "Device placed");
        id
    }

    /// Remove a node and every connection touching it
    ///
    /// Returns the removed connections.
    pub fn remove_node(&mut self, id: &str) -> Result<Vec<Connection>, TopologyError> {
        if self.nodes.remove(id).is_none() {
            return Err(TopologyError::unknown_node(id));
        }
        self.node_order.retain(|n| n != id);

        let (removed, kept): (Vec<_>, Vec<_>) = self
            .connections
            .drain(..)
            .partition(|c| c.touches_node(id));
        self.connections = kept;

        debug!(
            node_id = %id,
            removed_connections = removed.len(),
            "Node removed"
        );
        Ok(removed)
    }

    /// Connect two endpoints, returning the new connection's ID
    ///
    /// Rejects endpoints on unknown nodes, a link from an endpoint to itself,
    /// anchor-to-anchor links, and duplicates (same kind, same unordered
    /// endpoint pair).
    pub fn connect(
        &mut self,
        kind: ConnectionKind,
        a: Endpoint,
        b: Endpoint,
    ) -> Result<String, TopologyError> {
        for endpoint in [&a, &b] {
            if let Some(node_id) = endpoint.node_id() {
                if !self.has_node(node_id) {
                    return Err(TopologyError::unknown_node(node_id));
                }
            }
        }
        if a.is_anchor() && b.is_anchor() {
            return Err(TopologyError::invalid_connection(
                "the anchor cannot be connected to itself",
            ));
        }
        if a == b {
            return Err(TopologyError::invalid_connection(format!(
                "endpoint {} cannot be connected to itself",
                a
            )));
        }

        let candidate = Connection::new(String::new(), kind, a, b);
        if self.connections.iter().any(|c| c.same_link(&candidate)) {
            return Err(TopologyError::DuplicateConnection {
                kind: kind.to_string(),
                a: candidate.a.key(),
                b: candidate.b.key(),
            });
        }

        let id = self.next_connection_id();
        trace!(
            connection_id = %id,
            kind = %kind,
            a = %candidate.a,
            b = %candidate.b,
            "Adding connection to topology"
        );
        self.connections.push(Connection { id: id.clone(), ..candidate });
        debug!(connection_count = self.connection_count(), "Connection added");
        Ok(id)
    }

    /// Remove a connection by ID
    pub fn disconnect(&mut self, id: &str) -> Result<Connection, TopologyError> {
        let index = self
            .connections
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| TopologyError::UnknownConnection { id: id.to_string() })?;
        let removed = self.connections.remove(index);
        debug!(connection_id = %id, connection_count = self.connection_count(), "Connection removed");
        Ok(removed)
    }

    /// Apply a mutation event
    pub fn apply(&mut self, event: TopologyEvent) -> Result<(), TopologyError> {
        match event {
            TopologyEvent::DeviceAdded(node) => self.add_node(node),
            TopologyEvent::DeviceRemoved { id } => self.remove_node(&id).map(|_| ()),
            TopologyEvent::ConnectionAdded { kind, a, b } => self.connect(kind, a, b).map(|_| ()),
            TopologyEvent::ConnectionRemoved { id } => self.disconnect(&id).map(|_| ()),
        }
    }

    /// Clear all data from the topology
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.node_order.clear();
        self.connections.clear();
        self.node_counter = 0;
        self.connection_counter = 0;
    }

    fn next_connection_id(&mut self) -> String {
        loop {
            self.connection_counter += 1;
            let candidate = format!("c{}", self.connection_counter);
            if self.connection(&candidate).is_none() {
                return candidate;
            }
        }
    }
}

impl TopologyView for Topology {
    fn node(&self, id: &str) -> Option<&NodeData> {
        self.nodes.get(id)
    }

    fn nodes(&self) -> impl Iterator<Item = &NodeData> {
        self.node_order.iter().filter_map(|id| self.nodes.get(id))
    }

    fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.iter()
    }

    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

impl From<TopologyDocument> for Topology {
    fn from(document: TopologyDocument) -> Self {
        Topology::from_document(document)
    }
}

impl From<Topology> for TopologyDocument {
    fn from(topology: Topology) -> Self {
        topology.to_document()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn home() -> Topology {
        let mut t = Topology::new();
        t.add_node(NodeData::new("A", DeviceType::Onu)).unwrap();
        t.add_node(NodeData::new("B", DeviceType::Router)).unwrap();
        t.add_node(NodeData::new("C", DeviceType::Pc)).unwrap();
        t.connect(ConnectionKind::Fiber, Endpoint::Anchor, Endpoint::port("A", "fiber"))
            .unwrap();
        t.connect(
            ConnectionKind::Copper,
            Endpoint::port("A", "lan"),
            Endpoint::port("B", "wan"),
        )
        .unwrap();
        t.connect(
            ConnectionKind::Copper,
            Endpoint::port("B", "lan"),
            Endpoint::port("C", "lan"),
        )
        .unwrap();
        t
    }

    #[test]
    fn test_add_and_count() {
        let t = home();
        assert_eq!(t.node_count(), 3);
        assert_eq!(t.connection_count(), 3);
        assert_eq!(t.device_type("B"), Some(&DeviceType::Router));
        assert_eq!(t.count_of(&DeviceType::Pc), 1);
    }

    #[test]
    fn test_nodes_keep_insertion_order() {
        let t = home();
        let ids: Vec<&str> = t.nodes().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_duplicate_node_rejected() {
        let mut t = home();
        let err = t.add_node(NodeData::new("A", DeviceType::Pc)).unwrap_err();
        assert_eq!(err, TopologyError::DuplicateNode { id: "A".into() });
    }

    #[test]
    fn test_add_device_generates_ids() {
        let mut t = Topology::new();
        let first = t.add_device(DeviceType::Router);
        let second = t.add_device("pc");
        assert_eq!(first, "router-1");
        assert_eq!(second, "pc-2");
        assert_eq!(t.device_type("pc-2"), Some(&DeviceType::Pc));
    }

    #[test]
    fn test_duplicate_connection_rejected_in_either_direction() {
        let mut t = home();
        let err = t
            .connect(
                ConnectionKind::Copper,
                Endpoint::port("C", "lan"),
                Endpoint::port("B", "lan"),
            )
            .unwrap_err();
        assert!(matches!(err, TopologyError::DuplicateConnection { .. }));
    }

    #[test]
    fn test_same_pair_different_kind_is_allowed() {
        let mut t = home();
        let id = t
            .connect(
                ConnectionKind::Fiber,
                Endpoint::port("B", "lan"),
                Endpoint::port("C", "lan"),
            )
            .unwrap();
        assert!(t.connection(&id).is_some());
    }

    #[test]
    fn test_connect_rejects_unknown_and_degenerate_endpoints() {
        let mut t = home();
        assert!(matches!(
            t.connect(
                ConnectionKind::Copper,
                Endpoint::port("B", "lan"),
                Endpoint::port("Z", "lan"),
            ),
            Err(TopologyError::UnknownNode { .. })
        ));
        assert!(matches!(
            t.connect(ConnectionKind::Fiber, Endpoint::Anchor, Endpoint::Anchor),
            Err(TopologyError::InvalidConnection { .. })
        ));
        assert!(matches!(
            t.connect(
                ConnectionKind::Copper,
                Endpoint::port("B", "lan"),
                Endpoint::port("B", "lan"),
            ),
            Err(TopologyError::InvalidConnection { .. })
        ));
    }

    #[test]
    fn test_remove_node_cascades_connections() {
        let mut t = home();
        let removed = t.remove_node("B").unwrap();
        assert_eq!(removed.len(), 2);
        assert_eq!(t.connection_count(), 1);
        assert!(!t.has_node("B"));
        assert!(t.connections_of("B").is_empty());
    }

    #[test]
    fn test_disconnect() {
        let mut t = home();
        let id = t.connections().next().unwrap().id.clone();
        t.disconnect(&id).unwrap();
        assert_eq!(t.connection_count(), 2);
        assert!(matches!(
            t.disconnect(&id),
            Err(TopologyError::UnknownConnection { .. })
        ));
    }

    #[test]
    fn test_event_deletion_flags() {
        assert!(TopologyEvent::DeviceRemoved { id: "x".into() }.is_deletion());
        assert!(TopologyEvent::ConnectionRemoved { id: "c1".into() }.is_deletion());
        assert!(!TopologyEvent::DeviceAdded(NodeData::new("x", "pc")).is_deletion());
        assert!(!TopologyEvent::ConnectionAdded {
            kind: ConnectionKind::Copper,
            a: Endpoint::port("a", "lan"),
            b: Endpoint::port("b", "lan"),
        }
        .is_deletion());
    }

    #[test]
    fn test_apply_events() {
        let mut t = Topology::new();
        t.apply(TopologyEvent::DeviceAdded(NodeData::new("onu-1", "onu")))
            .unwrap();
        t.apply(TopologyEvent::ConnectionAdded {
            kind: ConnectionKind::Fiber,
            a: Endpoint::Anchor,
            b: Endpoint::port("onu-1", "fiber"),
        })
        .unwrap();
        assert_eq!(t.connection_count(), 1);
        t.apply(TopologyEvent::DeviceRemoved { id: "onu-1".into() })
            .unwrap();
        assert_eq!(t.connection_count(), 0);
    }

    #[test]
    fn test_document_roundtrip_keeps_dangling_connections() {
        let json = r#"{
            "nodes": [{"id": "A", "type": "onu"}],
            "connections": [
                {"kind": "fiber", "a": "anchor", "b": {"node": "A", "port": "fiber"}},
                {"kind": "lan", "a": {"node": "A", "port": "lan"}, "b": {"node": "ghost", "port": "wan"}}
            ]
        }"#;
        let t: Topology = serde_json::from_str(json).unwrap();
        assert_eq!(t.node_count(), 1);
        assert_eq!(t.connection_count(), 2);
        assert!(t.connections().all(|c| !c.id.is_empty()));
    }

    #[test]
    fn test_clear() {
        let mut t = home();
        t.clear();
        assert_eq!(t.node_count(), 0);
        assert_eq!(t.connection_count(), 0);
    }
}
