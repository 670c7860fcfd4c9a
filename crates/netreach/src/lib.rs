//! Netreach - derive reachability facts from toy network topologies
//!
//! Devices and cables form a topology. From it the engine derives small sets
//! of named boolean facts ("fiber reaches the ONU", "the router reaches a
//! PC") and keeps them in one shared, versioned snapshot that several
//! independent contexts read and write.
//!
//! # Quick Start
//!
//! ```rust
//! use netreach::{derive, parse_topology};
//!
//! let topology = parse_topology(r#"{
//!     "nodes": [
//!         {"id": "onu-1", "type": "onu"},
//!         {"id": "router-1", "type": "router"},
//!         {"id": "pc-1", "type": "pc"}
//!     ],
//!     "connections": [
//!         {"kind": "fiber", "a": "anchor", "b": {"node": "onu-1", "port": "fiber"}},
//!         {"kind": "copper", "a": {"node": "onu-1", "port": "lan"}, "b": {"node": "router-1", "port": "wan"}},
//!         {"kind": "lan", "a": {"node": "router-1", "port": "lan1"}, "b": {"node": "pc-1", "port": "lan"}}
//!     ]
//! }"#).unwrap();
//!
//! let edges = derive(&topology, "home").unwrap();
//! assert!(edges.get("fiberOnu"));
//! assert!(edges.get("routerPc"));
//! ```
//!
//! # Keeping a snapshot in sync
//!
//! ```rust
//! use netreach::prelude::*;
//!
//! let backend = MemoryBackend::new();
//! let mut bench = Workbench::new(SnapshotStore::new(backend.clone()));
//!
//! bench.apply("home", TopologyEvent::DeviceAdded(NodeData::new("onu-1", "onu"))).unwrap();
//! bench.apply("home", TopologyEvent::ConnectionAdded {
//!     kind: ConnectionKind::Fiber,
//!     a: Endpoint::Anchor,
//!     b: Endpoint::port("onu-1", "fiber"),
//! }).unwrap();
//! bench.tick().unwrap();
//!
//! // Any other handle on the same backend sees the write
//! let reader = SnapshotStore::new(backend);
//! assert!(reader.get().unwrap().edges("home").get("fiberOnu"));
//! assert_eq!(reader.read_summary()["home"], false);
//! ```

pub mod core;
pub mod scopes;

pub use core::*;
pub use scopes::{BUILTIN_SCOPES, COMPANY, HOME};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::core::{
        derive_edges, BroadcastHub, ChangeNotice, ConnectionKind, DeviceType, EdgeSet, Endpoint,
        FileBackend, MemoryBackend, NodeData, Snapshot, SnapshotStore, StorageBackend,
        StoreConfig, StoreError, SyncCoordinator, SyncOptions, SyncOutcome, Topology,
        TopologyError, TopologyEvent, TopologyView,
    };
    pub use crate::scopes::{Workbench, BUILTIN_SCOPES, COMPANY, HOME};
}

/// Parse a topology document from JSON
///
/// Dangling endpoints are kept; the engine ignores them.
///
/// # Example
/// ```rust
/// use netreach::{parse_topology, TopologyView};
///
/// let topology = parse_topology(r#"{"nodes": [{"id": "a", "type": "pc"}]}"#).unwrap();
/// assert_eq!(topology.node_count(), 1);
/// ```
pub fn parse_topology(input: &str) -> anyhow::Result<Topology> {
    let topology: Topology = serde_json::from_str(input)?;
    Ok(topology)
}

/// Derive the edge set of a built-in scope
///
/// # Example
/// ```rust
/// use netreach::{derive, Topology};
///
/// let edges = derive(&Topology::new(), "company").unwrap();
/// assert_eq!(edges.len(), 4);
/// assert_eq!(edges.true_count(), 0);
/// ```
pub fn derive<T: TopologyView + ?Sized>(topology: &T, scope: &str) -> anyhow::Result<EdgeSet> {
    let spec = find_scope(BUILTIN_SCOPES, scope)
        .ok_or_else(|| anyhow::anyhow!("Unknown scope '{}'", scope))?;
    Ok(derive_edges(topology, spec.rules))
}
