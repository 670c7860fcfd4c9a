//! Integration tests for the public API

use netreach::prelude::*;
use netreach::{derive, parse_topology, DEFAULT_DRAFT_PREFIX};

const HOME_JSON: &str = r#"{
    "nodes": [
        {"id": "onu-1", "type": "onu"},
        {"id": "router-1", "type": "router"},
        {"id": "pc-1", "type": "pc"},
        {"id": "tv-1", "type": "television"}
    ],
    "connections": [
        {"id": "c1", "kind": "fiber", "a": "anchor", "b": {"node": "onu-1", "port": "fiber"}},
        {"id": "c2", "kind": "lan", "a": {"node": "onu-1", "port": "lan"}, "b": {"node": "router-1", "port": "wan"}},
        {"id": "c3", "kind": "copper", "a": {"node": "pc-1", "port": "lan"}, "b": {"node": "router-1", "port": "lan1"}}
    ]
}"#;

#[test]
fn test_parse_and_derive() {
    let topology = parse_topology(HOME_JSON).unwrap();
    assert_eq!(topology.node_count(), 4);
    assert_eq!(topology.connection_count(), 3);
    assert_eq!(
        topology.device_type("tv-1"),
        Some(&DeviceType::Other("television".into()))
    );

    let edges = derive(&topology, "home").unwrap();
    assert_eq!(edges.true_count(), 3);
    assert!(HOME.is_ready(&edges));
}

#[test]
fn test_topology_document_roundtrip() {
    let topology = parse_topology(HOME_JSON).unwrap();
    let json = serde_json::to_string(&topology).unwrap();
    let again = parse_topology(&json).unwrap();
    assert_eq!(derive(&again, "home").unwrap(), derive(&topology, "home").unwrap());
    assert!(json.contains(r#""kind":"copper""#));
}

#[test]
fn test_builtin_scopes() {
    let names: Vec<&str> = BUILTIN_SCOPES.iter().map(|s| s.name).collect();
    assert_eq!(names, vec!["home", "company"]);
    assert_eq!(HOME.summary_key(), "homeOK");
    assert_eq!(COMPANY.facts().count(), 4);
    assert_eq!(COMPANY.required_facts().count(), 3);
}

#[test]
fn test_snapshot_wire_format() {
    let mut sync = SyncCoordinator::new(SnapshotStore::new(MemoryBackend::new()));
    let topology = parse_topology(HOME_JSON).unwrap();
    let edges = derive(&topology, "home").unwrap();
    sync.sync_edges("home", &edges, SyncOptions::new().reason("load"))
        .unwrap();

    let snapshot = sync.store().get().unwrap();
    let value = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(value["version"], 1);
    assert_eq!(value["home"]["reach"]["ok"], true);
    assert_eq!(value["home"]["reach"]["count"], 3);
    assert_eq!(value["home"]["meta"]["lastSyncReason"], "load");
    assert!(value["home"]["meta"]["lastSyncAt"].is_string());
    assert_eq!(value["company"]["reach"]["ok"], false);
    assert_eq!(value["summary"]["homeOK"], true);
    assert_eq!(value["summary"]["companyOK"], false);
}

#[test]
fn test_topology_view_is_implementable() {
    struct Fixed {
        nodes: Vec<NodeData>,
        connections: Vec<netreach::Connection>,
    }

    impl TopologyView for Fixed {
        fn node(&self, id: &str) -> Option<&NodeData> {
            self.nodes.iter().find(|n| n.id == id)
        }

        fn nodes(&self) -> impl Iterator<Item = &NodeData> {
            self.nodes.iter()
        }

        fn connections(&self) -> impl Iterator<Item = &netreach::Connection> {
            self.connections.iter()
        }

        fn node_count(&self) -> usize {
            self.nodes.len()
        }

        fn connection_count(&self) -> usize {
            self.connections.len()
        }
    }

    let fixed = Fixed {
        nodes: vec![NodeData::new("o", "onu")],
        connections: vec![netreach::Connection::new(
            "x",
            ConnectionKind::Fiber,
            Endpoint::Anchor,
            Endpoint::port("o", "fiber"),
        )],
    };
    let edges = derive(&fixed, "home").unwrap();
    assert!(edges.get("fiberOnu"));
    assert!(!edges.get("onuRouter"));
}

#[test]
fn test_drafts_use_session_prefix() {
    let backend = MemoryBackend::new();
    let store = SnapshotStore::new(backend.clone());
    let topology = parse_topology(HOME_JSON).unwrap();

    store.save_draft("home", &topology).unwrap();
    let restored: Topology = store.load_draft("home").unwrap();
    assert_eq!(restored.node_count(), 4);
    assert_eq!(backend.keys(), vec![format!("{}home", DEFAULT_DRAFT_PREFIX)]);
    assert!(store.get().is_none());
}
