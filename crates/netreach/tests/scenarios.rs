//! End-to-end scenarios for derivation and sync

use netreach::prelude::*;

fn place(bench: &mut Workbench<MemoryBackend>, scope: &str, id: &str, device_type: &str) {
    bench
        .apply(scope, TopologyEvent::DeviceAdded(NodeData::new(id, device_type)))
        .unwrap();
}

fn cable(bench: &mut Workbench<MemoryBackend>, scope: &str, kind: ConnectionKind, a: Endpoint, b: Endpoint) {
    bench
        .apply(scope, TopologyEvent::ConnectionAdded { kind, a, b })
        .unwrap();
}

fn connection_id(bench: &Workbench<MemoryBackend>, scope: &str, node: &str) -> String {
    bench
        .topology(scope)
        .unwrap()
        .connections_of(node)
        .first()
        .map(|c| c.id.clone())
        .unwrap()
}

/// anchor -fiber- onu -copper- router -copper- pc
fn complete_home() -> Workbench<MemoryBackend> {
    let mut bench = Workbench::new(SnapshotStore::new(MemoryBackend::new()));
    place(&mut bench, "home", "A", "onu");
    place(&mut bench, "home", "B", "router");
    place(&mut bench, "home", "C", "pc");
    cable(&mut bench, "home", ConnectionKind::Fiber, Endpoint::Anchor, Endpoint::port("A", "fiber"));
    cable(&mut bench, "home", ConnectionKind::Copper, Endpoint::port("A", "lan"), Endpoint::port("B", "wan"));
    cable(&mut bench, "home", ConnectionKind::Copper, Endpoint::port("B", "lan1"), Endpoint::port("C", "lan"));
    bench.tick().unwrap();
    bench
}

#[test]
fn test_complete_home_chain() {
    let bench = complete_home();
    let snapshot = bench.store().get().unwrap();
    let section = snapshot.section("home").unwrap();

    assert!(section.edges.get("fiberOnu"));
    assert!(section.edges.get("onuRouter"));
    assert!(section.edges.get("routerPc"));
    assert!(section.reach.ok);
    assert_eq!(section.reach.count, 3);
    assert_eq!(snapshot.summary["homeOK"], true);
    assert_eq!(bench.summary()["home"], true);
}

#[test]
fn test_derivation_is_deterministic() {
    let bench = complete_home();
    let topology = bench.topology("home").unwrap();
    let first = derive_edges(topology, HOME.rules);
    for _ in 0..10 {
        assert_eq!(derive_edges(topology, HOME.rules), first);
    }
}

#[test]
fn test_copper_triangle_terminates() {
    let mut bench = Workbench::new(SnapshotStore::new(MemoryBackend::new()));
    place(&mut bench, "home", "A", "onu");
    place(&mut bench, "home", "B", "router");
    place(&mut bench, "home", "C", "pc");
    cable(&mut bench, "home", ConnectionKind::Copper, Endpoint::port("A", "lan"), Endpoint::port("B", "wan"));
    cable(&mut bench, "home", ConnectionKind::Copper, Endpoint::port("B", "lan1"), Endpoint::port("C", "lan"));
    cable(&mut bench, "home", ConnectionKind::Copper, Endpoint::port("C", "lan2"), Endpoint::port("A", "lan2"));

    let edges = bench.derive("home").unwrap();
    assert!(!edges.get("fiberOnu"));
    assert!(edges.get("onuRouter"));
    assert!(edges.get("routerPc"));

    // The same link again is rejected before the engine sees it
    let duplicate = bench.apply(
        "home",
        TopologyEvent::ConnectionAdded {
            kind: ConnectionKind::Copper,
            a: Endpoint::port("B", "wan"),
            b: Endpoint::port("A", "lan"),
        },
    );
    assert!(duplicate.is_err());
    assert_eq!(bench.topology("home").unwrap().connection_count(), 3);
}

#[test]
fn test_deleting_router_downgrades() {
    let mut bench = complete_home();
    bench
        .apply("home", TopologyEvent::DeviceRemoved { id: "B".into() })
        .unwrap();
    bench.tick().unwrap();

    let snapshot = bench.store().get().unwrap();
    let fresh = bench.derive("home").unwrap();
    assert_eq!(snapshot.edges("home"), fresh);
    assert!(fresh.get("fiberOnu"));
    assert!(!fresh.get("onuRouter"));
    assert!(!snapshot.section("home").unwrap().reach.ok);
    assert_eq!(bench.summary()["home"], false);
    assert_eq!(
        snapshot.section("home").unwrap().meta.as_ref().unwrap().last_sync_reason.as_deref(),
        Some("deleteDevice")
    );
}

#[test]
fn test_deleting_cable_downgrades() {
    let mut bench = complete_home();
    let id = connection_id(&bench, "home", "C");
    bench
        .apply("home", TopologyEvent::ConnectionRemoved { id })
        .unwrap();
    bench.tick().unwrap();

    let edges = bench.store().get().unwrap().edges("home");
    assert!(edges.get("onuRouter"));
    assert!(!edges.get("routerPc"));
}

#[test]
fn test_transient_false_does_not_downgrade() {
    let mut bench = complete_home();

    // A mid-drag recomputation sees the PC unplugged
    let partial = EdgeSet::new()
        .with("fiberOnu", true)
        .with("onuRouter", true)
        .with("routerPc", false);
    let outcome = bench
        .coordinator_mut()
        .sync_edges("home", &partial, SyncOptions::new().reason("dragMove"))
        .unwrap();

    assert_eq!(outcome, SyncOutcome::Unchanged);
    assert!(bench.store().get().unwrap().edges("home").get("routerPc"));
    assert_eq!(bench.summary()["home"], true);
}

#[test]
fn test_scopes_are_independent() {
    let mut bench = complete_home();
    place(&mut bench, "company", "onu", "onu");
    cable(&mut bench, "company", ConnectionKind::Fiber, Endpoint::Anchor, Endpoint::port("onu", "fiber"));
    bench.tick().unwrap();

    let snapshot = bench.store().get().unwrap();
    assert!(snapshot.is_ready(&HOME));
    assert!(!snapshot.is_ready(&COMPANY));
    assert!(snapshot.edges("company").get("fiberOnu"));
    assert_eq!(snapshot.section("company").unwrap().status["lanClients"], 1);
}

#[test]
fn test_company_with_web_server_and_ftp() {
    let mut bench = Workbench::new(SnapshotStore::new(MemoryBackend::new()));
    place(&mut bench, "company", "onu", "onu");
    place(&mut bench, "company", "rt", "router");
    place(&mut bench, "company", "web", "web");
    place(&mut bench, "company", "ftp", "ftp");
    cable(&mut bench, "company", ConnectionKind::Fiber, Endpoint::Anchor, Endpoint::port("onu", "fiber"));
    cable(&mut bench, "company", ConnectionKind::Copper, Endpoint::port("onu", "lan"), Endpoint::port("rt", "wan"));
    cable(&mut bench, "company", ConnectionKind::Copper, Endpoint::port("rt", "lan1"), Endpoint::port("web", "lan"));
    cable(&mut bench, "company", ConnectionKind::Copper, Endpoint::port("rt", "lan2"), Endpoint::port("ftp", "lan"));
    bench.tick().unwrap();

    let snapshot = bench.store().get().unwrap();
    let section = snapshot.section("company").unwrap();
    assert!(section.reach.ok);
    assert_eq!(section.reach.count, 4);
    assert_eq!(section.status["webReachable"], true);
    assert_eq!(section.status["ftpReachable"], true);
    assert_eq!(section.status["lanClients"], 3);
    assert_eq!(bench.summary()["company"], true);
}

#[test]
fn test_dangling_connections_are_ignored() {
    let topology = netreach::parse_topology(
        r#"{
            "nodes": [{"id": "A", "type": "onu"}, {"id": "B", "type": "router"}],
            "connections": [
                {"kind": "fiber", "a": "anchor", "b": {"node": "ghost", "port": "fiber"}},
                {"kind": "copper", "a": {"node": "A", "port": "lan"}, "b": {"node": "gone", "port": "wan"}},
                {"kind": "rj45", "a": {"node": "A", "port": "lan2"}, "b": {"node": "B", "port": "wan"}}
            ]
        }"#,
    )
    .unwrap();

    let edges = netreach::derive(&topology, "home").unwrap();
    assert!(!edges.get("fiberOnu"));
    assert!(edges.get("onuRouter"));
    assert!(!edges.get("routerPc"));
}
