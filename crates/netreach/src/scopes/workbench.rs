//! Workbench orchestrator
//!
//! Ties the pieces together for an interactive session: each scope owns a
//! topology, every mutation event re-derives that scope's edges and queues a
//! sync, and the caller flushes once per tick. The destructive flag comes from
//! the event itself, so only deletions can ever regress stored facts.

use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, span, Level};

use crate::core::{
    derive_edges, EdgeSet, ScopeMetrics, ScopeSpec, SnapshotStore, StorageBackend,
    SyncCoordinator, SyncOptions, SyncOutcome, Topology, TopologyEvent, TopologyView,
};

/// Interactive session over one store handle
pub struct Workbench<B> {
    topologies: HashMap<String, Topology>,
    sync: SyncCoordinator<B>,
}

impl<B: StorageBackend> Workbench<B> {
    /// Create a workbench with an empty topology for every configured scope
    pub fn new(store: SnapshotStore<B>) -> Self {
        let topologies = store
            .config()
            .scopes
            .iter()
            .map(|spec| (spec.name.to_string(), Topology::new()))
            .collect();
        Self {
            topologies,
            sync: SyncCoordinator::new(store),
        }
    }

    fn spec(&self, scope: &str) -> Result<ScopeSpec> {
        self.sync
            .store()
            .config()
            .scope(scope)
            .copied()
            .with_context(|| format!("Unknown scope '{}'", scope))
    }

    /// Configured scopes
    pub fn scopes(&self) -> &[ScopeSpec] {
        &self.sync.store().config().scopes
    }

    /// Current topology of a scope
    pub fn topology(&self, scope: &str) -> Option<&Topology> {
        self.topologies.get(scope)
    }

    pub fn coordinator(&self) -> &SyncCoordinator<B> {
        &self.sync
    }

    pub fn coordinator_mut(&mut self) -> &mut SyncCoordinator<B> {
        &mut self.sync
    }

    pub fn store(&self) -> &SnapshotStore<B> {
        self.sync.store()
    }

    /// Derive a scope's edges from its current topology
    pub fn derive(&self, scope: &str) -> Result<EdgeSet> {
        let spec = self.spec(scope)?;
        let topology = self
            .topologies
            .get(scope)
            .with_context(|| format!("No topology for scope '{}'", scope))?;
        Ok(derive_edges(topology, spec.rules))
    }

    /// Apply a mutation and queue a sync for the scope
    ///
    /// Returns the freshly derived edges. Rejected mutations queue nothing.
    pub fn apply(&mut self, scope: &str, event: TopologyEvent) -> Result<EdgeSet> {
        let apply_span = span!(Level::DEBUG, "apply", scope, reason = event.reason());
        let _enter = apply_span.enter();

        let spec = self.spec(scope)?;
        let destructive = event.is_deletion();
        let reason = event.reason();
        let topology = self
            .topologies
            .entry(scope.to_string())
            .or_default();
        topology
            .apply(event)
            .with_context(|| format!("Failed to apply {} to scope '{}'", reason, scope))?;

        let edges = derive_edges(&*topology, spec.rules);
        let options = SyncOptions::new()
            .destructive(destructive)
            .reason(reason)
            .metrics(ScopeMetrics::from_topology(&*topology));
        self.sync.request(scope, edges.clone(), options);
        debug!(destructive, true_count = edges.true_count(), "Mutation applied");
        Ok(edges)
    }

    /// Replace a scope's topology (e.g. after loading a saved canvas) and
    /// queue a non-destructive sync
    pub fn load_topology(&mut self, scope: &str, topology: Topology) -> Result<EdgeSet> {
        self.spec(scope)?;
        info!(
            scope,
            node_count = topology.node_count(),
            connection_count = topology.connection_count(),
            "Topology loaded"
        );
        self.topologies.insert(scope.to_string(), topology);
        self.resync(scope, false)
    }

    /// Re-derive and queue a non-destructive sync
    pub fn resync(&mut self, scope: &str, force: bool) -> Result<EdgeSet> {
        let edges = self.derive(scope)?;
        let metrics = self
            .topologies
            .get(scope)
            .map(ScopeMetrics::from_topology)
            .unwrap_or_default();
        self.sync.request(
            scope,
            edges.clone(),
            SyncOptions::new()
                .force(force)
                .reason("resync")
                .metrics(metrics),
        );
        Ok(edges)
    }

    /// Flush queued syncs; call once per tick
    pub fn tick(&mut self) -> Result<Vec<(String, SyncOutcome)>> {
        if !self.sync.has_pending() {
            return Ok(Vec::new());
        }
        self.sync.flush().context("Failed to flush pending syncs")
    }

    /// Readiness per scope
    pub fn summary(&self) -> BTreeMap<String, bool> {
        self.sync.store().read_summary()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ConnectionKind, Endpoint, MemoryBackend, NodeData};

    fn workbench() -> Workbench<MemoryBackend> {
        Workbench::new(SnapshotStore::new(MemoryBackend::new()))
    }

    fn build_home(bench: &mut Workbench<MemoryBackend>) {
        for (id, ty) in [("onu", "onu"), ("rt", "router"), ("pc", "pc")] {
            bench
                .apply("home", TopologyEvent::DeviceAdded(NodeData::new(id, ty)))
                .unwrap();
        }
        bench
            .apply(
                "home",
                TopologyEvent::ConnectionAdded {
                    kind: ConnectionKind::Fiber,
                    a: Endpoint::Anchor,
                    b: Endpoint::port("onu", "fiber"),
                },
            )
            .unwrap();
        bench
            .apply(
                "home",
                TopologyEvent::ConnectionAdded {
                    kind: ConnectionKind::Copper,
                    a: Endpoint::port("onu", "lan"),
                    b: Endpoint::port("rt", "wan"),
                },
            )
            .unwrap();
        bench
            .apply(
                "home",
                TopologyEvent::ConnectionAdded {
                    kind: ConnectionKind::Copper,
                    a: Endpoint::port("rt", "lan1"),
                    b: Endpoint::port("pc", "lan"),
                },
            )
            .unwrap();
    }

    #[test]
    fn test_burst_is_one_write() {
        let mut bench = workbench();
        build_home(&mut bench);
        assert_eq!(bench.coordinator().pending_count(), 1);
        let outcomes = bench.tick().unwrap();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(bench.summary()["home"], true);
        assert!(bench.tick().unwrap().is_empty());
    }

    #[test]
    fn test_deleting_router_downgrades() {
        let mut bench = workbench();
        build_home(&mut bench);
        bench.tick().unwrap();

        bench
            .apply("home", TopologyEvent::DeviceRemoved { id: "rt".into() })
            .unwrap();
        bench.tick().unwrap();

        let snapshot = bench.store().get().unwrap();
        assert_eq!(
            snapshot.edges("home"),
            EdgeSet::new()
                .with("fiberOnu", true)
                .with("onuRouter", false)
                .with("routerPc", false)
        );
        assert_eq!(bench.summary()["home"], false);
    }

    #[test]
    fn test_rejected_mutation_queues_nothing() {
        let mut bench = workbench();
        let err = bench
            .apply("home", TopologyEvent::DeviceRemoved { id: "ghost".into() })
            .unwrap_err();
        assert!(err.to_string().contains("deleteDevice"));
        assert!(!bench.coordinator().has_pending());
    }

    #[test]
    fn test_unknown_scope() {
        let mut bench = workbench();
        assert!(bench
            .apply("garage", TopologyEvent::DeviceAdded(NodeData::new("x", "pc")))
            .is_err());
        assert!(bench.derive("garage").is_err());
    }

    #[test]
    fn test_load_topology_resyncs() {
        let mut bench = workbench();
        let mut t = Topology::new();
        t.add_node(NodeData::new("onu", "onu")).unwrap();
        t.connect(ConnectionKind::Fiber, Endpoint::Anchor, Endpoint::port("onu", "fiber"))
            .unwrap();
        let edges = bench.load_topology("company", t).unwrap();
        assert!(edges.get("fiberOnu"));
        bench.tick().unwrap();
        let snapshot = bench.store().get().unwrap();
        let section = snapshot.section("company").unwrap();
        assert_eq!(section.status["lanClients"], 1);
        assert_eq!(section.meta.as_ref().unwrap().last_sync_reason.as_deref(), Some("resync"));
    }

    #[test]
    fn test_new_client_updates_company_status() {
        let mut bench = workbench();
        bench
            .apply("company", TopologyEvent::DeviceAdded(NodeData::new("pc1", "pc")))
            .unwrap();
        bench.tick().unwrap();
        bench
            .apply("company", TopologyEvent::DeviceAdded(NodeData::new("pc2", "pc")))
            .unwrap();

        let outcomes = bench.tick().unwrap();
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].1.is_written());
        let snapshot = bench.store().get().unwrap();
        assert_eq!(snapshot.section("company").unwrap().status["lanClients"], 2);
    }
}
