//! Sync coordinator
//!
//! Merges freshly derived edge sets into the shared snapshot. The merge
//! policy is what keeps facts from regressing: unless a sync is marked
//! destructive, a fact that is already true in the store stays true no
//! matter what a (possibly stale or mid-drag) recomputation says.
//!
//! Bursts of changes are coalesced: callers [`request`](SyncCoordinator::request)
//! as often as they like and [`flush`](SyncCoordinator::flush) at their tick
//! boundary; only the last pending edge set per scope is written.

use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, span, Level};

use crate::core::{
    now_millis, EdgeSet, Reach, ScopeMetrics, ScopeSpec, SnapshotStore, StorageBackend,
    StoreError, SyncMeta,
};

/// Per-sync flags
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOptions {
    /// Write even if nothing changed since this coordinator's last write
    pub force: bool,
    /// Replace stored facts instead of OR-merging (deletions only)
    pub destructive: bool,
    /// Recorded as `meta.lastSyncReason`
    pub reason: Option<String>,
    /// Topology counters for the scope's status projection
    pub metrics: ScopeMetrics,
}

impl SyncOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn destructive(mut self, destructive: bool) -> Self {
        self.destructive = destructive;
        self
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn metrics(mut self, metrics: ScopeMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Fold a newer request into this one
    ///
    /// Destructive and forced flags are sticky across a burst so that a
    /// deletion followed by a move still writes destructively.
    fn absorb(&mut self, newer: SyncOptions) {
        self.force |= newer.force;
        self.destructive |= newer.destructive;
        if newer.reason.is_some() {
            self.reason = newer.reason;
        }
        self.metrics = newer.metrics;
    }
}

/// Result of one sync
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The snapshot was written with these effective edges
    Written { edges: EdgeSet, ready: bool },
    /// Edges and status identical to the last write and still stored;
    /// nothing was written or broadcast
    Unchanged,
}

impl SyncOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, SyncOutcome::Written { .. })
    }
}

#[derive(Debug, Clone)]
struct PendingSync {
    edges: EdgeSet,
    options: SyncOptions,
}

/// Owns a store handle and writes edge sets into it
pub struct SyncCoordinator<B> {
    store: SnapshotStore<B>,
    last_written: HashMap<String, String>,
    pending: BTreeMap<String, PendingSync>,
}

impl<B: StorageBackend> SyncCoordinator<B> {
    pub fn new(store: SnapshotStore<B>) -> Self {
        Self {
            store,
            last_written: HashMap::new(),
            pending: BTreeMap::new(),
        }
    }

    pub fn store(&self) -> &SnapshotStore<B> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut SnapshotStore<B> {
        &mut self.store
    }

    pub fn into_store(self) -> SnapshotStore<B> {
        self.store
    }

    fn spec(&self, scope: &str) -> Result<ScopeSpec, StoreError> {
        self.store
            .config()
            .scope(scope)
            .copied()
            .ok_or_else(|| StoreError::unknown_scope(scope))
    }

    /// Merge `computed` into the snapshot for `scope` right away
    pub fn sync_edges(
        &mut self,
        scope: &str,
        computed: &EdgeSet,
        options: SyncOptions,
    ) -> Result<SyncOutcome, StoreError> {
        let spec = self.spec(scope)?;
        let computed = computed.restricted_to(spec.facts());
        let current = self.store.get();
        let stored = current.as_ref().and_then(|s| s.section(scope));
        let previous = stored
            .map(|section| section.edges.restricted_to(spec.facts()))
            .unwrap_or_else(|| EdgeSet::all_false(spec.facts()));

        let effective = if !options.destructive && previous.any_true() {
            previous.union(&computed)
        } else {
            computed
        };
        debug!(
            scope,
            destructive = options.destructive,
            previous = ?previous,
            effective = ?effective,
            "Edges merged"
        );

        let reach = Reach::compute(&spec, &effective);
        let status = spec.project_status(&effective, &options.metrics);

        // The stored section has to match too: a clear or a write from
        // another context invalidates what this coordinator last wrote.
        let fingerprint = serde_json::to_string(&(&effective, &status))?;
        let still_stored = stored.is_some_and(|section| {
            section.edges.restricted_to(spec.facts()) == effective && section.status == status
        });
        if !options.force && still_stored && self.last_written.get(scope) == Some(&fingerprint) {
            debug!(scope, "Section unchanged since last write, skipping");
            return Ok(SyncOutcome::Unchanged);
        }

        let summary_key = spec.summary_key();
        let section_edges = effective.clone();
        self.store.patch(move |snapshot| {
            let at = now_millis();
            let section = snapshot.section_mut(spec.name);
            section.edges = section_edges;
            section.reach = reach;
            section.status = status;
            section.meta = Some(SyncMeta {
                last_sync_at: at,
                last_sync_reason: options.reason,
            });
            snapshot.summary.insert(summary_key, reach.ok);
            None
        })?;

        info!(scope, ready = reach.ok, count = reach.count, "Edges synced");
        self.last_written.insert(scope.to_string(), fingerprint);
        Ok(SyncOutcome::Written {
            edges: effective,
            ready: reach.ok,
        })
    }

    /// Queue a sync, replacing any unflushed request for the same scope
    pub fn request(&mut self, scope: &str, edges: EdgeSet, options: SyncOptions) {
        match self.pending.get_mut(scope) {
            Some(pending) => {
                pending.edges = edges;
                pending.options.absorb(options);
                debug!(scope, "Pending sync replaced");
            }
            None => {
                self.pending
                    .insert(scope.to_string(), PendingSync { edges, options });
                debug!(scope, "Sync queued");
            }
        }
    }

    /// Drop a queued request
    pub fn cancel(&mut self, scope: &str) -> bool {
        self.pending.remove(scope).is_some()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Write every queued request
    ///
    /// On failure the failed request and the ones not yet processed stay
    /// queued for the next flush.
    pub fn flush(&mut self) -> Result<Vec<(String, SyncOutcome)>, StoreError> {
        let flush_span = span!(Level::DEBUG, "flush", pending = self.pending.len());
        let _enter = flush_span.enter();

        let mut queue = std::mem::take(&mut self.pending).into_iter();
        let mut outcomes = Vec::new();
        while let Some((scope, request)) = queue.next() {
            match self.sync_edges(&scope, &request.edges, request.options.clone()) {
                Ok(outcome) => outcomes.push((scope, outcome)),
                Err(e) => {
                    self.pending.insert(scope, request);
                    self.pending.extend(queue);
                    return Err(e);
                }
            }
        }
        Ok(outcomes)
    }
}
