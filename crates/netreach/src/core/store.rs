//! Snapshot store
//!
//! The single source of truth shared by every context. All reads go through
//! the version gate; all writes stamp the version and `updatedAt` and then
//! notify local listeners and the cross-context hub.

use chrono::Utc;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::core::{
    now_millis, BroadcastHub, ChangeNotice, ChangeSubscription, ContextId, Listener, ScopeSpec,
    Snapshot, StorageBackend, StoreError, DEFAULT_CHANNEL_CAPACITY, SNAPSHOT_VERSION,
};
use crate::scopes::BUILTIN_SCOPES;

/// Default snapshot key
pub const DEFAULT_STORE_KEY: &str = "app:network:saves:default";

/// Default prefix for per-scope drafts
pub const DEFAULT_DRAFT_PREFIX: &str = "app:network:session:";

/// Store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Backend key holding the snapshot
    pub key: String,
    /// Schema version written and required on read
    pub version: u32,
    /// Backend key prefix for drafts
    pub draft_prefix: String,
    /// Buffer size for hubs created from this config
    pub channel_capacity: usize,
    /// Scopes present in the default snapshot and the summary
    pub scopes: Vec<ScopeSpec>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            key: DEFAULT_STORE_KEY.to_string(),
            version: SNAPSHOT_VERSION,
            draft_prefix: DEFAULT_DRAFT_PREFIX.to_string(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            scopes: BUILTIN_SCOPES.to_vec(),
        }
    }
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn with_draft_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.draft_prefix = prefix.into();
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    pub fn with_scopes(mut self, scopes: impl IntoIterator<Item = ScopeSpec>) -> Self {
        self.scopes = scopes.into_iter().collect();
        self
    }

    /// Find a configured scope
    pub fn scope(&self, name: &str) -> Option<&ScopeSpec> {
        self.scopes.iter().find(|s| s.name == name)
    }

    /// Create a hub sized from this config
    pub fn hub(&self) -> BroadcastHub {
        BroadcastHub::new(self.channel_capacity)
    }

    fn draft_key(&self, scope: &str) -> String {
        format!("{}{}", self.draft_prefix, scope)
    }
}

/// A parked work-in-progress value for one scope
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Draft<T> {
    version: u32,
    saved_at: chrono::DateTime<Utc>,
    data: T,
}

/// Handle on the shared snapshot for one context
pub struct SnapshotStore<B> {
    backend: B,
    config: StoreConfig,
    context: ContextId,
    hub: Option<BroadcastHub>,
    listeners: Vec<Listener>,
}

impl<B: StorageBackend> SnapshotStore<B> {
    /// Open a handle with the default configuration
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, StoreConfig::default())
    }

    /// Open a handle with an explicit configuration
    pub fn with_config(backend: B, config: StoreConfig) -> Self {
        let context = ContextId::next();
        debug!(context = %context, key = %config.key, "Snapshot store opened");
        Self {
            backend,
            config,
            context,
            hub: None,
            listeners: Vec::new(),
        }
    }

    /// Join a cross-context hub
    pub fn with_hub(mut self, hub: BroadcastHub) -> Self {
        self.hub = Some(hub);
        self
    }

    /// Subscribe to writes made by other contexts on the same hub
    ///
    /// Returns `None` if the handle has not joined a hub.
    pub fn subscribe(&self) -> Option<ChangeSubscription> {
        self.hub.as_ref().map(|hub| hub.subscribe(self.context))
    }

    /// Register a local listener, called after each write by this handle
    pub fn on_change(&mut self, listener: impl Fn(&ChangeNotice) + Send + Sync + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn context(&self) -> ContextId {
        self.context
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Current snapshot, or `None` if absent, unreadable or another version
    ///
    /// Never writes and never surfaces an error.
    pub fn get(&self) -> Option<Snapshot> {
        match self.backend.read(&self.config.key) {
            Ok(Some(raw)) => Snapshot::from_json(&raw, self.config.version),
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, key = %self.config.key, "Snapshot read failed");
                None
            }
        }
    }

    /// Current snapshot or the default shape
    pub fn load_or_default(&self) -> Snapshot {
        self.get().unwrap_or_else(|| self.default_snapshot())
    }

    /// Default shape for the configured scopes
    pub fn default_snapshot(&self) -> Snapshot {
        Snapshot::default_for(&self.config.scopes, self.config.version)
    }

    /// Replace the snapshot
    pub fn set(&mut self, snapshot: Snapshot) -> Result<Snapshot, StoreError> {
        self.commit(snapshot)
    }

    /// Read-modify-write
    ///
    /// The mutator works on a copy of the current snapshot (or the default
    /// shape). If it returns a snapshot, that one is written; otherwise the
    /// mutated copy is.
    pub fn patch<F>(&mut self, mutator: F) -> Result<Snapshot, StoreError>
    where
        F: FnOnce(&mut Snapshot) -> Option<Snapshot>,
    {
        let mut draft = self.load_or_default();
        let next = mutator(&mut draft).unwrap_or(draft);
        self.commit(next)
    }

    /// Remove the snapshot
    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.backend.remove(&self.config.key)?;
        info!(key = %self.config.key, "Snapshot cleared");
        self.notify();
        Ok(())
    }

    /// Readiness for every configured scope; all false when absent
    pub fn read_summary(&self) -> BTreeMap<String, bool> {
        crate::core::project_summary(self.get().as_ref(), &self.config.scopes)
    }

    /// Park a work-in-progress value for a scope
    pub fn save_draft<T: Serialize>(&self, scope: &str, value: &T) -> Result<(), StoreError> {
        let draft = Draft {
            version: self.config.version,
            saved_at: Utc::now(),
            data: value,
        };
        let raw = serde_json::to_string(&draft)?;
        self.backend.write(&self.config.draft_key(scope), &raw)?;
        debug!(scope, bytes = raw.len(), "Draft saved");
        Ok(())
    }

    /// Load a parked value; `None` when absent, unreadable or stale
    pub fn load_draft<T: DeserializeOwned>(&self, scope: &str) -> Option<T> {
        let raw = match self.backend.read(&self.config.draft_key(scope)) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(error = %e, scope, "Draft read failed");
                return None;
            }
        };
        let value: Value = serde_json::from_str(&raw).ok()?;
        if value.get("version").and_then(Value::as_u64) != Some(u64::from(self.config.version)) {
            debug!(scope, "Draft version mismatch, ignoring");
            return None;
        }
        match serde_json::from_value::<Draft<T>>(value) {
            Ok(draft) => Some(draft.data),
            Err(e) => {
                warn!(error = %e, scope, "Draft has an unexpected shape, ignoring");
                None
            }
        }
    }

    /// Drop a parked value
    pub fn clear_draft(&self, scope: &str) -> Result<(), StoreError> {
        self.backend.remove(&self.config.draft_key(scope))
    }

    fn commit(&mut self, mut snapshot: Snapshot) -> Result<Snapshot, StoreError> {
        snapshot.version = self.config.version;
        snapshot.updated_at = now_millis();
        let raw = snapshot.to_json()?;
        self.backend.write(&self.config.key, &raw)?;
        info!(
            context = %self.context,
            key = %self.config.key,
            bytes = raw.len(),
            "Snapshot written"
        );
        self.notify();
        Ok(snapshot)
    }

    fn notify(&self) {
        let notice = ChangeNotice::now(self.context);
        for listener in &self.listeners {
            listener(&notice);
        }
        if let Some(hub) = &self.hub {
            hub.publish(notice);
        }
    }
}
