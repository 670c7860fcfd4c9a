//! Persisted snapshot shape
//!
//! Wire format (camelCase JSON), one section per scope flattened at the top
//! level:
//!
//! ```json
//! {
//!   "version": 1,
//!   "updatedAt": "2026-10-16T09:00:00.000Z",
//!   "home": { "edges": {}, "reach": { "ok": false, "count": 0 } },
//!   "summary": { "homeOK": false }
//! }
//! ```

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::core::{EdgeSet, ScopeSpec, StatusMap};

/// Current snapshot schema version
pub const SNAPSHOT_VERSION: u32 = 1;

/// Aggregate readiness for one scope
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reach {
    /// Every required fact holds
    pub ok: bool,
    /// Number of true facts
    pub count: usize,
}

impl Reach {
    /// Compute from a scope's effective edges
    pub fn compute(spec: &ScopeSpec, edges: &EdgeSet) -> Self {
        Self {
            ok: spec.is_ready(edges),
            count: edges.true_count(),
        }
    }
}

/// Bookkeeping about the last sync of a scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncMeta {
    #[serde(serialize_with = "serialize_millis")]
    pub last_sync_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync_reason: Option<String>,
}

/// One scope's persisted state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScopeSection {
    #[serde(default)]
    pub edges: EdgeSet,
    #[serde(default)]
    pub reach: Reach,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub status: StatusMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<SyncMeta>,
}

/// The persisted root object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub version: u32,
    #[serde(serialize_with = "serialize_millis")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub summary: BTreeMap<String, bool>,
    #[serde(flatten)]
    pub sections: BTreeMap<String, ScopeSection>,
}

impl Snapshot {
    /// Default shape: every scope present with all facts false
    pub fn default_for(scopes: &[ScopeSpec], version: u32) -> Self {
        let mut snapshot = Snapshot {
            version,
            updated_at: now_millis(),
            summary: BTreeMap::new(),
            sections: BTreeMap::new(),
        };
        for spec in scopes {
            let edges = EdgeSet::all_false(spec.facts());
            snapshot.sections.insert(
                spec.name.to_string(),
                ScopeSection {
                    reach: Reach::compute(spec, &edges),
                    edges,
                    ..ScopeSection::default()
                },
            );
            snapshot.summary.insert(spec.summary_key(), false);
        }
        snapshot
    }

    /// A scope's section
    pub fn section(&self, scope: &str) -> Option<&ScopeSection> {
        self.sections.get(scope)
    }

    /// A scope's section, created empty if missing
    pub fn section_mut(&mut self, scope: &str) -> &mut ScopeSection {
        self.sections.entry(scope.to_string()).or_default()
    }

    /// A scope's edges, empty if the scope is missing
    pub fn edges(&self, scope: &str) -> EdgeSet {
        self.section(scope)
            .map(|s| s.edges.clone())
            .unwrap_or_default()
    }

    /// A scope's readiness flag from the summary
    pub fn is_ready(&self, spec: &ScopeSpec) -> bool {
        self.summary
            .get(&spec.summary_key())
            .copied()
            .unwrap_or(false)
    }

    /// Parse stored text, applying the version gate
    ///
    /// Anything unparsable, shaped wrong or stamped with another version is
    /// `None`.
    pub fn from_json(raw: &str, expected_version: u32) -> Option<Self> {
        let value: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Stored snapshot is not valid JSON, ignoring");
                return None;
            }
        };

        let version = value.get("version").and_then(Value::as_u64);
        if version != Some(u64::from(expected_version)) {
            debug!(
                found = ?version,
                expected = expected_version,
                "Stored snapshot version mismatch, ignoring"
            );
            return None;
        }

        match serde_json::from_value(value) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!(error = %e, "Stored snapshot has an unexpected shape, ignoring");
                None
            }
        }
    }

    /// Serialize for storage
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Current time at the precision timestamps are persisted with
///
/// Values stamped with this compare equal after a write and a read.
pub fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

fn serialize_millis<S: serde::Serializer>(
    at: &DateTime<Utc>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&at.to_rfc3339_opts(SecondsFormat::Millis, true))
}
