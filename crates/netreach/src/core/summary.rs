//! Summary projection
//!
//! Readiness is computed inside every sync patch, so reading it is a pure
//! lookup. Views that only need "is this scope done" read here instead of
//! re-deriving anything.

use std::collections::BTreeMap;

use crate::core::{ScopeSpec, Snapshot};

/// Readiness per scope, keyed by scope name
///
/// Scopes missing from the snapshot (or an absent snapshot) read as false.
pub fn project_summary(snapshot: Option<&Snapshot>, scopes: &[ScopeSpec]) -> BTreeMap<String, bool> {
    scopes
        .iter()
        .map(|spec| {
            let ready = snapshot.is_some_and(|s| s.is_ready(spec));
            (spec.name.to_string(), ready)
        })
        .collect()
}
