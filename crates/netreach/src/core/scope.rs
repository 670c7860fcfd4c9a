//! Scope descriptors
//!
//! A scope is an independent area of the workbench (a home network, a
//! company network) with its own rule table, its own edge set in the
//! snapshot and its own readiness boolean in the summary.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::core::{DeviceType, EdgeSet, FactRule, TopologyView};

/// Extra status fields stored next to a scope's edges
pub type StatusMap = BTreeMap<String, Value>;

/// Projects a scope's effective edges into its status fields
pub type StatusFn = fn(&EdgeSet, &ScopeMetrics) -> StatusMap;

/// Topology counters available to status projections
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScopeMetrics {
    /// Devices that are not routers
    pub lan_clients: usize,
}

impl ScopeMetrics {
    /// Count from a topology
    pub fn from_topology<T: TopologyView + ?Sized>(topology: &T) -> Self {
        Self {
            lan_clients: topology
                .nodes()
                .filter(|n| n.device_type != DeviceType::Router)
                .count(),
        }
    }
}

/// Static description of a scope
#[derive(Clone, Copy)]
pub struct ScopeSpec {
    /// Scope name, also the snapshot section key
    pub name: &'static str,
    /// Fact rules evaluated for this scope
    pub rules: &'static [FactRule],
    /// Optional status projection
    pub status: Option<StatusFn>,
}

impl ScopeSpec {
    /// Key of this scope's readiness boolean in the summary (`homeOK`)
    pub fn summary_key(&self) -> String {
        format!("{}OK", self.name)
    }

    /// Names of every fact, in table order
    pub fn facts(&self) -> impl Iterator<Item = &'static str> {
        self.rules.iter().map(|r| r.name)
    }

    /// Names of the facts that gate readiness
    pub fn required_facts(&self) -> impl Iterator<Item = &'static str> {
        self.rules.iter().filter(|r| r.required).map(|r| r.name)
    }

    /// Returns true if the scope declares the fact
    pub fn has_fact(&self, name: &str) -> bool {
        self.rules.iter().any(|r| r.name == name)
    }

    /// Readiness: every required fact is true
    pub fn is_ready(&self, edges: &EdgeSet) -> bool {
        edges.all_of(self.required_facts())
    }

    /// Status fields for an edge set, empty when the scope has none
    pub fn project_status(&self, edges: &EdgeSet, metrics: &ScopeMetrics) -> StatusMap {
        self.status
            .map(|project| project(edges, metrics))
            .unwrap_or_default()
    }
}

impl fmt::Debug for ScopeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeSpec")
            .field("name", &self.name)
            .field("facts", &self.facts().collect::<Vec<_>>())
            .field("has_status", &self.status.is_some())
            .finish()
    }
}

impl PartialEq for ScopeSpec {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for ScopeSpec {}

/// Look up a scope by name
pub fn find_scope<'a>(scopes: &'a [ScopeSpec], name: &str) -> Option<&'a ScopeSpec> {
    scopes.iter().find(|s| s.name == name)
}
