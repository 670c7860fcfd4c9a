//! Edge derivation
//!
//! A scope's facts are declared as a static table of [`FactRule`]s. One
//! generic evaluator runs the whole table against a topology and produces an
//! [`EdgeSet`]. Rules are independent of each other, so evaluation order does
//! not matter.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, span, trace, Level};

use crate::core::{
    build_adjacency, exists_path_to_any, is_anchor_adjacent_to_type, Adjacency, ConnectionKind,
    DeviceType, TopologyView, TypeIndex,
};

/// How a fact is evaluated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// The anchor is wired directly to a node of `target` over `kind`
    AnchorAdjacent {
        kind: ConnectionKind,
        target: DeviceType,
    },
    /// Some `source` node reaches a node of one of `targets` over `kind`
    TypedPath {
        kind: ConnectionKind,
        source: DeviceType,
        targets: &'static [DeviceType],
    },
}

impl Predicate {
    /// The connection kind this predicate looks at
    pub fn kind(&self) -> ConnectionKind {
        match self {
            Predicate::AnchorAdjacent { kind, .. } | Predicate::TypedPath { kind, .. } => *kind,
        }
    }
}

/// A named fact and the predicate that decides it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactRule {
    /// Fact name as stored in the snapshot (e.g. `fiberOnu`)
    pub name: &'static str,
    /// Predicate deciding the fact
    pub predicate: Predicate,
    /// Whether the fact gates scope readiness
    pub required: bool,
}

/// Named boolean facts for one scope
///
/// Missing facts read as `false`. Backed by a sorted map so serialization is
/// stable, which the sync coordinator relies on for change detection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeSet(BTreeMap<String, bool>);

impl EdgeSet {
    /// Create an empty edge set
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an edge set with every named fact set to `false`
    pub fn all_false<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        Self(names.into_iter().map(|n| (n.to_string(), false)).collect())
    }

    /// Value of a fact (`false` when absent)
    pub fn get(&self, name: &str) -> bool {
        self.0.get(name).copied().unwrap_or(false)
    }

    /// Set a fact
    pub fn set(&mut self, name: impl Into<String>, value: bool) {
        self.0.insert(name.into(), value);
    }

    /// Builder-style [`EdgeSet::set`]
    pub fn with(mut self, name: impl Into<String>, value: bool) -> Self {
        self.set(name, value);
        self
    }

    /// Iterate over facts in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Number of facts
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no facts
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of true facts
    pub fn true_count(&self) -> usize {
        self.0.values().filter(|v| **v).count()
    }

    /// Returns true if at least one fact is true
    pub fn any_true(&self) -> bool {
        self.0.values().any(|v| *v)
    }

    /// Returns true if every named fact is true
    pub fn all_of<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> bool {
        names.into_iter().all(|n| self.get(n))
    }

    /// Per-fact logical OR
    pub fn union(&self, other: &EdgeSet) -> EdgeSet {
        let mut merged = self.clone();
        for (name, value) in other.iter() {
            let entry = merged.0.entry(name.to_string()).or_insert(false);
            *entry = *entry || value;
        }
        merged
    }

    /// Keep exactly the named facts, filling missing ones with `false`
    pub fn restricted_to<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> EdgeSet {
        Self(
            names
                .into_iter()
                .map(|n| (n.to_string(), self.get(n)))
                .collect(),
        )
    }
}

impl<S: Into<String>> FromIterator<(S, bool)> for EdgeSet {
    fn from_iter<I: IntoIterator<Item = (S, bool)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Evaluate every rule against the topology
///
/// Never fails: dangling endpoints and unknown types just make facts false.
pub fn derive_edges<T: TopologyView + ?Sized>(topology: &T, rules: &[FactRule]) -> EdgeSet {
    let derive_span = span!(
        Level::DEBUG,
        "derive_edges",
        rule_count = rules.len(),
        node_count = topology.node_count(),
        connection_count = topology.connection_count()
    );
    let _enter = derive_span.enter();

    let types = TypeIndex::from_topology(topology);
    let mut graphs: HashMap<ConnectionKind, Adjacency> = HashMap::new();
    let mut edges = EdgeSet::new();

    for rule in rules {
        let value = match &rule.predicate {
            Predicate::AnchorAdjacent { kind, target } => {
                is_anchor_adjacent_to_type(topology, *kind, target)
            }
            Predicate::TypedPath {
                kind,
                source,
                targets,
            } => {
                let adjacency = graphs
                    .entry(*kind)
                    .or_insert_with(|| build_adjacency(topology, *kind));
                exists_path_to_any(adjacency, &types, source, targets)
            }
        };
        trace!(fact = rule.name, value, "Fact evaluated");
        edges.set(rule.name, value);
    }

    debug!(true_count = edges.true_count(), edges = ?edges, "Edges derived");
    edges
}
