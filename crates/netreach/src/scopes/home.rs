//! Home network scope
//!
//! Fiber from the uplink into the ONU, copper from the ONU to the router and
//! from the router to a PC. All three facts are required.

use crate::core::{ConnectionKind, DeviceType, FactRule, Predicate, ScopeSpec};

/// Home fact rules
pub const HOME_RULES: &[FactRule] = &[
    FactRule {
        name: "fiberOnu",
        predicate: Predicate::AnchorAdjacent {
            kind: ConnectionKind::Fiber,
            target: DeviceType::Onu,
        },
        required: true,
    },
    FactRule {
        name: "onuRouter",
        predicate: Predicate::TypedPath {
            kind: ConnectionKind::Copper,
            source: DeviceType::Onu,
            targets: &[DeviceType::Router],
        },
        required: true,
    },
    FactRule {
        name: "routerPc",
        predicate: Predicate::TypedPath {
            kind: ConnectionKind::Copper,
            source: DeviceType::Router,
            targets: &[DeviceType::Pc],
        },
        required: true,
    },
];

/// The home scope
pub const HOME: ScopeSpec = ScopeSpec {
    name: "home",
    rules: HOME_RULES,
    status: None,
};
