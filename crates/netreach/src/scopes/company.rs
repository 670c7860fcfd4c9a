//! Company network scope
//!
//! Same uplink chain as home, but the router's LAN side may serve either a
//! PC or a web server, and an FTP server is tracked as an optional fact.
//! The status projection feeds the company dashboard.

use serde_json::Value;

use crate::core::{
    ConnectionKind, DeviceType, EdgeSet, FactRule, Predicate, ScopeMetrics, ScopeSpec, StatusMap,
};

/// Company fact rules
pub const COMPANY_RULES: &[FactRule] = &[
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
            targets: &[DeviceType::Pc, DeviceType::Web],
        },
        required: true,
    },
    FactRule {
        name: "routerFtp",
        predicate: Predicate::TypedPath {
            kind: ConnectionKind::Copper,
            source: DeviceType::Router,
            targets: &[DeviceType::Ftp],
        },
        required: false,
    },
];

/// Dashboard fields derived from the effective company edges
pub fn company_status(edges: &EdgeSet, metrics: &ScopeMetrics) -> StatusMap {
    let uplink = edges.get("fiberOnu") && edges.get("onuRouter");
    StatusMap::from([
        ("fiberLink".to_string(), Value::from(edges.get("fiberOnu"))),
        ("routerWanLink".to_string(), Value::from(edges.get("onuRouter"))),
        ("webReachable".to_string(), Value::from(edges.get("routerPc"))),
        (
            "ftpReachable".to_string(),
            Value::from(uplink && edges.get("routerFtp")),
        ),
        ("lanClients".to_string(), Value::from(metrics.lan_clients)),
    ])
}

/// The company scope
pub const COMPANY: ScopeSpec = ScopeSpec {
    name: "company",
    rules: COMPANY_RULES,
    status: Some(company_status),
};
