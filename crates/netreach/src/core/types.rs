//! Core type definitions for topology processing
//!
//! This module contains the fundamental types used throughout netreach:
//! device types, connection kinds, endpoints and the node/connection records.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Device type tag
///
/// An open enumeration: the well-known device types get their own variant,
/// anything else is carried verbatim in [`DeviceType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DeviceType {
    /// Optical network unit (fiber terminal)
    Onu,
    /// Router with a WAN side and a LAN side
    Router,
    /// Desktop client
    Pc,
    /// Web server
    Web,
    /// FTP server
    Ftp,
    /// DNS server
    Dns,
    /// Smartphone client
    Phone,
    /// Tablet client
    Tablet,
    /// Game console client
    Game,
    /// Wired printer
    Printer,
    /// Any other type tag
    Other(String),
}

impl DeviceType {
    /// The canonical lowercase tag for this type
    pub fn as_str(&self) -> &str {
        match self {
            DeviceType::Onu => "onu",
            DeviceType::Router => "router",
            DeviceType::Pc => "pc",
            DeviceType::Web => "web",
            DeviceType::Ftp => "ftp",
            DeviceType::Dns => "dns",
            DeviceType::Phone => "phone",
            DeviceType::Tablet => "tablet",
            DeviceType::Game => "game",
            DeviceType::Printer => "printer",
            DeviceType::Other(tag) => tag,
        }
    }

    /// Returns true for end-user client devices
    pub fn is_client(&self) -> bool {
        matches!(
            self,
            DeviceType::Pc | DeviceType::Phone | DeviceType::Tablet | DeviceType::Game
        )
    }

    /// Returns true for server devices
    pub fn is_server(&self) -> bool {
        matches!(self, DeviceType::Web | DeviceType::Ftp | DeviceType::Dns)
    }
}

impl From<&str> for DeviceType {
    fn from(tag: &str) -> Self {
        match tag.trim().to_lowercase().as_str() {
            "onu" => DeviceType::Onu,
            "router" => DeviceType::Router,
            "pc" => DeviceType::Pc,
            "web" => DeviceType::Web,
            "ftp" => DeviceType::Ftp,
            "dns" => DeviceType::Dns,
            "phone" => DeviceType::Phone,
            "tablet" => DeviceType::Tablet,
            "game" => DeviceType::Game,
            "printer" => DeviceType::Printer,
            _ => DeviceType::Other(tag.to_string()),
        }
    }
}

impl From<String> for DeviceType {
    fn from(tag: String) -> Self {
        DeviceType::from(tag.as_str())
    }
}

impl From<DeviceType> for String {
    fn from(value: DeviceType) -> Self {
        match value {
            DeviceType::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for DeviceType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(DeviceType::from(s))
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Physical kind of a connection
///
/// The kind decides which reachability queries may traverse a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionKind {
    /// Optical fiber
    Fiber,
    /// Copper ethernet (RJ45 / LAN)
    #[serde(alias = "lan", alias = "rj45")]
    Copper,
}

impl ConnectionKind {
    /// Parse a kind from its name or one of its aliases
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "fiber" => Some(ConnectionKind::Fiber),
            "copper" | "lan" | "rj45" => Some(ConnectionKind::Copper),
            _ => None,
        }
    }
}

impl fmt::Display for ConnectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionKind::Fiber => write!(f, "fiber"),
            ConnectionKind::Copper => write!(f, "copper"),
        }
    }
}

/// A port on a placed device
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortRef {
    /// Owning node ID
    pub node: String,
    /// Port name on that node (e.g. `wan`, `lan`, `fiber`)
    #[serde(default)]
    pub port: String,
}

/// One end of a connection
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "EndpointRepr", into = "EndpointRepr")]
pub enum Endpoint {
    /// The external uplink anchor
    Anchor,
    /// A port on a device
    Port(PortRef),
}

impl Endpoint {
    /// Create a port endpoint
    pub fn port(node: impl Into<String>, port: impl Into<String>) -> Self {
        Endpoint::Port(PortRef {
            node: node.into(),
            port: port.into(),
        })
    }

    /// Returns true if this endpoint is the anchor
    pub fn is_anchor(&self) -> bool {
        matches!(self, Endpoint::Anchor)
    }

    /// The node this endpoint belongs to, if any
    pub fn node_id(&self) -> Option<&str> {
        match self {
            Endpoint::Anchor => None,
            Endpoint::Port(port) => Some(port.node.as_str()),
        }
    }

    /// Stable identity key used for ordering and duplicate detection
    pub fn key(&self) -> String {
        match self {
            Endpoint::Anchor => "anchor".to_string(),
            Endpoint::Port(port) => format!("{}:{}", port.node, port.port),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum EndpointRepr {
    Port(PortRef),
    Anchor(AnchorTag),
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum AnchorTag {
    #[serde(alias = "wan", alias = "wanAnchor")]
    Anchor,
}

impl From<EndpointRepr> for Endpoint {
    fn from(repr: EndpointRepr) -> Self {
        match repr {
            EndpointRepr::Port(port) => Endpoint::Port(port),
            EndpointRepr::Anchor(AnchorTag::Anchor) => Endpoint::Anchor,
        }
    }
}

impl From<Endpoint> for EndpointRepr {
    fn from(endpoint: Endpoint) -> Self {
        match endpoint {
            Endpoint::Anchor => EndpointRepr::Anchor(AnchorTag::Anchor),
            Endpoint::Port(port) => EndpointRepr::Port(port),
        }
    }
}

/// A placed device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeData {
    /// Unique identifier for the node
    pub id: String,
    /// Device type tag
    #[serde(rename = "type")]
    pub device_type: DeviceType,
}

impl NodeData {
    /// Create a new node
    pub fn new(id: impl Into<String>, device_type: impl Into<DeviceType>) -> Self {
        Self {
            id: id.into(),
            device_type: device_type.into(),
        }
    }
}

/// A cable between two endpoints
///
/// Endpoints are kept in a stable order (by [`Endpoint::key`]) so that two
/// connections describing the same link compare equal regardless of which
/// end the user started dragging from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    /// Unique identifier for the connection
    #[serde(default)]
    pub id: String,
    /// Physical kind of the cable
    pub kind: ConnectionKind,
    /// First endpoint
    pub a: Endpoint,
    /// Second endpoint
    pub b: Endpoint,
}

impl Connection {
    /// Create a new connection with normalized endpoint order
    pub fn new(id: impl Into<String>, kind: ConnectionKind, a: Endpoint, b: Endpoint) -> Self {
        Self {
            id: id.into(),
            kind,
            a,
            b,
        }
        .normalized()
    }

    /// Return this connection with its endpoints in stable order
    pub fn normalized(mut self) -> Self {
        if self.a.key().cmp(&self.b.key()) == Ordering::Greater {
            std::mem::swap(&mut self.a, &mut self.b);
        }
        self
    }

    /// Returns true if both connections have the same kind and the same
    /// unordered endpoint pair
    pub fn same_link(&self, other: &Connection) -> bool {
        if self.kind != other.kind {
            return false;
        }
        let (a, b) = (self.a.key(), self.b.key());
        let (c, d) = (other.a.key(), other.b.key());
        (a == c && b == d) || (a == d && b == c)
    }

    /// Returns true if either endpoint is the anchor
    pub fn touches_anchor(&self) -> bool {
        self.a.is_anchor() || self.b.is_anchor()
    }

    /// Returns true if either endpoint belongs to the given node
    pub fn touches_node(&self, node_id: &str) -> bool {
        self.a.node_id() == Some(node_id) || self.b.node_id() == Some(node_id)
    }

    /// The endpoint opposite the anchor, if this is an anchor connection
    pub fn anchor_peer(&self) -> Option<&Endpoint> {
        match (&self.a, &self.b) {
            (Endpoint::Anchor, other) | (other, Endpoint::Anchor) => Some(other),
            _ => None,
        }
    }
}
