//! Core error types for topology processing
//!
//! Malformed topologies are never errors for the engine: dangling endpoints and
//! unknown types simply drop out of traversal. The errors here cover the two
//! places that can genuinely fail: mutating a topology, and talking to storage.

use thiserror::Error;

/// Errors raised by the topology mutation API
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopologyError {
    #[error("Unknown node: {id}")]
    UnknownNode { id: String },

    #[error("Duplicate node: {id}")]
    DuplicateNode { id: String },

    #[error("Unknown connection: {id}")]
    UnknownConnection { id: String },

    #[error("Duplicate {kind} connection between {a} and {b}")]
    DuplicateConnection { kind: String, a: String, b: String },

    #[error("Invalid connection: {message}")]
    InvalidConnection { message: String },
}

impl TopologyError {
    /// Create a new unknown node error
    pub fn unknown_node(id: impl Into<String>) -> Self {
        Self::UnknownNode { id: id.into() }
    }

    /// Create a new invalid connection error
    pub fn invalid_connection(message: impl Into<String>) -> Self {
        Self::InvalidConnection {
            message: message.into(),
        }
    }
}

/// Errors raised by the snapshot store and its backends
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage backend error: {message}")]
    Backend { message: String },

    #[error("Storage quota exceeded: {needed} bytes needed, {limit} allowed")]
    QuotaExceeded { needed: usize, limit: usize },

    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },

    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("Unknown scope: {scope}")]
    UnknownScope { scope: String },
}

impl StoreError {
    /// Create a new backend error
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Create a new unknown scope error
    pub fn unknown_scope(scope: impl Into<String>) -> Self {
        Self::UnknownScope {
            scope: scope.into(),
        }
    }
}
