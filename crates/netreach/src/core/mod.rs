//! Core topology model, derivation engine and persistence protocol
//!
//! Leaf-first: types and the topology model, the graph builder and
//! reachability engine, the edge deriver, then the snapshot store, its
//! backends and notifications, and the sync coordinator on top.

mod backend;
mod derive;
mod error;
mod graph;
pub mod logging;
mod notify;
mod reach;
mod scope;
mod snapshot;
mod store;
mod summary;
mod sync;
mod topology;
mod types;

pub use backend::*;
pub use derive::*;
pub use error::*;
pub use graph::*;
pub use logging::*;
pub use notify::*;
pub use reach::*;
pub use scope::*;
pub use snapshot::*;
pub use store::*;
pub use summary::*;
pub use sync::*;
pub use topology::*;
pub use types::*;
