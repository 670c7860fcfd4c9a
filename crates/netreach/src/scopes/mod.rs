//! Built-in scopes and the workbench that drives them

mod company;
mod home;
mod workbench;

pub use company::*;
pub use home::*;
pub use workbench::*;

use crate::core::ScopeSpec;

/// Every scope shipped with the crate
pub const BUILTIN_SCOPES: &[ScopeSpec] = &[HOME, COMPANY];
