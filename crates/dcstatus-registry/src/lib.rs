//! DC Status Registry - Live UI bindings and the views rendered into them
//!
//! This crate provides:
//! - The slot registry (node → bindings multimap, stale pruning)
//! - Immutable status and detail views built from states and snapshots

pub mod registry;
pub mod view;

pub use registry::*;
pub use view::*;
