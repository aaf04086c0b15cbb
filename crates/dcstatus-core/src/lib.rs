//! DC Status Core - Fundamental types and primitives
//!
//! This crate defines the core types used throughout the status engine:
//! - Identifiers (NodeId, ViewHandle, BindingId)
//! - Connectivity states and bulk snapshots
//! - UI bindings and render modes
//! - Engine configuration and errors

pub mod id;
pub mod state;
pub mod binding;
pub mod config;
pub mod error;

pub use id::*;
pub use state::*;
pub use binding::*;
pub use config::*;
pub use error::*;
