//! DC Status Prefix - Which nodes serve a dialing prefix
//!
//! This crate provides:
//! - The prefix catalog (descriptors + node association table)
//! - Prefix resolution and locale-based suggestions
//! - Selector options and example-number masks for the identify panel

pub mod catalog;
pub mod resolver;
pub mod mask;

pub use catalog::*;
pub use resolver::*;
pub use mask::*;
