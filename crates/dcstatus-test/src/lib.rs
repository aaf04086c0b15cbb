//! DC Status Test Harness - Mock collaborators and load scenarios
//!
//! This crate provides:
//! - An in-memory ping layer, renderer, countdown display and snapshot source
//! - Seeded ping storms against the fan-out
//! - An engine harness for paused-clock scenario tests

pub mod harness;
pub mod mocks;
pub mod storm;

pub use harness::*;
pub use mocks::*;
pub use storm::*;
