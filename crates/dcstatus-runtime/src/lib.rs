//! DC Status Runtime - Live synchronization of the status page
//!
//! This crate drives the status cycle:
//! 1. Subscribe once per node to the ping layer
//! 2. Fan every ping event out to the node's bindings
//! 3. Fetch the bulk snapshot, at most once per refresh window
//! 4. Merge snapshot details into the bindings
//! 5. Count down, then debounce into the next refresh
//!
//! The external UI is reached through the traits in [`ports`].

pub mod countdown;
pub mod engine;
pub mod fanout;
pub mod http;
pub mod ports;
pub mod refresh;
pub mod telemetry;
pub mod timer;

pub use countdown::*;
pub use engine::*;
pub use fanout::*;
pub use http::*;
pub use ports::*;
pub use refresh::*;
pub use telemetry::*;
pub use timer::*;
