//! Interfaces to the collaborators around the engine
//!
//! The ping transport, the bulk status source and the page renderer live
//! outside this crate. Renderer and display calls are made while engine
//! locks are held, so implementations must not call back into the engine.

use std::future::Future;

use dcstatus_core::{ConnectivityState, DcResult, NodeId, ViewHandle};
use dcstatus_registry::{DetailView, StatusView};

/// Callback invoked by the ping layer on every connectivity change
pub type PingCallback = Box<dyn Fn(ConnectivityState) + Send + Sync>;

/// Connection layer performing the per-node pings
pub trait PingRegistrar: Send + Sync {
    /// Start pinging `node`; `callback` fires an unbounded number of times
    fn register_node_ping(&self, node: NodeId, callback: PingCallback);

    /// Stop every ping started by this page view
    fn release_all(&self);
}

/// Source of the bulk status document
pub trait SnapshotSource: Send + Sync + 'static {
    /// Raw JSON body of the status document
    fn fetch(&self) -> impl Future<Output = DcResult<String>> + Send;
}

/// Page renderer owning the views behind the handles
pub trait Renderer: Send + Sync {
    /// Swap the status view behind `old` for `view`, returning its handle
    fn replace_status(&self, old: ViewHandle, view: &StatusView) -> ViewHandle;

    /// Swap the detail view behind `old` for `view`, returning its handle
    fn replace_detail(&self, old: ViewHandle, view: &DetailView) -> ViewHandle;

    /// Spin or stop the loading indicator
    fn set_loading(&self, indicator: ViewHandle, active: bool);

    /// Make room for `items` detail lines in a row
    fn set_row_items(&self, row: ViewHandle, items: usize);

    fn set_expanded(&self, row: ViewHandle, expanded: bool);

    /// Whether the view is still attached to the page
    fn is_reachable(&self, handle: ViewHandle) -> bool;
}

/// Countdown widgets: seconds label and "time remaining" gauge
pub trait CountdownDisplay: Send + Sync {
    fn set_seconds(&self, seconds: u32);

    fn set_percent(&self, percent: u32);

    /// Definite gauge while counting, indeterminate while reloading
    fn set_definite(&self, definite: bool);
}
