//! Identity types for the status engine
//!
//! Node ids are externally defined (1..N). View handles are opaque keys
//! minted by the UI layer; the core only stores and forwards them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Backend node identity (historically a datacenter number)
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline]
    pub fn new(id: u32) -> Self {
        NodeId(id)
    }

    /// Node for a zero-based table index
    #[inline]
    pub fn from_index(index: usize) -> Self {
        NodeId(index as u32 + 1)
    }

    /// Zero-based table index, `None` for the invalid id 0
    #[inline]
    pub fn index(self) -> Option<usize> {
        (self.0 as usize).checked_sub(1)
    }

    #[inline]
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DC{}", self.0)
    }
}

/// Opaque reference to a piece of external UI state
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ViewHandle(pub u64);

impl ViewHandle {
    #[inline]
    pub fn new(id: u64) -> Self {
        ViewHandle(id)
    }
}

impl fmt::Debug for ViewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "View({:#x})", self.0)
    }
}

/// Registry-assigned binding identity, monotonic in insertion order
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct BindingId(pub u64);

impl BindingId {
    pub const UNASSIGNED: BindingId = BindingId(0);
}

impl fmt::Debug for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Binding({})", self.0)
    }
}
