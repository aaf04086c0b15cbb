//! Slot Registry - who displays which node
//!
//! Bindings are grouped per node so that a ping event only touches the
//! bindings of its own node. Within a node, and across nodes through the
//! binding id, insertion order is preserved.

use std::collections::HashMap;
use std::fmt;

use dcstatus_core::{Binding, BindingId, NodeId, NodeSnapshot, ViewHandle};

/// Binding-less subscriber receiving every successful snapshot
pub type SnapshotListener = Box<dyn FnMut(&[NodeSnapshot]) + Send>;

/// Registry of live UI bindings
#[derive(Default)]
pub struct SlotRegistry {
    /// Node → bindings in insertion order
    by_node: HashMap<NodeId, Vec<Binding>>,
    /// Whole-snapshot subscribers, dropped on every prune
    listeners: Vec<SnapshotListener>,
    /// Last assigned binding id
    last_id: u64,
    len: usize,
}

impl SlotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a binding. Duplicates are legal: the same node may be shown
    /// in several places.
    pub fn add(&mut self, mut binding: Binding) -> BindingId {
        self.last_id += 1;
        binding.id = BindingId(self.last_id);
        let id = binding.id;

        tracing::trace!(?id, node = %binding.node, mode = ?binding.mode, "binding added");
        self.by_node.entry(binding.node).or_default().push(binding);
        self.len += 1;
        id
    }

    /// Register a snapshot listener for the current resolution cycle
    pub fn add_listener(&mut self, listener: SnapshotListener) {
        self.listeners.push(listener);
    }

    /// Apply `f` to every binding of `node`, in insertion order.
    /// Returns the number of bindings visited.
    pub fn for_each(&mut self, node: NodeId, mut f: impl FnMut(&mut Binding)) -> usize {
        match self.by_node.get_mut(&node) {
            Some(bindings) => {
                bindings.iter_mut().for_each(&mut f);
                bindings.len()
            }
            None => 0,
        }
    }

    /// Bindings of one node, in insertion order
    pub fn bindings_for(&self, node: NodeId) -> &[Binding] {
        self.by_node.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every binding, in global insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        let mut all: Vec<&Binding> = self.by_node.values().flatten().collect();
        all.sort_unstable_by_key(|b| b.id);
        all.into_iter()
    }

    /// Binding owning `handle` as one of its parts
    pub fn find_by_handle(&self, handle: ViewHandle) -> Option<&Binding> {
        self.by_node
            .values()
            .flatten()
            .find(|b| b.parts.handles().any(|h| h == handle))
    }

    /// Drop every binding with an unreachable view, and every snapshot
    /// listener. Survivors keep their relative order. Returns the number
    /// of bindings removed.
    pub fn prune(&mut self, mut is_reachable: impl FnMut(ViewHandle) -> bool) -> usize {
        let before = self.len;

        self.by_node.retain(|_, bindings| {
            bindings.retain(|b| b.is_reachable(&mut is_reachable));
            !bindings.is_empty()
        });
        self.len = self.by_node.values().map(Vec::len).sum();

        let listeners = self.listeners.len();
        self.listeners.clear();

        let removed = before - self.len;
        tracing::debug!(removed, listeners, remaining = self.len, "pruned stale bindings");
        removed
    }

    /// Hand a fresh snapshot to every listener
    pub fn notify_listeners(&mut self, snapshots: &[NodeSnapshot]) {
        for listener in &mut self.listeners {
            listener(snapshots);
        }
    }

    /// Forget everything (page view torn down)
    pub fn clear(&mut self) {
        self.by_node.clear();
        self.listeners.clear();
        self.len = 0;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Count bindings per node
    pub fn node_count(&self, node: NodeId) -> usize {
        self.bindings_for(node).len()
    }
}

impl fmt::Debug for SlotRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotRegistry")
            .field("bindings", &self.len)
            .field("nodes", &self.by_node.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
