//! UI bindings
//!
//! A binding ties a node to the pieces of external UI that display it.
//! The UI builds the views and hands the handles over; the engine only
//! indexes them and swaps in replacements.

use serde::{Deserialize, Serialize};

use crate::{BindingId, NodeId, ViewHandle};

/// How a binding formats its status text
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    /// `Online, Ping: 42ms`
    Full,
    /// `Online (42ms)`
    CompactWithUnit,
    /// `42ms`
    CompactBare,
}

impl Default for RenderMode {
    fn default() -> Self {
        Self::Full
    }
}

/// Handles of the views a binding owns
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BindingParts {
    /// Container row, receives the visible detail line count
    pub row: Option<ViewHandle>,
    /// Status text
    pub status: Option<ViewHandle>,
    /// Detail expansion (address, last lag, last downtime)
    pub detail: Option<ViewHandle>,
    /// Loading spinner around the node icon
    pub indicator: Option<ViewHandle>,
}

impl BindingParts {
    /// Status text only, as used by the compact identify badges
    pub fn status_only(status: ViewHandle) -> Self {
        BindingParts {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Every handle present, in row/status/detail/indicator order
    pub fn handles(&self) -> impl Iterator<Item = ViewHandle> {
        [self.row, self.status, self.detail, self.indicator]
            .into_iter()
            .flatten()
    }
}

/// Live association between a node and external UI state
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Binding {
    pub id: BindingId,
    pub node: NodeId,
    pub mode: RenderMode,
    pub parts: BindingParts,
}

impl Binding {
    /// Create an unregistered binding; the registry assigns the id
    pub fn new(node: NodeId, mode: RenderMode, parts: BindingParts) -> Self {
        Binding {
            id: BindingId::UNASSIGNED,
            node,
            mode,
            parts,
        }
    }

    /// A binding is stale as soon as one of its views left the UI
    pub fn is_reachable(&self, mut reachable: impl FnMut(ViewHandle) -> bool) -> bool {
        self.parts.handles().all(|h| reachable(h))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_skip_missing_parts() {
        let parts = BindingParts {
            status: Some(ViewHandle(1)),
            indicator: Some(ViewHandle(3)),
            ..Default::default()
        };
        let handles: Vec<_> = parts.handles().collect();
        assert_eq!(handles, vec![ViewHandle(1), ViewHandle(3)]);
    }

    #[test]
    fn test_reachability_requires_every_part() {
        let binding = Binding::new(
            NodeId(1),
            RenderMode::Full,
            BindingParts {
                status: Some(ViewHandle(1)),
                detail: Some(ViewHandle(2)),
                ..Default::default()
            },
        );

        assert!(binding.is_reachable(|_| true));
        assert!(!binding.is_reachable(|h| h != ViewHandle(2)));
    }
}
