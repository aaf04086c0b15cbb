//! Bulk Refresh Throttle
//!
//! Bookkeeping for the snapshot fetch: the throttle window, the busy flag,
//! fetch generations and the last good snapshot. The engine owns the
//! async side; everything here is synchronous.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use dcstatus_core::{DcResult, EngineConfig, NodeSnapshot};
use dcstatus_registry::{DetailView, SlotRegistry};

use crate::{Renderer, TimerSlot};

/// What a refresh request turns into
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchDecision {
    /// Start fetch number `generation`
    Fetch { generation: u64 },
    /// Window still fresh: reuse the cached snapshot
    UseCached,
    /// A fetch is already running and the request was not forced
    AlreadyLoading,
}

#[derive(Debug)]
pub struct RefreshState {
    window: Duration,
    /// Start of the last fetch that has not failed
    last_fetch: Option<Instant>,
    /// Stamp to restore if the running fetch fails
    rollback: Option<Instant>,
    in_flight: Option<u64>,
    generation: u64,
    cached: Option<Arc<Vec<NodeSnapshot>>>,
    fetch_task: TimerSlot,
}

impl RefreshState {
    pub fn new(window: Duration) -> Self {
        RefreshState {
            window,
            last_fetch: None,
            rollback: None,
            in_flight: None,
            generation: 0,
            cached: None,
            fetch_task: TimerSlot::Idle,
        }
    }

    /// Decide whether a refresh fetches. A `Fetch` decision marks the
    /// state busy and stamps the window at `now`.
    pub fn decide(&mut self, force: bool, now: Instant) -> FetchDecision {
        if !force {
            if self.in_flight.is_some() {
                return FetchDecision::AlreadyLoading;
            }
            if let Some(last) = self.last_fetch {
                if now.saturating_duration_since(last) < self.window {
                    return FetchDecision::UseCached;
                }
            }
        }

        if self.in_flight.is_none() {
            self.rollback = self.last_fetch;
        }
        self.generation += 1;
        self.in_flight = Some(self.generation);
        self.last_fetch = Some(now);
        FetchDecision::Fetch {
            generation: self.generation,
        }
    }

    /// Record the outcome of fetch `generation`. Returns the snapshot to
    /// merge, or `None` when there is nothing to apply.
    pub fn complete(
        &mut self,
        generation: u64,
        result: DcResult<Option<Vec<NodeSnapshot>>>,
    ) -> Option<Arc<Vec<NodeSnapshot>>> {
        if self.in_flight != Some(generation) {
            tracing::debug!(generation, "superseded snapshot fetch dropped");
            return None;
        }
        self.in_flight = None;

        match result {
            Ok(Some(snapshots)) => {
                tracing::debug!(generation, nodes = snapshots.len(), "snapshot fetched");
                let snapshots = Arc::new(snapshots);
                self.cached = Some(Arc::clone(&snapshots));
                Some(snapshots)
            }
            Ok(None) => {
                tracing::debug!(generation, "snapshot not ready, keeping last view");
                self.last_fetch = self.rollback;
                None
            }
            Err(err) => {
                tracing::warn!(generation, error = %err, "snapshot refresh failed, keeping last view");
                self.last_fetch = self.rollback;
                None
            }
        }
    }

    pub fn arm_fetch(&mut self, task: tokio::task::JoinHandle<()>) {
        self.fetch_task.arm(task);
    }

    /// Abort the running fetch, if any
    pub fn cancel_fetch(&mut self) {
        self.fetch_task.cancel();
        self.in_flight = None;
    }

    /// Busy flag: a fetch is in flight
    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn cached(&self) -> Option<Arc<Vec<NodeSnapshot>>> {
        self.cached.clone()
    }

    /// Number of fetches started so far
    pub fn fetches_started(&self) -> u64 {
        self.generation
    }
}

/// Merge a snapshot into the registry: listeners first, then a new detail
/// view for every binding that has one. Returns the number of detail
/// views replaced.
pub fn apply_snapshot(
    registry: &mut SlotRegistry,
    renderer: &dyn Renderer,
    config: &EngineConfig,
    snapshots: &[NodeSnapshot],
) -> usize {
    registry.notify_listeners(snapshots);

    let mut replaced = 0;
    for snapshot in snapshots {
        let fallback = config.node_address(snapshot.node_id).unwrap_or_default();

        registry.for_each(snapshot.node_id, |binding| {
            let Some(detail) = binding.parts.detail else {
                return;
            };
            let view = DetailView::from_snapshot(snapshot, fallback);
            binding.parts.detail = Some(renderer.replace_detail(detail, &view));
            if let Some(row) = binding.parts.row {
                renderer.set_row_items(row, view.visible_items());
            }
            replaced += 1;
        });
    }

    tracing::debug!(replaced, "snapshot merged into bindings");
    replaced
}

#[cfg(test)]
mod tests {
    use dcstatus_core::{DcError, NodeId};

    use super::*;

    const WINDOW: Duration = Duration::from_secs(30);

    fn snapshot() -> Vec<NodeSnapshot> {
        vec![NodeSnapshot::new(NodeId(1))]
    }

    #[test]
    fn test_first_refresh_fetches() {
        let mut state = RefreshState::new(WINDOW);
        let now = Instant::now();

        assert_eq!(
            state.decide(false, now),
            FetchDecision::Fetch { generation: 1 }
        );
        assert!(state.is_loading());
    }

    #[test]
    fn test_window_throttles_unforced_refresh() {
        let mut state = RefreshState::new(WINDOW);
        let now = Instant::now();

        state.decide(false, now);
        assert!(state.complete(1, Ok(Some(snapshot()))).is_some());

        assert_eq!(
            state.decide(false, now + Duration::from_secs(29)),
            FetchDecision::UseCached
        );
        assert_eq!(
            state.decide(false, now + Duration::from_secs(30)),
            FetchDecision::Fetch { generation: 2 }
        );
        assert_eq!(state.fetches_started(), 2);
    }

    #[test]
    fn test_force_bypasses_window() {
        let mut state = RefreshState::new(WINDOW);
        let now = Instant::now();

        state.decide(false, now);
        state.complete(1, Ok(Some(snapshot())));

        assert_eq!(
            state.decide(true, now + Duration::from_secs(1)),
            FetchDecision::Fetch { generation: 2 }
        );
    }

    #[test]
    fn test_unforced_refresh_while_loading() {
        let mut state = RefreshState::new(WINDOW);
        let now = Instant::now();

        state.decide(false, now);
        assert_eq!(state.decide(false, now), FetchDecision::AlreadyLoading);
        assert_eq!(state.fetches_started(), 1);
    }

    #[test]
    fn test_forced_fetch_supersedes_running_one() {
        let mut state = RefreshState::new(WINDOW);
        let now = Instant::now();

        state.decide(false, now);
        state.decide(true, now);

        assert!(state.complete(1, Ok(Some(snapshot()))).is_none());
        assert!(state.is_loading());
        assert!(state.complete(2, Ok(Some(snapshot()))).is_some());
        assert!(!state.is_loading());
    }

    #[test]
    fn test_failure_rolls_back_window() {
        let mut state = RefreshState::new(WINDOW);
        let now = Instant::now();

        state.decide(false, now);
        state.complete(1, Ok(Some(snapshot())));

        let later = now + Duration::from_secs(40);
        state.decide(false, later);
        let applied = state.complete(2, Err(DcError::SnapshotParse("eof".into())));

        assert!(applied.is_none());
        assert!(!state.is_loading());
        // the last good snapshot survives
        assert_eq!(state.cached().unwrap().len(), 1);
        // and the next unforced refresh fetches again
        assert_eq!(
            state.decide(false, later + Duration::from_secs(1)),
            FetchDecision::Fetch { generation: 3 }
        );
    }

    #[test]
    fn test_not_ready_is_not_cached() {
        let mut state = RefreshState::new(WINDOW);
        let now = Instant::now();

        state.decide(false, now);
        assert!(state.complete(1, Ok(None)).is_none());
        assert!(state.cached().is_none());
        assert_eq!(
            state.decide(false, now),
            FetchDecision::Fetch { generation: 2 }
        );
    }
}
