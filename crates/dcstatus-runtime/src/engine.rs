//! Status Engine - one page view of the status cycle
//!
//! Owns the registry, the ping fan-out, the refresh throttle and the two
//! timers (countdown, reload debounce). Timers and fetch completions run
//! as tokio tasks holding a clone of the shared state; no lock is held
//! across an await.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::time::Instant;

use dcstatus_core::{
    parse_snapshot, Binding, BindingId, BindingParts, DcError, DcResult, EngineConfig, NodeId,
    NodeSnapshot, RenderMode, ViewHandle,
};
use dcstatus_prefix::{PrefixResolver, Resolution};
use dcstatus_registry::{SnapshotListener, SlotRegistry};

use crate::{
    apply_snapshot, gauge_percent, Countdown, CountdownDisplay, CountdownPhase, FetchDecision,
    PingFanout, PingRegistrar, RefreshState, Renderer, SnapshotSource, TickOutcome, TimerSlot,
};

struct CountdownTimer {
    machine: Countdown,
    task: TimerSlot,
}

struct Shared<S> {
    config: EngineConfig,
    registry: Arc<Mutex<SlotRegistry>>,
    fanout: PingFanout,
    renderer: Arc<dyn Renderer>,
    display: Arc<dyn CountdownDisplay>,
    source: S,
    refresh: Mutex<RefreshState>,
    countdown: Mutex<CountdownTimer>,
    debounce: Mutex<TimerSlot>,
    expanded_row: Mutex<Option<ViewHandle>>,
    torn_down: AtomicBool,
}

/// Live status synchronization for one page view
pub struct StatusEngine<S: SnapshotSource> {
    shared: Arc<Shared<S>>,
}

impl<S: SnapshotSource> StatusEngine<S> {
    pub fn new(
        config: EngineConfig,
        registrar: Arc<dyn PingRegistrar>,
        source: S,
        renderer: Arc<dyn Renderer>,
        display: Arc<dyn CountdownDisplay>,
    ) -> DcResult<Self> {
        config.validate()?;

        let registry = Arc::new(Mutex::new(SlotRegistry::new()));
        let fanout = PingFanout::new(
            registrar,
            Arc::clone(&registry),
            Arc::clone(&renderer),
            config.labels.clone(),
            config.node_count(),
        );

        let shared = Shared {
            refresh: Mutex::new(RefreshState::new(config.refresh_window)),
            countdown: Mutex::new(CountdownTimer {
                machine: Countdown::new(config.countdown_ticks),
                task: TimerSlot::Idle,
            }),
            debounce: Mutex::new(TimerSlot::Idle),
            expanded_row: Mutex::new(None),
            torn_down: AtomicBool::new(false),
            config,
            registry,
            fanout,
            renderer,
            display,
            source,
        };

        Ok(StatusEngine {
            shared: Arc::new(shared),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    /// The registry shared by every component
    pub fn registry(&self) -> Arc<Mutex<SlotRegistry>> {
        Arc::clone(&self.shared.registry)
    }

    pub fn fanout(&self) -> &PingFanout {
        &self.shared.fanout
    }

    /// Register a binding built by UI construction
    pub fn add_binding(&self, binding: Binding) -> BindingId {
        self.shared.registry.lock().add(binding)
    }

    /// Register the main list row of a node
    pub fn attach_node_row(&self, node: NodeId, parts: BindingParts) -> DcResult<BindingId> {
        if !self.shared.config.contains_node(node) {
            return Err(DcError::UnknownNode(node));
        }
        Ok(self.add_binding(Binding::new(node, RenderMode::Full, parts)))
    }

    /// Subscriber for whole snapshots, dropped at the next prune
    pub fn add_snapshot_listener(&self, listener: SnapshotListener) {
        self.shared.registry.lock().add_listener(listener);
    }

    /// Page init: subscribe the nodes not yet subscribed, then refresh
    pub fn load(&self) {
        let subscribed = self.shared.fanout.ensure_all();
        tracing::info!(subscribed, "status view loading");
        self.shared.refresh(false);
    }

    /// Refresh the snapshot, throttled unless `force`
    pub fn refresh(&self, force: bool) {
        self.shared.refresh(force);
    }

    /// Restart the reload countdown
    pub fn start_countdown(&self) {
        self.shared.start_countdown();
    }

    /// Reset the gauge and refresh after the debounce delay
    pub fn force_reload(&self, force_backend: bool) {
        self.shared.force_reload(force_backend);
    }

    /// Busy flag: a snapshot fetch is in flight
    pub fn is_loading(&self) -> bool {
        self.shared.refresh.lock().is_loading()
    }

    pub fn last_snapshot(&self) -> Option<Arc<Vec<NodeSnapshot>>> {
        self.shared.refresh.lock().cached()
    }

    pub fn fetches_started(&self) -> u64 {
        self.shared.refresh.lock().fetches_started()
    }

    pub fn countdown_phase(&self) -> CountdownPhase {
        self.shared.countdown.lock().machine.phase()
    }

    /// Expand or collapse a node row. Another expanded row collapses.
    /// While a fetch is in flight the row keeps its state. Returns whether
    /// `row` is expanded afterwards.
    pub fn toggle_row(&self, row: ViewHandle) -> bool {
        let loading = self.is_loading();
        let mut expanded = self.shared.expanded_row.lock();

        if let Some(previous) = *expanded {
            if previous != row {
                self.shared.renderer.set_expanded(previous, false);
                *expanded = None;
            }
        }
        if loading {
            return *expanded == Some(row);
        }

        let open = *expanded != Some(row);
        self.shared.renderer.set_expanded(row, open);
        *expanded = open.then_some(row);
        open
    }

    /// Drop bindings whose views left the page
    pub fn prune_stale(&self) -> usize {
        let renderer = Arc::clone(&self.shared.renderer);
        self.shared
            .registry
            .lock()
            .prune(|handle| renderer.is_reachable(handle))
    }

    /// Show which nodes serve `prefix`
    ///
    /// On a hit, stale bindings from the previous resolution are pruned,
    /// `mint` is asked for a `CompactWithUnit` and a `CompactBare` view per
    /// serving node, and a forced refresh is started. Serving nodes outside
    /// the configured set are dropped. A miss changes nothing.
    pub fn identify<F>(&self, resolver: &PrefixResolver, prefix: &str, mut mint: F) -> Option<Resolution>
    where
        F: FnMut(NodeId, RenderMode) -> BindingParts,
    {
        let mut resolution = resolver.resolve(prefix)?;
        let config = &self.shared.config;
        resolution.node_ids.retain(|node| {
            let known = config.contains_node(*node);
            if !known {
                tracing::warn!(%node, prefix, "catalog names an unconfigured node");
            }
            known
        });

        self.prune_stale();

        let bindings: Vec<Binding> = resolution
            .node_ids
            .iter()
            .flat_map(|node| {
                [RenderMode::CompactWithUnit, RenderMode::CompactBare]
                    .map(|mode| Binding::new(*node, mode, mint(*node, mode)))
            })
            .collect();

        {
            let mut registry = self.shared.registry.lock();
            for binding in bindings {
                registry.add(binding);
            }
        }

        tracing::info!(
            prefix = %resolution.descriptor.prefix,
            nodes = ?resolution.node_ids,
            "identify panel opened"
        );
        self.shared.refresh(true);
        Some(resolution)
    }

    /// Identify panel closed: forget its bindings
    pub fn close_identify(&self) -> usize {
        self.prune_stale()
    }

    /// Cancel timers, release pings and discard the registry
    pub fn teardown(&self) {
        self.shared.teardown();
    }

    pub fn is_torn_down(&self) -> bool {
        self.shared.torn_down.load(Ordering::Acquire)
    }
}

impl<S: SnapshotSource> Drop for StatusEngine<S> {
    fn drop(&mut self) {
        self.shared.teardown();
    }
}

impl<S: SnapshotSource> Shared<S> {
    fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::Acquire)
    }

    fn refresh(self: &Arc<Self>, force: bool) {
        if self.is_torn_down() {
            return;
        }

        let mut state = self.refresh.lock();
        match state.decide(force, Instant::now()) {
            FetchDecision::Fetch { generation } => {
                tracing::debug!(generation, force, "fetching snapshot");
                let shared = Arc::clone(self);
                state.arm_fetch(tokio::spawn(shared.fetch_snapshot(generation)));
            }
            FetchDecision::UseCached => {
                drop(state);
                tracing::debug!("refresh window still fresh, using cached snapshot");
                self.start_countdown();
            }
            FetchDecision::AlreadyLoading => {
                tracing::trace!("refresh skipped, fetch in flight");
            }
        }
    }

    async fn fetch_snapshot(self: Arc<Self>, generation: u64) {
        let result = match self.source.fetch().await {
            Ok(body) => parse_snapshot(&body),
            Err(err) => Err(err),
        };

        let applied = self.refresh.lock().complete(generation, result);
        let Some(snapshots) = applied else {
            return;
        };

        apply_snapshot(
            &mut self.registry.lock(),
            self.renderer.as_ref(),
            &self.config,
            &snapshots,
        );
        self.start_countdown();
    }

    fn start_countdown(self: &Arc<Self>) {
        if self.is_torn_down() {
            return;
        }

        let mut countdown = self.countdown.lock();
        let epoch = countdown.machine.start();

        self.display.set_definite(true);
        self.display.set_seconds(countdown.machine.length());
        self.display.set_percent(100);

        let shared = Arc::clone(self);
        countdown.task.arm(tokio::spawn(shared.run_countdown(epoch)));
        tracing::trace!(epoch, "countdown started");
    }

    async fn run_countdown(self: Arc<Self>, epoch: u64) {
        let period = self.config.tick_interval;
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);

        loop {
            ticker.tick().await;

            let mut countdown = self.countdown.lock();
            match countdown.machine.tick(epoch) {
                TickOutcome::Remaining(left) => {
                    self.display.set_seconds(left);
                    self.display.set_percent(gauge_percent(left));
                }
                TickOutcome::Expired => {
                    drop(countdown);
                    tracing::debug!(epoch, "countdown expired, reloading");
                    self.force_reload(false);
                    return;
                }
                TickOutcome::Stopped => return,
            }
        }
    }

    fn force_reload(self: &Arc<Self>, force_backend: bool) {
        if self.is_torn_down() {
            return;
        }

        {
            let mut countdown = self.countdown.lock();
            countdown.machine.cancel();
            countdown.task.cancel();
        }

        self.display.set_definite(false);
        self.display.set_percent(100);

        let delay = self.config.reload_debounce;
        let shared = Arc::clone(self);
        self.debounce.lock().arm(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            shared.refresh(force_backend);
        }));
    }

    fn teardown(&self) {
        if self.torn_down.swap(true, Ordering::AcqRel) {
            return;
        }

        {
            let mut countdown = self.countdown.lock();
            countdown.machine.cancel();
            countdown.task.cancel();
        }
        self.debounce.lock().cancel();
        self.refresh.lock().cancel_fetch();

        self.fanout.release_all();
        *self.expanded_row.lock() = None;
        self.registry.lock().clear();

        tracing::info!("status view torn down");
    }
}
