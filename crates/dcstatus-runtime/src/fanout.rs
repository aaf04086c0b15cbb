//! Ping Fan-out - one subscription per node, many bindings per event

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use dcstatus_core::{ConnectivityState, DcError, DcResult, NodeId, StatusLabels};
use dcstatus_registry::{SlotRegistry, StatusView};

use crate::{PingRegistrar, Renderer};

/// Subscribes to the ping layer and renders every event into the
/// bindings of its node
pub struct PingFanout {
    registrar: Arc<dyn PingRegistrar>,
    registry: Arc<Mutex<SlotRegistry>>,
    renderer: Arc<dyn Renderer>,
    labels: Arc<StatusLabels>,
    node_count: u32,
    subscribed: Mutex<BTreeSet<NodeId>>,
    /// Bumped on release; callbacks from an older epoch are ignored
    epoch: Arc<AtomicU64>,
}

impl PingFanout {
    pub fn new(
        registrar: Arc<dyn PingRegistrar>,
        registry: Arc<Mutex<SlotRegistry>>,
        renderer: Arc<dyn Renderer>,
        labels: StatusLabels,
        node_count: u32,
    ) -> Self {
        PingFanout {
            registrar,
            registry,
            renderer,
            labels: Arc::new(labels),
            node_count,
            subscribed: Mutex::new(BTreeSet::new()),
            epoch: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Register the single ping subscription of `node`
    pub fn subscribe(&self, node: NodeId) -> DcResult<()> {
        if !(1..=self.node_count).contains(&node.0) {
            return Err(DcError::UnknownNode(node));
        }
        if !self.subscribed.lock().insert(node) {
            return Err(DcError::AlreadySubscribed(node));
        }

        let registry = Arc::clone(&self.registry);
        let renderer = Arc::clone(&self.renderer);
        let labels = Arc::clone(&self.labels);
        let epoch = Arc::clone(&self.epoch);
        let subscribed_at = epoch.load(Ordering::Acquire);

        self.registrar.register_node_ping(
            node,
            Box::new(move |state| {
                if epoch.load(Ordering::Acquire) != subscribed_at {
                    tracing::trace!(%node, "ping after release ignored");
                    return;
                }
                render_state(&registry, renderer.as_ref(), &labels, node, &state);
            }),
        );

        tracing::debug!(%node, "ping subscription registered");
        Ok(())
    }

    /// Subscribe every node that has no subscription yet
    pub fn ensure_all(&self) -> usize {
        (1..=self.node_count)
            .map(NodeId)
            .filter(|node| self.subscribe(*node).is_ok())
            .count()
    }

    pub fn is_subscribed(&self, node: NodeId) -> bool {
        self.subscribed.lock().contains(&node)
    }

    pub fn subscribed(&self) -> Vec<NodeId> {
        self.subscribed.lock().iter().copied().collect()
    }

    /// Render a state into the bindings of `node` without going through
    /// the ping layer
    pub fn dispatch(&self, node: NodeId, state: &ConnectivityState) -> usize {
        render_state(&self.registry, self.renderer.as_ref(), &self.labels, node, state)
    }

    /// Drop every subscription (page view torn down)
    pub fn release_all(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        let released = std::mem::take(&mut *self.subscribed.lock());
        self.registrar.release_all();
        tracing::debug!(count = released.len(), "ping subscriptions released");
    }
}

/// Replace the status view of every binding of `node`. Returns the number
/// of status views replaced.
pub fn render_state(
    registry: &Mutex<SlotRegistry>,
    renderer: &dyn Renderer,
    labels: &StatusLabels,
    node: NodeId,
    state: &ConnectivityState,
) -> usize {
    let mut rendered = 0;
    let mut registry = registry.lock();

    registry.for_each(node, |binding| {
        if let Some(status) = binding.parts.status {
            let view = StatusView::compose(state, binding.mode, labels);
            binding.parts.status = Some(renderer.replace_status(status, &view));
            rendered += 1;
        }
        if let Some(indicator) = binding.parts.indicator {
            renderer.set_loading(indicator, !state.is_settled());
        }
    });

    tracing::trace!(%node, ?state, rendered, "ping fanned out");
    rendered
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use dcstatus_core::{Binding, BindingParts, RenderMode, ViewHandle};
    use dcstatus_registry::DetailView;

    use super::*;
    use crate::PingCallback;

    #[derive(Default)]
    struct Registrar {
        callbacks: Mutex<HashMap<NodeId, Vec<PingCallback>>>,
        releases: AtomicU64,
    }

    impl Registrar {
        fn fire(&self, node: NodeId, state: ConnectivityState) {
            for cb in self.callbacks.lock().get(&node).into_iter().flatten() {
                cb(state);
            }
        }
    }

    impl PingRegistrar for Registrar {
        fn register_node_ping(&self, node: NodeId, callback: PingCallback) {
            self.callbacks.lock().entry(node).or_default().push(callback);
        }

        fn release_all(&self) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct Screen {
        next: AtomicU64,
        texts: Mutex<HashMap<ViewHandle, String>>,
        loading: Mutex<HashMap<ViewHandle, bool>>,
    }

    impl Renderer for Screen {
        fn replace_status(&self, old: ViewHandle, view: &StatusView) -> ViewHandle {
            let new = ViewHandle(1000 + self.next.fetch_add(1, Ordering::SeqCst));
            let mut texts = self.texts.lock();
            texts.remove(&old);
            texts.insert(new, view.text.clone());
            new
        }

        fn replace_detail(&self, old: ViewHandle, _view: &DetailView) -> ViewHandle {
            old
        }

        fn set_loading(&self, indicator: ViewHandle, active: bool) {
            self.loading.lock().insert(indicator, active);
        }

        fn set_row_items(&self, _row: ViewHandle, _items: usize) {}

        fn set_expanded(&self, _row: ViewHandle, _expanded: bool) {}

        fn is_reachable(&self, _handle: ViewHandle) -> bool {
            true
        }
    }

    fn setup() -> (PingFanout, Arc<Registrar>, Arc<Screen>, Arc<Mutex<SlotRegistry>>) {
        let registrar = Arc::new(Registrar::default());
        let screen = Arc::new(Screen::default());
        let registry = Arc::new(Mutex::new(SlotRegistry::new()));
        let fanout = PingFanout::new(
            registrar.clone(),
            registry.clone(),
            screen.clone(),
            StatusLabels::default(),
            5,
        );
        (fanout, registrar, screen, registry)
    }

    fn add(registry: &Mutex<SlotRegistry>, node: u32, mode: RenderMode, status: u64) {
        registry.lock().add(Binding::new(
            NodeId(node),
            mode,
            BindingParts {
                status: Some(ViewHandle(status)),
                indicator: Some(ViewHandle(status + 500)),
                ..Default::default()
            },
        ));
    }

    #[test]
    fn test_subscribe_once_per_node() {
        let (fanout, registrar, _, _) = setup();

        fanout.subscribe(NodeId(2)).unwrap();
        let err = fanout.subscribe(NodeId(2)).unwrap_err();
        assert!(matches!(err, DcError::AlreadySubscribed(NodeId(2))));
        assert_eq!(registrar.callbacks.lock()[&NodeId(2)].len(), 1);

        assert!(matches!(
            fanout.subscribe(NodeId(6)),
            Err(DcError::UnknownNode(_))
        ));
        assert!(matches!(
            fanout.subscribe(NodeId(0)),
            Err(DcError::UnknownNode(_))
        ));
    }

    #[test]
    fn test_ensure_all_skips_existing() {
        let (fanout, _, _, _) = setup();
        fanout.subscribe(NodeId(3)).unwrap();

        assert_eq!(fanout.ensure_all(), 4);
        assert_eq!(fanout.ensure_all(), 0);
        assert_eq!(fanout.subscribed().len(), 5);
    }

    #[test]
    fn test_event_updates_only_its_node() {
        let (fanout, registrar, screen, registry) = setup();
        add(&registry, 1, RenderMode::Full, 1);
        add(&registry, 2, RenderMode::Full, 2);
        add(&registry, 1, RenderMode::CompactBare, 3);
        fanout.ensure_all();

        registrar.fire(NodeId(1), ConnectivityState::online(35));

        let registry = registry.lock();
        let node1: Vec<String> = registry
            .bindings_for(NodeId(1))
            .iter()
            .map(|b| screen.texts.lock()[&b.parts.status.unwrap()].clone())
            .collect();
        assert_eq!(node1, vec!["Online, Ping: 35ms", "35ms"]);

        // node 2 still holds its original handle
        assert_eq!(
            registry.bindings_for(NodeId(2))[0].parts.status,
            Some(ViewHandle(2))
        );
        assert_eq!(screen.loading.lock().get(&ViewHandle(501)), Some(&false));
        assert_eq!(screen.loading.lock().get(&ViewHandle(502)), None);
    }

    #[test]
    fn test_loading_indicator_follows_state() {
        let (fanout, _, screen, registry) = setup();
        add(&registry, 4, RenderMode::Full, 4);

        fanout.dispatch(NodeId(4), &ConnectivityState::CreatingKeys);
        assert_eq!(screen.loading.lock()[&ViewHandle(504)], true);

        fanout.dispatch(NodeId(4), &ConnectivityState::online(10));
        assert_eq!(screen.loading.lock()[&ViewHandle(504)], false);

        fanout.dispatch(NodeId(4), &ConnectivityState::ExchangingKeys);
        assert_eq!(screen.loading.lock()[&ViewHandle(504)], true);

        // offline is settled: no spinner
        fanout.dispatch(NodeId(4), &ConnectivityState::Offline);
        assert_eq!(screen.loading.lock()[&ViewHandle(504)], false);
    }

    #[test]
    fn test_release_silences_callbacks() {
        let (fanout, registrar, screen, registry) = setup();
        add(&registry, 1, RenderMode::Full, 1);
        fanout.subscribe(NodeId(1)).unwrap();

        fanout.release_all();
        registrar.fire(NodeId(1), ConnectivityState::online(5));

        assert!(screen.texts.lock().is_empty());
        assert_eq!(registrar.releases.load(Ordering::SeqCst), 1);
        assert!(!fanout.is_subscribed(NodeId(1)));

        // a new view may subscribe again
        fanout.subscribe(NodeId(1)).unwrap();
    }
}
