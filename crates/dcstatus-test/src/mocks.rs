//! In-memory collaborators for driving the engine without a page

use std::collections::{HashMap, HashSet, VecDeque};
use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use dcstatus_core::{BindingParts, ConnectivityState, DcError, DcResult, NodeId, NodeSnapshot, ViewHandle};
use dcstatus_registry::{DetailView, StatusView};
use dcstatus_runtime::{CountdownDisplay, PingCallback, PingRegistrar, Renderer, SnapshotSource};

/// Ping layer that fires only when told to
///
/// Callbacks survive `release_all` so tests can deliver late events.
#[derive(Default)]
pub struct MockPingLayer {
    callbacks: Mutex<HashMap<NodeId, Vec<PingCallback>>>,
    releases: AtomicUsize,
}

impl MockPingLayer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Deliver `state` to every callback registered for `node`
    pub fn fire(&self, node: NodeId, state: ConnectivityState) -> usize {
        let callbacks = self.callbacks.lock();
        let targets = callbacks.get(&node).map(Vec::as_slice).unwrap_or_default();
        for callback in targets {
            callback(state);
        }
        targets.len()
    }

    pub fn registrations(&self, node: NodeId) -> usize {
        self.callbacks.lock().get(&node).map_or(0, Vec::len)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

impl PingRegistrar for MockPingLayer {
    fn register_node_ping(&self, node: NodeId, callback: PingCallback) {
        self.callbacks.lock().entry(node).or_default().push(callback);
    }

    fn release_all(&self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct Screen {
    attached: HashSet<ViewHandle>,
    status: HashMap<ViewHandle, StatusView>,
    detail: HashMap<ViewHandle, DetailView>,
    loading: HashMap<ViewHandle, bool>,
    row_items: HashMap<ViewHandle, usize>,
    expanded: HashMap<ViewHandle, bool>,
    status_replacements: usize,
    detail_replacements: usize,
}

/// Renderer that keeps every view in memory
///
/// Replacing a view detaches the old handle and attaches a fresh one.
pub struct RecordingRenderer {
    next_handle: AtomicU64,
    screen: Mutex<Screen>,
}

impl Default for RecordingRenderer {
    fn default() -> Self {
        RecordingRenderer {
            next_handle: AtomicU64::new(1),
            screen: Mutex::new(Screen::default()),
        }
    }
}

impl RecordingRenderer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Attach a new empty view
    pub fn mint(&self) -> ViewHandle {
        let handle = ViewHandle(self.next_handle.fetch_add(1, Ordering::SeqCst));
        self.screen.lock().attached.insert(handle);
        handle
    }

    /// A row with status, detail and loading indicator views
    pub fn mint_row(&self) -> BindingParts {
        BindingParts {
            row: Some(self.mint()),
            status: Some(self.mint()),
            detail: Some(self.mint()),
            indicator: Some(self.mint()),
        }
    }

    /// A bare status view, as used by the identify panel
    pub fn mint_status(&self) -> BindingParts {
        BindingParts::status_only(self.mint())
    }

    /// Remove a view from the page
    pub fn detach(&self, handle: ViewHandle) {
        let mut screen = self.screen.lock();
        screen.attached.remove(&handle);
        screen.status.remove(&handle);
        screen.detail.remove(&handle);
    }

    pub fn status_text(&self, handle: ViewHandle) -> Option<String> {
        self.screen.lock().status.get(&handle).map(|v| v.text.clone())
    }

    pub fn detail(&self, handle: ViewHandle) -> Option<DetailView> {
        self.screen.lock().detail.get(&handle).cloned()
    }

    pub fn loading(&self, indicator: ViewHandle) -> Option<bool> {
        self.screen.lock().loading.get(&indicator).copied()
    }

    pub fn row_items(&self, row: ViewHandle) -> Option<usize> {
        self.screen.lock().row_items.get(&row).copied()
    }

    pub fn is_expanded(&self, row: ViewHandle) -> bool {
        self.screen.lock().expanded.get(&row).copied().unwrap_or(false)
    }

    pub fn status_replacements(&self) -> usize {
        self.screen.lock().status_replacements
    }

    pub fn detail_replacements(&self) -> usize {
        self.screen.lock().detail_replacements
    }

    pub fn attached(&self) -> usize {
        self.screen.lock().attached.len()
    }
}

impl Renderer for RecordingRenderer {
    fn replace_status(&self, old: ViewHandle, view: &StatusView) -> ViewHandle {
        let new = ViewHandle(self.next_handle.fetch_add(1, Ordering::SeqCst));
        let mut screen = self.screen.lock();
        screen.attached.remove(&old);
        screen.status.remove(&old);
        screen.attached.insert(new);
        screen.status.insert(new, view.clone());
        screen.status_replacements += 1;
        new
    }

    fn replace_detail(&self, old: ViewHandle, view: &DetailView) -> ViewHandle {
        let new = ViewHandle(self.next_handle.fetch_add(1, Ordering::SeqCst));
        let mut screen = self.screen.lock();
        screen.attached.remove(&old);
        screen.detail.remove(&old);
        screen.attached.insert(new);
        screen.detail.insert(new, view.clone());
        screen.detail_replacements += 1;
        new
    }

    fn set_loading(&self, indicator: ViewHandle, active: bool) {
        self.screen.lock().loading.insert(indicator, active);
    }

    fn set_row_items(&self, row: ViewHandle, items: usize) {
        self.screen.lock().row_items.insert(row, items);
    }

    fn set_expanded(&self, row: ViewHandle, expanded: bool) {
        self.screen.lock().expanded.insert(row, expanded);
    }

    fn is_reachable(&self, handle: ViewHandle) -> bool {
        self.screen.lock().attached.contains(&handle)
    }
}

/// One call made on a [`RecordingDisplay`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayEvent {
    Seconds(u32),
    Percent(u32),
    Definite(bool),
}

#[derive(Default)]
pub struct RecordingDisplay {
    events: Mutex<Vec<DisplayEvent>>,
}

impl RecordingDisplay {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<DisplayEvent> {
        self.events.lock().clone()
    }

    pub fn seconds(&self) -> Vec<u32> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                DisplayEvent::Seconds(s) => Some(*s),
                _ => None,
            })
            .collect()
    }

    pub fn percents(&self) -> Vec<u32> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                DisplayEvent::Percent(p) => Some(*p),
                _ => None,
            })
            .collect()
    }

    /// Last definite/indeterminate switch, if any
    pub fn definite(&self) -> Option<bool> {
        self.events.lock().iter().rev().find_map(|e| match e {
            DisplayEvent::Definite(d) => Some(*d),
            _ => None,
        })
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl CountdownDisplay for RecordingDisplay {
    fn set_seconds(&self, seconds: u32) {
        self.events.lock().push(DisplayEvent::Seconds(seconds));
    }

    fn set_percent(&self, percent: u32) {
        self.events.lock().push(DisplayEvent::Percent(percent));
    }

    fn set_definite(&self, definite: bool) {
        self.events.lock().push(DisplayEvent::Definite(definite));
    }
}

/// Canned answer of a [`MockSnapshotSource`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply {
    Body(String),
    Fail(String),
}

impl Reply {
    /// A status document listing `snapshots`
    pub fn document(snapshots: &[NodeSnapshot]) -> Self {
        Reply::Body(status_document(snapshots))
    }

    fn into_result(self) -> DcResult<String> {
        match self {
            Reply::Body(body) => Ok(body),
            Reply::Fail(reason) => Err(DcError::Transport(reason)),
        }
    }
}

struct SourceState {
    queue: VecDeque<Reply>,
    fallback: Reply,
    delay: Duration,
}

/// Snapshot source answering from a queue, then from a fallback
///
/// Clones share state, so a test can keep one while the engine owns the
/// other.
#[derive(Clone)]
pub struct MockSnapshotSource {
    state: Arc<Mutex<SourceState>>,
    calls: Arc<AtomicUsize>,
}

impl MockSnapshotSource {
    pub fn new(fallback: Reply) -> Self {
        MockSnapshotSource {
            state: Arc::new(Mutex::new(SourceState {
                queue: VecDeque::new(),
                fallback,
                delay: Duration::ZERO,
            })),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Always answers with a document listing `snapshots`
    pub fn serving(snapshots: &[NodeSnapshot]) -> Self {
        Self::new(Reply::document(snapshots))
    }

    /// Answer the next fetch with `reply`
    pub fn push(&self, reply: Reply) {
        self.state.lock().queue.push_back(reply);
    }

    pub fn set_fallback(&self, reply: Reply) {
        self.state.lock().fallback = reply;
    }

    /// Simulated network latency of every fetch
    pub fn set_delay(&self, delay: Duration) {
        self.state.lock().delay = delay;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SnapshotSource for MockSnapshotSource {
    fn fetch(&self) -> impl Future<Output = DcResult<String>> + Send {
        let state = Arc::clone(&self.state);
        let calls = Arc::clone(&self.calls);

        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            let (reply, delay) = {
                let mut state = state.lock();
                let reply = match state.queue.pop_front() {
                    Some(reply) => reply,
                    None => state.fallback.clone(),
                };
                (reply, state.delay)
            };

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            reply.into_result()
        }
    }
}

/// Serialize a bulk status document
pub fn status_document(snapshots: &[NodeSnapshot]) -> String {
    serde_json::json!({ "status": snapshots }).to_string()
}
