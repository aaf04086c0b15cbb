//! Engine harness
//!
//! A [`StatusEngine`] wired to the mock collaborators, with one full row
//! attached per node. Scenario tests run it on a paused tokio clock.

use std::collections::BTreeMap;
use std::sync::Arc;

use dcstatus_core::{
    Binding, BindingParts, DcResult, EngineConfig, NodeId, RenderMode, ViewHandle,
};
use dcstatus_registry::DetailView;
use dcstatus_runtime::StatusEngine;

use crate::{MockPingLayer, MockSnapshotSource, RecordingDisplay, RecordingRenderer};

pub struct EngineHarness {
    pub engine: StatusEngine<MockSnapshotSource>,
    pub layer: Arc<MockPingLayer>,
    pub renderer: Arc<RecordingRenderer>,
    pub display: Arc<RecordingDisplay>,
    pub source: MockSnapshotSource,
    rows: BTreeMap<NodeId, ViewHandle>,
}

impl EngineHarness {
    pub fn new(config: EngineConfig, source: MockSnapshotSource) -> DcResult<Self> {
        let layer = MockPingLayer::new();
        let renderer = RecordingRenderer::new();
        let display = RecordingDisplay::new();
        let nodes: Vec<NodeId> = config.node_ids().collect();

        let engine = StatusEngine::new(
            config,
            layer.clone(),
            source.clone(),
            renderer.clone(),
            display.clone(),
        )?;

        let mut rows = BTreeMap::new();
        for node in nodes {
            let row = renderer.mint();
            let parts = BindingParts {
                row: Some(row),
                status: Some(renderer.mint()),
                detail: Some(renderer.mint()),
                indicator: Some(renderer.mint()),
            };
            engine.attach_node_row(node, parts)?;
            rows.insert(node, row);
        }

        Ok(EngineHarness {
            engine,
            layer,
            renderer,
            display,
            source,
            rows,
        })
    }

    /// Default configuration, every fetch answered by `source`
    pub fn with_source(source: MockSnapshotSource) -> DcResult<Self> {
        Self::new(EngineConfig::default(), source)
    }

    /// Row handle of the node's main list entry
    pub fn row(&self, node: NodeId) -> Option<ViewHandle> {
        self.rows.get(&node).copied()
    }

    /// Current bindings of `node`, in insertion order
    pub fn bindings(&self, node: NodeId) -> Vec<Binding> {
        self.engine.registry().lock().bindings_for(node).to_vec()
    }

    fn main_row(&self, node: NodeId) -> Option<Binding> {
        self.bindings(node)
            .into_iter()
            .find(|b| b.mode == RenderMode::Full)
    }

    /// Status text shown in the node's main row
    pub fn row_status(&self, node: NodeId) -> Option<String> {
        let status = self.main_row(node)?.parts.status?;
        self.renderer.status_text(status)
    }

    /// Detail view shown in the node's main row
    pub fn row_detail(&self, node: NodeId) -> Option<DetailView> {
        let detail = self.main_row(node)?.parts.detail?;
        self.renderer.detail(detail)
    }

    /// Status texts of the node's bindings in `mode`
    pub fn texts(&self, node: NodeId, mode: RenderMode) -> Vec<Option<String>> {
        self.bindings(node)
            .iter()
            .filter(|b| b.mode == mode)
            .map(|b| b.parts.status.and_then(|h| self.renderer.status_text(h)))
            .collect()
    }

    /// Take every identify-panel view off the page
    pub fn detach_compact(&self) -> usize {
        let registry = self.engine.registry();
        let registry = registry.lock();
        let compact: Vec<ViewHandle> = registry
            .iter()
            .filter(|b| b.mode != RenderMode::Full)
            .flat_map(|b| b.parts.handles())
            .collect();

        for handle in &compact {
            self.renderer.detach(*handle);
        }
        compact.len()
    }
}
