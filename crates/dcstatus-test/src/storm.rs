//! Ping storms
//!
//! Floods the fan-out with seeded random connectivity changes and checks
//! that every binding ends up showing the last state of its own node.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use dcstatus_core::{Binding, ConnectivityState, NodeId, RenderMode, StatusLabels};
use dcstatus_registry::{SlotRegistry, StatusView};
use dcstatus_runtime::PingFanout;

use crate::{MockPingLayer, RecordingRenderer};

/// Storm shape
#[derive(Clone, Debug)]
pub struct StormConfig {
    pub nodes: u32,
    pub events: usize,
    /// Share of events that are pongs
    pub online_ratio: f64,
    pub max_latency_ms: u32,
    /// Full-mode rows per node
    pub rows_per_node: usize,
    /// Compact bindings per node, alternating with and without unit
    pub compact_per_node: usize,
}

impl Default for StormConfig {
    fn default() -> Self {
        StormConfig {
            nodes: 5,
            events: 1_000,
            online_ratio: 0.7,
            max_latency_ms: 400,
            rows_per_node: 1,
            compact_per_node: 2,
        }
    }
}

impl StormConfig {
    /// Mostly healthy nodes
    pub fn calm() -> Self {
        StormConfig {
            online_ratio: 0.95,
            ..Default::default()
        }
    }

    /// Nodes going up and down all the time, with many bindings each
    pub fn flapping() -> Self {
        StormConfig {
            events: 5_000,
            online_ratio: 0.4,
            compact_per_node: 8,
            ..Default::default()
        }
    }
}

/// Seeded generator of ping events
pub struct PingStorm {
    config: StormConfig,
    rng: StdRng,
}

impl PingStorm {
    pub fn new(config: StormConfig, seed: u64) -> Self {
        PingStorm {
            config,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn config(&self) -> &StormConfig {
        &self.config
    }

    pub fn next_event(&mut self) -> (NodeId, ConnectivityState) {
        let node = NodeId(self.rng.gen_range(1..=self.config.nodes.max(1)));

        let state = if self.rng.gen_bool(self.config.online_ratio.clamp(0.0, 1.0)) {
            ConnectivityState::online(self.rng.gen_range(1..=self.config.max_latency_ms.max(1)))
        } else {
            match self.rng.gen_range(0..4) {
                0 => ConnectivityState::Connecting,
                1 => ConnectivityState::CreatingKeys,
                2 => ConnectivityState::ExchangingKeys,
                _ => ConnectivityState::Offline,
            }
        };

        (node, state)
    }

    pub fn events(&mut self) -> Vec<(NodeId, ConnectivityState)> {
        (0..self.config.events).map(|_| self.next_event()).collect()
    }
}

/// Outcome of one storm
#[derive(Clone, Debug, Default)]
pub struct StormReport {
    pub delivered: usize,
    /// Status views replaced across all bindings
    pub rendered: usize,
    pub last_state: HashMap<NodeId, ConnectivityState>,
}

/// Registry, fan-out and mocks wired together for a storm
pub struct StormHarness {
    pub layer: Arc<MockPingLayer>,
    pub renderer: Arc<RecordingRenderer>,
    pub registry: Arc<Mutex<SlotRegistry>>,
    pub fanout: PingFanout,
    labels: StatusLabels,
}

impl StormHarness {
    pub fn new(config: &StormConfig) -> Self {
        let layer = MockPingLayer::new();
        let renderer = RecordingRenderer::new();
        let registry = Arc::new(Mutex::new(SlotRegistry::new()));
        let labels = StatusLabels::default();

        {
            let mut registry = registry.lock();
            for node in (1..=config.nodes).map(NodeId) {
                for _ in 0..config.rows_per_node {
                    registry.add(Binding::new(node, RenderMode::Full, renderer.mint_row()));
                }
                for i in 0..config.compact_per_node {
                    let mode = if i % 2 == 0 {
                        RenderMode::CompactWithUnit
                    } else {
                        RenderMode::CompactBare
                    };
                    registry.add(Binding::new(node, mode, renderer.mint_status()));
                }
            }
        }

        let fanout = PingFanout::new(
            layer.clone(),
            Arc::clone(&registry),
            renderer.clone(),
            labels.clone(),
            config.nodes,
        );
        fanout.ensure_all();

        StormHarness {
            layer,
            renderer,
            registry,
            fanout,
            labels,
        }
    }

    /// Deliver every event of `storm` through the ping layer
    pub fn run(&self, storm: &mut PingStorm) -> StormReport {
        let mut report = StormReport::default();
        let before = self.renderer.status_replacements();

        for (node, state) in storm.events() {
            report.delivered += self.layer.fire(node, state);
            report.last_state.insert(node, state);
        }

        report.rendered = self.renderer.status_replacements() - before;
        tracing::debug!(
            delivered = report.delivered,
            rendered = report.rendered,
            "ping storm finished"
        );
        report
    }

    /// Every binding shows the last state of its node; untouched nodes
    /// show nothing rendered
    pub fn verify(&self, report: &StormReport) -> bool {
        let registry = self.registry.lock();

        let consistent = registry.iter().all(|binding| {
            let Some(status) = binding.parts.status else {
                return true;
            };
            let shown = self.renderer.status_text(status);
            match report.last_state.get(&binding.node) {
                Some(state) => {
                    let expected = StatusView::compose(state, binding.mode, &self.labels);
                    shown.as_deref() == Some(expected.text.as_str())
                }
                None => shown.is_none(),
            }
        });
        consistent
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_storm_is_reproducible() {
        let a = PingStorm::new(StormConfig::default(), 7).events();
        let b = PingStorm::new(StormConfig::default(), 7).events();
        assert_eq!(a, b);
    }

    #[test]
    fn test_storm_stays_in_node_range() {
        let mut storm = PingStorm::new(StormConfig::flapping(), 11);
        assert!(storm
            .events()
            .iter()
            .all(|(node, _)| (1..=5).contains(&node.get())));
    }

    #[test]
    fn test_storm_final_views_match_last_state() {
        for seed in [1, 42, 1337] {
            let config = StormConfig::default();
            let harness = StormHarness::new(&config);
            let mut storm = PingStorm::new(config.clone(), seed);

            let report = harness.run(&mut storm);

            assert_eq!(report.delivered, config.events);
            // one status replacement per binding of the pinged node
            let per_node = config.rows_per_node + config.compact_per_node;
            assert_eq!(report.rendered, config.events * per_node);
            assert!(harness.verify(&report), "seed {seed}");
        }
    }

    #[test]
    fn test_calm_storm_is_mostly_online() {
        let events = PingStorm::new(StormConfig::calm(), 5).events();
        let online = events.iter().filter(|(_, state)| state.is_online()).count();
        assert!(online * 10 > events.len() * 9);
    }

    #[test]
    fn test_flapping_storm_keeps_handles_fresh() {
        let config = StormConfig::flapping();
        let harness = StormHarness::new(&config);
        let mut storm = PingStorm::new(config.clone(), 99);

        let report = harness.run(&mut storm);
        assert!(harness.verify(&report));

        // replaced views are detached: the only attached views are the
        // current ones
        let registry = harness.registry.lock();
        let live: usize = registry.iter().map(|b| b.parts.handles().count()).sum();
        assert_eq!(harness.renderer.attached(), live);
    }

    #[test]
    fn test_silent_nodes_stay_unrendered() {
        let config = StormConfig {
            nodes: 5,
            events: 0,
            ..Default::default()
        };
        let harness = StormHarness::new(&config);
        harness.layer.fire(NodeId(2), ConnectivityState::Offline);

        let mut report = StormReport::default();
        report.last_state.insert(NodeId(2), ConnectivityState::Offline);
        assert!(harness.verify(&report));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_any_storm_converges(
            seed in any::<u64>(),
            events in 0usize..300,
            compact in 0usize..6,
            online_ratio in 0.0f64..=1.0,
        ) {
            let config = StormConfig {
                events,
                compact_per_node: compact,
                online_ratio,
                ..Default::default()
            };
            let harness = StormHarness::new(&config);
            let report = harness.run(&mut PingStorm::new(config.clone(), seed));

            prop_assert_eq!(report.delivered, events);
            prop_assert!(harness.verify(&report));
        }
    }
}
