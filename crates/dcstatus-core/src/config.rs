//! Engine configuration
//!
//! Durations are written the humantime way in JSON (`"30s"`, `"300ms"`).
//! Missing fields fall back to the defaults below.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ConnectivityState, DcError, DcResult, NodeId};

/// Status text shown for each connection phase
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusLabels {
    pub connecting: String,
    pub creating_keys: String,
    pub exchanging_keys: String,
    pub online: String,
    pub offline: String,
}

impl StatusLabels {
    /// Base label for a state, without any latency suffix
    pub fn label_for(&self, state: &ConnectivityState) -> &str {
        match state {
            ConnectivityState::Connecting => &self.connecting,
            ConnectivityState::CreatingKeys => &self.creating_keys,
            ConnectivityState::ExchangingKeys => &self.exchanging_keys,
            ConnectivityState::Online { .. } => &self.online,
            ConnectivityState::Offline => &self.offline,
        }
    }
}

impl Default for StatusLabels {
    fn default() -> Self {
        StatusLabels {
            connecting: "Connecting...".into(),
            creating_keys: "Creating keys...".into(),
            exchanging_keys: "Exchanging keys...".into(),
            online: "Online".into(),
            offline: "Offline".into(),
        }
    }
}

/// Longest accepted reload countdown, in ticks
pub const MAX_COUNTDOWN_TICKS: u32 = 3_600;

/// Status engine configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Display name per node, index 0 is node 1
    pub node_names: Vec<String>,
    /// Public address per node, used when a snapshot carries none
    pub node_addresses: Vec<String>,
    /// Minimum spacing between two unforced snapshot fetches
    #[serde(with = "duration_text")]
    pub refresh_window: Duration,
    /// Countdown length in ticks
    pub countdown_ticks: u32,
    /// Countdown tick spacing
    #[serde(with = "duration_text")]
    pub tick_interval: Duration,
    /// Delay between a reload request and the refresh it triggers
    #[serde(with = "duration_text")]
    pub reload_debounce: Duration,
    /// Path of the bulk status document, relative to the site root
    pub snapshot_path: String,
    pub labels: StatusLabels,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            node_names: vec![
                "Miami FL, USA".into(),
                "Amsterdam, NL".into(),
                "Miami FL, USA".into(),
                "Amsterdam, NL".into(),
                "Singapore, SG".into(),
            ],
            node_addresses: vec![
                "149.154.175.53".into(),
                "149.154.167.51".into(),
                "149.154.175.100".into(),
                "149.154.167.91".into(),
                "91.108.56.130".into(),
            ],
            refresh_window: Duration::from_secs(30),
            countdown_ticks: 5,
            tick_interval: Duration::from_millis(1000),
            reload_debounce: Duration::from_millis(300),
            snapshot_path: "DCStatus/dc_status.json".into(),
            labels: StatusLabels::default(),
        }
    }
}

impl EngineConfig {
    /// Short cycle for local demos and soak runs
    pub fn fast_cycle() -> Self {
        EngineConfig {
            refresh_window: Duration::from_secs(3),
            countdown_ticks: 3,
            tick_interval: Duration::from_millis(100),
            reload_debounce: Duration::from_millis(30),
            ..Default::default()
        }
    }

    /// Load from JSON and validate
    pub fn from_json(text: &str) -> DcResult<Self> {
        let config: EngineConfig =
            serde_json::from_str(text).map_err(|e| DcError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> DcResult<()> {
        if self.node_names.is_empty() {
            return Err(DcError::Config("at least one node is required".into()));
        }
        if self.node_addresses.len() != self.node_names.len() {
            return Err(DcError::Config(format!(
                "{} node names but {} addresses",
                self.node_names.len(),
                self.node_addresses.len()
            )));
        }
        if self.countdown_ticks == 0 {
            return Err(DcError::Config("countdown_ticks must be positive".into()));
        }
        if self.countdown_ticks > MAX_COUNTDOWN_TICKS {
            return Err(DcError::Config(format!(
                "countdown_ticks {} exceeds {MAX_COUNTDOWN_TICKS}",
                self.countdown_ticks
            )));
        }
        if self.tick_interval.is_zero() {
            return Err(DcError::Config("tick_interval must be positive".into()));
        }
        Ok(())
    }

    /// Number of configured nodes (N)
    pub fn node_count(&self) -> u32 {
        self.node_names.len() as u32
    }

    /// All node ids in order, 1..=N
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (1..=self.node_count()).map(NodeId)
    }

    pub fn contains_node(&self, node: NodeId) -> bool {
        (1..=self.node_count()).contains(&node.0)
    }

    pub fn node_name(&self, node: NodeId) -> Option<&str> {
        node.index()
            .and_then(|i| self.node_names.get(i))
            .map(String::as_str)
    }

    pub fn node_address(&self, node: NodeId) -> Option<&str> {
        node.index()
            .and_then(|i| self.node_addresses.get(i))
            .map(String::as_str)
    }
}

mod duration_text {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_duration(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}
