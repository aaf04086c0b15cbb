//! Connectivity states and bulk status snapshots
//!
//! `ConnectivityState` is pushed by the external connection layer, one
//! node at a time. `NodeSnapshot` comes from the bulk status document and
//! covers every node at once.

use serde::{Deserialize, Deserializer, Serialize};

use crate::{DcResult, NodeId};

/// Live connection phase of a single node
///
/// Wire names follow the connection layer: `pong` carries the measured
/// round trip in `ping`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConnectivityState {
    Connecting,
    CreatingKeys,
    #[serde(rename = "exchanging_encryption_keys", alias = "exchanging_keys")]
    ExchangingKeys,
    #[serde(rename = "pong", alias = "online")]
    Online {
        #[serde(default, rename = "ping")]
        latency_ms: Option<u32>,
    },
    Offline,
}

impl ConnectivityState {
    /// Online with a measured latency
    pub fn online(latency_ms: u32) -> Self {
        ConnectivityState::Online {
            latency_ms: Some(latency_ms),
        }
    }

    #[inline]
    pub fn is_online(&self) -> bool {
        matches!(self, ConnectivityState::Online { .. })
    }

    /// Online or offline; every other phase is still in progress
    #[inline]
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            ConnectivityState::Online { .. } | ConnectivityState::Offline
        )
    }

    /// Latency, only meaningful while online
    pub fn latency_ms(&self) -> Option<u32> {
        match self {
            ConnectivityState::Online { latency_ms } => *latency_ms,
            _ => None,
        }
    }
}

impl Default for ConnectivityState {
    fn default() -> Self {
        ConnectivityState::Connecting
    }
}

/// Point-in-time status of one node, from the bulk status document
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    #[serde(rename = "dc_id")]
    pub node_id: NodeId,
    /// Unix seconds of the last recorded lag; absent means never
    #[serde(default, deserialize_with = "positive_timestamp")]
    pub last_lag: Option<u64>,
    /// Unix seconds of the last recorded downtime; absent means never
    #[serde(default, rename = "last_down", deserialize_with = "positive_timestamp")]
    pub last_downtime: Option<u64>,
    #[serde(default, rename = "ip", skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
}

impl NodeSnapshot {
    pub fn new(node_id: NodeId) -> Self {
        NodeSnapshot {
            node_id,
            last_lag: None,
            last_downtime: None,
            ip_address: None,
        }
    }

    pub fn with_last_lag(mut self, ts: u64) -> Self {
        self.last_lag = valid_timestamp(ts);
        self
    }

    pub fn with_last_downtime(mut self, ts: u64) -> Self {
        self.last_downtime = valid_timestamp(ts);
        self
    }

    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = Some(ip.into());
        self
    }
}

/// Last representable timestamp, 9999-12-31T23:59:59Z
pub const MAX_TIMESTAMP: u64 = 253_402_300_799;

/// `Some(ts)` for a timestamp that happened and can be displayed
pub fn valid_timestamp(ts: u64) -> Option<u64> {
    (1..=MAX_TIMESTAMP).contains(&ts).then_some(ts)
}

// The backend writes 0 for "never happened". Values past year 9999 are
// garbage and read as absent too.
fn positive_timestamp<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?.and_then(valid_timestamp))
}

#[derive(Deserialize)]
struct SnapshotEnvelope {
    #[serde(default)]
    status: Option<Vec<NodeSnapshot>>,
}

/// Parse the bulk status document
///
/// Returns `Ok(None)` for a well-formed document without a `status` list
/// (the backend is not ready yet).
pub fn parse_snapshot(body: &str) -> DcResult<Option<Vec<NodeSnapshot>>> {
    let envelope: SnapshotEnvelope = serde_json::from_str(body)?;
    Ok(envelope.status)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::DcError;

    #[test]
    fn test_state_wire_names() {
        let pong: ConnectivityState =
            serde_json::from_str(r#"{"status":"pong","ping":42}"#).unwrap();
        assert_eq!(pong, ConnectivityState::online(42));

        let keys: ConnectivityState =
            serde_json::from_str(r#"{"status":"exchanging_encryption_keys"}"#).unwrap();
        assert_eq!(keys, ConnectivityState::ExchangingKeys);

        let offline: ConnectivityState = serde_json::from_str(r#"{"status":"offline"}"#).unwrap();
        assert!(offline.is_settled());
        assert!(!offline.is_online());
    }

    #[test]
    fn test_latency_only_when_online() {
        assert_eq!(ConnectivityState::online(7).latency_ms(), Some(7));
        assert_eq!(ConnectivityState::Connecting.latency_ms(), None);
        assert!(!ConnectivityState::CreatingKeys.is_settled());
    }

    #[test]
    fn test_parse_snapshot() {
        let body = r#"{"status":[
            {"dc_id":1,"last_lag":0,"last_down":0},
            {"dc_id":2,"last_lag":1700000000,"last_down":null,"ip":"149.154.167.51"}
        ]}"#;
        let snapshots = parse_snapshot(body).unwrap().unwrap();

        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0], NodeSnapshot::new(NodeId(1)));
        assert_eq!(snapshots[1].last_lag, Some(1_700_000_000));
        assert_eq!(snapshots[1].last_downtime, None);
        assert_eq!(snapshots[1].ip_address.as_deref(), Some("149.154.167.51"));
    }

    #[test]
    fn test_out_of_range_timestamp_is_absent() {
        let body = format!(
            r#"{{"status":[{{"dc_id":1,"last_lag":{},"last_down":{}}}]}}"#,
            MAX_TIMESTAMP + 1,
            u64::MAX
        );
        let snapshots = parse_snapshot(&body).unwrap().unwrap();

        assert_eq!(snapshots[0].last_lag, None);
        assert_eq!(snapshots[0].last_downtime, None);
        assert_eq!(
            NodeSnapshot::new(NodeId(1)).with_last_lag(MAX_TIMESTAMP).last_lag,
            Some(MAX_TIMESTAMP)
        );
    }

    #[test]
    fn test_parse_snapshot_not_ready() {
        assert!(parse_snapshot(r#"{"updating":true}"#).unwrap().is_none());
    }

    #[test]
    fn test_parse_snapshot_malformed() {
        let err = parse_snapshot("<html>").unwrap_err();
        assert!(matches!(err, DcError::SnapshotParse(_)));

        let err = parse_snapshot(r#"{"status":[{"last_lag":1}]}"#).unwrap_err();
        assert!(matches!(err, DcError::SnapshotParse(_)));
    }

    proptest! {
        #[test]
        fn prop_zero_timestamp_means_never(
            node in 1u32..=5,
            lag in prop_oneof![Just(0u64), 1..=MAX_TIMESTAMP, any::<u64>()],
            down in prop_oneof![Just(0u64), 1..=MAX_TIMESTAMP, any::<u64>()],
        ) {
            let body = format!(
                r#"{{"status":[{{"dc_id":{node},"last_lag":{lag},"last_down":{down}}}]}}"#
            );
            let snapshots = parse_snapshot(&body).unwrap().unwrap();

            let shown = |ts: u64| (ts > 0 && ts <= MAX_TIMESTAMP).then_some(ts);
            prop_assert_eq!(snapshots[0].node_id, NodeId(node));
            prop_assert_eq!(snapshots[0].last_lag, shown(lag));
            prop_assert_eq!(snapshots[0].last_downtime, shown(down));
        }
    }
}
