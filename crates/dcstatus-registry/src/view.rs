//! Immutable views rendered into bindings
//!
//! Every update builds a fresh view value. The renderer swaps it in and
//! returns a new handle; nothing is patched in place.

use std::time::{Duration, UNIX_EPOCH};

use dcstatus_core::{ConnectivityState, NodeSnapshot, RenderMode, StatusLabels, MAX_TIMESTAMP};

/// Placeholder shown before the first snapshot arrives
pub const PENDING_VALUE: &str = "-";

/// Visual tone of a status line
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StatusTone {
    Loading,
    Online,
    Offline,
}

/// Status text of one binding
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusView {
    pub text: String,
    pub tone: StatusTone,
}

impl StatusView {
    /// Format a connectivity state for a render mode
    pub fn compose(state: &ConnectivityState, mode: RenderMode, labels: &StatusLabels) -> Self {
        let label = labels.label_for(state);

        // a pong without a measurement reads as the plain label
        let text = match state {
            ConnectivityState::Online {
                latency_ms: Some(ms),
            } => match mode {
                RenderMode::Full => format!("{label}, Ping: {ms}ms"),
                RenderMode::CompactWithUnit => format!("{label} ({ms}ms)"),
                RenderMode::CompactBare => format!("{ms}ms"),
            },
            _ => label.to_owned(),
        };

        let tone = match state {
            ConnectivityState::Online { .. } => StatusTone::Online,
            ConnectivityState::Offline => StatusTone::Offline,
            _ => StatusTone::Loading,
        };

        StatusView { text, tone }
    }

    /// Status shown right after UI construction
    pub fn initial(mode: RenderMode, labels: &StatusLabels) -> Self {
        Self::compose(&ConnectivityState::Connecting, mode, labels)
    }
}

/// Kind of a detail line
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DetailKind {
    Address,
    LastLag,
    LastDowntime,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DetailLine {
    pub kind: DetailKind,
    pub value: String,
}

/// Detail expansion of a node row
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DetailView {
    pub lines: Vec<DetailLine>,
}

impl DetailView {
    /// Placeholder built with the row: every line present, no data yet
    pub fn pending(address: &str) -> Self {
        DetailView {
            lines: vec![
                DetailLine {
                    kind: DetailKind::Address,
                    value: address.to_owned(),
                },
                DetailLine {
                    kind: DetailKind::LastLag,
                    value: PENDING_VALUE.to_owned(),
                },
                DetailLine {
                    kind: DetailKind::LastDowntime,
                    value: PENDING_VALUE.to_owned(),
                },
            ],
        }
    }

    /// Address line always, lag and downtime lines only when they happened
    pub fn from_snapshot(snapshot: &NodeSnapshot, fallback_address: &str) -> Self {
        let address = snapshot.ip_address.as_deref().unwrap_or(fallback_address);
        let mut lines = vec![DetailLine {
            kind: DetailKind::Address,
            value: address.to_owned(),
        }];

        if let Some(value) = snapshot.last_lag.and_then(format_timestamp) {
            lines.push(DetailLine {
                kind: DetailKind::LastLag,
                value,
            });
        }
        if let Some(value) = snapshot.last_downtime.and_then(format_timestamp) {
            lines.push(DetailLine {
                kind: DetailKind::LastDowntime,
                value,
            });
        }

        DetailView { lines }
    }

    /// Number of lines the row must make room for
    pub fn visible_items(&self) -> usize {
        self.lines.len()
    }

    pub fn line(&self, kind: DetailKind) -> Option<&DetailLine> {
        self.lines.iter().find(|l| l.kind == kind)
    }
}

/// RFC 3339 rendering of unix seconds, `None` past year 9999
pub fn format_timestamp(unix_secs: u64) -> Option<String> {
    if unix_secs > MAX_TIMESTAMP {
        return None;
    }
    let at = UNIX_EPOCH.checked_add(Duration::from_secs(unix_secs))?;
    Some(humantime::format_rfc3339_seconds(at).to_string())
}
