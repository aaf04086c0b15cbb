//! Log output setup

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use dcstatus_core::{DcError, DcResult};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Filter directives, overridden by `RUST_LOG` when set
    pub filter: String,
    /// One JSON object per line instead of human-readable text
    pub json: bool,
    pub with_target: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        TelemetryConfig {
            filter: "info,dcstatus_runtime=debug".into(),
            json: false,
            with_target: true,
        }
    }
}

/// Install the global tracing subscriber. Fails if one is already set.
pub fn init_tracing(config: &TelemetryConfig) -> DcResult<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.filter).map_err(|e| DcError::Config(e.to_string()))?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.with_target);

    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| DcError::Config(e.to_string()))
}
