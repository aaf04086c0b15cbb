//! HTTP snapshot source

use std::future::Future;
use std::time::Duration;

use dcstatus_core::{DcError, DcResult};

use crate::SnapshotSource;

/// Fetches the status document over plain HTTP
#[derive(Clone, Debug)]
pub struct HttpSnapshotSource {
    client: reqwest::Client,
    url: String,
}

impl HttpSnapshotSource {
    /// Source for `{base_url}/{snapshot_path}` with a 10 s timeout
    pub fn new(base_url: &str, snapshot_path: &str) -> DcResult<Self> {
        Self::with_timeout(base_url, snapshot_path, Duration::from_secs(10))
    }

    pub fn with_timeout(base_url: &str, snapshot_path: &str, timeout: Duration) -> DcResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DcError::Transport(e.to_string()))?;

        Ok(HttpSnapshotSource {
            client,
            url: format!(
                "{}/{}",
                base_url.trim_end_matches('/'),
                snapshot_path.trim_start_matches('/')
            ),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl SnapshotSource for HttpSnapshotSource {
    fn fetch(&self) -> impl Future<Output = DcResult<String>> + Send {
        async move {
            let response = self
                .client
                .get(&self.url)
                .send()
                .await
                .map_err(|e| DcError::Transport(e.to_string()))?
                .error_for_status()
                .map_err(|e| DcError::Transport(e.to_string()))?;

            response
                .text()
                .await
                .map_err(|e| DcError::Transport(e.to_string()))
        }
    }
}
