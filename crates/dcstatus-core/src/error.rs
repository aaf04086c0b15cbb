//! Error types for the status engine

use thiserror::Error;

use crate::NodeId;

/// Core status engine errors
#[derive(Error, Debug)]
pub enum DcError {
    // Data source errors
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed snapshot payload: {0}")]
    SnapshotParse(String),

    // Subscription errors
    #[error("Node {0} already has a ping subscription")]
    AlreadySubscribed(NodeId),

    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    // Setup errors
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid prefix catalog: {0}")]
    Catalog(String),
}

impl From<serde_json::Error> for DcError {
    fn from(err: serde_json::Error) -> Self {
        DcError::SnapshotParse(err.to_string())
    }
}

/// Result type for status engine operations
pub type DcResult<T> = Result<T, DcError>;
