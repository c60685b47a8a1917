//! Error types for synchronization runs

use thiserror::Error;

/// Errors that abort a synchronization run.
///
/// Per-record translation failures are not errors at this level; they are
/// collected into the run's error report instead.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The graph-query service failed or answered with an unexpected status
    #[error("Graph service error: {message}")]
    Graph {
        status: Option<u16>,
        message: String,
    },

    /// The document store failed or answered with an unexpected status
    #[error("Document store error: {message}")]
    Store {
        status: Option<u16>,
        message: String,
    },

    /// Index mapping could not be produced for a target type
    #[error("Mapping error: {0}")]
    Mapping(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No registration for the requested target type
    #[error("Unknown target type: {0}")]
    UnknownType(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SyncError {
    pub fn graph(status: Option<u16>, message: impl Into<String>) -> Self {
        SyncError::Graph {
            status,
            message: message.into(),
        }
    }

    pub fn store(status: Option<u16>, message: impl Into<String>) -> Self {
        SyncError::Store {
            status,
            message: message.into(),
        }
    }

    /// Map a transport failure from the graph client
    pub fn from_graph(e: reqwest::Error) -> Self {
        SyncError::graph(e.status().map(|s| s.as_u16()), e.to_string())
    }

    /// Map a transport failure from the document store client
    pub fn from_store(e: reqwest::Error) -> Self {
        SyncError::store(e.status().map(|s| s.as_u16()), e.to_string())
    }

    /// HTTP status reported by the upstream service, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            SyncError::Graph { status, .. } | SyncError::Store { status, .. } => *status,
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
