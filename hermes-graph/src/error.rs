//! Error types for the Hermes engine

use thiserror::Error;

/// Errors that can occur in the engine
#[derive(Debug, Error)]
pub enum HermesError {
    /// SQLite error
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// A migration statement failed while initializing the store
    #[error("migration failed on `{statement}`: {source}")]
    Migration {
        statement: String,
        #[source]
        source: rusqlite::Error,
    },

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Embedding generation error
    #[error("embedding error: {0}")]
    Embedding(String),

    /// Node not found
    #[error("node not found: {0}")]
    NodeNotFound(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl HermesError {
    /// Create an embedding error
    pub fn embedding(msg: impl Into<String>) -> Self {
        Self::Embedding(msg.into())
    }

    /// Create a not found error
    pub fn node_not_found(id: impl Into<String>) -> Self {
        Self::NodeNotFound(id.into())
    }

    /// Create a generic error
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, HermesError>;
