//! Error types for the persistence layer.

use std::path::PathBuf;

use lifeline_types::StateError;

/// Errors that can occur while reading or writing story files.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A filesystem operation failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// File or directory the operation targeted.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A document could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The state being saved has fewer posts than the persisted one.
    #[error("post counter regression: persisted {persisted}, proposed {proposed}")]
    Regression {
        /// `total_posts` of the document on disk.
        persisted: u64,
        /// `total_posts` of the document being saved.
        proposed: u64,
    },

    /// The state being saved violates a structural invariant.
    #[error("refusing to save inconsistent state: {0}")]
    Invariant(#[from] StateError),
}

impl StoreError {
    /// Build an [`StoreError::Io`] for the given path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
