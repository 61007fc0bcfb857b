//! Centralized error handling with typed error enums.
//!
//! Each subsystem gets its own error enum so callers can pattern-match on
//! the failures they care about:
//!
//! ```text
//! AnalysisError  - analyzer settings construction
//! IndexError     - document CRUD inside one index
//! RepoError      - index registry operations and id validation
//! SnapshotError  - snapshot encode/decode and filesystem I/O
//! ConfigError    - startup flag validation (fatal)
//! ```
//!
//! Errors are values returned from operations; nothing unwinds across an
//! operation boundary.

use std::path::PathBuf;
use thiserror::Error;

/// A specialized Result type for sift operations.
///
/// This is an alias for `anyhow::Result`, used at the binary seam where
/// errors from several subsystems meet.
pub type Result<T> = anyhow::Result<T>;

/// Errors raised while constructing analyzer settings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    /// The settings asked for a stemmer other than English Porter.
    #[error("stemmer '{name}' is not available, only 'english' is supported")]
    UnavailableStemmer { name: String },
}

/// Errors raised by document operations on a single index.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    /// `add` collided with an existing document id.
    #[error("cannot index duplicate document '{id}'")]
    DuplicateDocument { id: String },

    /// `update` or `delete` targeted an unknown document id.
    #[error("document '{id}' does not exist")]
    NonExistentDocument { id: String },
}

/// Errors raised by the index repository.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepoError {
    /// Index id is empty after trimming or contains `/`, `\` or `.`.
    #[error("invalid index id '{id}'")]
    InvalidIndex { id: String },

    /// `create` collided with an existing index id.
    #[error("index '{id}' already exists")]
    IndexAlreadyExists { id: String },

    /// `get` or `delete` targeted an unknown index id.
    #[error("index '{id}' does not exist")]
    IndexDoesNotExist { id: String },
}

/// Errors raised while exporting or importing snapshots.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// A decoded snapshot does not restore a consistent index.
    #[error("corrupt snapshot: {reason}")]
    CorruptSnapshot { reason: String },

    /// A joined path resolved outside the configured data directory.
    #[error("path '{path}' escapes the data directory")]
    PathTraversal { path: PathBuf },

    /// Binary encoding or decoding failed.
    #[error("snapshot serialization failed: {0}")]
    Codec(#[from] postcard::Error),

    /// Filesystem failure during export or import.
    #[error("snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

impl SnapshotError {
    /// Create a corrupt-snapshot error from a reason string.
    pub fn corrupt(reason: impl Into<String>) -> Self {
        Self::CorruptSnapshot {
            reason: reason.into(),
        }
    }
}

/// Startup configuration errors. These are fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// `--snapshot-interval` below the supported minimum.
    #[error("snapshot interval must be at least {min_secs}s, got {got_secs}s")]
    SnapshotIntervalTooShort { min_secs: u64, got_secs: u64 },

    /// `--snapshot-interval` given without `--data-dir`.
    #[error("--snapshot-interval requires --data-dir")]
    SnapshotWithoutDataDir,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::check;

    #[test]
    fn index_error_display_carries_id() {
        let err = IndexError::DuplicateDocument {
            id: "doc1".to_string(),
        };
        check!(err.to_string().contains("doc1"));

        let err = IndexError::NonExistentDocument {
            id: "ghost".to_string(),
        };
        check!(err.to_string().contains("ghost"));
    }

    #[test]
    fn unavailable_stemmer_names_the_request() {
        let err = AnalysisError::UnavailableStemmer {
            name: "german".to_string(),
        };
        check!(err.to_string().contains("german"));
        check!(err.to_string().contains("english"));
    }

    #[test]
    fn snapshot_corrupt_helper() {
        let err = SnapshotError::corrupt("posting references missing doc");
        check!(err.to_string().contains("corrupt snapshot"));
    }
}
