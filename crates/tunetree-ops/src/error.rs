//! Errors returned by file operations.

use std::path::PathBuf;

use thiserror::Error;

use crate::conflict::ConflictKind;

/// A file operation failed. Nothing was changed on disk unless noted.
#[derive(Debug, Error)]
pub enum OpError {
    /// The source does not exist.
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// The destination lies inside the source, or the entry it would
    /// replace contains the source.
    #[error("Cannot move or copy {from} into itself ({to})")]
    SourceIsAncestor { from: PathBuf, to: PathBuf },

    /// Source and destination are the same entry.
    #[error("Source and destination are the same: {path}")]
    SameFile { path: PathBuf },

    /// The destination is not a directory.
    #[error("Destination is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// The destination already exists and the conflict policy says skip.
    #[error("{kind}: {path}")]
    Conflict { path: PathBuf, kind: ConflictKind },

    /// The new name is not a valid file name.
    #[error("Invalid name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Recursive copy failed part way; the partial copy was removed.
    #[error("Copy failed at {path}: {message}")]
    Copy { path: PathBuf, message: String },

    /// Moving to the system trash failed.
    #[error("Failed to move {path} to trash: {message}")]
    Trash { path: PathBuf, message: String },
}

impl OpError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }

    /// Whether the failure was caught before anything was touched on disk.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::SourceIsAncestor { .. }
                | Self::SameFile { .. }
                | Self::NotADirectory { .. }
                | Self::Conflict { .. }
                | Self::InvalidName { .. }
        )
    }
}
