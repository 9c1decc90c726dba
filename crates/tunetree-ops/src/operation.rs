//! File operation types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A filesystem operation requested against a library.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FileOperation {
    /// Move a file or directory into a destination directory.
    Move {
        source: PathBuf,
        destination: PathBuf,
    },
    /// Copy a file or directory into a destination directory.
    Copy {
        source: PathBuf,
        destination: PathBuf,
    },
    /// Rename a single file or directory in place.
    Rename { source: PathBuf, new_name: String },
    /// Delete a file or directory.
    Delete { target: PathBuf, use_trash: bool },
}

impl FileOperation {
    /// Create a move operation.
    pub fn move_to(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self::Move {
            source: source.into(),
            destination: destination.into(),
        }
    }

    /// Create a copy operation.
    pub fn copy(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self::Copy {
            source: source.into(),
            destination: destination.into(),
        }
    }

    /// Create a rename operation.
    pub fn rename(source: impl Into<PathBuf>, new_name: impl Into<String>) -> Self {
        Self::Rename {
            source: source.into(),
            new_name: new_name.into(),
        }
    }

    /// Create a delete operation.
    pub fn delete(target: impl Into<PathBuf>, use_trash: bool) -> Self {
        Self::Delete {
            target: target.into(),
            use_trash,
        }
    }

    /// The path the operation acts on.
    pub fn source(&self) -> &PathBuf {
        match self {
            Self::Move { source, .. } | Self::Copy { source, .. } | Self::Rename { source, .. } => {
                source
            }
            Self::Delete { target, .. } => target,
        }
    }
}

impl std::fmt::Display for FileOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Move {
                source,
                destination,
            } => write!(f, "move {} to {}", source.display(), destination.display()),
            Self::Copy {
                source,
                destination,
            } => write!(f, "copy {} to {}", source.display(), destination.display()),
            Self::Rename { source, new_name } => {
                write!(f, "rename {} to {new_name}", source.display())
            }
            Self::Delete { target, .. } => write!(f, "delete {}", target.display()),
        }
    }
}
