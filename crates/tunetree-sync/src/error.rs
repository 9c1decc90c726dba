//! Library errors.

use std::path::PathBuf;

use thiserror::Error;
use tunetree_core::BuildError;
use tunetree_ops::OpError;

/// Errors from opening, registering or talking to a library.
#[derive(Debug, Error)]
pub enum LibraryError {
    /// The library root does not exist.
    #[error("Library root not found: {path}")]
    NotFound { path: PathBuf },

    /// The library root is a file.
    #[error("Library root is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// A library with this root is already registered.
    #[error("Library already registered: {path}")]
    AlreadyRegistered { path: PathBuf },

    /// No library owns this path.
    #[error("No library contains {path}")]
    NotRegistered { path: PathBuf },

    /// Building the tree failed.
    #[error(transparent)]
    Build(#[from] BuildError),

    /// A file operation failed; the tree was not touched.
    #[error(transparent)]
    Operation(#[from] OpError),

    /// The library's worker has shut down.
    #[error("Library worker stopped")]
    Closed,
}
