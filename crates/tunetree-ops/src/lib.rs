//! Filesystem operations for tunetree libraries.
//!
//! This crate performs the on-disk side of library edits (move, copy,
//! rename, delete). Every call either completes or fails as a whole, and
//! structural violations such as moving a folder into itself are rejected
//! before the disk is touched, so the in-memory tree never needs undoing.

mod conflict;
mod error;
mod local;
mod naming;
mod operation;

pub use conflict::{ConflictKind, ConflictResolution, auto_rename_path};
pub use error::OpError;
pub use local::{FileOps, LocalFileOps, OpOutcome};
pub use naming::validate_filename;
pub use operation::FileOperation;
