//! Core types for tunetree.
//!
//! This crate provides the fundamental data structures used throughout
//! the tunetree ecosystem: library items, the arena-backed tree that
//! mirrors a directory, and library configuration.

mod config;
mod error;
mod item;
mod tree;

pub use config::{DEFAULT_EXTENSIONS, LibraryConfig, LibraryConfigBuilder};
pub use error::{BuildError, BuildWarning, WarningKind};
pub use item::{Folder, Item, ItemCell, ItemRef, Song, SongMeta};
pub use tree::{Descendants, NodeId, SnapshotKind, Tree, TreeNode, TreeSnapshot};
