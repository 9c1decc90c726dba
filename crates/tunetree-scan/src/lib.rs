//! Library tree builder for tunetree.
//!
//! This crate walks a library directory with jwalk and turns it into a
//! [`Tree`] of folders and songs.
//!
//! # Overview
//!
//! - **Extension filter**: only accepted audio files become nodes; every
//!   other file is invisible
//! - **Tag reading** through a pluggable [`MetadataReader`] (lofty by default)
//! - **Progress updates** via broadcast channels
//! - **Cancellation** that returns a partial but well-formed tree
//!
//! # Example
//!
//! ```rust,no_run
//! use std::collections::HashSet;
//! use std::path::Path;
//!
//! use tunetree_scan::{LibraryConfig, TreeBuilder};
//!
//! let builder = TreeBuilder::new(LibraryConfig::default());
//! let root = Path::new("/music");
//! let tree = builder.build(root, root, &HashSet::new()).unwrap();
//!
//! println!("{} songs", tree.songs().count());
//! ```
//!
//! # Progress Monitoring
//!
//! ```rust,no_run
//! use tunetree_scan::{LibraryConfig, TreeBuilder};
//!
//! let builder = TreeBuilder::new(LibraryConfig::default());
//! let mut progress_rx = builder.subscribe();
//!
//! tokio::spawn(async move {
//!     while let Ok(progress) = progress_rx.recv().await {
//!         println!("Visiting {}", progress.current_path.display());
//!     }
//! });
//! ```

mod builder;
mod metadata;
mod progress;

pub use builder::TreeBuilder;
pub use metadata::{LoftyReader, MetadataError, MetadataReader, NoMetadata};
pub use progress::BuildProgress;

// Re-export core types for convenience
pub use tunetree_core::{
    BuildError, BuildWarning, Item, ItemCell, ItemRef, LibraryConfig, NodeId, SongMeta, Tree,
    WarningKind,
};
