//! Live library trees for tunetree.
//!
//! A [`Library`] owns the tree mirroring one music folder. Filesystem
//! changes, whether made through [`Library::perform`] or reported by a
//! watcher, arrive as [`SyncEvent`]s and are projected onto the tree by the
//! [`Synchronizer`] without a rebuild. Item handles stay the same across
//! moves and renames, so anything holding one keeps seeing current data.
//!
//! For concurrent use, spawn a [`LibraryHandle`]: each library gets its own
//! mailbox and worker, and independent libraries proceed in parallel.
//!
//! # Example
//!
//! ```no_run
//! use std::collections::HashSet;
//! use tunetree_core::LibraryConfig;
//! use tunetree_sync::{Library, SyncEvent};
//!
//! let mut library = Library::open("/music", LibraryConfig::default(), &HashSet::new())?;
//! library.apply(&SyncEvent::add("/music/New Album"));
//! for song in library.songs() {
//!     println!("{}", song.path().display());
//! }
//! # Ok::<(), tunetree_sync::LibraryError>(())
//! ```

mod action;
mod error;
mod handle;
mod library;
mod set;
mod synchronizer;
mod watch;

pub use action::{Action, IgnoreReason, SyncEvent, SyncOutcome};
pub use error::LibraryError;
pub use handle::LibraryHandle;
pub use library::Library;
pub use set::LibrarySet;
pub use synchronizer::Synchronizer;
pub use watch::{WatchEvent, WatchKind, translate_watch_event};
