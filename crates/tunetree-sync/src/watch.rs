//! Translation of filesystem watcher notifications into sync events.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::action::SyncEvent;

/// What the watcher saw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WatchKind {
    /// The path was created.
    Created,
    /// The path was removed.
    Removed,
    /// File contents or attributes changed.
    Modified,
    /// The entry formerly at `from` now lives at the event path.
    Renamed { from: PathBuf },
}

/// One notification from a filesystem watcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchEvent {
    pub kind: WatchKind,
    pub path: PathBuf,
}

impl WatchEvent {
    /// Create a watch event.
    pub fn new(kind: WatchKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

/// Turn a watcher notification into the events that mirror it.
///
/// A rename that changes both parent and name becomes a move followed by
/// a rename. Content changes do not affect the tree.
pub fn translate_watch_event(event: &WatchEvent) -> Vec<SyncEvent> {
    let path = &event.path;
    match &event.kind {
        WatchKind::Created => vec![SyncEvent::add(path)],
        WatchKind::Removed => vec![SyncEvent::delete(path)],
        WatchKind::Modified => Vec::new(),
        WatchKind::Renamed { from } => {
            if from == path {
                return Vec::new();
            }
            let (Some(old_parent), Some(new_parent)) = (from.parent(), path.parent()) else {
                return vec![SyncEvent::delete(from), SyncEvent::add(path)];
            };
            if old_parent == new_parent {
                return vec![SyncEvent::rename(from, path)];
            }

            let moved = SyncEvent::move_to(from, new_parent);
            match from.file_name() {
                Some(name) if path.file_name() == Some(name) => vec![moved],
                Some(name) => vec![moved, SyncEvent::rename(new_parent.join(name), path)],
                None => vec![SyncEvent::delete(from), SyncEvent::add(path)],
            }
        }
    }
}
