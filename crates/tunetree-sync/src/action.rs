//! Synchronization events and their outcomes.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

/// The kind of change applied to a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
pub enum Action {
    Add,
    Delete,
    Move,
    Rename,
    Paste,
}

/// One filesystem change to project onto a tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncEvent {
    /// `path` appeared on disk.
    Add { path: PathBuf },
    /// `path` is gone.
    Delete { path: PathBuf },
    /// `source` now lives directly inside the directory `destination`.
    Move {
        source: PathBuf,
        destination: PathBuf,
    },
    /// `from` was renamed to `to`.
    Rename { from: PathBuf, to: PathBuf },
    /// `source` was copied and the copy created at `destination`.
    Paste {
        source: PathBuf,
        destination: PathBuf,
    },
}

impl SyncEvent {
    /// Create an add event.
    pub fn add(path: impl Into<PathBuf>) -> Self {
        Self::Add { path: path.into() }
    }

    /// Create a delete event.
    pub fn delete(path: impl Into<PathBuf>) -> Self {
        Self::Delete { path: path.into() }
    }

    /// Create a move event.
    pub fn move_to(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self::Move {
            source: source.into(),
            destination: destination.into(),
        }
    }

    /// Create a rename event.
    pub fn rename(from: impl Into<PathBuf>, to: impl Into<PathBuf>) -> Self {
        Self::Rename {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Create a paste event.
    pub fn paste(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self::Paste {
            source: source.into(),
            destination: destination.into(),
        }
    }

    /// The kind of change.
    pub fn action(&self) -> Action {
        match self {
            Self::Add { .. } => Action::Add,
            Self::Delete { .. } => Action::Delete,
            Self::Move { .. } => Action::Move,
            Self::Rename { .. } => Action::Rename,
            Self::Paste { .. } => Action::Paste,
        }
    }

    /// The path the event is about; decides which library owns it.
    pub fn path(&self) -> &Path {
        match self {
            Self::Add { path } | Self::Delete { path } => path,
            Self::Move { source, .. } => source,
            Self::Rename { from, .. } => from,
            Self::Paste { destination, .. } => destination,
        }
    }
}

impl std::fmt::Display for SyncEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Add { path } | Self::Delete { path } => {
                write!(f, "{} {}", self.action(), path.display())
            }
            Self::Move {
                source,
                destination,
            }
            | Self::Paste {
                source,
                destination,
            } => write!(
                f,
                "{} {} -> {}",
                self.action(),
                source.display(),
                destination.display()
            ),
            Self::Rename { from, to } => {
                write!(f, "rename {} -> {}", from.display(), to.display())
            }
        }
    }
}

/// Why an event left the tree untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IgnoreReason {
    /// The target is not in the tree.
    NotFound,
    /// The path is already in the tree.
    AlreadyPresent,
    /// The parent folder is not in the tree.
    ParentNotFound,
    /// The path does not exist on disk.
    MissingOnDisk,
    /// The file type is filtered out.
    NotAccepted,
    /// The destination lies inside the moved folder.
    DestinationInsideSource,
    /// The move destination is a song, not a folder.
    DestinationNotFolder,
    /// The moved entry would replace a folder that contains it.
    ReplacesSourceAncestor,
    /// A rename target that does not share the renamed entry's folder.
    ParentChanged,
    /// The library root cannot be removed or moved.
    IsRoot,
}

impl std::fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "not in tree"),
            Self::AlreadyPresent => write!(f, "already in tree"),
            Self::ParentNotFound => write!(f, "parent not in tree"),
            Self::MissingOnDisk => write!(f, "missing on disk"),
            Self::NotAccepted => write!(f, "not an accepted file"),
            Self::DestinationInsideSource => write!(f, "destination inside source"),
            Self::DestinationNotFolder => write!(f, "destination is not a folder"),
            Self::ReplacesSourceAncestor => write!(f, "would replace a folder containing the source"),
            Self::ParentChanged => write!(f, "rename would change folder"),
            Self::IsRoot => write!(f, "library root"),
        }
    }
}

/// Result of applying one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncOutcome {
    /// The tree changed.
    Applied,
    /// The tree was left alone.
    Ignored(IgnoreReason),
}

impl SyncOutcome {
    /// Check whether the tree changed.
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_event_actions() {
        let events = [
            SyncEvent::add("/m/a"),
            SyncEvent::delete("/m/a"),
            SyncEvent::move_to("/m/a", "/m/b"),
            SyncEvent::rename("/m/a", "/m/c"),
            SyncEvent::paste("/m/a", "/m/b/a"),
        ];
        let actions: Vec<Action> = events.iter().map(SyncEvent::action).collect();
        assert_eq!(actions, Action::iter().collect::<Vec<_>>());
    }

    #[test]
    fn test_event_display() {
        assert_eq!(SyncEvent::add("/m/a").to_string(), "add /m/a");
        assert_eq!(
            SyncEvent::move_to("/m/a", "/m/b").to_string(),
            "move /m/a -> /m/b"
        );
    }

    #[test]
    fn test_paste_is_routed_by_destination() {
        let event = SyncEvent::paste("/other/a.mp3", "/m/a.mp3");
        assert_eq!(event.path(), Path::new("/m/a.mp3"));
    }
}
