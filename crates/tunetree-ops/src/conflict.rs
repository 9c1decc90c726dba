//! Destination conflict detection and resolution.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// The kind of conflict at a destination path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictKind {
    /// A file already exists at the destination.
    FileExists,
    /// A directory already exists at the destination.
    DirectoryExists,
}

impl ConflictKind {
    /// Inspect `path` and report what, if anything, is in the way.
    pub fn at(path: &Path) -> Option<Self> {
        let metadata = std::fs::symlink_metadata(path).ok()?;
        Some(if metadata.is_dir() {
            Self::DirectoryExists
        } else {
            Self::FileExists
        })
    }
}

impl std::fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FileExists => write!(f, "File already exists"),
            Self::DirectoryExists => write!(f, "Directory already exists"),
        }
    }
}

/// How to resolve a destination conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ConflictResolution {
    /// Fail the operation and leave both entries alone.
    #[default]
    Skip,
    /// Replace the existing entry.
    Overwrite,
    /// Pick a free name such as "song (1).mp3".
    AutoRename,
}

/// Generate a free sibling path for `path`.
///
/// For "song.mp3", tries "song (1).mp3", "song (2).mp3", etc.
pub fn auto_rename_path(path: &Path) -> PathBuf {
    let parent = path.parent().unwrap_or(Path::new(""));
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
    let extension = path.extension().and_then(|e| e.to_str());

    let candidate = |suffix: &str| match extension {
        Some(ext) => parent.join(format!("{stem} {suffix}.{ext}")),
        None => parent.join(format!("{stem} {suffix}")),
    };

    for i in 1..1000 {
        let new_path = candidate(&format!("({i})"));
        if ConflictKind::at(&new_path).is_none() {
            return new_path;
        }
    }

    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    candidate(&format!("({timestamp})"))
}
