//! Library item types: songs and folders.

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};
use std::time::Duration;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Tag metadata cached on a song.
///
/// Every field is optional: a song whose tags could not be read still
/// shows up in the tree, just without metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SongMeta {
    /// Track title.
    pub title: Option<CompactString>,
    /// Track artist.
    pub artist: Option<CompactString>,
    /// Album title.
    pub album: Option<CompactString>,
    /// Genre.
    pub genre: Option<CompactString>,
    /// User rating, 0-5.
    pub rating: Option<u8>,
    /// Playback duration.
    pub duration: Option<Duration>,
    /// Total number of audio frames (samples per channel).
    pub frames: Option<u64>,
}

impl SongMeta {
    /// Check whether no field has been populated.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// An audio file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Song {
    /// Absolute path of the file.
    pub path: PathBuf,
    /// Cached tag metadata.
    pub meta: SongMeta,
}

/// A directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Folder {
    /// Absolute path of the directory.
    pub path: PathBuf,
    /// Whether this folder is the top of a library or of a displayed pane.
    pub root: bool,
}

/// The payload of a tree node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Item {
    /// Audio file.
    Song(Song),
    /// Directory.
    Folder(Folder),
}

impl Item {
    /// Create a song item.
    pub fn song(path: impl Into<PathBuf>, meta: SongMeta) -> Self {
        Self::Song(Song {
            path: path.into(),
            meta,
        })
    }

    /// Create a folder item.
    pub fn folder(path: impl Into<PathBuf>, root: bool) -> Self {
        Self::Folder(Folder {
            path: path.into(),
            root,
        })
    }

    /// Absolute path of the underlying file or directory.
    pub fn path(&self) -> &Path {
        match self {
            Item::Song(song) => &song.path,
            Item::Folder(folder) => &folder.path,
        }
    }

    /// Point this item at a new absolute path.
    pub fn change_path(&mut self, path: PathBuf) {
        match self {
            Item::Song(song) => song.path = path,
            Item::Folder(folder) => folder.path = path,
        }
    }

    /// Whether this item is shown as a root.
    pub fn is_root(&self) -> bool {
        match self {
            Item::Song(_) => false,
            Item::Folder(folder) => folder.root,
        }
    }

    /// Check if this is a song.
    pub fn is_song(&self) -> bool {
        matches!(self, Item::Song(_))
    }

    /// Check if this is a folder.
    pub fn is_folder(&self) -> bool {
        matches!(self, Item::Folder(_))
    }

    /// Song payload, if any.
    pub fn as_song(&self) -> Option<&Song> {
        match self {
            Item::Song(song) => Some(song),
            Item::Folder(_) => None,
        }
    }

    /// File or directory name, falling back to the whole path for `/`.
    pub fn name(&self) -> Cow<'_, str> {
        let path = self.path();
        match path.file_name() {
            Some(name) => name.to_string_lossy(),
            None => path.to_string_lossy(),
        }
    }

    /// Text shown for this item: roots display their full path.
    pub fn label(&self) -> Cow<'_, str> {
        if self.is_root() {
            self.path().to_string_lossy()
        } else {
            self.name()
        }
    }
}

impl PartialEq for Item {
    fn eq(&self, other: &Self) -> bool {
        self.path() == other.path()
    }
}

impl Eq for Item {}

/// Shared handle to an item.
///
/// Tree nodes, search results and outside observers all hold clones of the
/// same handle, so a rename applied through one is visible through all.
pub type ItemRef = Arc<ItemCell>;

/// Interior-mutable cell wrapping an [`Item`].
#[derive(Debug)]
pub struct ItemCell {
    inner: RwLock<Item>,
}

impl ItemCell {
    /// Wrap an item into a new shared handle.
    pub fn new(item: Item) -> ItemRef {
        Arc::new(Self {
            inner: RwLock::new(item),
        })
    }

    /// Borrow the item for reading.
    pub fn read(&self) -> RwLockReadGuard<'_, Item> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current absolute path.
    pub fn path(&self) -> PathBuf {
        self.read().path().to_path_buf()
    }

    /// Current file or directory name.
    pub fn name(&self) -> String {
        self.read().name().into_owned()
    }

    /// Whether the item currently lives at `path`.
    pub fn has_path(&self, path: &Path) -> bool {
        self.read().path() == path
    }

    /// Rewrite the item's path in place.
    ///
    /// Only tree synchronization should call this; everyone else observes.
    pub fn change_path(&self, path: PathBuf) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .change_path(path);
    }

    /// Replace a song's metadata. No-op for folders.
    pub fn set_meta(&self, meta: SongMeta) {
        if let Item::Song(song) = &mut *self.inner.write().unwrap_or_else(PoisonError::into_inner) {
            song.meta = meta;
        }
    }

    /// Clone the current item value.
    pub fn snapshot(&self) -> Item {
        self.read().clone()
    }
}
