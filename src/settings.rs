//! Persisted CLI settings.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use tunetree_core::LibraryConfig;
use tunetree_search::SearchOptions;

/// One registered library and the folders left expanded in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryEntry {
    pub root: PathBuf,
    #[serde(default)]
    pub expanded: Vec<PathBuf>,
}

/// Settings stored in `settings.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Registered libraries, in registration order.
    pub libraries: Vec<LibraryEntry>,
    /// Build options shared by every library.
    pub library: LibraryConfig,
    /// Search defaults.
    pub search: SearchOptions,
}

impl Settings {
    /// Get the config file path.
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("tunetree").join("settings.toml"))
    }

    /// Load settings from disk, or return defaults.
    pub fn load() -> Self {
        Self::config_path()
            .and_then(|path| std::fs::read_to_string(&path).ok())
            .and_then(|content| toml::from_str(&content).ok())
            .unwrap_or_default()
    }

    /// Save settings to disk.
    pub fn save(&self) -> std::io::Result<()> {
        let path = Self::config_path().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "No config directory")
        })?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        std::fs::write(&path, content)
    }

    /// Registered library containing `path`, deepest root first.
    pub fn owner_of(&self, path: &Path) -> Option<&LibraryEntry> {
        self.libraries
            .iter()
            .filter(|entry| path.starts_with(&entry.root))
            .max_by_key(|entry| entry.root.components().count())
    }

    /// Expanded folders remembered for `root`.
    pub fn expanded_for(&self, root: &Path) -> HashSet<PathBuf> {
        self.libraries
            .iter()
            .find(|entry| entry.root == root)
            .map(|entry| entry.expanded.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Register `root`; returns false if it already was.
    pub fn register(&mut self, root: PathBuf) -> bool {
        if self.libraries.iter().any(|entry| entry.root == root) {
            return false;
        }
        self.libraries.push(LibraryEntry {
            root,
            expanded: Vec::new(),
        });
        true
    }

    /// Forget `root`; returns false if it was not registered.
    pub fn forget(&mut self, root: &Path) -> bool {
        let before = self.libraries.len();
        self.libraries.retain(|entry| entry.root != root);
        self.libraries.len() != before
    }

    /// Remember the expanded folders of a registered library.
    pub fn remember_expanded(&mut self, root: &Path, expanded: Vec<PathBuf>) {
        if let Some(entry) = self.libraries.iter_mut().find(|entry| entry.root == root) {
            entry.expanded = expanded;
        }
    }
}
