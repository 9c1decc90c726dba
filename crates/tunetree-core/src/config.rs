//! Library configuration types.

use std::path::Path;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Extensions accepted when no configuration says otherwise.
pub const DEFAULT_EXTENSIONS: &[&str] = &["mp3", "flac", "ogg", "wav", "m4a", "opus"];

/// Configuration for building and watching a library tree.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
#[serde(default)]
pub struct LibraryConfig {
    /// Accepted file extensions, without the leading dot.
    #[builder(default = "default_extensions()")]
    pub extensions: Vec<String>,

    /// Include hidden files and folders (starting with .).
    #[builder(default = "false")]
    pub include_hidden: bool,

    /// Follow symbolic links.
    #[builder(default = "true")]
    pub follow_symlinks: bool,

    /// Sort children by name instead of keeping enumeration order.
    #[builder(default = "false")]
    pub sort_children: bool,

    /// Read tags for every song while building.
    #[builder(default = "true")]
    pub read_metadata: bool,
}

fn default_extensions() -> Vec<String> {
    DEFAULT_EXTENSIONS.iter().map(|e| (*e).to_string()).collect()
}

fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_ascii_lowercase()
}

impl LibraryConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(ref extensions) = self.extensions {
            if extensions.iter().all(|e| normalize_extension(e).is_empty()) {
                return Err("At least one file extension is required".to_string());
            }
        }
        Ok(())
    }
}

impl LibraryConfig {
    /// Create a new library config builder.
    pub fn builder() -> LibraryConfigBuilder {
        LibraryConfigBuilder::default()
    }

    /// Check whether a file is an accepted audio file, by extension.
    pub fn accepts(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        let ext = ext.to_ascii_lowercase();
        self.extensions.iter().any(|e| normalize_extension(e) == ext)
    }

    /// Check if hidden entries should be skipped.
    pub fn should_skip_hidden(&self, name: &str) -> bool {
        !self.include_hidden && name.starts_with('.')
    }
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            include_hidden: false,
            follow_symlinks: true,
            sort_children: false,
            read_metadata: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = LibraryConfig::builder()
            .extensions(vec![".MP3".to_string()])
            .sort_children(true)
            .build()
            .unwrap();

        assert!(config.sort_children);
        assert!(config.accepts(Path::new("/music/a.mp3")));
        assert!(!config.accepts(Path::new("/music/a.flac")));
    }

    #[test]
    fn test_config_builder_rejects_empty_extensions() {
        let result = LibraryConfig::builder()
            .extensions(vec![" . ".to_string()])
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_accepts_is_case_insensitive() {
        let config = LibraryConfig::default();
        assert!(config.accepts(Path::new("/tmp/a.mp3")));
        assert!(config.accepts(Path::new("/tmp/a.MP3")));
        assert!(config.accepts(Path::new("/tmp/a.Flac")));
        assert!(!config.accepts(Path::new("/tmp/a.txt")));
        assert!(!config.accepts(Path::new("/tmp/mp3")));
    }

    #[test]
    fn test_should_skip_hidden() {
        let mut config = LibraryConfig::default();
        assert!(config.should_skip_hidden(".cache"));
        assert!(!config.should_skip_hidden("Rock"));

        config.include_hidden = true;
        assert!(!config.should_skip_hidden(".cache"));
    }

    #[test]
    fn test_partial_toml_style_config_uses_defaults() {
        let config: LibraryConfig = serde_json::from_str(r#"{"sort_children": true}"#).unwrap();
        assert!(config.sort_children);
        assert!(config.follow_symlinks);
        assert_eq!(config.extensions.len(), DEFAULT_EXTENSIONS.len());
    }
}
