//! Song tag reading.

use std::path::{Path, PathBuf};

use compact_str::CompactString;
use lofty::file::{AudioFile, TaggedFileExt};
use lofty::tag::{Accessor, ItemKey};
use thiserror::Error;

use tunetree_core::SongMeta;

/// Failure to read tags from a file.
#[derive(Debug, Error)]
#[error("Failed to read tags from {path}: {message}")]
pub struct MetadataError {
    /// File whose tags could not be read.
    pub path: PathBuf,
    /// Reason reported by the tag reader.
    pub message: String,
}

impl MetadataError {
    /// Create a new metadata error.
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Reads tag metadata for a song file.
pub trait MetadataReader: Send + Sync {
    /// Read the metadata of `path`.
    fn read(&self, path: &Path) -> Result<SongMeta, MetadataError>;
}

/// Reader backed by lofty.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoftyReader;

impl MetadataReader for LoftyReader {
    fn read(&self, path: &Path) -> Result<SongMeta, MetadataError> {
        let tagged =
            lofty::read_from_path(path).map_err(|e| MetadataError::new(path, e.to_string()))?;

        let properties = tagged.properties();
        let duration = properties.duration();
        let frames = properties
            .sample_rate()
            .map(|rate| (duration.as_secs_f64() * f64::from(rate)).round() as u64);

        let mut meta = SongMeta {
            duration: Some(duration),
            frames,
            ..SongMeta::default()
        };

        if let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) {
            meta.title = non_blank(tag.title().as_deref());
            meta.artist = non_blank(tag.artist().as_deref());
            meta.album = non_blank(tag.album().as_deref());
            meta.genre = non_blank(tag.genre().as_deref());
            meta.rating = tag
                .items()
                .filter(|item| matches!(item.key(), ItemKey::Popularimeter))
                .find_map(|item| item.value().text())
                .and_then(parse_rating);
        }

        Ok(meta)
    }
}

/// Reader that never touches the file; every song gets empty metadata.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoMetadata;

impl MetadataReader for NoMetadata {
    fn read(&self, _path: &Path) -> Result<SongMeta, MetadataError> {
        Ok(SongMeta::default())
    }
}

fn non_blank(value: Option<&str>) -> Option<CompactString> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(CompactString::from)
}

/// Normalize a rating tag to 0-5 stars.
///
/// Accepts a plain number or a `email|rating|counter` popularimeter string.
/// Fractions up to 1.0 are read as 0.0-1.0 scores, values up to 5 as
/// stars, up to 100 as percent, and up to 255 as ID3 POPM bytes.
fn parse_rating(value: &str) -> Option<u8> {
    let raw = value.split('|').find_map(|field| field.trim().parse::<f64>().ok())?;
    if !(0.0..=255.0).contains(&raw) {
        return None;
    }

    let stars = if raw <= 1.0 && raw.fract() != 0.0 {
        (raw * 5.0).round()
    } else if raw <= 5.0 {
        raw.round()
    } else if raw <= 100.0 {
        (raw / 20.0).round()
    } else {
        match raw as u8 {
            0..=31 => 1.0,
            32..=95 => 2.0,
            96..=159 => 3.0,
            160..=223 => 4.0,
            224..=255 => 5.0,
        }
    };
    Some(stars as u8)
}
