//! Search predicates.
//!
//! A predicate answers one question: is this item a hit? The searcher
//! takes care of structure, so predicates never look at the tree.

use std::str::FromStr;
use std::sync::{Mutex, PoisonError};

use globset::{GlobBuilder, GlobMatcher};
use nucleo::{Config, Matcher, Utf32Str};
use regex::{Regex, RegexBuilder};
use strum::{Display, EnumIter, EnumString};

use tunetree_core::Item;

use crate::error::QueryError;

/// Decides whether an item belongs in a search result.
pub trait SearchPredicate: Send + Sync {
    /// Check whether `item` is a hit.
    fn is_hit(&self, item: &Item) -> bool;
}

impl<F> SearchPredicate for F
where
    F: Fn(&Item) -> bool + Send + Sync,
{
    fn is_hit(&self, item: &Item) -> bool {
        self(item)
    }
}

/// Substring match on the file or folder name.
#[derive(Debug, Clone)]
pub struct NameQuery {
    needle: String,
    case_sensitive: bool,
}

impl NameQuery {
    /// Case-insensitive name query.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            needle: text.into().to_lowercase(),
            case_sensitive: false,
        }
    }

    /// Name query that respects case.
    pub fn case_sensitive(text: impl Into<String>) -> Self {
        Self {
            needle: text.into(),
            case_sensitive: true,
        }
    }
}

impl SearchPredicate for NameQuery {
    fn is_hit(&self, item: &Item) -> bool {
        let name = item.name();
        if self.case_sensitive {
            name.contains(&self.needle)
        } else {
            name.to_lowercase().contains(&self.needle)
        }
    }
}

/// Shell-style glob on the file or folder name, e.g. `*.flac`.
#[derive(Debug, Clone)]
pub struct GlobQuery {
    matcher: GlobMatcher,
}

impl GlobQuery {
    /// Compile a case-insensitive glob.
    pub fn new(pattern: &str) -> Result<Self, QueryError> {
        let glob = GlobBuilder::new(pattern)
            .case_insensitive(true)
            .literal_separator(true)
            .build()
            .map_err(|source| QueryError::Glob {
                pattern: pattern.to_string(),
                source,
            })?;
        Ok(Self {
            matcher: glob.compile_matcher(),
        })
    }
}

impl SearchPredicate for GlobQuery {
    fn is_hit(&self, item: &Item) -> bool {
        self.matcher.is_match(item.name().as_ref())
    }
}

/// Regular expression on the file or folder name.
#[derive(Debug, Clone)]
pub struct RegexQuery {
    regex: Regex,
}

impl RegexQuery {
    /// Compile a regex; `case_sensitive = false` adds the `i` flag.
    pub fn new(pattern: &str, case_sensitive: bool) -> Result<Self, QueryError> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(!case_sensitive)
            .build()
            .map_err(|source| QueryError::Regex {
                pattern: pattern.to_string(),
                source,
            })?;
        Ok(Self { regex })
    }
}

impl SearchPredicate for RegexQuery {
    fn is_hit(&self, item: &Item) -> bool {
        self.regex.is_match(&item.name())
    }
}

/// Fuzzy match on the file or folder name using nucleo.
pub struct FuzzyQuery {
    needle: String,
    min_score: u16,
    matcher: Mutex<Matcher>,
}

impl FuzzyQuery {
    /// Fuzzy query accepting any match.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            needle: text.into().to_lowercase(),
            min_score: 0,
            matcher: Mutex::new(Matcher::new(Config::DEFAULT)),
        }
    }

    /// Only accept matches scoring at least `min_score`.
    pub fn with_min_score(mut self, min_score: u16) -> Self {
        self.min_score = min_score;
        self
    }

    /// Score `name` against the query.
    pub fn score(&self, name: &str) -> Option<u16> {
        let mut haystack_buf = Vec::new();
        let mut needle_buf = Vec::new();
        let haystack = Utf32Str::new(name, &mut haystack_buf);
        let needle = Utf32Str::new(&self.needle, &mut needle_buf);

        self.matcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .fuzzy_match(haystack, needle)
    }
}

impl SearchPredicate for FuzzyQuery {
    fn is_hit(&self, item: &Item) -> bool {
        self.score(&item.name())
            .is_some_and(|score| score >= self.min_score)
    }
}

impl std::fmt::Debug for FuzzyQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FuzzyQuery")
            .field("needle", &self.needle)
            .field("min_score", &self.min_score)
            .finish_non_exhaustive()
    }
}

/// Song tag fields that can be searched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SongField {
    Title,
    Artist,
    Album,
    Genre,
}

/// Case-insensitive substring match on one song tag. Folders never match.
#[derive(Debug, Clone)]
pub struct FieldQuery {
    field: SongField,
    needle: String,
}

impl FieldQuery {
    /// Query a known field.
    pub fn new(field: SongField, text: impl Into<String>) -> Self {
        Self {
            field,
            needle: text.into().to_lowercase(),
        }
    }

    /// Query a field by name, e.g. `"artist"`.
    pub fn parse(field: &str, text: impl Into<String>) -> Result<Self, QueryError> {
        let field = SongField::from_str(field).map_err(|_| QueryError::UnknownField {
            name: field.to_string(),
        })?;
        Ok(Self::new(field, text))
    }

    /// The searched field.
    pub fn field(&self) -> SongField {
        self.field
    }
}

impl SearchPredicate for FieldQuery {
    fn is_hit(&self, item: &Item) -> bool {
        let Some(song) = item.as_song() else {
            return false;
        };
        let value = match self.field {
            SongField::Title => &song.meta.title,
            SongField::Artist => &song.meta.artist,
            SongField::Album => &song.meta.album,
            SongField::Genre => &song.meta.genre,
        };
        value
            .as_deref()
            .is_some_and(|v| v.to_lowercase().contains(&self.needle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;
    use tunetree_core::SongMeta;

    fn song(path: &str) -> Item {
        Item::song(path, SongMeta::default())
    }

    #[test]
    fn test_name_query_ignores_case_and_parent_path() {
        let query = NameQuery::new("ROCK");
        assert!(query.is_hit(&Item::folder("/music/Rock", false)));
        assert!(query.is_hit(&song("/music/x/rocket.mp3")));
        assert!(!query.is_hit(&song("/music/Rock/song.mp3")));
    }

    #[test]
    fn test_name_query_case_sensitive() {
        let query = NameQuery::case_sensitive("Rock");
        assert!(query.is_hit(&Item::folder("/music/Rock", false)));
        assert!(!query.is_hit(&Item::folder("/music/rock", false)));
    }

    #[test]
    fn test_glob_query() {
        let query = GlobQuery::new("*.flac").unwrap();
        assert!(query.is_hit(&song("/music/a/Track.FLAC")));
        assert!(!query.is_hit(&song("/music/a/track.mp3")));

        assert!(matches!(
            GlobQuery::new("[unclosed"),
            Err(QueryError::Glob { .. })
        ));
    }

    #[test]
    fn test_regex_query() {
        let query = RegexQuery::new(r"^\d+ - ", false).unwrap();
        assert!(query.is_hit(&song("/music/01 - intro.mp3")));
        assert!(!query.is_hit(&song("/music/intro.mp3")));

        assert!(matches!(
            RegexQuery::new("(", false),
            Err(QueryError::Regex { .. })
        ));
    }

    #[test]
    fn test_fuzzy_query() {
        let query = FuzzyQuery::new("blsng");
        assert!(query.is_hit(&song("/music/blue_song.mp3")));
        assert!(!query.is_hit(&song("/music/intro.mp3")));
        assert!(query.score("blue_song.mp3").is_some());

        let strict = FuzzyQuery::new("blsng").with_min_score(u16::MAX);
        assert!(!strict.is_hit(&song("/music/blue_song.mp3")));
    }

    #[test]
    fn test_field_query() {
        let item = Item::song(
            "/music/a.mp3",
            SongMeta {
                artist: Some("Miles Davis".into()),
                ..SongMeta::default()
            },
        );

        assert!(FieldQuery::new(SongField::Artist, "miles").is_hit(&item));
        assert!(!FieldQuery::new(SongField::Album, "miles").is_hit(&item));
        assert!(!FieldQuery::new(SongField::Artist, "miles").is_hit(&Item::folder("/music", true)));
    }

    #[test]
    fn test_field_names_parse() {
        for field in SongField::iter() {
            let parsed = FieldQuery::parse(&field.to_string(), "x").unwrap();
            assert_eq!(parsed.field(), field);
        }
        assert_eq!(FieldQuery::parse("ARTIST", "x").unwrap().field(), SongField::Artist);
        assert!(matches!(
            FieldQuery::parse("bitrate", "x"),
            Err(QueryError::UnknownField { .. })
        ));
    }

    #[test]
    fn test_closures_are_predicates() {
        let songs_only = |item: &Item| item.is_song();
        assert!(songs_only.is_hit(&song("/music/a.mp3")));
        assert!(!songs_only.is_hit(&Item::folder("/music", true)));
    }
}
