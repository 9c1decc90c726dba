//! Query construction errors.

use thiserror::Error;

/// A search query could not be compiled.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The glob pattern is malformed.
    #[error("Invalid glob pattern {pattern:?}: {source}")]
    Glob {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    /// The regular expression is malformed.
    #[error("Invalid regex {pattern:?}: {source}")]
    Regex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// No song field with this name.
    #[error("Unknown song field {name:?}")]
    UnknownField { name: String },
}
