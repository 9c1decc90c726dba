//! Filtered search for tunetree.
//!
//! A search walks a library tree with a [`SearchPredicate`] and returns a
//! pruned copy holding every hit plus the folders needed to reach it.
//!
//! # Example
//!
//! ```no_run
//! use tunetree_search::{NameQuery, SearchOptions, SearchOutcome, search};
//! # fn demo(tree: &tunetree_core::Tree) {
//! match search(tree, &NameQuery::new("live"), SearchOptions::default()) {
//!     SearchOutcome::Found(result) => println!("{} nodes", result.len()),
//!     SearchOutcome::Empty => println!("no matches"),
//! }
//! # }
//! ```

mod error;
mod predicate;
mod searcher;

pub use error::QueryError;
pub use predicate::{
    FieldQuery, FuzzyQuery, GlobQuery, NameQuery, RegexQuery, SearchPredicate, SongField,
};
pub use searcher::{SearchOptions, SearchOutcome, Searcher, search};
