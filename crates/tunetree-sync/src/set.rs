//! Registry of open libraries.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use rayon::prelude::*;

use tunetree_core::LibraryConfig;

use crate::action::{SyncEvent, SyncOutcome};
use crate::error::LibraryError;
use crate::library::Library;

/// The libraries a user has registered, in registration order.
#[derive(Debug, Default)]
pub struct LibrarySet {
    libraries: IndexMap<PathBuf, Library>,
}

impl LibrarySet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open and register the library at `root`.
    pub fn add(
        &mut self,
        root: impl Into<PathBuf>,
        config: LibraryConfig,
        expanded: &HashSet<PathBuf>,
    ) -> Result<&Library, LibraryError> {
        let root = root.into();
        if self.libraries.contains_key(&root) {
            return Err(LibraryError::AlreadyRegistered { path: root });
        }
        let library = Library::open(&root, config, expanded)?;
        Ok(self.insert(library))
    }

    /// Register an already opened library.
    pub fn insert(&mut self, library: Library) -> &Library {
        let root = library.root().to_path_buf();
        let index = self.libraries.insert_full(root, library).0;
        &self.libraries[index]
    }

    /// Open several libraries in parallel.
    ///
    /// Roots already registered, or repeated in `roots`, are reported as
    /// [`LibraryError::AlreadyRegistered`]; the rest open independently.
    pub fn add_all(
        &mut self,
        roots: Vec<(PathBuf, HashSet<PathBuf>)>,
        config: &LibraryConfig,
    ) -> Vec<Result<PathBuf, LibraryError>> {
        let mut seen = HashSet::new();
        let opened: Vec<Result<Library, LibraryError>> = roots
            .into_iter()
            .map(|(root, expanded)| {
                if self.libraries.contains_key(&root) || !seen.insert(root.clone()) {
                    Err(LibraryError::AlreadyRegistered { path: root })
                } else {
                    Ok((root, expanded))
                }
            })
            .collect::<Vec<_>>()
            .into_par_iter()
            .map(|entry| {
                let (root, expanded) = entry?;
                Library::open(root, config.clone(), &expanded)
            })
            .collect();

        opened
            .into_iter()
            .map(|result| result.map(|library| self.insert(library).root().to_path_buf()))
            .collect()
    }

    /// Unregister a library. Nothing on disk is touched.
    pub fn remove(&mut self, root: &Path) -> Option<Library> {
        let removed = self.libraries.shift_remove(root);
        if removed.is_some() {
            tracing::info!(root = %root.display(), "removed library");
        }
        removed
    }

    /// Library registered at exactly `root`.
    pub fn get(&self, root: &Path) -> Option<&Library> {
        self.libraries.get(root)
    }

    /// Mutable access to the library at `root`.
    pub fn get_mut(&mut self, root: &Path) -> Option<&mut Library> {
        self.libraries.get_mut(root)
    }

    /// The library whose tree would hold `path`; the deepest root wins.
    pub fn owner_of(&self, path: &Path) -> Option<&Library> {
        self.libraries
            .values()
            .filter(|library| library.contains_path(path))
            .max_by_key(|library| library.root().components().count())
    }

    /// Apply an event to every library whose tree would hold its path.
    ///
    /// Nested libraries each see the change. A move out of a library
    /// leaves it there (the destination is untracked) and shows up as an
    /// Add in every library holding the destination but not the source.
    pub fn route(
        &mut self,
        event: &SyncEvent,
    ) -> Result<Vec<(PathBuf, SyncOutcome)>, LibraryError> {
        let path = event.path();
        let mut outcomes: Vec<(PathBuf, SyncOutcome)> = self
            .libraries
            .iter_mut()
            .filter(|(_, library)| library.contains_path(path))
            .map(|(root, library)| (root.clone(), library.apply(event)))
            .collect();

        if let SyncEvent::Move {
            source,
            destination,
        } = event
        {
            if let Some(name) = source.file_name() {
                let added = SyncEvent::add(destination.join(name));
                outcomes.extend(
                    self.libraries
                        .iter_mut()
                        .filter(|(_, library)| {
                            library.contains_path(destination) && !library.contains_path(source)
                        })
                        .map(|(root, library)| (root.clone(), library.apply(&added))),
                );
            }
        }

        if outcomes.is_empty() {
            return Err(LibraryError::NotRegistered {
                path: path.to_path_buf(),
            });
        }
        Ok(outcomes)
    }

    /// Registered libraries in order.
    pub fn iter(&self) -> impl Iterator<Item = &Library> {
        self.libraries.values()
    }

    /// Registered roots in order.
    pub fn roots(&self) -> impl Iterator<Item = &Path> {
        self.libraries.keys().map(PathBuf::as_path)
    }

    /// Number of registered libraries.
    pub fn len(&self) -> usize {
        self.libraries.len()
    }

    /// Whether no library is registered.
    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty()
    }
}
