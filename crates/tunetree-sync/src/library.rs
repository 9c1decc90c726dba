//! A single library: one root directory and its live tree.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;

use tunetree_core::{ItemRef, LibraryConfig, NodeId, Tree, TreeSnapshot};
use tunetree_ops::{FileOperation, FileOps, OpError, OpOutcome};
use tunetree_scan::TreeBuilder;
use tunetree_search::{SearchOptions, SearchOutcome, SearchPredicate, Searcher};

use crate::action::{SyncEvent, SyncOutcome};
use crate::error::LibraryError;
use crate::synchronizer::Synchronizer;

/// A registered music folder and the tree mirroring it.
///
/// All tree mutation goes through [`Library::apply`] or
/// [`Library::perform`]; readers get shared item handles.
pub struct Library {
    root: PathBuf,
    tree: Tree,
    synchronizer: Synchronizer,
}

impl Library {
    /// Open the library at `root`, expanding the folders listed in `expanded`.
    pub fn open(
        root: impl Into<PathBuf>,
        config: LibraryConfig,
        expanded: &HashSet<PathBuf>,
    ) -> Result<Self, LibraryError> {
        Self::open_with_builder(root, TreeBuilder::new(config), expanded, &CancellationToken::new())
    }

    /// Open with a prepared builder, stopping the initial build if `cancel` fires.
    pub fn open_with_builder(
        root: impl Into<PathBuf>,
        builder: TreeBuilder,
        expanded: &HashSet<PathBuf>,
        cancel: &CancellationToken,
    ) -> Result<Self, LibraryError> {
        let root = root.into();
        check_root(&root)?;

        let tree = builder.build_with_cancel(&root, &root, expanded, cancel)?;
        tracing::info!(
            root = %root.display(),
            nodes = tree.len(),
            warnings = tree.warnings().len(),
            "opened library"
        );

        Ok(Self {
            synchronizer: Synchronizer::new(builder, &root),
            root,
            tree,
        })
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Root item, shown with its full path.
    pub fn root_item(&self) -> &ItemRef {
        self.tree.root_item()
    }

    /// The live tree.
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Whether `path` lies inside this library.
    pub fn contains_path(&self, path: &Path) -> bool {
        path.starts_with(&self.root)
    }

    /// Apply one filesystem change to the tree.
    pub fn apply(&mut self, event: &SyncEvent) -> SyncOutcome {
        self.synchronizer.apply(&mut self.tree, event)
    }

    /// Run a file operation and, once it has succeeded, mirror it in the tree.
    ///
    /// A failed operation leaves the tree exactly as it was.
    pub fn perform(
        &mut self,
        ops: &dyn FileOps,
        operation: &FileOperation,
    ) -> Result<SyncOutcome, OpError> {
        let outcome = ops.execute(operation).inspect_err(|err| {
            tracing::warn!(%operation, error = %err, "file operation failed");
        })?;

        let outcome = match outcome {
            OpOutcome::Moved { from, to } => {
                let Some(destination) = to.parent() else {
                    return Ok(self.apply(&SyncEvent::delete(from)));
                };
                let moved = self.apply(&SyncEvent::move_to(&from, destination));
                match from.file_name() {
                    // Conflict resolution picked a different name.
                    Some(name) if to.file_name() != Some(name) && moved.is_applied() => {
                        self.apply(&SyncEvent::rename(destination.join(name), &to))
                    }
                    _ => moved,
                }
            }
            OpOutcome::Copied { from, to } => {
                // An overwritten destination is re-read from disk.
                self.apply(&SyncEvent::delete(&to));
                self.apply(&SyncEvent::paste(from, to))
            }
            OpOutcome::Renamed { from, to } => self.apply(&SyncEvent::rename(from, to)),
            OpOutcome::Deleted { path } => self.apply(&SyncEvent::delete(path)),
        };
        Ok(outcome)
    }

    /// Rebuild the whole tree from disk, keeping expand state.
    pub fn rebuild(&mut self, cancel: &CancellationToken) -> Result<(), LibraryError> {
        check_root(&self.root)?;
        let expanded: HashSet<PathBuf> = self.tree.expanded_paths().into_iter().collect();
        self.tree = self
            .synchronizer
            .builder()
            .build_with_cancel(&self.root, &self.root, &expanded, cancel)?;
        tracing::info!(root = %self.root.display(), nodes = self.tree.len(), "rebuilt library");
        Ok(())
    }

    /// Item at `path`, if tracked.
    pub fn find(&self, path: &Path) -> Option<&ItemRef> {
        self.tree.find(path).and_then(|id| self.tree.item(id))
    }

    /// Every song, in tree order.
    pub fn songs(&self) -> impl Iterator<Item = &ItemRef> + '_ {
        self.tree.songs()
    }

    /// Paths of expanded folders, for persistence.
    pub fn expanded_paths(&self) -> Vec<PathBuf> {
        self.tree.expanded_paths()
    }

    /// Expand or collapse the folder at `path`.
    pub fn set_expanded(&mut self, path: &Path, expanded: bool) -> bool {
        match self.tree.find(path) {
            Some(id) => self.tree.set_expanded(id, expanded),
            None => false,
        }
    }

    /// Search the whole library.
    pub fn search(&self, predicate: &dyn SearchPredicate, options: SearchOptions) -> SearchOutcome {
        self.search_from(self.tree.root(), predicate, options)
    }

    /// Search below one node.
    pub fn search_from(
        &self,
        from: NodeId,
        predicate: &dyn SearchPredicate,
        options: SearchOptions,
    ) -> SearchOutcome {
        Searcher::new(options).search(&self.tree, from, predicate)
    }

    /// Serializable copy of the tree.
    pub fn snapshot(&self) -> Option<TreeSnapshot> {
        self.tree.snapshot(self.tree.root())
    }
}

impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("root", &self.root)
            .field("nodes", &self.tree.len())
            .finish_non_exhaustive()
    }
}

fn check_root(root: &Path) -> Result<(), LibraryError> {
    match std::fs::metadata(root) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(LibraryError::NotADirectory {
            path: root.to_path_buf(),
        }),
        Err(_) => Err(LibraryError::NotFound {
            path: root.to_path_buf(),
        }),
    }
}
