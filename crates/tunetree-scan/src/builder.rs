//! JWalk-based library tree builder.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use jwalk::{Parallelism, WalkDir};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use tunetree_core::{
    BuildError, BuildWarning, Item, ItemCell, LibraryConfig, NodeId, SongMeta, Tree, WarningKind,
};

use crate::metadata::{LoftyReader, MetadataReader};
use crate::progress::BuildProgress;

/// Builds library trees by walking the filesystem.
pub struct TreeBuilder {
    config: LibraryConfig,
    reader: Arc<dyn MetadataReader>,
    progress_tx: broadcast::Sender<BuildProgress>,
}

impl TreeBuilder {
    /// Create a builder that reads tags with lofty.
    pub fn new(config: LibraryConfig) -> Self {
        Self::with_reader(config, Arc::new(LoftyReader))
    }

    /// Create a builder with a custom metadata reader.
    pub fn with_reader(config: LibraryConfig, reader: Arc<dyn MetadataReader>) -> Self {
        let (progress_tx, _) = broadcast::channel(100);
        Self {
            config,
            reader,
            progress_tx,
        }
    }

    /// Subscribe to build progress updates.
    pub fn subscribe(&self) -> broadcast::Receiver<BuildProgress> {
        self.progress_tx.subscribe()
    }

    /// Configuration used by this builder.
    pub fn config(&self) -> &LibraryConfig {
        &self.config
    }

    /// Build the tree rooted at `path`.
    ///
    /// `library_root` decides which folder is flagged as root; nodes whose
    /// path is in `expanded` start out expanded.
    pub fn build(
        &self,
        path: &Path,
        library_root: &Path,
        expanded: &HashSet<PathBuf>,
    ) -> Result<Tree, BuildError> {
        self.build_with_cancel(path, library_root, expanded, &CancellationToken::new())
    }

    /// Build the tree rooted at `path`, stopping early once `cancel` fires.
    ///
    /// A cancelled build returns whatever was collected so far; every node in
    /// it is complete.
    pub fn build_with_cancel(
        &self,
        path: &Path,
        library_root: &Path,
        expanded: &HashSet<PathBuf>,
        cancel: &CancellationToken,
    ) -> Result<Tree, BuildError> {
        let start = Instant::now();
        let metadata = std::fs::metadata(path).map_err(|e| BuildError::io(path, e))?;

        if !metadata.is_dir() {
            if !self.config.accepts(path) {
                return Err(BuildError::NotAccepted {
                    path: path.to_path_buf(),
                });
            }
            let (meta, warning) = self.read_song(path);
            let mut tree = Tree::from_item(Item::song(path, meta), expanded.contains(path));
            if let Some(warning) = warning {
                tree.push_warning(warning);
            }
            return Ok(tree);
        }

        let mut warnings = Vec::new();
        let mut entries = self.collect_entries(path, start, cancel, &mut warnings);

        let root_item = Item::folder(path, path == library_root);
        let mut tree = Tree::from_item(root_item, expanded.contains(path));
        let root = tree.root();
        let context = BuildContext {
            library_root,
            expanded,
        };
        populate(&mut tree, root, path, &mut entries, &context);

        for warning in warnings {
            tree.push_warning(warning);
        }

        tracing::debug!(
            path = %path.display(),
            nodes = tree.len(),
            warnings = tree.warnings().len(),
            cancelled = cancel.is_cancelled(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "built library tree"
        );

        Ok(tree)
    }

    /// Read a song's tags, degrading to empty metadata on failure.
    pub fn read_song(&self, path: &Path) -> (SongMeta, Option<BuildWarning>) {
        if !self.config.read_metadata {
            return (SongMeta::default(), None);
        }
        match self.reader.read(path) {
            Ok(meta) => (meta, None),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "could not read tags");
                (SongMeta::default(), Some(BuildWarning::metadata(path, err.to_string())))
            }
        }
    }

    /// Collect accepted entries using jwalk, grouped by parent directory.
    fn collect_entries(
        &self,
        root_path: &Path,
        start: Instant,
        cancel: &CancellationToken,
        warnings: &mut Vec<BuildWarning>,
    ) -> HashMap<PathBuf, Vec<EntryInfo>> {
        let walker = WalkDir::new(root_path)
            .parallelism(Parallelism::RayonDefaultPool {
                busy_timeout: std::time::Duration::from_millis(100),
            })
            .skip_hidden(!self.config.include_hidden)
            .follow_links(self.config.follow_symlinks)
            .sort(self.config.sort_children)
            .min_depth(0);

        let mut entries_by_parent: HashMap<PathBuf, Vec<EntryInfo>> = HashMap::new();
        let mut progress = BuildProgress::new();

        for entry_result in walker {
            if cancel.is_cancelled() {
                tracing::debug!(path = %root_path.display(), "build cancelled");
                break;
            }

            let entry = match entry_result {
                Ok(e) => e,
                Err(err) => {
                    let path = err.path().map(Path::to_path_buf).unwrap_or_default();
                    let warning = match err.io_error() {
                        Some(io) => BuildWarning::read_error(path, io),
                        None => BuildWarning::new(path, err.to_string(), WarningKind::ReadError),
                    };
                    warnings.push(warning);
                    continue;
                }
            };

            if entry.depth() == 0 {
                continue;
            }

            let path = entry.path();
            let file_type = entry.file_type();
            let is_dir = file_type.is_dir() || (file_type.is_symlink() && path.is_dir());

            let kind = if is_dir {
                progress.folders_visited += 1;
                EntryKind::Folder
            } else if self.config.accepts(&path) {
                let (meta, warning) = self.read_song(&path);
                warnings.extend(warning);
                progress.songs_found += 1;
                EntryKind::Song(meta)
            } else {
                continue;
            };

            progress.current_path = path.clone();
            progress.warnings_count = warnings.len() as u64;
            progress.elapsed = start.elapsed();
            // Nobody listening is fine.
            let _ = self.progress_tx.send(progress.clone());

            if let Some(parent) = path.parent() {
                entries_by_parent
                    .entry(parent.to_path_buf())
                    .or_default()
                    .push(EntryInfo { path, kind });
            }
        }

        entries_by_parent
    }
}

struct BuildContext<'a> {
    library_root: &'a Path,
    expanded: &'a HashSet<PathBuf>,
}

/// Temporary struct for collecting entry information.
struct EntryInfo {
    path: PathBuf,
    kind: EntryKind,
}

enum EntryKind {
    Folder,
    Song(SongMeta),
}

/// Recursively attach the collected children of `dir` under `parent`.
fn populate(
    tree: &mut Tree,
    parent: NodeId,
    dir: &Path,
    entries_by_parent: &mut HashMap<PathBuf, Vec<EntryInfo>>,
    context: &BuildContext<'_>,
) {
    let children = entries_by_parent.remove(dir).unwrap_or_default();

    for entry in children {
        let expanded = context.expanded.contains(&entry.path);
        match entry.kind {
            EntryKind::Folder => {
                let is_root = entry.path == context.library_root;
                let item = ItemCell::new(Item::folder(&entry.path, is_root));
                if let Some(id) = tree.push_child(parent, item, expanded) {
                    populate(tree, id, &entry.path, entries_by_parent, context);
                }
            }
            EntryKind::Song(meta) => {
                let item = ItemCell::new(Item::song(entry.path, meta));
                tree.push_child(parent, item, expanded);
            }
        }
    }
}
