//! Incremental projection of filesystem changes onto a library tree.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tunetree_core::{BuildError, NodeId, Tree};
use tunetree_scan::TreeBuilder;

use crate::action::{IgnoreReason, SyncEvent, SyncOutcome};

/// Applies [`SyncEvent`]s to a live tree without rebuilding it.
///
/// Each event is applied on its own. Events whose target is missing, or
/// already in the wanted state, are ignored rather than treated as errors,
/// so replaying a duplicate watcher event is harmless.
pub struct Synchronizer {
    builder: TreeBuilder,
    library_root: PathBuf,
}

impl Synchronizer {
    /// Create a synchronizer for the library at `library_root`.
    pub fn new(builder: TreeBuilder, library_root: impl Into<PathBuf>) -> Self {
        Self {
            builder,
            library_root: library_root.into(),
        }
    }

    /// The builder used for new subtrees.
    pub fn builder(&self) -> &TreeBuilder {
        &self.builder
    }

    /// Root of the library this synchronizer serves.
    pub fn library_root(&self) -> &Path {
        &self.library_root
    }

    /// Apply one event.
    pub fn apply(&self, tree: &mut Tree, event: &SyncEvent) -> SyncOutcome {
        let outcome = match event {
            SyncEvent::Add { path } => self.add(tree, path),
            SyncEvent::Delete { path } => delete(tree, path),
            SyncEvent::Move {
                source,
                destination,
            } => relocate(tree, source, destination),
            SyncEvent::Rename { from, to } => rename(tree, from, to),
            SyncEvent::Paste { destination, .. } => self.add(tree, destination),
        };

        match outcome {
            SyncOutcome::Applied => tracing::debug!(%event, "applied"),
            SyncOutcome::Ignored(reason) => tracing::debug!(%event, %reason, "ignored"),
        }
        outcome
    }

    fn add(&self, tree: &mut Tree, path: &Path) -> SyncOutcome {
        if tree.find(path).is_some() {
            return SyncOutcome::Ignored(IgnoreReason::AlreadyPresent);
        }
        let Some(parent) = path.parent().and_then(|p| tree.find(p)) else {
            return SyncOutcome::Ignored(IgnoreReason::ParentNotFound);
        };
        let hidden = path
            .file_name()
            .is_some_and(|name| self.builder.config().should_skip_hidden(&name.to_string_lossy()));
        if hidden {
            return SyncOutcome::Ignored(IgnoreReason::NotAccepted);
        }

        let subtree = match self.builder.build(path, &self.library_root, &HashSet::new()) {
            Ok(subtree) => subtree,
            Err(BuildError::NotAccepted { .. }) => {
                return SyncOutcome::Ignored(IgnoreReason::NotAccepted);
            }
            Err(err) => {
                if !matches!(err, BuildError::NotFound { .. }) {
                    tracing::warn!(path = %path.display(), error = %err, "could not build added entry");
                }
                return SyncOutcome::Ignored(IgnoreReason::MissingOnDisk);
            }
        };

        if tree.graft(parent, subtree).is_none() {
            return SyncOutcome::Ignored(IgnoreReason::ParentNotFound);
        }
        tree.set_expanded(parent, true);
        SyncOutcome::Applied
    }
}

fn delete(tree: &mut Tree, path: &Path) -> SyncOutcome {
    let Some(id) = tree.find(path) else {
        return SyncOutcome::Ignored(IgnoreReason::NotFound);
    };
    if tree.detach(id) {
        SyncOutcome::Applied
    } else {
        SyncOutcome::Ignored(IgnoreReason::IsRoot)
    }
}

/// Move the node at `source` under the folder at `destination`.
///
/// The moved node keeps its item handles; only their paths change.
fn relocate(tree: &mut Tree, source: &Path, destination: &Path) -> SyncOutcome {
    let Some(id) = tree.find(source) else {
        return SyncOutcome::Ignored(IgnoreReason::NotFound);
    };
    if id == tree.root() {
        return SyncOutcome::Ignored(IgnoreReason::IsRoot);
    }
    if destination.starts_with(source) {
        return SyncOutcome::Ignored(IgnoreReason::DestinationInsideSource);
    }

    let Some(target) = tree.find(destination) else {
        // The destination is outside this tree; from here the source is simply gone.
        tracing::debug!(
            source = %source.display(),
            destination = %destination.display(),
            "move destination not tracked, dropping source"
        );
        tree.detach(id);
        return SyncOutcome::Applied;
    };
    if !tree.is_folder(target) {
        return SyncOutcome::Ignored(IgnoreReason::DestinationNotFolder);
    }
    if tree.is_ancestor_or_self(id, target) {
        return SyncOutcome::Ignored(IgnoreReason::DestinationInsideSource);
    }

    let Some(name) = source.file_name() else {
        return SyncOutcome::Ignored(IgnoreReason::NotFound);
    };
    let new_path = destination.join(name);
    if new_path == source {
        return SyncOutcome::Ignored(IgnoreReason::AlreadyPresent);
    }
    if source.starts_with(&new_path) {
        return SyncOutcome::Ignored(IgnoreReason::ReplacesSourceAncestor);
    }
    if let Some(stale) = tree.find(&new_path) {
        tree.detach(stale);
    }

    if !tree.reparent(id, target) {
        return SyncOutcome::Ignored(IgnoreReason::DestinationInsideSource);
    }
    rewrite_paths(tree, id, source, &new_path);
    SyncOutcome::Applied
}

fn rename(tree: &mut Tree, from: &Path, to: &Path) -> SyncOutcome {
    let Some(id) = tree.find(from) else {
        return SyncOutcome::Ignored(IgnoreReason::NotFound);
    };
    if id == tree.root() {
        return SyncOutcome::Ignored(IgnoreReason::IsRoot);
    }
    if from == to {
        return SyncOutcome::Ignored(IgnoreReason::AlreadyPresent);
    }
    // A rename stays in its folder; this also keeps `to` off the renamed
    // node's own ancestors.
    if to.parent() != from.parent() {
        return SyncOutcome::Ignored(IgnoreReason::ParentChanged);
    }
    if let Some(stale) = tree.find(to) {
        tree.detach(stale);
    }

    rewrite_paths(tree, id, from, to);
    SyncOutcome::Applied
}

/// Point the subtree at `id` from `from` to `to`, in place.
///
/// Descendant paths are rewritten by prefix substitution. A descendant
/// outside `from` breaks that law; it is logged and rebuilt from its file
/// name under its parent's new path.
fn rewrite_paths(tree: &mut Tree, id: NodeId, from: &Path, to: &Path) {
    let mut stack = vec![(id, to.to_path_buf())];

    while let Some((node, new_path)) = stack.pop() {
        for &child in tree.children(node) {
            let Some(item) = tree.item(child) else {
                continue;
            };
            let old = item.path();
            let next = match old.strip_prefix(from) {
                Ok(suffix) => to.join(suffix),
                Err(_) => {
                    tracing::warn!(
                        path = %old.display(),
                        prefix = %from.display(),
                        "descendant outside renamed folder"
                    );
                    new_path.join(old.file_name().unwrap_or_default())
                }
            };
            stack.push((child, next));
        }

        if let Some(item) = tree.item(node) {
            item.change_path(new_path);
        }
    }

    tree.touch(id);
}
