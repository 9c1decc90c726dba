//! Arena-backed library tree.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::BuildWarning;
use crate::item::{Item, ItemCell, ItemRef};

/// Handle to a node within a [`Tree`].
///
/// Handles carry a generation so a handle to a removed node never
/// resolves to whatever node later reuses its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    /// Slot index of this handle.
    pub fn index(&self) -> usize {
        self.index as usize
    }
}

/// A node of the tree: one item plus its ordered children.
#[derive(Debug, Clone)]
pub struct TreeNode {
    item: ItemRef,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    expanded: bool,
    revision: u64,
}

impl TreeNode {
    /// The item held by this node.
    pub fn item(&self) -> &ItemRef {
        &self.item
    }

    /// Parent handle, `None` for the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in filesystem order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Whether the node is expanded in the UI.
    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    /// Bumped whenever the node's label must be redrawn.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    node: Option<TreeNode>,
}

/// A tree of library items.
///
/// Nodes live in an arena and refer to each other through [`NodeId`]
/// handles, so detaching or re-parenting a subtree only rewrites handles.
#[derive(Debug, Clone)]
pub struct Tree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeId,
    len: usize,
    warnings: Vec<BuildWarning>,
}

impl Tree {
    /// Create a tree holding a single root node.
    pub fn new(root: ItemRef, expanded: bool) -> Self {
        let mut tree = Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: NodeId {
                index: 0,
                generation: 0,
            },
            len: 0,
            warnings: Vec::new(),
        };
        tree.root = tree.alloc(TreeNode {
            item: root,
            parent: None,
            children: Vec::new(),
            expanded,
            revision: 0,
        });
        tree
    }

    /// Create a tree from a bare item.
    pub fn from_item(item: Item, expanded: bool) -> Self {
        Self::new(ItemCell::new(item), expanded)
    }

    fn alloc(&mut self, node: TreeNode) -> NodeId {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            NodeId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            NodeId {
                index,
                generation: 0,
            }
        }
    }

    fn release(&mut self, id: NodeId) -> Option<TreeNode> {
        let slot = self.slots.get_mut(id.index())?;
        if slot.generation != id.generation {
            return None;
        }
        let node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.len -= 1;
        Some(node)
    }

    /// Handle of the root node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Item of the root node.
    pub fn root_item(&self) -> &ItemRef {
        &self.node(self.root).item
    }

    // The root is never released, so this lookup cannot fail for it.
    fn node(&self, id: NodeId) -> &TreeNode {
        match self.get(id) {
            Some(node) => node,
            None => unreachable!("stale handle {id:?}"),
        }
    }

    /// Resolve a handle.
    pub fn get(&self, id: NodeId) -> Option<&TreeNode> {
        self.slots
            .get(id.index())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut TreeNode> {
        self.slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    /// Check whether a handle still refers to a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Item held by a node.
    pub fn item(&self, id: NodeId) -> Option<&ItemRef> {
        self.get(id).map(TreeNode::item)
    }

    /// Children of a node; empty for leaves and stale handles.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(TreeNode::children).unwrap_or(&[])
    }

    /// Parent of a node.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(TreeNode::parent)
    }

    /// Whether the node has any children.
    pub fn has_children(&self, id: NodeId) -> bool {
        !self.children(id).is_empty()
    }

    /// Current path of a node's item.
    pub fn path_of(&self, id: NodeId) -> Option<PathBuf> {
        self.item(id).map(|item| item.path())
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// A tree always has its root, so this is only true for a lone root.
    pub fn is_empty(&self) -> bool {
        self.len <= 1
    }

    /// Distance from the root.
    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut current = self.parent(id);
        while let Some(parent) = current {
            depth += 1;
            current = self.parent(parent);
        }
        depth
    }

    /// Check whether `ancestor` is `id` or lies above it.
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Whether the node at `id` is a folder, and so may hold children.
    pub fn is_folder(&self, id: NodeId) -> bool {
        self.item(id).is_some_and(|item| item.read().is_folder())
    }

    /// Append a new child under `parent`.
    ///
    /// Songs are always leaves: a song parent is refused.
    pub fn push_child(&mut self, parent: NodeId, item: ItemRef, expanded: bool) -> Option<NodeId> {
        if !self.is_folder(parent) {
            return None;
        }
        let id = self.alloc(TreeNode {
            item,
            parent: Some(parent),
            children: Vec::new(),
            expanded,
            revision: 0,
        });
        self.get_mut(parent)?.children.push(id);
        Some(id)
    }

    /// Graft another tree under `parent`, returning the handle of its root.
    ///
    /// Item handles move over unchanged; the other tree's warnings are kept.
    pub fn graft(&mut self, parent: NodeId, mut other: Tree) -> Option<NodeId> {
        if !self.is_folder(parent) {
            return None;
        }
        let other_root = other.root;
        let new_root = self.graft_node(parent, &mut other, other_root)?;
        self.warnings.append(&mut other.warnings);
        Some(new_root)
    }

    fn graft_node(&mut self, parent: NodeId, other: &mut Tree, id: NodeId) -> Option<NodeId> {
        let node = other.get_mut(id)?;
        let children = std::mem::take(&mut node.children);
        let item = node.item.clone();
        let expanded = node.expanded;

        let new_id = self.push_child(parent, item, expanded)?;
        for child in children {
            self.graft_node(new_id, other, child);
        }
        Some(new_id)
    }

    /// Remove a node and its whole subtree.
    ///
    /// Returns `false` for the root or a stale handle.
    pub fn detach(&mut self, id: NodeId) -> bool {
        if id == self.root {
            return false;
        }
        let Some(parent) = self.parent(id) else {
            return false;
        };
        if let Some(parent) = self.get_mut(parent) {
            parent.children.retain(|child| *child != id);
        }

        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.release(current) {
                stack.extend(node.children);
            }
        }
        true
    }

    /// Move a node under a new parent, keeping its handle and items.
    ///
    /// Refuses to move the root, to move a node beneath itself, or to move
    /// it under a song.
    pub fn reparent(&mut self, id: NodeId, new_parent: NodeId) -> bool {
        if id == self.root || !self.contains(id) || !self.is_folder(new_parent) {
            return false;
        }
        if self.is_ancestor_or_self(id, new_parent) {
            tracing::warn!(?id, ?new_parent, "refusing to move a node beneath itself");
            return false;
        }
        let Some(old_parent) = self.parent(id) else {
            return false;
        };
        if old_parent == new_parent {
            return true;
        }

        if let Some(old) = self.get_mut(old_parent) {
            old.children.retain(|child| *child != id);
        }
        if let Some(new) = self.get_mut(new_parent) {
            new.children.push(id);
        }
        if let Some(node) = self.get_mut(id) {
            node.parent = Some(new_parent);
        }
        true
    }

    /// Find the node whose item path equals `path`.
    pub fn find(&self, path: &Path) -> Option<NodeId> {
        self.find_from(self.root, path)
    }

    /// Depth-first pre-order search for `path` within the subtree at `start`.
    pub fn find_from(&self, start: NodeId, path: &Path) -> Option<NodeId> {
        self.descendants(start)
            .find(|id| self.item(*id).is_some_and(|item| item.has_path(path)))
    }

    /// Pre-order iterator over `start` and everything beneath it.
    pub fn descendants(&self, start: NodeId) -> Descendants<'_> {
        let stack = if self.contains(start) {
            vec![start]
        } else {
            Vec::new()
        };
        Descendants { tree: self, stack }
    }

    /// Every song item in pre-order.
    pub fn songs(&self) -> impl Iterator<Item = &ItemRef> + '_ {
        self.descendants(self.root)
            .filter_map(|id| self.item(id))
            .filter(|item| item.read().is_song())
    }

    /// Whether a node is expanded.
    pub fn is_expanded(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(TreeNode::is_expanded)
    }

    /// Set a node's expand flag.
    pub fn set_expanded(&mut self, id: NodeId, expanded: bool) -> bool {
        match self.get_mut(id) {
            Some(node) => {
                node.expanded = expanded;
                true
            }
            None => false,
        }
    }

    /// Flip a node's expand flag, returning the new state.
    pub fn toggle_expanded(&mut self, id: NodeId) -> Option<bool> {
        let node = self.get_mut(id)?;
        node.expanded = !node.expanded;
        Some(node.expanded)
    }

    /// Paths of every expanded node, for persistence.
    pub fn expanded_paths(&self) -> Vec<PathBuf> {
        self.descendants(self.root)
            .filter(|id| self.is_expanded(*id))
            .filter_map(|id| self.path_of(id))
            .collect()
    }

    /// Re-apply a set of expanded paths, collapsing everything else.
    pub fn restore_expanded(&mut self, expanded: &HashSet<PathBuf>) {
        let ids: Vec<NodeId> = self.descendants(self.root).collect();
        for id in ids {
            let open = self.path_of(id).is_some_and(|p| expanded.contains(&p));
            self.set_expanded(id, open);
        }
    }

    /// Mark a node's label as changed.
    pub fn touch(&mut self, id: NodeId) {
        if let Some(node) = self.get_mut(id) {
            node.revision = node.revision.wrapping_add(1);
        }
    }

    /// Non-fatal problems recorded while building this tree.
    pub fn warnings(&self) -> &[BuildWarning] {
        &self.warnings
    }

    /// Record a non-fatal problem.
    pub fn push_warning(&mut self, warning: BuildWarning) {
        self.warnings.push(warning);
    }

    /// Owned, serializable copy of the subtree at `id`.
    pub fn snapshot(&self, id: NodeId) -> Option<TreeSnapshot> {
        let node = self.get(id)?;
        let item = node.item.read();
        let kind = match &*item {
            Item::Song(_) => SnapshotKind::Song,
            Item::Folder(_) => SnapshotKind::Folder,
        };
        let meta = item.as_song().map(|song| song.meta.clone());
        let label = item.label().into_owned();
        let path = item.path().to_path_buf();
        drop(item);

        Some(TreeSnapshot {
            label,
            path,
            kind,
            expanded: node.expanded,
            meta,
            children: node
                .children
                .iter()
                .filter_map(|child| self.snapshot(*child))
                .collect(),
        })
    }
}

/// Pre-order walk over a subtree.
pub struct Descendants<'a> {
    tree: &'a Tree,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.tree.children(id).iter().rev().copied());
        Some(id)
    }
}

/// Kind of a snapshot node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotKind {
    Song,
    Folder,
}

/// Serializable copy of a subtree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeSnapshot {
    /// Display label.
    pub label: String,
    /// Absolute path.
    pub path: PathBuf,
    /// Song or folder.
    pub kind: SnapshotKind,
    /// Expand flag.
    pub expanded: bool,
    /// Song metadata, songs only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<crate::item::SongMeta>,
    /// Child snapshots.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeSnapshot>,
}

impl TreeSnapshot {
    /// Total number of nodes in this snapshot.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(TreeSnapshot::count).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::SongMeta;

    fn folder(path: &str) -> ItemRef {
        ItemCell::new(Item::folder(path, false))
    }

    fn song(path: &str) -> ItemRef {
        ItemCell::new(Item::song(path, SongMeta::default()))
    }

    fn sample() -> (Tree, NodeId, NodeId) {
        let mut tree = Tree::from_item(Item::folder("/music", true), true);
        let root = tree.root();
        let a = tree.push_child(root, folder("/music/A"), false).unwrap();
        tree.push_child(a, song("/music/A/1.mp3"), false).unwrap();
        let b = tree.push_child(root, folder("/music/B"), false).unwrap();
        tree.push_child(b, song("/music/B/2.mp3"), false).unwrap();
        (tree, a, b)
    }

    #[test]
    fn test_find_pre_order() {
        let (tree, a, _) = sample();
        assert_eq!(tree.find(Path::new("/music/A")), Some(a));
        assert!(tree.find(Path::new("/music/B/2.mp3")).is_some());
        assert!(tree.find(Path::new("/elsewhere")).is_none());
    }

    #[test]
    fn test_find_from_excludes_outside_subtree() {
        let (tree, a, _) = sample();
        assert!(tree.find_from(a, Path::new("/music")).is_none());
        assert!(tree.find_from(a, Path::new("/music/B/2.mp3")).is_none());
        assert!(tree.find_from(a, Path::new("/music/A/1.mp3")).is_some());

        // Leaves have no children to search.
        let leaf = tree.find(Path::new("/music/A/1.mp3")).unwrap();
        assert!(tree.find_from(leaf, Path::new("/music/A")).is_none());
    }

    #[test]
    fn test_detach_frees_subtree_and_invalidates_handles() {
        let (mut tree, a, _) = sample();
        let song = tree.find(Path::new("/music/A/1.mp3")).unwrap();
        assert_eq!(tree.len(), 5);

        assert!(tree.detach(a));
        assert_eq!(tree.len(), 3);
        assert!(!tree.contains(a));
        assert!(!tree.contains(song));
        assert!(tree.find(Path::new("/music/A/1.mp3")).is_none());

        // A new node reusing the slot does not revive the old handle.
        let root = tree.root();
        let c = tree.push_child(root, folder("/music/C"), false).unwrap();
        assert_ne!(c, a);
        assert!(tree.get(a).is_none());
    }

    #[test]
    fn test_root_cannot_be_detached() {
        let (mut tree, _, _) = sample();
        let root = tree.root();
        assert!(!tree.detach(root));
        assert_eq!(tree.len(), 5);
    }

    #[test]
    fn test_reparent_keeps_handle_and_item() {
        let (mut tree, a, b) = sample();
        let item = tree.item(a).cloned().unwrap();

        assert!(tree.reparent(a, b));
        assert_eq!(tree.parent(a), Some(b));
        assert!(std::sync::Arc::ptr_eq(tree.item(a).unwrap(), &item));
        assert_eq!(tree.children(tree.root()).len(), 1);
    }

    #[test]
    fn test_reparent_refuses_cycles() {
        let (mut tree, a, _) = sample();
        let song = tree.find(Path::new("/music/A/1.mp3")).unwrap();
        assert!(!tree.reparent(a, a));
        assert!(!tree.reparent(a, song));
        assert_eq!(tree.parent(a), Some(tree.root()));
    }

    #[test]
    fn test_songs_never_get_children() {
        let (mut tree, a, b) = sample();
        let song_b = tree.find(Path::new("/music/B/2.mp3")).unwrap();

        assert!(!tree.is_folder(song_b));
        assert!(tree.is_folder(b));
        assert!(tree.push_child(song_b, song("/music/B/2.mp3/x.mp3"), false).is_none());
        assert!(!tree.reparent(a, song_b));
        assert!(tree.graft(song_b, Tree::new(folder("/music/B/2.mp3/C"), false)).is_none());

        assert!(!tree.has_children(song_b));
        assert_eq!(tree.parent(a), Some(tree.root()));
    }

    #[test]
    fn test_graft_moves_items_over() {
        let (mut tree, _, b) = sample();
        let mut other = Tree::new(folder("/music/B/Live"), false);
        let other_root = other.root();
        let live_song = song("/music/B/Live/3.mp3");
        other.push_child(other_root, live_song.clone(), false);

        let grafted = tree.graft(b, other).unwrap();
        assert_eq!(tree.parent(grafted), Some(b));
        let found = tree.find(Path::new("/music/B/Live/3.mp3")).unwrap();
        assert!(std::sync::Arc::ptr_eq(tree.item(found).unwrap(), &live_song));
    }

    #[test]
    fn test_expanded_paths_round_trip() {
        let (mut tree, a, _) = sample();
        tree.set_expanded(a, true);
        let expanded: HashSet<PathBuf> = tree.expanded_paths().into_iter().collect();
        assert!(expanded.contains(Path::new("/music")));
        assert!(expanded.contains(Path::new("/music/A")));
        assert!(!expanded.contains(Path::new("/music/B")));

        tree.set_expanded(a, false);
        tree.restore_expanded(&expanded);
        assert!(tree.is_expanded(a));
    }

    #[test]
    fn test_songs_and_depth() {
        let (tree, a, _) = sample();
        let songs: Vec<PathBuf> = tree.songs().map(|s| s.path()).collect();
        assert_eq!(
            songs,
            vec![
                PathBuf::from("/music/A/1.mp3"),
                PathBuf::from("/music/B/2.mp3")
            ]
        );
        assert_eq!(tree.depth(tree.root()), 0);
        assert_eq!(tree.depth(a), 1);
    }

    #[test]
    fn test_snapshot_counts_nodes() {
        let (tree, _, _) = sample();
        let snapshot = tree.snapshot(tree.root()).unwrap();
        assert_eq!(snapshot.count(), 5);
        assert_eq!(snapshot.label, "/music");
        assert_eq!(snapshot.children[0].label, "A");
    }
}
