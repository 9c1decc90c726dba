//! Filtered search producing pruned copies of a tree.

use serde::{Deserialize, Serialize};

use tunetree_core::{Item, ItemCell, ItemRef, NodeId, Tree};

use crate::predicate::SearchPredicate;

/// Options controlling result composition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    /// Also show the files sitting directly in a matching folder.
    pub show_files_in_folder_hits: bool,
}

/// Result of a search.
#[derive(Debug)]
pub enum SearchOutcome {
    /// Nothing matched.
    Empty,
    /// Matching items and their ancestors, every node expanded.
    Found(Tree),
}

impl SearchOutcome {
    /// Check whether nothing matched.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Borrow the result tree, if any.
    pub fn tree(&self) -> Option<&Tree> {
        match self {
            Self::Empty => None,
            Self::Found(tree) => Some(tree),
        }
    }

    /// Take the result tree, if any.
    pub fn into_tree(self) -> Option<Tree> {
        match self {
            Self::Empty => None,
            Self::Found(tree) => Some(tree),
        }
    }
}

/// Matching node collected during the walk, attached afterwards.
struct Hit {
    item: ItemRef,
    children: Vec<Hit>,
}

/// Runs predicates over library trees.
///
/// The source tree is only read. Result nodes are new, but they share the
/// source's item handles, so later renames show up in old results too.
#[derive(Debug, Clone, Copy, Default)]
pub struct Searcher {
    options: SearchOptions,
}

impl Searcher {
    /// Create a searcher.
    pub fn new(options: SearchOptions) -> Self {
        Self { options }
    }

    /// Options in effect.
    pub fn options(&self) -> SearchOptions {
        self.options
    }

    /// Search everything below `from`.
    ///
    /// The result is rooted at a root-flagged copy of `from` so that it
    /// displays with its full path.
    pub fn search(&self, tree: &Tree, from: NodeId, predicate: &dyn SearchPredicate) -> SearchOutcome {
        let Some(from_item) = tree.item(from) else {
            return SearchOutcome::Empty;
        };
        let from_hit = predicate.is_hit(&from_item.read());

        let Some(hits) = self.search_children(tree, from, from_hit, predicate) else {
            tracing::debug!(from = %from_item.path().display(), "search found nothing");
            return SearchOutcome::Empty;
        };

        let root_item = if from_item.read().is_root() {
            from_item.clone()
        } else {
            ItemCell::new(Item::folder(from_item.path(), true))
        };
        let mut result = Tree::new(root_item, true);
        let root = result.root();
        attach(&mut result, root, hits);

        tracing::debug!(
            from = %from_item.path().display(),
            nodes = result.len(),
            "search complete"
        );
        SearchOutcome::Found(result)
    }

    /// Collect hits among the children of `node`, or `None` if there are none.
    fn search_children(
        &self,
        tree: &Tree,
        node: NodeId,
        node_hit: bool,
        predicate: &dyn SearchPredicate,
    ) -> Option<Vec<Hit>> {
        let mut hits = Vec::new();

        for &child in tree.children(node) {
            let Some(item) = tree.item(child) else {
                continue;
            };
            let child_hit = predicate.is_hit(&item.read());
            let has_children = tree.has_children(child);

            if child_hit {
                let children = if has_children {
                    self.search_children(tree, child, true, predicate)
                        .unwrap_or_default()
                } else {
                    Vec::new()
                };
                hits.push(Hit {
                    item: item.clone(),
                    children,
                });
            } else if has_children {
                if let Some(children) = self.search_children(tree, child, false, predicate) {
                    hits.push(Hit {
                        item: item.clone(),
                        children,
                    });
                }
            } else if self.options.show_files_in_folder_hits && node_hit {
                hits.push(Hit {
                    item: item.clone(),
                    children: Vec::new(),
                });
            }
        }

        (!hits.is_empty()).then_some(hits)
    }
}

fn attach(tree: &mut Tree, parent: NodeId, hits: Vec<Hit>) {
    for hit in hits {
        if let Some(id) = tree.push_child(parent, hit.item, true) {
            attach(tree, id, hit.children);
        }
    }
}

/// Search a whole tree from its root.
pub fn search(tree: &Tree, predicate: &dyn SearchPredicate, options: SearchOptions) -> SearchOutcome {
    Searcher::new(options).search(tree, tree.root(), predicate)
}
