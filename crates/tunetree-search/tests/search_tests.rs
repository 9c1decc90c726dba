use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use tunetree_core::{Item, LibraryConfig, Tree};
use tunetree_scan::{NoMetadata, TreeBuilder};
use tunetree_search::{GlobQuery, NameQuery, SearchOptions, SearchPredicate, Searcher, search};

fn build_library() -> (tempfile::TempDir, Tree) {
    let temp = tempfile::Builder::new().prefix("library").tempdir().unwrap();
    let root = temp.path();

    fs::create_dir_all(root.join("Rock/Live")).unwrap();
    fs::create_dir_all(root.join("Jazz")).unwrap();
    fs::write(root.join("Rock/anthem.mp3"), "").unwrap();
    fs::write(root.join("Rock/Live/anthem (live).flac"), "").unwrap();
    fs::write(root.join("Jazz/so what.ogg"), "").unwrap();
    fs::write(root.join("Jazz/notes.txt"), "").unwrap();

    let builder = TreeBuilder::with_reader(LibraryConfig::default(), Arc::new(NoMetadata));
    let tree = builder.build(root, root, &HashSet::new()).unwrap();
    (temp, tree)
}

/// Every leaf in the result is a hit, or a file shown because its folder hit.
fn assert_subset(tree: &Tree, predicate: &dyn SearchPredicate, options: SearchOptions) {
    let Some(result) = search(tree, predicate, options).into_tree() else {
        return;
    };
    for id in result.descendants(result.root()) {
        if result.has_children(id) || id == result.root() {
            continue;
        }
        let item = result.item(id).unwrap().read();
        let parent_hit = result
            .parent(id)
            .and_then(|p| result.item(p))
            .is_some_and(|p| predicate.is_hit(&p.read()));
        assert!(
            predicate.is_hit(&item) || (options.show_files_in_folder_hits && parent_hit),
            "unexpected leaf {}",
            item.path().display()
        );
    }
}

#[test]
fn test_search_built_library() {
    let (temp, tree) = build_library();
    let result = search(&tree, &NameQuery::new("anthem"), SearchOptions::default())
        .into_tree()
        .unwrap();

    let root = temp.path();
    assert!(result.find(&root.join("Rock/anthem.mp3")).is_some());
    assert!(result.find(&root.join("Rock/Live/anthem (live).flac")).is_some());
    assert!(result.find(&root.join("Jazz")).is_none());
    assert_eq!(result.root_item().path(), root);
}

#[test]
fn test_rejected_files_never_show_up() {
    let (_temp, tree) = build_library();
    let outcome = search(&tree, &NameQuery::new("notes"), SearchOptions::default());
    assert!(outcome.is_empty());
}

#[test]
fn test_subset_property() {
    let (_temp, tree) = build_library();
    let glob = GlobQuery::new("*.flac").unwrap();
    let predicates: Vec<Box<dyn SearchPredicate>> = vec![
        Box::new(NameQuery::new("a")),
        Box::new(NameQuery::new("live")),
        Box::new(NameQuery::new("nothing at all")),
        Box::new(glob),
        Box::new(|item: &Item| item.is_folder()),
    ];

    for predicate in &predicates {
        for show in [false, true] {
            let options = SearchOptions {
                show_files_in_folder_hits: show,
            };
            assert_subset(&tree, predicate.as_ref(), options);
        }
    }
}

#[test]
fn test_empty_result_for_any_tree() {
    let lone = Tree::from_item(Item::folder("/music", true), true);
    let outcome = Searcher::default().search(&lone, lone.root(), &NameQuery::new("music"));
    assert!(outcome.is_empty());

    let (_temp, tree) = build_library();
    let never = |_: &Item| false;
    assert!(search(&tree, &never, SearchOptions::default()).is_empty());
    assert!(tree.find(Path::new("/definitely/not/here")).is_none());
}
