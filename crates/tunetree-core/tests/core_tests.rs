use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tunetree_core::{
    BuildError, Item, ItemCell, LibraryConfig, SnapshotKind, SongMeta, Tree, TreeSnapshot,
};

fn library() -> Tree {
    let mut tree = Tree::from_item(Item::folder("/music", true), true);
    let root = tree.root();
    for (folder, song) in [("A", "1.mp3"), ("B", "2.mp3")] {
        let path = Path::new("/music").join(folder);
        let id = tree
            .push_child(root, ItemCell::new(Item::folder(&path, false)), false)
            .unwrap();
        tree.push_child(
            id,
            ItemCell::new(Item::song(path.join(song), SongMeta::default())),
            false,
        );
    }
    tree
}

#[test]
fn test_locator_finds_nested_paths() {
    let tree = library();
    let a = tree.find(Path::new("/music/A")).unwrap();

    assert!(tree.find(Path::new("/music/A/1.mp3")).is_some());
    assert!(tree.find_from(a, Path::new("/music/A/1.mp3")).is_some());
    // Outside the subtree, including its own ancestor.
    assert!(tree.find_from(a, Path::new("/music/B/2.mp3")).is_none());
    assert!(tree.find_from(a, Path::new("/music")).is_none());
}

#[test]
fn test_locator_on_a_leaf() {
    let tree = library();
    let song = tree.find(Path::new("/music/A/1.mp3")).unwrap();

    assert_eq!(tree.find_from(song, Path::new("/music/A/1.mp3")), Some(song));
    assert!(tree.find_from(song, Path::new("/music/A")).is_none());
}

#[test]
fn test_songs_and_depth() {
    let tree = library();
    let songs: Vec<PathBuf> = tree.songs().map(|s| s.path()).collect();
    assert_eq!(
        songs,
        vec![PathBuf::from("/music/A/1.mp3"), PathBuf::from("/music/B/2.mp3")]
    );

    let song = tree.find(Path::new("/music/B/2.mp3")).unwrap();
    assert_eq!(tree.depth(song), 2);
}

#[test]
fn test_detach_frees_handles() {
    let mut tree = library();
    let a = tree.find(Path::new("/music/A")).unwrap();
    let song = tree.find(Path::new("/music/A/1.mp3")).unwrap();

    assert!(tree.detach(a));
    assert!(!tree.contains(a));
    assert!(!tree.contains(song));
    assert_eq!(tree.len(), 3);
}

#[test]
fn test_shared_items_survive_reparent() {
    let mut tree = library();
    let song = tree.find(Path::new("/music/A/1.mp3")).unwrap();
    let b = tree.find(Path::new("/music/B")).unwrap();
    let handle = Arc::clone(tree.item(song).unwrap());

    assert!(tree.reparent(song, b));
    handle.change_path(PathBuf::from("/music/B/1.mp3"));

    assert_eq!(tree.find(Path::new("/music/B/1.mp3")), Some(song));
    assert_eq!(tree.children(b).len(), 2);
}

#[test]
fn test_expanded_paths_round_trip() {
    let mut tree = library();
    let b = tree.find(Path::new("/music/B")).unwrap();
    tree.toggle_expanded(b);

    let saved: HashSet<PathBuf> = tree.expanded_paths().into_iter().collect();
    assert_eq!(
        saved,
        [PathBuf::from("/music"), PathBuf::from("/music/B")]
            .into_iter()
            .collect()
    );

    let mut fresh = library();
    fresh.restore_expanded(&saved);
    assert_eq!(fresh.expanded_paths(), tree.expanded_paths());
}

#[test]
fn test_snapshot_serializes_to_json() {
    let tree = library();
    let snapshot = tree.snapshot(tree.root()).unwrap();
    assert_eq!(snapshot.count(), 5);
    assert_eq!(snapshot.label, "/music");

    let json = serde_json::to_string(&snapshot).unwrap();
    let back: TreeSnapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(back.children.len(), 2);
    assert_eq!(back.children[0].kind, SnapshotKind::Folder);
    assert_eq!(back.children[0].children[0].kind, SnapshotKind::Song);
}

#[test]
fn test_config_builder_validates_extensions() {
    let config = LibraryConfig::builder()
        .extensions(vec!["mp3".to_string()])
        .build()
        .unwrap();
    assert!(config.accepts(Path::new("/music/a.MP3")));
    assert!(!config.accepts(Path::new("/music/a.flac")));

    assert!(LibraryConfig::builder().extensions(Vec::<String>::new()).build().is_err());
}

#[test]
fn test_build_error_classifies_io() {
    let err = BuildError::io(
        "/music/missing",
        std::io::Error::from(std::io::ErrorKind::NotFound),
    );
    assert!(matches!(err, BuildError::NotFound { .. }));
}
