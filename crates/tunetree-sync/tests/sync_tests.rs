use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use tunetree_core::LibraryConfig;
use tunetree_ops::{FileOperation, LocalFileOps, OpError};
use tunetree_scan::{NoMetadata, TreeBuilder};
use tunetree_search::{NameQuery, SearchOptions};
use tunetree_sync::{
    IgnoreReason, Library, LibraryError, LibraryHandle, LibrarySet, SyncEvent, SyncOutcome,
    WatchEvent, WatchKind,
};

fn builder() -> TreeBuilder {
    TreeBuilder::with_reader(LibraryConfig::default(), Arc::new(NoMetadata))
}

/// `music/A/1.mp3` and `music/B/2.mp3`.
fn music() -> TempDir {
    let temp = tempfile::Builder::new().prefix("music").tempdir().unwrap();
    let root = temp.path();
    fs::create_dir(root.join("A")).unwrap();
    fs::create_dir(root.join("B")).unwrap();
    fs::write(root.join("A/1.mp3"), "").unwrap();
    fs::write(root.join("B/2.mp3"), "").unwrap();
    temp
}

fn open(root: &Path) -> Library {
    Library::open_with_builder(root, builder(), &HashSet::new(), &CancellationToken::new()).unwrap()
}

fn top_level(library: &Library) -> Vec<(String, usize)> {
    let tree = library.tree();
    let mut folders: Vec<(String, usize)> = tree
        .children(tree.root())
        .iter()
        .map(|&id| (tree.item(id).unwrap().name(), tree.children(id).len()))
        .collect();
    folders.sort();
    folders
}

#[test]
fn test_add_needs_parent_in_tree() {
    let temp = music();
    let root = temp.path();
    let mut library = open(root);

    let outcome = library.apply(&SyncEvent::add(root.join("C/3.mp3")));
    assert_eq!(outcome, SyncOutcome::Ignored(IgnoreReason::ParentNotFound));
    assert_eq!(top_level(&library), vec![("A".into(), 1), ("B".into(), 1)]);

    fs::create_dir(root.join("C")).unwrap();
    assert!(library.apply(&SyncEvent::add(root.join("C"))).is_applied());
    fs::write(root.join("C/3.mp3"), "").unwrap();
    assert!(library.apply(&SyncEvent::add(root.join("C/3.mp3"))).is_applied());

    assert_eq!(
        top_level(&library),
        vec![("A".into(), 1), ("B".into(), 1), ("C".into(), 1)]
    );
}

#[test]
fn test_rename_then_search_sees_new_path() {
    let temp = music();
    let root = temp.path();
    let mut library = open(root);

    let outcome = library
        .perform(&LocalFileOps::new(), &FileOperation::rename(root.join("A"), "Archive"))
        .unwrap();
    assert_eq!(outcome, SyncOutcome::Applied);

    let result = library
        .search(&NameQuery::new("1"), SearchOptions::default())
        .into_tree()
        .unwrap();
    let songs: Vec<PathBuf> = result.songs().map(|song| song.path()).collect();
    assert_eq!(songs, vec![root.join("Archive/1.mp3")]);
}

#[test]
fn test_perform_move_keeps_item_handle() {
    let temp = music();
    let root = temp.path();
    let mut library = open(root);
    let song = Arc::clone(library.find(&root.join("A/1.mp3")).unwrap());

    library
        .perform(&LocalFileOps::new(), &FileOperation::move_to(root.join("A/1.mp3"), root.join("B")))
        .unwrap();

    assert!(root.join("B/1.mp3").exists());
    assert_eq!(song.path(), root.join("B/1.mp3"));
    assert!(Arc::ptr_eq(library.find(&root.join("B/1.mp3")).unwrap(), &song));
}

#[test]
fn test_failed_operation_leaves_tree_alone() {
    let temp = music();
    let root = temp.path();
    fs::create_dir(root.join("A/Inner")).unwrap();
    let mut library = open(root);
    let before = library.snapshot();

    let err = library
        .perform(&LocalFileOps::new(), &FileOperation::move_to(root.join("A"), root.join("A/Inner")))
        .unwrap_err();
    assert!(matches!(err, OpError::SourceIsAncestor { .. }));

    let err = library
        .perform(&LocalFileOps::new(), &FileOperation::copy(root.join("A/1.mp3"), root.join("A")))
        .unwrap_err();
    assert!(matches!(err, OpError::SameFile { .. }));

    assert_eq!(
        serde_json::to_string(&library.snapshot()).unwrap(),
        serde_json::to_string(&before).unwrap()
    );
}

#[test]
fn test_perform_copy_and_delete() {
    let temp = music();
    let root = temp.path();
    let mut library = open(root);
    let ops = LocalFileOps::new();

    library
        .perform(&ops, &FileOperation::copy(root.join("A"), root.join("B")))
        .unwrap();
    assert!(library.find(&root.join("B/A/1.mp3")).is_some());
    assert!(library.find(&root.join("A/1.mp3")).is_some());

    library
        .perform(&ops, &FileOperation::delete(root.join("A"), false))
        .unwrap();
    assert!(library.find(&root.join("A")).is_none());
    assert_eq!(library.songs().count(), 2);
}

#[test]
fn test_rebuild_keeps_expanded_state() {
    let temp = music();
    let root = temp.path();
    let mut library = open(root);
    assert!(library.set_expanded(&root.join("B"), true));

    fs::write(root.join("A/new.mp3"), "").unwrap();
    library.rebuild(&CancellationToken::new()).unwrap();

    assert!(library.find(&root.join("A/new.mp3")).is_some());
    assert_eq!(library.expanded_paths(), vec![root.join("B")]);
}

#[test]
fn test_library_root_must_be_a_directory() {
    let temp = music();
    let root = temp.path();

    let err = Library::open(root.join("missing"), LibraryConfig::default(), &HashSet::new())
        .unwrap_err();
    assert!(matches!(err, LibraryError::NotFound { .. }));

    let err = Library::open(root.join("A/1.mp3"), LibraryConfig::default(), &HashSet::new())
        .unwrap_err();
    assert!(matches!(err, LibraryError::NotADirectory { .. }));
}

#[test]
fn test_library_set_rejects_duplicates() {
    let temp = music();
    let root = temp.path();
    let mut set = LibrarySet::new();

    set.add(root, LibraryConfig::default(), &HashSet::new()).unwrap();
    let err = set
        .add(root, LibraryConfig::default(), &HashSet::new())
        .unwrap_err();
    assert!(matches!(err, LibraryError::AlreadyRegistered { .. }));
    assert_eq!(set.len(), 1);

    assert!(set.remove(root).is_some());
    assert!(set.is_empty());
    // Removing a library never touches the disk.
    assert!(root.join("A/1.mp3").exists());
}

#[test]
fn test_library_set_routes_by_owner() {
    let first = music();
    let second = music();
    let mut set = LibrarySet::new();
    set.insert(open(first.path()));
    set.insert(open(second.path()));

    let outcomes = set
        .route(&SyncEvent::delete(second.path().join("B/2.mp3")))
        .unwrap();
    assert_eq!(outcomes, vec![(second.path().to_path_buf(), SyncOutcome::Applied)]);
    assert!(set.get(first.path()).unwrap().find(&first.path().join("B/2.mp3")).is_some());

    let err = set.route(&SyncEvent::delete("/not/a/library")).unwrap_err();
    assert!(matches!(err, LibraryError::NotRegistered { .. }));

    // Across libraries: gone from the first, added to the second.
    fs::rename(first.path().join("A/1.mp3"), second.path().join("A/1.mp3")).unwrap();
    let outcomes = set
        .route(&SyncEvent::move_to(
            first.path().join("A/1.mp3"),
            second.path().join("A"),
        ))
        .unwrap();
    assert_eq!(
        outcomes,
        vec![
            (first.path().to_path_buf(), SyncOutcome::Applied),
            (second.path().to_path_buf(), SyncOutcome::Applied),
        ]
    );
    assert!(set.get(first.path()).unwrap().find(&first.path().join("A/1.mp3")).is_none());
    assert!(set.get(second.path()).unwrap().find(&second.path().join("A/1.mp3")).is_some());
}

#[test]
fn test_library_set_updates_nested_libraries() {
    let temp = music();
    let root = temp.path();
    let inner = root.join("B");
    let mut set = LibrarySet::new();
    set.insert(open(root));
    set.insert(open(&inner));
    assert_eq!(set.owner_of(&inner.join("2.mp3")).unwrap().root(), inner);

    fs::remove_file(inner.join("2.mp3")).unwrap();
    let outcomes = set.route(&SyncEvent::delete(inner.join("2.mp3"))).unwrap();

    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(|(_, outcome)| outcome.is_applied()));
    assert!(set.get(root).unwrap().find(&inner.join("2.mp3")).is_none());
    assert!(set.get(&inner).unwrap().find(&inner.join("2.mp3")).is_none());

    // Moving from the outer library into the inner one: a move for the
    // outer tree, an add for the inner.
    fs::rename(root.join("A/1.mp3"), inner.join("1.mp3")).unwrap();
    let outcomes = set
        .route(&SyncEvent::move_to(root.join("A/1.mp3"), &inner))
        .unwrap();

    assert_eq!(
        outcomes,
        vec![
            (root.to_path_buf(), SyncOutcome::Applied),
            (inner.clone(), SyncOutcome::Applied),
        ]
    );
    assert!(set.get(root).unwrap().find(&inner.join("1.mp3")).is_some());
    assert!(set.get(&inner).unwrap().find(&inner.join("1.mp3")).is_some());
}

#[test]
fn test_library_set_add_all() {
    let first = music();
    let second = music();
    let mut set = LibrarySet::new();

    let results = set.add_all(
        vec![
            (first.path().to_path_buf(), HashSet::new()),
            (second.path().to_path_buf(), HashSet::new()),
            (first.path().to_path_buf(), HashSet::new()),
        ],
        &LibraryConfig::default(),
    );

    assert!(results[0].is_ok());
    assert!(results[1].is_ok());
    assert!(matches!(results[2], Err(LibraryError::AlreadyRegistered { .. })));
    assert_eq!(
        set.roots().collect::<Vec<_>>(),
        vec![first.path(), second.path()]
    );
}

#[tokio::test]
async fn test_handle_applies_events_in_order() {
    let temp = music();
    let root = temp.path();
    let (handle, worker) = LibraryHandle::spawn(open(root), Arc::new(LocalFileOps::new()));

    fs::create_dir(root.join("C")).unwrap();
    fs::write(root.join("C/3.mp3"), "").unwrap();
    handle.notify(SyncEvent::add(root.join("C"))).await.unwrap();
    handle.notify(SyncEvent::delete(root.join("C/3.mp3"))).await.unwrap();
    let outcome = handle.apply(SyncEvent::delete(root.join("C/3.mp3"))).await.unwrap();

    assert_eq!(outcome, SyncOutcome::Ignored(IgnoreReason::NotFound));
    assert!(handle.find(root.join("C")).await.unwrap().is_some());
    assert_eq!(handle.songs().await.unwrap().len(), 2);

    drop(handle);
    let library = worker.await.unwrap().unwrap();
    assert_eq!(library.songs().count(), 2);
}

#[tokio::test]
async fn test_handle_search_and_perform() {
    let temp = music();
    let root = temp.path();
    let (handle, _worker) = LibraryHandle::spawn(open(root), Arc::new(LocalFileOps::new()));

    let outcome = handle
        .perform(FileOperation::rename(root.join("B"), "Best"))
        .await
        .unwrap();
    assert!(outcome.is_applied());

    let result = handle
        .search(NameQuery::new("best"), SearchOptions::default())
        .await
        .unwrap();
    let tree = result.into_tree().unwrap();
    assert!(tree.find(&root.join("Best")).is_some());

    let err = handle
        .perform(FileOperation::rename(root.join("Nope"), "x"))
        .await
        .unwrap_err();
    assert!(matches!(err, LibraryError::Operation(OpError::NotFound { .. })));
}

#[tokio::test]
async fn test_handle_forwards_watch_events() {
    let temp = music();
    let root = temp.path();
    let (handle, _worker) = LibraryHandle::spawn(open(root), Arc::new(LocalFileOps::new()));
    let (tx, rx) = mpsc::channel(8);
    let forwarder = handle.forward_watch(rx);

    fs::write(root.join("A/new.mp3"), "").unwrap();
    tx.send(WatchEvent::new(WatchKind::Created, root.join("A/new.mp3")))
        .await
        .unwrap();
    tx.send(WatchEvent::new(WatchKind::Modified, root.join("A/1.mp3")))
        .await
        .unwrap();
    tx.send(WatchEvent::new(
        WatchKind::Renamed {
            from: root.join("B"),
        },
        root.join("Bonus"),
    ))
    .await
    .unwrap();
    drop(tx);
    forwarder.await.unwrap();

    assert!(handle.find(root.join("A/new.mp3")).await.unwrap().is_some());
    assert!(handle.find(root.join("Bonus/2.mp3")).await.unwrap().is_some());
}

#[tokio::test]
async fn test_cancelled_handle_is_closed() {
    let temp = music();
    let root = temp.path();
    let (handle, worker) = LibraryHandle::open(
        root,
        builder(),
        HashSet::new(),
        Arc::new(LocalFileOps::new()),
    )
    .await
    .unwrap();

    handle.cancel();
    assert!(worker.await.unwrap().is_some());
    assert!(matches!(
        handle.songs().await,
        Err(LibraryError::Closed)
    ));
}
