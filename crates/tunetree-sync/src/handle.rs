//! Per-library mailbox.
//!
//! A [`LibraryHandle`] is the only way to reach a library once it has been
//! spawned. Commands are queued on an mpsc channel and served one at a time
//! by a worker task that owns the [`Library`], so events are applied in send
//! order and never interleave with searches or queries.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use tunetree_core::{ItemRef, TreeSnapshot};
use tunetree_ops::{FileOperation, FileOps};
use tunetree_scan::TreeBuilder;
use tunetree_search::{SearchOptions, SearchOutcome, SearchPredicate};

use crate::action::{SyncEvent, SyncOutcome};
use crate::error::LibraryError;
use crate::library::Library;
use crate::watch::{WatchEvent, translate_watch_event};

const MAILBOX_CAPACITY: usize = 64;

enum Command {
    Apply {
        event: SyncEvent,
        reply: Option<oneshot::Sender<SyncOutcome>>,
    },
    Perform {
        operation: FileOperation,
        reply: oneshot::Sender<Result<SyncOutcome, LibraryError>>,
    },
    Search {
        predicate: Box<dyn SearchPredicate>,
        options: SearchOptions,
        reply: oneshot::Sender<SearchOutcome>,
    },
    Find {
        path: PathBuf,
        reply: oneshot::Sender<Option<ItemRef>>,
    },
    Songs {
        reply: oneshot::Sender<Vec<ItemRef>>,
    },
    ExpandedPaths {
        reply: oneshot::Sender<Vec<PathBuf>>,
    },
    SetExpanded {
        path: PathBuf,
        expanded: bool,
        reply: oneshot::Sender<bool>,
    },
    Snapshot {
        reply: oneshot::Sender<Option<TreeSnapshot>>,
    },
    Rebuild {
        reply: oneshot::Sender<Result<(), LibraryError>>,
    },
}

/// Cloneable handle to a library served by its own worker.
#[derive(Clone)]
pub struct LibraryHandle {
    root: PathBuf,
    tx: mpsc::Sender<Command>,
    cancel: CancellationToken,
}

impl LibraryHandle {
    /// Build the library off the async runtime, then start its worker.
    ///
    /// Subscribe to `builder` beforehand to follow the initial build.
    pub async fn open(
        root: impl Into<PathBuf>,
        builder: TreeBuilder,
        expanded: HashSet<PathBuf>,
        ops: Arc<dyn FileOps>,
    ) -> Result<(Self, JoinHandle<Option<Library>>), LibraryError> {
        let root = root.into();
        let cancel = CancellationToken::new();
        let build_cancel = cancel.clone();

        let library = tokio::task::spawn_blocking(move || {
            Library::open_with_builder(root, builder, &expanded, &build_cancel)
        })
        .await
        .map_err(|_| LibraryError::Closed)??;

        Ok(Self::spawn_with_cancel(library, ops, cancel))
    }

    /// Start a worker for an opened library.
    ///
    /// The worker stops once every handle is dropped or [`cancel`] is
    /// called, and hands the library back through the join handle.
    ///
    /// [`cancel`]: LibraryHandle::cancel
    pub fn spawn(library: Library, ops: Arc<dyn FileOps>) -> (Self, JoinHandle<Option<Library>>) {
        Self::spawn_with_cancel(library, ops, CancellationToken::new())
    }

    fn spawn_with_cancel(
        library: Library,
        ops: Arc<dyn FileOps>,
        cancel: CancellationToken,
    ) -> (Self, JoinHandle<Option<Library>>) {
        let (tx, rx) = mpsc::channel(MAILBOX_CAPACITY);
        let root = library.root().to_path_buf();
        let worker = tokio::spawn(run(library, ops, rx, cancel.clone()));
        (Self { root, tx, cancel }, worker)
    }

    /// Root directory of the library.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stop the worker and any watch forwarding; an in-flight rebuild stops early.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, LibraryError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(command(reply))
            .await
            .map_err(|_| LibraryError::Closed)?;
        response.await.map_err(|_| LibraryError::Closed)
    }

    /// Apply an event and wait for the outcome.
    pub async fn apply(&self, event: SyncEvent) -> Result<SyncOutcome, LibraryError> {
        self.request(|reply| Command::Apply {
            event,
            reply: Some(reply),
        })
        .await
    }

    /// Queue an event without waiting for it.
    pub async fn notify(&self, event: SyncEvent) -> Result<(), LibraryError> {
        self.tx
            .send(Command::Apply { event, reply: None })
            .await
            .map_err(|_| LibraryError::Closed)
    }

    /// Run a file operation and mirror it in the tree.
    pub async fn perform(&self, operation: FileOperation) -> Result<SyncOutcome, LibraryError> {
        self.request(|reply| Command::Perform { operation, reply })
            .await?
    }

    /// Search the library.
    pub async fn search(
        &self,
        predicate: impl SearchPredicate + 'static,
        options: SearchOptions,
    ) -> Result<SearchOutcome, LibraryError> {
        self.request(|reply| Command::Search {
            predicate: Box::new(predicate),
            options,
            reply,
        })
        .await
    }

    /// Item at `path`, if tracked.
    pub async fn find(&self, path: impl Into<PathBuf>) -> Result<Option<ItemRef>, LibraryError> {
        let path = path.into();
        self.request(|reply| Command::Find { path, reply }).await
    }

    /// Every song in tree order.
    pub async fn songs(&self) -> Result<Vec<ItemRef>, LibraryError> {
        self.request(|reply| Command::Songs { reply }).await
    }

    /// Paths of expanded folders.
    pub async fn expanded_paths(&self) -> Result<Vec<PathBuf>, LibraryError> {
        self.request(|reply| Command::ExpandedPaths { reply }).await
    }

    /// Expand or collapse the folder at `path`.
    pub async fn set_expanded(
        &self,
        path: impl Into<PathBuf>,
        expanded: bool,
    ) -> Result<bool, LibraryError> {
        let path = path.into();
        self.request(|reply| Command::SetExpanded {
            path,
            expanded,
            reply,
        })
        .await
    }

    /// Serializable copy of the tree.
    pub async fn snapshot(&self) -> Result<Option<TreeSnapshot>, LibraryError> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    /// Rebuild the tree from disk.
    pub async fn rebuild(&self) -> Result<(), LibraryError> {
        self.request(|reply| Command::Rebuild { reply }).await?
    }

    /// Feed watcher notifications into this library until the feed closes.
    pub fn forward_watch(&self, mut events: mpsc::Receiver<WatchEvent>) -> JoinHandle<()> {
        let tx = self.tx.clone();
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    _ = cancel.cancelled() => break,
                    event = events.recv() => match event {
                        Some(event) => event,
                        None => break,
                    },
                };
                for event in translate_watch_event(&event) {
                    if tx.send(Command::Apply { event, reply: None }).await.is_err() {
                        return;
                    }
                }
            }
        })
    }
}

impl std::fmt::Debug for LibraryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibraryHandle")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

async fn run(
    mut library: Library,
    ops: Arc<dyn FileOps>,
    mut rx: mpsc::Receiver<Command>,
    cancel: CancellationToken,
) -> Option<Library> {
    loop {
        let command = tokio::select! {
            _ = cancel.cancelled() => break,
            command = rx.recv() => match command {
                Some(command) => command,
                None => break,
            },
        };

        // Commands may touch the disk, so they run on the blocking pool.
        let ops = Arc::clone(&ops);
        let cancel = cancel.clone();
        let served = tokio::task::spawn_blocking(move || {
            serve(&mut library, ops.as_ref(), command, &cancel);
            library
        })
        .await;

        library = match served {
            Ok(library) => library,
            Err(err) => {
                tracing::error!(error = %err, "library worker failed");
                return None;
            }
        };
    }

    tracing::debug!(root = %library.root().display(), "library worker stopped");
    Some(library)
}

fn serve(library: &mut Library, ops: &dyn FileOps, command: Command, cancel: &CancellationToken) {
    // A dropped reply receiver only means the caller stopped waiting.
    match command {
        Command::Apply { event, reply } => {
            let outcome = library.apply(&event);
            if let Some(reply) = reply {
                let _ = reply.send(outcome);
            }
        }
        Command::Perform { operation, reply } => {
            let _ = reply.send(library.perform(ops, &operation).map_err(LibraryError::from));
        }
        Command::Search {
            predicate,
            options,
            reply,
        } => {
            let _ = reply.send(library.search(predicate.as_ref(), options));
        }
        Command::Find { path, reply } => {
            let _ = reply.send(library.find(&path).cloned());
        }
        Command::Songs { reply } => {
            let _ = reply.send(library.songs().cloned().collect());
        }
        Command::ExpandedPaths { reply } => {
            let _ = reply.send(library.expanded_paths());
        }
        Command::SetExpanded {
            path,
            expanded,
            reply,
        } => {
            let _ = reply.send(library.set_expanded(&path, expanded));
        }
        Command::Snapshot { reply } => {
            let _ = reply.send(library.snapshot());
        }
        Command::Rebuild { reply } => {
            let _ = reply.send(library.rebuild(cancel));
        }
    }
}
