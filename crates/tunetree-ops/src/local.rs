//! Filesystem operations against the local disk.

use std::fs;
use std::path::{Path, PathBuf};

use crate::conflict::{ConflictKind, ConflictResolution, auto_rename_path};
use crate::error::OpError;
use crate::naming::validate_filename;
use crate::operation::FileOperation;

/// What a successful operation did on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpOutcome {
    /// `from` now lives at `to`.
    Moved { from: PathBuf, to: PathBuf },
    /// A copy of `from` was created at `to`.
    Copied { from: PathBuf, to: PathBuf },
    /// `from` was renamed to `to` within the same directory.
    Renamed { from: PathBuf, to: PathBuf },
    /// `path` no longer exists.
    Deleted { path: PathBuf },
}

/// Mutating filesystem primitives used by libraries.
///
/// Each call either completes or fails as a whole; structural violations
/// are rejected before anything on disk is touched.
pub trait FileOps: Send + Sync {
    /// Move `source` into the directory `destination`.
    fn move_into(&self, source: &Path, destination: &Path) -> Result<PathBuf, OpError>;

    /// Copy `source` into the directory `destination`.
    fn copy_into(&self, source: &Path, destination: &Path) -> Result<PathBuf, OpError>;

    /// Rename `source` within its directory.
    fn rename(&self, source: &Path, new_name: &str) -> Result<PathBuf, OpError>;

    /// Delete `target`, optionally through the system trash.
    fn delete(&self, target: &Path, use_trash: bool) -> Result<(), OpError>;

    /// Run a [`FileOperation`].
    fn execute(&self, operation: &FileOperation) -> Result<OpOutcome, OpError> {
        match operation {
            FileOperation::Move {
                source,
                destination,
            } => self.move_into(source, destination).map(|to| OpOutcome::Moved {
                from: source.clone(),
                to,
            }),
            FileOperation::Copy {
                source,
                destination,
            } => self.copy_into(source, destination).map(|to| OpOutcome::Copied {
                from: source.clone(),
                to,
            }),
            FileOperation::Rename { source, new_name } => {
                self.rename(source, new_name).map(|to| OpOutcome::Renamed {
                    from: source.clone(),
                    to,
                })
            }
            FileOperation::Delete { target, use_trash } => {
                self.delete(target, *use_trash).map(|()| OpOutcome::Deleted {
                    path: target.clone(),
                })
            }
        }
    }
}

/// [`FileOps`] implementation backed by `std::fs`, fs_extra and trash.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileOps {
    /// How to handle an existing entry at the destination.
    pub conflict_resolution: ConflictResolution,
}

impl LocalFileOps {
    /// Create with the default (skip) conflict policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the conflict policy.
    pub fn with_resolution(mut self, resolution: ConflictResolution) -> Self {
        self.conflict_resolution = resolution;
        self
    }

    /// Validate a move/copy of `source` into `destination` and clear the way for it.
    fn plan_transfer(&self, source: &Path, destination: &Path) -> Result<Placement, OpError> {
        fs::symlink_metadata(source).map_err(|e| OpError::io(source, e))?;

        let dest_meta = fs::metadata(destination).map_err(|e| OpError::io(destination, e))?;
        if !dest_meta.is_dir() {
            return Err(OpError::NotADirectory {
                path: destination.to_path_buf(),
            });
        }

        let Some(name) = source.file_name() else {
            return Err(OpError::InvalidName {
                name: source.display().to_string(),
                reason: "Path has no file name".into(),
            });
        };
        let target = destination.join(name);

        if target == source {
            return Err(OpError::SameFile {
                path: source.to_path_buf(),
            });
        }
        // Either the destination lies inside the source, or the entry the
        // transfer would replace contains the source.
        if destination.starts_with(source) || source.starts_with(&target) {
            return Err(OpError::SourceIsAncestor {
                from: source.to_path_buf(),
                to: target,
            });
        }

        self.resolve_conflict(target)
    }

    /// Apply the conflict policy to `target`.
    ///
    /// Overwrite moves the existing entry aside; it is only removed once the
    /// caller commits the placement.
    fn resolve_conflict(&self, target: PathBuf) -> Result<Placement, OpError> {
        let Some(kind) = ConflictKind::at(&target) else {
            return Ok(Placement::free(target));
        };

        match self.conflict_resolution {
            ConflictResolution::Skip => Err(OpError::Conflict { path: target, kind }),
            ConflictResolution::AutoRename => Ok(Placement::free(auto_rename_path(&target))),
            ConflictResolution::Overwrite => Placement::displace(target),
        }
    }
}

/// Where a transfer lands, and the entry it replaces, if any.
#[derive(Debug)]
struct Placement {
    target: PathBuf,
    displaced: Option<PathBuf>,
}

impl Placement {
    fn free(target: PathBuf) -> Self {
        Self {
            target,
            displaced: None,
        }
    }

    /// Rename the entry at `target` to a hidden sibling.
    fn displace(target: PathBuf) -> Result<Self, OpError> {
        let name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut backup = target.with_file_name(format!(".{name}.replaced"));
        if ConflictKind::at(&backup).is_some() {
            backup = auto_rename_path(&backup);
        }

        fs::rename(&target, &backup).map_err(|e| OpError::io(&target, e))?;
        tracing::debug!(path = %target.display(), backup = %backup.display(), "moved existing entry aside");
        Ok(Self {
            target,
            displaced: Some(backup),
        })
    }

    /// Finish a transfer: drop the replaced entry on success, put it back on failure.
    fn settle<T>(self, result: Result<T, OpError>) -> Result<PathBuf, OpError> {
        let Some(backup) = self.displaced else {
            return result.map(|_| self.target);
        };

        match result {
            Ok(_) => {
                if let Err(err) = remove_entry(&backup) {
                    tracing::warn!(path = %backup.display(), error = %err, "could not remove replaced entry");
                }
                Ok(self.target)
            }
            Err(err) => {
                if ConflictKind::at(&self.target).is_some() {
                    tracing::warn!(
                        path = %self.target.display(),
                        backup = %backup.display(),
                        "transfer failed part way, keeping replaced entry aside"
                    );
                } else if let Err(restore) = fs::rename(&backup, &self.target) {
                    tracing::warn!(path = %backup.display(), error = %restore, "could not restore replaced entry");
                }
                Err(err)
            }
        }
    }
}

impl FileOps for LocalFileOps {
    fn move_into(&self, source: &Path, destination: &Path) -> Result<PathBuf, OpError> {
        let placement = self.plan_transfer(source, destination)?;
        let result = if fs::rename(source, &placement.target).is_ok() {
            Ok(())
        } else {
            // Different filesystem: copy, then drop the original.
            copy_entry(source, &placement.target).and_then(|()| remove_entry(source))
        };
        let target = placement.settle(result)?;

        tracing::debug!(from = %source.display(), to = %target.display(), "moved");
        Ok(target)
    }

    fn copy_into(&self, source: &Path, destination: &Path) -> Result<PathBuf, OpError> {
        let placement = self.plan_transfer(source, destination)?;
        let result = copy_entry(source, &placement.target);
        let target = placement.settle(result)?;

        tracing::debug!(from = %source.display(), to = %target.display(), "copied");
        Ok(target)
    }

    fn rename(&self, source: &Path, new_name: &str) -> Result<PathBuf, OpError> {
        validate_filename(new_name).map_err(|reason| OpError::InvalidName {
            name: new_name.to_string(),
            reason,
        })?;
        fs::symlink_metadata(source).map_err(|e| OpError::io(source, e))?;

        let parent = source.parent().unwrap_or(Path::new(""));
        let new_path = parent.join(new_name);
        if new_path == source {
            return Ok(new_path);
        }

        let placement = self.resolve_conflict(new_path)?;
        let result = fs::rename(source, &placement.target).map_err(|e| OpError::io(source, e));
        let new_path = placement.settle(result)?;

        tracing::debug!(from = %source.display(), to = %new_path.display(), "renamed");
        Ok(new_path)
    }

    fn delete(&self, target: &Path, use_trash: bool) -> Result<(), OpError> {
        fs::symlink_metadata(target).map_err(|e| OpError::io(target, e))?;

        if use_trash {
            trash::delete(target).map_err(|e| OpError::Trash {
                path: target.to_path_buf(),
                message: e.to_string(),
            })?;
        } else {
            remove_entry(target)?;
        }

        tracing::debug!(path = %target.display(), use_trash, "deleted");
        Ok(())
    }
}

/// Copy a file or a whole directory to `target`, cleaning up on failure.
fn copy_entry(source: &Path, target: &Path) -> Result<(), OpError> {
    let result = if source.is_dir() {
        let mut options = fs_extra::dir::CopyOptions::new();
        options.copy_inside = true;
        fs_extra::dir::copy(source, target, &options)
            .map(|_| ())
            .map_err(|e| OpError::Copy {
                path: source.to_path_buf(),
                message: e.to_string(),
            })
    } else {
        fs::copy(source, target)
            .map(|_| ())
            .map_err(|e| OpError::io(source, e))
    };

    if result.is_err() && ConflictKind::at(target).is_some() {
        if let Err(cleanup) = remove_entry(target) {
            tracing::warn!(path = %target.display(), error = %cleanup, "could not remove partial copy");
        }
    }
    result
}

/// Remove a file or directory tree.
fn remove_entry(path: &Path) -> Result<(), OpError> {
    let metadata = fs::symlink_metadata(path).map_err(|e| OpError::io(path, e))?;
    let result = if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    result.map_err(|e| OpError::io(path, e))
}
