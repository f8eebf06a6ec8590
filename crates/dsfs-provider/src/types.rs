//! Core provider types.
//!
//! These mirror the host editor's filesystem-provider contract: file kinds,
//! stat results, directory listings and per-operation options.

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// File type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileType {
    /// Sequential data set or PDS member.
    File,
    /// Profile root, filter or partitioned data set.
    Directory,
}

impl FileType {
    /// Returns true if this is a file.
    pub fn is_file(&self) -> bool {
        matches!(self, FileType::File)
    }

    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, FileType::Directory)
    }
}

/// Permission flags reported by `stat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilePermission {
    /// The host must not allow edits (conflict views).
    Readonly,
}

/// File statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileStat {
    /// Entry type.
    pub kind: FileType,
    /// Creation time.
    pub ctime: SystemTime,
    /// Last modification time.
    pub mtime: SystemTime,
    /// Size in bytes for files, child count for directories.
    pub size: u64,
    /// Permission override, if any.
    pub permissions: Option<FilePermission>,
}

impl FileStat {
    /// Returns true if this is a file.
    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }

    /// Mark the stat as read-only.
    pub fn readonly(mut self) -> Self {
        self.permissions = Some(FilePermission::Readonly);
        self
    }
}

/// Directory listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadDirEntry {
    /// Entry name (not full path).
    pub name: String,
    /// Entry type.
    pub kind: FileType,
}

impl ReadDirEntry {
    /// Create a new listing entry.
    pub fn new(name: impl Into<String>, kind: FileType) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Create a file entry.
    pub fn file(name: impl Into<String>) -> Self {
        Self::new(name, FileType::File)
    }

    /// Create a directory entry.
    pub fn directory(name: impl Into<String>) -> Self {
        Self::new(name, FileType::Directory)
    }
}

/// Options for `write_file`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Create the entry if it does not exist.
    pub create: bool,
    /// Replace the entry if it exists (only meaningful with `create`).
    pub overwrite: bool,
}

impl WriteOptions {
    /// Update an existing entry only.
    pub fn update() -> Self {
        Self::default()
    }

    /// Create the entry, failing if it exists.
    pub fn create() -> Self {
        Self {
            create: true,
            overwrite: false,
        }
    }

    /// Create the entry or overwrite it.
    pub fn create_or_overwrite() -> Self {
        Self {
            create: true,
            overwrite: true,
        }
    }
}

/// Options for `rename`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenameOptions {
    /// Allow the destination to exist already.
    pub overwrite: bool,
}

/// Options for `delete`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteOptions {
    /// Recursive delete. Data set deletion is always whole-object.
    pub recursive: bool,
}

/// Options for `watch`.
#[derive(Debug, Clone, Default)]
pub struct WatchOptions {
    /// Watch recursively.
    pub recursive: bool,
    /// Glob patterns to exclude.
    pub excludes: Vec<String>,
}

/// Handle returned by `watch`.
///
/// Changes are reported through the batched change stream, so disposing a
/// watch has nothing to release.
#[derive(Debug, Default)]
pub struct WatchHandle {
    _private: (),
}

impl WatchHandle {
    /// Create a no-op watch handle.
    pub fn noop() -> Self {
        Self::default()
    }

    /// Dispose of the watch.
    pub fn dispose(self) {}
}
