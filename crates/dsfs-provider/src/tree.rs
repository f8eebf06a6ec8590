//! Path resolution over the entry tree.
//!
//! Paths are the URI path (`/<profile>/<DATA.SET>/<MEMBER>`). Every lookup
//! walks from the root one segment at a time, taking each node's read lock
//! only long enough to fetch the next child.

use std::sync::Arc;

use crate::entry::{Entry, EntryRef};
use crate::error::{FsError, FsResult};
use crate::uri::dirname;

/// The rooted tree of entries.
#[derive(Debug)]
pub struct EntryTree {
    root: EntryRef,
}

impl Default for EntryTree {
    fn default() -> Self {
        Self::new()
    }
}

impl EntryTree {
    pub fn new() -> Self {
        Self {
            root: Entry::root().into_ref(),
        }
    }

    pub fn root(&self) -> EntryRef {
        Arc::clone(&self.root)
    }

    /// Resolve `path` to an entry.
    ///
    /// A missing segment yields `Ok(None)` when `silent`, otherwise
    /// [`FsError::NotFound`] carrying the full path.
    pub fn lookup(&self, path: &str, silent: bool) -> FsResult<Option<EntryRef>> {
        let mut current = Arc::clone(&self.root);
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            let next = current.read().child(segment);
            match next {
                Some(child) => current = child,
                None if silent => return Ok(None),
                None => return Err(FsError::not_found(path)),
            }
        }
        Ok(Some(current))
    }

    /// Like [`EntryTree::lookup`], but the entry must be a directory.
    ///
    /// A file entry is [`FsError::NotADirectory`], or `None` when `silent`.
    pub fn lookup_as_directory(&self, path: &str, silent: bool) -> FsResult<Option<EntryRef>> {
        let Some(entry) = self.lookup(path, silent)? else {
            return Ok(None);
        };
        let is_dir = entry.read().is_directory();
        match (is_dir, silent) {
            (true, _) => Ok(Some(entry)),
            (false, true) => Ok(None),
            (false, false) => Err(FsError::not_a_directory(path)),
        }
    }

    /// Like [`EntryTree::lookup`], but the entry must be a file.
    ///
    /// A directory entry is [`FsError::IsADirectory`], or `None` when `silent`.
    pub fn lookup_as_file(&self, path: &str, silent: bool) -> FsResult<Option<EntryRef>> {
        let Some(entry) = self.lookup(path, silent)? else {
            return Ok(None);
        };
        let is_file = entry.read().is_file();
        match (is_file, silent) {
            (true, _) => Ok(Some(entry)),
            (false, true) => Ok(None),
            (false, false) => Err(FsError::is_a_directory(path)),
        }
    }

    /// Resolve the directory containing `path`.
    pub fn lookup_parent_directory(&self, path: &str, silent: bool) -> FsResult<Option<EntryRef>> {
        self.lookup_as_directory(dirname(path), silent)
    }

    /// Whether `path` resolves to an entry.
    pub fn exists(&self, path: &str) -> bool {
        matches!(self.lookup(path, true), Ok(Some(_)))
    }
}

/// Turn a silent miss into [`FsError::NotFound`].
pub(crate) fn require(entry: Option<EntryRef>, path: &str) -> FsResult<EntryRef> {
    entry.ok_or_else(|| FsError::not_found(path))
}
