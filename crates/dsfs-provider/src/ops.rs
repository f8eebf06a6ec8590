//! Filesystem provider trait.
//!
//! This is the contract a host editor drives: URI-addressed, whole-file
//! reads and writes, with change notifications delivered separately.

use async_trait::async_trait;

use crate::error::FsResult;
use crate::types::{
    DeleteOptions, FileStat, ReadDirEntry, RenameOptions, WatchHandle, WatchOptions, WriteOptions,
};
use crate::uri::DsUri;

/// Operations a host editor invokes on a virtual filesystem.
#[async_trait]
pub trait FileSystemProvider: Send + Sync {
    // ========================================================================
    // Reading
    // ========================================================================

    /// Subscribe to changes under `uri`.
    fn watch(&self, uri: &DsUri, options: &WatchOptions) -> WatchHandle;

    /// Get entry metadata.
    async fn stat(&self, uri: &DsUri) -> FsResult<FileStat>;

    /// List a directory.
    async fn read_directory(&self, uri: &DsUri) -> FsResult<Vec<ReadDirEntry>>;

    /// Read a whole file.
    async fn read_file(&self, uri: &DsUri) -> FsResult<Vec<u8>>;

    // ========================================================================
    // Writing
    // ========================================================================

    /// Create a directory. Succeeds without change if it already exists.
    async fn create_directory(&self, uri: &DsUri) -> FsResult<()>;

    /// Replace a file's contents, creating it if `options.create` is set.
    async fn write_file(&self, uri: &DsUri, content: &[u8], options: WriteOptions) -> FsResult<()>;

    /// Delete a file or directory.
    async fn delete(&self, uri: &DsUri, options: DeleteOptions) -> FsResult<()>;

    /// Rename a file or directory.
    async fn rename(&self, old: &DsUri, new: &DsUri, options: RenameOptions) -> FsResult<()>;
}
