//! The data set filesystem provider.
//!
//! [`DatasetFsProvider`] owns the entry tree and keeps it in sync with the
//! remote system:
//!
//! - `listing`: directory listings, directory creation and remote lookup
//! - `content`: fetch, read and write of data set contents
//! - `mutate`: delete and rename
//! - `conflict`: etag mismatch handling and diff view actions
//!
//! Tree locks are never held across a remote call; each operation copies
//! what it needs out of the entry, awaits, then re-locks to apply results.

mod conflict;
mod content;
mod listing;
mod mutate;

pub use content::FetchOptions;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::ProviderConfig;
use crate::entry::{Entry, EntryMetadata, EntryRef, ZosEncoding};
use crate::error::{FsError, FsResult};
use crate::events::{ChangeNotifier, ChangeSubscription, FileChangeEvent};
use crate::host::{EditorHost, NoopHost};
use crate::ops::FileSystemProvider;
use crate::profile::{Profile, ProfileResolver, UriInfo, resolve_profile_and_path};
use crate::remote::{ApiRegistry, MvsApi};
use crate::tree::{EntryTree, require};
use crate::types::{
    DeleteOptions, FileStat, ReadDirEntry, RenameOptions, WatchHandle, WatchOptions, WriteOptions,
};
use crate::uri::DsUri;

/// Message used when a URI names no known profile.
const NO_PROFILE: &str = "Profile does not exist for this file.";

/// Virtual filesystem over mainframe data sets.
pub struct DatasetFsProvider {
    config: ProviderConfig,
    tree: EntryTree,
    profiles: Arc<dyn ProfileResolver>,
    apis: Arc<dyn ApiRegistry>,
    host: Arc<dyn EditorHost>,
    notifier: ChangeNotifier,
}

impl DatasetFsProvider {
    pub fn new(
        config: ProviderConfig,
        profiles: Arc<dyn ProfileResolver>,
        apis: Arc<dyn ApiRegistry>,
        host: Arc<dyn EditorHost>,
    ) -> Self {
        let notifier = ChangeNotifier::new(config.fire_soon_delay());
        Self {
            config,
            tree: EntryTree::new(),
            profiles,
            apis,
            host,
            notifier,
        }
    }

    /// Provider using the configured profiles and no host UI.
    pub fn from_config(config: ProviderConfig, apis: Arc<dyn ApiRegistry>) -> Self {
        let profiles = Arc::new(config.static_profiles());
        Self::new(config, profiles, apis, Arc::new(NoopHost))
    }

    /// Replace the host editor callbacks.
    pub fn with_host(mut self, host: Arc<dyn EditorHost>) -> Self {
        self.host = host;
        self
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Receive batched change events.
    pub fn subscribe(&self) -> ChangeSubscription {
        self.notifier.subscribe()
    }

    /// Deliver buffered change events without waiting for the debounce.
    pub fn flush_events(&self) {
        self.notifier.flush_now();
    }

    // ========================================================================
    // Local tree access
    // ========================================================================

    pub fn lookup(&self, uri: &DsUri, silent: bool) -> FsResult<Option<EntryRef>> {
        self.tree.lookup(uri.path(), silent)
    }

    pub fn lookup_as_directory(&self, uri: &DsUri, silent: bool) -> FsResult<Option<EntryRef>> {
        self.tree.lookup_as_directory(uri.path(), silent)
    }

    pub fn lookup_as_file(&self, uri: &DsUri, silent: bool) -> FsResult<Option<EntryRef>> {
        self.tree.lookup_as_file(uri.path(), silent)
    }

    pub fn lookup_parent_directory(&self, uri: &DsUri, silent: bool) -> FsResult<Option<EntryRef>> {
        self.tree.lookup_parent_directory(uri.path(), silent)
    }

    /// Split a URI into profile and remote path.
    pub fn resolve_profile_and_path(&self, uri: &DsUri) -> UriInfo {
        resolve_profile_and_path(uri, self.profiles.as_ref())
    }

    /// Whether an entry exists locally. Never calls the remote system.
    pub fn exists(&self, uri: &DsUri) -> bool {
        self.tree.exists(uri.path())
    }

    /// Reject editor probes such as `.vscode` or `.git` before they reach
    /// the remote system.
    pub fn validate_path(&self, uri: &DsUri) -> FsResult<()> {
        if uri.segments().skip(1).any(|s| s.starts_with('.')) {
            return Err(FsError::not_found(uri.path()));
        }
        Ok(())
    }

    /// Drop a local entry without any remote call.
    pub fn remove_entry_if_exists(&self, uri: &DsUri) {
        let Ok(Some(parent)) = self.tree.lookup_parent_directory(uri.path(), true) else {
            return;
        };
        let removed = parent.write().remove_child(uri.file_name());
        if removed.is_some() {
            self.fire_soon([FileChangeEvent::deleted(uri.without_query())]);
        }
    }

    /// Forget cached contents so the next read fetches from the remote.
    pub fn invalidate_data_for_uri(&self, uri: &DsUri) {
        let Ok(Some(entry)) = self.tree.lookup_as_file(uri.path(), true) else {
            return;
        };
        if let Some(file) = entry.write().file_mut() {
            file.data = None;
            file.accessed = false;
        }
    }

    /// Insert an empty file entry with an explicit encoding, replacing any
    /// previous one.
    pub fn make_empty_ds_with_encoding(&self, uri: &DsUri, encoding: ZosEncoding) -> FsResult<EntryRef> {
        let parent = require(self.tree.lookup_parent_directory(uri.path(), false)?, uri.path())?;
        let name = uri.file_name().to_string();
        let entry = {
            let mut parent = parent.write();
            let metadata = self.child_metadata(parent.metadata.as_ref(), &name, uri)?;
            let mut entry = if parent.is_pds() {
                Entry::member(name.clone(), metadata)
            } else {
                Entry::dataset(name.clone(), metadata)
            };
            entry.set_data(Vec::new());
            if let Some(file) = entry.file_mut() {
                file.encoding = Some(encoding);
            }
            let entry = entry.into_ref();
            parent.insert_child(name, Arc::clone(&entry));
            entry
        };
        Ok(entry)
    }

    /// Set the transfer encoding for an existing file entry.
    pub fn set_encoding(&self, uri: &DsUri, encoding: ZosEncoding) -> FsResult<()> {
        let entry = require(self.tree.lookup_as_file(uri.path(), false)?, uri.path())?;
        if let Some(file) = entry.write().file_mut() {
            file.encoding = Some(encoding);
        }
        Ok(())
    }

    // ========================================================================
    // Internal helpers
    // ========================================================================

    fn fire_soon(&self, events: impl IntoIterator<Item = FileChangeEvent>) {
        self.notifier.fire_soon(events);
    }

    /// Profile named by the URI's first segment.
    fn profile_for(&self, uri: &DsUri) -> FsResult<Arc<Profile>> {
        self.resolve_profile_and_path(uri)
            .profile
            .ok_or_else(|| FsError::not_found(NO_PROFILE))
    }

    /// Metadata derived from the URI alone, for entries not yet in the tree.
    fn metadata_from_uri(&self, uri: &DsUri) -> FsResult<EntryMetadata> {
        let info = self.resolve_profile_and_path(uri);
        let profile = info.profile.ok_or_else(|| FsError::not_found(NO_PROFILE))?;
        Ok(EntryMetadata::new(profile, info.remote_path))
    }

    /// Metadata for a new child, from its parent when it has any.
    fn child_metadata(
        &self,
        parent: Option<&EntryMetadata>,
        name: &str,
        uri: &DsUri,
    ) -> FsResult<EntryMetadata> {
        match parent {
            Some(metadata) => Ok(metadata.child(name)),
            None => self.metadata_from_uri(uri),
        }
    }

    fn api_for(&self, profile: &Arc<Profile>) -> FsResult<Arc<dyn MvsApi>> {
        self.apis.mvs_api(Arc::clone(profile))
    }
}

impl std::fmt::Debug for DatasetFsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatasetFsProvider")
            .field("config", &self.config)
            .field("tree", &self.tree)
            .field("notifier", &self.notifier)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl FileSystemProvider for DatasetFsProvider {
    fn watch(&self, _uri: &DsUri, _options: &WatchOptions) -> WatchHandle {
        // Every change is already reported through the batched change stream.
        WatchHandle::noop()
    }

    async fn stat(&self, uri: &DsUri) -> FsResult<FileStat> {
        DatasetFsProvider::stat(self, uri).await
    }

    async fn read_directory(&self, uri: &DsUri) -> FsResult<Vec<ReadDirEntry>> {
        DatasetFsProvider::read_directory(self, uri).await
    }

    async fn read_file(&self, uri: &DsUri) -> FsResult<Vec<u8>> {
        DatasetFsProvider::read_file(self, uri).await
    }

    async fn create_directory(&self, uri: &DsUri) -> FsResult<()> {
        DatasetFsProvider::create_directory(self, uri)
    }

    async fn write_file(&self, uri: &DsUri, content: &[u8], options: WriteOptions) -> FsResult<()> {
        DatasetFsProvider::write_file(self, uri, content, options).await
    }

    async fn delete(&self, uri: &DsUri, options: DeleteOptions) -> FsResult<()> {
        DatasetFsProvider::delete(self, uri, options).await
    }

    async fn rename(&self, old: &DsUri, new: &DsUri, options: RenameOptions) -> FsResult<()> {
        DatasetFsProvider::rename(self, old, new, options).await
    }
}
