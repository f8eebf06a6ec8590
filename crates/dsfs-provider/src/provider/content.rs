//! Reading and writing data set contents.

use std::sync::Arc;
use tracing::{debug, trace, warn};

use super::DatasetFsProvider;
use crate::entry::{ConflictData, Entry, EntryMetadata, EntryRef, ZosEncoding};
use crate::error::{FsError, FsResult};
use crate::events::FileChangeEvent;
use crate::profile::Profile;
use crate::remote::{ApiResponse, DownloadOptions, UploadOptions};
use crate::tree::require;
use crate::types::WriteOptions;
use crate::uri::DsUri;

/// Options for [`DatasetFsProvider::fetch_dataset_at_uri`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Ask the host to re-render an open editor afterwards.
    pub reload_editor: bool,
    /// Store the result in the conflict buffer instead of the primary one.
    pub is_conflict: bool,
}

impl FetchOptions {
    pub fn conflict() -> Self {
        Self {
            is_conflict: true,
            ..Default::default()
        }
    }

    pub fn with_reload_editor(mut self) -> Self {
        self.reload_editor = true;
        self
    }
}

/// Binary flag and codepage for a transfer.
///
/// An explicit entry encoding wins over the profile default. Explicit
/// `Text` sends no codepage so the server default applies.
pub(super) fn transfer_encoding(
    explicit: Option<&ZosEncoding>,
    profile: &Profile,
) -> (bool, Option<String>) {
    match explicit {
        Some(ZosEncoding::Binary) => (true, None),
        Some(ZosEncoding::Text) => (false, None),
        Some(ZosEncoding::Other { codepage }) => (false, Some(codepage.clone())),
        None => (false, profile.encoding.clone()),
    }
}

impl DatasetFsProvider {
    /// Download a data set or member into its entry.
    ///
    /// Missing entries (and their parent directories) are created. With
    /// `is_conflict` the download lands in the conflict buffer and the
    /// primary buffer and etag are left alone.
    #[tracing::instrument(skip_all, name = "dsfs.fetch", fields(uri = %uri, conflict = options.is_conflict))]
    pub async fn fetch_dataset_at_uri(
        &self,
        uri: &DsUri,
        options: FetchOptions,
    ) -> FsResult<EntryRef> {
        let existing = self.tree.lookup_as_file(uri.path(), true)?;
        let (metadata, encoding) = match &existing {
            Some(entry) => {
                let entry = entry.read();
                (
                    entry.metadata.clone(),
                    entry.file().and_then(|f| f.encoding.clone()),
                )
            }
            None => (None, None),
        };
        let metadata = match metadata {
            Some(metadata) => metadata,
            None => self.metadata_from_uri(uri)?,
        };

        let profile = Arc::clone(metadata.profile());
        let (binary, codepage) = transfer_encoding(encoding.as_ref(), &profile);
        let download = DownloadOptions {
            binary,
            encoding: codepage,
            response_timeout: profile.response_timeout,
            return_etag: true,
        };

        let api = self.api_for(&profile)?;
        let mut buf: Vec<u8> = Vec::new();
        let response = api
            .get_contents(&metadata.ds_name(), &download, &mut buf)
            .await?;
        debug!(uri = %uri, bytes = buf.len(), etag = ?response.etag, "fetched contents");

        let entry = match existing {
            Some(entry) => entry,
            None => self.ensure_file_entry(&uri.without_query())?,
        };

        {
            let mut entry = entry.write();
            if options.is_conflict {
                if let Some(file) = entry.file_mut() {
                    file.conflict = Some(ConflictData {
                        size: buf.len() as u64,
                        contents: buf,
                        etag: response.etag,
                    });
                }
            } else {
                if let Some(file) = entry.file_mut() {
                    file.etag = response.etag;
                }
                entry.set_data(buf);
            }
        }

        self.fire_soon([FileChangeEvent::changed(uri.without_query())]);
        if options.reload_editor {
            self.host.reload_editor(uri).await;
        }
        Ok(entry)
    }

    /// Read a data set or member.
    ///
    /// The first read of an entry fetches it from the remote system. Later
    /// reads are served from the tree. `?conflict=true` always re-fetches and
    /// returns the remote snapshot without marking the entry as read.
    #[tracing::instrument(skip_all, name = "dsfs.read_file", fields(uri = %uri))]
    pub async fn read_file(&self, uri: &DsUri) -> FsResult<Vec<u8>> {
        self.validate_path(uri)?;
        let is_conflict = uri.is_conflict();
        self.profile_for(uri)?;

        let entry = match self.tree.lookup_as_file(uri.path(), false) {
            Ok(entry) => require(entry, uri.path())?,
            Err(e) if e.is_not_found() => {
                if self.tree.lookup_parent_directory(uri.path(), true)?.is_some() {
                    return Err(e);
                }
                trace!(uri = %uri, "parent not in tree, probing remote");
                self.remote_lookup_for_resource(uri).await?;
                require(self.tree.lookup_as_file(uri.path(), false)?, uri.path())?
            }
            Err(e) => return Err(e),
        };

        let needs_fetch = is_conflict || {
            let entry = entry.read();
            entry
                .file()
                .is_some_and(|f| !f.accessed && !f.in_diff_view && !uri.is_in_diff())
        };
        if needs_fetch {
            let options = FetchOptions {
                is_conflict,
                ..Default::default()
            };
            let fetched = self.fetch_dataset_at_uri(uri, options).await?;
            if !is_conflict {
                if let Some(file) = fetched.write().file_mut() {
                    file.accessed = true;
                }
            }
        }

        let entry = entry.read();
        let file = entry
            .file()
            .ok_or_else(|| FsError::is_a_directory(uri.path()))?;
        if is_conflict {
            Ok(file
                .conflict
                .as_ref()
                .map(|c| c.contents.clone())
                .unwrap_or_default())
        } else {
            Ok(file.data().to_vec())
        }
    }

    /// Write a data set or member and upload it.
    ///
    /// An etag mismatch on upload does not fail the write: the caller's bytes
    /// stay in the entry and the conflict workflow starts instead.
    #[tracing::instrument(skip_all, name = "dsfs.write_file", fields(uri = %uri, bytes = content.len()))]
    pub async fn write_file(
        &self,
        uri: &DsUri,
        content: &[u8],
        options: WriteOptions,
    ) -> FsResult<()> {
        let name = uri.file_name().to_string();
        let parent = require(self.tree.lookup_parent_directory(uri.path(), false)?, uri.path())?;
        let (existing, parent_is_pds, parent_metadata) = {
            let parent = parent.read();
            (parent.child(&name), parent.is_pds(), parent.metadata.clone())
        };

        if let Some(entry) = &existing {
            if entry.read().is_directory() {
                return Err(FsError::is_a_directory(uri.path()));
            }
        }
        match (&existing, options.create, options.overwrite) {
            (None, false, _) => return Err(FsError::not_found(uri.path())),
            (Some(_), true, false) => return Err(FsError::already_exists(uri.path())),
            _ => {}
        }

        let plain = uri.without_query();
        let force_upload = uri.force_upload();
        let encoding = uri.encoding();

        match existing {
            None => {
                let metadata = self.child_metadata(parent_metadata.as_ref(), &name, uri)?;
                let mut entry = if parent_is_pds {
                    Entry::member(name.clone(), metadata)
                } else {
                    Entry::dataset(name.clone(), metadata)
                };
                entry.set_data(content.to_vec());
                let entry = entry.into_ref();

                if !content.is_empty() {
                    match self
                        .upload_entry(&entry, content, force_upload, encoding.as_deref())
                        .await
                    {
                        Ok(response) => mark_uploaded(&entry, response),
                        Err(e) if e.is_precondition_failed() => {
                            parent.write().insert_child(name, Arc::clone(&entry));
                            self.fire_soon([FileChangeEvent::created(plain.clone())]);
                            self.handle_conflict(&plain, &entry).await?;
                            return Ok(());
                        }
                        Err(e) => {
                            self.report_save_failure(&entry, &e);
                            return Err(e);
                        }
                    }
                }

                parent.write().insert_child(name, entry);
                self.fire_soon([FileChangeEvent::created(plain.clone())]);
            }
            Some(entry) => {
                if uri.is_in_diff() {
                    let mut entry = entry.write();
                    entry.set_data(content.to_vec());
                    if let Some(file) = entry.file_mut() {
                        file.in_diff_view = true;
                    }
                    return Ok(());
                }

                let accessed = entry.read().file().is_some_and(|f| f.accessed);
                if accessed || !content.is_empty() {
                    match self
                        .upload_entry(&entry, content, force_upload, encoding.as_deref())
                        .await
                    {
                        Ok(response) => mark_uploaded(&entry, response),
                        Err(e) if e.is_precondition_failed() => {
                            entry.write().set_data(content.to_vec());
                            self.handle_conflict(&plain, &entry).await?;
                            return Ok(());
                        }
                        Err(e) => {
                            self.report_save_failure(&entry, &e);
                            return Err(e);
                        }
                    }
                } else {
                    trace!(uri = %uri, "skipping upload of empty content to unread entry");
                }
                entry.write().set_data(content.to_vec());
            }
        }

        self.fire_soon([FileChangeEvent::changed(plain)]);
        Ok(())
    }

    /// Upload `content` for `entry`, passing its etag unless forced.
    ///
    /// An `encoding` query value overrides the entry's encoding.
    pub(super) async fn upload_entry(
        &self,
        entry: &EntryRef,
        content: &[u8],
        force_upload: bool,
        encoding: Option<&str>,
    ) -> FsResult<ApiResponse> {
        let (metadata, explicit, etag) = {
            let entry = entry.read();
            let file = entry.file();
            (
                entry.metadata.clone(),
                file.and_then(|f| f.encoding.clone()),
                file.and_then(|f| f.etag.clone()),
            )
        };
        let metadata: EntryMetadata =
            metadata.ok_or_else(|| FsError::invalid_path(entry.read().name.clone()))?;
        let profile = Arc::clone(metadata.profile());
        let explicit = encoding.map(ZosEncoding::from_query).or(explicit);
        let (binary, codepage) = transfer_encoding(explicit.as_ref(), &profile);

        let upload = UploadOptions {
            binary,
            encoding: codepage,
            etag: if force_upload { None } else { etag },
            return_etag: true,
        };
        let ds_name = metadata.ds_name();
        debug!(ds_name = %ds_name, bytes = content.len(), force_upload, "uploading");

        let api = self.api_for(&profile)?;
        let _status = self.host.set_status("Saving data set...");
        let response = api.upload_from_buffer(content, &ds_name, &upload).await?;
        Ok(response)
    }

    fn report_save_failure(&self, entry: &EntryRef, error: &FsError) {
        let ds_name = entry
            .read()
            .metadata
            .as_ref()
            .map(|m| m.ds_name())
            .unwrap_or_default();
        warn!(ds_name = %ds_name, error = %error, "upload failed");
        self.host
            .show_error(&format!("Failed to save {ds_name}: {error}"));
    }
}

/// Record a successful upload on the entry.
fn mark_uploaded(entry: &EntryRef, response: ApiResponse) {
    if let Some(file) = entry.write().file_mut() {
        file.etag = response.etag;
        file.accessed = true;
    }
}
