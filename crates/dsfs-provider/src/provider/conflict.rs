//! Upload conflicts and diff view actions.
//!
//! A conflict keeps two versions of an entry: the caller's bytes in the
//! primary buffer and the remote snapshot in [`ConflictData`]. Neither is
//! dropped until the user picks one.
//!
//! [`ConflictData`]: crate::entry::ConflictData

use tracing::{debug, info, warn};

use super::{DatasetFsProvider, FetchOptions};
use crate::entry::EntryRef;
use crate::error::{FsError, FsResult};
use crate::events::FileChangeEvent;
use crate::host::ConflictViewSelection;
use crate::tree::require;
use crate::uri::{DsUri, QUERY_CONFLICT, QUERY_IN_DIFF};

impl DatasetFsProvider {
    /// Start conflict resolution for `entry` after an etag mismatch.
    ///
    /// The remote copy is fetched into the side buffer before the user is
    /// asked what to do. A failed fetch is shown to the user and resolves as
    /// [`ConflictViewSelection::UserDismissed`] with the local bytes kept;
    /// only errors from the chosen action reach the caller.
    #[tracing::instrument(skip_all, name = "dsfs.handle_conflict", fields(uri = %uri))]
    pub async fn handle_conflict(
        &self,
        uri: &DsUri,
        entry: &EntryRef,
    ) -> FsResult<ConflictViewSelection> {
        let uri = uri.without_query();
        let name = entry.read().name.clone();
        if let Err(e) = self
            .fetch_dataset_at_uri(&uri, FetchOptions::conflict())
            .await
        {
            warn!(uri = %uri, error = %e, "could not fetch remote copy for conflict");
            self.host
                .show_error(&format!("Failed to fetch remote copy of {name}: {e}"));
            return Ok(ConflictViewSelection::UserDismissed);
        }

        let selection = self.host.prompt_conflict(&uri, &name).await;
        info!(uri = %uri, %selection, "upload conflict");

        match selection {
            ConflictViewSelection::Compare => {
                let remote = uri.with_query([(QUERY_CONFLICT, "true")]);
                let local = uri.with_query([(QUERY_IN_DIFF, "true")]);
                let title = format!("{name} (Remote) <-> {name}");
                self.host.open_diff(&remote, &local, &title).await;
            }
            ConflictViewSelection::Overwrite => self.diff_overwrite(&uri).await?,
            ConflictViewSelection::UserDismissed => {}
        }
        Ok(selection)
    }

    /// Keep the local version: force-upload the primary buffer.
    #[tracing::instrument(skip_all, name = "dsfs.diff_overwrite", fields(uri = %uri))]
    pub async fn diff_overwrite(&self, uri: &DsUri) -> FsResult<()> {
        let uri = uri.without_query();
        let entry = require(self.tree.lookup_as_file(uri.path(), false)?, uri.path())?;
        let content = entry.read().file().map(|f| f.data().to_vec()).unwrap_or_default();

        let response = self.upload_entry(&entry, &content, true, None).await?;
        let name = {
            let mut entry = entry.write();
            if let Some(file) = entry.file_mut() {
                file.etag = response.etag;
                file.accessed = true;
                file.conflict = None;
                file.in_diff_view = false;
            }
            entry.name.clone()
        };

        self.fire_soon([FileChangeEvent::changed(uri.clone())]);
        self.host.show_message(
            &format!("Overwrite applied for {name}"),
            self.config.status_timeout(),
        );
        self.host.reload_editor(&uri).await;
        Ok(())
    }

    /// Keep the remote version.
    ///
    /// The snapshot becomes the primary buffer. It is only uploaded when it
    /// differs from what the entry held, so an unchanged remote copy costs
    /// no round trip.
    #[tracing::instrument(skip_all, name = "dsfs.diff_use_remote", fields(uri = %uri))]
    pub async fn diff_use_remote(&self, uri: &DsUri) -> FsResult<()> {
        let uri = uri.without_query();
        let entry = require(self.tree.lookup_as_file(uri.path(), false)?, uri.path())?;
        let (conflict, current) = {
            let entry = entry.read();
            let file = entry
                .file()
                .ok_or_else(|| FsError::is_a_directory(uri.path()))?;
            (file.conflict.clone(), file.data().to_vec())
        };
        let Some(conflict) = conflict else {
            debug!(uri = %uri, "no remote snapshot held, nothing to adopt");
            return Ok(());
        };

        let etag = if conflict.contents != current {
            let response = self
                .upload_entry(&entry, &conflict.contents, true, None)
                .await?;
            response.etag
        } else {
            conflict.etag
        };

        let name = {
            let mut entry = entry.write();
            entry.set_data(conflict.contents);
            if let Some(file) = entry.file_mut() {
                file.etag = etag;
                file.accessed = true;
                file.conflict = None;
                file.in_diff_view = false;
            }
            entry.name.clone()
        };

        self.fire_soon([FileChangeEvent::changed(uri.clone())]);
        self.host.show_message(
            &format!("Used remote content for {name}"),
            self.config.status_timeout(),
        );
        self.host.reload_editor(&uri).await;
        Ok(())
    }

    /// The diff view was closed without choosing a version.
    pub fn close_conflict_view(&self, uri: &DsUri) {
        let Ok(Some(entry)) = self.tree.lookup_as_file(uri.path(), true) else {
            return;
        };
        if let Some(file) = entry.write().file_mut() {
            file.in_diff_view = false;
        }
    }
}
