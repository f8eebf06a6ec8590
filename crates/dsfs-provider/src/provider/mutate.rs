//! Delete and rename.
//!
//! Both are all-or-nothing for the local tree: the remote call goes first,
//! and a failure is reported to the user with the tree left as it was.

use std::sync::Arc;
use tracing::{debug, warn};

use super::DatasetFsProvider;
use crate::entry::EntryRef;
use crate::error::{FsError, FsResult};
use crate::events::FileChangeEvent;
use crate::remote::DeleteDataSetOptions;
use crate::tree::require;
use crate::types::{DeleteOptions, RenameOptions};
use crate::uri::DsUri;

impl DatasetFsProvider {
    /// Delete a data set, PDS or member.
    ///
    /// Profile filters and the root are not remote objects and cannot be
    /// deleted through here; use [`remove_entry_if_exists`] for those.
    ///
    /// [`remove_entry_if_exists`]: DatasetFsProvider::remove_entry_if_exists
    #[tracing::instrument(skip_all, name = "dsfs.delete", fields(uri = %uri))]
    pub async fn delete(&self, uri: &DsUri, _options: DeleteOptions) -> FsResult<()> {
        let entry = require(self.tree.lookup(uri.path(), false)?, uri.path())?;
        let parent = require(self.tree.lookup_parent_directory(uri.path(), false)?, uri.path())?;

        let (name, kind, metadata, volume) = {
            let entry = entry.read();
            if entry.is_filter() {
                return Err(FsError::invalid_path(uri.path()));
            }
            let metadata = entry
                .metadata
                .clone()
                .ok_or_else(|| FsError::invalid_path(uri.path()))?;
            (
                entry.name.clone(),
                entry.kind_name(),
                metadata,
                entry.stats().and_then(|s| s.vol.clone()),
            )
        };
        let profile = Arc::clone(metadata.profile());
        let ds_name = metadata.ds_name();
        let options = DeleteDataSetOptions {
            response_timeout: profile.response_timeout,
            volume,
        };

        let api = self.api_for(&profile)?;
        if let Err(e) = api.delete_data_set(&ds_name, &options).await {
            warn!(ds_name = %ds_name, error = %e, "remote delete failed");
            self.host
                .show_error(&format!("Failed to delete {}: {e}", metadata.path()));
            return Ok(());
        }
        debug!(ds_name = %ds_name, kind, "deleted");

        parent.write().remove_child(&name);
        self.fire_soon([FileChangeEvent::deleted(uri.without_query())]);
        Ok(())
    }

    /// Rename a data set, PDS or member within its parent.
    ///
    /// The entry keeps its identity: the same node is re-inserted under the
    /// new name with its metadata (and any members') re-pointed.
    #[tracing::instrument(skip_all, name = "dsfs.rename", fields(old = %old, new = %new))]
    pub async fn rename(&self, old: &DsUri, new: &DsUri, options: RenameOptions) -> FsResult<()> {
        let new_name = new.file_name().to_string();
        if !options.overwrite && self.tree.lookup(new.path(), true)?.is_some() {
            return Err(FsError::already_exists(format!(
                "Rename failed: {new_name} already exists"
            )));
        }

        let entry = require(self.tree.lookup(old.path(), false)?, old.path())?;
        let parent = require(self.tree.lookup_parent_directory(old.path(), false)?, old.path())?;

        let (old_name, kind, metadata, is_member) = {
            let entry = entry.read();
            if entry.is_filter() {
                return Err(FsError::invalid_path(old.path()));
            }
            let metadata = entry
                .metadata
                .clone()
                .ok_or_else(|| FsError::invalid_path(old.path()))?;
            let is_member = !entry.is_pds() && metadata.pds_name().is_some();
            (entry.name.clone(), entry.kind_name(), metadata, is_member)
        };
        let profile = Arc::clone(metadata.profile());
        let api = self.api_for(&profile)?;

        let result = match metadata.pds_name() {
            Some(pds_name) if is_member => {
                api.rename_data_set_member(pds_name, &old_name, &new_name).await
            }
            _ => api.rename_data_set(&old_name, &new_name).await,
        };
        if let Err(e) = result {
            warn!(old = %old_name, new = %new_name, error = %e, "remote rename failed");
            self.host
                .show_error(&format!("Failed to rename {old_name}: {e}"));
            return Ok(());
        }
        debug!(old = %old_name, new = %new_name, kind, "renamed");

        {
            let mut parent = parent.write();
            parent.remove_child(&old_name);
            rename_in_place(&entry, &new_name);
            parent.insert_child(new_name, Arc::clone(&entry));
        }

        self.fire_soon([
            FileChangeEvent::deleted(old.without_query()),
            FileChangeEvent::created(new.without_query()),
        ]);
        Ok(())
    }
}

/// Give `entry` a new name and re-point its members' metadata.
fn rename_in_place(entry: &EntryRef, new_name: &str) {
    let mut entry = entry.write();
    entry.name = new_name.to_string();
    let Some(metadata) = entry.metadata.as_ref().map(|m| m.renamed(new_name)) else {
        return;
    };
    if let Some(children) = entry.children() {
        for child in children.values() {
            let mut child = child.write();
            let child_metadata = metadata.child(&child.name);
            child.metadata = Some(child_metadata);
        }
    }
    entry.metadata = Some(metadata);
}
