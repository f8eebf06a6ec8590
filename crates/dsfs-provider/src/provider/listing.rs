//! Directory listings, directory creation and remote lookup.

use std::sync::Arc;
use tracing::{debug, trace, warn};

use super::DatasetFsProvider;
use crate::entry::{DatasetStats, Entry, EntryKind, EntryMetadata, EntryRef};
use crate::error::{FsError, FsResult};
use crate::events::FileChangeEvent;
use crate::remote::{DataSetListOptions, DatasetRecord};
use crate::tree::require;
use crate::types::{FileStat, ReadDirEntry};
use crate::uri::DsUri;

/// Result of a remote lookup.
pub(super) struct RemoteLookup {
    pub entry: EntryRef,
    /// The lookup already refreshed the entry's children.
    pub listed: bool,
}

/// What a directory listing has to do, captured under the entry's lock.
enum ListingPlan {
    Local(Vec<ReadDirEntry>),
    Filter {
        metadata: EntryMetadata,
        patterns: Vec<String>,
    },
    Members {
        metadata: EntryMetadata,
    },
}

impl DatasetFsProvider {
    /// List a directory.
    ///
    /// Profile roots are listed with their filter pattern and PDS entries
    /// with a member listing. Entries already in the tree are never replaced.
    #[tracing::instrument(skip_all, name = "dsfs.read_directory", fields(uri = %uri))]
    pub async fn read_directory(&self, uri: &DsUri) -> FsResult<Vec<ReadDirEntry>> {
        self.validate_path(uri)?;
        let should_fetch = uri.fetch_requested() || uri.pattern().is_some();

        let lookup = if should_fetch {
            self.resolve_remote(uri).await?
        } else {
            match self.tree.lookup_as_directory(uri.path(), false) {
                Ok(entry) => RemoteLookup {
                    entry: require(entry, uri.path())?,
                    listed: false,
                },
                Err(e) if e.is_not_found() && self.config.fetch_by_default => {
                    self.resolve_remote(uri).await?
                }
                Err(e) => return Err(e),
            }
        };

        if lookup.listed {
            return Self::local_listing(uri, &lookup.entry);
        }
        self.list_entry(&uri.without_query(), &lookup.entry).await
    }

    /// Refresh `entry`'s children from the remote system and report them.
    async fn list_entry(&self, uri: &DsUri, entry: &EntryRef) -> FsResult<Vec<ReadDirEntry>> {
        let plan = {
            let entry = entry.read();
            match &entry.kind {
                EntryKind::Directory { children } => ListingPlan::Local(
                    children
                        .iter()
                        .map(|(name, child)| ReadDirEntry::new(name.clone(), child.read().file_type()))
                        .collect(),
                ),
                EntryKind::Filter { filter, .. } => ListingPlan::Filter {
                    metadata: entry
                        .metadata
                        .clone()
                        .ok_or_else(|| FsError::not_found(uri.path()))?,
                    patterns: filter.patterns(),
                },
                EntryKind::Pds { .. } => ListingPlan::Members {
                    metadata: entry
                        .metadata
                        .clone()
                        .ok_or_else(|| FsError::not_found(uri.path()))?,
                },
                EntryKind::Dataset(_) | EntryKind::Member(_) => {
                    return Err(FsError::not_a_directory(uri.path()));
                }
            }
        };

        match plan {
            ListingPlan::Local(listing) => Ok(listing),
            ListingPlan::Filter { metadata, patterns } => {
                self.list_filter(uri, entry, &metadata, &patterns).await
            }
            ListingPlan::Members { metadata } => self.list_members(uri, entry, &metadata).await,
        }
    }

    fn local_listing(uri: &DsUri, entry: &EntryRef) -> FsResult<Vec<ReadDirEntry>> {
        let entry = entry.read();
        let children = entry
            .children()
            .ok_or_else(|| FsError::not_a_directory(uri.path()))?;
        Ok(children
            .iter()
            .map(|(name, child)| ReadDirEntry::new(name.clone(), child.read().file_type()))
            .collect())
    }

    /// List the data sets matching a profile's filter.
    async fn list_filter(
        &self,
        uri: &DsUri,
        filter: &EntryRef,
        metadata: &EntryMetadata,
        patterns: &[String],
    ) -> FsResult<Vec<ReadDirEntry>> {
        if patterns.is_empty() {
            trace!(uri = %uri, "filter has no pattern, nothing to list");
            return Ok(Vec::new());
        }

        let api = self.api_for(metadata.profile())?;
        let records = match api.data_sets_matching_patterns(patterns).await {
            Some(records) => records?,
            None => {
                let mut records = Vec::new();
                for pattern in patterns {
                    records.extend(api.data_set(pattern, DataSetListOptions::default()).await?);
                }
                records
            }
        };
        debug!(uri = %uri, patterns = ?patterns, count = records.len(), "listed data sets");

        let mut listing: Vec<ReadDirEntry> = Vec::new();
        let mut filter = filter.write();
        for record in &records {
            if record.is_unsupported() {
                trace!(dsname = %record.dsname, dsorg = ?record.dsorg, "skipping unsupported data set");
                continue;
            }
            if listing.iter().any(|e| e.name == record.dsname) {
                continue;
            }
            if record.is_migrated() {
                trace!(dsname = %record.dsname, "listing migrated data set");
            }
            let kind = match filter.child(&record.dsname) {
                Some(existing) => existing.read().file_type(),
                None => {
                    let child = data_set_entry(record, metadata.child(&record.dsname));
                    let kind = child.file_type();
                    filter.insert_child(record.dsname.clone(), child.into_ref());
                    kind
                }
            };
            listing.push(ReadDirEntry::new(record.dsname.clone(), kind));
        }
        Ok(listing)
    }

    /// List the members of a PDS.
    async fn list_members(
        &self,
        uri: &DsUri,
        pds: &EntryRef,
        metadata: &EntryMetadata,
    ) -> FsResult<Vec<ReadDirEntry>> {
        let api = self.api_for(metadata.profile())?;
        let pds_name = metadata.ds_name();
        let members = match api.all_members(&pds_name).await {
            Ok(members) => members,
            Err(e) if e.is_server_error() => {
                warn!(uri = %uri, error = %e, "member listing failed, treating as empty");
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };
        debug!(uri = %uri, count = members.len(), "listed members");

        let mut listing = Vec::with_capacity(members.len());
        let mut pds = pds.write();
        for record in &members {
            if pds.child(&record.member).is_none() {
                let member = Entry::member(record.member.clone(), metadata.child(&record.member));
                pds.insert_child(record.member.clone(), member.into_ref());
            }
            listing.push(ReadDirEntry::file(record.member.clone()));
        }
        Ok(listing)
    }

    /// Create a directory entry.
    ///
    /// Under the root this is a profile filter, under a filter a PDS. Members
    /// cannot contain directories. An existing entry is left as is.
    pub fn create_directory(&self, uri: &DsUri) -> FsResult<()> {
        self.ensure_directory(uri).map(|_| ())
    }

    /// Create a profile filter, or update the pattern of an existing one.
    pub fn create_filter(&self, uri: &DsUri, pattern: Option<String>) -> FsResult<EntryRef> {
        let entry = self.ensure_directory(uri)?;
        if let EntryKind::Filter { filter, .. } = &mut entry.write().kind {
            filter.pattern = pattern;
        } else {
            return Err(FsError::invalid_path(uri.path()));
        }
        Ok(entry)
    }

    pub(super) fn ensure_directory(&self, uri: &DsUri) -> FsResult<EntryRef> {
        let name = uri.file_name();
        if name.is_empty() {
            return Ok(self.tree.root());
        }
        let parent = require(self.tree.lookup_parent_directory(uri.path(), false)?, uri.path())?;

        let created = {
            let mut parent = parent.write();
            if let Some(existing) = parent.child(name) {
                return Ok(existing);
            }
            let entry = match &parent.kind {
                EntryKind::Directory { .. } => {
                    let profile = self.profile_for(uri)?;
                    Entry::filter(name, EntryMetadata::new(profile, "/"), None)
                }
                EntryKind::Filter { .. } => {
                    let metadata = self.child_metadata(parent.metadata.as_ref(), name, uri)?;
                    Entry::pds(name, metadata)
                }
                EntryKind::Pds { .. } => return Err(FsError::invalid_path(uri.path())),
                EntryKind::Dataset(_) | EntryKind::Member(_) => {
                    return Err(FsError::not_a_directory(uri.path()));
                }
            };
            let entry = entry.into_ref();
            parent.insert_child(name, Arc::clone(&entry));
            entry
        };

        let plain = uri.without_query();
        self.fire_soon([
            FileChangeEvent::changed(plain.parent()),
            FileChangeEvent::created(plain),
        ]);
        Ok(created)
    }

    /// Create every missing directory above `uri`.
    pub(super) fn ensure_parents(&self, uri: &DsUri) -> FsResult<EntryRef> {
        let segments: Vec<&str> = uri.segments().collect();
        let mut current = self.tree.root();
        let mut path = String::new();
        for segment in segments.iter().take(segments.len().saturating_sub(1)) {
            path.push('/');
            path.push_str(segment);
            current = self.ensure_directory(&uri.with_path(path.clone()).without_query())?;
        }
        Ok(current)
    }

    /// Insert a data set or member entry for `uri` unless one exists.
    pub(super) fn ensure_file_entry(&self, uri: &DsUri) -> FsResult<EntryRef> {
        let parent = self.ensure_parents(uri)?;
        let name = uri.file_name();
        let mut parent = parent.write();
        if let Some(existing) = parent.child(name) {
            return Ok(existing);
        }
        let metadata = self.child_metadata(parent.metadata.as_ref(), name, uri)?;
        let entry = match parent.kind {
            EntryKind::Pds { .. } => Entry::member(name, metadata),
            EntryKind::Filter { .. } => Entry::dataset(name, metadata),
            _ => return Err(FsError::invalid_path(uri.path())),
        }
        .into_ref();
        parent.insert_child(name, Arc::clone(&entry));
        Ok(entry)
    }

    /// Look up a resource on the remote system and add it to the tree.
    ///
    /// For the profile root this returns the filter entry, listing it first
    /// when the URI carries a `pattern=`. For a data set or member it checks
    /// the remote system for existence before creating the entry.
    #[tracing::instrument(skip_all, name = "dsfs.remote_lookup", fields(uri = %uri))]
    pub async fn remote_lookup_for_resource(&self, uri: &DsUri) -> FsResult<EntryRef> {
        Ok(self.resolve_remote(uri).await?.entry)
    }

    pub(super) async fn resolve_remote(&self, uri: &DsUri) -> FsResult<RemoteLookup> {
        let info = self.resolve_profile_and_path(uri);
        let profile = self.profile_for(uri)?;
        let profile_uri = uri.with_path(format!("/{}", info.profile_name)).without_query();
        let filter = self.ensure_directory(&profile_uri)?;

        if info.is_root {
            let Some(pattern) = uri.pattern() else {
                return Ok(RemoteLookup {
                    entry: filter,
                    listed: false,
                });
            };
            let filter = self.create_filter(&profile_uri, Some(pattern))?;
            self.list_entry(&profile_uri, &filter).await?;
            return Ok(RemoteLookup {
                entry: filter,
                listed: true,
            });
        }

        let plain = uri.without_query();
        let api = self.api_for(&profile)?;
        let existing = self.tree.lookup(plain.path(), true)?;

        match info.remote_segments().as_slice() {
            [ds_name] => {
                if let Some(entry) = existing {
                    let is_pds = entry.read().is_pds();
                    if is_pds {
                        self.list_entry(&plain, &entry).await?;
                    }
                    return Ok(RemoteLookup {
                        entry,
                        listed: is_pds,
                    });
                }

                let records = api
                    .data_set(ds_name, DataSetListOptions { attributes: true })
                    .await?;
                let record = records
                    .into_iter()
                    .next()
                    .ok_or_else(|| FsError::not_found(plain.path()))?;

                if record.is_partitioned() {
                    let pds = self.ensure_directory(&plain)?;
                    pds.write().set_stats(DatasetStats::from(&record));
                    self.list_entry(&plain, &pds).await?;
                    Ok(RemoteLookup {
                        entry: pds,
                        listed: true,
                    })
                } else {
                    let entry = self.ensure_file_entry(&plain)?;
                    entry.write().set_stats(DatasetStats::from(&record));
                    Ok(RemoteLookup {
                        entry,
                        listed: false,
                    })
                }
            }
            [pds_name, member] => {
                if let Some(entry) = existing {
                    return Ok(RemoteLookup {
                        entry,
                        listed: false,
                    });
                }
                let members = api.all_members(pds_name).await?;
                if !members.iter().any(|m| m.member == *member) {
                    return Err(FsError::not_found(plain.path()));
                }
                let entry = self.ensure_file_entry(&plain)?;
                Ok(RemoteLookup {
                    entry,
                    listed: false,
                })
            }
            _ => Err(FsError::not_found(plain.path())),
        }
    }

    /// Entry metadata for the host.
    ///
    /// Conflict views are reported read-only. `fetch=true` (or a local miss
    /// with `fetch_by_default`) triggers a remote lookup.
    #[tracing::instrument(skip_all, name = "dsfs.stat", fields(uri = %uri))]
    pub async fn stat(&self, uri: &DsUri) -> FsResult<FileStat> {
        self.validate_path(uri)?;

        if uri.is_conflict() {
            let entry = require(self.tree.lookup(uri.path(), false)?, uri.path())?;
            let stat = entry.read().stat().readonly();
            return Ok(stat);
        }
        if uri.is_in_diff() {
            let entry = require(self.tree.lookup(uri.path(), false)?, uri.path())?;
            let stat = entry.read().stat();
            return Ok(stat);
        }

        let entry = if uri.fetch_requested() {
            self.remote_lookup_for_resource(uri).await?
        } else if self.config.fetch_by_default {
            match self.tree.lookup(uri.path(), true)? {
                Some(entry) => entry,
                None => self.remote_lookup_for_resource(uri).await?,
            }
        } else {
            require(self.tree.lookup(uri.path(), false)?, uri.path())?
        };
        let stat = entry.read().stat();
        Ok(stat)
    }
}

/// New tree entry for a listed data set.
fn data_set_entry(record: &DatasetRecord, metadata: EntryMetadata) -> Entry {
    let mut entry = if record.is_partitioned() {
        Entry::pds(record.dsname.clone(), metadata)
    } else {
        Entry::dataset(record.dsname.clone(), metadata)
    };
    if record.dsorg.is_some() || record.vol.is_some() {
        entry.set_stats(DatasetStats::from(record));
    }
    entry
}
