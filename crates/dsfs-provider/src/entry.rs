//! In-memory entry tree nodes.
//!
//! Every node is an [`Entry`] whose [`EntryKind`] says what it represents:
//!
//! ```text
//! Directory ("")                 root
//! └── Filter ("lpar")            one per profile, carries the listing pattern
//!     ├── Pds ("USER.PDS")       partitioned data set
//!     │   └── Member ("MEM")
//!     └── Dataset ("USER.SEQ")   sequential or migrated data set
//! ```
//!
//! Entries are shared as [`EntryRef`] so a lookup always hands back the same
//! node until a mutation replaces it.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::SystemTime;

use crate::profile::Profile;
use crate::remote::DatasetRecord;
use crate::types::{FileStat, FileType};
use crate::uri::{basename, dirname, posix_join};

/// Shared handle to a tree node.
pub type EntryRef = Arc<RwLock<Entry>>;

/// Children keyed by name.
pub type Children = BTreeMap<String, EntryRef>;

/// Remote identity of an entry.
///
/// Immutable: children get a fresh value from [`EntryMetadata::child`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryMetadata {
    profile: Arc<Profile>,
    path: String,
}

impl EntryMetadata {
    /// `path` is relative to the profile root and starts with `/`.
    pub fn new(profile: Arc<Profile>, path: impl Into<String>) -> Self {
        Self {
            profile,
            path: path.into(),
        }
    }

    pub fn profile(&self) -> &Arc<Profile> {
        &self.profile
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Metadata for a child named `name`.
    pub fn child(&self, name: &str) -> Self {
        Self {
            profile: Arc::clone(&self.profile),
            path: posix_join(&self.path, name),
        }
    }

    /// Metadata for a sibling renamed to `name`.
    pub fn renamed(&self, name: &str) -> Self {
        Self {
            profile: Arc::clone(&self.profile),
            path: posix_join(dirname(&self.path), name),
        }
    }

    /// Remote name: `/PDS/MEMBER` becomes `PDS(MEMBER)`, `/DS` stays `DS`.
    pub fn ds_name(&self) -> String {
        let mut segments = self.path.split('/').filter(|s| !s.is_empty());
        match (segments.next(), segments.next()) {
            (Some(ds), Some(member)) => format!("{ds}({member})"),
            (Some(ds), None) => ds.to_string(),
            _ => String::new(),
        }
    }

    /// Name of the owning PDS for member paths.
    pub fn pds_name(&self) -> Option<&str> {
        let mut segments = self.path.split('/').filter(|s| !s.is_empty());
        let ds = segments.next()?;
        segments.next().map(|_| ds)
    }

    /// Final path segment.
    pub fn name(&self) -> &str {
        basename(&self.path)
    }
}

/// Transfer encoding directive for a file entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZosEncoding {
    Text,
    Binary,
    Other { codepage: String },
}

impl ZosEncoding {
    /// Parse an `encoding=` query value.
    pub fn from_query(value: &str) -> Self {
        if value.eq_ignore_ascii_case("binary") {
            ZosEncoding::Binary
        } else if value.eq_ignore_ascii_case("text") {
            ZosEncoding::Text
        } else {
            ZosEncoding::Other {
                codepage: value.to_string(),
            }
        }
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, ZosEncoding::Binary)
    }
}

/// Remote snapshot captured when an upload hits an etag mismatch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConflictData {
    pub contents: Vec<u8>,
    pub etag: Option<String>,
    pub size: u64,
}

/// State carried by data set and member entries.
#[derive(Debug, Clone, Default)]
pub struct FileContent {
    /// Content buffer. `None` until first fetched or written.
    pub data: Option<Vec<u8>>,
    /// Version token from the last successful upload or fetch.
    pub etag: Option<String>,
    /// The buffer reflects the remote copy (or a newer local write).
    pub accessed: bool,
    /// Explicit encoding. `None` falls back to the profile default.
    pub encoding: Option<ZosEncoding>,
    /// Remote content held for a diff view.
    pub conflict: Option<ConflictData>,
    /// Edits are being made from a diff view and must not be uploaded yet.
    pub in_diff_view: bool,
    /// Attributes of a sequential data set, when known.
    pub stats: Option<DatasetStats>,
}

impl FileContent {
    pub fn data(&self) -> &[u8] {
        self.data.as_deref().unwrap_or_default()
    }
}

/// Listing filter for a profile root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasetFilter {
    /// Comma-separated data set name patterns.
    pub pattern: Option<String>,
}

impl DatasetFilter {
    /// Upper-cased, trimmed, de-duplicated patterns in first-seen order.
    pub fn patterns(&self) -> Vec<String> {
        let mut patterns: Vec<String> = Vec::new();
        for p in self.pattern.as_deref().unwrap_or_default().split(',') {
            let p = p.trim().to_uppercase();
            if !p.is_empty() && !patterns.contains(&p) {
                patterns.push(p);
            }
        }
        patterns
    }
}

/// Attributes captured from an attribute listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasetStats {
    pub dsorg: Option<String>,
    pub vol: Option<String>,
}

impl From<&DatasetRecord> for DatasetStats {
    fn from(record: &DatasetRecord) -> Self {
        Self {
            dsorg: record.dsorg.clone(),
            vol: record.vol.clone(),
        }
    }
}

/// What a node represents.
#[derive(Debug, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum EntryKind {
    /// Plain container (the root).
    Directory { children: Children },
    /// Profile root whose children come from a pattern listing.
    Filter {
        filter: DatasetFilter,
        children: Children,
    },
    /// Partitioned data set.
    Pds {
        children: Children,
        stats: Option<DatasetStats>,
    },
    /// Sequential (or migrated) data set.
    Dataset(FileContent),
    /// PDS member.
    Member(FileContent),
}

/// A node in the tree.
#[derive(Debug)]
pub struct Entry {
    pub name: String,
    pub ctime: SystemTime,
    pub mtime: SystemTime,
    /// Byte length for files, child count for directories.
    pub size: u64,
    /// Absent only on the root.
    pub metadata: Option<EntryMetadata>,
    pub kind: EntryKind,
}

impl Entry {
    fn with_kind(name: impl Into<String>, metadata: Option<EntryMetadata>, kind: EntryKind) -> Self {
        let now = SystemTime::now();
        Self {
            name: name.into(),
            ctime: now,
            mtime: now,
            size: 0,
            metadata,
            kind,
        }
    }

    /// The unnamed tree root.
    pub fn root() -> Self {
        Self::with_kind(
            "",
            None,
            EntryKind::Directory {
                children: Children::new(),
            },
        )
    }

    pub fn filter(name: impl Into<String>, metadata: EntryMetadata, pattern: Option<String>) -> Self {
        Self::with_kind(
            name,
            Some(metadata),
            EntryKind::Filter {
                filter: DatasetFilter { pattern },
                children: Children::new(),
            },
        )
    }

    pub fn pds(name: impl Into<String>, metadata: EntryMetadata) -> Self {
        Self::with_kind(
            name,
            Some(metadata),
            EntryKind::Pds {
                children: Children::new(),
                stats: None,
            },
        )
    }

    pub fn dataset(name: impl Into<String>, metadata: EntryMetadata) -> Self {
        Self::with_kind(name, Some(metadata), EntryKind::Dataset(FileContent::default()))
    }

    pub fn member(name: impl Into<String>, metadata: EntryMetadata) -> Self {
        Self::with_kind(name, Some(metadata), EntryKind::Member(FileContent::default()))
    }

    /// Wrap into a shared handle.
    pub fn into_ref(self) -> EntryRef {
        Arc::new(RwLock::new(self))
    }

    pub fn kind_name(&self) -> &'static str {
        (&self.kind).into()
    }

    pub fn file_type(&self) -> FileType {
        match self.kind {
            EntryKind::Directory { .. } | EntryKind::Filter { .. } | EntryKind::Pds { .. } => {
                FileType::Directory
            }
            EntryKind::Dataset(_) | EntryKind::Member(_) => FileType::File,
        }
    }

    pub fn is_directory(&self) -> bool {
        self.file_type().is_dir()
    }

    pub fn is_file(&self) -> bool {
        self.file_type().is_file()
    }

    pub fn is_pds(&self) -> bool {
        matches!(self.kind, EntryKind::Pds { .. })
    }

    pub fn is_filter(&self) -> bool {
        matches!(self.kind, EntryKind::Filter { .. })
    }

    pub fn children(&self) -> Option<&Children> {
        match &self.kind {
            EntryKind::Directory { children }
            | EntryKind::Filter { children, .. }
            | EntryKind::Pds { children, .. } => Some(children),
            EntryKind::Dataset(_) | EntryKind::Member(_) => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Children> {
        match &mut self.kind {
            EntryKind::Directory { children }
            | EntryKind::Filter { children, .. }
            | EntryKind::Pds { children, .. } => Some(children),
            EntryKind::Dataset(_) | EntryKind::Member(_) => None,
        }
    }

    pub fn file(&self) -> Option<&FileContent> {
        match &self.kind {
            EntryKind::Dataset(f) | EntryKind::Member(f) => Some(f),
            _ => None,
        }
    }

    pub fn file_mut(&mut self) -> Option<&mut FileContent> {
        match &mut self.kind {
            EntryKind::Dataset(f) | EntryKind::Member(f) => Some(f),
            _ => None,
        }
    }

    /// Look up a direct child.
    pub fn child(&self, name: &str) -> Option<EntryRef> {
        self.children()?.get(name).cloned()
    }

    /// Insert a child under `name`, replacing any previous one.
    ///
    /// Returns false (and does nothing) when this entry is a file.
    pub fn insert_child(&mut self, name: impl Into<String>, child: EntryRef) -> bool {
        let Some(children) = self.children_mut() else {
            return false;
        };
        children.insert(name.into(), child);
        let count = children.len() as u64;
        self.size = count;
        self.mtime = SystemTime::now();
        true
    }

    /// Remove a direct child.
    pub fn remove_child(&mut self, name: &str) -> Option<EntryRef> {
        let children = self.children_mut()?;
        let removed = children.remove(name)?;
        let count = children.len() as u64;
        self.size = count;
        self.mtime = SystemTime::now();
        Some(removed)
    }

    /// Data set attributes for PDS and sequential entries.
    pub fn stats(&self) -> Option<&DatasetStats> {
        match &self.kind {
            EntryKind::Pds { stats, .. } => stats.as_ref(),
            EntryKind::Dataset(f) => f.stats.as_ref(),
            _ => None,
        }
    }

    /// Record attributes. Ignored for entries that carry none.
    pub fn set_stats(&mut self, new_stats: DatasetStats) {
        match &mut self.kind {
            EntryKind::Pds { stats, .. } => *stats = Some(new_stats),
            EntryKind::Dataset(f) => f.stats = Some(new_stats),
            _ => {}
        }
    }

    /// Replace the file buffer, updating size and mtime.
    pub fn set_data(&mut self, data: Vec<u8>) {
        let len = data.len() as u64;
        if let Some(file) = self.file_mut() {
            file.data = Some(data);
            self.size = len;
            self.mtime = SystemTime::now();
        }
    }

    pub fn stat(&self) -> FileStat {
        FileStat {
            kind: self.file_type(),
            ctime: self.ctime,
            mtime: self.mtime,
            size: self.size,
            permissions: None,
        }
    }
}
