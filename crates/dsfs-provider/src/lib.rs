//! # dsfs-provider
//!
//! Virtual filesystem over mainframe data sets.
//!
//! The provider presents partitioned data sets, sequential data sets and
//! PDS members as a directory tree to a host editor:
//! - Keeps an in-memory entry tree, filled lazily from remote listings
//! - Fetches content on first read and uploads on every write
//! - Detects concurrent edits through etags and hands them to the user
//! - Propagates delete and rename, leaving the tree untouched on failure
//! - Reports changes as debounced batches
//!
//! Remote access ([`MvsApi`]), profile lookup ([`ProfileResolver`]) and UI
//! ([`EditorHost`]) are supplied by the embedding application.

pub mod config;
pub mod entry;
pub mod error;
pub mod events;
pub mod host;
pub mod language;
pub mod ops;
pub mod profile;
pub mod provider;
pub mod remote;
pub mod tree;
pub mod types;
pub mod uri;

pub use config::{ConfigError, ProviderConfig};
pub use entry::{
    ConflictData, DatasetFilter, DatasetStats, Entry, EntryKind, EntryMetadata, EntryRef,
    FileContent, ZosEncoding,
};
pub use error::{FsError, FsResult};
pub use events::{ChangeNotifier, ChangeSubscription, FileChangeEvent, FileChangeKind};
pub use host::{ConflictViewSelection, EditorHost, NoopHost, StatusIndicator};
pub use language::{LanguageId, language_id};
pub use ops::FileSystemProvider;
pub use profile::{Profile, ProfileResolver, StaticProfiles, UriInfo};
pub use provider::{DatasetFsProvider, FetchOptions};
pub use remote::{
    ApiRegistry, ApiResponse, DataSetListOptions, DatasetRecord, DeleteDataSetOptions,
    DownloadOptions, MemberRecord, MvsApi, RemoteError, RemoteResult, UploadOptions,
};
pub use tree::EntryTree;
pub use types::{
    DeleteOptions, FilePermission, FileStat, FileType, ReadDirEntry, RenameOptions, WatchHandle,
    WatchOptions, WriteOptions,
};
pub use uri::{DS_SCHEME, DsUri};
