//! Remote data set access.
//!
//! [`MvsApi`] is the capability surface the provider consumes from the
//! remote system. One handle exists per profile and is obtained from an
//! [`ApiRegistry`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::io::AsyncWrite;

use crate::error::FsResult;
use crate::profile::Profile;

/// Error returned by the remote system.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct RemoteError {
    /// Message reported by the remote API.
    pub message: String,
    /// HTTP status, when the transport knows it.
    pub status: Option<u16>,
}

impl RemoteError {
    /// Create an error from a message alone.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
        }
    }

    /// Create an error with an explicit HTTP status.
    pub fn with_status(message: impl Into<String>, status: u16) -> Self {
        Self {
            message: message.into(),
            status: Some(status),
        }
    }

    /// Etag mismatch on upload.
    ///
    /// Transports do not always surface the status code, so the message is
    /// checked as well.
    pub fn is_precondition_failed(&self) -> bool {
        self.status == Some(412) || self.message.contains("412")
    }

    /// Server-side failure while listing members.
    pub fn is_server_error(&self) -> bool {
        self.status == Some(500) || self.message.contains("status 500")
    }
}

/// Remote result type.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// A data set as returned by a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetRecord {
    pub dsname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dsorg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub migr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vol: Option<String>,
}

impl DatasetRecord {
    /// Record with a name only (sequential, no attributes).
    pub fn new(dsname: impl Into<String>) -> Self {
        Self {
            dsname: dsname.into(),
            ..Default::default()
        }
    }

    /// Set the data set organization.
    pub fn with_dsorg(mut self, dsorg: impl Into<String>) -> Self {
        self.dsorg = Some(dsorg.into());
        self
    }

    /// Set the migration flag.
    pub fn with_migr(mut self, migr: impl Into<String>) -> Self {
        self.migr = Some(migr.into());
        self
    }

    /// Set the volume serial.
    pub fn with_vol(mut self, vol: impl Into<String>) -> Self {
        self.vol = Some(vol.into());
        self
    }

    /// VSAM and zFS data sets cannot be opened as files.
    pub fn is_unsupported(&self) -> bool {
        matches!(self.dsorg.as_deref(), Some("VS") | Some("ZFS"))
    }

    /// Partitioned organizations (`PO`, `PO-E`).
    pub fn is_partitioned(&self) -> bool {
        self.dsorg.as_deref().is_some_and(|o| o.starts_with("PO"))
    }

    pub fn is_migrated(&self) -> bool {
        self.migr
            .as_deref()
            .is_some_and(|m| m.eq_ignore_ascii_case("YES"))
    }
}

/// A PDS member as returned by a member listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRecord {
    pub member: String,
}

impl MemberRecord {
    pub fn new(member: impl Into<String>) -> Self {
        Self {
            member: member.into(),
        }
    }
}

/// Response metadata from content transfers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse {
    #[serde(default)]
    pub etag: Option<String>,
}

impl ApiResponse {
    pub fn with_etag(etag: impl Into<String>) -> Self {
        Self {
            etag: Some(etag.into()),
        }
    }
}

/// Options for single-pattern listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DataSetListOptions {
    /// Request dsorg/volume attributes with each record.
    pub attributes: bool,
}

/// Options for content downloads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadOptions {
    pub binary: bool,
    /// Codepage for text transfers.
    pub encoding: Option<String>,
    /// Seconds.
    pub response_timeout: Option<u64>,
    pub return_etag: bool,
}

/// Options for content uploads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadOptions {
    pub binary: bool,
    pub encoding: Option<String>,
    /// Precondition etag. `None` uploads unconditionally.
    pub etag: Option<String>,
    pub return_etag: bool,
}

/// Options for data set deletion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteDataSetOptions {
    pub response_timeout: Option<u64>,
    pub volume: Option<String>,
}

/// Remote data set operations for one profile.
#[async_trait]
pub trait MvsApi: Send + Sync {
    /// List data sets matching several patterns in one request.
    ///
    /// Returns `None` when the remote API does not offer the capability, in
    /// which case callers fall back to [`MvsApi::data_set`] per pattern.
    async fn data_sets_matching_patterns(
        &self,
        _patterns: &[String],
    ) -> Option<RemoteResult<Vec<DatasetRecord>>> {
        None
    }

    /// List data sets matching a single pattern.
    async fn data_set(
        &self,
        pattern: &str,
        options: DataSetListOptions,
    ) -> RemoteResult<Vec<DatasetRecord>>;

    /// List all members of a PDS.
    async fn all_members(&self, pds: &str) -> RemoteResult<Vec<MemberRecord>>;

    /// Download a data set or `PDS(MEMBER)` into `sink`.
    async fn get_contents(
        &self,
        name: &str,
        options: &DownloadOptions,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> RemoteResult<ApiResponse>;

    /// Upload `data` to a data set or `PDS(MEMBER)`.
    async fn upload_from_buffer(
        &self,
        data: &[u8],
        name: &str,
        options: &UploadOptions,
    ) -> RemoteResult<ApiResponse>;

    /// Delete a data set or `PDS(MEMBER)`.
    async fn delete_data_set(&self, name: &str, options: &DeleteDataSetOptions)
    -> RemoteResult<()>;

    /// Rename a whole data set.
    async fn rename_data_set(&self, old: &str, new: &str) -> RemoteResult<()>;

    /// Rename a member inside `pds`.
    async fn rename_data_set_member(&self, pds: &str, old: &str, new: &str) -> RemoteResult<()>;
}

/// Produces an [`MvsApi`] handle scoped to a profile.
pub trait ApiRegistry: Send + Sync {
    fn mvs_api(&self, profile: Arc<Profile>) -> FsResult<Arc<dyn MvsApi>>;
}

impl<F> ApiRegistry for F
where
    F: Fn(Arc<Profile>) -> FsResult<Arc<dyn MvsApi>> + Send + Sync,
{
    fn mvs_api(&self, profile: Arc<Profile>) -> FsResult<Arc<dyn MvsApi>> {
        self(profile)
    }
}
