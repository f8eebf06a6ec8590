//! Provider error types.

use std::io;
use thiserror::Error;

use crate::remote::RemoteError;

/// Data set filesystem error type.
///
/// The first four variants form the host editor's filesystem error contract
/// and are propagated to it unchanged.
#[derive(Debug, Error)]
pub enum FsError {
    /// Entry not found locally (and, for reads, not on the remote system).
    #[error("not found: {0}")]
    NotFound(String),

    /// Entry already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Expected a directory.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// Expected a file.
    #[error("is a directory: {0}")]
    IsADirectory(String),

    /// Malformed URI or an operation the tree shape does not allow.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// No remote API could be obtained for the profile.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// The remote system rejected a request.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// I/O error while streaming content.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl FsError {
    /// Create a NotFound error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create an AlreadyExists error.
    pub fn already_exists(path: impl Into<String>) -> Self {
        Self::AlreadyExists(path.into())
    }

    /// Create a NotADirectory error.
    pub fn not_a_directory(path: impl Into<String>) -> Self {
        Self::NotADirectory(path.into())
    }

    /// Create an IsADirectory error.
    pub fn is_a_directory(path: impl Into<String>) -> Self {
        Self::IsADirectory(path.into())
    }

    /// Create an InvalidPath error.
    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath(path.into())
    }

    /// Create an Unavailable error.
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Create an Other error.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Returns true for [`FsError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, FsError::NotFound(_))
    }

    /// Returns true when the remote system rejected an upload because the
    /// supplied etag no longer matches (HTTP 412).
    pub fn is_precondition_failed(&self) -> bool {
        matches!(self, FsError::Remote(e) if e.is_precondition_failed())
    }
}

/// Convert FsError to std::io::Error for compatibility.
impl From<FsError> for io::Error {
    fn from(e: FsError) -> Self {
        match e {
            FsError::NotFound(msg) => io::Error::new(io::ErrorKind::NotFound, msg),
            FsError::AlreadyExists(msg) => io::Error::new(io::ErrorKind::AlreadyExists, msg),
            FsError::NotADirectory(msg) => io::Error::new(io::ErrorKind::NotADirectory, msg),
            FsError::IsADirectory(msg) => io::Error::new(io::ErrorKind::IsADirectory, msg),
            FsError::InvalidPath(msg) => io::Error::new(io::ErrorKind::InvalidInput, msg),
            FsError::Unavailable(msg) => io::Error::new(io::ErrorKind::Unsupported, msg),
            FsError::Remote(e) => io::Error::other(e),
            FsError::Io(e) => e,
            FsError::Other(msg) => io::Error::other(msg),
        }
    }
}

/// Provider result type.
pub type FsResult<T> = Result<T, FsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_kinds() {
        let err: io::Error = FsError::not_found("/lpar/A.B").into();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);

        let err: io::Error = FsError::is_a_directory("/lpar/A.PDS").into();
        assert_eq!(err.kind(), io::ErrorKind::IsADirectory);

        let err: io::Error = FsError::already_exists("/lpar/A.B").into();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
    }

    #[test]
    fn test_precondition_detection() {
        let err = FsError::from(RemoteError::new(
            "Rest API failure with HTTP(S) status 412",
        ));
        assert!(err.is_precondition_failed());

        let err = FsError::from(RemoteError::new("Rest API failure with HTTP(S) status 500"));
        assert!(!err.is_precondition_failed());
        assert!(!FsError::not_found("x").is_precondition_failed());
    }
}
