//! Provider URIs.
//!
//! Format: `<scheme>:/<profile>/<DATA.SET>[/<MEMBER>][?query]`.
//!
//! Data set and member names may contain `#`, `@` and `$`, so URIs are split
//! on the first `?` only and never given fragment semantics. The query string
//! carries out-of-band flags (`conflict`, `inDiff`, `forceUpload`, `fetch`,
//! `pattern`, `encoding`).

use std::fmt;

use url::form_urlencoded;

use crate::error::{FsError, FsResult};

/// Scheme under which data set URIs are registered with the host.
pub const DS_SCHEME: &str = "zowe-ds";

/// Query flag marking a read-only conflict view.
pub const QUERY_CONFLICT: &str = "conflict";
/// Query flag suppressing uploads while a diff view is open.
pub const QUERY_IN_DIFF: &str = "inDiff";
/// Query flag bypassing the etag precondition.
pub const QUERY_FORCE_UPLOAD: &str = "forceUpload";
/// Query parameter requesting a remote lookup (`fetch=true`).
pub const QUERY_FETCH: &str = "fetch";
/// Query parameter carrying a filter pattern.
pub const QUERY_PATTERN: &str = "pattern";
/// Query parameter overriding the transfer encoding.
pub const QUERY_ENCODING: &str = "encoding";

/// A parsed provider URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DsUri {
    scheme: String,
    path: String,
    query: String,
}

impl DsUri {
    /// Build a URI from a scheme and absolute path, without a query.
    pub fn new(scheme: impl Into<String>, path: impl Into<String>) -> Self {
        let path = path.into();
        let path = if path.starts_with('/') {
            path
        } else {
            format!("/{path}")
        };
        Self {
            scheme: scheme.into(),
            path,
            query: String::new(),
        }
    }

    /// Parse `scheme:/path?query`. An empty authority (`scheme:///path`) is
    /// accepted.
    pub fn parse(input: &str) -> FsResult<Self> {
        let (scheme, rest) = input
            .split_once(':')
            .ok_or_else(|| FsError::invalid_path(input))?;
        if scheme.is_empty()
            || !scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || "+-.".contains(c))
        {
            return Err(FsError::invalid_path(input));
        }

        let (path, query) = match rest.split_once('?') {
            Some((p, q)) => (p, q),
            None => (rest, ""),
        };

        let path = match path.strip_prefix("//") {
            Some(after) if after.starts_with('/') => after,
            Some(_) => return Err(FsError::invalid_path(input)),
            None => path,
        };
        if !path.starts_with('/') {
            return Err(FsError::invalid_path(input));
        }

        Ok(Self {
            scheme: scheme.to_string(),
            path: path.to_string(),
            query: query.to_string(),
        })
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Absolute path, always starting with `/`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Raw query string, without the leading `?`.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Same scheme and query, different path.
    pub fn with_path(&self, path: impl Into<String>) -> Self {
        let mut uri = Self::new(self.scheme.clone(), path);
        uri.query = self.query.clone();
        uri
    }

    /// Replace the query with the given key/value pairs.
    pub fn with_query<'a>(&self, pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (k, v) in pairs {
            serializer.append_pair(k, v);
        }
        Self {
            scheme: self.scheme.clone(),
            path: self.path.clone(),
            query: serializer.finish(),
        }
    }

    /// Drop the query string.
    pub fn without_query(&self) -> Self {
        Self {
            scheme: self.scheme.clone(),
            path: self.path.clone(),
            query: String::new(),
        }
    }

    /// URI of the parent directory (query dropped).
    pub fn parent(&self) -> Self {
        Self::new(self.scheme.clone(), dirname(&self.path))
    }

    /// URI of a child entry (query dropped).
    pub fn join(&self, name: &str) -> Self {
        Self::new(self.scheme.clone(), posix_join(&self.path, name))
    }

    /// Last path segment.
    pub fn file_name(&self) -> &str {
        basename(&self.path)
    }

    /// Non-empty path segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.path.split('/').filter(|s| !s.is_empty())
    }

    /// Value of the first query parameter named `key`.
    pub fn query_value(&self, key: &str) -> Option<String> {
        form_urlencoded::parse(self.query.as_bytes())
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    /// True when the query contains `key`, whatever its value.
    pub fn has_query(&self, key: &str) -> bool {
        form_urlencoded::parse(self.query.as_bytes()).any(|(k, _)| k == key)
    }

    pub fn is_conflict(&self) -> bool {
        self.has_query(QUERY_CONFLICT)
    }

    pub fn is_in_diff(&self) -> bool {
        self.has_query(QUERY_IN_DIFF)
    }

    pub fn force_upload(&self) -> bool {
        self.has_query(QUERY_FORCE_UPLOAD)
    }

    /// `fetch=true` is present.
    pub fn fetch_requested(&self) -> bool {
        self.query_value(QUERY_FETCH).as_deref() == Some("true")
    }

    pub fn pattern(&self) -> Option<String> {
        self.query_value(QUERY_PATTERN)
    }

    pub fn encoding(&self) -> Option<String> {
        self.query_value(QUERY_ENCODING)
    }
}

impl fmt::Display for DsUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scheme, self.path)?;
        if !self.query.is_empty() {
            write!(f, "?{}", self.query)?;
        }
        Ok(())
    }
}

/// Join two posix paths with exactly one separator.
pub fn posix_join(base: &str, name: &str) -> String {
    let base = base.trim_end_matches('/');
    let name = name.trim_start_matches('/');
    format!("{base}/{name}")
}

/// Parent of a posix path. The parent of `/X` is `/`.
pub fn dirname(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) | None => "/",
        Some(idx) => &trimmed[..idx],
    }
}

/// Final segment of a posix path.
pub fn basename(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}
