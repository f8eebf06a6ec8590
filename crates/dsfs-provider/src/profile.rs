//! Connection profiles and the split between local and remote paths.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::uri::DsUri;

/// A named connection configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Profile name, the first path segment of every URI.
    pub name: String,
    /// Connection type (e.g. `zosmf`). Selects the remote API implementation.
    #[serde(default = "default_profile_type")]
    pub profile_type: String,
    /// Default codepage for text transfers.
    #[serde(default)]
    pub encoding: Option<String>,
    /// Response timeout in seconds passed through to remote calls.
    #[serde(default)]
    pub response_timeout: Option<u64>,
}

fn default_profile_type() -> String {
    "zosmf".to_string()
}

impl Profile {
    /// Create a profile with the default connection type.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            profile_type: default_profile_type(),
            encoding: None,
            response_timeout: None,
        }
    }

    pub fn with_profile_type(mut self, profile_type: impl Into<String>) -> Self {
        self.profile_type = profile_type.into();
        self
    }

    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    pub fn with_response_timeout(mut self, secs: u64) -> Self {
        self.response_timeout = Some(secs);
        self
    }
}

/// Looks up profiles by name.
pub trait ProfileResolver: Send + Sync {
    fn profile(&self, name: &str) -> Option<Arc<Profile>>;
}

/// Fixed set of profiles, usually built from configuration.
#[derive(Debug, Default, Clone)]
pub struct StaticProfiles {
    profiles: HashMap<String, Arc<Profile>>,
}

impl StaticProfiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a profile.
    pub fn insert(&mut self, profile: Profile) -> Arc<Profile> {
        let profile = Arc::new(profile);
        self.profiles
            .insert(profile.name.clone(), Arc::clone(&profile));
        profile
    }

    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.insert(profile);
        self
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl FromIterator<Profile> for StaticProfiles {
    fn from_iter<I: IntoIterator<Item = Profile>>(iter: I) -> Self {
        let mut profiles = Self::new();
        for profile in iter {
            profiles.insert(profile);
        }
        profiles
    }
}

impl ProfileResolver for StaticProfiles {
    fn profile(&self, name: &str) -> Option<Arc<Profile>> {
        self.profiles.get(name).cloned()
    }
}

/// A URI split into its profile and remote parts.
#[derive(Debug, Clone)]
pub struct UriInfo {
    /// First path segment.
    pub profile_name: String,
    /// Resolved profile, if one is registered under `profile_name`.
    pub profile: Option<Arc<Profile>>,
    /// Path below the profile, starting with `/` (`/` for the profile root).
    pub remote_path: String,
    /// True when the URI addresses the profile root itself.
    pub is_root: bool,
}

impl UriInfo {
    /// Remote path segments: data set name, then member name.
    pub fn remote_segments(&self) -> Vec<&str> {
        self.remote_path.split('/').filter(|s| !s.is_empty()).collect()
    }
}

/// Split `/<profile>/<rest>` into profile name, profile and remote path.
pub fn resolve_profile_and_path(uri: &DsUri, resolver: &dyn ProfileResolver) -> UriInfo {
    let mut segments = uri.segments();
    let profile_name = segments.next().unwrap_or_default().to_string();
    let rest: Vec<&str> = segments.collect();
    let remote_path = format!("/{}", rest.join("/"));
    let profile = if profile_name.is_empty() {
        None
    } else {
        resolver.profile(&profile_name)
    };

    UriInfo {
        is_root: rest.is_empty(),
        profile_name,
        profile,
        remote_path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> StaticProfiles {
        StaticProfiles::new().with_profile(Profile::new("lpar").with_encoding("IBM-1047"))
    }

    #[test]
    fn test_resolve_member_path() {
        let uri = DsUri::new("zowe-ds", "/lpar/USER.PDS/MEM");
        let info = resolve_profile_and_path(&uri, &resolver());
        assert_eq!(info.profile_name, "lpar");
        assert_eq!(info.remote_path, "/USER.PDS/MEM");
        assert!(!info.is_root);
        assert_eq!(info.remote_segments(), vec!["USER.PDS", "MEM"]);
        let profile = info.profile.unwrap();
        assert_eq!(profile.encoding.as_deref(), Some("IBM-1047"));
    }

    #[test]
    fn test_resolve_profile_root() {
        let info = resolve_profile_and_path(&DsUri::new("zowe-ds", "/lpar"), &resolver());
        assert!(info.is_root);
        assert_eq!(info.remote_path, "/");
    }

    #[test]
    fn test_resolve_unknown_profile() {
        let info = resolve_profile_and_path(&DsUri::new("zowe-ds", "/other/A.B"), &resolver());
        assert_eq!(info.profile_name, "other");
        assert!(info.profile.is_none());
    }

    #[test]
    fn test_static_profiles_from_iter() {
        let profiles: StaticProfiles = vec![Profile::new("a"), Profile::new("b")]
            .into_iter()
            .collect();
        assert_eq!(profiles.len(), 2);
        assert!(profiles.profile("b").is_some());
        assert!(profiles.profile("c").is_none());
    }

    #[test]
    fn test_profile_deserialize_defaults() {
        let profile: Profile = serde_json::from_str(r#"{"name":"lpar"}"#).unwrap();
        assert_eq!(profile.profile_type, "zosmf");
        assert!(profile.response_timeout.is_none());
    }
}
