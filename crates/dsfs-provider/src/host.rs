//! Host editor callbacks.
//!
//! The provider never talks to a UI directly. Everything user-facing goes
//! through [`EditorHost`], which the embedding editor implements.

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

use crate::uri::DsUri;

/// The user's answer to an upload conflict prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum ConflictViewSelection {
    /// Open a diff of the remote and local versions.
    Compare,
    /// Replace the remote copy with the local one.
    Overwrite,
    /// The prompt was closed without a choice.
    UserDismissed,
}

/// A status message that stays visible until dropped.
pub struct StatusIndicator {
    dispose: Option<Box<dyn FnOnce() + Send>>,
}

impl StatusIndicator {
    /// Indicator that runs `dispose` when released.
    pub fn new(dispose: impl FnOnce() + Send + 'static) -> Self {
        Self {
            dispose: Some(Box::new(dispose)),
        }
    }

    /// Indicator with nothing to release.
    pub fn noop() -> Self {
        Self { dispose: None }
    }

    /// Release now instead of at end of scope.
    pub fn dispose(self) {}
}

impl Drop for StatusIndicator {
    fn drop(&mut self) {
        if let Some(dispose) = self.dispose.take() {
            dispose();
        }
    }
}

impl fmt::Debug for StatusIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusIndicator")
            .field("active", &self.dispose.is_some())
            .finish()
    }
}

/// Editor-side operations the provider relies on.
#[async_trait]
pub trait EditorHost: Send + Sync {
    /// Re-render an open editor showing `uri` with the latest contents.
    async fn reload_editor(&self, _uri: &DsUri) {}

    /// Show an error message to the user.
    fn show_error(&self, message: &str);

    /// Show a transient informational message.
    fn show_message(&self, _message: &str, _timeout: Duration) {}

    /// Show a status message until the returned indicator is dropped.
    fn set_status(&self, _message: &str) -> StatusIndicator {
        StatusIndicator::noop()
    }

    /// Ask how to resolve an upload conflict on `name`.
    async fn prompt_conflict(&self, uri: &DsUri, name: &str) -> ConflictViewSelection;

    /// Open a diff between the remote snapshot and the local buffer.
    async fn open_diff(&self, _remote: &DsUri, _local: &DsUri, _title: &str) {}
}

/// Host that shows nothing and dismisses every prompt.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHost;

#[async_trait]
impl EditorHost for NoopHost {
    fn show_error(&self, message: &str) {
        tracing::warn!(message, "provider error with no host attached");
    }

    async fn prompt_conflict(&self, _uri: &DsUri, _name: &str) -> ConflictViewSelection {
        ConflictViewSelection::UserDismissed
    }
}
