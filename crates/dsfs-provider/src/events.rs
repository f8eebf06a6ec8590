//! Batched file change notifications.
//!
//! Mutations call [`ChangeNotifier::fire_soon`], which buffers events and
//! restarts a short debounce timer. When the timer expires the whole buffer
//! goes out as one batch, so a directory listing that creates hundreds of
//! entries produces a single notification.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::uri::DsUri;

/// Default debounce before a batch is delivered.
pub const DEFAULT_FIRE_SOON_DELAY: Duration = Duration::from_millis(5);

const CHANNEL_CAPACITY: usize = 256;

/// Kind of change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum FileChangeKind {
    Created,
    Changed,
    Deleted,
}

/// One change to one entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileChangeEvent {
    pub kind: FileChangeKind,
    pub uri: DsUri,
}

impl FileChangeEvent {
    pub fn created(uri: DsUri) -> Self {
        Self {
            kind: FileChangeKind::Created,
            uri,
        }
    }

    pub fn changed(uri: DsUri) -> Self {
        Self {
            kind: FileChangeKind::Changed,
            uri,
        }
    }

    pub fn deleted(uri: DsUri) -> Self {
        Self {
            kind: FileChangeKind::Deleted,
            uri,
        }
    }
}

#[derive(Default)]
struct PendingBatch {
    events: Vec<FileChangeEvent>,
    timer: Option<JoinHandle<()>>,
}

/// Coalesces change events and broadcasts them in batches.
pub struct ChangeNotifier {
    tx: broadcast::Sender<Vec<FileChangeEvent>>,
    delay: Duration,
    pending: Arc<Mutex<PendingBatch>>,
}

impl ChangeNotifier {
    pub fn new(delay: Duration) -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            tx,
            delay,
            pending: Arc::new(Mutex::new(PendingBatch::default())),
        }
    }

    pub fn subscribe(&self) -> ChangeSubscription {
        ChangeSubscription {
            rx: self.tx.subscribe(),
        }
    }

    /// Buffer `events` and (re)start the debounce timer.
    ///
    /// Outside a tokio runtime there is no timer to run, so the buffer is
    /// delivered immediately.
    pub fn fire_soon(&self, events: impl IntoIterator<Item = FileChangeEvent>) {
        let mut pending = self.pending.lock();
        pending.events.extend(events);
        if let Some(timer) = pending.timer.take() {
            timer.abort();
        }

        let Ok(handle) = Handle::try_current() else {
            let batch = std::mem::take(&mut pending.events);
            drop(pending);
            self.send(batch);
            return;
        };

        let shared = Arc::clone(&self.pending);
        let tx = self.tx.clone();
        let delay = self.delay;
        pending.timer = Some(handle.spawn(async move {
            tokio::time::sleep(delay).await;
            let batch = {
                let mut pending = shared.lock();
                pending.timer = None;
                std::mem::take(&mut pending.events)
            };
            if !batch.is_empty() {
                tracing::trace!(count = batch.len(), "delivering change batch");
                let _ = tx.send(batch);
            }
        }));
    }

    /// Deliver anything buffered right away.
    pub fn flush_now(&self) {
        let batch = {
            let mut pending = self.pending.lock();
            if let Some(timer) = pending.timer.take() {
                timer.abort();
            }
            std::mem::take(&mut pending.events)
        };
        self.send(batch);
    }

    fn send(&self, batch: Vec<FileChangeEvent>) {
        if batch.is_empty() {
            return;
        }
        tracing::trace!(count = batch.len(), "delivering change batch");
        // No subscribers is fine.
        let _ = self.tx.send(batch);
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_FIRE_SOON_DELAY)
    }
}

impl std::fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("delay", &self.delay)
            .field("subscribers", &self.tx.receiver_count())
            .finish_non_exhaustive()
    }
}

/// Receiver side of the change stream.
pub struct ChangeSubscription {
    rx: broadcast::Receiver<Vec<FileChangeEvent>>,
}

impl ChangeSubscription {
    /// Wait for the next batch. Returns None once the provider is dropped.
    pub async fn recv(&mut self) -> Option<Vec<FileChangeEvent>> {
        loop {
            match self.rx.recv().await {
                Ok(batch) => return Some(batch),
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(lagged = n, "change subscription lagged behind");
                }
            }
        }
    }

    /// Take the next batch if one is ready.
    pub fn try_recv(&mut self) -> Option<Vec<FileChangeEvent>> {
        loop {
            match self.rx.try_recv() {
                Ok(batch) => return Some(batch),
                Err(broadcast::error::TryRecvError::Empty)
                | Err(broadcast::error::TryRecvError::Closed) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    tracing::warn!(lagged = n, "change subscription lagged behind");
                }
            }
        }
    }
}

impl std::fmt::Debug for ChangeSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeSubscription").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri(path: &str) -> DsUri {
        DsUri::new("zowe-ds", path)
    }

    #[tokio::test]
    async fn test_events_are_batched() {
        let notifier = ChangeNotifier::new(Duration::from_millis(20));
        let mut sub = notifier.subscribe();

        notifier.fire_soon([FileChangeEvent::created(uri("/lpar/A"))]);
        notifier.fire_soon([FileChangeEvent::created(uri("/lpar/B"))]);
        notifier.fire_soon([FileChangeEvent::changed(uri("/lpar"))]);

        let batch = sub.recv().await.unwrap();
        assert_eq!(batch.len(), 3);
        assert_eq!(batch[0], FileChangeEvent::created(uri("/lpar/A")));
        assert_eq!(batch[2].kind, FileChangeKind::Changed);
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_flush_now() {
        let notifier = ChangeNotifier::new(Duration::from_secs(60));
        let mut sub = notifier.subscribe();
        notifier.fire_soon([FileChangeEvent::deleted(uri("/lpar/A"))]);
        assert!(sub.try_recv().is_none());

        notifier.flush_now();
        let batch = sub.try_recv().unwrap();
        assert_eq!(batch, vec![FileChangeEvent::deleted(uri("/lpar/A"))]);
    }

    #[test]
    fn test_without_runtime_delivers_immediately() {
        let notifier = ChangeNotifier::default();
        let mut sub = notifier.subscribe();
        notifier.fire_soon([FileChangeEvent::changed(uri("/lpar/A"))]);
        assert_eq!(sub.try_recv().unwrap().len(), 1);
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(FileChangeKind::Deleted.to_string(), "deleted");
    }
}
