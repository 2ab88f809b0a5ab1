use std::collections::HashMap;
use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tracing::debug;

use super::BeatmapId;
use crate::setting::Offset;

type Release = Box<dyn FnOnce() + Send>;

/// Registration for offset changes of one beatmap.
///
/// Notifications queue up in the subscription until the owner drains them.
/// Dropping the subscription unregisters it from the store.
pub struct Subscription {
    beatmap: BeatmapId,
    receiver: Receiver<Offset>,
    release: Option<Release>,
}

impl Subscription {
    pub fn new<F>(beatmap: BeatmapId, receiver: Receiver<Offset>, release: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            beatmap,
            receiver,
            release: Some(Box::new(release)),
        }
    }

    pub fn beatmap(&self) -> BeatmapId {
        self.beatmap
    }

    /// All queued notifications, oldest first
    pub fn drain(&self) -> Vec<Offset> {
        self.receiver.try_iter().collect()
    }

    /// Unregister from the store
    pub fn dispose(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            debug!("Disposing subscription for beatmap {}", self.beatmap);
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("beatmap", &self.beatmap)
            .field("disposed", &self.release.is_none())
            .finish()
    }
}

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    entries: HashMap<u64, (BeatmapId, Sender<Offset>)>,
}

/// Subscriber bookkeeping shared by the store implementations
#[derive(Default)]
pub(crate) struct SubscriberRegistry {
    inner: Mutex<Subscribers>,
}

impl SubscriberRegistry {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register a subscriber, queueing `initial` as its first notification.
    pub(crate) fn register(
        self: &Arc<Self>,
        beatmap: BeatmapId,
        initial: Option<Offset>,
    ) -> Subscription {
        let (sender, receiver) = mpsc::channel();
        if let Some(offset) = initial {
            // The receiver is alive, this cannot fail
            let _ = sender.send(offset);
        }

        let id = {
            let mut inner = self.lock();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.entries.insert(id, (beatmap, sender));
            id
        };

        let registry: Weak<Self> = Arc::downgrade(self);
        Subscription::new(beatmap, receiver, move || {
            if let Some(registry) = registry.upgrade() {
                registry.lock().entries.remove(&id);
            }
        })
    }

    /// Deliver changed offsets to the subscribers of each beatmap.
    pub(crate) fn notify(&self, changes: &[(BeatmapId, Offset)]) {
        if changes.is_empty() {
            return;
        }

        let mut inner = self.lock();
        inner.entries.retain(|_, (beatmap, sender)| {
            changes
                .iter()
                .filter(|(changed, _)| *changed == *beatmap)
                .all(|(_, offset)| sender.send(*offset).is_ok())
        });
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().entries.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Subscribers> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
