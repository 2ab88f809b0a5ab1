use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use super::subscription::SubscriberRegistry;
use super::{
    BeatmapDatabase, BeatmapId, BeatmapSetInfo, OffsetStore, Subscription, Transaction,
    WriteCompleter, WriteHandle,
};
use crate::setting::Offset;

struct QueuedWrite {
    transaction: Transaction,
    completer: WriteCompleter,
}

/// Store whose writes only run when told to.
///
/// Submitted transactions wait in a queue until [`ManualStore::complete_next`]
/// commits them, which makes every interleaving of writes and notifications
/// reproducible. Used for isolated setups without a database file.
pub struct ManualStore {
    database: Mutex<BeatmapDatabase>,
    queue: Mutex<VecDeque<QueuedWrite>>,
    subscribers: Arc<SubscriberRegistry>,
    submitted: Mutex<usize>,
}

impl ManualStore {
    pub fn new(database: BeatmapDatabase) -> Self {
        Self {
            database: Mutex::new(database),
            queue: Mutex::new(VecDeque::new()),
            subscribers: SubscriberRegistry::new(),
            submitted: Mutex::new(0),
        }
    }

    pub fn insert_set(&self, set: BeatmapSetInfo) {
        lock(&self.database).insert_set(set);
    }

    pub fn offset(&self, beatmap: BeatmapId) -> Option<Offset> {
        lock(&self.database).offset_of(beatmap)
    }

    /// Writes submitted but not yet committed
    pub fn pending_writes(&self) -> usize {
        lock(&self.queue).len()
    }

    /// Total number of writes ever submitted
    pub fn writes_submitted(&self) -> usize {
        *lock(&self.submitted)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Commit the oldest queued write, then notify subscribers.
    ///
    /// Returns `false` if nothing was queued.
    pub fn complete_next(&self) -> bool {
        let Some(write) = lock(&self.queue).pop_front() else {
            return false;
        };

        let changes = lock(&self.database).apply(write.transaction);
        write.completer.complete();
        self.subscribers.notify(&changes);
        true
    }

    /// Commit every queued write, returning how many ran
    pub fn complete_all(&self) -> usize {
        let mut completed = 0;
        while self.complete_next() {
            completed += 1;
        }
        completed
    }

    /// Commit the oldest queued write without notifying anyone.
    ///
    /// Models a store that finishes a write before its change notification
    /// has been delivered. Returns the changes that would have been announced.
    pub fn complete_next_silently(&self) -> Option<Vec<(BeatmapId, Offset)>> {
        let write = lock(&self.queue).pop_front()?;
        let changes = lock(&self.database).apply(write.transaction);
        write.completer.complete();
        Some(changes)
    }

    /// Set an offset as another writer would, notifying subscribers at once
    pub fn external_write(&self, beatmap: BeatmapId, offset: Offset) {
        let changes = lock(&self.database).apply(|db| {
            if let Some(b) = db.find_beatmap_mut(beatmap) {
                b.user_settings.offset = offset;
            }
        });
        debug!("External write to beatmap {}: {:?}", beatmap, changes);
        self.subscribers.notify(&changes);
    }

    /// Deliver a raw notification without touching the database
    pub fn notify(&self, beatmap: BeatmapId, offset: Offset) {
        self.subscribers.notify(&[(beatmap, offset)]);
    }
}

impl Default for ManualStore {
    fn default() -> Self {
        Self::new(BeatmapDatabase::new())
    }
}

impl OffsetStore for ManualStore {
    fn subscribe(&self, beatmap: BeatmapId) -> Subscription {
        let database = lock(&self.database);
        self.subscribers
            .register(beatmap, database.offset_of(beatmap))
    }

    fn write(&self, transaction: Transaction) -> WriteHandle {
        let (handle, completer) = WriteHandle::pending();
        lock(&self.queue).push_back(QueuedWrite {
            transaction,
            completer,
        });
        *lock(&self.submitted) += 1;
        handle
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
