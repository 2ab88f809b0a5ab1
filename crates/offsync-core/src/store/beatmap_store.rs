use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};

use super::subscription::SubscriberRegistry;
use super::{
    BeatmapDatabase, BeatmapId, BeatmapSetInfo, OffsetStore, Subscription, Transaction,
    WriteCompleter, WriteHandle,
};
use crate::error::{Error, Result};
use crate::setting::Offset;

struct WriteRequest {
    transaction: Transaction,
    completer: WriteCompleter,
}

struct Shared {
    database: Mutex<BeatmapDatabase>,
    subscribers: Arc<SubscriberRegistry>,
    path: Option<PathBuf>,
}

impl Shared {
    fn database(&self) -> MutexGuard<'_, BeatmapDatabase> {
        self.database.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, database: &BeatmapDatabase) {
        if let Some(path) = &self.path
            && let Err(e) = database.save_to_path(path)
        {
            warn!("Failed to save beatmap database to {}: {}", path.display(), e);
        }
    }
}

/// Beatmap store with a background writer thread.
///
/// Transactions run on the writer in submission order. When opened from a
/// file, the database is saved back after every transaction that changed an
/// offset. Dropping the store finishes queued transactions before the writer
/// exits.
pub struct BeatmapStore {
    shared: Arc<Shared>,
    sender: Option<Sender<WriteRequest>>,
    worker: Option<JoinHandle<()>>,
}

impl BeatmapStore {
    /// Create a store that is never persisted
    pub fn in_memory() -> Self {
        Self::with_database(BeatmapDatabase::new(), None)
    }

    /// Open a JSON-backed store, starting empty if the file does not exist yet
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let database = match BeatmapDatabase::load_from_path(path) {
            Ok(database) => database,
            Err(e) if e.is_not_found() => {
                info!("No beatmap database at {}, starting empty", path.display());
                BeatmapDatabase::new()
            }
            Err(e) => return Err(e),
        };
        Ok(Self::with_database(database, Some(path.to_path_buf())))
    }

    pub fn with_database(database: BeatmapDatabase, path: Option<PathBuf>) -> Self {
        let shared = Arc::new(Shared {
            database: Mutex::new(database),
            subscribers: SubscriberRegistry::new(),
            path,
        });

        let (sender, receiver) = mpsc::channel();
        let worker_shared = Arc::clone(&shared);
        let worker = thread::spawn(move || run_writer(worker_shared, receiver));

        Self {
            shared,
            sender: Some(sender),
            worker: Some(worker),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.shared.path.as_deref()
    }

    /// Insert or replace a beatmap set and save the database.
    ///
    /// This bypasses the writer and does not notify subscribers.
    pub fn insert_set(&self, set: BeatmapSetInfo) -> Result<()> {
        let mut database = self.shared.database();
        debug!("Inserting beatmap set {} ({})", set.id, set.title);
        database.insert_set(set);
        if let Some(path) = &self.shared.path {
            database.save_to_path(path)?;
        }
        Ok(())
    }

    /// Last committed offset of `beatmap`
    pub fn offset(&self, beatmap: BeatmapId) -> Result<Offset> {
        self.shared
            .database()
            .offset_of(beatmap)
            .ok_or(Error::BeatmapNotFound(beatmap))
    }

    /// Copy of the committed database
    pub fn snapshot(&self) -> BeatmapDatabase {
        self.shared.database().clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.subscribers.len()
    }

    /// Re-read the database file, notifying subscribers of offsets another
    /// process changed. Returns the number of beatmaps whose offset changed.
    pub fn reload(&self) -> Result<usize> {
        let Some(path) = &self.shared.path else {
            return Ok(0);
        };

        let loaded = BeatmapDatabase::load_from_path(path)?;
        let changes = self.shared.database().apply(|db| *db = loaded);
        if !changes.is_empty() {
            debug!("Reloaded {}: {} offsets changed", path.display(), changes.len());
        }

        self.shared.subscribers.notify(&changes);
        Ok(changes.len())
    }
}

impl OffsetStore for BeatmapStore {
    fn subscribe(&self, beatmap: BeatmapId) -> Subscription {
        // Holding the database lock keeps a concurrent commit from slipping
        // between the initial read and the registration.
        let database = self.shared.database();
        let initial = database.offset_of(beatmap);
        let subscription = self.shared.subscribers.register(beatmap, initial);
        drop(database);

        debug!("Subscribed to beatmap {} (initial: {:?})", beatmap, initial);
        subscription
    }

    fn write(&self, transaction: Transaction) -> WriteHandle {
        let (handle, completer) = WriteHandle::pending();
        let request = WriteRequest {
            transaction,
            completer,
        };

        match &self.sender {
            Some(sender) => {
                if sender.send(request).is_err() {
                    warn!("Beatmap store writer has stopped, dropping write");
                }
            }
            None => warn!("Beatmap store is shut down, dropping write"),
        }

        handle
    }
}

impl Drop for BeatmapStore {
    fn drop(&mut self) {
        self.sender.take();
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            warn!("Beatmap store writer panicked");
        }
    }
}

fn run_writer(shared: Arc<Shared>, receiver: Receiver<WriteRequest>) {
    debug!("Beatmap store writer started");

    for request in receiver {
        let changes = {
            let mut database = shared.database();
            let changes = database.apply(request.transaction);
            if !changes.is_empty() {
                shared.persist(&database);
            }
            changes
        };

        request.completer.complete();
        shared.subscribers.notify(&changes);
    }

    debug!("Beatmap store writer stopped");
}
