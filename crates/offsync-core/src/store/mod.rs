//! Beatmap storage and change notification.
//!
//! This module holds the persisted side of the offset:
//!
//! - **Beatmap model**: sets, difficulties and their user settings
//! - **Write handles**: completion of asynchronous transactions
//! - **Subscriptions**: per-beatmap offset change notifications
//! - **Stores**: a threaded JSON-backed store and a manually driven one
//!
//! ## Ordering
//!
//! Both stores apply transactions in submission order. A transaction's
//! handle is marked completed before the notifications it causes are
//! delivered, so a subscriber that sees a notification for its own write
//! can always tell the write has finished.

mod beatmap;
mod beatmap_store;
mod handle;
mod manual;
mod subscription;

use std::sync::Arc;

pub use beatmap::{BeatmapDatabase, BeatmapId, BeatmapInfo, BeatmapSetInfo, SetId, UserSettings};
pub use beatmap_store::BeatmapStore;
pub use handle::{WriteCompleter, WriteHandle};
pub use manual::ManualStore;
pub use subscription::Subscription;

/// Mutation run against the database by the store's writer
pub type Transaction = Box<dyn FnOnce(&mut BeatmapDatabase) + Send>;

/// Store holding per-beatmap offsets
pub trait OffsetStore {
    /// Register for offset changes of `beatmap`.
    ///
    /// The current offset is delivered as the first notification when the
    /// beatmap exists.
    fn subscribe(&self, beatmap: BeatmapId) -> Subscription;

    /// Submit a transaction to run asynchronously.
    fn write(&self, transaction: Transaction) -> WriteHandle;
}

impl<S: OffsetStore + ?Sized> OffsetStore for &S {
    fn subscribe(&self, beatmap: BeatmapId) -> Subscription {
        (**self).subscribe(beatmap)
    }

    fn write(&self, transaction: Transaction) -> WriteHandle {
        (**self).write(transaction)
    }
}

impl<S: OffsetStore + ?Sized> OffsetStore for Arc<S> {
    fn subscribe(&self, beatmap: BeatmapId) -> Subscription {
        (**self).subscribe(beatmap)
    }

    fn write(&self, transaction: Transaction) -> WriteHandle {
        (**self).write(transaction)
    }
}
