//! # offsync-core
//!
//! Core library for per-beatmap audio offset synchronization.
//!
//! This crate provides:
//! - A bounded offset value and the gate that forbids adjusting it
//! - A single-threaded frame scheduler used to debounce writes
//! - The beatmap store abstraction, a threaded JSON-backed store and a
//!   deterministic manual store
//! - Hit event statistics and reference scores for calibration
//! - `OffsetSyncController`, which keeps the offset and the store in sync
//!   without reacting to the echoes of its own writes

pub mod config;
pub mod control;
pub mod error;
pub mod scheduler;
pub mod score;
pub mod setting;
pub mod store;

pub use config::{SyncConfig, SyncConfigBuilder};
pub use control::{
    CalibrationSuggestion, HitTiming, OffsetSyncController, ScheduledTask, SessionStatics,
};
pub use error::{Error, Result};
pub use scheduler::Scheduler;
pub use score::{HitEvent, HitEventStatistics, HitResult, ReferenceScore, ScoreId};
pub use setting::{AdjustmentGate, Offset};
pub use store::{
    BeatmapDatabase, BeatmapId, BeatmapInfo, BeatmapSetInfo, BeatmapStore, ManualStore,
    OffsetStore, SetId, Subscription, Transaction, UserSettings, WriteCompleter, WriteHandle,
};
