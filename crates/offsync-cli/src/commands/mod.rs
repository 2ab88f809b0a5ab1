//! CLI command implementations.
//!
//! This module contains the implementation of each CLI command.

pub mod add;
pub mod calibrate;
pub mod list;
pub mod set;
pub mod show;
pub mod watch;

use anyhow::{Context, Result};
use offsync_core::{BeatmapStore, SyncConfig};

/// Open the database named by the configuration
fn open_store(config: &SyncConfig) -> Result<BeatmapStore> {
    BeatmapStore::open(&config.database_path).with_context(|| {
        format!(
            "Failed to open beatmap database {}",
            config.database_path.display()
        )
    })
}
