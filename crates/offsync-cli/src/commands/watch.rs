//! Watch command implementation.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

use anyhow::Result;
use offsync_core::{AdjustmentGate, BeatmapId, OffsetSyncController, SessionStatics, SyncConfig};
use tracing::{info, warn};

use super::open_store;
use crate::driver;
use crate::input;
use crate::shutdown::ShutdownSignal;

pub fn run(config: &SyncConfig, beatmap: BeatmapId) -> Result<()> {
    let shutdown = Arc::new(ShutdownSignal::new());
    let shutdown_ctrlc = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        info!("Received shutdown signal, stopping...");
        shutdown_ctrlc.trigger();
    })?;
    let _keyboard_handle = input::spawn_keyboard_monitor(Arc::clone(&shutdown));

    let store = open_store(config)?;
    let mut controller = OffsetSyncController::new(
        &store,
        beatmap,
        AdjustmentGate::new(),
        SessionStatics::new(),
        config,
    );
    controller.on_value_changed(move |offset| {
        println!("Beatmap {} offset changed: {}", beatmap, offset);
    });

    println!("Beatmap {} offset: {}", beatmap, controller.current());
    println!("Watching for changes... (Press Esc or q to quit)");

    let path = config.database_path.as_path();
    let mut last_modified = modified_at(path);
    driver::run_until_shutdown(&mut controller, config, &shutdown, || {
        let modified = modified_at(path);
        if modified == last_modified {
            return;
        }

        // A half-written file fails to parse; retry on the next frame
        match store.reload() {
            Ok(_) => last_modified = modified,
            Err(e) => warn!("Failed to reload {}: {}", path.display(), e),
        }
    });

    controller.dispose();
    Ok(())
}

fn modified_at(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}
