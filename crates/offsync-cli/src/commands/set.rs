//! Set command implementation.

use anyhow::{Result, bail};
use offsync_core::{
    AdjustmentGate, BeatmapId, BeatmapStore, Offset, OffsetSyncController, SessionStatics,
    SyncConfig,
};

use super::open_store;
use crate::driver;

pub fn run(config: &SyncConfig, beatmap: BeatmapId, offset: f64) -> Result<()> {
    let store = open_store(config)?;
    let previous = store.offset(beatmap)?;
    let committed = set_offset(&store, config, beatmap, offset)?;

    if committed.as_ms() != offset {
        println!("Requested {}ms, stored as {}", offset, committed);
    }
    println!("Beatmap {}: {} -> {}", beatmap, previous, committed);
    Ok(())
}

/// Change the offset through a controller and wait for the write to land.
fn set_offset(
    store: &BeatmapStore,
    config: &SyncConfig,
    beatmap: BeatmapId,
    offset: f64,
) -> Result<Offset> {
    let mut controller = OffsetSyncController::new(
        store,
        beatmap,
        AdjustmentGate::new(),
        SessionStatics::new(),
        config,
    );

    if !controller.set_value(offset) {
        bail!("Offset adjustment is disabled");
    }
    driver::run_until_settled(&mut controller, config)?;
    controller.dispose();

    Ok(store.offset(beatmap)?)
}
