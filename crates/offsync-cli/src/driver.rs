//! Frame loop driving a controller from the command line.

use std::thread;
use std::time::Instant;

use anyhow::{Result, bail};
use offsync_core::{OffsetStore, OffsetSyncController, SyncConfig};
use tracing::debug;

use crate::shutdown::ShutdownSignal;

/// Run frames until the controller has nothing scheduled and no write in flight.
pub fn run_until_settled<S: OffsetStore>(
    controller: &mut OffsetSyncController<S>,
    config: &SyncConfig,
) -> Result<()> {
    let deadline = Instant::now() + config.settle_timeout;
    let mut frames = 0u32;

    loop {
        controller.update();
        frames += 1;

        if controller.is_settled() {
            debug!("Settled after {} frames", frames);
            return Ok(());
        }

        if Instant::now() >= deadline {
            bail!(
                "Offset write did not settle within {}ms",
                config.settle_timeout.as_millis()
            );
        }

        thread::sleep(config.frame_interval);
    }
}

/// Run frames until shutdown is requested, calling `before_frame` ahead of each one.
pub fn run_until_shutdown<S, F>(
    controller: &mut OffsetSyncController<S>,
    config: &SyncConfig,
    shutdown: &ShutdownSignal,
    mut before_frame: F,
) where
    S: OffsetStore,
    F: FnMut(),
{
    loop {
        before_frame();
        controller.update();
        if shutdown.wait(config.frame_interval) {
            break;
        }
    }
}
