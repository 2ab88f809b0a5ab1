//! Calibrate command implementation.

use std::path::Path;

use anyhow::{Context, Result, bail};
use offsync_core::{
    AdjustmentGate, BeatmapId, HitEventStatistics, OffsetSyncController, ReferenceScore,
    SessionStatics, SyncConfig,
};

use super::open_store;
use crate::driver;

pub fn run(
    config: &SyncConfig,
    beatmap: BeatmapId,
    score_path: &Path,
    dry_run: bool,
) -> Result<()> {
    let score = ReferenceScore::load_from_path(score_path)
        .with_context(|| format!("Failed to load score {}", score_path.display()))?;

    let store = open_store(config)?;
    store.offset(beatmap)?;

    let mut controller = OffsetSyncController::new(
        &store,
        beatmap,
        AdjustmentGate::new(),
        SessionStatics::new(),
        config,
    );

    if !controller.set_reference_score(Some(&score)) {
        bail!(
            "Score {} cannot calibrate beatmap {}: it must be a timed play of this beatmap with at least {} hits",
            score.id,
            beatmap,
            config.minimum_basic_hit_events
        );
    }

    println!("{}", describe_score(&score));
    if let Some(suggestion) = controller.suggestion() {
        println!("{}", suggestion);
    }

    if dry_run {
        return Ok(());
    }

    if !controller.calibrate_from_reference() {
        println!("Offset already matches this play ({})", controller.current());
        return Ok(());
    }

    driver::run_until_settled(&mut controller, config)?;
    println!("Beatmap {} offset is now {}", beatmap, store.offset(beatmap)?);
    Ok(())
}

/// One-line timing summary of a play
fn describe_score(score: &ReferenceScore) -> String {
    let events = score.hit_events.as_slice();
    let mut line = format!(
        "Score {}: {} hits played {}",
        score.id,
        score.count_basic_hit_events(),
        score.played_at.format("%Y-%m-%d %H:%M")
    );
    if let Some(average) = events.average_hit_error() {
        line.push_str(&format!(", mean error {:+.1}ms", average));
    }
    if let Some(unstable_rate) = events.unstable_rate() {
        line.push_str(&format!(", unstable rate {:.1}", unstable_rate));
    }
    line
}
