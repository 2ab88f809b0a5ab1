//! Show command implementation.

use anyhow::{Context, Result};
use offsync_core::{BeatmapId, SyncConfig};

use super::open_store;

pub fn run(config: &SyncConfig, beatmap: BeatmapId) -> Result<()> {
    let store = open_store(config)?;
    let database = store.snapshot();
    let info = database
        .find_beatmap(beatmap)
        .with_context(|| format!("Beatmap {} is not in the database", beatmap))?;

    println!("Beatmap:    {} ({})", info.id, info.difficulty_name);
    println!("Audio:      {}", info.audio_file);
    println!("Offset:     {}", info.user_settings.offset);

    let siblings: Vec<String> = database
        .beatmaps()
        .filter(|b| b.id != info.id && b.audio_equals(info))
        .map(|b| format!("{} ({})", b.id, b.difficulty_name))
        .collect();
    if !siblings.is_empty() {
        println!("Shared with: {}", siblings.join(", "));
    }

    Ok(())
}
