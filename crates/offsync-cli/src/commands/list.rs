//! List command implementation.

use anyhow::Result;
use offsync_core::SyncConfig;

use super::open_store;

pub fn run(config: &SyncConfig) -> Result<()> {
    let store = open_store(config)?;
    let database = store.snapshot();

    if database.is_empty() {
        println!("No beatmaps in {}", config.database_path.display());
        return Ok(());
    }

    for set in database.sets() {
        println!("[{}] {}", set.id, set.title);
        for beatmap in &set.beatmaps {
            println!(
                "  {:>8}  {:<20} {:<24} {:>7}",
                beatmap.id.0,
                beatmap.difficulty_name,
                beatmap.audio_file,
                beatmap.user_settings.offset.to_string()
            );
        }
    }

    Ok(())
}
