//! Add-beatmap command implementation.

use anyhow::{Result, bail};
use offsync_core::{BeatmapId, BeatmapInfo, BeatmapSetInfo, BeatmapStore, SetId, SyncConfig};

use super::open_store;

pub struct NewBeatmap {
    pub set: u32,
    pub beatmap: u32,
    pub audio: String,
    pub difficulty: String,
    pub title: Option<String>,
}

pub fn run(config: &SyncConfig, new: NewBeatmap) -> Result<()> {
    let store = open_store(config)?;
    let beatmap = BeatmapId(new.beatmap);
    let set = add_beatmap(&store, new)?;

    let offset = set
        .beatmaps
        .iter()
        .find(|b| b.id == beatmap)
        .map(|b| b.user_settings.offset)
        .unwrap_or_default();
    println!(
        "Added beatmap {} to set {} ({}), offset {}",
        beatmap, set.id, set.title, offset
    );
    Ok(())
}

/// Insert the beatmap into its set, creating the set if needed.
///
/// A new difficulty inherits the offset already used for its audio track.
fn add_beatmap(store: &BeatmapStore, new: NewBeatmap) -> Result<BeatmapSetInfo> {
    let id = BeatmapId(new.beatmap);
    let set_id = SetId(new.set);
    let database = store.snapshot();

    if let Some(existing) = database.find_beatmap(id)
        && existing.set_id != set_id
    {
        bail!("Beatmap {} already belongs to set {}", id, existing.set_id);
    }

    let mut set = match database.find_set(set_id) {
        Some(set) => set.clone(),
        None => BeatmapSetInfo::new(set_id, new.title.clone().unwrap_or_default()),
    };
    if let Some(title) = new.title {
        set.title = title;
    }

    let mut beatmap = BeatmapInfo::new(id, set_id, new.difficulty, new.audio);
    let previous = set
        .beatmaps
        .iter()
        .find(|b| b.id == id)
        .or_else(|| set.beatmaps.iter().find(|b| b.audio_equals(&beatmap)));
    if let Some(previous) = previous {
        beatmap.user_settings = previous.user_settings;
    }

    set.add_beatmap(beatmap);
    store.insert_set(set.clone())?;
    Ok(set)
}
