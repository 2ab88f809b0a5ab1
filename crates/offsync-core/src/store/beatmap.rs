use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::setting::Offset;

/// Identity of a single difficulty
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BeatmapId(pub u32);

/// Identity of a beatmap set (all difficulties of one song upload)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SetId(pub u32);

impl fmt::Display for BeatmapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for SetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-user settings attached to a beatmap
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UserSettings {
    #[serde(default)]
    pub offset: Offset,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeatmapInfo {
    pub id: BeatmapId,
    pub set_id: SetId,
    pub difficulty_name: String,
    /// Audio file name within the set; difficulties naming the same file share a track
    pub audio_file: String,
    #[serde(default)]
    pub user_settings: UserSettings,
}

impl BeatmapInfo {
    pub fn new(
        id: BeatmapId,
        set_id: SetId,
        difficulty_name: impl Into<String>,
        audio_file: impl Into<String>,
    ) -> Self {
        Self {
            id,
            set_id,
            difficulty_name: difficulty_name.into(),
            audio_file: audio_file.into(),
            user_settings: UserSettings::default(),
        }
    }

    /// Check whether both beatmaps play the same audio track
    pub fn audio_equals(&self, other: &BeatmapInfo) -> bool {
        self.set_id == other.set_id && self.audio_file == other.audio_file
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeatmapSetInfo {
    pub id: SetId,
    pub title: String,
    pub beatmaps: Vec<BeatmapInfo>,
}

impl BeatmapSetInfo {
    pub fn new(id: SetId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            beatmaps: Vec::new(),
        }
    }

    /// Add a beatmap to this set, re-parenting it if needed
    pub fn add_beatmap(&mut self, mut beatmap: BeatmapInfo) {
        beatmap.set_id = self.id;
        self.beatmaps.retain(|b| b.id != beatmap.id);
        self.beatmaps.push(beatmap);
    }

    pub fn with_beatmap(mut self, beatmap: BeatmapInfo) -> Self {
        self.add_beatmap(beatmap);
        self
    }
}

/// All beatmap sets known to a store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BeatmapDatabase {
    #[serde(default)]
    sets: BTreeMap<SetId, BeatmapSetInfo>,
}

impl BeatmapDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a set, returning the previous one
    pub fn insert_set(&mut self, set: BeatmapSetInfo) -> Option<BeatmapSetInfo> {
        self.sets.insert(set.id, set)
    }

    pub fn find_set(&self, id: SetId) -> Option<&BeatmapSetInfo> {
        self.sets.get(&id)
    }

    pub fn find_set_mut(&mut self, id: SetId) -> Option<&mut BeatmapSetInfo> {
        self.sets.get_mut(&id)
    }

    pub fn find_beatmap(&self, id: BeatmapId) -> Option<&BeatmapInfo> {
        self.beatmaps().find(|b| b.id == id)
    }

    pub fn find_beatmap_mut(&mut self, id: BeatmapId) -> Option<&mut BeatmapInfo> {
        self.sets
            .values_mut()
            .flat_map(|s| s.beatmaps.iter_mut())
            .find(|b| b.id == id)
    }

    pub fn beatmaps(&self) -> impl Iterator<Item = &BeatmapInfo> {
        self.sets.values().flat_map(|s| s.beatmaps.iter())
    }

    pub fn sets(&self) -> impl Iterator<Item = &BeatmapSetInfo> {
        self.sets.values()
    }

    pub fn offset_of(&self, id: BeatmapId) -> Option<Offset> {
        self.find_beatmap(id).map(|b| b.user_settings.offset)
    }

    /// Run `mutate` and report every beatmap whose offset changed, in database order.
    pub fn apply<F>(&mut self, mutate: F) -> Vec<(BeatmapId, Offset)>
    where
        F: FnOnce(&mut BeatmapDatabase),
    {
        let before: BTreeMap<BeatmapId, Offset> = self
            .beatmaps()
            .map(|b| (b.id, b.user_settings.offset))
            .collect();

        mutate(self);

        self.beatmaps()
            .filter(|b| before.get(&b.id) != Some(&b.user_settings.offset))
            .map(|b| (b.id, b.user_settings.offset))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let database: BeatmapDatabase = serde_json::from_str(&content)?;
        debug!(
            "Loaded {} beatmap sets from {}",
            database.len(),
            path.as_ref().display()
        );
        Ok(database)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}
