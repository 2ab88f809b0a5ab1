use std::fmt;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{HitEvent, HitEventStatistics};
use crate::error::{Error, Result};
use crate::store::BeatmapId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoreId(pub u64);

impl fmt::Display for ScoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A finished play used as the reference for offset calibration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceScore {
    pub id: ScoreId,
    pub beatmap_id: BeatmapId,
    pub played_at: DateTime<Utc>,
    /// Plays without timed input (autoplay and the like) say nothing about the player's timing
    #[serde(default)]
    pub autoplay: bool,
    pub hit_events: Vec<HitEvent>,
}

impl ReferenceScore {
    pub fn new(id: ScoreId, beatmap_id: BeatmapId, hit_events: Vec<HitEvent>) -> Self {
        Self {
            id,
            beatmap_id,
            played_at: Utc::now(),
            autoplay: false,
            hit_events,
        }
    }

    pub fn median_hit_error(&self) -> Option<f64> {
        self.hit_events.median_hit_error()
    }

    pub fn count_basic_hit_events(&self) -> usize {
        self.hit_events.count_basic_hit_events()
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let score: ReferenceScore = serde_json::from_str(&content)?;

        if let Some(event) = score.hit_events.iter().find(|e| !e.time_offset.is_finite()) {
            return Err(Error::InvalidScore(format!(
                "score {} has a non-finite hit offset ({})",
                score.id, event.time_offset
            )));
        }

        Ok(score)
    }
}
