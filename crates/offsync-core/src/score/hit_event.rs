use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr};

/// Judgement given to a single hit
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, IntoStaticStr, Display,
)]
#[serde(rename_all = "snake_case")]
pub enum HitResult {
    #[default]
    #[strum(serialize = "NONE")]
    None,
    #[strum(serialize = "MISS")]
    Miss,
    #[strum(serialize = "MEH")]
    Meh,
    #[strum(serialize = "OK")]
    Ok,
    #[strum(serialize = "GOOD")]
    Good,
    #[strum(serialize = "GREAT")]
    Great,
    #[strum(serialize = "PERFECT")]
    Perfect,
    #[strum(serialize = "SMALL TICK MISS")]
    SmallTickMiss,
    #[strum(serialize = "SMALL TICK HIT")]
    SmallTickHit,
    #[strum(serialize = "LARGE TICK MISS")]
    LargeTickMiss,
    #[strum(serialize = "LARGE TICK HIT")]
    LargeTickHit,
    #[strum(serialize = "SMALL BONUS")]
    SmallBonus,
    #[strum(serialize = "LARGE BONUS")]
    LargeBonus,
    #[strum(serialize = "IGNORE MISS")]
    IgnoreMiss,
    #[strum(serialize = "IGNORE HIT")]
    IgnoreHit,
}

impl HitResult {
    /// Judgement of a primary hit object (not a tick, bonus or ignored result)
    pub fn is_basic(&self) -> bool {
        matches!(
            self,
            Self::Miss | Self::Meh | Self::Ok | Self::Good | Self::Great | Self::Perfect
        )
    }

    pub fn is_hit(&self) -> bool {
        !matches!(
            self,
            Self::None | Self::Miss | Self::SmallTickMiss | Self::LargeTickMiss | Self::IgnoreMiss
        )
    }

    /// Whether the hit's timing error counts towards timing statistics
    pub fn affects_unstable_rate(&self) -> bool {
        self.is_basic() && self.is_hit()
    }

    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

/// A judged hit and how far off its timing was
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitEvent {
    /// Hit time minus object time in milliseconds (negative = early)
    pub time_offset: f64,
    pub result: HitResult,
}

impl HitEvent {
    pub fn new(time_offset: f64, result: HitResult) -> Self {
        Self {
            time_offset,
            result,
        }
    }
}

/// Timing statistics over a play's hit events
pub trait HitEventStatistics {
    /// Median timing error of the hits that affect unstable rate
    fn median_hit_error(&self) -> Option<f64>;

    /// Mean timing error of the hits that affect unstable rate
    fn average_hit_error(&self) -> Option<f64>;

    /// Ten times the standard deviation of the timing error
    fn unstable_rate(&self) -> Option<f64>;

    fn count_where<P>(&self, predicate: P) -> usize
    where
        P: FnMut(&HitEvent) -> bool;

    fn count_basic_hit_events(&self) -> usize {
        self.count_where(|e| e.result.is_basic())
    }
}

impl HitEventStatistics for [HitEvent] {
    fn median_hit_error(&self) -> Option<f64> {
        let mut offsets = timed_offsets(self);
        if offsets.is_empty() {
            return None;
        }

        offsets.sort_by(f64::total_cmp);
        let center = offsets.len() / 2;
        if offsets.len() % 2 == 0 {
            Some((offsets[center - 1] + offsets[center]) / 2.0)
        } else {
            Some(offsets[center])
        }
    }

    fn average_hit_error(&self) -> Option<f64> {
        let offsets = timed_offsets(self);
        if offsets.is_empty() {
            return None;
        }
        Some(offsets.iter().sum::<f64>() / offsets.len() as f64)
    }

    fn unstable_rate(&self) -> Option<f64> {
        let offsets = timed_offsets(self);
        let mean = self.average_hit_error()?;
        let variance =
            offsets.iter().map(|o| (o - mean).powi(2)).sum::<f64>() / offsets.len() as f64;
        Some(variance.sqrt() * 10.0)
    }

    fn count_where<P>(&self, mut predicate: P) -> usize
    where
        P: FnMut(&HitEvent) -> bool,
    {
        self.iter().filter(|e| predicate(e)).count()
    }
}

fn timed_offsets(events: &[HitEvent]) -> Vec<f64> {
    events
        .iter()
        .filter(|e| e.result.affects_unstable_rate() && e.time_offset.is_finite())
        .map(|e| e.time_offset)
        .collect()
}
