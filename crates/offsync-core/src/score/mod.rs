//! Scores and hit timing statistics.
//!
//! A reference score's hit events tell how early or late the player hit on
//! average, which is what offset calibration corrects for.

mod hit_event;
mod reference;

pub use hit_event::{HitEvent, HitEventStatistics, HitResult};
pub use reference::{ReferenceScore, ScoreId};
