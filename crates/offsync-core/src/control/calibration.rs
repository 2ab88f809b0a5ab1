use std::fmt;

use strum::{Display, IntoStaticStr};

use crate::score::ScoreId;
use crate::setting::Offset;

/// Which side of the beat the player's hits landed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr, Display)]
pub enum HitTiming {
    #[strum(serialize = "early")]
    Early,
    #[strum(serialize = "late")]
    Late,
}

/// Offset correction derived from a reference score
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationSuggestion {
    pub score_id: ScoreId,
    /// Median timing error of the reference play (negative = early)
    pub median_error: f64,
    /// Offset that was in effect when the reference score was taken
    pub offset_at_capture: Offset,
}

impl CalibrationSuggestion {
    pub fn new(score_id: ScoreId, median_error: f64, offset_at_capture: Offset) -> Self {
        Self {
            score_id,
            median_error,
            offset_at_capture,
        }
    }

    /// Unclamped target offset in milliseconds
    pub fn target_ms(&self) -> f64 {
        self.offset_at_capture.as_ms() - self.median_error
    }

    /// Offset the setting would take after calibrating
    pub fn suggested(&self) -> Offset {
        Offset::from_ms(self.target_ms())
    }

    pub fn timing(&self) -> HitTiming {
        if self.median_error < 0.0 {
            HitTiming::Early
        } else {
            HitTiming::Late
        }
    }

    pub fn hint(&self) -> String {
        format!(
            "Your hits were on average {:.1}ms {}",
            self.median_error.abs(),
            self.timing()
        )
    }
}

impl fmt::Display for CalibrationSuggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (suggested offset: {})", self.hint(), self.suggested())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_early_hits() {
        let suggestion = CalibrationSuggestion::new(ScoreId(1), -4.2, Offset::from_ms(2.0));
        assert_eq!(suggestion.timing(), HitTiming::Early);
        assert_eq!(suggestion.suggested(), Offset::from_ms(6.2));
        assert_eq!(suggestion.hint(), "Your hits were on average 4.2ms early");
    }

    #[test]
    fn test_late_hits() {
        let suggestion = CalibrationSuggestion::new(ScoreId(1), 3.0, Offset::ZERO);
        assert_eq!(suggestion.timing(), HitTiming::Late);
        assert_eq!(suggestion.suggested(), Offset::from_ms(-3.0));
        assert_eq!(
            suggestion.to_string(),
            "Your hits were on average 3.0ms late (suggested offset: -3.0ms)"
        );
    }

    #[test]
    fn test_suggestion_is_clamped() {
        let suggestion = CalibrationSuggestion::new(ScoreId(1), -80.0, Offset::from_ms(10.0));
        assert_eq!(suggestion.target_ms(), 90.0);
        assert_eq!(suggestion.suggested(), Offset::from_ms(50.0));
    }
}
