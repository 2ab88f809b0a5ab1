use std::fmt;

use serde::{Deserialize, Serialize};

/// Audio offset of a beatmap in milliseconds.
///
/// Values are clamped to [`Offset::MIN_MS`, `Offset::MAX_MS`] and rounded to
/// [`Offset::PRECISION`]. Internally the value is kept as a whole number of
/// precision steps, so two offsets compare equal exactly when they display
/// the same.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(from = "f64", into = "f64")]
pub struct Offset {
    steps: i32,
}

impl Offset {
    pub const MIN_MS: f64 = -50.0;
    pub const MAX_MS: f64 = 50.0;
    /// Resolution of the setting (0.1ms)
    pub const PRECISION: f64 = 0.1;

    const STEPS_PER_MS: f64 = 10.0;
    const MAX_STEPS: i32 = 500;

    pub const ZERO: Offset = Offset { steps: 0 };

    /// Build an offset from an arbitrary millisecond value.
    ///
    /// NaN maps to zero.
    pub fn from_ms(ms: f64) -> Self {
        let steps = (ms * Self::STEPS_PER_MS).round();
        if steps.is_nan() {
            return Self::ZERO;
        }
        let max = f64::from(Self::MAX_STEPS);
        Self {
            steps: steps.clamp(-max, max) as i32,
        }
    }

    pub fn as_ms(self) -> f64 {
        f64::from(self.steps) / Self::STEPS_PER_MS
    }

    /// Number of 0.1ms steps away from zero
    pub fn steps(self) -> i32 {
        self.steps
    }

    /// Whether `ms` lies within half a precision step of this offset
    pub fn almost_equals(self, ms: f64) -> bool {
        (ms - self.as_ms()).abs() < Self::PRECISION / 2.0
    }
}

impl From<f64> for Offset {
    fn from(ms: f64) -> Self {
        Self::from_ms(ms)
    }
}

impl From<Offset> for f64 {
    fn from(offset: Offset) -> Self {
        offset.as_ms()
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}ms", self.as_ms())
    }
}
