//! The adjustable offset setting.
//!
//! - **Offset**: bounded millisecond value with 0.1ms resolution
//! - **Adjustment gate**: shared flag that forbids user adjustment

mod gate;
mod offset;

pub use gate::AdjustmentGate;
pub use offset::Offset;
