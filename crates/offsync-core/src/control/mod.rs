//! Offset control.
//!
//! `OffsetSyncController` owns the adjustable offset of one beatmap and keeps
//! it in sync with the store:
//!
//! - Edits are debounced to one write per frame and never overlap a write
//!   that is still in flight
//! - Store notifications are applied unless they are the echo of the
//!   controller's own write
//! - A reference score can suggest a calibrated offset

mod calibration;
mod controller;
mod session;

pub use calibration::{CalibrationSuggestion, HitTiming};
pub use controller::{OffsetSyncController, ScheduledTask};
pub use session::SessionStatics;
