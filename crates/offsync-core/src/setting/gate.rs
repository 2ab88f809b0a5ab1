use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared flag that forbids adjusting the offset.
///
/// The owner of the gate (for example gameplay that is not paused) flips it,
/// and every controller holding a clone observes the change on its next poll.
#[derive(Debug, Clone, Default)]
pub struct AdjustmentGate {
    disabled: Arc<AtomicBool>,
}

impl AdjustmentGate {
    /// Create a gate in the enabled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a gate that starts disabled.
    pub fn disabled() -> Self {
        let gate = Self::new();
        gate.set_disabled(true);
        gate
    }

    pub fn set_disabled(&self, disabled: bool) {
        self.disabled.store(disabled, Ordering::SeqCst);
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::SeqCst)
    }
}
