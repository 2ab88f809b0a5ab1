use std::sync::{Arc, Mutex, PoisonError};

use crate::score::ScoreId;

/// State that outlives a single controller, shared by every controller of a session.
#[derive(Debug, Clone, Default)]
pub struct SessionStatics {
    last_applied_offset_score: Arc<Mutex<Option<ScoreId>>>,
}

impl SessionStatics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reference score most recently used to calibrate an offset
    pub fn last_applied_offset_score(&self) -> Option<ScoreId> {
        *self
            .last_applied_offset_score
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_last_applied_offset_score(&self, score: Option<ScoreId>) {
        *self
            .last_applied_offset_score
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = score;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let session = SessionStatics::new();
        let other = session.clone();
        assert_eq!(other.last_applied_offset_score(), None);

        session.set_last_applied_offset_score(Some(ScoreId(4)));
        assert_eq!(other.last_applied_offset_score(), Some(ScoreId(4)));
    }
}
