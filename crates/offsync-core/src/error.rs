use thiserror::Error;

use crate::store::BeatmapId;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Beatmap not found: {0}")]
    BeatmapNotFound(BeatmapId),

    #[error("Invalid score: {0}")]
    InvalidScore(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error is a "file not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}
