use std::path::PathBuf;
use std::time::Duration;

/// Configuration for offset synchronization
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    /// JSON file holding the beatmap database
    pub database_path: PathBuf,
    /// Reference scores with fewer basic hit events are not used for calibration
    pub minimum_basic_hit_events: usize,
    /// Delay between frames of the driving loop
    pub frame_interval: Duration,
    /// How long a command waits for pending writes to settle
    pub settle_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("beatmaps.json"),
            minimum_basic_hit_events: 10,
            frame_interval: Duration::from_millis(16),
            settle_timeout: Duration::from_secs(5),
        }
    }
}

impl SyncConfig {
    /// Create a new configuration builder
    pub fn builder() -> SyncConfigBuilder {
        SyncConfigBuilder::default()
    }
}

/// Builder for SyncConfig
#[derive(Debug, Clone, Default)]
pub struct SyncConfigBuilder {
    database_path: Option<PathBuf>,
    minimum_basic_hit_events: Option<usize>,
    frame_interval: Option<Duration>,
    settle_timeout: Option<Duration>,
}

impl SyncConfigBuilder {
    pub fn database_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database_path = Some(path.into());
        self
    }

    pub fn minimum_basic_hit_events(mut self, count: usize) -> Self {
        self.minimum_basic_hit_events = Some(count);
        self
    }

    pub fn frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = Some(interval);
        self
    }

    pub fn settle_timeout(mut self, timeout: Duration) -> Self {
        self.settle_timeout = Some(timeout);
        self
    }

    /// Build the configuration
    pub fn build(self) -> SyncConfig {
        let default = SyncConfig::default();
        SyncConfig {
            database_path: self.database_path.unwrap_or(default.database_path),
            minimum_basic_hit_events: self
                .minimum_basic_hit_events
                .unwrap_or(default.minimum_basic_hit_events),
            frame_interval: self.frame_interval.unwrap_or(default.frame_interval),
            settle_timeout: self.settle_timeout.unwrap_or(default.settle_timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        assert_eq!(SyncConfig::builder().build(), SyncConfig::default());
    }

    #[test]
    fn test_builder_overrides() {
        let config = SyncConfig::builder()
            .database_path("maps.json")
            .minimum_basic_hit_events(3)
            .frame_interval(Duration::from_millis(5))
            .build();

        assert_eq!(config.database_path, PathBuf::from("maps.json"));
        assert_eq!(config.minimum_basic_hit_events, 3);
        assert_eq!(config.frame_interval, Duration::from_millis(5));
        assert_eq!(config.settle_timeout, Duration::from_secs(5));
    }
}
