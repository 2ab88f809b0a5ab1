//! Config file loading.
//!
//! The config file is optional TOML:
//!
//! ```toml
//! database = "beatmaps.json"
//! minimum_basic_hit_events = 10
//! frame_interval_ms = 16
//! settle_timeout_ms = 5000
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use offsync_core::SyncConfig;
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    database: Option<PathBuf>,
    minimum_basic_hit_events: Option<usize>,
    frame_interval_ms: Option<u64>,
    settle_timeout_ms: Option<u64>,
}

impl FileConfig {
    fn into_sync_config(self, database: Option<PathBuf>) -> SyncConfig {
        let mut builder = SyncConfig::builder();
        if let Some(path) = database.or(self.database) {
            builder = builder.database_path(path);
        }
        if let Some(count) = self.minimum_basic_hit_events {
            builder = builder.minimum_basic_hit_events(count);
        }
        if let Some(ms) = self.frame_interval_ms {
            builder = builder.frame_interval(Duration::from_millis(ms));
        }
        if let Some(ms) = self.settle_timeout_ms {
            builder = builder.settle_timeout(Duration::from_millis(ms));
        }
        builder.build()
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("offsync").join("config.toml"))
}

fn parse(content: &str) -> Result<FileConfig> {
    toml::from_str(content).context("Failed to parse config file")
}

/// Load the configuration.
///
/// An explicit `path` must exist; the default location is only used when
/// present. `database` overrides the file's database path.
pub fn load(path: Option<&Path>, database: Option<PathBuf>) -> Result<SyncConfig> {
    let file_config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            parse(&content)?
        }
        None => match default_config_path() {
            Some(path) if path.exists() => {
                debug!("Loading config from {}", path.display());
                let content = fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                parse(&content)?
            }
            _ => FileConfig::default(),
        },
    };

    Ok(file_config.into_sync_config(database))
}
