use crate::error::ConfigError;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Smallest accepted snapshot interval.
pub const MIN_SNAPSHOT_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Parser)]
#[command(name = "sift")]
#[command(about = "Lightweight in-memory full-text search over HTTP", long_about = None)]
pub struct Cli {
    /// Address to bind.
    #[arg(long, default_value = "127.0.0.1")]
    pub addr: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 8080)]
    pub port: u16,

    /// Directory for index snapshots; enables persistence.
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// How often dirty indexes are written to disk, e.g. "30s" or "5m".
    /// Omit to disable periodic snapshots. Requires --data-dir.
    #[arg(long, value_parser = humantime::parse_duration)]
    pub snapshot_interval: Option<Duration>,
}

impl Cli {
    /// Cross-flag validation; failures here are fatal at startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(interval) = self.snapshot_interval {
            if self.data_dir.is_none() {
                return Err(ConfigError::SnapshotWithoutDataDir);
            }
            if interval < MIN_SNAPSHOT_INTERVAL {
                return Err(ConfigError::SnapshotIntervalTooShort {
                    min_secs: MIN_SNAPSHOT_INTERVAL.as_secs(),
                    got_secs: interval.as_secs(),
                });
            }
        }
        Ok(())
    }
}
