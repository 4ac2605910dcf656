//! Best-effort persistence of learned retry history
//!
//! The snapshot warms up the adaptive delay estimates across process
//! restarts. It is optimization data, not correctness-critical, so every
//! I/O failure here is logged and swallowed: a missing or corrupt file means
//! starting from an empty history, and a failed write means trying again on
//! the next save interval.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// On-disk shape of the learned history
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetryHistorySnapshot {
    /// Inter-arrival gaps (seconds) per error kind, most recent last
    #[serde(default)]
    pub error_patterns: HashMap<String, Vec<f64>>,
    /// Learned base delay (seconds) per error kind
    #[serde(default)]
    pub adaptive_delays: HashMap<String, f64>,
    /// When the snapshot was last written
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

/// File-backed snapshot store with a swallow-and-log failure policy
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    /// Create a store at the given path; nothing is touched until save
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path this store reads and writes
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the snapshot. A missing file yields an empty snapshot; a corrupt
    /// one is logged and also yields an empty snapshot.
    pub fn load(&self) -> RetryHistorySnapshot {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "ignoring corrupt retry history snapshot");
                    RetryHistorySnapshot::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => RetryHistorySnapshot::default(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to read retry history snapshot");
                RetryHistorySnapshot::default()
            }
        }
    }

    /// Write the snapshot, stamping `last_updated`. Best-effort: the parent
    /// directory is created if missing and any failure is logged, never
    /// returned.
    pub fn save(&self, snapshot: &RetryHistorySnapshot) {
        let stamped = RetryHistorySnapshot {
            error_patterns: snapshot.error_patterns.clone(),
            adaptive_delays: snapshot.adaptive_delays.clone(),
            last_updated: Some(Utc::now()),
        };
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    warn!(path = %self.path.display(), error = %e, "failed to create snapshot directory");
                    return;
                }
            }
        }
        match serde_json::to_string_pretty(&stamped) {
            Ok(contents) => {
                if let Err(e) = std::fs::write(&self.path, contents) {
                    warn!(path = %self.path.display(), error = %e, "failed to write retry history snapshot");
                } else {
                    debug!(path = %self.path.display(), "retry history snapshot written");
                }
            }
            Err(e) => {
                warn!(error = %e, "failed to serialize retry history snapshot");
            }
        }
    }
}
