//! Checkpoint snapshots for resumable runs
//!
//! A checkpoint is one JSON document holding the cache and the processed
//! work keys. It is written to a temporary file, synced, and renamed over
//! the previous snapshot, so a crash mid-write leaves the last good
//! snapshot in place.

use crate::checkpoint::cache::{CacheKey, PipelineState};
use crate::state::WorkKey;
use crate::HarvestError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use tokio::io::AsyncWriteExt;

/// Format version written into every checkpoint
pub const CHECKPOINT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct CacheRecord {
    key: CacheKey,
    text: String,
}

/// Serialized form of a `PipelineState`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub version: u32,
    pub saved_at: DateTime<Utc>,

    /// Hash of the configuration the run was started with
    #[serde(default)]
    pub config_hash: Option<String>,

    entries: Vec<CacheRecord>,
    processed: Vec<WorkKey>,
}

impl Checkpoint {
    /// Captures a consistent copy of `state`
    pub fn capture(state: &PipelineState, config_hash: Option<String>) -> Self {
        Self {
            version: CHECKPOINT_VERSION,
            saved_at: Utc::now(),
            config_hash,
            entries: state
                .cache
                .iter()
                .map(|(key, text)| CacheRecord {
                    key: key.clone(),
                    text: text.clone(),
                })
                .collect(),
            processed: state.processed.iter().cloned().collect(),
        }
    }

    /// Rebuilds the in-memory state
    pub fn into_state(self) -> PipelineState {
        PipelineState {
            cache: self
                .entries
                .into_iter()
                .map(|record| (record.key, record.text))
                .collect(),
            processed: self.processed.into_iter().collect(),
        }
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn processed_count(&self) -> usize {
        self.processed.len()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, HarvestError> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, HarvestError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Writes and restores the checkpoint file of a run
pub struct CheckpointManager {
    path: PathBuf,
    config_hash: Option<String>,

    /// Serializes snapshots so an older view never lands after a newer one
    write_lock: tokio::sync::Mutex<()>,

    snapshots_written: AtomicU64,
}

impl CheckpointManager {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            config_hash: None,
            write_lock: tokio::sync::Mutex::new(()),
            snapshots_written: AtomicU64::new(0),
        }
    }

    /// Stamps every snapshot with the hash of the active configuration
    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = Some(hash.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of snapshots written by this manager
    pub fn snapshots_written(&self) -> u64 {
        self.snapshots_written.load(Ordering::Relaxed)
    }

    /// Persists the current state, replacing the previous snapshot
    ///
    /// The state is serialized while its lock is held, so the snapshot never
    /// observes a half-applied update.
    pub async fn snapshot(&self, state: &Mutex<PipelineState>) -> Result<(), HarvestError> {
        let _writer = self.write_lock.lock().await;

        let checkpoint = {
            let state = state.lock().unwrap_or_else(PoisonError::into_inner);
            Checkpoint::capture(&state, self.config_hash.clone())
        };

        self.write(&checkpoint).await?;
        self.snapshots_written.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(
            "Checkpoint saved: {} cache entries, {} processed items",
            checkpoint.entry_count(),
            checkpoint.processed_count()
        );
        Ok(())
    }

    async fn write(&self, checkpoint: &Checkpoint) -> Result<(), HarvestError> {
        let bytes = checkpoint.to_bytes()?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let temp_path = self.temp_path();
        let mut file = tokio::fs::File::create(&temp_path).await?;
        file.write_all(&bytes).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&temp_path, &self.path).await?;
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".tmp");
        PathBuf::from(name)
    }

    /// Reads the checkpoint file
    ///
    /// # Returns
    ///
    /// * `Ok(Some(Checkpoint))` - A decodable checkpoint exists
    /// * `Ok(None)` - No checkpoint has been written
    /// * `Err(HarvestError::CheckpointCorrupt)` - The file exists but cannot be used
    pub async fn load(&self) -> Result<Option<Checkpoint>, HarvestError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.corrupt(e.to_string())),
        };

        let checkpoint = Checkpoint::from_bytes(&bytes).map_err(|e| self.corrupt(e.to_string()))?;

        if checkpoint.version != CHECKPOINT_VERSION {
            return Err(self.corrupt(format!(
                "unsupported version {} (expected {})",
                checkpoint.version, CHECKPOINT_VERSION
            )));
        }

        Ok(Some(checkpoint))
    }

    /// Restores the state of the last successful snapshot
    ///
    /// A missing or corrupt checkpoint yields `None` and the run starts cold.
    pub async fn restore(&self) -> Option<PipelineState> {
        match self.load().await {
            Ok(Some(checkpoint)) => {
                if let (Some(saved), Some(current)) = (&checkpoint.config_hash, &self.config_hash) {
                    if saved != current {
                        tracing::warn!(
                            "Checkpoint was written with a different configuration (hash {}), resuming anyway",
                            saved
                        );
                    }
                }

                tracing::info!(
                    "Restored checkpoint from {}: {} cache entries, {} processed items",
                    checkpoint.saved_at.to_rfc3339(),
                    checkpoint.entry_count(),
                    checkpoint.processed_count()
                );
                Some(checkpoint.into_state())
            }
            Ok(None) => {
                tracing::info!("No checkpoint found at {}, starting cold", self.path.display());
                None
            }
            Err(e) => {
                tracing::warn!("{}; starting cold", e);
                None
            }
        }
    }

    /// Deletes the checkpoint file; returns whether one existed
    pub async fn discard(&self) -> Result<bool, HarvestError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn corrupt(&self, message: String) -> HarvestError {
        HarvestError::CheckpointCorrupt {
            path: self.path.display().to_string(),
            message,
        }
    }
}
