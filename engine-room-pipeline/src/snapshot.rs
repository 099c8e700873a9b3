//! Snapshot persistence for the last processed file.
//!
//! A store keeps at most one snapshot. Saving tries the full result first; if
//! the store rejects it (usually for size), a trimmed "essential" copy is
//! saved instead, and if that also fails the result is simply not persisted.
//! Persistence failures never fail an analysis run.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};
use crate::types::ProcessedInventoryData;

/// Analyzed items kept in an essential snapshot.
pub const ESSENTIAL_ANALYZED_ITEMS: usize = 100;
/// Overstock items kept in an essential snapshot.
pub const ESSENTIAL_OVERSTOCK_ITEMS: usize = 50;
/// Priority issues kept in an essential snapshot.
pub const ESSENTIAL_PRIORITY_ISSUES: usize = 50;
/// Watchlist items kept in an essential snapshot.
pub const ESSENTIAL_WATCHLIST_ITEMS: usize = 50;

/// What a store holds. `complete` is false for essential snapshots.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredSnapshot {
    pub complete: bool,
    pub data: ProcessedInventoryData,
}

/// How far `persist_snapshot` got.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PersistOutcome {
    Full,
    Essential,
    NotPersisted,
}

/// Storage for the most recent snapshot.
pub trait SnapshotStore {
    /// Store the full result, replacing any previous snapshot.
    fn try_save_full(&mut self, data: &ProcessedInventoryData) -> PipelineResult<()>;

    /// Store a trimmed result, replacing any previous snapshot.
    fn save_essential(&mut self, data: &ProcessedInventoryData) -> PipelineResult<()>;

    fn load(&self) -> PipelineResult<Option<StoredSnapshot>>;

    fn clear(&mut self) -> PipelineResult<()>;
}

/// Trim a result to the essential lists. Summary figures are kept whole.
pub fn essential(data: &ProcessedInventoryData) -> ProcessedInventoryData {
    fn head<T: Clone>(items: &[T], n: usize) -> Vec<T> {
        items.iter().take(n).cloned().collect()
    }

    ProcessedInventoryData {
        file_name: data.file_name.clone(),
        total_products: data.total_products,
        analyzed_items: head(&data.analyzed_items, ESSENTIAL_ANALYZED_ITEMS),
        overstock_items: head(&data.overstock_items, ESSENTIAL_OVERSTOCK_ITEMS),
        watchlist_items: head(&data.watchlist_items, ESSENTIAL_WATCHLIST_ITEMS),
        priority_issues: head(&data.priority_issues, ESSENTIAL_PRIORITY_ISSUES),
        summary_stats: data.summary_stats.clone(),
        velocity_breakdown: data.velocity_breakdown.clone(),
        trend_breakdown: data.trend_breakdown.clone(),
        strategy_breakdown: data.strategy_breakdown.clone(),
        data_quality: data.data_quality.clone(),
    }
}

/// Save `data`, falling back from full to essential to nothing.
pub fn persist_snapshot(store: &mut dyn SnapshotStore, data: &ProcessedInventoryData) -> PersistOutcome {
    match store.try_save_full(data) {
        Ok(()) => return PersistOutcome::Full,
        Err(e) => log::warn!("Full snapshot of {} not saved: {}", data.file_name, e),
    }
    match store.save_essential(data) {
        Ok(()) => {
            log::info!("Saved essential snapshot of {}", data.file_name);
            PersistOutcome::Essential
        }
        Err(e) => {
            log::warn!("Snapshot of {} not persisted: {}", data.file_name, e);
            PersistOutcome::NotPersisted
        }
    }
}

/// JSON file store with an optional byte budget.
#[derive(Clone, Debug)]
pub struct FileSnapshotStore {
    path: PathBuf,
    max_bytes: Option<usize>,
}

impl FileSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_bytes: None,
        }
    }

    pub fn with_limit(mut self, max_bytes: usize) -> Self {
        self.max_bytes = Some(max_bytes);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, snapshot: &StoredSnapshot) -> PipelineResult<()> {
        let bytes = serde_json::to_vec(snapshot)?;
        if let Some(limit) = self.max_bytes {
            if bytes.len() > limit {
                return Err(PipelineError::SnapshotTooLarge {
                    size: bytes.len(),
                    limit,
                });
            }
        }
        std::fs::write(&self.path, bytes)
            .map_err(|e| PipelineError::io(self.path.display().to_string(), e))
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn try_save_full(&mut self, data: &ProcessedInventoryData) -> PipelineResult<()> {
        self.write(&StoredSnapshot {
            complete: true,
            data: data.clone(),
        })
    }

    fn save_essential(&mut self, data: &ProcessedInventoryData) -> PipelineResult<()> {
        self.write(&StoredSnapshot {
            complete: false,
            data: essential(data),
        })
    }

    fn load(&self) -> PipelineResult<Option<StoredSnapshot>> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(PipelineError::io(self.path.display().to_string(), e)),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    fn clear(&mut self) -> PipelineResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PipelineError::io(self.path.display().to_string(), e)),
        }
    }
}

/// In-memory store, mainly for tests and embedding.
#[derive(Clone, Debug, Default)]
pub struct MemorySnapshotStore {
    snapshot: Option<StoredSnapshot>,
    max_bytes: Option<usize>,
}

impl MemorySnapshotStore {
    pub fn with_limit(max_bytes: usize) -> Self {
        Self {
            snapshot: None,
            max_bytes: Some(max_bytes),
        }
    }

    fn put(&mut self, snapshot: StoredSnapshot) -> PipelineResult<()> {
        if let Some(limit) = self.max_bytes {
            let size = serde_json::to_vec(&snapshot)?.len();
            if size > limit {
                return Err(PipelineError::SnapshotTooLarge { size, limit });
            }
        }
        self.snapshot = Some(snapshot);
        Ok(())
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn try_save_full(&mut self, data: &ProcessedInventoryData) -> PipelineResult<()> {
        self.put(StoredSnapshot {
            complete: true,
            data: data.clone(),
        })
    }

    fn save_essential(&mut self, data: &ProcessedInventoryData) -> PipelineResult<()> {
        self.put(StoredSnapshot {
            complete: false,
            data: essential(data),
        })
    }

    fn load(&self) -> PipelineResult<Option<StoredSnapshot>> {
        Ok(self.snapshot.clone())
    }

    fn clear(&mut self) -> PipelineResult<()> {
        self.snapshot = None;
        Ok(())
    }
}
