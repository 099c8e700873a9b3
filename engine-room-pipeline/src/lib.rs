//! Inventory analysis for a pharmaceutical wholesaler's stock file.
//!
//! Raw spreadsheet rows go in; a `ProcessedInventoryData` comes out with
//! per-item derived metrics, overstock and watchlist subsets, priority issues
//! ranked by pound impact, and summary statistics.
//!
//! - `inventory_loader` reads CSV or JSON rows and reports repaired cells
//! - `derive` and `pricing` compute every per-item field
//! - `issue_classifier` and `aggregate` build the lists and totals
//! - `pipelines::inventory_analysis` wires the stages together
//! - `snapshot` persists the last result with a size-aware fallback

pub mod aggregate;
pub mod derive;
pub mod error;
pub mod filter;
pub mod inventory_loader;
pub mod issue_classifier;
pub mod pipelines;
pub mod policy;
pub mod pricing;
pub mod selector;
pub mod snapshot;
pub mod types;
pub mod util;

pub use error::{PipelineError, PipelineResult};
pub use filter::{FilterCategory, ItemFilter};
pub use inventory_loader::{load_inventory, load_inventory_file, LoadedInventory, RawInventoryItem};
pub use pipelines::inventory_analysis::InventoryAnalysisPipeline;
pub use policy::AnalysisPolicy;
pub use snapshot::{persist_snapshot, FileSnapshotStore, PersistOutcome, SnapshotStore};
pub use types::{PriorityIssue, ProcessedInventoryData, ProcessedInventoryItem};
