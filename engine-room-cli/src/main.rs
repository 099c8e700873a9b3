mod digest;
mod export;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use engine_room_pipeline::filter::{Filter, FilterCategory, ItemFilter};
use engine_room_pipeline::snapshot::{persist_snapshot, FileSnapshotStore, PersistOutcome};
use engine_room_pipeline::{load_inventory_file, AnalysisPolicy, InventoryAnalysisPipeline};

use crate::digest::{render_human, DigestJson};
use crate::export::write_items_csv;

/// Analyze a wholesaler stock file and print the morning digest.
#[derive(Parser, Debug)]
#[clap(name = "engine-room", version, about)]
struct Cli {
    /// Inventory file (.csv, or .json for a row array)
    file: PathBuf,

    /// TOML file overriding analysis thresholds
    #[clap(long, env = "ENGINE_ROOM_POLICY")]
    policy: Option<PathBuf>,

    /// Print JSON instead of the text digest
    #[clap(long)]
    json: bool,

    /// Number of issues and items to show
    #[clap(long, default_value_t = 10)]
    top: usize,

    /// Item view to show (all, overstock, watchlist, fast-mover, ...)
    #[clap(long, default_value_t = FilterCategory::All)]
    filter: FilterCategory,

    /// Starred stock codes, comma separated
    #[clap(long, value_delimiter = ',')]
    starred: Vec<String>,

    /// Write every analyzed item to this CSV file
    #[clap(long)]
    export: Option<PathBuf>,

    /// Persist the result as a JSON snapshot at this path
    #[clap(long, env = "ENGINE_ROOM_SNAPSHOT")]
    snapshot: Option<PathBuf>,

    /// Byte budget for the snapshot before it is trimmed
    #[clap(long, requires = "snapshot")]
    snapshot_limit: Option<usize>,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let policy = match &cli.policy {
        Some(path) => AnalysisPolicy::load(path)
            .with_context(|| format!("loading policy {}", path.display()))?,
        None => AnalysisPolicy::default(),
    };

    let load_start = Instant::now();
    let loaded = load_inventory_file(&cli.file)
        .with_context(|| format!("loading inventory {}", cli.file.display()))?;
    info!(
        rows = loaded.items.len(),
        ms = load_start.elapsed().as_millis() as u64,
        "inventory loaded"
    );
    if !loaded.quality.is_clean() {
        warn!(
            dropped = loaded.quality.rows_dropped,
            repaired = loaded.quality.rows_repaired,
            duplicates = loaded.quality.duplicate_stockcodes.len(),
            "inventory needed repairs"
        );
    }

    let pipeline_start = Instant::now();
    let pipeline = InventoryAnalysisPipeline::new(policy);
    let data = pipeline.run_loaded(&file_name(&cli.file), &loaded);
    let pipeline_ms = pipeline_start.elapsed().as_millis();

    let view = ItemFilter::new(cli.filter, pipeline.policy().clone())
        .with_starred(cli.starred.iter().map(|s| s.trim().to_string()))
        .filter(data.analyzed_items.clone());
    info!(
        filter = %cli.filter,
        kept = view.kept.len(),
        removed = view.removed.len(),
        "item view built"
    );
    let items = &view.kept[..view.kept.len().min(cli.top)];
    let issues = &data.priority_issues[..data.priority_issues.len().min(cli.top)];

    if let Some(path) = &cli.export {
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        write_items_csv(BufWriter::new(file), &data.analyzed_items)
            .with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), items = data.analyzed_items.len(), "exported items");
    }

    if let Some(path) = &cli.snapshot {
        let mut store = FileSnapshotStore::new(path);
        if let Some(limit) = cli.snapshot_limit {
            store = store.with_limit(limit);
        }
        match persist_snapshot(&mut store, &data) {
            PersistOutcome::NotPersisted => warn!(path = %path.display(), "snapshot not saved"),
            outcome => info!(path = %path.display(), ?outcome, "snapshot saved"),
        }
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if cli.json {
        let envelope = DigestJson::new(&data, cli.filter, items, pipeline_ms);
        serde_json::to_writer_pretty(&mut out, &envelope).context("serializing digest")?;
        writeln!(out)?;
    } else {
        write!(out, "{}", render_human(&data, issues, cli.filter, items, pipeline_ms))?;
    }
    Ok(())
}
