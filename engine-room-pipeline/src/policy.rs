//! Business thresholds for inventory classification.
//!
//! Every cut-off the pipeline uses lives here. The defaults mirror the values
//! the dashboard has been running with; a deployment can override any subset
//! from a TOML file:
//!
//! ```toml
//! overstock_months = 4.0
//! margin_opportunity_ratio = 0.85
//!
//! [severity]
//! critical = 20000.0
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};

/// Months of stock above which an item with positive usage is overstocked.
pub const OVERSTOCK_MONTHS: f64 = 6.0;

/// Months of stock above which a non-rising item joins the watchlist.
pub const WATCHLIST_MONTHS: f64 = 12.0;

/// Number of ranked items per velocity category (ranks 1-200 are category 1).
pub const VELOCITY_BAND_SIZE: usize = 200;

/// Highest velocity category. Ranks beyond the last full band collapse into it.
pub const MAX_VELOCITY_CATEGORY: u8 = 5;

/// Categories at or below this number count as fast movers.
pub const FAST_MOVER_MAX_CATEGORY: u8 = 3;

/// Percentage band inside which a usage or cost change reads as STABLE.
pub const TREND_THRESHOLD_PCT: f64 = 5.0;

/// Cost must sit below `lowest competitor x ratio` to be a margin opportunity.
pub const MARGIN_OPPORTUNITY_RATIO: f64 = 0.9;

/// Weeks of supply below which a selling item is at stock risk.
pub const STOCK_RISK_WEEKS: f64 = 2.0;

/// Stock value at which an item counts as high value in item filters.
pub const HIGH_VALUE_STOCK: f64 = 10_000.0;

/// Impact value cut-offs for issue severity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityCutoffs {
    pub critical: f64,
    pub high: f64,
    pub medium: f64,
}

impl Default for SeverityCutoffs {
    fn default() -> Self {
        Self {
            critical: 10_000.0,
            high: 2_500.0,
            medium: 500.0,
        }
    }
}

/// Tunable thresholds for one analysis run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisPolicy {
    pub overstock_months: f64,
    pub watchlist_months: f64,
    pub velocity_band_size: usize,
    pub fast_mover_max_category: u8,
    pub trend_threshold_pct: f64,
    pub cost_trend_threshold_pct: f64,
    pub margin_opportunity_ratio: f64,
    pub stock_risk_weeks: f64,
    pub high_value_stock: f64,
    pub severity: SeverityCutoffs,
}

impl Default for AnalysisPolicy {
    fn default() -> Self {
        Self {
            overstock_months: OVERSTOCK_MONTHS,
            watchlist_months: WATCHLIST_MONTHS,
            velocity_band_size: VELOCITY_BAND_SIZE,
            fast_mover_max_category: FAST_MOVER_MAX_CATEGORY,
            trend_threshold_pct: TREND_THRESHOLD_PCT,
            cost_trend_threshold_pct: TREND_THRESHOLD_PCT,
            margin_opportunity_ratio: MARGIN_OPPORTUNITY_RATIO,
            stock_risk_weeks: STOCK_RISK_WEEKS,
            high_value_stock: HIGH_VALUE_STOCK,
            severity: SeverityCutoffs::default(),
        }
    }
}

impl AnalysisPolicy {
    /// Parse and validate a policy from TOML text. Missing keys keep defaults.
    pub fn from_toml_str(text: &str) -> PipelineResult<Self> {
        let policy: AnalysisPolicy = toml::from_str(text)?;
        policy.validate()?;
        Ok(policy)
    }

    /// Load and validate a policy file.
    pub fn load(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::io(path.display().to_string(), e))?;
        let policy = Self::from_toml_str(&text)?;
        log::info!("Loaded analysis policy from {}", path.display());
        Ok(policy)
    }

    /// Reject values that would break the classification invariants.
    pub fn validate(&self) -> PipelineResult<()> {
        let positive = [
            ("overstock_months", self.overstock_months),
            ("watchlist_months", self.watchlist_months),
            ("stock_risk_weeks", self.stock_risk_weeks),
            ("margin_opportunity_ratio", self.margin_opportunity_ratio),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(PipelineError::InvalidPolicy(format!(
                    "{name} must be a positive number, got {value}"
                )));
            }
        }
        for (name, value) in [
            ("trend_threshold_pct", self.trend_threshold_pct),
            ("cost_trend_threshold_pct", self.cost_trend_threshold_pct),
            ("high_value_stock", self.high_value_stock),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(PipelineError::InvalidPolicy(format!(
                    "{name} must be zero or positive, got {value}"
                )));
            }
        }
        if self.velocity_band_size == 0 {
            return Err(PipelineError::InvalidPolicy(
                "velocity_band_size must be at least 1".into(),
            ));
        }
        if self.fast_mover_max_category > MAX_VELOCITY_CATEGORY {
            return Err(PipelineError::InvalidPolicy(format!(
                "fast_mover_max_category must be at most {MAX_VELOCITY_CATEGORY}"
            )));
        }
        let s = &self.severity;
        if !(s.critical >= s.high && s.high >= s.medium && s.medium >= 0.0) {
            return Err(PipelineError::InvalidPolicy(format!(
                "severity cut-offs must satisfy critical >= high >= medium >= 0 (got {} / {} / {})",
                s.critical, s.high, s.medium
            )));
        }
        Ok(())
    }
}
