use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::aggregate::is_stock_risk;
use crate::issue_classifier::{cost_disadvantage_impact, margin_opportunity_impact};
use crate::policy::AnalysisPolicy;
use crate::types::{ProcessedInventoryItem, WinningStatus};
use crate::util;

/// Result of a filter operation, partitioning candidates into kept and removed.
pub struct FilterResult<C> {
    pub kept: Vec<C>,
    pub removed: Vec<C>,
}

/// Filters partition candidates into kept and removed sets, preserving order.
pub trait Filter<C> {
    /// Whether a single candidate passes.
    fn keep(&self, candidate: &C) -> bool;

    fn filter(&self, candidates: Vec<C>) -> FilterResult<C> {
        let (kept, removed): (Vec<C>, Vec<C>) =
            candidates.into_iter().partition(|c| self.keep(c));
        FilterResult { kept, removed }
    }

    /// Returns a stable name for logging.
    fn name(&self) -> &str {
        util::short_type_name(std::any::type_name::<Self>())
    }
}

/// Item table views.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FilterCategory {
    #[default]
    All,
    Overstock,
    Watchlist,
    FastMover,
    HighValue,
    MarginOpportunity,
    CostDisadvantage,
    OutOfStock,
    StockRisk,
    Winning,
    Losing,
    Starred,
}

impl FilterCategory {
    pub const ALL: [FilterCategory; 12] = [
        FilterCategory::All,
        FilterCategory::Overstock,
        FilterCategory::Watchlist,
        FilterCategory::FastMover,
        FilterCategory::HighValue,
        FilterCategory::MarginOpportunity,
        FilterCategory::CostDisadvantage,
        FilterCategory::OutOfStock,
        FilterCategory::StockRisk,
        FilterCategory::Winning,
        FilterCategory::Losing,
        FilterCategory::Starred,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FilterCategory::All => "all",
            FilterCategory::Overstock => "overstock",
            FilterCategory::Watchlist => "watchlist",
            FilterCategory::FastMover => "fast-mover",
            FilterCategory::HighValue => "high-value",
            FilterCategory::MarginOpportunity => "margin-opportunity",
            FilterCategory::CostDisadvantage => "cost-disadvantage",
            FilterCategory::OutOfStock => "out-of-stock",
            FilterCategory::StockRisk => "stock-risk",
            FilterCategory::Winning => "winning",
            FilterCategory::Losing => "losing",
            FilterCategory::Starred => "starred",
        }
    }
}

impl fmt::Display for FilterCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('_', "-");
        FilterCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| {
                let names: Vec<_> = FilterCategory::ALL.iter().map(|c| c.as_str()).collect();
                format!("unknown filter '{}', expected one of: {}", s, names.join(", "))
            })
    }
}

/// Keeps the items that belong to one table view.
#[derive(Clone, Debug)]
pub struct ItemFilter {
    pub category: FilterCategory,
    pub policy: AnalysisPolicy,
    /// Stock codes the user has starred. Only consulted by `Starred`.
    pub starred: BTreeSet<String>,
}

impl ItemFilter {
    pub fn new(category: FilterCategory, policy: AnalysisPolicy) -> Self {
        Self {
            category,
            policy,
            starred: BTreeSet::new(),
        }
    }

    pub fn with_starred(mut self, starred: impl IntoIterator<Item = String>) -> Self {
        self.starred = starred.into_iter().collect();
        self
    }
}

impl Filter<ProcessedInventoryItem> for ItemFilter {
    fn keep(&self, item: &ProcessedInventoryItem) -> bool {
        let policy = &self.policy;
        match self.category {
            FilterCategory::All => true,
            FilterCategory::Overstock => item.is_overstocked,
            FilterCategory::Watchlist => item.is_watchlisted(),
            FilterCategory::FastMover => item
                .velocity_category
                .is_fast_mover(policy.fast_mover_max_category),
            FilterCategory::HighValue => item.stock_value >= policy.high_value_stock,
            FilterCategory::MarginOpportunity => margin_opportunity_impact(item, policy).is_some(),
            FilterCategory::CostDisadvantage => cost_disadvantage_impact(item).is_some(),
            FilterCategory::OutOfStock => item.is_out_of_stock(),
            FilterCategory::StockRisk => is_stock_risk(item, policy),
            FilterCategory::Winning => item.winning_status == WinningStatus::Winning,
            FilterCategory::Losing => item.winning_status == WinningStatus::Losing,
            FilterCategory::Starred => self.starred.contains(item.stockcode()),
        }
    }
}

/// Starred items, in analyzed-item order.
pub fn starred_items(
    items: &[ProcessedInventoryItem],
    starred: &BTreeSet<String>,
) -> Vec<ProcessedInventoryItem> {
    items
        .iter()
        .filter(|i| starred.contains(i.stockcode()))
        .cloned()
        .collect()
}
