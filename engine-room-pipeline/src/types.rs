use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::inventory_loader::RawInventoryItem;

/// Months-of-stock value used when monthly usage is zero or unknown.
/// Display layers render it as "∞".
pub const MONTHS_OF_STOCK_SENTINEL: f64 = 999.9;

/// Render a months-of-stock figure, mapping the sentinel to "∞".
/// Real cover above the sentinel value still renders as a number.
pub fn format_months_of_stock(months: f64) -> String {
    if months == MONTHS_OF_STOCK_SENTINEL {
        "\u{221e}".to_string()
    } else {
        format!("{:.1}", months)
    }
}

// ---------------------------------------------------------------------------
// Derived field types
// ---------------------------------------------------------------------------

/// Velocity bucket: 1 is the fastest-moving band, 5 the slowest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "VelocityRepr", try_from = "VelocityRepr")]
pub enum VelocityCategory {
    Ranked(u8),
    NotAvailable,
}

impl VelocityCategory {
    pub fn number(self) -> Option<u8> {
        match self {
            VelocityCategory::Ranked(n) => Some(n),
            VelocityCategory::NotAvailable => None,
        }
    }

    /// Whether the item sits in one of the fast-moving bands.
    pub fn is_fast_mover(self, max_category: u8) -> bool {
        matches!(self, VelocityCategory::Ranked(n) if n <= max_category)
    }
}

impl fmt::Display for VelocityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VelocityCategory::Ranked(n) => write!(f, "{}", n),
            VelocityCategory::NotAvailable => write!(f, "N/A"),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum VelocityRepr {
    Number(u8),
    Text(String),
}

impl From<VelocityCategory> for VelocityRepr {
    fn from(value: VelocityCategory) -> Self {
        match value {
            VelocityCategory::Ranked(n) => VelocityRepr::Number(n),
            VelocityCategory::NotAvailable => VelocityRepr::Text("N/A".into()),
        }
    }
}

impl TryFrom<VelocityRepr> for VelocityCategory {
    type Error = String;

    fn try_from(value: VelocityRepr) -> Result<Self, Self::Error> {
        match value {
            VelocityRepr::Number(n) if n >= 1 => Ok(VelocityCategory::Ranked(n)),
            VelocityRepr::Number(n) => Err(format!("invalid velocity category {n}")),
            VelocityRepr::Text(s) if s == "N/A" => Ok(VelocityCategory::NotAvailable),
            VelocityRepr::Text(s) => Err(format!("invalid velocity category '{s}'")),
        }
    }
}

/// Direction of a usage or cost comparison.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrendDirection {
    #[serde(rename = "UP")]
    Up,
    #[serde(rename = "DOWN")]
    Down,
    #[serde(rename = "STABLE")]
    Stable,
    #[serde(rename = "N/A")]
    NotAvailable,
}

impl TrendDirection {
    pub const ALL_KNOWN: [TrendDirection; 3] =
        [TrendDirection::Up, TrendDirection::Down, TrendDirection::Stable];
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendDirection::Up => write!(f, "UP"),
            TrendDirection::Down => write!(f, "DOWN"),
            TrendDirection::Stable => write!(f, "STABLE"),
            TrendDirection::NotAvailable => write!(f, "N/A"),
        }
    }
}

/// Day-over-day movement of a single competitor's price.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CompetitorTrend {
    Up,
    Down,
    Stable,
    New,
    Unknown,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitorPriceTrend {
    pub current: Option<f64>,
    pub yesterday: Option<f64>,
    pub trend: CompetitorTrend,
    pub percentage_change: Option<f64>,
    pub change_amount: Option<f64>,
}

/// Our price against the cheapest competitor. Ties are never wins.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WinningStatus {
    #[serde(rename = "Y")]
    Winning,
    #[serde(rename = "-")]
    NoAdvantage,
    #[serde(rename = "N")]
    Losing,
}

impl fmt::Display for WinningStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WinningStatus::Winning => write!(f, "Y"),
            WinningStatus::NoAdvantage => write!(f, "-"),
            WinningStatus::Losing => write!(f, "N"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PricingStrategy {
    Profitable,
    Marginal,
    #[serde(rename = "Loss Required")]
    LossRequired,
    Unknown,
}

impl PricingStrategy {
    pub const ALL: [PricingStrategy; 4] = [
        PricingStrategy::Profitable,
        PricingStrategy::Marginal,
        PricingStrategy::LossRequired,
        PricingStrategy::Unknown,
    ];
}

impl fmt::Display for PricingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PricingStrategy::Profitable => write!(f, "Profitable"),
            PricingStrategy::Marginal => write!(f, "Marginal"),
            PricingStrategy::LossRequired => write!(f, "Loss Required"),
            PricingStrategy::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Which field supplied the next buying price.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NbpSource {
    NextCost,
    MinCost,
    LastPoCost,
    None,
}

/// Watchlist markers. `at_risk` is the flag every watchlist count and filter
/// compares on; the supplier flag only adds the "❗" marker.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Watchlist {
    pub at_risk: bool,
    pub supplier_out_of_stock: bool,
}

pub const WATCHLIST_MARKER: &str = "\u{26a0}\u{fe0f}";
pub const SUPPLIER_OOS_MARKER: &str = "\u{2757}";
pub const NO_MARKER: &str = "-";

impl Watchlist {
    pub fn marker(&self) -> String {
        let mut marker = String::new();
        if self.at_risk {
            marker.push_str(WATCHLIST_MARKER);
        }
        if self.supplier_out_of_stock {
            marker.push_str(SUPPLIER_OOS_MARKER);
        }
        if marker.is_empty() {
            marker.push_str(NO_MARKER);
        }
        marker
    }

    pub fn from_marker(marker: &str) -> Self {
        Self {
            at_risk: marker.contains(WATCHLIST_MARKER),
            supplier_out_of_stock: marker.contains(SUPPLIER_OOS_MARKER),
        }
    }
}

impl fmt::Display for Watchlist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.marker())
    }
}

impl Serialize for Watchlist {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.marker())
    }
}

impl<'de> Deserialize<'de> for Watchlist {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let marker = String::deserialize(deserializer)?;
        Ok(Watchlist::from_marker(&marker))
    }
}

/// One inventory row with every derived metric attached.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedInventoryItem {
    #[serde(flatten)]
    pub raw: RawInventoryItem,
    pub id: String,

    // Stock
    pub current_stock: i64,
    pub total_stock: i64,
    /// Resolved monthly usage: the `averageUsage` override, else the
    /// six-month average. `None` when neither is positive.
    pub monthly_usage: Option<f64>,
    pub months_of_stock: f64,
    pub is_overstocked: bool,

    // Valuation
    pub displayed_average_cost: f64,
    pub stock_value: f64,
    pub on_order_value: f64,
    pub total_potential_value: f64,

    // Velocity and trend
    pub velocity_rank: Option<usize>,
    pub velocity_category: VelocityCategory,
    pub trend_direction: TrendDirection,
    pub trend_percentage: Option<f64>,

    // Buying price
    pub nbp: Option<f64>,
    pub nbp_source: NbpSource,
    pub cost_trend: TrendDirection,
    pub cost_trend_percentage: Option<f64>,

    // Market
    pub lowest_market_price: Option<f64>,
    pub competitor_count: usize,
    pub margin_vs_lowest: Option<f64>,
    pub pricing_strategy: PricingStrategy,
    pub winning_status: WinningStatus,
    pub aah_trend: CompetitorPriceTrend,
    pub nupharm_trend: CompetitorPriceTrend,
    pub eth_net_trend: CompetitorPriceTrend,
    pub lexon_trend: CompetitorPriceTrend,

    pub watchlist: Watchlist,
}

impl ProcessedInventoryItem {
    pub fn stockcode(&self) -> &str {
        &self.raw.stockcode
    }

    /// No stock in the building and nothing on order.
    pub fn is_out_of_stock(&self) -> bool {
        self.current_stock == 0 && self.raw.quantity_on_order == 0
    }

    /// Out of stock but sourceable: a positive minimum cost exists.
    pub fn is_replenishable(&self) -> bool {
        self.is_out_of_stock() && self.raw.min_cost.is_some_and(|c| c > 0.0)
    }

    pub fn is_watchlisted(&self) -> bool {
        self.watchlist.at_risk
    }
}

// ---------------------------------------------------------------------------
// Issue types
// ---------------------------------------------------------------------------

/// The type of priority issue detected for an item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    OutOfStock,
    Overstock,
    CostDisadvantage,
    MarginOpportunity,
}

impl IssueType {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueType::OutOfStock => "out_of_stock",
            IssueType::Overstock => "overstock",
            IssueType::CostDisadvantage => "cost_disadvantage",
            IssueType::MarginOpportunity => "margin_opportunity",
        }
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueType::OutOfStock => write!(f, "Out of Stock"),
            IssueType::Overstock => write!(f, "Overstock"),
            IssueType::CostDisadvantage => write!(f, "Cost Disadvantage"),
            IssueType::MarginOpportunity => write!(f, "Margin Opportunity"),
        }
    }
}

/// Issue severity, ordered from least to most severe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// One level more severe, saturating at critical.
    pub fn raised(self) -> Self {
        match self {
            Severity::Low => Severity::Medium,
            Severity::Medium => Severity::High,
            Severity::High | Severity::Critical => Severity::Critical,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// An actionable issue raised for a single item.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityIssue {
    pub id: String,
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    pub stockcode: String,
    pub description: String,
    pub severity: Severity,
    pub impact_value: f64,
    pub velocity_category: VelocityCategory,
    pub summary: String,
    pub recommendation: String,
}

// ---------------------------------------------------------------------------
// Aggregates
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryStats {
    pub total_products: usize,
    pub total_stock_value: f64,
    pub total_on_order_value: f64,
    pub total_potential_value: f64,

    pub total_overstock_items: usize,
    pub total_overstock_stock_value: f64,
    pub total_overstock_on_order_value: f64,
    pub total_overstock_potential_value: f64,
    pub overstock_percentage: f64,

    pub watchlist_count: usize,
    pub watchlist_value: f64,
    pub overstock_watchlist_count: usize,
    pub overstock_watchlist_value: f64,

    pub out_of_stock_items: usize,
    pub out_of_stock_fast_movers: usize,
    pub replenishable_items: usize,
    pub monthly_lost_revenue: f64,

    pub margin_opportunity_items: usize,
    pub margin_opportunity_value: f64,
    pub cost_disadvantage_items: usize,
    pub cost_disadvantage_value: f64,
    pub stock_risk_items: usize,
    pub stock_risk_value: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VelocityBreakdown {
    pub category: VelocityCategory,
    pub item_count: usize,
    pub stock_value: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendBreakdown {
    pub direction: TrendDirection,
    pub item_count: usize,
    pub stock_value: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyBreakdown {
    pub strategy: PricingStrategy,
    pub item_count: usize,
    pub stock_value: f64,
}

/// Per-file summary of rows and fields that had to be repaired on load.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataQualityReport {
    pub rows_read: usize,
    pub rows_dropped: usize,
    pub rows_repaired: usize,
    /// Field name -> number of cells that were blank or non-numeric.
    pub field_issues: BTreeMap<String, usize>,
    pub duplicate_stockcodes: Vec<String>,
}

impl DataQualityReport {
    pub fn is_clean(&self) -> bool {
        self.rows_dropped == 0 && self.rows_repaired == 0 && self.duplicate_stockcodes.is_empty()
    }
}

/// The full analysis of one uploaded file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedInventoryData {
    pub file_name: String,
    pub total_products: usize,
    pub analyzed_items: Vec<ProcessedInventoryItem>,
    pub overstock_items: Vec<ProcessedInventoryItem>,
    pub watchlist_items: Vec<ProcessedInventoryItem>,
    pub priority_issues: Vec<PriorityIssue>,
    pub summary_stats: SummaryStats,
    pub velocity_breakdown: Vec<VelocityBreakdown>,
    pub trend_breakdown: Vec<TrendBreakdown>,
    pub strategy_breakdown: Vec<StrategyBreakdown>,
    #[serde(default)]
    pub data_quality: DataQualityReport,
}
