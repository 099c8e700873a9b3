//! Cost resolution and competitor price comparison.
//!
//! All helpers here work on a single `RawInventoryItem` and never look at
//! other rows. Absent or non-positive prices are "no data": they are skipped,
//! never compared as zero.

use crate::inventory_loader::RawInventoryItem;
use crate::types::{
    CompetitorPriceTrend, CompetitorTrend, NbpSource, PricingStrategy, TrendDirection,
    WinningStatus,
};

/// Markup over cost above which the lowest competitor price leaves a healthy margin.
pub const PROFITABLE_MARKUP: f64 = 1.1;

/// Day-over-day percentage change below which a competitor price is STABLE.
pub const COMPETITOR_STABLE_PCT: f64 = 0.05;

/// A positive price or nothing.
fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

/// Day-over-day changes are reported to two decimal places and the stability
/// check runs on the rounded percentage.
fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// The cost every valuation and comparison uses: the blended next average
/// cost when it is positive, else `avg_cost`.
pub fn displayed_average_cost(item: &RawInventoryItem) -> f64 {
    positive(item.calculated_next_avg_cost).unwrap_or(item.avg_cost)
}

/// Resolve the next buying price. Candidates are tried in order and the
/// first positive one wins.
pub fn resolve_nbp(item: &RawInventoryItem) -> (Option<f64>, NbpSource) {
    let candidates = [
        (item.next_cost, NbpSource::NextCost),
        (item.min_cost, NbpSource::MinCost),
        (item.last_po_cost, NbpSource::LastPoCost),
    ];
    candidates
        .into_iter()
        .find_map(|(value, source)| positive(value).map(|v| (Some(v), source)))
        .unwrap_or((None, NbpSource::None))
}

/// Compare `current` against `baseline` with a symmetric percentage band.
///
/// Returns the direction and the percentage change. `N/A` when either side
/// is missing or the baseline is not positive.
pub fn compare_with_band(
    current: Option<f64>,
    baseline: Option<f64>,
    threshold_pct: f64,
) -> (TrendDirection, Option<f64>) {
    let (Some(current), Some(baseline)) = (current, baseline) else {
        return (TrendDirection::NotAvailable, None);
    };
    if !current.is_finite() || !baseline.is_finite() || baseline <= 0.0 {
        return (TrendDirection::NotAvailable, None);
    }
    let pct = (current - baseline) / baseline * 100.0;
    let direction = if pct > threshold_pct {
        TrendDirection::Up
    } else if pct < -threshold_pct {
        TrendDirection::Down
    } else {
        TrendDirection::Stable
    };
    (direction, Some(pct))
}

/// Next buying price against the current average cost.
pub fn cost_trend(item: &RawInventoryItem, nbp: Option<f64>, threshold_pct: f64) -> (TrendDirection, Option<f64>) {
    compare_with_band(nbp, positive(Some(item.avg_cost)), threshold_pct)
}

/// Positive competitor prices in the fixed competitor order.
pub fn competitor_prices(item: &RawInventoryItem) -> Vec<f64> {
    [item.nupharm, item.aah2, item.eth_list, item.eth_net, item.lexon2]
        .into_iter()
        .filter_map(positive)
        .collect()
}

/// Cheapest competitor price, if any competitor has data.
pub fn lowest_competitor_price(item: &RawInventoryItem) -> Option<f64> {
    competitor_prices(item).into_iter().reduce(f64::min)
}

/// Our price against the cheapest competitor. Only a strictly lower price wins.
pub fn winning_status(item: &RawInventoryItem) -> WinningStatus {
    let (Some(ours), Some(low)) = (positive(item.aver), lowest_competitor_price(item)) else {
        return WinningStatus::NoAdvantage;
    };
    if ours < low {
        WinningStatus::Winning
    } else if ours > low {
        WinningStatus::Losing
    } else {
        WinningStatus::NoAdvantage
    }
}

/// Percentage headroom between the lowest competitor price and our cost.
pub fn margin_vs_lowest(cost: f64, lowest: Option<f64>) -> Option<f64> {
    let low = lowest?;
    (cost > 0.0).then(|| (low - cost) / cost * 100.0)
}

pub fn pricing_strategy(cost: f64, lowest: Option<f64>) -> PricingStrategy {
    match lowest {
        Some(low) if cost > 0.0 => {
            if low > cost * PROFITABLE_MARKUP {
                PricingStrategy::Profitable
            } else if low > cost {
                PricingStrategy::Marginal
            } else {
                PricingStrategy::LossRequired
            }
        }
        _ => PricingStrategy::Unknown,
    }
}

/// Day-over-day movement of one competitor's price.
pub fn competitor_trend(current: Option<f64>, yesterday: Option<f64>) -> CompetitorPriceTrend {
    let current = positive(current);
    let yesterday = positive(yesterday);
    match (current, yesterday) {
        (None, _) => CompetitorPriceTrend {
            current: None,
            yesterday,
            trend: CompetitorTrend::Unknown,
            percentage_change: None,
            change_amount: None,
        },
        (Some(today), None) => CompetitorPriceTrend {
            current: Some(today),
            yesterday: None,
            trend: CompetitorTrend::New,
            percentage_change: None,
            change_amount: None,
        },
        (Some(today), Some(prev)) => {
            let change = today - prev;
            let pct = round_cents(change / prev * 100.0);
            let trend = if pct.abs() < COMPETITOR_STABLE_PCT {
                CompetitorTrend::Stable
            } else if change > 0.0 {
                CompetitorTrend::Up
            } else {
                CompetitorTrend::Down
            };
            CompetitorPriceTrend {
                current: Some(today),
                yesterday: Some(prev),
                trend,
                percentage_change: Some(pct),
                change_amount: Some(round_cents(change)),
            }
        }
    }
}
