//! Per-item derived metrics.
//!
//! Everything except velocity is a function of the row alone. Velocity needs
//! the whole file: rows with positive usage are ranked by usage, descending,
//! and the rank decides the band.

use std::cmp::Ordering;

use crate::inventory_loader::RawInventoryItem;
use crate::policy::{AnalysisPolicy, MAX_VELOCITY_CATEGORY};
use crate::pricing;
use crate::types::{
    ProcessedInventoryItem, TrendDirection, VelocityCategory, Watchlist, MONTHS_OF_STOCK_SENTINEL,
};

/// Monthly usage: the precomputed override when positive, else the six-month
/// average when positive, else nothing.
pub fn monthly_usage(item: &RawInventoryItem) -> Option<f64> {
    [item.average_usage, Some(item.packs_sold_avg_last_six_months)]
        .into_iter()
        .flatten()
        .find(|v| v.is_finite() && *v > 0.0)
}

/// Stock on hand divided by monthly usage, or the sentinel without usage.
pub fn months_of_stock(current_stock: i64, usage: Option<f64>) -> f64 {
    match usage {
        Some(u) if u > 0.0 => current_stock as f64 / u,
        _ => MONTHS_OF_STOCK_SENTINEL,
    }
}

/// Rank every row by usage. The result is index-aligned with `items`;
/// rows without usage get `None`. Equal usage is broken by stock code so the
/// ranking is stable across runs.
pub fn velocity_ranks(items: &[RawInventoryItem]) -> Vec<Option<usize>> {
    let mut ranked: Vec<(usize, f64)> = items
        .iter()
        .enumerate()
        .filter_map(|(idx, item)| monthly_usage(item).map(|u| (idx, u)))
        .collect();
    ranked.sort_by(|(ia, ua), (ib, ub)| {
        ub.partial_cmp(ua)
            .unwrap_or(Ordering::Equal)
            .then_with(|| items[*ia].stockcode.cmp(&items[*ib].stockcode))
            .then_with(|| ia.cmp(ib))
    });

    let mut ranks = vec![None; items.len()];
    for (position, (idx, _)) in ranked.into_iter().enumerate() {
        ranks[idx] = Some(position + 1);
    }
    ranks
}

/// Band a 1-based rank: ranks 1..=band_size are category 1, and so on,
/// with everything past the last band collapsed into it.
pub fn velocity_category(rank: Option<usize>, band_size: usize) -> VelocityCategory {
    match rank {
        Some(rank) if rank > 0 => {
            let band = rank.div_ceil(band_size.max(1));
            let capped = band.min(MAX_VELOCITY_CATEGORY as usize) as u8;
            VelocityCategory::Ranked(capped)
        }
        _ => VelocityCategory::NotAvailable,
    }
}

/// Recent 30-day sales against the six-month monthly average.
pub fn usage_trend(item: &RawInventoryItem, threshold_pct: f64) -> (TrendDirection, Option<f64>) {
    let recent = item
        .packs_sold_last_30_days
        .filter(|v| v.is_finite() && *v >= 0.0);
    pricing::compare_with_band(
        recent,
        Some(item.packs_sold_avg_last_six_months),
        threshold_pct,
    )
}

/// Derive every computed field of one row.
pub fn analyze_item(
    raw: &RawInventoryItem,
    velocity_rank: Option<usize>,
    policy: &AnalysisPolicy,
) -> ProcessedInventoryItem {
    let current_stock = raw.quantity_available + raw.quantity_ringfenced;
    let total_stock = current_stock + raw.quantity_on_order;

    let cost = pricing::displayed_average_cost(raw);
    let stock_value = current_stock as f64 * cost;
    let on_order_value = raw.quantity_on_order as f64 * cost;
    let total_potential_value = total_stock as f64 * cost;

    let usage = monthly_usage(raw);
    let months = months_of_stock(current_stock, usage);
    let is_overstocked = usage.is_some() && months > policy.overstock_months;

    let velocity_category = velocity_category(velocity_rank, policy.velocity_band_size);
    let (trend_direction, trend_percentage) = usage_trend(raw, policy.trend_threshold_pct);

    let (nbp, nbp_source) = pricing::resolve_nbp(raw);
    let (cost_trend, cost_trend_percentage) =
        pricing::cost_trend(raw, nbp, policy.cost_trend_threshold_pct);

    let lowest = pricing::lowest_competitor_price(raw);
    let competitor_count = pricing::competitor_prices(raw).len();

    let slow_and_deep = usage.is_some()
        && months > policy.watchlist_months
        && trend_direction != TrendDirection::Up;
    let watchlist = Watchlist {
        at_risk: raw.group == Some(1) || slow_and_deep,
        supplier_out_of_stock: raw.eth_out_of_stock,
    };

    ProcessedInventoryItem {
        id: format!("inv_{}", raw.stockcode),
        current_stock,
        total_stock,
        monthly_usage: usage,
        months_of_stock: months,
        is_overstocked,
        displayed_average_cost: cost,
        stock_value,
        on_order_value,
        total_potential_value,
        velocity_rank,
        velocity_category,
        trend_direction,
        trend_percentage,
        nbp,
        nbp_source,
        cost_trend,
        cost_trend_percentage,
        lowest_market_price: lowest,
        competitor_count,
        margin_vs_lowest: pricing::margin_vs_lowest(cost, lowest),
        pricing_strategy: pricing::pricing_strategy(cost, lowest),
        winning_status: pricing::winning_status(raw),
        aah_trend: pricing::competitor_trend(raw.aah2, raw.aah_yesterday),
        nupharm_trend: pricing::competitor_trend(raw.nupharm, raw.nupharm_yesterday),
        eth_net_trend: pricing::competitor_trend(raw.eth_net, raw.eth_net_yesterday),
        lexon_trend: pricing::competitor_trend(raw.lexon2, raw.lexon2_yesterday),
        watchlist,
        raw: raw.clone(),
    }
}

/// Derive every row of a file, in input order.
pub fn analyze_items(items: &[RawInventoryItem], policy: &AnalysisPolicy) -> Vec<ProcessedInventoryItem> {
    let ranks = velocity_ranks(items);
    items
        .iter()
        .zip(ranks)
        .map(|(item, rank)| analyze_item(item, rank, policy))
        .collect()
}
