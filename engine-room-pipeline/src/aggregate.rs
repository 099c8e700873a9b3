//! Summary statistics and breakdowns over analyzed items.
//!
//! Pure functions of the item list and policy. Sums run in item order, so the
//! same input always produces bit-identical totals.

use crate::issue_classifier::{cost_disadvantage_impact, margin_opportunity_impact, monthly_lost_revenue};
use crate::policy::{AnalysisPolicy, MAX_VELOCITY_CATEGORY};
use crate::types::{
    PricingStrategy, ProcessedInventoryItem, StrategyBreakdown, SummaryStats, TrendBreakdown,
    TrendDirection, VelocityBreakdown, VelocityCategory,
};

/// Weeks of supply left at current usage. `None` without usage.
pub fn weeks_of_supply(item: &ProcessedInventoryItem) -> Option<f64> {
    let monthly = item.monthly_usage?;
    let weekly = monthly * 12.0 / 52.0;
    (weekly > 0.0).then(|| item.current_stock as f64 / weekly)
}

/// A selling line that will run out within the stock-risk window.
pub fn is_stock_risk(item: &ProcessedInventoryItem, policy: &AnalysisPolicy) -> bool {
    weeks_of_supply(item).is_some_and(|weeks| weeks < policy.stock_risk_weeks)
}

/// Compute the summary statistics for a set of analyzed items.
pub fn aggregate(items: &[ProcessedInventoryItem], policy: &AnalysisPolicy) -> SummaryStats {
    let mut stats = SummaryStats {
        total_products: items.len(),
        ..SummaryStats::default()
    };

    for item in items {
        stats.total_stock_value += item.stock_value;
        stats.total_on_order_value += item.on_order_value;
        stats.total_potential_value += item.total_potential_value;

        if item.is_overstocked {
            stats.total_overstock_items += 1;
            stats.total_overstock_stock_value += item.stock_value;
            stats.total_overstock_on_order_value += item.on_order_value;
            stats.total_overstock_potential_value += item.total_potential_value;
        }

        if item.is_watchlisted() {
            stats.watchlist_count += 1;
            stats.watchlist_value += item.stock_value;
            if item.is_overstocked {
                stats.overstock_watchlist_count += 1;
                stats.overstock_watchlist_value += item.stock_value;
            }
        }

        if item.is_out_of_stock() {
            stats.out_of_stock_items += 1;
            if item
                .velocity_category
                .is_fast_mover(policy.fast_mover_max_category)
            {
                stats.out_of_stock_fast_movers += 1;
            }
            if item.is_replenishable() {
                stats.replenishable_items += 1;
                stats.monthly_lost_revenue += monthly_lost_revenue(item);
            }
        }

        if let Some(impact) = margin_opportunity_impact(item, policy) {
            stats.margin_opportunity_items += 1;
            stats.margin_opportunity_value += impact;
        }
        if let Some(impact) = cost_disadvantage_impact(item) {
            stats.cost_disadvantage_items += 1;
            stats.cost_disadvantage_value += impact;
        }

        if is_stock_risk(item, policy) {
            stats.stock_risk_items += 1;
            stats.stock_risk_value += item.stock_value;
        }
    }

    stats.overstock_percentage = if stats.total_stock_value > 0.0 {
        stats.total_overstock_stock_value / stats.total_stock_value * 100.0
    } else {
        0.0
    };

    stats
}

/// Item count and stock value per velocity category, 1 to 5 then N/A.
pub fn velocity_breakdown(items: &[ProcessedInventoryItem]) -> Vec<VelocityBreakdown> {
    (1..=MAX_VELOCITY_CATEGORY)
        .map(VelocityCategory::Ranked)
        .chain(std::iter::once(VelocityCategory::NotAvailable))
        .map(|category| {
            let (item_count, stock_value) = tally(items, |i| i.velocity_category == category);
            VelocityBreakdown {
                category,
                item_count,
                stock_value,
            }
        })
        .collect()
}

/// Item count and stock value per usage trend. Items without a trend are left out.
pub fn trend_breakdown(items: &[ProcessedInventoryItem]) -> Vec<TrendBreakdown> {
    TrendDirection::ALL_KNOWN
        .into_iter()
        .map(|direction| {
            let (item_count, stock_value) = tally(items, |i| i.trend_direction == direction);
            TrendBreakdown {
                direction,
                item_count,
                stock_value,
            }
        })
        .collect()
}

/// Item count and stock value per pricing strategy.
pub fn strategy_breakdown(items: &[ProcessedInventoryItem]) -> Vec<StrategyBreakdown> {
    PricingStrategy::ALL
        .into_iter()
        .map(|strategy| {
            let (item_count, stock_value) = tally(items, |i| i.pricing_strategy == strategy);
            StrategyBreakdown {
                strategy,
                item_count,
                stock_value,
            }
        })
        .collect()
}

fn tally(items: &[ProcessedInventoryItem], pred: impl Fn(&ProcessedInventoryItem) -> bool) -> (usize, f64) {
    items
        .iter()
        .filter(|i| pred(i))
        .fold((0, 0.0), |(count, value), i| (count + 1, value + i.stock_value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derive::analyze_items;
    use crate::inventory_loader::RawInventoryItem;

    fn raw(code: &str, available: i64, usage: f64, cost: f64) -> RawInventoryItem {
        RawInventoryItem {
            stockcode: code.to_string(),
            description: code.to_string(),
            quantity_available: available,
            packs_sold_avg_last_six_months: usage,
            avg_cost: cost,
            ..RawInventoryItem::default()
        }
    }

    #[test]
    fn empty_input_gives_zero_stats() {
        let stats = aggregate(&[], &AnalysisPolicy::default());
        assert_eq!(stats, SummaryStats::default());
        assert_eq!(stats.overstock_percentage, 0.0);
    }

    #[test]
    fn overstock_percentage_is_value_based() {
        let policy = AnalysisPolicy::default();
        // 700 value overstocked (700 / 10 = 70 months), 300 value healthy.
        let items = analyze_items(&[raw("A", 700, 10.0, 1.0), raw("B", 30, 10.0, 10.0)], &policy);
        let stats = aggregate(&items, &policy);
        assert_eq!(stats.total_overstock_items, 1);
        assert!((stats.total_stock_value - 1000.0).abs() < 1e-9);
        assert!((stats.overstock_percentage - 70.0).abs() < 1e-9);
    }

    #[test]
    fn oversold_lines_do_not_offset_pricing_totals() {
        let policy = AnalysisPolicy::default();
        let mut dear = raw("DEAR", 10, 5.0, 12.0);
        dear.nupharm = Some(10.0);
        let mut oversold = raw("OVER", -50, 5.0, 12.0);
        oversold.nupharm = Some(10.0);
        let items = analyze_items(&[dear, oversold], &policy);
        let stats = aggregate(&items, &policy);
        assert_eq!(stats.cost_disadvantage_items, 2);
        assert!((stats.cost_disadvantage_value - 20.0).abs() < 1e-9);
    }

    #[test]
    fn zero_value_inventory_has_zero_percentage() {
        let policy = AnalysisPolicy::default();
        let items = analyze_items(&[raw("A", 700, 10.0, 0.0)], &policy);
        let stats = aggregate(&items, &policy);
        assert_eq!(stats.total_overstock_items, 1);
        assert_eq!(stats.overstock_percentage, 0.0);
    }

    #[test]
    fn stock_risk_uses_weekly_usage() {
        let policy = AnalysisPolicy::default();
        // 52 / month = 12 / week: 23 packs is under two weeks, 24 is not.
        let items = analyze_items(&[raw("A", 23, 52.0, 1.0), raw("B", 24, 52.0, 1.0)], &policy);
        assert!(is_stock_risk(&items[0], &policy));
        assert!(!is_stock_risk(&items[1], &policy));
        let stats = aggregate(&items, &policy);
        assert_eq!(stats.stock_risk_items, 1);
        assert!((stats.stock_risk_value - 23.0).abs() < 1e-9);
    }

    #[test]
    fn competitive_totals_match_issue_impacts() {
        let policy = AnalysisPolicy::default();
        let mut over = raw("A", 10, 10.0, 12.0);
        over.nupharm = Some(10.0);
        let mut under = raw("B", 5, 10.0, 5.0);
        under.aah2 = Some(10.0);
        let items = analyze_items(&[over, under], &policy);
        let stats = aggregate(&items, &policy);
        assert_eq!(stats.cost_disadvantage_items, 1);
        assert!((stats.cost_disadvantage_value - 20.0).abs() < 1e-9);
        assert_eq!(stats.margin_opportunity_items, 1);
        assert!((stats.margin_opportunity_value - 25.0).abs() < 1e-9);
    }

    #[test]
    fn breakdowns_use_fixed_order() {
        let policy = AnalysisPolicy::default();
        let mut trending = raw("A", 10, 10.0, 1.0);
        trending.packs_sold_last_30_days = Some(20.0);
        let items = analyze_items(&[trending, raw("B", 10, 0.0, 1.0)], &policy);

        let velocity = velocity_breakdown(&items);
        assert_eq!(velocity.len(), 6);
        assert_eq!(velocity[0].category, VelocityCategory::Ranked(1));
        assert_eq!(velocity[0].item_count, 1);
        assert_eq!(velocity[5].category, VelocityCategory::NotAvailable);
        assert_eq!(velocity[5].item_count, 1);

        let trend = trend_breakdown(&items);
        let directions: Vec<_> = trend.iter().map(|t| t.direction).collect();
        assert_eq!(directions, TrendDirection::ALL_KNOWN.to_vec());
        assert_eq!(trend[0].item_count, 1);
        assert_eq!(trend.iter().map(|t| t.item_count).sum::<usize>(), 1);

        let strategy = strategy_breakdown(&items);
        assert_eq!(strategy.len(), 4);
        assert_eq!(strategy[3].strategy, PricingStrategy::Unknown);
        assert_eq!(strategy[3].item_count, 2);
    }

    #[test]
    fn aggregate_is_idempotent() {
        let policy = AnalysisPolicy::default();
        let items = analyze_items(&[raw("A", 700, 10.0, 1.3), raw("B", 0, 3.0, 2.0)], &policy);
        assert_eq!(aggregate(&items, &policy), aggregate(&items, &policy));
    }
}
