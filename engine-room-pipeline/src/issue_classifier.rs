//! Priority issue classification.
//!
//! Each analyzed item yields zero or more `PriorityIssue`s. The four checks
//! run independently, so one line can be both overstocked and at a cost
//! disadvantage. Impact is always a pound figure computed from the item:
//!
//! - Out of stock: monthly lost revenue, `max(0, lowest competitor - min_cost) x usage`,
//!   only when the line is replenishable and competitors have a price.
//! - Overstock: the stock value tied up on the shelf.
//! - Cost disadvantage: `(cost - lowest competitor) x current stock`.
//! - Margin opportunity: `(lowest competitor - cost) x current stock`.
//!
//! Negative stock (oversold lines) counts as zero in both stock-based impacts.
//!
//! Severity comes from the impact cut-offs, then fast movers are raised one level.

use crate::policy::AnalysisPolicy;
use crate::types::{
    format_months_of_stock, IssueType, PriorityIssue, ProcessedInventoryItem, Severity,
    VelocityCategory,
};
use crate::util::format_pounds;

/// Severity for an impact value, raised one level for fast movers.
///
/// For a fixed velocity category this never decreases as impact grows.
pub fn severity_for(impact: f64, velocity: VelocityCategory, policy: &AnalysisPolicy) -> Severity {
    let cut = &policy.severity;
    let base = if impact >= cut.critical {
        Severity::Critical
    } else if impact >= cut.high {
        Severity::High
    } else if impact >= cut.medium {
        Severity::Medium
    } else {
        Severity::Low
    };
    if velocity.is_fast_mover(policy.fast_mover_max_category) {
        base.raised()
    } else {
        base
    }
}

/// Monthly revenue lost while a replenishable line sits at zero.
pub fn monthly_lost_revenue(item: &ProcessedInventoryItem) -> f64 {
    if !item.is_replenishable() {
        return 0.0;
    }
    match (item.lowest_market_price, item.raw.min_cost, item.monthly_usage) {
        (Some(low), Some(min_cost), Some(usage)) => (low - min_cost).max(0.0) * usage,
        _ => 0.0,
    }
}

fn stock_on_hand(item: &ProcessedInventoryItem) -> f64 {
    item.current_stock.max(0) as f64
}

/// Pounds overpaid across current stock when our cost beats the market price.
pub fn cost_disadvantage_impact(item: &ProcessedInventoryItem) -> Option<f64> {
    let low = item.lowest_market_price?;
    let cost = item.displayed_average_cost;
    (cost > low).then(|| (cost - low) * stock_on_hand(item))
}

/// Headroom across current stock when cost sits well under the market price.
pub fn margin_opportunity_impact(item: &ProcessedInventoryItem, policy: &AnalysisPolicy) -> Option<f64> {
    let low = item.lowest_market_price?;
    let cost = item.displayed_average_cost;
    (cost < low * policy.margin_opportunity_ratio).then(|| (low - cost) * stock_on_hand(item))
}

fn issue(
    item: &ProcessedInventoryItem,
    issue_type: IssueType,
    impact_value: f64,
    summary: String,
    recommendation: String,
    policy: &AnalysisPolicy,
) -> PriorityIssue {
    PriorityIssue {
        id: format!("issue_{}_{}", item.stockcode(), issue_type.as_str()),
        issue_type,
        stockcode: item.stockcode().to_string(),
        description: item.raw.description.clone(),
        severity: severity_for(impact_value, item.velocity_category, policy),
        impact_value,
        velocity_category: item.velocity_category,
        summary,
        recommendation,
    }
}

/// Classify a single analyzed item into zero or more issues.
pub fn classify_item(item: &ProcessedInventoryItem, policy: &AnalysisPolicy) -> Vec<PriorityIssue> {
    let mut issues = Vec::new();

    // --- Out of stock ---
    if item.is_out_of_stock() {
        let lost = monthly_lost_revenue(item);
        let (summary, recommendation) = if item.is_replenishable() {
            (
                format!(
                    "Out of stock with nothing on order; about {} of sales lost per month",
                    format_pounds(lost)
                ),
                match item.raw.min_supplier.as_deref() {
                    Some(supplier) => format!(
                        "Reorder now at {} from {}",
                        format_pounds(item.raw.min_cost.unwrap_or_default()),
                        supplier
                    ),
                    None => format!(
                        "Reorder now at {}",
                        format_pounds(item.raw.min_cost.unwrap_or_default())
                    ),
                },
            )
        } else {
            (
                "Out of stock with nothing on order and no buying price available".to_string(),
                "Find a supplier price before reordering".to_string(),
            )
        };
        issues.push(issue(item, IssueType::OutOfStock, lost, summary, recommendation, policy));
    }

    // --- Overstock ---
    if item.is_overstocked {
        issues.push(issue(
            item,
            IssueType::Overstock,
            item.stock_value,
            format!(
                "{} months of stock on hand ({} tied up)",
                format_months_of_stock(item.months_of_stock),
                format_pounds(item.stock_value)
            ),
            "Hold further orders and run down stock".to_string(),
            policy,
        ));
    }

    // --- Cost disadvantage ---
    if let (Some(impact), Some(low)) = (cost_disadvantage_impact(item), item.lowest_market_price) {
        issues.push(issue(
            item,
            IssueType::CostDisadvantage,
            impact,
            format!(
                "Cost {} is above the lowest market price {}",
                format_pounds(item.displayed_average_cost),
                format_pounds(low)
            ),
            "Renegotiate cost or source from a cheaper supplier".to_string(),
            policy,
        ));
    }

    // --- Margin opportunity ---
    if let (Some(impact), Some(low)) = (margin_opportunity_impact(item, policy), item.lowest_market_price) {
        let margin = item.margin_vs_lowest.unwrap_or_default();
        issues.push(issue(
            item,
            IssueType::MarginOpportunity,
            impact,
            format!(
                "Cost {} is {:.1}% under the lowest market price {}",
                format_pounds(item.displayed_average_cost),
                margin,
                format_pounds(low)
            ),
            "Review selling price upward toward the market".to_string(),
            policy,
        ));
    }

    issues
}

/// Classify every item. Issues come out in item order; callers sort.
pub fn classify_items(items: &[ProcessedInventoryItem], policy: &AnalysisPolicy) -> Vec<PriorityIssue> {
    items
        .iter()
        .flat_map(|item| classify_item(item, policy))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derive::analyze_item;
    use crate::inventory_loader::RawInventoryItem;

    fn make_item(
        code: &str,
        available: i64,
        usage: f64,
        cost: f64,
        competitors: &[f64],
        rank: Option<usize>,
    ) -> ProcessedInventoryItem {
        let mut raw = RawInventoryItem {
            stockcode: code.to_string(),
            description: format!("{code} line"),
            quantity_available: available,
            packs_sold_avg_last_six_months: usage,
            avg_cost: cost,
            ..RawInventoryItem::default()
        };
        let mut slots = competitors.iter().copied();
        raw.nupharm = slots.next();
        raw.aah2 = slots.next();
        raw.eth_list = slots.next();
        analyze_item(&raw, rank, &AnalysisPolicy::default())
    }

    #[test]
    fn severity_cutoffs_and_fast_mover_raise() {
        let policy = AnalysisPolicy::default();
        let slow = VelocityCategory::Ranked(5);
        let fast = VelocityCategory::Ranked(1);
        assert_eq!(severity_for(10_000.0, slow, &policy), Severity::Critical);
        assert_eq!(severity_for(9_999.99, slow, &policy), Severity::High);
        assert_eq!(severity_for(2_500.0, slow, &policy), Severity::High);
        assert_eq!(severity_for(500.0, slow, &policy), Severity::Medium);
        assert_eq!(severity_for(499.0, slow, &policy), Severity::Low);
        assert_eq!(severity_for(499.0, fast, &policy), Severity::Medium);
        assert_eq!(severity_for(20_000.0, fast, &policy), Severity::Critical);
        assert_eq!(severity_for(600.0, VelocityCategory::NotAvailable, &policy), Severity::Medium);
    }

    #[test]
    fn out_of_stock_replenishable_reports_lost_revenue() {
        let mut item = make_item("A", 0, 10.0, 4.0, &[8.0], Some(1));
        item.raw.min_cost = Some(5.0);
        let issues = classify_item(&item, &AnalysisPolicy::default());
        let oos: Vec<_> = issues
            .iter()
            .filter(|i| i.issue_type == IssueType::OutOfStock)
            .collect();
        assert_eq!(oos.len(), 1);
        // (8 - 5) x 10 per month
        assert!((oos[0].impact_value - 30.0).abs() < 0.01);
        assert_eq!(oos[0].id, "issue_A_out_of_stock");
        // Fast mover: low impact raised to medium.
        assert_eq!(oos[0].severity, Severity::Medium);
    }

    #[test]
    fn out_of_stock_without_min_cost_has_zero_impact() {
        let item = make_item("A", 0, 10.0, 4.0, &[8.0], Some(1));
        let issues = classify_item(&item, &AnalysisPolicy::default());
        assert_eq!(issues[0].issue_type, IssueType::OutOfStock);
        assert_eq!(issues[0].impact_value, 0.0);
    }

    #[test]
    fn stock_on_order_is_not_out_of_stock() {
        let mut item = make_item("A", 0, 10.0, 4.0, &[], Some(1));
        item.raw.quantity_on_order = 5;
        assert!(classify_item(&item, &AnalysisPolicy::default()).is_empty());
    }

    #[test]
    fn overstock_impact_is_stock_value() {
        let item = make_item("B", 500, 2.0, 3.0, &[], Some(900));
        let issues = classify_item(&item, &AnalysisPolicy::default());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, IssueType::Overstock);
        assert!((issues[0].impact_value - 1500.0).abs() < 0.01);
        assert_eq!(issues[0].severity, Severity::Medium);
    }

    #[test]
    fn cost_disadvantage_uses_current_stock() {
        let item = make_item("C", 10, 10.0, 12.0, &[10.0, 11.0], Some(900));
        let issues = classify_item(&item, &AnalysisPolicy::default());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, IssueType::CostDisadvantage);
        assert!((issues[0].impact_value - 20.0).abs() < 0.01);
    }

    #[test]
    fn margin_opportunity_is_strictly_below_ratio() {
        let policy = AnalysisPolicy::default();
        // 9.0 == 10.0 x 0.9: boundary is not an opportunity
        let at_boundary = make_item("D", 10, 10.0, 9.0, &[10.0], Some(900));
        assert!(margin_opportunity_impact(&at_boundary, &policy).is_none());
        assert!(classify_item(&at_boundary, &policy).is_empty());

        let below = make_item("E", 10, 10.0, 8.0, &[10.0], Some(900));
        let issues = classify_item(&below, &policy);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, IssueType::MarginOpportunity);
        assert!((issues[0].impact_value - 20.0).abs() < 0.01);
    }

    #[test]
    fn oversold_stock_never_gives_negative_impact() {
        let policy = AnalysisPolicy::default();
        let dear = make_item("N1", -40, 10.0, 12.0, &[10.0], Some(900));
        let cheap = make_item("N2", -40, 10.0, 5.0, &[10.0], Some(900));
        assert_eq!(cost_disadvantage_impact(&dear), Some(0.0));
        assert_eq!(margin_opportunity_impact(&cheap, &policy), Some(0.0));

        let issues: Vec<_> = [dear, cheap]
            .iter()
            .flat_map(|i| classify_item(i, &policy))
            .collect();
        assert!(issues.iter().all(|i| i.impact_value >= 0.0));
    }

    #[test]
    fn multiple_issues_from_one_item() {
        // Overstocked and priced above market.
        let item = make_item("F", 1_000, 5.0, 20.0, &[15.0], Some(900));
        let issues = classify_item(&item, &AnalysisPolicy::default());
        let types: Vec<_> = issues.iter().map(|i| i.issue_type).collect();
        assert_eq!(types, vec![IssueType::Overstock, IssueType::CostDisadvantage]);
        assert_eq!(issues[0].severity, Severity::Critical);
        assert_eq!(issues[1].severity, Severity::High);
    }

    #[test]
    fn healthy_item_produces_no_issues() {
        let item = make_item("G", 20, 10.0, 9.5, &[10.0], Some(10));
        assert!(classify_item(&item, &AnalysisPolicy::default()).is_empty());
    }
}
