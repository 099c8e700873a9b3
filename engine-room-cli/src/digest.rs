//! Human-readable morning digest and the JSON output contract.

use std::fmt::Write as _;

use chrono::Utc;
use serde::Serialize;

use engine_room_pipeline::types::{
    format_months_of_stock, PriorityIssue, ProcessedInventoryData, ProcessedInventoryItem, Severity,
};
use engine_room_pipeline::util::{format_pounds, format_whole_pounds};
use engine_room_pipeline::FilterCategory;

// ---------------------------------------------------------------------------
// JSON output contract
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct DigestJson<'a> {
    pub generated_at: String,
    pub filter: String,
    pub pipeline_ms: u128,
    /// Items in the selected view, capped at `--top`.
    pub items: &'a [ProcessedInventoryItem],
    pub data: &'a ProcessedInventoryData,
}

impl<'a> DigestJson<'a> {
    pub fn new(
        data: &'a ProcessedInventoryData,
        filter: FilterCategory,
        items: &'a [ProcessedInventoryItem],
        pipeline_ms: u128,
    ) -> Self {
        Self {
            generated_at: Utc::now().to_rfc3339(),
            filter: filter.to_string(),
            pipeline_ms,
            items,
            data,
        }
    }
}

// ---------------------------------------------------------------------------
// Text digest
// ---------------------------------------------------------------------------

const RULE_WIDTH: usize = 72;

fn severity_icon(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "!!",
        Severity::High => "! ",
        _ => "  ",
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let head: String = text.chars().take(width.saturating_sub(1)).collect();
        format!("{}\u{2026}", head)
    }
}

fn write_issue(out: &mut String, rank: usize, issue: &PriorityIssue) {
    let _ = writeln!(
        out,
        "  {} {:>2}. {:10} {:20} {:>12}  {:8} vel {}",
        severity_icon(issue.severity),
        rank,
        issue.stockcode,
        issue.issue_type.to_string(),
        format_pounds(issue.impact_value),
        issue.severity.to_string(),
        issue.velocity_category,
    );
    let _ = writeln!(out, "       {}", issue.summary);
    let _ = writeln!(out, "       \u{2192} {}", issue.recommendation);
    let _ = writeln!(out);
}

fn write_item(out: &mut String, item: &ProcessedInventoryItem) {
    let _ = writeln!(
        out,
        "  {:10} {:28} {:>6} {:>7} {:>12}  {:>3} {:6} {:>2} {}",
        item.stockcode(),
        truncate(&item.raw.description, 28),
        item.current_stock,
        format_months_of_stock(item.months_of_stock),
        format_whole_pounds(item.stock_value),
        item.velocity_category,
        item.trend_direction,
        item.winning_status,
        item.watchlist,
    );
}

/// Render the digest: headline totals, the top issues, then the item view.
pub fn render_human(
    data: &ProcessedInventoryData,
    issues: &[PriorityIssue],
    filter: FilterCategory,
    items: &[ProcessedInventoryItem],
    pipeline_ms: u128,
) -> String {
    let stats = &data.summary_stats;
    let mut out = String::new();
    let bar = "\u{2550}".repeat(RULE_WIDTH - 2);

    let _ = writeln!(out);
    let _ = writeln!(out, "  \u{2554}{}\u{2557}", bar);
    let _ = writeln!(
        out,
        "  \u{2551}{:^width$}\u{2551}",
        "ENGINE ROOM \u{00b7} Inventory Morning Digest",
        width = RULE_WIDTH - 2
    );
    let _ = writeln!(out, "  \u{255a}{}\u{255d}", bar);
    let _ = writeln!(out);

    let _ = writeln!(
        out,
        "  {}  \u{00b7}  {} products  \u{00b7}  {} stock value  \u{00b7}  {} on order",
        data.file_name,
        data.total_products,
        format_whole_pounds(stats.total_stock_value),
        format_whole_pounds(stats.total_on_order_value),
    );
    let _ = writeln!(
        out,
        "  {} overstocked ({:.1}% of value, {})  \u{00b7}  {} on watchlist ({})",
        stats.total_overstock_items,
        stats.overstock_percentage,
        format_whole_pounds(stats.total_overstock_stock_value),
        stats.watchlist_count,
        format_whole_pounds(stats.watchlist_value),
    );
    let _ = writeln!(
        out,
        "  {} out of stock ({} fast movers, {} replenishable)  \u{00b7}  {} lost per month",
        stats.out_of_stock_items,
        stats.out_of_stock_fast_movers,
        stats.replenishable_items,
        format_pounds(stats.monthly_lost_revenue),
    );
    let _ = writeln!(
        out,
        "  {} margin opportunities ({})  \u{00b7}  {} cost disadvantages ({})  \u{00b7}  {} at stock risk",
        stats.margin_opportunity_items,
        format_whole_pounds(stats.margin_opportunity_value),
        stats.cost_disadvantage_items,
        format_whole_pounds(stats.cost_disadvantage_value),
        stats.stock_risk_items,
    );

    let quality = &data.data_quality;
    if !quality.is_clean() {
        let _ = writeln!(
            out,
            "  data quality: {} rows read, {} dropped, {} repaired, {} duplicate codes",
            quality.rows_read,
            quality.rows_dropped,
            quality.rows_repaired,
            quality.duplicate_stockcodes.len(),
        );
    }
    let _ = writeln!(out);

    if issues.is_empty() {
        let _ = writeln!(out, "  No priority issues detected. All clear!");
        let _ = writeln!(out);
    } else {
        let _ = writeln!(
            out,
            "  Top {} of {} priority issues",
            issues.len(),
            data.priority_issues.len()
        );
        let _ = writeln!(out, "  {:\u{2500}<width$}", "", width = RULE_WIDTH);
        for (i, issue) in issues.iter().enumerate() {
            write_issue(&mut out, i + 1, issue);
        }
    }

    let _ = writeln!(out, "  View: {} ({} items shown)", filter, items.len());
    let _ = writeln!(out, "  {:\u{2500}<width$}", "", width = RULE_WIDTH);
    for item in items {
        write_item(&mut out, item);
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "  Pipeline: {}ms", pipeline_ms);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_room_pipeline::inventory_loader::RawInventoryItem;
    use engine_room_pipeline::InventoryAnalysisPipeline;

    fn sample() -> ProcessedInventoryData {
        let rows = vec![
            RawInventoryItem {
                stockcode: "EMPTY".into(),
                description: "Empty shelf".into(),
                packs_sold_avg_last_six_months: 10.0,
                avg_cost: 5.0,
                min_cost: Some(5.0),
                nupharm: Some(8.0),
                ..RawInventoryItem::default()
            },
            RawInventoryItem {
                stockcode: "DEEP".into(),
                description: "A very long description that will not fit the column".into(),
                quantity_available: 1_500,
                packs_sold_avg_last_six_months: 2.0,
                avg_cost: 10.0,
                ..RawInventoryItem::default()
            },
        ];
        InventoryAnalysisPipeline::default().run("digest.csv", &rows)
    }

    #[test]
    fn human_digest_lists_totals_and_issues() {
        let data = sample();
        let text = render_human(&data, &data.priority_issues, FilterCategory::All, &data.analyzed_items, 3);
        assert!(text.contains("ENGINE ROOM"));
        assert!(text.contains("2 products"));
        assert!(text.contains("\u{a3}15,000 stock value"));
        assert!(text.contains("\u{a3}30.00 lost per month"));
        assert!(text.contains("Top 3 of 3 priority issues"));
        assert!(text.contains("DEEP"));
        assert!(text.contains("A very long description tha\u{2026}"));
        assert!(text.contains("View: all (2 items shown)"));
        assert!(!text.contains("data quality"));
    }

    #[test]
    fn empty_issue_list_says_all_clear() {
        let data = InventoryAnalysisPipeline::default().run("none.csv", &[]);
        let text = render_human(&data, &[], FilterCategory::Overstock, &[], 0);
        assert!(text.contains("All clear"));
        assert!(text.contains("View: overstock (0 items shown)"));
    }

    #[test]
    fn json_envelope_carries_timestamp_and_view() {
        let data = sample();
        let json = serde_json::to_value(DigestJson::new(
            &data,
            FilterCategory::Watchlist,
            &data.watchlist_items,
            7,
        ))
        .unwrap();
        assert_eq!(json["filter"], "watchlist");
        assert_eq!(json["pipeline_ms"], 7);
        assert!(json["generated_at"].as_str().unwrap().contains('T'));
        assert_eq!(json["data"]["fileName"], "digest.csv");
        assert_eq!(json["items"].as_array().unwrap().len(), data.watchlist_items.len());
    }
}
