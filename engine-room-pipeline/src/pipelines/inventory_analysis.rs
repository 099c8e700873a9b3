use crate::aggregate;
use crate::derive;
use crate::inventory_loader::{LoadedInventory, RawInventoryItem};
use crate::issue_classifier;
use crate::policy::AnalysisPolicy;
use crate::selector::{ImpactSelector, Selector, StockValueSelector};
use crate::types::{DataQualityReport, ProcessedInventoryData};

/// The inventory analysis pipeline.
///
/// Pipeline flow:
/// 1. Rank rows by usage to assign velocity bands
/// 2. Derive per-item fields (stock, valuation, trend, pricing, watchlist)
/// 3. StockValueSelector orders analyzed items, largest stock value first
/// 4. Overstock and watchlist subsets are taken from the ordered list
/// 5. Issues are classified per item and ordered by ImpactSelector
/// 6. Summary statistics and breakdowns are computed over the ordered list
///
/// The run is a pure function of its input rows and policy: the same file
/// always produces an identical `ProcessedInventoryData`.
pub struct InventoryAnalysisPipeline {
    policy: AnalysisPolicy,
    item_selector: StockValueSelector,
    issue_selector: ImpactSelector,
}

impl InventoryAnalysisPipeline {
    pub fn new(policy: AnalysisPolicy) -> Self {
        Self {
            policy,
            item_selector: StockValueSelector::default(),
            issue_selector: ImpactSelector::default(),
        }
    }

    pub fn policy(&self) -> &AnalysisPolicy {
        &self.policy
    }

    /// Analyze a loaded file, carrying its data-quality report through.
    pub fn run_loaded(&self, file_name: &str, loaded: &LoadedInventory) -> ProcessedInventoryData {
        let mut data = self.run(file_name, &loaded.items);
        data.data_quality = loaded.quality.clone();
        data
    }

    /// Analyze raw rows.
    pub fn run(&self, file_name: &str, rows: &[RawInventoryItem]) -> ProcessedInventoryData {
        let policy = &self.policy;

        let analyzed = self
            .item_selector
            .select(derive::analyze_items(rows, policy));

        let overstock_items: Vec<_> = analyzed
            .iter()
            .filter(|i| i.is_overstocked)
            .cloned()
            .collect();
        let watchlist_items: Vec<_> = analyzed
            .iter()
            .filter(|i| i.is_watchlisted())
            .cloned()
            .collect();

        let priority_issues = self
            .issue_selector
            .select(issue_classifier::classify_items(&analyzed, policy));

        let summary_stats = aggregate::aggregate(&analyzed, policy);

        log::info!(
            "file={} analyzed {} items: {} overstock, {} watchlist, {} issues ({} / {})",
            file_name,
            analyzed.len(),
            overstock_items.len(),
            watchlist_items.len(),
            priority_issues.len(),
            self.item_selector.name(),
            self.issue_selector.name()
        );

        ProcessedInventoryData {
            file_name: file_name.to_string(),
            total_products: analyzed.len(),
            velocity_breakdown: aggregate::velocity_breakdown(&analyzed),
            trend_breakdown: aggregate::trend_breakdown(&analyzed),
            strategy_breakdown: aggregate::strategy_breakdown(&analyzed),
            analyzed_items: analyzed,
            overstock_items,
            watchlist_items,
            priority_issues,
            summary_stats,
            data_quality: DataQualityReport::default(),
        }
    }
}

impl Default for InventoryAnalysisPipeline {
    fn default() -> Self {
        Self::new(AnalysisPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IssueType;

    fn row(code: &str, available: i64, usage: f64, cost: f64) -> RawInventoryItem {
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
    fn items_are_ordered_by_stock_value() {
        let rows = vec![row("A", 1, 1.0, 1.0), row("B", 100, 1.0, 1.0), row("C", 10, 1.0, 1.0)];
        let data = InventoryAnalysisPipeline::default().run("stock.csv", &rows);
        let codes: Vec<_> = data.analyzed_items.iter().map(|i| i.stockcode()).collect();
        assert_eq!(codes, vec!["B", "C", "A"]);
        assert_eq!(data.total_products, 3);
        assert_eq!(data.file_name, "stock.csv");
    }

    #[test]
    fn overstock_subset_is_ordered_and_issues_by_impact() {
        let rows = vec![
            row("SMALL", 100, 1.0, 1.0),
            row("BIG", 100, 1.0, 50.0),
            row("OK", 2, 1.0, 1.0),
        ];
        let data = InventoryAnalysisPipeline::default().run("stock.csv", &rows);
        let over: Vec<_> = data.overstock_items.iter().map(|i| i.stockcode()).collect();
        assert_eq!(over, vec!["BIG", "SMALL"]);

        let impacts: Vec<_> = data.priority_issues.iter().map(|i| i.impact_value).collect();
        assert!(impacts.windows(2).all(|w| w[0] >= w[1]));
        assert!(data
            .priority_issues
            .iter()
            .all(|i| i.issue_type == IssueType::Overstock));
    }

    #[test]
    fn empty_input_produces_empty_result() {
        let data = InventoryAnalysisPipeline::default().run("empty.csv", &[]);
        assert!(data.analyzed_items.is_empty());
        assert!(data.priority_issues.is_empty());
        assert_eq!(data.summary_stats.total_stock_value, 0.0);
        assert_eq!(data.velocity_breakdown.len(), 6);
    }

    #[test]
    fn run_loaded_carries_quality_report() {
        let mut loaded = LoadedInventory {
            items: vec![row("A", 1, 1.0, 1.0)],
            ..LoadedInventory::default()
        };
        loaded.quality.rows_read = 2;
        loaded.quality.rows_dropped = 1;
        let data = InventoryAnalysisPipeline::default().run_loaded("q.csv", &loaded);
        assert_eq!(data.data_quality.rows_dropped, 1);
    }

    #[test]
    fn policy_is_the_one_it_was_built_with() {
        let policy = AnalysisPolicy {
            overstock_months: 500.0,
            watchlist_months: 600.0,
            ..AnalysisPolicy::default()
        };
        let pipeline = InventoryAnalysisPipeline::new(policy.clone());
        assert_eq!(pipeline.policy(), &policy);
        let data = pipeline.run("p.csv", &[row("A", 700, 1.0, 1.0)]);
        assert!(data.overstock_items.is_empty());
    }

    #[test]
    fn reruns_are_identical() {
        let rows = vec![row("A", 700, 10.0, 1.3), row("B", 0, 3.0, 2.0)];
        let pipeline = InventoryAnalysisPipeline::default();
        assert_eq!(pipeline.run("f", &rows), pipeline.run("f", &rows));
    }
}
