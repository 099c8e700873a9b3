use std::collections::BTreeSet;

use engine_room_pipeline::filter::{starred_items, Filter, FilterCategory, ItemFilter};
use engine_room_pipeline::inventory_loader::{load_inventory, load_inventory_file, RawInventoryItem};
use engine_room_pipeline::pipelines::inventory_analysis::InventoryAnalysisPipeline;
use engine_room_pipeline::policy::AnalysisPolicy;
use engine_room_pipeline::snapshot::{persist_snapshot, FileSnapshotStore, PersistOutcome, SnapshotStore};
use engine_room_pipeline::types::*;

// ---------------------------------------------------------------------------
// Test data fixtures
// ---------------------------------------------------------------------------

fn raw(code: &str, available: i64, usage: f64, cost: f64) -> RawInventoryItem {
    RawInventoryItem {
        stockcode: code.to_string(),
        description: format!("{code} test line"),
        quantity_available: available,
        packs_sold_avg_last_six_months: usage,
        avg_cost: cost,
        ..RawInventoryItem::default()
    }
}

/// Three lines covering the out-of-stock, overstock and winning paths.
fn three_line_file() -> Vec<RawInventoryItem> {
    // A: empty shelf, nothing on order, buyable at 5, market at 8.
    let mut a = raw("A", 0, 10.0, 5.0);
    a.min_cost = Some(5.0);
    a.nupharm = Some(8.0);

    // B: 500 packs at 2 a month, 250 months of cover.
    let b = raw("B", 500, 2.0, 1.0);

    // C: we sell at 9, competitors at 10 and 11.
    let mut c = raw("C", 20, 10.0, 9.5);
    c.aver = Some(9.0);
    c.nupharm = Some(10.0);
    c.aah2 = Some(11.0);

    vec![a, b, c]
}

const WHOLESALER_CSV: &str = "\
stockcode,description,quantity_available,quantity_ringfenced,quantity_on_order,packs_sold_avg_last_six_months,packs_sold_last_30_days,avg_cost,calculated_next_avg_cost,next_cost,min_cost,last_po_cost,Nupharm,AAH2,ETH_LIST,ETH_NET,LEXON2,AVER,grp,eth_OOS,AAH_yesterday,min_supplier
PARA500,Paracetamol 500mg tabs 32,1200,0,0,400,420,0.30,,0.32,0.28,0.31,0.45,0.44,0.50,0.43,,0.40,0,N,0.44,Sigma
AMOX250,Amoxicillin 250mg caps 21,0,0,0,25,30,1.10,,,1.00,1.05,1.60,1.55,,,1.58,1.50,0,N,1.50,AAH
OMEP20,Omeprazole 20mg caps 28,900,100,0,10,8,1.20,1.25,,,1.18,1.10,1.15,,,,1.30,1,Y,,
ATOR40,Atorvastatin 40mg tabs 28,50,0,200,30,45,0.90,,0.85,,,1.40,1.35,,1.38,,1.20,0,N,1.30,Phoenix
SERT50,Sertraline 50mg tabs 28,3000,0,0,0,,0.75,,,,,,,,,,,0,N,,
";

// ---------------------------------------------------------------------------
// End-to-end scenario
// ---------------------------------------------------------------------------

#[test]
fn three_line_file_end_to_end() {
    let data = InventoryAnalysisPipeline::default().run("three.csv", &three_line_file());
    let stats = &data.summary_stats;

    assert_eq!(data.total_products, 3);
    assert_eq!(stats.out_of_stock_items, 1);
    assert_eq!(stats.replenishable_items, 1);
    assert!((stats.monthly_lost_revenue - 30.0).abs() < 0.01);
    assert_eq!(stats.total_overstock_items, 1);

    let a_issue = data
        .priority_issues
        .iter()
        .find(|i| i.stockcode == "A" && i.issue_type == IssueType::OutOfStock)
        .expect("A should be out of stock");
    assert!((a_issue.impact_value - 30.0).abs() < 0.01);

    let b = data
        .analyzed_items
        .iter()
        .find(|i| i.stockcode() == "B")
        .unwrap();
    assert!(b.is_overstocked);
    assert!(b.is_watchlisted());
    assert_eq!(data.overstock_items.len(), 1);
    assert_eq!(data.overstock_items[0].stockcode(), "B");
    assert!(data.watchlist_items.iter().any(|i| i.stockcode() == "B"));

    let c = data
        .analyzed_items
        .iter()
        .find(|i| i.stockcode() == "C")
        .unwrap();
    assert_eq!(c.winning_status, WinningStatus::Winning);
    assert!(!data
        .priority_issues
        .iter()
        .any(|i| i.stockcode == "C" && i.issue_type == IssueType::CostDisadvantage));
}

#[test]
fn tie_with_cheapest_competitor_is_not_a_win() {
    let mut item = raw("T", 10, 5.0, 8.0);
    item.aver = Some(10.0);
    item.nupharm = Some(10.0);
    item.lexon2 = Some(12.0);
    let data = InventoryAnalysisPipeline::default().run("tie.csv", &[item]);
    assert_eq!(data.analyzed_items[0].winning_status, WinningStatus::NoAdvantage);
}

#[test]
fn ids_are_deterministic_across_runs() {
    let pipeline = InventoryAnalysisPipeline::default();
    let first = pipeline.run("three.csv", &three_line_file());
    let second = pipeline.run("three.csv", &three_line_file());
    assert_eq!(first, second);
    let ids: Vec<_> = first.analyzed_items.iter().map(|i| i.id.as_str()).collect();
    assert!(ids.contains(&"inv_A"));
    assert!(first
        .priority_issues
        .iter()
        .any(|i| i.id == "issue_B_overstock"));
}

// ---------------------------------------------------------------------------
// CSV to result
// ---------------------------------------------------------------------------

#[test]
fn wholesaler_csv_full_run() {
    let loaded = load_inventory(WHOLESALER_CSV.as_bytes()).unwrap();
    assert_eq!(loaded.items.len(), 5);
    assert!(loaded.quality.is_clean(), "{:?}", loaded.quality);

    let data = InventoryAnalysisPipeline::default().run_loaded("wholesaler.csv", &loaded);
    let find = |code: &str| {
        data.analyzed_items
            .iter()
            .find(|i| i.stockcode() == code)
            .unwrap()
    };

    // PARA500: 3 months of cover, cheapest market 0.43, our price 0.40.
    let para = find("PARA500");
    assert_eq!(para.velocity_category, VelocityCategory::Ranked(1));
    assert_eq!(para.winning_status, WinningStatus::Winning);
    assert_eq!(para.nbp_source, NbpSource::NextCost);
    assert_eq!(para.cost_trend, TrendDirection::Up);
    assert_eq!(para.trend_direction, TrendDirection::Stable);
    assert_eq!(para.pricing_strategy, PricingStrategy::Profitable);
    assert_eq!(para.aah_trend.trend, CompetitorTrend::Stable);
    assert!(!para.is_overstocked);

    // AMOX250: out of stock, replenishable at 1.00 against a 1.55 market.
    let amox = find("AMOX250");
    assert!(amox.is_replenishable());
    assert_eq!(amox.nbp_source, NbpSource::MinCost);
    assert_eq!(amox.aah_trend.trend, CompetitorTrend::Up);
    assert!((data.summary_stats.monthly_lost_revenue - 0.55 * 25.0).abs() < 0.01);

    // OMEP20: blended cost 1.25 above the 1.10 market; flagged by the source.
    let omep = find("OMEP20");
    assert_eq!(omep.current_stock, 1000);
    assert!((omep.stock_value - 1250.0).abs() < 0.01);
    assert!(omep.is_overstocked);
    assert_eq!(omep.watchlist.marker(), "\u{26a0}\u{fe0f}\u{2757}");
    assert_eq!(omep.pricing_strategy, PricingStrategy::LossRequired);
    assert_eq!(omep.winning_status, WinningStatus::Losing);

    // SERT50: no usage, so never overstocked and no velocity band.
    let sert = find("SERT50");
    assert_eq!(sert.months_of_stock, MONTHS_OF_STOCK_SENTINEL);
    assert!(!sert.is_overstocked);
    assert_eq!(sert.velocity_category, VelocityCategory::NotAvailable);
    assert_eq!(sert.pricing_strategy, PricingStrategy::Unknown);

    let omep_issues: Vec<_> = data
        .priority_issues
        .iter()
        .filter(|i| i.stockcode == "OMEP20")
        .map(|i| i.issue_type)
        .collect();
    assert_eq!(omep_issues, vec![IssueType::Overstock, IssueType::CostDisadvantage]);

    let total: f64 = data.analyzed_items.iter().map(|i| i.stock_value).sum();
    assert!((data.summary_stats.total_stock_value - total).abs() < 1e-6);
    assert!(data
        .analyzed_items
        .windows(2)
        .all(|w| w[0].stock_value >= w[1].stock_value));
}

#[test]
fn filters_and_starred_views() {
    let loaded = load_inventory(WHOLESALER_CSV.as_bytes()).unwrap();
    let policy = AnalysisPolicy::default();
    let data = InventoryAnalysisPipeline::new(policy.clone()).run_loaded("w.csv", &loaded);

    let oos = ItemFilter::new(FilterCategory::OutOfStock, policy.clone())
        .filter(data.analyzed_items.clone());
    assert_eq!(oos.kept.len(), 1);
    assert_eq!(oos.kept[0].stockcode(), "AMOX250");
    assert_eq!(oos.kept.len() + oos.removed.len(), data.analyzed_items.len());

    let starred: BTreeSet<String> = ["OMEP20".to_string(), "PARA500".to_string()].into();
    let picked = starred_items(&data.analyzed_items, &starred);
    let codes: BTreeSet<_> = picked.iter().map(|i| i.stockcode().to_string()).collect();
    assert_eq!(codes, starred);
}

#[test]
fn policy_file_changes_classification() {
    let dir = tempfile::tempdir().unwrap();
    let policy_path = dir.path().join("policy.toml");
    std::fs::write(&policy_path, "overstock_months = 500.0\nwatchlist_months = 600.0\n").unwrap();
    let policy = AnalysisPolicy::load(&policy_path).unwrap();

    let data = InventoryAnalysisPipeline::new(policy).run("three.csv", &three_line_file());
    assert_eq!(data.summary_stats.total_overstock_items, 0);
    assert!(data.overstock_items.is_empty());
}

#[test]
fn csv_file_to_snapshot_and_back() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("stock.csv");
    std::fs::write(&csv_path, WHOLESALER_CSV).unwrap();

    let loaded = load_inventory_file(&csv_path).unwrap();
    let data = InventoryAnalysisPipeline::default().run_loaded("stock.csv", &loaded);

    let mut store = FileSnapshotStore::new(dir.path().join("last.json"));
    assert_eq!(persist_snapshot(&mut store, &data), PersistOutcome::Full);
    let restored = store.load().unwrap().unwrap();
    assert!(restored.complete);
    assert_eq!(restored.data, data);
}
