//! CSV export of analyzed items, one row per item.

use std::io::Write;

use serde::Serialize;

use engine_room_pipeline::types::{format_months_of_stock, ProcessedInventoryItem};

/// Flat export row. Column names follow the dashboard's download.
#[derive(Serialize)]
struct ExportRow<'a> {
    #[serde(rename = "Stock Code")]
    stockcode: &'a str,
    #[serde(rename = "Description")]
    description: &'a str,
    #[serde(rename = "Current Stock")]
    current_stock: i64,
    #[serde(rename = "On Order")]
    on_order: i64,
    #[serde(rename = "Monthly Usage")]
    monthly_usage: Option<f64>,
    #[serde(rename = "Months of Stock")]
    months_of_stock: String,
    #[serde(rename = "Average Cost")]
    average_cost: String,
    #[serde(rename = "Stock Value")]
    stock_value: String,
    #[serde(rename = "Velocity Category")]
    velocity_category: String,
    #[serde(rename = "Trend")]
    trend: String,
    #[serde(rename = "NBP")]
    nbp: Option<String>,
    #[serde(rename = "Lowest Market Price")]
    lowest_market_price: Option<String>,
    #[serde(rename = "Our Price")]
    our_price: Option<String>,
    #[serde(rename = "Winning")]
    winning: String,
    #[serde(rename = "Pricing Strategy")]
    pricing_strategy: String,
    #[serde(rename = "Overstocked")]
    overstocked: &'static str,
    #[serde(rename = "Watchlist")]
    watchlist: String,
}

fn money(value: f64) -> String {
    format!("{:.2}", value)
}

impl<'a> From<&'a ProcessedInventoryItem> for ExportRow<'a> {
    fn from(item: &'a ProcessedInventoryItem) -> Self {
        Self {
            stockcode: item.stockcode(),
            description: &item.raw.description,
            current_stock: item.current_stock,
            on_order: item.raw.quantity_on_order,
            monthly_usage: item.monthly_usage,
            months_of_stock: format_months_of_stock(item.months_of_stock),
            average_cost: money(item.displayed_average_cost),
            stock_value: money(item.stock_value),
            velocity_category: item.velocity_category.to_string(),
            trend: item.trend_direction.to_string(),
            nbp: item.nbp.map(money),
            lowest_market_price: item.lowest_market_price.map(money),
            our_price: item.raw.aver.map(money),
            winning: item.winning_status.to_string(),
            pricing_strategy: item.pricing_strategy.to_string(),
            overstocked: if item.is_overstocked { "Yes" } else { "No" },
            watchlist: item.watchlist.marker(),
        }
    }
}

/// Write `items` as CSV with a header row.
pub fn write_items_csv<W: Write>(writer: W, items: &[ProcessedInventoryItem]) -> csv::Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    for item in items {
        out.serialize(ExportRow::from(item))?;
    }
    out.flush()?;
    Ok(())
}
