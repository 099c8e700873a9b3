//! Inventory spreadsheet loader.
//!
//! Parses CSV exports (or JSON arrays of row objects) into
//! `RawInventoryItem` structs. Header names vary between exports, so every
//! field has a list of accepted aliases; a header matches on its normalised
//! name first and falls back to a substring match for names longer than three
//! characters.
//!
//! Missing required *columns* fail the whole file. Bad *cells* never do: a
//! blank or non-numeric required value is zero-filled, a bad optional value is
//! treated as absent, a row without a stock code is dropped. Each repair is
//! counted in the file's `DataQualityReport`.

use std::collections::{BTreeMap, HashSet};
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};
use crate::types::DataQualityReport;

/// One stock-keeping unit as it arrives from the spreadsheet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawInventoryItem {
    pub stockcode: String,
    pub description: String,
    pub quantity_available: i64,
    #[serde(default)]
    pub quantity_ringfenced: i64,
    #[serde(default)]
    pub quantity_on_order: i64,
    pub packs_sold_avg_last_six_months: f64,
    pub avg_cost: f64,

    /// Precomputed monthly usage; wins over the six-month average when positive.
    #[serde(default, rename = "averageUsage", skip_serializing_if = "Option::is_none")]
    pub average_usage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packs_sold_last_30_days: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cost: Option<f64>,
    /// Blended cost accounting for stock on order at a different price.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calculated_next_avg_cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_po_cost: Option<f64>,

    /// Source watchlist marker (1 = problem line).
    #[serde(default, rename = "grp", alias = "group", skip_serializing_if = "Option::is_none")]
    pub group: Option<i64>,

    #[serde(default, rename = "Nupharm", skip_serializing_if = "Option::is_none")]
    pub nupharm: Option<f64>,
    #[serde(default, rename = "AAH2", skip_serializing_if = "Option::is_none")]
    pub aah2: Option<f64>,
    #[serde(default, rename = "ETH_LIST", skip_serializing_if = "Option::is_none")]
    pub eth_list: Option<f64>,
    #[serde(default, rename = "ETH_NET", skip_serializing_if = "Option::is_none")]
    pub eth_net: Option<f64>,
    #[serde(default, rename = "LEXON2", skip_serializing_if = "Option::is_none")]
    pub lexon2: Option<f64>,
    /// Our selling price.
    #[serde(default, rename = "AVER", skip_serializing_if = "Option::is_none")]
    pub aver: Option<f64>,
    /// Scottish drug tariff.
    #[serde(default, rename = "SDT", skip_serializing_if = "Option::is_none")]
    pub sdt: Option<f64>,
    /// English drug tariff.
    #[serde(default, rename = "EDT", skip_serializing_if = "Option::is_none")]
    pub edt: Option<f64>,

    #[serde(default, rename = "eth_OOS", deserialize_with = "deserialize_flag")]
    pub eth_out_of_stock: bool,

    #[serde(default, rename = "AAH_yesterday", skip_serializing_if = "Option::is_none")]
    pub aah_yesterday: Option<f64>,
    #[serde(default, rename = "Nupharm_yesterday", skip_serializing_if = "Option::is_none")]
    pub nupharm_yesterday: Option<f64>,
    #[serde(default, rename = "ETH_NET_yesterday", skip_serializing_if = "Option::is_none")]
    pub eth_net_yesterday: Option<f64>,
    #[serde(default, rename = "LEXON2_yesterday", skip_serializing_if = "Option::is_none")]
    pub lexon2_yesterday: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_supplier: Option<String>,
    #[serde(default, rename = "binLocation", skip_serializing_if = "Option::is_none")]
    pub bin_location: Option<String>,
}

/// Rows parsed from one file plus the repairs made along the way.
#[derive(Debug, Clone, Default)]
pub struct LoadedInventory {
    pub items: Vec<RawInventoryItem>,
    pub quality: DataQualityReport,
}

// ---------------------------------------------------------------------------
// Column mapping
// ---------------------------------------------------------------------------

/// Every field the loader understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum Field {
    Stockcode,
    Description,
    QuantityAvailable,
    QuantityRingfenced,
    QuantityOnOrder,
    PacksSoldAvgSixMonths,
    AvgCost,
    AverageUsage,
    PacksSoldLast30Days,
    NextCost,
    CalculatedNextAvgCost,
    MinCost,
    LastPoCost,
    Group,
    Nupharm,
    Aah2,
    EthList,
    EthNet,
    Lexon2,
    Aver,
    Sdt,
    Edt,
    EthOutOfStock,
    AahYesterday,
    NupharmYesterday,
    EthNetYesterday,
    Lexon2Yesterday,
    MinSupplier,
    BinLocation,
}

/// Fields that must have a column. Order matches the error message.
const REQUIRED: [Field; 5] = [
    Field::Stockcode,
    Field::Description,
    Field::QuantityAvailable,
    Field::PacksSoldAvgSixMonths,
    Field::AvgCost,
];

impl Field {
    /// Match order matters: more specific fields come before fields whose
    /// aliases would also match them as substrings.
    const ALL: [Field; 29] = [
        Field::Stockcode,
        Field::Description,
        Field::CalculatedNextAvgCost,
        Field::AverageUsage,
        Field::PacksSoldLast30Days,
        Field::PacksSoldAvgSixMonths,
        Field::QuantityAvailable,
        Field::QuantityRingfenced,
        Field::QuantityOnOrder,
        Field::NextCost,
        Field::MinCost,
        Field::LastPoCost,
        Field::AvgCost,
        Field::Group,
        Field::AahYesterday,
        Field::NupharmYesterday,
        Field::EthNetYesterday,
        Field::Lexon2Yesterday,
        Field::Nupharm,
        Field::Aah2,
        Field::EthList,
        Field::EthNet,
        Field::Lexon2,
        Field::Aver,
        Field::Sdt,
        Field::Edt,
        Field::EthOutOfStock,
        Field::MinSupplier,
        Field::BinLocation,
    ];

    fn name(self) -> &'static str {
        match self {
            Field::Stockcode => "stockcode",
            Field::Description => "description",
            Field::QuantityAvailable => "quantity_available",
            Field::QuantityRingfenced => "quantity_ringfenced",
            Field::QuantityOnOrder => "quantity_on_order",
            Field::PacksSoldAvgSixMonths => "packs_sold_avg_last_six_months",
            Field::AvgCost => "avg_cost",
            Field::AverageUsage => "averageUsage",
            Field::PacksSoldLast30Days => "packs_sold_last_30_days",
            Field::NextCost => "next_cost",
            Field::CalculatedNextAvgCost => "calculated_next_avg_cost",
            Field::MinCost => "min_cost",
            Field::LastPoCost => "last_po_cost",
            Field::Group => "grp",
            Field::Nupharm => "Nupharm",
            Field::Aah2 => "AAH2",
            Field::EthList => "ETH_LIST",
            Field::EthNet => "ETH_NET",
            Field::Lexon2 => "LEXON2",
            Field::Aver => "AVER",
            Field::Sdt => "SDT",
            Field::Edt => "EDT",
            Field::EthOutOfStock => "eth_OOS",
            Field::AahYesterday => "AAH_yesterday",
            Field::NupharmYesterday => "Nupharm_yesterday",
            Field::EthNetYesterday => "ETH_NET_yesterday",
            Field::Lexon2Yesterday => "LEXON2_yesterday",
            Field::MinSupplier => "min_supplier",
            Field::BinLocation => "binLocation",
        }
    }

    fn aliases(self) -> &'static [&'static str] {
        match self {
            Field::Stockcode => &["stockcode", "stock code", "item code", "product code", "sku"],
            Field::Description => &[
                "description",
                "desc",
                "product name",
                "item name",
                "product description",
            ],
            Field::QuantityAvailable => &["quantity_available", "qty available", "available", "in stock"],
            Field::QuantityRingfenced => &["quantity_ringfenced", "qty ringfenced", "ringfenced", "reserved"],
            Field::QuantityOnOrder => &["quantity_on_order", "qty on order", "on order", "ordered"],
            Field::PacksSoldAvgSixMonths => &[
                "packs_sold_avg_last_six_months",
                "packs_sold_avg_last_6_months",
                "packs sold avg last 6 months",
                "avg monthly sales",
                "avg_monthly_usage",
                "monthly usage",
                "six months usage",
                "sold_avg_last_six_months",
            ],
            Field::AvgCost => &["avg_cost", "average cost", "unit cost", "cost"],
            Field::AverageUsage => &["averageusage", "average usage"],
            Field::PacksSoldLast30Days => &[
                "packs_sold_last_30_days",
                "packs sold last 30 days",
                "last 30 days",
                "30 days sales",
            ],
            Field::NextCost => &["next_cost", "next cost", "future cost", "next buying price"],
            Field::CalculatedNextAvgCost => &[
                "calculated_next_avg_cost",
                "calculated next average cost",
                "blended avg cost",
                "blended average cost",
                "weighted avg cost",
                "weighted average cost",
                "new avg cost",
                "new average cost",
            ],
            Field::MinCost => &["min_cost", "minimum cost", "min price"],
            Field::LastPoCost => &["last_po_cost", "last po cost", "last purchase cost", "previous cost"],
            Field::Group => &["grp", "group"],
            Field::Nupharm => &["nupharm", "nu pharm", "nupharm price"],
            Field::Aah2 => &["aah2", "aah 2", "aah2 price"],
            Field::EthList => &["eth_list", "eth list", "eth list price"],
            Field::EthNet => &["eth_net", "eth net", "eth net price"],
            Field::Lexon2 => &["lexon2", "lexon 2", "lexon2 price"],
            Field::Aver => &["aver", "our price", "selling price", "current price"],
            Field::Sdt => &["sdt", "scottish drug tariff", "scottish tariff"],
            Field::Edt => &["edt", "english drug tariff", "english tariff"],
            Field::EthOutOfStock => &["eth_oos", "eth out of stock", "oos"],
            Field::AahYesterday => &["aah_yesterday", "aah yesterday", "aah prev", "aah"],
            Field::NupharmYesterday => &["nupharm_yesterday", "nupharm yesterday", "nu yesterday", "nu"],
            Field::EthNetYesterday => &["eth_net_yesterday", "eth net yesterday", "eth yesterday", "eth"],
            Field::Lexon2Yesterday => &["lexon2_yesterday", "lexon yesterday", "lexon"],
            Field::MinSupplier => &["min_supplier", "min supplier", "minimum supplier", "supplier"],
            Field::BinLocation => &["binlocation", "bin location", "warehouse location", "bin"],
        }
    }
}

/// Lowercase, trim, treat `_` as a space and collapse whitespace runs.
fn normalize_header(header: &str) -> String {
    header
        .trim()
        .to_lowercase()
        .replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Resolve each known field to a column index.
///
/// Pass one takes exact normalised matches for every field; pass two lets the
/// still-unmatched fields claim a remaining column by substring. A column is
/// never assigned to two fields.
fn map_columns(headers: &[String]) -> BTreeMap<Field, usize> {
    let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();
    let mut mapping = BTreeMap::new();
    let mut taken: HashSet<usize> = HashSet::new();

    for field in Field::ALL {
        let hit = field.aliases().iter().find_map(|alias| {
            let alias = normalize_header(alias);
            normalized
                .iter()
                .enumerate()
                .find(|(idx, h)| !taken.contains(idx) && **h == alias)
                .map(|(idx, _)| idx)
        });
        if let Some(idx) = hit {
            taken.insert(idx);
            mapping.insert(field, idx);
        }
    }

    for field in Field::ALL {
        if mapping.contains_key(&field) {
            continue;
        }
        let hit = field.aliases().iter().find_map(|alias| {
            let alias = normalize_header(alias);
            normalized.iter().enumerate().find_map(|(idx, h)| {
                if taken.contains(&idx) {
                    return None;
                }
                let partial = (h.len() > 3 && h.contains(alias.as_str()) && alias.len() > 3)
                    || (alias.len() > 3 && alias.contains(h.as_str()) && h.len() > 3);
                partial.then_some(idx)
            })
        });
        if let Some(idx) = hit {
            taken.insert(idx);
            mapping.insert(field, idx);
        }
    }

    mapping
}

// ---------------------------------------------------------------------------
// Cell parsing
// ---------------------------------------------------------------------------

/// Parse a numeric cell. Accepts currency symbols, thousands separators and
/// surrounding whitespace. `Ok(None)` means blank, `Err(())` non-numeric.
fn parse_number(cell: &str) -> Result<Option<f64>, ()> {
    let cleaned: String = cell
        .trim()
        .chars()
        .filter(|c| !matches!(c, '\u{a3}' | '$' | '\u{20ac}' | ',' | ' '))
        .collect();
    if cleaned.is_empty() {
        return Ok(None);
    }
    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(()),
    }
}

/// Flexible flag parsing: handles "Y"/"N", "true"/"false", "1"/"0", "yes"/"no".
fn parse_flag(cell: &str) -> Result<bool, ()> {
    match cell.trim().to_lowercase().as_str() {
        "y" | "yes" | "true" | "1" => Ok(true),
        "n" | "no" | "false" | "0" | "" | "-" => Ok(false),
        _ => Err(()),
    }
}

/// Accepts either a JSON bool or any string `parse_flag` understands.
fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FlagRepr {
        Bool(bool),
        Text(String),
    }

    match FlagRepr::deserialize(deserializer)? {
        FlagRepr::Bool(b) => Ok(b),
        FlagRepr::Text(s) => parse_flag(&s).map_err(|_| {
            serde::de::Error::custom(format!("expected flag value, got '{}'", s))
        }),
    }
}

/// Builds one item from a row of cells, recording repairs in the report.
struct RowParser<'a> {
    mapping: &'a BTreeMap<Field, usize>,
    quality: &'a mut DataQualityReport,
}

impl RowParser<'_> {
    fn cell<'c>(&self, cells: &'c [Option<String>], field: Field) -> Option<&'c str> {
        self.mapping
            .get(&field)
            .and_then(|&idx| cells.get(idx))
            .and_then(|c| c.as_deref())
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }

    fn note(&mut self, field: Field, repaired: &mut bool) {
        *self
            .quality
            .field_issues
            .entry(field.name().to_string())
            .or_insert(0) += 1;
        *repaired = true;
    }

    fn required_number(&mut self, cells: &[Option<String>], field: Field, repaired: &mut bool) -> f64 {
        match self.cell(cells, field).map(parse_number) {
            Some(Ok(Some(v))) => v,
            None | Some(Ok(None)) | Some(Err(())) => {
                self.note(field, repaired);
                0.0
            }
        }
    }

    fn quantity(&mut self, cells: &[Option<String>], field: Field, repaired: &mut bool) -> i64 {
        match self.cell(cells, field).map(parse_number) {
            None | Some(Ok(None)) => 0,
            Some(Ok(Some(v))) => v.round() as i64,
            Some(Err(())) => {
                self.note(field, repaired);
                0
            }
        }
    }

    fn optional_number(&mut self, cells: &[Option<String>], field: Field, repaired: &mut bool) -> Option<f64> {
        match self.cell(cells, field).map(parse_number) {
            None | Some(Ok(None)) => None,
            Some(Ok(Some(v))) => Some(v),
            Some(Err(())) => {
                self.note(field, repaired);
                None
            }
        }
    }

    fn optional_text(&self, cells: &[Option<String>], field: Field) -> Option<String> {
        self.cell(cells, field).map(str::to_string)
    }

    fn parse(&mut self, cells: &[Option<String>]) -> Option<RawInventoryItem> {
        let Some(stockcode) = self.optional_text(cells, Field::Stockcode) else {
            self.quality.rows_dropped += 1;
            return None;
        };

        let mut repaired = false;
        let description = match self.optional_text(cells, Field::Description) {
            Some(d) => d,
            None => {
                self.note(Field::Description, &mut repaired);
                String::new()
            }
        };

        let quantity_available = match self.cell(cells, Field::QuantityAvailable).map(parse_number) {
            Some(Ok(Some(v))) => v.round() as i64,
            _ => {
                self.note(Field::QuantityAvailable, &mut repaired);
                0
            }
        };

        let eth_out_of_stock = match self.cell(cells, Field::EthOutOfStock).map(parse_flag) {
            None => false,
            Some(Ok(flag)) => flag,
            Some(Err(())) => {
                self.note(Field::EthOutOfStock, &mut repaired);
                false
            }
        };

        let item = RawInventoryItem {
            stockcode,
            description,
            quantity_available,
            quantity_ringfenced: self.quantity(cells, Field::QuantityRingfenced, &mut repaired),
            quantity_on_order: self.quantity(cells, Field::QuantityOnOrder, &mut repaired),
            packs_sold_avg_last_six_months: self.required_number(
                cells,
                Field::PacksSoldAvgSixMonths,
                &mut repaired,
            ),
            avg_cost: self.required_number(cells, Field::AvgCost, &mut repaired),
            average_usage: self.optional_number(cells, Field::AverageUsage, &mut repaired),
            packs_sold_last_30_days: self.optional_number(cells, Field::PacksSoldLast30Days, &mut repaired),
            next_cost: self.optional_number(cells, Field::NextCost, &mut repaired),
            calculated_next_avg_cost: self.optional_number(
                cells,
                Field::CalculatedNextAvgCost,
                &mut repaired,
            ),
            min_cost: self.optional_number(cells, Field::MinCost, &mut repaired),
            last_po_cost: self.optional_number(cells, Field::LastPoCost, &mut repaired),
            group: self
                .optional_number(cells, Field::Group, &mut repaired)
                .map(|g| g.round() as i64),
            nupharm: self.optional_number(cells, Field::Nupharm, &mut repaired),
            aah2: self.optional_number(cells, Field::Aah2, &mut repaired),
            eth_list: self.optional_number(cells, Field::EthList, &mut repaired),
            eth_net: self.optional_number(cells, Field::EthNet, &mut repaired),
            lexon2: self.optional_number(cells, Field::Lexon2, &mut repaired),
            aver: self.optional_number(cells, Field::Aver, &mut repaired),
            sdt: self.optional_number(cells, Field::Sdt, &mut repaired),
            edt: self.optional_number(cells, Field::Edt, &mut repaired),
            eth_out_of_stock,
            aah_yesterday: self.optional_number(cells, Field::AahYesterday, &mut repaired),
            nupharm_yesterday: self.optional_number(cells, Field::NupharmYesterday, &mut repaired),
            eth_net_yesterday: self.optional_number(cells, Field::EthNetYesterday, &mut repaired),
            lexon2_yesterday: self.optional_number(cells, Field::Lexon2Yesterday, &mut repaired),
            min_supplier: self.optional_text(cells, Field::MinSupplier),
            bin_location: self.optional_text(cells, Field::BinLocation),
        };

        if repaired {
            self.quality.rows_repaired += 1;
        }
        Some(item)
    }
}

/// Shared tail of the CSV and JSON loaders.
fn build_inventory(
    headers: &[String],
    rows: impl IntoIterator<Item = PipelineResult<Vec<Option<String>>>>,
) -> PipelineResult<LoadedInventory> {
    let mapping = map_columns(headers);
    let missing: Vec<&'static str> = REQUIRED
        .iter()
        .filter(|f| !mapping.contains_key(f))
        .map(|f| f.name())
        .collect();
    if !missing.is_empty() {
        return Err(PipelineError::MissingColumns(missing));
    }

    let mut quality = DataQualityReport::default();
    let mut items = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    {
        let mut parser = RowParser {
            mapping: &mapping,
            quality: &mut quality,
        };
        for row in rows {
            let cells = row?;
            if cells.iter().all(|c| c.as_deref().map_or(true, |s| s.trim().is_empty())) {
                continue;
            }
            parser.quality.rows_read += 1;
            if let Some(item) = parser.parse(&cells) {
                if !seen.insert(item.stockcode.clone()) {
                    // First occurrence wins.
                    parser.quality.duplicate_stockcodes.push(item.stockcode);
                    parser.quality.rows_dropped += 1;
                    continue;
                }
                items.push(item);
            }
        }
    }

    if items.is_empty() {
        return Err(PipelineError::EmptyFile);
    }

    if !quality.is_clean() {
        log::warn!(
            "Data quality: {} of {} rows repaired, {} dropped, {} duplicate stock codes; field issues: {:?}",
            quality.rows_repaired,
            quality.rows_read,
            quality.rows_dropped,
            quality.duplicate_stockcodes.len(),
            quality.field_issues
        );
    }

    Ok(LoadedInventory { items, quality })
}

/// Load inventory rows from a CSV reader.
pub fn load_inventory<R: Read>(reader: R) -> PipelineResult<LoadedInventory> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()
        .map_err(|e| PipelineError::Csv { line: 1, source: e })?
        .iter()
        .map(str::to_string)
        .collect();

    let rows = csv_reader.records().enumerate().map(|(line_num, result)| {
        result
            .map(|record| record.iter().map(|c| Some(c.to_string())).collect::<Vec<_>>())
            .map_err(|e| PipelineError::Csv {
                line: line_num as u64 + 2,
                source: e,
            })
    });

    build_inventory(&headers, rows)
}

/// Load inventory rows from a JSON array of flat objects.
///
/// Numbers, strings, booleans and nulls are accepted as cell values; nested
/// values count as non-numeric cells.
pub fn load_inventory_json<R: Read>(reader: R) -> PipelineResult<LoadedInventory> {
    let rows: Vec<serde_json::Map<String, serde_json::Value>> = serde_json::from_reader(reader)?;

    let mut headers: Vec<String> = Vec::new();
    let mut known: HashSet<&str> = HashSet::new();
    for row in &rows {
        for key in row.keys() {
            if known.insert(key.as_str()) {
                headers.push(key.clone());
            }
        }
    }

    let cells = rows.iter().map(|row| {
        Ok::<_, PipelineError>(headers
            .iter()
            .map(|h| match row.get(h) {
                None | Some(serde_json::Value::Null) => None,
                Some(serde_json::Value::String(s)) => Some(s.clone()),
                Some(serde_json::Value::Number(n)) => Some(n.to_string()),
                Some(serde_json::Value::Bool(b)) => Some(b.to_string()),
                Some(other) => Some(other.to_string()),
            })
            .collect::<Vec<_>>())
    });

    build_inventory(&headers, cells)
}

/// Load an inventory file, choosing the format by extension (`.json` or CSV).
pub fn load_inventory_file(path: impl AsRef<Path>) -> PipelineResult<LoadedInventory> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .map_err(|e| PipelineError::io(path.display().to_string(), e))?;
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if is_json {
        load_inventory_json(file)
    } else {
        load_inventory(file)
    }
}
