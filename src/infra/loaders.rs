//! Loads reference data and market history from the local data directory.
//!
//! - JSON catalogs: items, recipes, vendor prices.
//! - One CSV of hourly snapshots per tracked item, prices in copper.

use std::{
    collections::{BTreeMap, HashMap},
    fs,
    path::{Path, PathBuf},
};

use serde::{de::DeserializeOwned, Deserialize};
use thiserror::Error;
use time::{macros::format_description, Date, PrimitiveDateTime};
use tracing::{debug, info, warn};

use crate::domain::{
    Item, ItemId, PriceHistory, PriceSnapshot, Recipe, RecipeCatalog, VendorPrices,
    COPPER_PER_GOLD,
};
use crate::util::config::Config;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid CSV in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("unrecognised timestamp {value:?} in {path}")]
    Timestamp { path: PathBuf, value: String },
    #[error("no market data files could be loaded from {dir}")]
    NoMarketData { dir: PathBuf },
}

#[derive(Debug, Deserialize)]
struct ItemsFile {
    items: BTreeMap<ItemId, String>,
}

#[derive(Debug, Deserialize)]
struct RecipesFile {
    recipes: Vec<Recipe>,
}

#[derive(Debug, Deserialize)]
struct VendorItemsFile {
    vendor_items: HashMap<ItemId, VendorItemDto>,
}

#[derive(Debug, Deserialize)]
struct VendorItemDto {
    vendor_price: f64,
}

/// Columns in file order: timestamp, bid, min_buy, avg_price, available.
#[derive(Debug, Deserialize)]
struct SnapshotRow {
    timestamp: String,
    bid: Option<f64>,
    min_buy: Option<f64>,
    avg_price: Option<f64>,
    available: Option<f64>,
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, LoadError> {
    let content = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| LoadError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Tracked items, ordered by id.
pub fn load_items(path: &Path) -> Result<Vec<Item>, LoadError> {
    let file: ItemsFile = read_json(path)?;
    let items: Vec<Item> = file
        .items
        .into_iter()
        .map(|(id, name)| Item { id, name })
        .collect();
    info!(target: "loader", "Loaded {} items from {}", items.len(), path.display());
    Ok(items)
}

pub fn load_recipes(path: &Path) -> Result<RecipeCatalog, LoadError> {
    let file: RecipesFile = read_json(path)?;
    let catalog = RecipeCatalog::new(file.recipes);
    info!(target: "loader", "Loaded {} recipes from {}", catalog.len(), path.display());
    Ok(catalog)
}

pub fn load_vendor_prices(path: &Path) -> Result<VendorPrices, LoadError> {
    let file: VendorItemsFile = read_json(path)?;
    let prices: VendorPrices = file
        .vendor_items
        .into_iter()
        .map(|(id, dto)| (id, dto.vendor_price))
        .collect();
    info!(target: "loader", "Loaded {} vendor prices from {}", prices.len(), path.display());
    Ok(prices)
}

/// File name the history exporter uses for one item.
pub fn history_file_name(item: &Item) -> String {
    format!("item_{}_{}_last_30d.csv", item.id, item.name)
}

/// Reads one item's snapshot CSV, converting copper to gold.
pub fn load_item_history(path: &Path) -> Result<Vec<PriceSnapshot>, LoadError> {
    let csv_error = |source: csv::Error| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_error)?;

    let mut snapshots = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        let row: SnapshotRow = record.deserialize(None).map_err(csv_error)?;
        let Some(avg_price) = row.avg_price else {
            debug!(target: "loader", "{}: row {} has no average price", path.display(), row.timestamp);
            continue;
        };
        let timestamp = parse_timestamp(&row.timestamp).ok_or_else(|| LoadError::Timestamp {
            path: path.to_path_buf(),
            value: row.timestamp.clone(),
        })?;
        snapshots.push(PriceSnapshot {
            timestamp,
            bid: row.bid.unwrap_or(0.0) / COPPER_PER_GOLD,
            min_buyout: row.min_buy.unwrap_or(0.0) / COPPER_PER_GOLD,
            avg_price: avg_price / COPPER_PER_GOLD,
            available: row.available.unwrap_or(0.0).max(0.0) as u32,
        });
    }
    Ok(snapshots)
}

/// Accepts `YYYY-MM-DD HH:MM:SS`, the `T`-separated variant, and bare dates.
pub fn parse_timestamp(value: &str) -> Option<PrimitiveDateTime> {
    let spaced = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let iso = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
    let date_only = format_description!("[year]-[month]-[day]");

    PrimitiveDateTime::parse(value, spaced)
        .or_else(|_| PrimitiveDateTime::parse(value, iso))
        .ok()
        .or_else(|| Date::parse(value, date_only).ok().map(|date| date.midnight()))
}

/// Loads every item's history from `market_dir`, skipping unreadable files.
pub fn load_price_history(market_dir: &Path, items: &[Item]) -> Result<PriceHistory, LoadError> {
    let mut history = PriceHistory::new();
    for item in items {
        let path = market_dir.join(history_file_name(item));
        if !path.exists() {
            warn!(target: "loader", "Missing data file for {} (ID {})", item.name, item.id);
            continue;
        }
        match load_item_history(&path) {
            Ok(snapshots) if snapshots.is_empty() => {
                warn!(target: "loader", "No snapshots in {}", path.display());
            }
            Ok(snapshots) => history.insert(item.id, snapshots),
            Err(e) => warn!(target: "loader", "Error loading {} (ID {}): {e}", item.name, item.id),
        }
    }

    if history.is_empty() {
        return Err(LoadError::NoMarketData {
            dir: market_dir.to_path_buf(),
        });
    }
    info!(
        target: "loader",
        "Loaded market history for {}/{} items from {}",
        history.item_count(),
        items.len(),
        market_dir.display()
    );
    Ok(history)
}

/// Everything the analyses need, loaded once per run.
#[derive(Clone, Debug)]
pub struct MarketData {
    pub items: Vec<Item>,
    pub recipes: RecipeCatalog,
    pub vendor_prices: VendorPrices,
    pub history: PriceHistory,
}

impl MarketData {
    pub fn load(config: &Config) -> Result<Self, LoadError> {
        let items = load_items(&config.items_path())?;
        let recipes = load_recipes(&config.recipes_path())?;
        let vendor_prices = load_vendor_prices(&config.vendor_items_path())?;
        let history = load_price_history(&config.market_path(), &items)?;
        Ok(Self {
            items,
            recipes,
            vendor_prices,
            history,
        })
    }

    pub fn item_name(&self, item_id: ItemId) -> Option<&str> {
        self.items
            .iter()
            .find(|item| item.id == item_id)
            .map(|item| item.name.as_str())
    }
}
