use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::PrimitiveDateTime;

/// Identifier for items in the game's item database.
pub type ItemId = u32;

/// Identifier for recipes. In the shipped catalog this is the crafted item's id.
pub type RecipeId = u32;

/// Copper coins per gold coin. Market files store copper, everything else gold.
pub const COPPER_PER_GOLD: f64 = 10_000.0;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
}

/// One reagent line of a recipe.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Reagent {
    #[serde(rename = "id")]
    pub item_id: ItemId,
    #[serde(default)]
    pub name: String,
    pub quantity: u32,
}

impl Reagent {
    pub fn new(item_id: ItemId, name: impl Into<String>, quantity: u32) -> Self {
        Self {
            item_id,
            name: name.into(),
            quantity,
        }
    }
}

/// A crafting recipe as stored in `recipes.json`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Recipe {
    pub id: RecipeId,
    pub name: String,
    /// Profession or other source tag (e.g. "Alchemy").
    #[serde(default = "unknown_source")]
    pub source: String,
    /// Falls back to `id` when the catalog omits it.
    #[serde(default)]
    pub output_item_id: Option<ItemId>,
    #[serde(default, rename = "yield")]
    pub yield_quantity: Option<u32>,
    pub reagents: Vec<Reagent>,
}

fn unknown_source() -> String {
    "Unknown".to_string()
}

impl Recipe {
    pub fn new(id: RecipeId, name: impl Into<String>, reagents: Vec<Reagent>) -> Self {
        Self {
            id,
            name: name.into(),
            source: unknown_source(),
            output_item_id: None,
            yield_quantity: None,
            reagents,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_output(mut self, item_id: ItemId) -> Self {
        self.output_item_id = Some(item_id);
        self
    }

    pub fn with_yield(mut self, quantity: u32) -> Self {
        self.yield_quantity = Some(quantity);
        self
    }

    pub fn output_item(&self) -> ItemId {
        self.output_item_id.unwrap_or(self.id)
    }

    /// Units produced per craft. Missing or zero yields count as one.
    pub fn yield_per_craft(&self) -> u32 {
        self.yield_quantity.filter(|q| *q > 0).unwrap_or(1)
    }
}

/// Immutable recipe catalog with an index from output item to producing recipes.
#[derive(Clone, Debug, Default)]
pub struct RecipeCatalog {
    recipes: Vec<Recipe>,
    by_id: HashMap<RecipeId, usize>,
    producers: HashMap<ItemId, Vec<RecipeId>>,
}

impl RecipeCatalog {
    /// Builds the catalog. Later duplicates of a recipe id replace earlier ones.
    pub fn new(recipes: Vec<Recipe>) -> Self {
        let mut catalog = Self::default();
        for recipe in recipes {
            if let Some(&index) = catalog.by_id.get(&recipe.id) {
                catalog.recipes[index] = recipe;
            } else {
                catalog.by_id.insert(recipe.id, catalog.recipes.len());
                catalog.recipes.push(recipe);
            }
        }
        for recipe in &catalog.recipes {
            catalog
                .producers
                .entry(recipe.output_item())
                .or_default()
                .push(recipe.id);
        }
        catalog
    }

    pub fn get(&self, id: RecipeId) -> Option<&Recipe> {
        self.by_id.get(&id).map(|&index| &self.recipes[index])
    }

    /// Recipes producing `item_id`, in catalog order.
    pub fn producers_of(&self, item_id: ItemId) -> &[RecipeId] {
        self.producers
            .get(&item_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Recipe> {
        self.recipes.iter()
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}

/// Fixed vendor prices in gold.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VendorPrices {
    prices: HashMap<ItemId, f64>,
}

impl VendorPrices {
    pub fn new(prices: HashMap<ItemId, f64>) -> Self {
        Self { prices }
    }

    pub fn price(&self, item_id: ItemId) -> Option<f64> {
        self.prices
            .get(&item_id)
            .copied()
            .filter(|price| price.is_finite())
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

impl FromIterator<(ItemId, f64)> for VendorPrices {
    fn from_iter<T: IntoIterator<Item = (ItemId, f64)>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Time scope applied to market lookups.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceWindow {
    #[default]
    Current,
    SevenDayAverage,
}

impl PriceWindow {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::SevenDayAverage => "7d avg",
        }
    }
}

impl std::str::FromStr for PriceWindow {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "current" | "now" => Ok(Self::Current),
            "7d" | "week" | "seven_day_average" => Ok(Self::SevenDayAverage),
            other => Err(format!("unknown price window {other:?} (expected current or 7d)")),
        }
    }
}

/// One hourly auction-house observation, prices in gold.
#[derive(Clone, Debug, PartialEq)]
pub struct PriceSnapshot {
    pub timestamp: PrimitiveDateTime,
    pub bid: f64,
    pub min_buyout: f64,
    pub avg_price: f64,
    pub available: u32,
}
