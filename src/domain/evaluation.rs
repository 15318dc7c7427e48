use std::collections::BTreeMap;

use tracing::warn;

use super::crafting::{CostBreakdown, CostResolver, CraftError, MarketPriceLookup};
use super::entities::{PriceWindow, RecipeId};

/// Default ROI a craft must beat to be listed as profitable.
pub const DEFAULT_MIN_PROFIT_PCT: f64 = 5.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Profit {
    pub gold: f64,
    pub pct: f64,
}

impl Profit {
    pub fn exceeds(&self, threshold_pct: f64) -> bool {
        self.pct > threshold_pct
    }
}

/// Profit from crafting at `unit_cost` and selling at `sale_price`.
pub fn profitability(sale_price: f64, unit_cost: f64) -> Profit {
    let gold = sale_price - unit_cost;
    let pct = if unit_cost > 0.0 {
        gold / unit_cost * 100.0
    } else {
        0.0
    };
    Profit { gold, pct }
}

/// One recipe costed under both windows.
#[derive(Clone, Debug, PartialEq)]
pub struct CraftAnalysis {
    pub current: CostBreakdown,
    pub week: CostBreakdown,
    pub sale_price: Option<f64>,
    pub sale_price_7d: Option<f64>,
    pub profit: Option<Profit>,
    pub profit_7d: Option<Profit>,
}

impl CraftAnalysis {
    pub fn recipe_id(&self) -> RecipeId {
        self.current.recipe_id
    }

    pub fn recipe_name(&self) -> &str {
        &self.current.recipe_name
    }

    pub fn profession(&self) -> &str {
        &self.current.profession
    }

    pub fn is_profitable(&self, threshold_pct: f64) -> bool {
        self.profit.is_some_and(|p| p.exceeds(threshold_pct))
    }

    pub fn status(&self) -> RecipeStatus {
        if self.sale_price.is_none() {
            return RecipeStatus::NoMarketData;
        }
        if !self.current.missing.is_empty() {
            return RecipeStatus::MissingReagents(self.current.missing.len());
        }
        match self.profit {
            Some(profit) if profit.gold > 0.0 => RecipeStatus::Profitable,
            _ => RecipeStatus::Loss,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecipeStatus {
    Profitable,
    Loss,
    MissingReagents(usize),
    NoMarketData,
}

impl RecipeStatus {
    pub fn label(&self) -> String {
        match self {
            Self::Profitable => "profitable".to_string(),
            Self::Loss => "loss".to_string(),
            Self::MissingReagents(count) => format!("missing {count} reagent price(s)"),
            Self::NoMarketData => "no market data".to_string(),
        }
    }
}

pub fn analyze_recipe<M>(
    resolver: &CostResolver<'_, M>,
    recipe_id: RecipeId,
) -> Result<CraftAnalysis, CraftError>
where
    M: MarketPriceLookup + ?Sized,
{
    let current = resolver.resolve_cost(recipe_id, PriceWindow::Current)?;
    let week = resolver.resolve_cost(recipe_id, PriceWindow::SevenDayAverage)?;

    let market = resolver.market();
    let sale_price = market.market_price(current.output_item_id, PriceWindow::Current);
    let sale_price_7d = market.market_price(current.output_item_id, PriceWindow::SevenDayAverage);

    let profit = sale_price
        .zip(current.unit_cost)
        .map(|(sale, cost)| profitability(sale, cost));
    let profit_7d = sale_price_7d
        .zip(week.unit_cost)
        .map(|(sale, cost)| profitability(sale, cost));

    Ok(CraftAnalysis {
        current,
        week,
        sale_price,
        sale_price_7d,
        profit,
        profit_7d,
    })
}

fn analyze_all<M>(resolver: &CostResolver<'_, M>) -> Vec<CraftAnalysis>
where
    M: MarketPriceLookup + ?Sized,
{
    resolver
        .recipes()
        .iter()
        .filter_map(|recipe| match analyze_recipe(resolver, recipe.id) {
            Ok(analysis) => Some(analysis),
            Err(err) => {
                warn!(target: "resolver", recipe = recipe.id, "skipping {}: {err}", recipe.name);
                None
            }
        })
        .collect()
}

/// Fully priced recipes whose current ROI beats `min_profit_pct`, best first.
pub fn profitable_crafts<M>(resolver: &CostResolver<'_, M>, min_profit_pct: f64) -> Vec<CraftAnalysis>
where
    M: MarketPriceLookup + ?Sized,
{
    let mut profitable: Vec<CraftAnalysis> = analyze_all(resolver)
        .into_iter()
        .filter(|analysis| analysis.is_profitable(min_profit_pct))
        .collect();

    profitable.sort_by(|a, b| {
        let a_gold = a.profit.map(|p| p.gold).unwrap_or(f64::MIN);
        let b_gold = b.profit.map(|p| p.gold).unwrap_or(f64::MIN);
        b_gold.partial_cmp(&a_gold).unwrap_or(std::cmp::Ordering::Equal)
    });
    profitable
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProfessionGroup {
    pub profession: String,
    pub recipes: Vec<CraftAnalysis>,
}

/// Every recipe analysis grouped by profession, both levels sorted by name.
pub fn recipes_by_profession<M>(resolver: &CostResolver<'_, M>) -> Vec<ProfessionGroup>
where
    M: MarketPriceLookup + ?Sized,
{
    let mut groups: BTreeMap<String, Vec<CraftAnalysis>> = BTreeMap::new();
    for analysis in analyze_all(resolver) {
        groups
            .entry(analysis.profession().to_string())
            .or_default()
            .push(analysis);
    }

    groups
        .into_iter()
        .map(|(profession, mut recipes)| {
            recipes.sort_by(|a, b| a.recipe_name().cmp(b.recipe_name()));
            ProfessionGroup {
                profession,
                recipes,
            }
        })
        .collect()
}
