//! Recursive crafting cost resolution.
//!
//! Every reagent is priced from up to three sources, tried in a fixed order:
//! a vendor price, the cost of crafting it from its own recipe, and the
//! auction house under the requested [`PriceWindow`]. The cheapest candidate
//! wins and exact ties go to the earlier source. Crafted candidates recurse
//! with the same rules down to vendor-only or auction-only leaves.
//!
//! The recipes currently being resolved are kept on a path stack; meeting one
//! of them again aborts the call with [`CraftError::CyclicRecipe`].

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use super::entities::{ItemId, PriceWindow, Recipe, RecipeCatalog, RecipeId, VendorPrices};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CraftError {
    #[error("unknown recipe: {0}")]
    UnknownRecipe(RecipeId),
    #[error("recipe cycle detected: {}", format_path(.path))]
    CyclicRecipe { path: Vec<RecipeId> },
}

fn format_path(path: &[RecipeId]) -> String {
    path.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Source of market prices for reagents and finished goods.
pub trait MarketPriceLookup {
    /// Unit price in gold, `None` when there is no data for the item.
    fn market_price(&self, item_id: ItemId, window: PriceWindow) -> Option<f64>;
}

impl<F> MarketPriceLookup for F
where
    F: Fn(ItemId, PriceWindow) -> Option<f64>,
{
    fn market_price(&self, item_id: ItemId, window: PriceWindow) -> Option<f64> {
        self(item_id, window)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PriceSource {
    Vendor,
    Crafted,
    Auction,
}

impl PriceSource {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Vendor => "vendor",
            Self::Crafted => "crafted",
            Self::Auction => "auction",
        }
    }
}

/// How a single reagent ended up priced.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ReagentPricing {
    Vendor { unit_price: f64 },
    Crafted {
        unit_price: f64,
        breakdown: Box<CostBreakdown>,
    },
    Auction { unit_price: f64 },
    /// No source has a price. `partial` keeps the cheapest-looking producer
    /// recipe tree, if the item is craftable, so missing leaves stay visible.
    Unpriceable {
        partial: Option<Box<CostBreakdown>>,
    },
}

impl ReagentPricing {
    pub fn unit_price(&self) -> Option<f64> {
        match self {
            Self::Vendor { unit_price }
            | Self::Crafted { unit_price, .. }
            | Self::Auction { unit_price } => Some(*unit_price),
            Self::Unpriceable { .. } => None,
        }
    }

    pub fn is_priceable(&self) -> bool {
        !matches!(self, Self::Unpriceable { .. })
    }

    pub fn source(&self) -> Option<PriceSource> {
        match self {
            Self::Vendor { .. } => Some(PriceSource::Vendor),
            Self::Crafted { .. } => Some(PriceSource::Crafted),
            Self::Auction { .. } => Some(PriceSource::Auction),
            Self::Unpriceable { .. } => None,
        }
    }

    /// Nested recipe tree for crafted reagents, priced or partial.
    pub fn sub_breakdown(&self) -> Option<&CostBreakdown> {
        match self {
            Self::Crafted { breakdown, .. } => Some(breakdown),
            Self::Unpriceable { partial } => partial.as_deref(),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReagentCost {
    pub item_id: ItemId,
    pub name: String,
    pub quantity: u32,
    pub pricing: ReagentPricing,
}

impl ReagentCost {
    /// quantity × unit price, `None` if unpriceable.
    pub fn total(&self) -> Option<f64> {
        self.pricing
            .unit_price()
            .map(|price| price * self.quantity as f64)
    }
}

/// Cost tree for one recipe, mirroring its reagent graph.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CostBreakdown {
    pub recipe_id: RecipeId,
    pub recipe_name: String,
    pub profession: String,
    pub output_item_id: ItemId,
    pub yield_quantity: u32,
    pub window: PriceWindow,
    pub reagents: Vec<ReagentCost>,
    /// Per output unit. `None` when any reagent is unpriceable.
    pub unit_cost: Option<f64>,
    /// Per output unit over the priceable reagents only. Display use.
    pub partial_unit_cost: f64,
    pub missing: Vec<ItemId>,
}

impl CostBreakdown {
    pub fn is_priceable(&self) -> bool {
        self.unit_cost.is_some()
    }
}

/// Resolves crafting costs against read-only reference data.
pub struct CostResolver<'a, M: ?Sized> {
    recipes: &'a RecipeCatalog,
    vendor_prices: &'a VendorPrices,
    market: &'a M,
}

impl<'a, M> CostResolver<'a, M>
where
    M: MarketPriceLookup + ?Sized,
{
    pub fn new(recipes: &'a RecipeCatalog, vendor_prices: &'a VendorPrices, market: &'a M) -> Self {
        Self {
            recipes,
            vendor_prices,
            market,
        }
    }

    pub fn recipes(&self) -> &'a RecipeCatalog {
        self.recipes
    }

    pub fn market(&self) -> &'a M {
        self.market
    }

    pub fn resolve_cost(
        &self,
        recipe_id: RecipeId,
        window: PriceWindow,
    ) -> Result<CostBreakdown, CraftError> {
        let mut path = Vec::new();
        self.resolve_on_path(recipe_id, window, &mut path)
    }

    /// Picks the cheapest source for one reagent item.
    pub fn select_reagent_price(
        &self,
        item_id: ItemId,
        window: PriceWindow,
    ) -> Result<ReagentPricing, CraftError> {
        let mut path = Vec::new();
        self.select_on_path(item_id, window, &mut path)
    }

    fn resolve_on_path(
        &self,
        recipe_id: RecipeId,
        window: PriceWindow,
        path: &mut Vec<RecipeId>,
    ) -> Result<CostBreakdown, CraftError> {
        if let Some(start) = path.iter().position(|&id| id == recipe_id) {
            let mut cycle = path[start..].to_vec();
            cycle.push(recipe_id);
            return Err(CraftError::CyclicRecipe { path: cycle });
        }
        let recipe = self
            .recipes
            .get(recipe_id)
            .ok_or(CraftError::UnknownRecipe(recipe_id))?;

        path.push(recipe_id);
        let reagents = recipe
            .reagents
            .iter()
            .map(|reagent| {
                let pricing = self.select_on_path(reagent.item_id, window, path)?;
                Ok(ReagentCost {
                    item_id: reagent.item_id,
                    name: reagent.name.clone(),
                    quantity: reagent.quantity,
                    pricing,
                })
            })
            .collect::<Result<Vec<_>, CraftError>>();
        path.pop();

        Ok(summarize(recipe, window, reagents?))
    }

    fn select_on_path(
        &self,
        item_id: ItemId,
        window: PriceWindow,
        path: &mut Vec<RecipeId>,
    ) -> Result<ReagentPricing, CraftError> {
        // Candidate order doubles as the tie-break order.
        let mut best: Option<ReagentPricing> = None;
        let mut consider = |candidate: ReagentPricing| {
            let cheaper = match (&best, candidate.unit_price()) {
                (_, None) => false,
                (None, Some(_)) => true,
                (Some(current), Some(price)) => current.unit_price().map_or(true, |c| price < c),
            };
            if cheaper {
                best = Some(candidate);
            }
        };

        if let Some(unit_price) = self.vendor_prices.price(item_id) {
            consider(ReagentPricing::Vendor { unit_price });
        }

        let mut cheapest_craft: Option<CostBreakdown> = None;
        let mut partial_craft: Option<CostBreakdown> = None;
        for &producer in self.recipes.producers_of(item_id) {
            let breakdown = self.resolve_on_path(producer, window, path)?;
            let Some(cost) = breakdown.unit_cost else {
                if partial_craft.is_none() {
                    partial_craft = Some(breakdown);
                }
                continue;
            };
            let cheaper = cheapest_craft
                .as_ref()
                .and_then(|current| current.unit_cost)
                .map_or(true, |current| cost < current);
            if cheaper {
                cheapest_craft = Some(breakdown);
            }
        }
        if let Some(breakdown) = cheapest_craft {
            if let Some(unit_price) = breakdown.unit_cost {
                consider(ReagentPricing::Crafted {
                    unit_price,
                    breakdown: Box::new(breakdown),
                });
            }
        }

        if let Some(unit_price) = self
            .market
            .market_price(item_id, window)
            .filter(|price| price.is_finite())
        {
            consider(ReagentPricing::Auction { unit_price });
        }

        let pricing = best.unwrap_or_else(|| ReagentPricing::Unpriceable {
            partial: partial_craft.map(Box::new),
        });
        debug!(
            target: "resolver",
            item_id,
            window = window.label(),
            source = pricing.source().map(|s| s.label()).unwrap_or("unpriceable"),
            "priced reagent"
        );
        Ok(pricing)
    }
}

/// Resolves `recipe_id` with the given reference data.
pub fn resolve_cost<M>(
    recipe_id: RecipeId,
    window: PriceWindow,
    recipes: &RecipeCatalog,
    vendor_prices: &VendorPrices,
    market_lookup: &M,
) -> Result<CostBreakdown, CraftError>
where
    M: MarketPriceLookup + ?Sized,
{
    CostResolver::new(recipes, vendor_prices, market_lookup).resolve_cost(recipe_id, window)
}

fn summarize(recipe: &Recipe, window: PriceWindow, reagents: Vec<ReagentCost>) -> CostBreakdown {
    let yield_quantity = recipe.yield_per_craft();
    let partial: f64 = reagents.iter().filter_map(ReagentCost::total).sum();
    let missing: Vec<ItemId> = reagents
        .iter()
        .filter(|reagent| reagent.pricing.unit_price().is_none())
        .map(|reagent| reagent.item_id)
        .collect();
    let partial_unit_cost = partial / yield_quantity as f64;
    let unit_cost = missing.is_empty().then_some(partial_unit_cost);

    CostBreakdown {
        recipe_id: recipe.id,
        recipe_name: recipe.name.clone(),
        profession: recipe.source.clone(),
        output_item_id: recipe.output_item(),
        yield_quantity,
        window,
        reagents,
        unit_cost,
        partial_unit_cost,
        missing,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::domain::entities::Reagent;

    const A: ItemId = 10;
    const B: ItemId = 20;
    const C: ItemId = 30;

    fn no_market(_: ItemId, _: PriceWindow) -> Option<f64> {
        None
    }

    fn example_catalog() -> RecipeCatalog {
        RecipeCatalog::new(vec![
            Recipe::new(1, "R1", vec![Reagent::new(A, "A", 2), Reagent::new(B, "B", 1)])
                .with_output(100),
            Recipe::new(2, "R2", vec![Reagent::new(C, "C", 3)]).with_output(B),
        ])
    }

    fn vendor(prices: &[(ItemId, f64)]) -> VendorPrices {
        prices.iter().copied().collect()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn nested_recipe_is_costed_through_sub_recipe() {
        let recipes = example_catalog();
        let vendor = vendor(&[(A, 1.0)]);
        let market = |item: ItemId, _: PriceWindow| (item == C).then_some(0.5);

        let breakdown = resolve_cost(1, PriceWindow::Current, &recipes, &vendor, &market).unwrap();

        assert!(approx(breakdown.unit_cost.unwrap(), 3.5));
        let b = &breakdown.reagents[1];
        assert_eq!(b.pricing.source(), Some(PriceSource::Crafted));
        assert!(approx(b.pricing.unit_price().unwrap(), 1.5));
        let nested = b.pricing.sub_breakdown().unwrap();
        assert_eq!(nested.recipe_id, 2);
        assert_eq!(nested.reagents[0].pricing.source(), Some(PriceSource::Auction));
    }

    #[test]
    fn cheaper_craft_beats_vendor() {
        let recipes = RecipeCatalog::new(vec![
            Recipe::new(1, "Top", vec![Reagent::new(50, "X", 1)]),
            Recipe::new(2, "Make X", vec![Reagent::new(A, "A", 1)]).with_output(50),
        ]);
        let vendor = vendor(&[(50, 2.0), (A, 1.0)]);

        let pricing = CostResolver::new(&recipes, &vendor, &no_market)
            .select_reagent_price(50, PriceWindow::Current)
            .unwrap();

        assert_eq!(pricing.source(), Some(PriceSource::Crafted));
        assert!(approx(pricing.unit_price().unwrap(), 1.0));
    }

    #[test]
    fn exact_ties_follow_source_order() {
        let recipes = RecipeCatalog::new(vec![
            Recipe::new(2, "Make X", vec![Reagent::new(A, "A", 1)]).with_output(50),
        ]);
        let market = |_: ItemId, _: PriceWindow| Some(1.0);

        let vendor_tie = vendor(&[(50, 1.0), (A, 1.0)]);
        let pricing = CostResolver::new(&recipes, &vendor_tie, &market)
            .select_reagent_price(50, PriceWindow::Current)
            .unwrap();
        assert_eq!(pricing.source(), Some(PriceSource::Vendor));

        let craft_tie = vendor(&[(A, 1.0)]);
        let pricing = CostResolver::new(&recipes, &craft_tie, &market)
            .select_reagent_price(50, PriceWindow::Current)
            .unwrap();
        assert_eq!(pricing.source(), Some(PriceSource::Crafted));
    }

    #[test]
    fn auction_wins_when_cheapest() {
        let recipes = RecipeCatalog::default();
        let vendor = vendor(&[(A, 3.0)]);
        let market = |_: ItemId, _: PriceWindow| Some(2.5);

        let pricing = CostResolver::new(&recipes, &vendor, &market)
            .select_reagent_price(A, PriceWindow::Current)
            .unwrap();

        assert_eq!(pricing, ReagentPricing::Auction { unit_price: 2.5 });
    }

    #[test]
    fn yield_divides_total() {
        let recipes = RecipeCatalog::new(vec![Recipe::new(
            1,
            "Batch",
            vec![Reagent::new(A, "A", 4), Reagent::new(B, "B", 2)],
        )
        .with_yield(5)]);
        let vendor = vendor(&[(A, 1.0), (B, 0.5)]);

        let breakdown = resolve_cost(1, PriceWindow::Current, &recipes, &vendor, &no_market).unwrap();

        assert_eq!(breakdown.yield_quantity, 5);
        assert!(approx(breakdown.unit_cost.unwrap(), 1.0));
    }

    #[test]
    fn unknown_recipe_is_an_error() {
        let recipes = example_catalog();
        let err = resolve_cost(99, PriceWindow::Current, &recipes, &VendorPrices::default(), &no_market)
            .unwrap_err();
        assert_eq!(err, CraftError::UnknownRecipe(99));
    }

    #[test]
    fn direct_self_reference_is_a_cycle() {
        let recipes = RecipeCatalog::new(vec![Recipe::new(
            7,
            "Ouroboros",
            vec![Reagent::new(7, "Ouroboros", 1)],
        )]);
        let err = resolve_cost(7, PriceWindow::Current, &recipes, &VendorPrices::default(), &no_market)
            .unwrap_err();
        assert_eq!(err, CraftError::CyclicRecipe { path: vec![7, 7] });
    }

    #[test]
    fn transitive_cycle_reports_path() {
        let recipes = RecipeCatalog::new(vec![
            Recipe::new(1, "One", vec![Reagent::new(2, "Two", 1)]),
            Recipe::new(2, "Two", vec![Reagent::new(3, "Three", 1)]),
            Recipe::new(3, "Three", vec![Reagent::new(1, "One", 1)]),
        ]);
        let vendor = vendor(&[(1, 1.0), (2, 1.0), (3, 1.0)]);

        let err = resolve_cost(1, PriceWindow::Current, &recipes, &vendor, &no_market).unwrap_err();

        assert_eq!(err, CraftError::CyclicRecipe { path: vec![1, 2, 3, 1] });
        assert_eq!(err.to_string(), "recipe cycle detected: 1 -> 2 -> 3 -> 1");
    }

    #[test]
    fn missing_reagent_makes_recipe_unpriceable() {
        let recipes = example_catalog();
        let vendor = vendor(&[(A, 1.0)]);

        let breakdown = resolve_cost(1, PriceWindow::Current, &recipes, &vendor, &no_market).unwrap();

        assert_eq!(breakdown.unit_cost, None);
        assert_eq!(breakdown.missing, vec![B]);
        assert!(approx(breakdown.partial_unit_cost, 2.0));
        let pricing = &breakdown.reagents[1].pricing;
        assert!(!pricing.is_priceable());
        // R2 stays attached so the missing C leaf can be shown.
        let partial = pricing.sub_breakdown().unwrap();
        assert_eq!(partial.recipe_id, 2);
        assert_eq!(partial.missing, vec![C]);
    }

    #[test]
    fn uncraftable_missing_reagent_has_no_partial_tree() {
        let recipes = RecipeCatalog::new(vec![Recipe::new(1, "Solo", vec![Reagent::new(A, "A", 1)])]);

        let breakdown =
            resolve_cost(1, PriceWindow::Current, &recipes, &VendorPrices::default(), &no_market)
                .unwrap();

        assert_eq!(
            breakdown.reagents[0].pricing,
            ReagentPricing::Unpriceable { partial: None }
        );
    }

    #[test]
    fn all_reagents_missing_is_unpriceable() {
        let recipes = example_catalog();
        let breakdown =
            resolve_cost(1, PriceWindow::Current, &recipes, &VendorPrices::default(), &no_market).unwrap();
        assert!(!breakdown.is_priceable());
        assert_eq!(breakdown.missing, vec![A, B]);
    }

    #[test]
    fn window_only_moves_auction_leaves() {
        let recipes = example_catalog();
        let vendor = vendor(&[(A, 1.0)]);
        let prices: HashMap<PriceWindow, f64> =
            [(PriceWindow::Current, 0.5), (PriceWindow::SevenDayAverage, 1.0)].into();
        let market = move |item: ItemId, window: PriceWindow| {
            (item == C).then(|| prices[&window])
        };

        let now = resolve_cost(1, PriceWindow::Current, &recipes, &vendor, &market).unwrap();
        let week = resolve_cost(1, PriceWindow::SevenDayAverage, &recipes, &vendor, &market).unwrap();

        assert_eq!(now.reagents[0].pricing, week.reagents[0].pricing);
        assert!(approx(now.unit_cost.unwrap(), 3.5));
        assert!(approx(week.unit_cost.unwrap(), 5.0));
        assert_eq!(week.window, PriceWindow::SevenDayAverage);
    }

    #[test]
    fn cheapest_of_several_producers_is_used() {
        let recipes = RecipeCatalog::new(vec![
            Recipe::new(1, "Top", vec![Reagent::new(B, "B", 1)]),
            Recipe::new(2, "Pricey B", vec![Reagent::new(A, "A", 3)]).with_output(B),
            Recipe::new(3, "Cheap B", vec![Reagent::new(A, "A", 1)]).with_output(B),
        ]);
        let vendor = vendor(&[(A, 1.0)]);

        let breakdown = resolve_cost(1, PriceWindow::Current, &recipes, &vendor, &no_market).unwrap();

        let nested = breakdown.reagents[0].pricing.sub_breakdown().unwrap();
        assert_eq!(nested.recipe_id, 3);
        assert!(approx(breakdown.unit_cost.unwrap(), 1.0));
    }
}
