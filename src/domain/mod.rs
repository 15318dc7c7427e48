//! Domain logic for crafting costs and market analysis lives here.

pub mod crafting;
pub mod entities;
pub mod evaluation;
pub mod market;

pub use crafting::{
    resolve_cost, CostBreakdown, CostResolver, CraftError, MarketPriceLookup, PriceSource,
    ReagentCost, ReagentPricing,
};
pub use entities::{
    Item, ItemId, PriceSnapshot, PriceWindow, Reagent, Recipe, RecipeCatalog, RecipeId,
    VendorPrices, COPPER_PER_GOLD,
};
pub use evaluation::{
    analyze_recipe, profitability, profitable_crafts, recipes_by_profession, CraftAnalysis,
    ProfessionGroup, Profit, RecipeStatus, DEFAULT_MIN_PROFIT_PCT,
};
pub use market::{
    buy_sell_signal, item_summary, market_opportunities, weekday_patterns, BuySellSignal,
    ItemSummary, MarketOpportunities, PriceHistory, WeekdayPattern,
    DEFAULT_OPPORTUNITY_THRESHOLD_PCT,
};
