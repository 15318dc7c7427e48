use thiserror::Error;

use crate::{
    domain::{
        item_summary, market_opportunities, profitable_crafts, recipes_by_profession,
        CostResolver, CraftError, PriceHistory, PriceWindow, RecipeId,
    },
    infra::MarketData,
    ui::report,
    util::config::Config,
};

/// One report the CLI can produce.
#[derive(Clone, Debug, PartialEq)]
pub enum Report {
    Cost {
        recipe_id: RecipeId,
        window: PriceWindow,
        /// Emit the breakdown tree as JSON instead of text.
        json: bool,
    },
    Crafts { min_profit_pct: Option<f64> },
    Recipes,
    Opportunities { threshold_pct: Option<f64> },
    Summary,
    /// Opportunities, crafts, recipes and summary in one run.
    All,
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Craft(#[from] CraftError),
    #[error("failed to encode report as JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Loaded data plus settings; produces rendered reports.
pub struct App {
    config: Config,
    data: MarketData,
}

impl App {
    pub fn new(config: Config, data: MarketData) -> Self {
        Self { config, data }
    }

    /// Accepts a numeric recipe id or a case-insensitive recipe name.
    pub fn find_recipe(&self, query: &str) -> Option<RecipeId> {
        if let Ok(id) = query.trim().parse::<RecipeId>() {
            return Some(id);
        }
        self.data
            .recipes
            .iter()
            .find(|recipe| recipe.name.eq_ignore_ascii_case(query.trim()))
            .map(|recipe| recipe.id)
    }

    fn resolver(&self) -> CostResolver<'_, PriceHistory> {
        CostResolver::new(
            &self.data.recipes,
            &self.data.vendor_prices,
            &self.data.history,
        )
    }

    pub fn render(&self, request: &Report) -> Result<String, ReportError> {
        let max_display = self.config.max_display;
        let text = match *request {
            Report::Cost {
                recipe_id,
                window,
                json,
            } => {
                let breakdown = self.resolver().resolve_cost(recipe_id, window)?;
                if json {
                    let mut encoded = serde_json::to_string_pretty(&breakdown)?;
                    encoded.push('\n');
                    encoded
                } else {
                    report::cost_tree(&breakdown)
                }
            }
            Report::Crafts { min_profit_pct } => {
                let threshold = min_profit_pct.unwrap_or(self.config.min_profit_pct);
                let crafts = profitable_crafts(&self.resolver(), threshold);
                report::profitable_crafts(&crafts, max_display)
            }
            Report::Recipes => report::recipes_by_profession(&recipes_by_profession(&self.resolver())),
            Report::Opportunities { threshold_pct } => {
                let threshold = threshold_pct.unwrap_or(self.config.opportunity_threshold_pct);
                let opportunities =
                    market_opportunities(&self.data.history, &self.data.items, threshold);
                report::opportunities(&opportunities, max_display)
            }
            Report::Summary => {
                let summaries: Vec<_> = self
                    .data
                    .items
                    .iter()
                    .filter_map(|item| item_summary(&self.data.history, item))
                    .collect();
                report::market_summary(&summaries)
            }
            Report::All => {
                let sections = [
                    Report::Opportunities {
                        threshold_pct: None,
                    },
                    Report::Crafts {
                        min_profit_pct: None,
                    },
                    Report::Recipes,
                    Report::Summary,
                ];
                sections
                    .iter()
                    .map(|section| self.render(section))
                    .collect::<Result<Vec<_>, _>>()?
                    .join("\n")
            }
        };
        Ok(text)
    }
}
