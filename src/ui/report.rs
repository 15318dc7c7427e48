//! Plain line-oriented renderings of the analyses for stdout.

use time::macros::format_description;

use crate::domain::{
    CostBreakdown, CraftAnalysis, ItemSummary, MarketOpportunities, ProfessionGroup,
    RecipeStatus,
};

pub fn gold(value: f64) -> String {
    format!("{value:.2}g")
}

fn signed_gold(value: f64) -> String {
    format!("{value:+.2}g")
}

fn optional_gold(value: Option<f64>) -> String {
    value.map(gold).unwrap_or_else(|| "n/a".to_string())
}

/// Indented reagent tree, one line per reagent. Crafted reagents are expanded,
/// and so are unpriceable craftable ones, down to the missing leaves.
pub fn cost_tree(breakdown: &CostBreakdown) -> String {
    let mut out = format!(
        "{} [{}] ({}, yield {}) unit cost: {}\n",
        breakdown.recipe_name,
        breakdown.profession,
        breakdown.window.label(),
        breakdown.yield_quantity,
        unit_cost_label(breakdown)
    );
    push_reagents(&mut out, breakdown, 1);
    out
}

fn unit_cost_label(breakdown: &CostBreakdown) -> String {
    match breakdown.unit_cost {
        Some(cost) => gold(cost),
        None => format!(
            "unpriceable ({}+ known, {} reagent(s) missing)",
            gold(breakdown.partial_unit_cost),
            breakdown.missing.len()
        ),
    }
}

fn push_reagents(out: &mut String, breakdown: &CostBreakdown, depth: usize) {
    let indent = "  ".repeat(depth);
    for reagent in &breakdown.reagents {
        let label = reagent
            .pricing
            .source()
            .map(|source| source.label().to_uppercase())
            .unwrap_or_else(|| "MISSING".to_string());
        let total = match reagent.pricing.sub_breakdown() {
            Some(partial) if !reagent.pricing.is_priceable() => {
                format!("{}+", gold(partial.partial_unit_cost * reagent.quantity as f64))
            }
            _ => optional_gold(reagent.total()),
        };
        out.push_str(&format!(
            "{indent}[{label}] {}x {}: {} each = {total}\n",
            reagent.quantity,
            reagent.name,
            optional_gold(reagent.pricing.unit_price()),
        ));
        if let Some(nested) = reagent.pricing.sub_breakdown() {
            push_reagents(out, nested, depth + 1);
        }
    }
}

pub fn profitable_crafts(crafts: &[CraftAnalysis], max_display: usize) -> String {
    if crafts.is_empty() {
        return "No profitable recipes found.\n".to_string();
    }
    let mut out = String::from("PROFITABLE CRAFTS\n");
    for craft in crafts.iter().take(max_display) {
        let (profit, pct) = craft
            .profit
            .map(|p| (signed_gold(p.gold), format!("{:+.1}%", p.pct)))
            .unwrap_or_else(|| ("n/a".to_string(), "n/a".to_string()));
        out.push_str(&format!(
            "  {:<32} cost {} (7d {})  sells {} (7d {})  profit {profit} ROI {pct}\n",
            craft.recipe_name(),
            optional_gold(craft.current.unit_cost),
            optional_gold(craft.week.unit_cost),
            optional_gold(craft.sale_price),
            optional_gold(craft.sale_price_7d),
        ));
    }
    if let Some(top) = crafts.first() {
        out.push_str("\nTop recipe details:\n");
        out.push_str(&cost_tree(&top.current));
    }
    out
}

pub fn recipes_by_profession(groups: &[ProfessionGroup]) -> String {
    let mut out = String::new();
    for group in groups {
        out.push_str(&format!("{} recipes\n", group.profession));
        for analysis in &group.recipes {
            let status = analysis.status();
            let detail = match status {
                RecipeStatus::Profitable | RecipeStatus::Loss => analysis
                    .profit
                    .map(|p| format!("{} ({:+.1}%)", signed_gold(p.gold), p.pct))
                    .unwrap_or_default(),
                _ => String::new(),
            };
            out.push_str(&format!(
                "  {:<32} cost {}  market {}  {} {detail}\n",
                analysis.recipe_name(),
                unit_cost_label(&analysis.current),
                optional_gold(analysis.sale_price),
                status.label(),
            ));
        }
    }
    out
}

pub fn opportunities(opportunities: &MarketOpportunities, max_display: usize) -> String {
    let stamp = format_description!("[month repr:short] [day] [hour]:[minute]");
    let mut out = String::new();
    for (title, signals, empty) in [
        (
            "BUY NOW - cheaper than 3-day average",
            &opportunities.buy,
            "No significant buy opportunities right now.",
        ),
        (
            "SELL NOW - pricier than 3-day average",
            &opportunities.sell,
            "No significant sell opportunities right now.",
        ),
    ] {
        if signals.is_empty() {
            out.push_str(empty);
            out.push('\n');
            continue;
        }
        out.push_str(title);
        out.push('\n');
        for signal in signals.iter().take(max_display) {
            out.push_str(&format!(
                "  {:<32} now {}  3d avg {}  diff {} ({:+.1}%)  updated {}\n",
                signal.item_name,
                gold(signal.current_price),
                gold(signal.avg_3d),
                signed_gold(signal.price_diff),
                signal.pct_diff,
                signal.last_updated.format(stamp).unwrap_or_default()
            ));
        }
    }
    out
}

pub fn market_summary(summaries: &[ItemSummary]) -> String {
    let mut out = String::from("Market summary\n");
    for summary in summaries {
        let flip = summary
            .patterns
            .as_ref()
            .map(|p| {
                format!(
                    "buy {} ({}) sell {} ({}) spread {} flip {:+.1}%",
                    p.best_buy_day,
                    gold(p.best_buy_price),
                    p.best_sell_day,
                    gold(p.best_sell_price),
                    signed_gold(p.gold_spread()),
                    p.flip_profit_pct
                )
            })
            .unwrap_or_else(|| "not enough weekday samples".to_string());
        out.push_str(&format!(
            "  {:<32} 30d {}  7d {}  trend {:+.2}%  {flip}\n",
            summary.item_name,
            gold(summary.avg_30d),
            gold(summary.avg_7d),
            summary.trend_pct,
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        resolve_cost, ItemId, PriceWindow, Reagent, Recipe, RecipeCatalog, VendorPrices,
    };

    #[test]
    fn tree_marks_sources_and_missing() {
        let recipes = RecipeCatalog::new(vec![
            Recipe::new(1, "Flask", vec![Reagent::new(2, "Oil", 1), Reagent::new(3, "Ghost", 1)])
                .with_source("Alchemy"),
            Recipe::new(2, "Oil", vec![Reagent::new(4, "Fish", 2)]),
        ]);
        let vendor: VendorPrices = [(4, 0.25)].into_iter().collect();
        let market = |_: ItemId, _: PriceWindow| -> Option<f64> { None };

        let breakdown = resolve_cost(1, PriceWindow::Current, &recipes, &vendor, &market).unwrap();
        let text = cost_tree(&breakdown);

        assert!(text.starts_with("Flask [Alchemy]"));
        assert!(text.contains("unpriceable (0.50g+ known, 1 reagent(s) missing)"));
        assert!(text.contains("  [CRAFTED] 1x Oil: 0.50g each = 0.50g"));
        assert!(text.contains("    [VENDOR] 2x Fish: 0.25g each = 0.50g"));
        assert!(text.contains("[MISSING] 1x Ghost: n/a each = n/a"));
    }

    #[test]
    fn unpriceable_crafted_reagent_shows_its_leaves() {
        let recipes = RecipeCatalog::new(vec![
            Recipe::new(1, "Flask", vec![Reagent::new(2, "Oil", 2)]),
            Recipe::new(2, "Oil", vec![Reagent::new(4, "Fish", 1), Reagent::new(3, "Ghost", 1)]),
        ]);
        let vendor: VendorPrices = [(4, 0.25)].into_iter().collect();
        let market = |_: ItemId, _: PriceWindow| -> Option<f64> { None };

        let breakdown = resolve_cost(1, PriceWindow::Current, &recipes, &vendor, &market).unwrap();
        let text = cost_tree(&breakdown);

        assert!(text.contains("  [MISSING] 2x Oil: n/a each = 0.50g+\n"), "{text}");
        assert!(text.contains("    [VENDOR] 1x Fish: 0.25g each = 0.25g\n"));
        assert!(text.contains("    [MISSING] 1x Ghost: n/a each = n/a\n"));
    }

    #[test]
    fn empty_lists_say_so() {
        assert_eq!(profitable_crafts(&[], 15), "No profitable recipes found.\n");
        let text = opportunities(&MarketOpportunities::default(), 15);
        assert!(text.contains("No significant buy opportunities"));
        assert!(text.contains("No significant sell opportunities"));
    }
}
