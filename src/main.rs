use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use goblin_ledger::{
    app::{App, Report},
    domain::PriceWindow,
    infra::MarketData,
    util::{config::load_config, version::banner},
};

/// Crafting costs and market swings from local auction-house snapshots.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// JSON config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Directory holding items.json, recipes.json and market_data/
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    /// Realm whose market history is read
    #[arg(long, global = true)]
    realm: Option<String>,
    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Cost tree for one recipe (id or name)
    Cost {
        recipe: String,
        /// current or 7d
        #[arg(long, default_value = "current")]
        window: PriceWindow,
        /// Print the breakdown tree as JSON
        #[arg(long)]
        json: bool,
    },
    /// Recipes whose ROI beats the threshold
    Crafts {
        #[arg(long)]
        min_profit: Option<f64>,
    },
    /// Every recipe grouped by profession
    Recipes,
    /// Items trading well away from their 3-day average
    Opportunities {
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// 30d/7d averages, trend and weekday flips per item
    Summary,
    /// Opportunities, crafts, recipes and summary together
    All,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to install log subscriber")?;
    tracing::info!("{}", banner());

    let mut config = load_config(args.config.as_deref())?;
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(realm) = args.realm {
        config.realm = realm;
    }

    let data = MarketData::load(&config).context("failed to load market data")?;
    let app = App::new(config, data);

    let report = match args.command {
        Command::Cost {
            recipe,
            window,
            json,
        } => Report::Cost {
            recipe_id: app
                .find_recipe(&recipe)
                .ok_or_else(|| anyhow!("no recipe named {recipe:?}"))?,
            window,
            json,
        },
        Command::Crafts { min_profit } => Report::Crafts {
            min_profit_pct: min_profit,
        },
        Command::Recipes => Report::Recipes,
        Command::Opportunities { threshold } => Report::Opportunities {
            threshold_pct: threshold,
        },
        Command::Summary => Report::Summary,
        Command::All => Report::All,
    };

    print!("{}", app.render(&report)?);
    Ok(())
}
