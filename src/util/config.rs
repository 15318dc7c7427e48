use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use serde_json::Error as SerdeError;
use tracing::{debug, info};

use crate::domain::{DEFAULT_MIN_PROFIT_PCT, DEFAULT_OPPORTUNITY_THRESHOLD_PCT};

const APP_QUALIFIER: &str = "com";
const APP_ORG: &str = "GoblinLedger";
const APP_NAME: &str = "GoblinLedger";
const CONFIG_FILENAME: &str = "config.json";

/// Where the data lives and how the analyses are tuned. Passed explicitly to
/// the loaders; nothing reads paths from the working directory implicitly.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: PathBuf,
    pub realm: String,
    pub items_file: Option<PathBuf>,
    pub recipes_file: Option<PathBuf>,
    pub vendor_items_file: Option<PathBuf>,
    pub market_dir: Option<PathBuf>,
    pub min_profit_pct: f64,
    pub opportunity_threshold_pct: f64,
    pub max_display: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            realm: "ambershire".to_string(),
            items_file: None,
            recipes_file: None,
            vendor_items_file: None,
            market_dir: None,
            min_profit_pct: DEFAULT_MIN_PROFIT_PCT,
            opportunity_threshold_pct: DEFAULT_OPPORTUNITY_THRESHOLD_PCT,
            max_display: 15,
        }
    }
}

impl Config {
    pub fn items_path(&self) -> PathBuf {
        self.items_file
            .clone()
            .unwrap_or_else(|| self.data_dir.join("items.json"))
    }

    pub fn recipes_path(&self) -> PathBuf {
        self.recipes_file
            .clone()
            .unwrap_or_else(|| self.data_dir.join("recipes.json"))
    }

    pub fn vendor_items_path(&self) -> PathBuf {
        self.vendor_items_file
            .clone()
            .unwrap_or_else(|| self.data_dir.join("vendor_items.json"))
    }

    /// Per-realm directory of snapshot CSVs.
    pub fn market_path(&self) -> PathBuf {
        self.market_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("market_data").join(&self.realm))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Serde {
        path: PathBuf,
        #[source]
        source: SerdeError,
    },
}

/// Default config location in the platform config directory.
pub fn default_config_file() -> Option<PathBuf> {
    ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
        .map(|dirs| dirs.config_dir().join(CONFIG_FILENAME))
}

pub fn load_config_file(path: &Path) -> Result<Config, ConfigError> {
    let data = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = serde_json::from_str(&data).map_err(|source| ConfigError::Serde {
        path: path.to_path_buf(),
        source,
    })?;
    info!(target: "config", "Loaded config from {}", path.display());
    Ok(config)
}

/// An explicit path must exist; the platform default is optional.
pub fn load_config(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    if let Some(path) = explicit {
        return load_config_file(path);
    }
    match default_config_file() {
        Some(path) if path.exists() => load_config_file(&path),
        _ => {
            debug!(target: "config", "No config file found, using defaults");
            Ok(Config::default())
        }
    }
}
