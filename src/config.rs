//! Run configuration
//!
//! Every tuning value of a run lives here. Defaults match the values the
//! pullers were tuned with; a YAML file can override any subset, and the
//! command line overrides the file.

use crate::error::{Error, Result};
use crate::grid::{GridEndpoints, DEFAULT_CENTRAL_DATA_URL, DEFAULT_SERIES_STATE_URL};
use crate::http::{HttpClientConfig, PacerConfig};
use crate::market::DEFAULT_MARKET_URL;
use crate::pagination::WalkConfig;
use crate::retry::RetryPolicy;
use crate::types::{DetailLevel, Game, MarketMode, OptionStringExt, SelectionPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

// ============================================================================
// Top-Level Run Config
// ============================================================================

/// Complete run configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub grid: GridSettings,
    pub market: MarketSettings,
    pub http: HttpSettings,
    /// Backoff for rate limits, timeouts and transient sink errors
    pub retry: RetryPolicy,
    pub output: OutputSettings,
    pub database: DatabaseSettings,
}

impl RunConfig {
    /// Load and validate a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                Error::Io(e)
            }
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: RunConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.grid.num_series == 0 {
            return Err(Error::invalid_value("grid.num_series", "must be at least 1"));
        }
        if self.grid.max_series_to_check == 0 {
            return Err(Error::invalid_value("grid.max_series_to_check", "must be at least 1"));
        }
        if !(1..=50).contains(&self.grid.page_size) {
            return Err(Error::invalid_value("grid.page_size", "must be between 1 and 50"));
        }
        if self.grid.api_key_env.trim().is_empty() {
            return Err(Error::invalid_value("grid.api_key_env", "cannot be empty"));
        }
        if self.http.timeout_seconds == 0 {
            return Err(Error::invalid_value("http.timeout_seconds", "must be at least 1"));
        }
        if let Some(rate) = self.http.requests_per_second {
            if !rate.is_finite() || rate <= 0.0 {
                return Err(Error::invalid_value("http.requests_per_second", "must be positive"));
            }
        }
        for (field, value) in [
            ("grid.central_data_url", &self.grid.central_data_url),
            ("grid.series_state_url", &self.grid.series_state_url),
            ("market.base_url", &self.market.base_url),
        ] {
            let parsed = Url::parse(value)?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(Error::invalid_value(field, format!("'{value}' is not an http(s) URL")));
            }
        }
        if self.retry.max_delay < self.retry.base_delay {
            return Err(Error::invalid_value("retry.max_delay", "must not be below retry.base_delay"));
        }
        Ok(())
    }

    /// Walker settings derived from the GRID section and the retry policy
    pub fn walk_config(&self) -> WalkConfig {
        WalkConfig::new(self.grid.mode, self.grid.num_series)
            .with_search_budget(self.grid.max_series_to_check)
            .with_page_size(self.grid.page_size)
            .with_retry(self.retry.clone())
            .with_excluded_tournaments(self.grid.excluded_tournaments.clone())
    }
}

// ============================================================================
// GRID
// ============================================================================

/// Settings for the esports series source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    pub central_data_url: String,
    pub series_state_url: String,
    pub game: Game,
    pub mode: SelectionPolicy,
    /// Series to collect
    pub num_series: usize,
    /// Search budget for smart mode
    pub max_series_to_check: u64,
    pub page_size: u32,
    pub detail: DetailLevel,
    /// Tournament name fragments that are never accepted
    pub excluded_tournaments: Vec<String>,
    /// Environment variable holding the API key
    pub api_key_env: String,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            central_data_url: DEFAULT_CENTRAL_DATA_URL.to_string(),
            series_state_url: DEFAULT_SERIES_STATE_URL.to_string(),
            game: Game::Dota2,
            mode: SelectionPolicy::Smart,
            num_series: 50,
            max_series_to_check: 2000,
            page_size: 50,
            detail: DetailLevel::Full,
            excluded_tournaments: vec!["GRID-TEST".to_string()],
            api_key_env: "GRID_DATA_API_KEY".to_string(),
        }
    }
}

impl GridSettings {
    pub fn endpoints(&self) -> GridEndpoints {
        GridEndpoints {
            central_data: self.central_data_url.clone(),
            series_state: self.series_state_url.clone(),
        }
    }

    /// Read the API key from the configured environment variable
    pub fn api_key(&self) -> Result<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .none_if_empty()
            .ok_or_else(|| Error::missing_field(self.api_key_env.clone()))
    }
}

// ============================================================================
// Market
// ============================================================================

/// Settings for the market data source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketSettings {
    pub base_url: String,
    pub mode: MarketMode,
    /// Region key for `specific` and `all`
    pub region: String,
    pub type_ids: Vec<u64>,
    /// Pause between regions in multi-region pulls
    pub region_delay_seconds: u64,
}

impl Default for MarketSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_MARKET_URL.to_string(),
            mode: MarketMode::AllA4eRegions,
            region: "forge".to_string(),
            // PLEX and the base minerals
            type_ids: vec![44992, 34, 35, 36, 37, 38, 39, 40],
            region_delay_seconds: 5,
        }
    }
}

// ============================================================================
// HTTP
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    /// Per-attempt timeout
    pub timeout_seconds: u64,
    /// Request pacing; `None` disables it
    pub requests_per_second: Option<f64>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: 10,
            requests_per_second: Some(10.0),
        }
    }
}

impl HttpSettings {
    pub fn client_config(&self) -> HttpClientConfig {
        let builder = HttpClientConfig::builder().timeout(Duration::from_secs(self.timeout_seconds));
        match self.requests_per_second {
            Some(rate) => builder.pacing(PacerConfig::per_second(rate)),
            None => builder.no_pacing(),
        }
        .build()
    }
}

// ============================================================================
// Output and Database
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub directory: PathBuf,
    /// Append `_YYYYmmdd_HHMMSS` to file names
    pub timestamped: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("grid_data_pulled"),
            timestamped: true,
        }
    }
}

/// Where loads go. Without a path or `postgres`, an in-memory database is used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Local DuckDB database file
    pub path: Option<PathBuf>,
    /// Attach PostgreSQL using the `PG*` environment variables
    pub postgres: bool,
    /// Schema for created tables
    pub schema: Option<String>,
}
