//! Mokaam market API client
//!
//! Responses are flat objects keyed by type id: `{ "34": { ...stats } }`.
//! Every request goes through the shared fetch classification and the
//! bounded exponential backoff.

use super::regions::{a4e_regions, find_region, Region, ALL_A4E_FILE_NAME};
use crate::error::{Error, Result};
use crate::http::{FetchRequest, HttpClient};
use crate::retry::{fetch_with_retry, RetryPolicy};
use crate::types::MarketMode;
use chrono::{DateTime, NaiveDate, Timelike, Utc};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_MARKET_URL: &str = "https://mokaam.dk/API/market";

/// One item's statistics in one region
#[derive(Debug, Clone, PartialEq)]
pub struct MarketItem {
    pub region_id: u64,
    pub region_name: String,
    pub typeid: String,
    pub stats: Map<String, Value>,
}

impl MarketItem {
    /// Whether `last_data` holds a date. Placeholder rows for unknown or
    /// empty items carry `Null`, `Itemid not found` or an error string.
    pub fn has_data(&self) -> bool {
        match self.stats.get("last_data") {
            Some(Value::String(s)) => s
                .trim()
                .get(..10)
                .is_some_and(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").is_ok()),
            _ => false,
        }
    }
}

/// Whether `now` falls in the daily API refresh, 11:55 to 12:15 UTC
pub fn in_update_window(now: DateTime<Utc>) -> bool {
    matches!((now.hour(), now.minute()), (11, 55..=59) | (12, 0..=15))
}

/// What to pull
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketRequest {
    pub mode: MarketMode,
    /// Region key, used by `specific` and `all`
    pub region: String,
    pub type_ids: Vec<u64>,
}

impl MarketRequest {
    /// Base name of the output file
    pub fn file_name(&self) -> Result<&'static str> {
        match self.mode {
            MarketMode::AllA4eRegions => Ok(ALL_A4E_FILE_NAME),
            MarketMode::Specific | MarketMode::All => Ok(self.region()?.file_name),
        }
    }

    fn region(&self) -> Result<&'static Region> {
        find_region(&self.region)
            .ok_or_else(|| Error::invalid_value("market.region", format!("unknown region '{}'", self.region)))
    }
}

/// Result of a pull across one or more regions
#[derive(Debug, Clone, Default)]
pub struct MarketPull {
    pub items: Vec<MarketItem>,
    /// Type id to item name, when names were fetched
    pub type_names: HashMap<String, String>,
    /// Regions that returned nothing because their fetch failed
    pub failed_regions: Vec<String>,
}

impl MarketPull {
    /// Items with a usable `last_data`; the rest are not loaded
    pub fn loadable(&self) -> impl Iterator<Item = &MarketItem> {
        self.items.iter().filter(|i| i.has_data())
    }
}

/// Client for the Mokaam market endpoints
#[derive(Debug)]
pub struct MarketClient {
    http: HttpClient,
    base_url: String,
    retry: RetryPolicy,
    region_delay: Duration,
    small_timeout: Duration,
    large_timeout: Duration,
}

impl MarketClient {
    pub fn new(http: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry: RetryPolicy::default(),
            region_delay: Duration::from_secs(5),
            small_timeout: Duration::from_secs(30),
            large_timeout: Duration::from_secs(60),
        }
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Pause between regions in multi-region pulls
    #[must_use]
    pub fn with_region_delay(mut self, delay: Duration) -> Self {
        self.region_delay = delay;
        self
    }

    /// Type id to item name
    pub async fn fetch_type_names(&self) -> Result<HashMap<String, String>> {
        let request = FetchRequest::get(format!("{}/type_ids", self.base_url)).timeout(self.small_timeout);
        let body = fetch_with_retry(&self.retry, "type_ids", || self.http.fetch(&request)).await?;

        let Value::Object(entries) = body else {
            return Err(Error::decode("type_ids response is not an object"));
        };
        let names: HashMap<String, String> = entries
            .into_iter()
            .filter_map(|(id, value)| {
                let name = match value {
                    Value::String(name) => name,
                    Value::Object(ref fields) => fields.get("name")?.as_str()?.to_string(),
                    _ => return None,
                };
                Some((id, name))
            })
            .collect();
        info!("Retrieved {} item type names", names.len());
        Ok(names)
    }

    /// Statistics for `type_ids` in `region`, or every item when `None`
    pub async fn fetch_region(&self, region: &Region, type_ids: Option<&[u64]>) -> Result<Vec<MarketItem>> {
        let request = match type_ids {
            Some(ids) => {
                let joined = ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(",");
                FetchRequest::get(format!("{}/items", self.base_url))
                    .query("regionid", region.id.to_string())
                    .query("typeid", joined)
                    .timeout(self.small_timeout)
            }
            None => FetchRequest::get(format!("{}/all", self.base_url))
                .query("regionid", region.id.to_string())
                .timeout(self.large_timeout),
        };
        debug!("Querying market data for {} ({})", region.name, region.id);

        let label = format!("market {}", region.key);
        let body = fetch_with_retry(&self.retry, &label, || self.http.fetch(&request)).await?;
        let items = items_from_body(region, body)?;
        info!("Retrieved {} items from {}", items.len(), region.name);
        Ok(items)
    }

    /// Run a pull. In multi-region mode a failed region is logged and
    /// skipped; the remaining regions still run.
    pub async fn pull(&self, request: &MarketRequest) -> Result<MarketPull> {
        if in_update_window(Utc::now()) {
            warn!("Pulling during the API update window (12:05 UTC), expect errors");
        }
        let mut pull = MarketPull::default();

        match request.mode {
            MarketMode::Specific => {
                if request.type_ids.is_empty() {
                    return Err(Error::invalid_value("market.type_ids", "specific mode needs type ids"));
                }
                let region = request.region()?;
                // Name lookups are only worth it for short lists
                if request.type_ids.len() <= 20 {
                    match self.fetch_type_names().await {
                        Ok(names) => pull.type_names = names,
                        Err(e) => warn!("Continuing without item names: {e}"),
                    }
                }
                pull.items = self.fetch_region(region, Some(&request.type_ids)).await?;
            }
            MarketMode::All => {
                let region = request.region()?;
                pull.items = self.fetch_region(region, None).await?;
            }
            MarketMode::AllA4eRegions => {
                let regions: Vec<&Region> = a4e_regions().collect();
                for (index, region) in regions.iter().enumerate() {
                    match self.fetch_region(region, None).await {
                        Ok(items) => pull.items.extend(items),
                        Err(e) => {
                            warn!("No items retrieved from {}: {e}", region.name);
                            pull.failed_regions.push(region.name.to_string());
                        }
                    }
                    if index + 1 < regions.len() && !self.region_delay.is_zero() {
                        debug!("Waiting {:?} before next region", self.region_delay);
                        tokio::time::sleep(self.region_delay).await;
                    }
                }
                if pull.items.is_empty() && !pull.failed_regions.is_empty() {
                    return Err(Error::fatal(format!(
                        "every region failed: {}",
                        pull.failed_regions.join(", ")
                    )));
                }
            }
        }

        let with_data = pull.loadable().count();
        info!("Market pull: {} items, {} with data", pull.items.len(), with_data);
        Ok(pull)
    }
}

fn items_from_body(region: &Region, body: Value) -> Result<Vec<MarketItem>> {
    let Value::Object(entries) = body else {
        return Err(Error::decode(format!("market response for {} is not an object", region.name)));
    };
    Ok(entries
        .into_iter()
        .filter_map(|(typeid, value)| match value {
            Value::Object(stats) => Some(MarketItem {
                region_id: region.id,
                region_name: region.name.to_string(),
                typeid,
                stats,
            }),
            _ => None,
        })
        .collect())
}
