//! Market data source
//!
//! Pulls per-region item statistics from the Mokaam API and flattens them
//! into the 25-column market table.

mod client;
mod regions;
mod table;

pub use client::{
    in_update_window, MarketClient, MarketItem, MarketPull, MarketRequest, DEFAULT_MARKET_URL,
};
pub use regions::{a4e_regions, find_region, Region, ALL_A4E_FILE_NAME, REGIONS};
pub use table::{market_table, MARKET_COLUMNS};
