//! HTTP client module
//!
//! Provides a paced HTTP client whose calls return classified outcomes.
//!
//! # Features
//!
//! - **Classification**: every attempt ends as success, rate-limited,
//!   transient or fatal
//! - **Pacing**: token bucket spacing between requests using governor
//! - **Secret hygiene**: header values never appear in `Debug` output

mod client;
mod rate_limit;

pub use client::{
    classify_status, FetchRequest, FetchResult, HttpClient, HttpClientConfig,
    HttpClientConfigBuilder, StatusClass,
};
pub use rate_limit::{Pacer, PacerConfig};
