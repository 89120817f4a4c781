//! Application configuration, collected once at startup.
//!
//! Every tunable the pipeline depends on lives in `AppConfig`: base URLs,
//! credentials, the country set, cache TTLs and the rate budget. Components
//! receive the struct (or the fields they need) at construction time instead
//! of reading the environment themselves.

use crate::error::{AppError, Result};
use std::collections::HashMap;
use std::env;
use std::time::Duration;
use tracing::error;

/// Countries fetched every cycle, as upstream ISO 3166 alpha-2 codes.
pub const COUNTRIES: [&str; 4] = [
    "PL", // Poland
    "DE", // Germany
    "ES", // Spain
    "FR", // France
];

/// Placeholder used when neither an extract nor a description is available.
pub const NO_DESCRIPTION: &str = "No description available.";

/// Runtime configuration for the whole pipeline.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base URL of the pollution API.
    pub api_base: String,
    /// Username for `POST /auth/login`.
    pub username: String,
    /// Password for `POST /auth/login`.
    pub password: String,
    /// Base URL of the encyclopedic summary service.
    pub wiki_base: String,

    /// Country codes fetched per cycle.
    pub countries: Vec<String>,
    /// Display names for country codes; unknown codes fall back to the
    /// tidied upstream string. Swappable locale step, kept out of the
    /// aggregator itself.
    pub country_names: HashMap<String, String>,
    /// Rows requested per pollution page.
    pub page_size: u32,

    /// Per-request HTTP timeout.
    pub http_timeout: Duration,
    /// TTL for raw rows and per-country page caches.
    pub raw_ttl: Duration,
    /// TTL for the final report and for city descriptors.
    pub report_ttl: Duration,
    /// TTL for the persisted auth session.
    pub auth_ttl: Duration,
    /// TTL for the shared rate window entry.
    pub rate_window_ttl: Duration,

    /// Safety margin subtracted from token expiry to refresh proactively.
    pub token_skew_secs: i64,
    /// Maximum requests per rate window.
    pub rate_cap: usize,
    /// Length of the sliding rate window, in seconds.
    pub rate_window_secs: f64,
}

impl AppConfig {
    /// Loads configuration from the environment (`.env` honored via dotenv).
    ///
    /// # Errors
    ///
    /// Returns `AppError::Env` if any required variable is missing.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let api_base = require("POLLU_API_BASE")?;
        let username = require("POLLU_API_USERNAME")?;
        let password = require("POLLU_API_PASSWORD")?;
        let wiki_base = require("WIKI_API_BASE")?;

        Ok(Self::with_endpoints(api_base, username, password, wiki_base))
    }

    /// Builds a config with default constants around the given endpoints.
    pub fn with_endpoints(
        api_base: String,
        username: String,
        password: String,
        wiki_base: String,
    ) -> Self {
        Self {
            api_base,
            username,
            password,
            wiki_base,
            countries: COUNTRIES.iter().map(|c| c.to_string()).collect(),
            country_names: default_country_names(),
            page_size: 50,
            http_timeout: Duration::from_secs(10),
            raw_ttl: Duration::from_secs(600),
            report_ttl: Duration::from_secs(24 * 60 * 60),
            auth_ttl: Duration::from_secs(12 * 60 * 60),
            rate_window_ttl: Duration::from_secs(120),
            token_skew_secs: 30,
            rate_cap: 5,
            rate_window_secs: 60.0,
        }
    }
}

fn require(name: &str) -> Result<String> {
    env::var(name).map_err(|e| {
        error!("{} environment variable not set: {}", name, e);
        AppError::Env(e)
    })
}

fn default_country_names() -> HashMap<String, String> {
    [
        ("PL", "Poland"),
        ("DE", "Germany"),
        ("ES", "Spain"),
        ("FR", "France"),
    ]
    .iter()
    .map(|(code, name)| (code.to_string(), name.to_string()))
    .collect()
}
