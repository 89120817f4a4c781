//! Wire, domain and report types for the pollution pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// --- Pollution API response structs ---

/// Response body of `POST /auth/login`.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub refresh_token: String,
    /// Access-token lifetime in seconds; upstream may omit it.
    pub expires_in: Option<i64>,
}

/// Response body of `POST /auth/refresh`.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    pub expires_in: Option<i64>,
}

/// Pagination metadata on `GET /pollution`.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    /// Absent means a single page.
    pub total_pages: Option<u32>,
}

/// One row of the paginated pollution listing, pre-validation.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PollutionRow {
    pub name: Option<String>,
    pub country: Option<String>,
    pub country_code: Option<String>,
    pub pollution: Option<f64>,
}

/// Response structure for `GET /pollution`.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PollutionPage {
    pub results: Vec<PollutionRow>,
    pub meta: PageMeta,
}

// --- Domain types ---

/// A single upstream measurement tagged with its country code.
/// Ephemeral; produced per fetch cycle and discarded after aggregation.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RawReading {
    pub country: String,
    pub city: String,
    pub metric: f64,
}

/// A `RawReading` whose country and city passed normalization; both fields
/// are non-empty canonical strings.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedReading {
    pub country: String,
    pub city: String,
    pub metric: f64,
}

/// Realness-gate verdict for one city name, cached per lower-cased title.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CityDescriptor {
    pub title: String,
    pub description: Option<String>,
    pub extract: Option<String>,
    pub is_cityish: bool,
}

/// The single worst reading per country after the two-stage reduction.
#[derive(Debug, Clone, PartialEq)]
pub struct CountryWorst {
    pub country: String,
    pub city: String,
    pub metric: f64,
}

/// Final, user-facing report row. `pollution` is rounded to 2 decimals and
/// `description` always holds text (placeholder when nothing was found).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ReportEntry {
    pub country: String,
    pub city: String,
    pub pollution: f64,
    pub description: String,
}

/// The cached report document read by the presentation layer.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    pub count: usize,
    pub data: Vec<ReportEntry>,
}

// --- Auth session ---

/// Credential state persisted in the shared cache. Mutated only by the token
/// manager; its cache TTL (12 h) is independent of the access token's own
/// lifetime.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    /// Access-token expiry as epoch seconds.
    pub access_expires_at: i64,
}
