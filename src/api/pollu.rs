//! Client for the pollution API: health probe plus authenticated, rate-limited,
//! paginated retrieval of raw pollution rows.
//!
//! Failure isolation contract: one bad page or country never aborts the run.
//! The only fatal condition is credential acquisition failure, which is
//! propagated as `AppError::Auth` since no further protected call can succeed.

use crate::api::{AuthTokenManager, RateLimiter};
use crate::cache::Cache;
use crate::config::AppConfig;
use crate::error::Result;
use crate::models::{PollutionPage, PollutionRow, RawReading};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, info, warn};

const ROWS_CACHE_KEY: &str = "pollu_api:pollution_rows_v2";

/// Fetches pollution rows for a fixed set of countries, page by page.
pub struct PolluClient {
    http: Client,
    cache: Cache,
    auth: AuthTokenManager,
    limiter: RateLimiter,
    api_base: String,
    page_size: u32,
    raw_ttl: Duration,
}

impl PolluClient {
    /// Creates a client (and its token manager / rate limiter) around the
    /// given shared cache.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Api` if the HTTP client cannot be constructed.
    pub fn new(cache: Cache, config: &AppConfig) -> Result<Self> {
        let http = Client::builder().timeout(config.http_timeout).build()?;
        let auth = AuthTokenManager::new(http.clone(), cache.clone(), config);
        let limiter = RateLimiter::new(cache.clone(), config);
        Ok(Self {
            http,
            cache,
            auth,
            limiter,
            api_base: config.api_base.clone(),
            page_size: config.page_size,
            raw_ttl: config.raw_ttl,
        })
    }

    /// Fetches every country, all pages, and maps rows into `RawReading`s.
    /// The combined result is cached for a short TTL so a retry within the
    /// same window avoids re-hitting the network.
    ///
    /// # Errors
    ///
    /// Only `AppError::Auth`; every other failure degrades to fewer rows.
    pub async fn fetch_all(&self, countries: &[String]) -> Result<Vec<RawReading>> {
        if let Some(rows) = self.cache.read_json::<Vec<RawReading>>(ROWS_CACHE_KEY) {
            debug!("Using {} cached pollution rows", rows.len());
            return Ok(rows);
        }

        let mut readings = Vec::new();
        for country in countries {
            let rows = self.fetch_country_rows(country).await?;
            readings.extend(rows.iter().filter_map(raw_reading_from_row));
        }

        self.cache.write_json(ROWS_CACHE_KEY, &readings, self.raw_ttl);
        Ok(readings)
    }

    /// Fetches all pages for one country, tagging each row with the country
    /// code. Cached independently per country. Unhealthy upstream or a bad
    /// page abandons the country for this cycle and yields what was gathered.
    async fn fetch_country_rows(&self, country: &str) -> Result<Vec<PollutionRow>> {
        let key = format!("pollu_api:country:{}:pages_v1", country);
        if let Some(rows) = self.cache.read_json::<Vec<PollutionRow>>(&key) {
            debug!("Using cached pages for {}", country);
            return Ok(rows);
        }

        if !self.health_check().await {
            warn!("Health check failed, skipping /pollution requests for {}", country);
            return Ok(Vec::new());
        }

        debug!("Fetching pollution pages for {}", country);
        let mut all = Vec::new();
        let mut page = 1u32;
        loop {
            let response = match self.get_pollution_page(country, page).await? {
                Some(body) => body,
                None => break, // abandon this country for the cycle
            };

            all.extend(response.results.into_iter().map(|mut row| {
                row.country_code = Some(country.to_string());
                row
            }));

            let total_pages = response.meta.total_pages.unwrap_or(1);
            debug!("Fetched page {}/{} for {}", page, total_pages, country);
            if page >= total_pages {
                break;
            }
            page += 1;
        }

        info!("Fetched {} pollution rows for {}", all.len(), country);
        self.cache.write_json(&key, &all, self.raw_ttl);
        Ok(all)
    }

    /// One protected page request, retried once after a token refresh if the
    /// first attempt comes back 401. `Ok(None)` means the page (and hence
    /// the country) should be abandoned for this cycle.
    async fn get_pollution_page(&self, country: &str, page: u32) -> Result<Option<PollutionPage>> {
        let session = self.auth.ensure_valid_token().await?;

        self.limiter.acquire_slot().await;
        let mut response = match self.authorized_get(&session.access_token, country, page).await {
            Ok(resp) => resp,
            Err(e) => {
                warn!("GET /pollution {} p{} transport error: {}", country, page, e);
                return Ok(None);
            },
        };

        if response.status() == StatusCode::UNAUTHORIZED {
            let session = self.auth.force_refresh().await?;
            self.limiter.acquire_slot().await;
            response = match self.authorized_get(&session.access_token, country, page).await {
                Ok(resp) => resp,
                Err(e) => {
                    warn!("GET /pollution {} p{} retry transport error: {}", country, page, e);
                    return Ok(None);
                },
            };
        }

        let status = response.status();
        if status != StatusCode::OK {
            warn!("GET /pollution {} p{} -> {}", country, page, status);
            return Ok(None);
        }

        match response.json::<PollutionPage>().await {
            Ok(body) => Ok(Some(body)),
            Err(e) => {
                warn!("GET /pollution {} p{} invalid body: {}", country, page, e);
                Ok(None)
            },
        }
    }

    async fn authorized_get(
        &self,
        token: &str,
        country: &str,
        page: u32,
    ) -> std::result::Result<reqwest::Response, reqwest::Error> {
        self.http
            .get(format!("{}/pollution", self.api_base))
            .bearer_auth(token)
            .query(&[
                ("country", country.to_string()),
                ("page", page.to_string()),
                ("limit", self.page_size.to_string()),
            ])
            .send()
            .await
    }

    /// Probes `GET /healthz`; anything but a 200 reads as unhealthy.
    async fn health_check(&self) -> bool {
        let url = format!("{}/healthz", self.api_base);
        match self.http.get(&url).send().await {
            Ok(resp) if resp.status() == StatusCode::OK => true,
            Ok(resp) => {
                warn!("GET /healthz -> {}", resp.status());
                false
            },
            Err(e) => {
                warn!("GET /healthz error: {}", e);
                false
            },
        }
    }
}

/// Maps one upstream row into a `RawReading`, dropping rows without a
/// country, name or pollution value.
fn raw_reading_from_row(row: &PollutionRow) -> Option<RawReading> {
    let country = row
        .country
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .or(row.country_code.as_deref())?
        .trim()
        .to_string();
    let city = row.name.as_deref()?.trim().to_string();
    let metric = row.pollution?;

    if country.is_empty() || city.is_empty() {
        return None;
    }

    Some(RawReading { country, city, metric })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: Option<&str>, country: Option<&str>, pollution: Option<f64>) -> PollutionRow {
        PollutionRow {
            name: name.map(str::to_string),
            country: country.map(str::to_string),
            country_code: Some("PL".to_string()),
            pollution,
        }
    }

    #[test]
    fn row_with_all_fields_maps_to_reading() {
        let reading = raw_reading_from_row(&row(Some(" Warsaw "), Some("Poland"), Some(12.5)));
        assert_eq!(
            reading,
            Some(RawReading {
                country: "Poland".to_string(),
                city: "Warsaw".to_string(),
                metric: 12.5,
            })
        );
    }

    #[test]
    fn blank_country_falls_back_to_tagged_code() {
        let reading = raw_reading_from_row(&row(Some("Warsaw"), Some("  "), Some(3.0)));
        assert_eq!(reading.unwrap().country, "PL");
    }

    #[test]
    fn missing_pollution_is_dropped() {
        assert_eq!(raw_reading_from_row(&row(Some("Warsaw"), Some("PL"), None)), None);
    }

    #[test]
    fn blank_name_is_dropped() {
        assert_eq!(raw_reading_from_row(&row(Some("   "), Some("PL"), Some(1.0))), None);
    }
}
