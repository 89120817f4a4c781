//! Encyclopedic summary lookup and the city realness heuristic.
//!
//! `WikiClient` queries a MediaWiki-style endpoint for an introductory
//! extract and short description, then classifies whether the title denotes
//! an inhabited place. Place classification is stable, so descriptors are
//! cached per title for a long TTL.

use crate::cache::Cache;
use crate::config::AppConfig;
use crate::models::CityDescriptor;
use reqwest::Client;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Terms that reject a title outright, whatever else the text says.
const NEGATIVE_TERMS: [&str; 11] = [
    "company",
    "film",
    "album",
    "band",
    "software",
    "character",
    "person",
    "tv",
    "series",
    "song",
    "video game",
];

/// Terms that accept a title once no negative term matched.
const POSITIVE_TERMS: [&str; 7] = [
    "city",
    "town",
    "capital",
    "metropolis",
    "municipality",
    "urban",
    "conurbation",
];

/// Classifies whether a name denotes a real inhabited place.
///
/// Abstracted as a trait so the aggregation pipeline can be exercised with a
/// canned gate in tests.
pub trait RealnessGate {
    /// `None` means the lookup itself failed or found no page; a descriptor
    /// with `is_cityish == false` means the page exists but is not a place.
    fn classify(&self, name: &str) -> impl Future<Output = Option<CityDescriptor>> + Send;
}

/// Heuristic over the lower-cased description and extract text: any negative
/// term rejects, then any positive term accepts, then a literal `" city "`
/// mention in the extract is the last resort.
pub fn cityish(description: &str, extract: &str) -> bool {
    let desc = description.to_lowercase();
    let ext = extract.to_lowercase();

    if NEGATIVE_TERMS.iter().any(|w| desc.contains(w) || ext.contains(w)) {
        return false;
    }
    if POSITIVE_TERMS.iter().any(|w| desc.contains(w) || ext.contains(w)) {
        return true;
    }

    // Some pages carry no helpful description string at all.
    ext.contains(" city ")
}

/// Client for the encyclopedic summary service.
pub struct WikiClient {
    http: Client,
    cache: Cache,
    base_url: String,
    descriptor_ttl: Duration,
}

impl WikiClient {
    pub fn new(cache: Cache, config: &AppConfig) -> crate::error::Result<Self> {
        let http = Client::builder().timeout(config.http_timeout).build()?;
        Ok(Self {
            http,
            cache,
            base_url: config.wiki_base.clone(),
            descriptor_ttl: config.report_ttl,
        })
    }

    /// Fetches the introductory extract and short description for `title`,
    /// following redirects, and classifies it. Transport or parse failures
    /// and missing pages all come back as `None`.
    async fn summary_for(&self, title: &str) -> Option<CityDescriptor> {
        if title.trim().is_empty() {
            return None;
        }

        let cache_key = format!("wiki:action_summary:{}", title.to_lowercase());
        if let Some(descriptor) = self.cache.read_json::<CityDescriptor>(&cache_key) {
            return Some(descriptor);
        }

        debug!("Fetching summary for {}", title);
        let response = self
            .http
            .get(&self.base_url)
            .query(&[
                ("action", "query"),
                ("prop", "extracts|description"),
                ("titles", title),
                ("exintro", "1"),
                ("explaintext", "1"),
                ("redirects", "1"),
                ("format", "json"),
            ])
            .send()
            .await
            .map_err(|e| warn!("Summary lookup error for {}: {}", title, e))
            .ok()?;

        if !response.status().is_success() {
            warn!("Summary lookup for {} -> {}", title, response.status());
            return None;
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| warn!("Summary lookup invalid body for {}: {}", title, e))
            .ok()?;

        let descriptor = descriptor_from_body(&body)?;
        debug!("Fetched summary for {} -> {}", title, descriptor.title);
        self.cache.write_json(&cache_key, &descriptor, self.descriptor_ttl);
        Some(descriptor)
    }
}

impl RealnessGate for WikiClient {
    async fn classify(&self, name: &str) -> Option<CityDescriptor> {
        self.summary_for(name).await
    }
}

/// Picks the best-matching page out of `query.pages` and builds a
/// descriptor. Pages flagged as missing carry neither extract nor
/// description and classify as non-cityish.
fn descriptor_from_body(body: &Value) -> Option<CityDescriptor> {
    let pages = body.get("query")?.get("pages")?.as_object()?;
    let page = pages.values().next()?;

    let title = page.get("title")?.as_str()?.to_string();
    let description = page
        .get("description")
        .and_then(Value::as_str)
        .map(str::to_string);
    let extract = page.get("extract").and_then(Value::as_str).map(str::to_string);

    let is_cityish = cityish(
        description.as_deref().unwrap_or(""),
        extract.as_deref().unwrap_or(""),
    );

    Some(CityDescriptor {
        title,
        description,
        extract,
        is_cityish,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn capital_description_is_cityish() {
        assert!(cityish("capital of France", ""));
    }

    #[test]
    fn film_rejects_despite_positive_terms() {
        assert!(!cityish("film set in a large city", "the capital of cinema"));
    }

    #[test]
    fn company_in_extract_rejects() {
        assert!(!cityish("", "a multinational company headquartered in Paris"));
    }

    #[test]
    fn neutral_text_falls_back_to_city_mention() {
        assert!(cityish("", "largest city in the region by population"));
        assert!(!cityish("", "a river in northern Europe"));
    }

    #[test]
    fn descriptor_parsed_from_query_pages() {
        let body = json!({
            "query": {
                "pages": {
                    "12345": {
                        "pageid": 12345,
                        "title": "Warsaw",
                        "description": "capital city of Poland",
                        "extract": "Warsaw is the capital and largest city of Poland."
                    }
                }
            }
        });
        let descriptor = descriptor_from_body(&body).expect("page present");
        assert_eq!(descriptor.title, "Warsaw");
        assert!(descriptor.is_cityish);
    }

    #[test]
    fn missing_pages_object_yields_none() {
        assert_eq!(descriptor_from_body(&json!({"batchcomplete": ""})), None);
    }
}
