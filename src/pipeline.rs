//! The aggregation pipeline: raw rows in, ranked report out.
//!
//! `build_report` is a pure function of its input readings plus realness-gate
//! lookups. It runs five stages: normalize, gate, two-stage reduce (worst
//! reading per city, then worst city per country), enrich, sort. The final
//! report is rebuilt from scratch on every invocation; `Pipeline` wraps it
//! with fetching and the long-TTL report cache.

use crate::api::{PolluClient, RealnessGate, WikiClient};
use crate::cache::Cache;
use crate::config::{AppConfig, NO_DESCRIPTION};
use crate::error::Result;
use crate::models::{
    CityDescriptor, CountryWorst, NormalizedReading, RawReading, Report, ReportEntry,
};
use crate::validator;
use chrono::Utc;
use std::collections::HashMap;
use tracing::{debug, info};

const REPORT_CACHE_KEY: &str = "pollu_api:daily_report";

/// Resolves the display form of an upstream country string: a known code
/// maps through the injected name table, anything else is tidied free text.
/// Kept separate from the aggregation stages so the locale step is swappable.
fn display_country(raw: &str, names: &HashMap<String, String>) -> Option<String> {
    let code = raw.trim().to_uppercase();
    if let Some(name) = names.get(&code) {
        return Some(name.clone());
    }
    validator::tidy_country(raw)
}

/// Builds the ranked worst-city-per-country report from raw readings.
///
/// Gate lookups are memoized per distinct city name, so repeated cities
/// across countries cost a single lookup.
pub async fn build_report<G: RealnessGate>(
    readings: &[RawReading],
    gate: &G,
    country_names: &HashMap<String, String>,
) -> Vec<ReportEntry> {
    // Stage 1: normalize country and city, drop anything that fails the
    // syntactic gate.
    let normalized: Vec<NormalizedReading> = readings
        .iter()
        .filter_map(|r| {
            if !r.metric.is_finite() || r.metric < 0.0 {
                return None;
            }
            let country = display_country(&r.country, country_names)?;
            let city = validator::normalize(&r.city)?;
            if !validator::valid_city_name_syntax(&city) {
                return None;
            }
            debug!("Normalized {} / {} -> {:.2}", country, city, r.metric);
            Some(NormalizedReading {
                country,
                city,
                metric: r.metric,
            })
        })
        .collect();

    // Stage 2: realness gate, one lookup per distinct city name.
    let mut descriptors: HashMap<String, Option<CityDescriptor>> = HashMap::new();
    for reading in &normalized {
        if !descriptors.contains_key(&reading.city) {
            let descriptor = gate.classify(&reading.city).await;
            descriptors.insert(reading.city.clone(), descriptor);
        }
    }
    let gated: Vec<&NormalizedReading> = normalized
        .iter()
        .filter(|r| {
            matches!(
                descriptors.get(&r.city),
                Some(Some(d)) if d.is_cityish
            )
        })
        .collect();

    // Stage 3: worst reading per (country, city), then worst city per
    // country. Ties keep the first reading encountered.
    let per_city = reduce_max(gated.iter().map(|r| {
        (
            (r.country.clone(), r.city.clone()),
            CountryWorst {
                country: r.country.clone(),
                city: r.city.clone(),
                metric: r.metric,
            },
        )
    }));
    let per_country = reduce_max(per_city.into_iter().map(|w| (w.country.clone(), w)));

    // Stages 4 + 5: enrich with a description and sort by pollution,
    // descending. The stable sort keeps insertion order on ties.
    let mut report: Vec<ReportEntry> = per_country
        .into_iter()
        .map(|worst| {
            let description = descriptors
                .get(&worst.city)
                .and_then(|d| d.as_ref())
                .and_then(|d| d.extract.clone().or_else(|| d.description.clone()))
                .unwrap_or_else(|| NO_DESCRIPTION.to_string());
            ReportEntry {
                country: worst.country,
                city: worst.city,
                pollution: (worst.metric * 100.0).round() / 100.0,
                description,
            }
        })
        .collect();
    report.sort_by(|a, b| b.pollution.total_cmp(&a.pollution));
    report
}

/// Keeps, per key, the value with the strictly greatest metric, preserving
/// first-encounter order of keys (and the first value on metric ties).
fn reduce_max<K, I>(items: I) -> Vec<CountryWorst>
where
    K: std::hash::Hash + Eq,
    I: Iterator<Item = (K, CountryWorst)>,
{
    let mut order: Vec<CountryWorst> = Vec::new();
    let mut index: HashMap<K, usize> = HashMap::new();
    for (key, value) in items {
        match index.get(&key) {
            Some(&i) => {
                if value.metric > order[i].metric {
                    order[i] = value;
                }
            },
            None => {
                index.insert(key, order.len());
                order.push(value);
            },
        }
    }
    order
}

/// Fetch, aggregate and cache: the full refresh cycle plus the read path the
/// report endpoint consumes.
pub struct Pipeline {
    client: PolluClient,
    gate: WikiClient,
    cache: Cache,
    config: AppConfig,
}

impl Pipeline {
    pub fn new(cache: Cache, config: AppConfig) -> Result<Self> {
        let client = PolluClient::new(cache.clone(), &config)?;
        let gate = WikiClient::new(cache.clone(), &config)?;
        Ok(Self {
            client,
            gate,
            cache,
            config,
        })
    }

    /// Runs a full fetch cycle and overwrites the cached report.
    /// Last-write-wins between racing refreshers is acceptable: the
    /// computation is deterministic for a given upstream snapshot.
    ///
    /// # Errors
    ///
    /// Only `AppError::Auth` (credential acquisition is the one fatal
    /// failure); everything else degrades to a smaller report.
    pub async fn refresh_report(&self) -> Result<Report> {
        let readings = self.client.fetch_all(&self.config.countries).await?;
        info!("Aggregating {} raw readings", readings.len());

        let data = build_report(&readings, &self.gate, &self.config.country_names).await;
        let report = Report {
            generated_at: Utc::now(),
            count: data.len(),
            data,
        };

        self.cache
            .write_json(REPORT_CACHE_KEY, &report, self.config.report_ttl);
        info!("Cached report with {} entries", report.count);
        Ok(report)
    }

    /// Reads the current cached report without recomputing anything.
    pub fn cached_report(&self) -> Option<Report> {
        self.cache.read_json(REPORT_CACHE_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Canned gate: accepts the configured names, rejects everything else,
    /// and records every lookup it serves.
    struct StubGate {
        cities: HashSet<String>,
        calls: Mutex<Vec<String>>,
    }

    impl StubGate {
        fn accepting(cities: &[&str]) -> Self {
            Self {
                cities: cities.iter().map(|c| c.to_string()).collect(),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl RealnessGate for StubGate {
        async fn classify(&self, name: &str) -> Option<CityDescriptor> {
            self.calls.lock().unwrap().push(name.to_string());
            if self.cities.contains(name) {
                Some(CityDescriptor {
                    title: name.to_string(),
                    description: Some(format!("{} is a city", name)),
                    extract: Some(format!("{} is a large city.", name)),
                    is_cityish: true,
                })
            } else {
                None
            }
        }
    }

    fn reading(country: &str, city: &str, metric: f64) -> RawReading {
        RawReading {
            country: country.to_string(),
            city: city.to_string(),
            metric,
        }
    }

    #[tokio::test]
    async fn keeps_one_entry_per_country_and_drops_non_cities() {
        let readings = vec![
            reading("India", "Delhi", 190.2),
            reading("India", "NotACityCorp", 999.0),
            reading("France", "Paris", 80.1),
        ];
        let gate = StubGate::accepting(&["Delhi", "Paris"]);
        let report = build_report(&readings, &gate, &HashMap::new()).await;

        assert_eq!(report.len(), 2);
        let india = report.iter().find(|e| e.country == "India").unwrap();
        assert_eq!(india.city, "Delhi");
        assert!(report.iter().any(|e| e.country == "France"));
    }

    #[tokio::test]
    async fn sorts_by_pollution_descending() {
        let readings = vec![
            reading("France", "Paris", 80.1),
            reading("India", "Delhi", 190.2),
        ];
        let gate = StubGate::accepting(&["Delhi", "Paris"]);
        let report = build_report(&readings, &gate, &HashMap::new()).await;

        assert_eq!(report[0].city, "Delhi");
        assert_eq!(report[0].pollution, 190.2);
        assert_eq!(report[1].city, "Paris");
    }

    #[tokio::test]
    async fn keeps_worst_reading_per_city_and_worst_city_per_country() {
        let readings = vec![
            reading("PL", "Warsaw", 50.0),
            reading("PL", "Warsaw", 75.456),
            reading("PL", "Krakow", 60.0),
        ];
        let gate = StubGate::accepting(&["Warsaw", "Krakow"]);
        let names = crate::config::AppConfig::with_endpoints(
            String::new(),
            String::new(),
            String::new(),
            String::new(),
        )
        .country_names;
        let report = build_report(&readings, &gate, &names).await;

        assert_eq!(report.len(), 1);
        assert_eq!(report[0].country, "Poland");
        assert_eq!(report[0].city, "Warsaw");
        assert_eq!(report[0].pollution, 75.46);
    }

    #[tokio::test]
    async fn metric_ties_keep_first_city_encountered() {
        let readings = vec![
            reading("DE", "Berlin", 42.0),
            reading("DE", "Hamburg", 42.0),
        ];
        let gate = StubGate::accepting(&["Berlin", "Hamburg"]);
        let report = build_report(&readings, &gate, &HashMap::new()).await;

        assert_eq!(report.len(), 1);
        assert_eq!(report[0].city, "Berlin");
    }

    #[tokio::test]
    async fn gate_is_consulted_once_per_distinct_city() {
        let readings = vec![
            reading("FR", "Paris", 10.0),
            reading("FR", "Paris", 20.0),
            reading("US", "Paris", 5.0),
        ];
        let gate = StubGate::accepting(&["Paris"]);
        let _ = build_report(&readings, &gate, &HashMap::new()).await;

        assert_eq!(gate.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn readings_failing_syntax_are_dropped_silently() {
        let readings = vec![reading("FR", "$%^", 10.0), reading("FR", "7", 10.0)];
        let gate = StubGate::accepting(&[]);
        let report = build_report(&readings, &gate, &HashMap::new()).await;

        assert!(report.is_empty());
        assert!(gate.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn description_prefers_extract_with_placeholder_fallback() {
        struct NoTextGate;
        impl RealnessGate for NoTextGate {
            async fn classify(&self, name: &str) -> Option<CityDescriptor> {
                Some(CityDescriptor {
                    title: name.to_string(),
                    description: None,
                    extract: None,
                    is_cityish: true,
                })
            }
        }

        let readings = vec![reading("FR", "Paris", 10.0)];
        let report = build_report(&readings, &NoTextGate, &HashMap::new()).await;
        assert_eq!(report[0].description, NO_DESCRIPTION);

        let gate = StubGate::accepting(&["Paris"]);
        let report = build_report(&readings, &gate, &HashMap::new()).await;
        assert_eq!(report[0].description, "Paris is a large city.");
    }
}
