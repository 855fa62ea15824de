//! City catalog
//!
//! The catalog is the list of city names the chat assistant recognizes in
//! free text. It is loaded once from a [`CitySource`], published into a
//! [`CatalogHandle`] and never modified afterwards.

use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use tracing::{error, info};

use crate::SkydashError;
use crate::config::{CatalogConfig, CatalogSourceKind};

pub mod csv_file;
pub mod geodb;

pub use csv_file::CsvCitySource;
pub use geodb::GeoDbCitySource;

static EMPTY_CATALOG: CityCatalog = CityCatalog::empty();

/// Ordered list of known city names.
///
/// Names keep the display form of the source; matching is done on the
/// lower-cased form. Duplicates are kept and iteration follows source order.
#[derive(Debug, Clone, Default)]
pub struct CityCatalog {
    cities: Vec<CityName>,
}

#[derive(Debug, Clone)]
struct CityName {
    display: String,
    normalized: String,
}

impl CityCatalog {
    pub fn new(cities: Vec<String>) -> Self {
        let cities = cities
            .into_iter()
            .map(|display| CityName {
                normalized: display.to_lowercase(),
                display,
            })
            .collect();
        Self { cities }
    }

    pub const fn empty() -> Self {
        Self { cities: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    /// City display names in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.cities.iter().map(|city| city.display.as_str())
    }

    /// First city (in catalog order) whose lower-cased name equals one of
    /// `tokens`. Tokens are expected to be lower-cased already.
    pub fn find_in_tokens<'a>(&self, tokens: impl IntoIterator<Item = &'a str>) -> Option<&str> {
        let tokens: HashSet<&str> = tokens.into_iter().collect();
        if tokens.is_empty() {
            return None;
        }

        self.cities
            .iter()
            .find(|city| tokens.contains(city.normalized.as_str()))
            .map(|city| city.display.as_str())
    }
}

impl FromIterator<String> for CityCatalog {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Result of draining a [`CitySource`]: every city read before the source
/// finished, plus the error that stopped it early, if any.
#[derive(Debug, Default)]
pub struct CatalogLoad {
    pub cities: Vec<String>,
    pub error: Option<SkydashError>,
}

impl CatalogLoad {
    pub fn complete(cities: Vec<String>) -> Self {
        Self {
            cities,
            error: None,
        }
    }

    pub fn partial(cities: Vec<String>, error: SkydashError) -> Self {
        Self {
            cities,
            error: Some(error),
        }
    }
}

/// A tabular source of city names.
#[async_trait]
pub trait CitySource: Send + Sync {
    /// Short name used in log lines.
    fn name(&self) -> &'static str;

    async fn fetch_cities(&self) -> CatalogLoad;
}

/// Drain `source` into a catalog. Load errors are logged and the cities
/// read so far are kept.
pub async fn load_catalog(source: &dyn CitySource) -> CityCatalog {
    info!("Loading cities from {}", source.name());

    let CatalogLoad { cities, error } = source.fetch_cities().await;
    if let Some(e) = error {
        error!(
            "Error reading cities from {} ({} loaded before failure): {}",
            source.name(),
            cities.len(),
            e
        );
    }

    info!("Loaded {} cities from {}", cities.len(), source.name());
    CityCatalog::new(cities)
}

/// Shared, write-once slot for the catalog.
///
/// Until the loader publishes, readers see an empty catalog.
#[derive(Debug, Clone, Default)]
pub struct CatalogHandle {
    slot: Arc<OnceLock<CityCatalog>>,
}

impl CatalogHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle that is already populated, mostly for tests and embedding.
    pub fn loaded(catalog: CityCatalog) -> Self {
        let handle = Self::new();
        handle.publish(catalog);
        handle
    }

    /// Publish the catalog. Returns `false` if one was already published.
    pub fn publish(&self, catalog: CityCatalog) -> bool {
        self.slot.set(catalog).is_ok()
    }

    pub fn is_loaded(&self) -> bool {
        self.slot.get().is_some()
    }

    pub fn get(&self) -> &CityCatalog {
        self.slot.get().unwrap_or(&EMPTY_CATALOG)
    }
}

/// Build the city source selected in the configuration.
pub fn source_from_config(config: &CatalogConfig) -> crate::Result<Box<dyn CitySource>> {
    let source: Box<dyn CitySource> = match config.source {
        CatalogSourceKind::Csv => Box::new(CsvCitySource::new(&config.csv_path, &config.column)),
        CatalogSourceKind::GeoDb => Box::new(GeoDbCitySource::new(config)?),
    };
    Ok(source)
}

/// Load `source` in the background and publish the result into `handle`.
pub fn spawn_load(
    handle: CatalogHandle,
    source: Box<dyn CitySource>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let catalog = load_catalog(source.as_ref()).await;
        if !handle.publish(catalog) {
            tracing::warn!("City catalog was already published, discarding reload");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSource {
        cities: Vec<&'static str>,
        fail: bool,
    }

    #[async_trait]
    impl CitySource for FixedSource {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn fetch_cities(&self) -> CatalogLoad {
            let cities = self.cities.iter().map(|c| c.to_string()).collect();
            if self.fail {
                CatalogLoad::partial(cities, SkydashError::catalog_load("stream broke"))
            } else {
                CatalogLoad::complete(cities)
            }
        }
    }

    #[test]
    fn test_find_in_tokens_first_match_wins() {
        let catalog = CityCatalog::new(vec![
            "Springfield".to_string(),
            "Paris".to_string(),
            "paris".to_string(),
        ]);

        assert_eq!(catalog.find_in_tokens(["in", "paris"]), Some("Paris"));
        assert_eq!(catalog.find_in_tokens(["paris", "springfield"]), Some("Springfield"));
        assert_eq!(catalog.find_in_tokens(["london"]), None);
    }

    #[test]
    fn test_empty_catalog_never_matches() {
        let catalog = CityCatalog::empty();
        assert!(catalog.is_empty());
        assert_eq!(catalog.find_in_tokens(["paris"]), None);
    }

    #[test]
    fn test_iter_keeps_duplicates_and_order() {
        let catalog: CityCatalog = ["Rome", "Oslo", "Rome"].iter().map(|c| c.to_string()).collect();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.iter().collect::<Vec<_>>(), vec!["Rome", "Oslo", "Rome"]);
    }

    #[test]
    fn test_handle_is_empty_until_published() {
        let handle = CatalogHandle::new();
        assert!(!handle.is_loaded());
        assert!(handle.get().is_empty());

        assert!(handle.publish(CityCatalog::new(vec!["Oslo".to_string()])));
        assert!(handle.is_loaded());
        assert_eq!(handle.get().len(), 1);

        assert!(!handle.publish(CityCatalog::empty()));
        assert_eq!(handle.get().len(), 1);
    }

    #[tokio::test]
    async fn test_load_catalog_keeps_partial_results() {
        let source = FixedSource {
            cities: vec!["Lima", "Quito"],
            fail: true,
        };
        let catalog = load_catalog(&source).await;
        assert_eq!(catalog.iter().collect::<Vec<_>>(), vec!["Lima", "Quito"]);
    }

    #[test]
    fn test_source_from_config() {
        let mut config = CatalogConfig::default();
        assert_eq!(source_from_config(&config).unwrap().name(), "CSV");

        config.source = CatalogSourceKind::GeoDb;
        assert_eq!(source_from_config(&config).unwrap().name(), "GeoDB");
    }

    #[tokio::test]
    async fn test_spawn_load_publishes() {
        let handle = CatalogHandle::new();
        let source = FixedSource {
            cities: vec!["Nairobi"],
            fail: false,
        };

        spawn_load(handle.clone(), Box::new(source)).await.unwrap();

        assert!(handle.is_loaded());
        assert_eq!(handle.get().find_in_tokens(["nairobi"]), Some("Nairobi"));
    }
}
