use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use super::{CatalogLoad, CitySource};
use crate::SkydashError;
use crate::config::CatalogConfig;

/// GeoDB Cities API client, paging through `/cities` until the reported
/// total has been fetched.
pub struct GeoDbCitySource {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    page_size: u32,
}

#[derive(Debug, Deserialize)]
struct CitiesPage {
    data: Option<Vec<GeoDbCity>>,
    metadata: Option<PageMetadata>,
}

#[derive(Debug, Deserialize)]
struct GeoDbCity {
    city: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageMetadata {
    total_count: Option<u64>,
}

impl GeoDbCitySource {
    pub fn new(config: &CatalogConfig) -> crate::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.into()))
            .user_agent(concat!("skydash/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SkydashError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.geodb_base_url.trim_end_matches('/').to_string(),
            api_key: config.geodb_api_key.clone(),
            page_size: config.page_size,
        })
    }

    /// RapidAPI wants the upstream host echoed in `x-rapidapi-host`.
    fn rapidapi_host(&self) -> String {
        reqwest::Url::parse(&self.base_url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
            .unwrap_or_default()
    }

    async fn fetch_page(&self, offset: u64) -> crate::Result<CitiesPage> {
        let url = format!("{}/cities", self.base_url);
        debug!("Fetching GeoDB cities page at offset {}", offset);

        let response = self
            .client
            .get(&url)
            .query(&[("limit", u64::from(self.page_size)), ("offset", offset)])
            .header("x-rapidapi-key", self.api_key.as_deref().unwrap_or_default())
            .header("x-rapidapi-host", self.rapidapi_host())
            .send()
            .await
            .map_err(|e| SkydashError::catalog_load(format!("GeoDB request failed: {e}")))?;

        response
            .json::<CitiesPage>()
            .await
            .map_err(|e| SkydashError::catalog_load(format!("Failed to parse GeoDB response: {e}")))
    }
}

#[async_trait]
impl CitySource for GeoDbCitySource {
    fn name(&self) -> &'static str {
        "GeoDB"
    }

    async fn fetch_cities(&self) -> CatalogLoad {
        let mut cities = Vec::new();
        let mut total_count = 0;
        let mut offset = 0;

        loop {
            let page = match self.fetch_page(offset).await {
                Ok(page) => page,
                Err(e) => return CatalogLoad::partial(cities, e),
            };

            let Some(data) = page.data else {
                return CatalogLoad::partial(
                    cities,
                    SkydashError::catalog_load(format!(
                        "GeoDB page at offset {offset} carried no city data"
                    )),
                );
            };

            let fetched = data.len();
            cities.extend(data.into_iter().map(|city| city.city));
            if let Some(total) = page.metadata.and_then(|m| m.total_count) {
                total_count = total;
            }

            info!(
                "Fetched {} cities (offset: {}). Total fetched: {}",
                fetched,
                offset,
                cities.len()
            );

            offset += u64::from(self.page_size);
            if fetched == 0 || cities.len() as u64 >= total_count {
                break;
            }
        }

        CatalogLoad::complete(cities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn source_for(server: &MockServer, page_size: u32) -> GeoDbCitySource {
        let config = CatalogConfig {
            geodb_base_url: format!("{}/v1/geo", server.uri()),
            geodb_api_key: Some("rapid-key".to_string()),
            page_size,
            ..CatalogConfig::default()
        };
        GeoDbCitySource::new(&config).unwrap()
    }

    fn page(cities: &[&str], total: u64) -> serde_json::Value {
        serde_json::json!({
            "data": cities.iter().map(|c| serde_json::json!({ "city": c })).collect::<Vec<_>>(),
            "metadata": { "currentOffset": 0, "totalCount": total }
        })
    }

    #[tokio::test]
    async fn test_fetch_cities_pages_until_total() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/geo/cities"))
            .and(query_param("offset", "0"))
            .and(header("x-rapidapi-key", "rapid-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(&["Aachen", "Berlin"], 3)))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/geo/cities"))
            .and(query_param("offset", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(&["Cologne"], 3)))
            .expect(1)
            .mount(&server)
            .await;

        let load = source_for(&server, 2).fetch_cities().await;
        assert!(load.error.is_none());
        assert_eq!(load.cities, vec!["Aachen", "Berlin", "Cologne"]);
    }

    #[tokio::test]
    async fn test_fetch_cities_keeps_pages_before_failure() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/geo/cities"))
            .and(query_param("offset", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(&["Aachen", "Berlin"], 10)))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/geo/cities"))
            .and(query_param("offset", "2"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "message": "You have exceeded the rate limit per second for your plan"
            })))
            .mount(&server)
            .await;

        let load = source_for(&server, 2).fetch_cities().await;
        assert_eq!(load.cities, vec!["Aachen", "Berlin"]);
        assert!(matches!(load.error, Some(SkydashError::CatalogLoad { .. })));
    }

    #[tokio::test]
    async fn test_fetch_cities_honors_configured_timeout() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/geo/cities"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(page(&["Aachen"], 1))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let config = CatalogConfig {
            geodb_base_url: format!("{}/v1/geo", server.uri()),
            timeout_seconds: 1,
            ..CatalogConfig::default()
        };
        let load = GeoDbCitySource::new(&config).unwrap().fetch_cities().await;

        assert!(load.cities.is_empty());
        assert!(matches!(load.error, Some(SkydashError::CatalogLoad { .. })));
    }

    #[tokio::test]
    async fn test_fetch_cities_without_total_stops_after_first_page() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/geo/cities"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{ "city": "Graz" }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let load = source_for(&server, 100).fetch_cities().await;
        assert!(load.error.is_none());
        assert_eq!(load.cities, vec!["Graz"]);
    }
}
