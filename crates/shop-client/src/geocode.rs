//! Geocoding API client
//!
//! Forward search (free text to candidate places) and reverse geocoding
//! (coordinate to place name). The [`GeocodeApi`] trait is the seam the
//! location search service consumes; tests install fakes behind it.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::config::ShopConfig;
use crate::types::{Coordinate, PlaceHit};
use networking::{with_retry, HttpClient, HttpClientConfig, NetworkError, RetryPolicy};

/// Errors from geocoding operations
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// Transport or server failure
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// The coordinate resolved to no known place
    #[error("No place found at {lat:.4},{lon:.4}")]
    NoResult {
        /// Queried latitude
        lat: f64,
        /// Queried longitude
        lon: f64,
    },
}

/// Result type for geocoding operations
pub type Result<T> = std::result::Result<T, GeocodeError>;

/// Geocoding operations the location search service depends on
#[async_trait]
pub trait GeocodeApi: Send + Sync {
    /// Forward-geocode free text into candidate places
    async fn search(&self, text: &str) -> Result<Vec<PlaceHit>>;

    /// Resolve a coordinate to a human-readable place name
    async fn reverse(&self, coord: Coordinate) -> Result<String>;
}

/// REST client for the geocoding API
pub struct GeocodeClient {
    http: HttpClient,
    config: ShopConfig,
    retry: RetryPolicy,
}

impl GeocodeClient {
    /// Create a client from the given configuration
    pub fn new(config: ShopConfig) -> Result<Self> {
        let http = HttpClient::new(
            HttpClientConfig::new()
                .with_timeout(config.timeout)
                .with_user_agent(config.user_agent.clone()),
        )
        .map_err(GeocodeError::Network)?;

        Ok(Self {
            http,
            config,
            retry: RetryPolicy::default(),
        })
    }

    /// Override the retry policy
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<PlaceHit>,
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    name: String,
}

#[async_trait]
impl GeocodeApi for GeocodeClient {
    async fn search(&self, text: &str) -> Result<Vec<PlaceHit>> {
        let url = self.config.geocode_endpoint("search");
        let params = [("q", text)];
        let response: SearchResponse = with_retry(&self.retry, NetworkError::is_transient, || {
            self.http.get_json_query(&url, &params)
        })
        .await?;

        tracing::debug!("geocode search \"{}\" returned {} hits", text, response.results.len());
        Ok(response.results)
    }

    async fn reverse(&self, coord: Coordinate) -> Result<String> {
        let url = self.config.geocode_endpoint("reverse");
        let lat = format!("{}", coord.lat);
        let lon = format!("{}", coord.lon);
        let params = [("lat", lat.as_str()), ("lon", lon.as_str())];
        let outcome = with_retry(&self.retry, NetworkError::is_transient, || {
            self.http
                .get_json_query::<ReverseResponse>(&url, &params)
        })
        .await;

        match outcome {
            Ok(response) => Ok(response.name),
            Err(NetworkError::Status { status: 404, .. }) => Err(GeocodeError::NoResult {
                lat: coord.lat,
                lon: coord.lon,
            }),
            Err(other) => Err(other.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(server: &MockServer) -> GeocodeClient {
        GeocodeClient::new(ShopConfig::default().with_geocode_url(server.uri()))
            .unwrap()
            .with_retry_policy(
                RetryPolicy::new()
                    .with_initial_interval(Duration::from_millis(5))
                    .with_max_elapsed(Duration::from_millis(200)),
            )
    }

    #[tokio::test]
    async fn test_search() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "sudirman"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [
                    {"name": "Jl. Jenderal Sudirman, Pekanbaru", "coord": {"lat": 0.5071, "lon": 101.4478}}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let hits = test_client(&server).search("sudirman").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Jl. Jenderal Sudirman, Pekanbaru");
    }

    #[tokio::test]
    async fn test_reverse() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/reverse"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "Pekanbaru, Riau"
            })))
            .mount(&server)
            .await;

        let name = test_client(&server)
            .reverse(Coordinate::new(0.5071, 101.4478))
            .await
            .unwrap();
        assert_eq!(name, "Pekanbaru, Riau");
    }

    #[tokio::test]
    async fn test_reverse_no_result() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/reverse"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = test_client(&server)
            .reverse(Coordinate::new(0.0, 0.0))
            .await
            .unwrap_err();
        assert!(matches!(err, GeocodeError::NoResult { .. }));
    }

    #[tokio::test]
    async fn test_search_retries_transient_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(502))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"results": []})),
            )
            .mount(&server)
            .await;

        let hits = test_client(&server).search("anything").await.unwrap();
        assert!(hits.is_empty());
    }
}
