//! Client configuration
//!
//! Service base URLs and transport settings are injected here rather than
//! read from per-screen constants, so every consumer shares one configured
//! client.

use std::time::Duration;

/// Configuration for the shop's REST collaborators
#[derive(Debug, Clone)]
pub struct ShopConfig {
    /// Base URL of the cart/order API
    pub base_url: String,
    /// Base URL of the geocoding API
    pub geocode_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// User agent sent with every request
    pub user_agent: String,
}

impl Default for ShopConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.pawcart.id".to_string(),
            geocode_url: "https://geocode.pawcart.id".to_string(),
            timeout: Duration::from_secs(30),
            user_agent: format!("Pawcart/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ShopConfig {
    /// Create a config pointed at the given cart API base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the geocoding API base URL
    pub fn with_geocode_url(mut self, url: impl Into<String>) -> Self {
        self.geocode_url = url.into();
        self
    }

    /// Set the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub(crate) fn cart_endpoint(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    pub(crate) fn geocode_endpoint(&self, path: &str) -> String {
        join_url(&self.geocode_url, path)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ShopConfig::default();
        assert_eq!(config.base_url, "https://api.pawcart.id");
        assert_eq!(config.geocode_url, "https://geocode.pawcart.id");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.user_agent.starts_with("Pawcart/"));
    }

    #[test]
    fn test_builder() {
        let config = ShopConfig::new("https://staging.pawcart.id")
            .with_geocode_url("https://geo.staging.pawcart.id")
            .with_timeout(Duration::from_secs(5))
            .with_user_agent("PawcartTest/0.0");

        assert_eq!(config.base_url, "https://staging.pawcart.id");
        assert_eq!(config.geocode_url, "https://geo.staging.pawcart.id");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.user_agent, "PawcartTest/0.0");
    }

    #[test]
    fn test_endpoint_join_handles_slashes() {
        let config = ShopConfig::new("https://api.pawcart.id/");
        assert_eq!(
            config.cart_endpoint("/carts/1/items"),
            "https://api.pawcart.id/carts/1/items"
        );
        assert_eq!(
            config.geocode_endpoint("search"),
            "https://geocode.pawcart.id/search"
        );
    }
}
