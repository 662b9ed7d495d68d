//! Cart and order API client
//!
//! Consumes the cart endpoints the checkout flow needs: listing the user's
//! cart, deleting a line item, and creating an order from the selected
//! items. Transient failures are retried with backoff; order creation is
//! the exception since it is not idempotent.

use serde::Serialize;
use thiserror::Error;

use crate::config::ShopConfig;
use crate::types::{CartItem, OrderReceipt};
use networking::{with_retry, HttpClient, HttpClientConfig, NetworkError, RetryPolicy};

/// Errors from cart API operations
#[derive(Debug, Error)]
pub enum CartApiError {
    /// Transport or server failure
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// The referenced cart item does not exist on the server
    #[error("Cart item not found: {0}")]
    NotFound(u64),
}

/// Result type for cart API operations
pub type Result<T> = std::result::Result<T, CartApiError>;

/// Client for the cart/order API
pub struct CartApi {
    http: HttpClient,
    config: ShopConfig,
    retry: RetryPolicy,
}

impl CartApi {
    /// Create a client from the given configuration
    pub fn new(config: ShopConfig) -> Result<Self> {
        let http = HttpClient::new(
            HttpClientConfig::new()
                .with_timeout(config.timeout)
                .with_user_agent(config.user_agent.clone()),
        )?;

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

    /// List the user's cart items
    pub async fn list_cart(&self, user_id: u64) -> Result<Vec<CartItem>> {
        let url = self.config.cart_endpoint(&format!("carts/{user_id}/items"));
        let items = with_retry(&self.retry, NetworkError::is_transient, || {
            self.http.get_json::<Vec<CartItem>>(&url)
        })
        .await?;

        tracing::debug!("listed {} cart items for user {}", items.len(), user_id);
        Ok(items)
    }

    /// Delete one cart line item by id
    pub async fn delete_cart_item(&self, id: u64) -> Result<()> {
        let url = self.config.cart_endpoint(&format!("cart-items/{id}"));
        let outcome = with_retry(&self.retry, NetworkError::is_transient, || {
            self.http.delete(&url)
        })
        .await;

        match outcome {
            Err(NetworkError::Status { status: 404, .. }) => Err(CartApiError::NotFound(id)),
            Err(other) => Err(other.into()),
            Ok(()) => Ok(()),
        }
    }

    /// Create an order from the given cart items
    ///
    /// Not retried: a timeout may have committed the order server-side.
    pub async fn create_order(&self, user_id: u64, item_ids: &[u64]) -> Result<OrderReceipt> {
        let url = self.config.cart_endpoint("orders");
        let body = CreateOrderBody { user_id, item_ids };
        let receipt = self.http.post_json(&url, &body).await?;
        Ok(receipt)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateOrderBody<'a> {
    user_id: u64,
    item_ids: &'a [u64],
}
