//! Cart API client.

use kroger_cart_auth::Credential;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::CartError;
use crate::presets::Presets;

/// Production API base URL.
pub const KROGER_API_BASE: &str = "https://api.kroger.com";

#[derive(Debug, Serialize)]
struct CartItem<'a> {
    upc: &'a str,
    quantity: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AddToCartRequest<'a> {
    items: Vec<CartItem<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    location_id: Option<&'a str>,
}

/// Authenticated client for the cart endpoint.
#[derive(Debug, Clone)]
pub struct CartClient {
    client: Client,
    base_url: String,
    credential: Credential,
    presets: Presets,
    location_id: Option<String>,
}

impl CartClient {
    /// Create a client using `credential` for every request.
    pub fn new(credential: Credential, presets: Presets) -> Self {
        Self {
            client: Client::new(),
            base_url: KROGER_API_BASE.to_string(),
            credential,
            presets,
            location_id: None,
        }
    }

    /// Set the store location sent with cart requests.
    #[must_use]
    pub fn with_location(mut self, location_id: Option<String>) -> Self {
        self.location_id = location_id;
        self
    }

    /// Point the client at a different API host.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Create with a custom reqwest client.
    #[must_use]
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Add `quantity` of the preset `item` to the user's cart. No retry.
    pub async fn add_to_cart(&self, item: &str, quantity: u32) -> Result<(), CartError> {
        let upc = self
            .presets
            .product_id(item)
            .ok_or_else(|| CartError::UnknownItem(item.to_string()))?;

        let body = AddToCartRequest {
            items: vec![CartItem { upc, quantity }],
            location_id: self.location_id.as_deref(),
        };

        let url = format!("{}/v1/cart/add", self.base_url);
        debug!(%url, upc, quantity, "Adding item to cart");

        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, self.credential.authorization_header())
            .header(ACCEPT, "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CartError::Status { status, body });
        }

        info!(item, quantity, "Added to cart");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credential() -> Credential {
        Credential {
            access_token: "tok".to_string(),
            token_type: "Bearer".to_string(),
            refresh_token: None,
            expiry: "2030-01-01T00:00:00Z".parse().unwrap(),
        }
    }

    fn client(server: &MockServer, location: Option<&str>) -> CartClient {
        let presets: Presets = [("milk", "0001111041700")].into_iter().collect();
        CartClient::new(credential(), presets)
            .with_base_url(server.uri())
            .with_location(location.map(str::to_string))
            .with_http_client(Client::builder().no_proxy().build().unwrap())
    }

    #[tokio::test]
    async fn test_add_to_cart_sends_bearer_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/cart/add"))
            .and(header("authorization", "Bearer tok"))
            .and(body_json(serde_json::json!({
                "items": [{"upc": "0001111041700", "quantity": 2}],
                "locationId": "01400943",
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client(&server, Some("01400943"))
            .add_to_cart("milk", 2)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_location_omitted_when_unset() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/cart/add"))
            .and(body_json(serde_json::json!({
                "items": [{"upc": "0001111041700", "quantity": 1}],
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        client(&server, None).add_to_cart("milk", 1).await.unwrap();
    }

    #[tokio::test]
    async fn test_unknown_item_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(204))
            .expect(0)
            .mount(&server)
            .await;

        let err = client(&server, None).add_to_cart("bread", 1).await.unwrap_err();
        assert!(matches!(err, CartError::UnknownItem(ref item) if item == "bread"));
    }

    #[tokio::test]
    async fn test_error_status_is_reported_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/cart/add"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid token"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server, None).add_to_cart("milk", 1).await.unwrap_err();
        match err {
            CartError::Status { status, body } => {
                assert_eq!(status.as_u16(), 401);
                assert_eq!(body, "invalid token");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
