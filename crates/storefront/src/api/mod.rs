//! Typed services over the authenticated gateway.
//!
//! # Services
//!
//! - [`AuthService`] - login, registration, logout
//! - [`ProductService`] - public catalog
//! - [`CartService`] / [`CartView`] - cart reads, writes and optimistic state
//! - [`CheckoutService`] - simulated payment followed by order placement
//! - [`OrderService`] - order history
//! - [`AdminService`] - inventory and reporting for store admins
//!
//! Each service is a thin wrapper: it builds [`RequestOptions`], sends them
//! through the [`Gateway`], and decodes the response. A 401 on any of them
//! surfaces as [`ApiError::SessionExpired`].

mod admin;
mod auth;
mod cart;
mod checkout;
mod orders;
mod products;

pub use admin::{AdminService, InventoryDashboard};
pub use auth::AuthService;
pub use cart::{CartService, CartUpdate, CartView};
pub use checkout::{CardDetails, CheckoutService};
pub use orders::OrderService;
pub use products::ProductService;

use serde::de::DeserializeOwned;

use crate::error::ApiError;
use crate::gateway::{Gateway, GatewayResponse, RequestOptions};

/// Longest body excerpt written to the log on decode failures.
const LOG_BODY_CHARS: usize = 500;

/// Send through the gateway and decode a successful JSON body.
async fn fetch_json<T: DeserializeOwned>(
    gateway: &Gateway,
    endpoint: &str,
    options: RequestOptions,
) -> Result<T, ApiError> {
    let response = gateway.send(endpoint, options).await?.into_authorized()?;
    decode(response).await
}

/// Send through the gateway and require a success status, ignoring the body.
async fn fetch_ok(
    gateway: &Gateway,
    endpoint: &str,
    options: RequestOptions,
) -> Result<(), ApiError> {
    let outcome = gateway.send(endpoint, options).await?;
    ensure_success(outcome).await
}

async fn ensure_success(outcome: GatewayResponse) -> Result<(), ApiError> {
    let response = outcome.into_authorized()?;
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await?;
    Err(ApiError::rejected(status, &body))
}

/// Decode a response, turning non-success statuses into `ApiError::Rejected`.
async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        tracing::warn!(
            status = %status,
            body = %body.chars().take(LOG_BODY_CHARS).collect::<String>(),
            "API returned non-success status"
        );
        return Err(ApiError::rejected(status, &body));
    }

    serde_json::from_str(&body).map_err(|e| {
        tracing::error!(
            error = %e,
            body = %body.chars().take(LOG_BODY_CHARS).collect::<String>(),
            "Failed to parse API response"
        );
        ApiError::Json(e)
    })
}
