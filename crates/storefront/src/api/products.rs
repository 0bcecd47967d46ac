//! Public product catalog.

use lm_store_core::{Product, ProductId};
use tracing::instrument;

use super::fetch_json;
use crate::error::ApiError;
use crate::gateway::{Gateway, RequestOptions};

/// Catalog reads. Always fetched fresh; nothing is cached client-side.
#[derive(Debug, Clone)]
pub struct ProductService {
    gateway: Gateway,
}

impl ProductService {
    pub(crate) const fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    /// All active products.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body is not a product list.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Product>, ApiError> {
        fetch_json(&self.gateway, "/products", RequestOptions::get()).await
    }

    /// One product by ID.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` with status 404 if the product does not exist.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get(&self, id: ProductId) -> Result<Product, ApiError> {
        fetch_json(&self.gateway, &format!("/products/{id}"), RequestOptions::get()).await
    }
}
