//! Admin inventory panel.
//!
//! The server enforces admin access on every endpoint here. A non-admin
//! credential gets a 403, which surfaces as `ApiError::Rejected` (see
//! [`ApiError::is_forbidden`]); the client-side role only decides whether to
//! offer these screens at all.

use lm_store_core::{AdminActivity, MessageResponse, NewProduct, Product, ProductId, UserSummary};
use tracing::instrument;

use super::{fetch_json, fetch_ok};
use crate::error::ApiError;
use crate::gateway::{Gateway, RequestOptions};

/// Headline numbers for the inventory screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryDashboard {
    pub user_count: usize,
    pub products: Vec<Product>,
}

impl InventoryDashboard {
    /// Products with no stock left.
    pub fn out_of_stock(&self) -> impl Iterator<Item = &Product> {
        self.products.iter().filter(|p| !p.in_stock())
    }
}

/// Store administration.
#[derive(Debug, Clone)]
pub struct AdminService {
    gateway: Gateway,
}

impl AdminService {
    pub(crate) const fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    /// Every registered account.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` with status 403 for non-admins.
    #[instrument(skip(self))]
    pub async fn users(&self) -> Result<Vec<UserSummary>, ApiError> {
        fetch_json(&self.gateway, "/admin/users", RequestOptions::get()).await
    }

    /// Recent orders across all users.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` with status 403 for non-admins.
    #[instrument(skip(self))]
    pub async fn activities(&self) -> Result<Vec<AdminActivity>, ApiError> {
        fetch_json(&self.gateway, "/admin/activities", RequestOptions::get()).await
    }

    /// Add a product to the catalog. Returns the server's confirmation.
    ///
    /// # Errors
    ///
    /// - `ApiError::Validation` if the name is blank or the price is not positive
    /// - `ApiError::Rejected` if the server refuses the product
    #[instrument(skip(self, product), fields(name = %product.name))]
    pub async fn add_product(&self, product: &NewProduct) -> Result<String, ApiError> {
        if product.name.trim().is_empty() {
            return Err(ApiError::Validation("Product name is required".to_string()));
        }
        if !product.price.is_positive() {
            return Err(ApiError::Validation(
                "Price must be greater than zero".to_string(),
            ));
        }

        let options = RequestOptions::post().json(product)?;
        let created: MessageResponse = fetch_json(&self.gateway, "/admin/products", options).await?;
        tracing::info!(message = %created.message, "Product added");
        Ok(created.message)
    }

    /// Archive a product. It disappears from the catalog but can be restored.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` if the server refuses.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn deactivate(&self, id: ProductId) -> Result<(), ApiError> {
        fetch_ok(
            &self.gateway,
            &format!("/admin/deactive/{id}"),
            RequestOptions::post(),
        )
        .await
    }

    /// Bring an archived product back into the catalog.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` if the server refuses.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn restore(&self, id: ProductId) -> Result<(), ApiError> {
        fetch_ok(
            &self.gateway,
            &format!("/admin/products/restore/{id}"),
            RequestOptions::post(),
        )
        .await
    }

    /// Set a product's stock level.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` if the server refuses.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn update_stock(&self, id: ProductId, stock: u32) -> Result<(), ApiError> {
        fetch_ok(
            &self.gateway,
            &format!("/admin/product/{id}/stock?stock={stock}"),
            RequestOptions::put(),
        )
        .await
    }

    /// Products that have been archived.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` with status 403 for non-admins.
    #[instrument(skip(self))]
    pub async fn archived(&self) -> Result<Vec<Product>, ApiError> {
        fetch_json(&self.gateway, "/admin/products/archived", RequestOptions::get()).await
    }

    /// User count plus the active catalog. The user listing goes first so a
    /// non-admin is turned away before the catalog is fetched.
    ///
    /// # Errors
    ///
    /// Returns the first failing request's error.
    #[instrument(skip(self))]
    pub async fn dashboard(&self) -> Result<InventoryDashboard, ApiError> {
        let users = self.users().await?;
        let products: Vec<Product> =
            fetch_json(&self.gateway, "/products", RequestOptions::get()).await?;

        Ok(InventoryDashboard {
            user_count: users.len(),
            products,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use lm_store_core::Price;

    use super::*;
    use crate::config::ClientConfig;
    use crate::session::{MemorySessionStore, Session};

    fn service() -> AdminService {
        let config = ClientConfig::for_base_url("http://127.0.0.1:9/api").unwrap();
        let gateway = Gateway::new(&config, Session::new(MemorySessionStore::default())).unwrap();
        AdminService::new(gateway)
    }

    fn new_product(name: &str, cents: i64) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            description: String::new(),
            price: Price::from_cents(cents),
            image_url: String::new(),
            stock: 5,
        }
    }

    #[tokio::test]
    async fn test_add_product_requires_name() {
        let err = service().add_product(&new_product(" ", 100)).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn test_add_product_requires_positive_price() {
        let err = service().add_product(&new_product("Mug", 0)).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn test_out_of_stock_filter() {
        let product = |id: i64, stock: u32| Product {
            id: ProductId::new(id),
            name: format!("P{id}"),
            description: String::new(),
            price: Price::from_cents(100),
            image_url: None,
            stock,
            is_active: true,
        };
        let dashboard = InventoryDashboard {
            user_count: 2,
            products: vec![product(1, 0), product(2, 4), product(3, 0)],
        };
        let ids: Vec<i64> = dashboard.out_of_stock().map(|p| p.id.as_i64()).collect();
        assert_eq!(ids, vec![1, 3]);
    }
}
