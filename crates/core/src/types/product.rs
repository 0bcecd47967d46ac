//! Catalog product payloads.

use serde::{Deserialize, Serialize};

use super::{Price, ProductId, wire};

/// A product row as returned by `GET /products` and the admin archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Price,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub stock: u32,
    /// Archived products have this cleared; they stay restorable.
    #[serde(default = "default_active", with = "wire::flag")]
    pub is_active: bool,
}

const fn default_active() -> bool {
    true
}

impl Product {
    /// Whether the product can currently be bought.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

/// Body of `POST /admin/products`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Price,
    pub image_url: String,
    pub stock: u32,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_product_from_api_row() {
        let json = r#"{
            "id": 3,
            "name": "Mechanical Keyboard",
            "description": "Tactile switches",
            "price": 89.99,
            "image_url": null,
            "stock": 0,
            "is_active": 1
        }"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.id, ProductId::new(3));
        assert_eq!(product.price, Price::from_cents(8999));
        assert!(product.is_active);
        assert!(!product.in_stock());
        assert!(product.image_url.is_none());
    }
}
