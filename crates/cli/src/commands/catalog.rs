//! Catalog commands.

use lm_store_core::{Product, ProductId};
use lm_store_storefront::StoreClient;

use super::CommandError;

pub async fn list(client: &StoreClient) -> Result<(), CommandError> {
    let products = client.products().list().await?;
    if products.is_empty() {
        tracing::info!("No products available");
        return Ok(());
    }
    for product in &products {
        tracing::info!("{}", summary_line(product));
    }
    Ok(())
}

pub async fn show(client: &StoreClient, id: ProductId) -> Result<(), CommandError> {
    let product = client.products().get(id).await?;
    tracing::info!("{}", summary_line(&product));
    if !product.description.is_empty() {
        tracing::info!("  {}", product.description);
    }
    if let Some(image_url) = product.image_url.as_deref().filter(|u| !u.is_empty()) {
        tracing::info!("  image: {image_url}");
    }
    Ok(())
}

pub(crate) fn summary_line(product: &Product) -> String {
    let stock = if product.in_stock() {
        format!("{} in stock", product.stock)
    } else {
        "out of stock".to_string()
    };
    format!(
        "#{:<4} {:<32} {:>10}  {stock}",
        product.id.as_i64(),
        product.name,
        product.price.to_string()
    )
}
