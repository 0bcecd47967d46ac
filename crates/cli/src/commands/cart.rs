//! Cart commands.

use lm_store_core::ProductId;
use lm_store_storefront::StoreClient;
use lm_store_storefront::api::{CartUpdate, CartView};

use super::CommandError;

pub async fn show(client: &StoreClient) -> Result<(), CommandError> {
    let view = client.cart().load_view().await?;
    print_view(&view);
    Ok(())
}

pub async fn add(client: &StoreClient, id: ProductId, quantity: u32) -> Result<(), CommandError> {
    client.cart().add(id, quantity).await?;
    tracing::info!("Added {quantity} x product #{id} to your cart");
    Ok(())
}

pub async fn remove(client: &StoreClient, id: ProductId) -> Result<(), CommandError> {
    client.cart().remove(id).await?;
    tracing::info!("Removed product #{id} from your cart");
    Ok(())
}

/// Set an exact quantity through the optimistic view, then show the result.
pub async fn set(client: &StoreClient, id: ProductId, quantity: u32) -> Result<(), CommandError> {
    let view = client.cart().load_view().await?;
    match view.set_quantity(id, quantity).await? {
        CartUpdate::Applied => print_view(&view),
        CartUpdate::Superseded => tracing::info!("A newer change to product #{id} took effect"),
    }
    Ok(())
}

fn print_view(view: &CartView) {
    let lines = view.lines();
    if lines.is_empty() {
        tracing::info!("Your cart is empty");
        return;
    }
    for line in &lines {
        tracing::info!(
            "#{:<4} {:<32} {:>3} x {:>9} = {:>10}",
            line.product_id.as_i64(),
            line.name,
            line.quantity,
            line.price.to_string(),
            line.line_total().to_string()
        );
    }
    tracing::info!("{} item(s), subtotal {}", view.item_count(), view.subtotal());
}
