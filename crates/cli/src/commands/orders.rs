//! Checkout and order history commands.

use lm_store_storefront::StoreClient;
use lm_store_storefront::api::CardDetails;

use super::CommandError;

pub async fn checkout(
    client: &StoreClient,
    card: &str,
    expiry: &str,
    cvc: &str,
) -> Result<(), CommandError> {
    let card = CardDetails::parse(card, expiry, cvc)?;

    let cart = client.cart().load_view().await?;
    if cart.is_empty() {
        tracing::info!("Your cart is empty; nothing to pay for");
        return Ok(());
    }

    tracing::info!(
        "Paying {} with card ending {}...",
        cart.subtotal(),
        card.last_four()
    );
    let receipt = client.checkout().pay(&card).await?;
    tracing::info!("{} Order #{}", receipt.message, receipt.order_id);
    Ok(())
}

pub async fn history(client: &StoreClient) -> Result<(), CommandError> {
    let orders = client.orders().history().await?;
    if orders.is_empty() {
        tracing::info!("No orders yet");
        return Ok(());
    }
    for order in &orders {
        tracing::info!(
            "Order #{:<5} {}  {:>10}  {}",
            order.id.as_i64(),
            order.created_at.format("%Y-%m-%d %H:%M"),
            order.total_amount.to_string(),
            order.status
        );
    }
    Ok(())
}
