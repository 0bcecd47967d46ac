//! Inventory and reporting commands for store admins.
//!
//! # Usage
//!
//! ```bash
//! lm admin dashboard
//! lm admin add-product -n "Desk Lamp" -p 24.50 -s 10
//! lm admin stock 3 25
//! lm admin archive 3
//! lm admin restore 3
//! ```
//!
//! The role check here only hides the commands from regular shoppers. The
//! server makes the real decision and answers `403` to non-admin sessions.

use lm_store_core::{NewProduct, ProductId};
use lm_store_storefront::StoreClient;

use super::CommandError;
use super::catalog::summary_line;

/// Refuse early when the stored session is missing or not an admin.
pub fn require_admin(client: &StoreClient) -> Result<(), CommandError> {
    let credential = client.auth().current()?.ok_or(CommandError::NotLoggedIn)?;
    if !credential.role.can_view_admin() {
        return Err(CommandError::AdminRequired);
    }
    Ok(())
}

pub async fn dashboard(client: &StoreClient) -> Result<(), CommandError> {
    let dashboard = client.admin().dashboard().await?;
    tracing::info!(
        "Total users: {}  Products: {}",
        dashboard.user_count,
        dashboard.products.len()
    );

    let mut out_of_stock = dashboard.out_of_stock().peekable();
    if out_of_stock.peek().is_none() {
        tracing::info!("Every product is in stock");
    } else {
        tracing::info!("Out of stock:");
        for product in out_of_stock {
            tracing::info!("  {}", summary_line(product));
        }
    }
    Ok(())
}

pub async fn users(client: &StoreClient) -> Result<(), CommandError> {
    for user in client.admin().users().await? {
        tracing::info!(
            "#{:<4} {:<24} {:<6} joined {}",
            user.id.as_i64(),
            user.username,
            user.role.to_string(),
            user.created_at.format("%Y-%m-%d")
        );
    }
    Ok(())
}

pub async fn activity(client: &StoreClient) -> Result<(), CommandError> {
    let activities = client.admin().activities().await?;
    if activities.is_empty() {
        tracing::info!("No orders yet");
    }
    for activity in &activities {
        tracing::info!(
            "{}  {:<24} order #{:<5} {:>10}",
            activity.created_at.format("%Y-%m-%d %H:%M"),
            activity.username,
            activity.order_id.as_i64(),
            activity.total_amount.to_string()
        );
    }
    Ok(())
}

pub async fn add_product(client: &StoreClient, product: &NewProduct) -> Result<(), CommandError> {
    let message = client.admin().add_product(product).await?;
    tracing::info!("{message}");
    Ok(())
}

pub async fn archive(client: &StoreClient, id: ProductId) -> Result<(), CommandError> {
    client.admin().deactivate(id).await?;
    tracing::info!("Archived product #{id}; restore it with `lm admin restore {id}`");
    Ok(())
}

pub async fn restore(client: &StoreClient, id: ProductId) -> Result<(), CommandError> {
    client.admin().restore(id).await?;
    tracing::info!("Restored product #{id}");
    Ok(())
}

pub async fn stock(client: &StoreClient, id: ProductId, stock: u32) -> Result<(), CommandError> {
    client.admin().update_stock(id, stock).await?;
    tracing::info!("Stock for product #{id} set to {stock}");
    Ok(())
}

pub async fn archived(client: &StoreClient) -> Result<(), CommandError> {
    let products = client.admin().archived().await?;
    if products.is_empty() {
        tracing::info!("No archived products");
    }
    for product in &products {
        tracing::info!("{}", summary_line(product));
    }
    Ok(())
}
