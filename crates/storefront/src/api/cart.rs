//! Cart reads, writes and the optimistic cart view.
//!
//! The remote cart endpoint only knows "add N more" and "remove the line".
//! [`CartView::set_quantity`] turns an absolute quantity into those calls:
//! an increase adds the difference, a decrease removes the line and adds the
//! new quantity back, zero removes the line.
//!
//! Local state is updated before the request is sent. Writes are sequenced
//! per product: requests for one line go out one at a time, a change that is
//! overtaken before its turn is dropped, and only the response to the most
//! recent change is applied to the view.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lm_store_core::{CartItemRequest, CartLine, Price, ProductId};
use tracing::instrument;

use super::{fetch_json, fetch_ok};
use crate::error::ApiError;
use crate::gateway::{Gateway, RequestOptions};
use crate::sequencer::{RequestSequencer, RequestToken};
use crate::session::AuthEvent;

/// Server-side cart of the logged-in user.
#[derive(Debug, Clone)]
pub struct CartService {
    gateway: Gateway,
}

impl CartService {
    pub(crate) const fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    /// Current cart lines.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::SessionExpired` when logged out or the token expired.
    #[instrument(skip(self))]
    pub async fn view(&self) -> Result<Vec<CartLine>, ApiError> {
        fetch_json(&self.gateway, "/cart", RequestOptions::get()).await
    }

    /// Add `quantity` more of a product.
    ///
    /// # Errors
    ///
    /// - `ApiError::Validation` if `quantity` is zero
    /// - `ApiError::Rejected` if the product is unknown or stock is insufficient
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add(&self, product_id: ProductId, quantity: u32) -> Result<(), ApiError> {
        self.post_add(product_id, quantity).await?;
        self.gateway.session().notify(AuthEvent::CartUpdated);
        Ok(())
    }

    /// Remove a product's line entirely.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::SessionExpired` when logged out or the token expired.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove(&self, product_id: ProductId) -> Result<(), ApiError> {
        self.delete_line(product_id).await?;
        self.gateway.session().notify(AuthEvent::CartUpdated);
        Ok(())
    }

    /// Fetch the cart into an optimistic view.
    ///
    /// # Errors
    ///
    /// Same as [`CartService::view`].
    pub async fn load_view(&self) -> Result<CartView, ApiError> {
        let lines = self.view().await?;
        Ok(CartView::new(self.clone(), lines))
    }

    async fn post_add(&self, product_id: ProductId, quantity: u32) -> Result<(), ApiError> {
        if quantity == 0 {
            return Err(ApiError::Validation(
                "Quantity must be at least 1".to_string(),
            ));
        }
        let options = RequestOptions::post().json(&CartItemRequest {
            product_id,
            quantity,
        })?;
        fetch_ok(&self.gateway, "/cart/add", options).await
    }

    async fn delete_line(&self, product_id: ProductId) -> Result<(), ApiError> {
        fetch_ok(
            &self.gateway,
            &format!("/cart/remove/{product_id}"),
            RequestOptions::delete(),
        )
        .await
    }
}

/// What happened to an optimistic cart change once its response arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartUpdate {
    /// This was the latest change to the line and the server accepted it.
    Applied,
    /// A newer change to the same line was issued first; this one was dropped
    /// or its response ignored.
    Superseded,
}

/// Server quantity of one line as last confirmed, `None` when unknown.
///
/// Guarded by an async mutex: holding it makes the caller the only writer to
/// that line, from computing the delta until the last request settles.
type LineWriter = Arc<tokio::sync::Mutex<Option<u32>>>;

/// Locally held cart with optimistic, sequenced updates.
///
/// Cheap to clone; clones share the same lines, so concurrent tasks can
/// update different (or the same) lines of one view.
///
/// Local state changes as soon as a change is requested. Requests for one
/// line reach the server one at a time, each computed from the quantity the
/// server last confirmed, so the line converges on the latest change even
/// when earlier ones fail.
#[derive(Debug, Clone)]
pub struct CartView {
    inner: Arc<CartViewInner>,
}

#[derive(Debug)]
struct CartViewInner {
    service: CartService,
    lines: Mutex<Vec<CartLine>>,
    sequencer: RequestSequencer<ProductId>,
    writers: Mutex<HashMap<ProductId, LineWriter>>,
}

impl CartView {
    fn new(service: CartService, lines: Vec<CartLine>) -> Self {
        let writers = lines
            .iter()
            .map(|line| {
                let writer = Arc::new(tokio::sync::Mutex::new(Some(line.quantity)));
                (line.product_id, writer)
            })
            .collect();
        Self {
            inner: Arc::new(CartViewInner {
                service,
                lines: Mutex::new(lines),
                sequencer: RequestSequencer::new(),
                writers: Mutex::new(writers),
            }),
        }
    }

    /// Snapshot of the current lines.
    #[must_use]
    pub fn lines(&self) -> Vec<CartLine> {
        self.lock().clone()
    }

    /// Quantity of a product's line, if it is in the cart.
    #[must_use]
    pub fn quantity_of(&self, product_id: ProductId) -> Option<u32> {
        self.lock()
            .iter()
            .find(|line| line.product_id == product_id)
            .map(|line| line.quantity)
    }

    /// Sum of price times quantity over all lines.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.lock().iter().map(CartLine::line_total).sum()
    }

    /// Total number of units in the cart.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lock().iter().map(|line| line.quantity).sum()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Replace local state with the server's cart.
    ///
    /// Lines with a change in flight keep the quantity they confirm
    /// themselves; everything else takes the server's quantity as confirmed.
    ///
    /// # Errors
    ///
    /// Same as [`CartService::view`].
    pub async fn refresh(&self) -> Result<(), ApiError> {
        let lines = self.inner.service.view().await?;
        {
            let writers = self.writers();
            for (product_id, writer) in writers.iter() {
                if let Ok(mut confirmed) = writer.try_lock() {
                    *confirmed = Some(server_quantity(&lines, *product_id));
                }
            }
        }
        *self.lock() = lines;
        Ok(())
    }

    /// Change a line to an absolute quantity. Zero removes the line.
    ///
    /// # Errors
    ///
    /// - `ApiError::Validation` if the product is not in the cart
    /// - any error of the underlying request, when it was the latest change
    ///   to this line (the line is then re-synced from the server)
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn set_quantity(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartUpdate, ApiError> {
        if quantity == 0 {
            return self.remove(product_id).await;
        }

        let token = {
            let mut lines = self.lock();
            let line = lines
                .iter_mut()
                .find(|line| line.product_id == product_id)
                .ok_or_else(|| not_in_cart(product_id))?;
            line.quantity = quantity;
            self.inner.sequencer.issue(&product_id)
        };

        self.write(product_id, token, quantity).await
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// - `ApiError::Validation` if the product is not in the cart
    /// - any error of the request, when it was the latest change to this line
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove(&self, product_id: ProductId) -> Result<CartUpdate, ApiError> {
        let token = {
            let mut lines = self.lock();
            let before = lines.len();
            lines.retain(|line| line.product_id != product_id);
            if lines.len() == before {
                return Err(not_in_cart(product_id));
            }
            self.inner.sequencer.issue(&product_id)
        };

        self.write(product_id, token, 0).await
    }

    /// Bring the server's line to `target` while holding the line's writer.
    async fn write(
        &self,
        product_id: ProductId,
        token: RequestToken,
        target: u32,
    ) -> Result<CartUpdate, ApiError> {
        let writer = self.writer(product_id);
        let mut confirmed = writer.lock().await;

        // A newer change queued behind us carries the line to its own target
        if !self.inner.sequencer.is_current(&product_id, token) {
            tracing::debug!(token = token.get(), "Skipping superseded cart change");
            return Ok(CartUpdate::Superseded);
        }

        let result = match *confirmed {
            Some(server) => self.push_quantity(product_id, server, target).await,
            None => match self.inner.service.view().await {
                Ok(lines) => {
                    let server = server_quantity(&lines, product_id);
                    self.push_quantity(product_id, server, target).await
                }
                Err(e) => Err(e),
            },
        };

        // A failed write may have been applied in part
        *confirmed = result.is_ok().then_some(target);
        let current = self.inner.sequencer.complete(&product_id, token);

        match result {
            Ok(()) if current => {
                self.apply_line(product_id, target, None);
                self.inner
                    .service
                    .gateway
                    .session()
                    .notify(AuthEvent::CartUpdated);
                Ok(CartUpdate::Applied)
            }
            Ok(()) => Ok(CartUpdate::Superseded),
            // A dead session is terminal whichever write noticed it
            Err(e @ ApiError::SessionExpired(_)) => Err(e),
            Err(e) if current => {
                tracing::warn!(error = %e, "Cart change failed, re-syncing line from server");
                match self.inner.service.view().await {
                    Ok(lines) => {
                        let server = server_quantity(&lines, product_id);
                        *confirmed = Some(server);
                        if self.inner.sequencer.is_current(&product_id, token) {
                            let listed = lines.into_iter().find(|l| l.product_id == product_id);
                            self.apply_line(product_id, server, listed);
                        }
                    }
                    Err(refresh_err) => {
                        tracing::error!(error = %refresh_err, "Cart re-sync failed");
                    }
                }
                Err(e)
            }
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring failure of superseded cart change");
                Ok(CartUpdate::Superseded)
            }
        }
    }

    /// Translate a quantity change into the additive cart API.
    async fn push_quantity(
        &self,
        product_id: ProductId,
        server: u32,
        target: u32,
    ) -> Result<(), ApiError> {
        let service = &self.inner.service;
        match target.cmp(&server) {
            std::cmp::Ordering::Equal => Ok(()),
            std::cmp::Ordering::Greater => service.post_add(product_id, target - server).await,
            std::cmp::Ordering::Less => {
                service.delete_line(product_id).await?;
                if target == 0 {
                    return Ok(());
                }
                service.post_add(product_id, target).await
            }
        }
    }

    /// Set the local line to `quantity`, dropping it at zero. `listed` is the
    /// server's row, used when the line is missing locally.
    fn apply_line(&self, product_id: ProductId, quantity: u32, listed: Option<CartLine>) {
        let mut lines = self.lock();
        if quantity == 0 {
            lines.retain(|line| line.product_id != product_id);
        } else if let Some(line) = lines.iter_mut().find(|l| l.product_id == product_id) {
            line.quantity = quantity;
        } else if let Some(line) = listed {
            lines.push(line);
        }
    }

    fn writer(&self, product_id: ProductId) -> LineWriter {
        Arc::clone(self.writers().entry(product_id).or_default())
    }

    fn writers(&self) -> MutexGuard<'_, HashMap<ProductId, LineWriter>> {
        self.inner
            .writers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn lock(&self) -> MutexGuard<'_, Vec<CartLine>> {
        self.inner.lines.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn server_quantity(lines: &[CartLine], product_id: ProductId) -> u32 {
    lines
        .iter()
        .find(|line| line.product_id == product_id)
        .map_or(0, |line| line.quantity)
}

fn not_in_cart(product_id: ProductId) -> ApiError {
    ApiError::Validation(format!("Product {product_id} is not in your cart"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::session::{MemorySessionStore, Session};

    fn line(id: i64, cents: i64, quantity: u32) -> CartLine {
        CartLine {
            product_id: ProductId::new(id),
            name: format!("Product {id}"),
            price: Price::from_cents(cents),
            image_url: None,
            quantity,
        }
    }

    fn offline_view(lines: Vec<CartLine>) -> CartView {
        let config = ClientConfig::for_base_url("http://127.0.0.1:9/api").unwrap();
        let gateway = Gateway::new(&config, Session::new(MemorySessionStore::default())).unwrap();
        CartView::new(CartService::new(gateway), lines)
    }

    #[test]
    fn test_subtotal_and_count() {
        let view = offline_view(vec![line(1, 1999, 2), line(2, 500, 1)]);
        assert_eq!(view.subtotal(), Price::from_cents(4498));
        assert_eq!(view.item_count(), 3);
        assert_eq!(view.quantity_of(ProductId::new(2)), Some(1));
        assert!(!view.is_empty());
    }

    #[tokio::test]
    async fn test_set_quantity_unknown_line() {
        let view = offline_view(vec![line(1, 1999, 2)]);
        let err = view.set_quantity(ProductId::new(9), 3).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(view.lines(), vec![line(1, 1999, 2)]);
    }

    #[tokio::test]
    async fn test_add_rejects_zero_quantity() {
        let view = offline_view(vec![]);
        let err = view
            .inner
            .service
            .add(ProductId::new(1), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
