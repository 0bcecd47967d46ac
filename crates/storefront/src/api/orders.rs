//! Order history.

use lm_store_core::Order;
use tracing::instrument;

use super::fetch_json;
use crate::error::ApiError;
use crate::gateway::{Gateway, RequestOptions};

/// Past orders of the logged-in user.
#[derive(Debug, Clone)]
pub struct OrderService {
    gateway: Gateway,
}

impl OrderService {
    pub(crate) const fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    /// Orders newest first, in the order the server returns them.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::SessionExpired` when logged out or the token expired.
    #[instrument(skip(self))]
    pub async fn history(&self) -> Result<Vec<Order>, ApiError> {
        fetch_json(&self.gateway, "/orders", RequestOptions::get()).await
    }
}
