//! Simulated checkout.
//!
//! No payment is processed. Card fields are only checked for shape and never
//! leave the process; after a fixed delay the cart is turned into an order.

use std::fmt;
use std::time::Duration;

use lm_store_core::CheckoutReceipt;
use tracing::instrument;

use super::fetch_json;
use crate::error::ApiError;
use crate::gateway::{Gateway, RequestOptions};
use crate::session::AuthEvent;

/// Card input collected on the payment form. The CVC is checked, never kept.
#[derive(Clone)]
pub struct CardDetails {
    number: String,
    expiry: String,
}

impl CardDetails {
    /// Validate card input.
    ///
    /// Spaces in the card number are ignored. Expiry is `MM/YY`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` naming every malformed field.
    pub fn parse(number: &str, expiry: &str, cvc: &str) -> Result<Self, ApiError> {
        let number: String = number.chars().filter(|c| !c.is_whitespace()).collect();
        let expiry = expiry.trim();
        let cvc = cvc.trim();

        let mut problems = Vec::new();
        if !(12..=19).contains(&number.len()) || !all_digits(&number) {
            problems.push("card number must be 12 to 19 digits");
        }
        if !valid_expiry(expiry) {
            problems.push("expiry must be MM/YY");
        }
        if !(3..=4).contains(&cvc.len()) || !all_digits(cvc) {
            problems.push("CVC must be 3 or 4 digits");
        }

        if !problems.is_empty() {
            return Err(ApiError::Validation(problems.join("; ")));
        }

        Ok(Self {
            number,
            expiry: expiry.to_string(),
        })
    }

    /// Last four digits, for display.
    #[must_use]
    pub fn last_four(&self) -> &str {
        &self.number[self.number.len() - 4..]
    }
}

impl fmt::Debug for CardDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardDetails")
            .field("number", &format_args!("**** {}", self.last_four()))
            .field("expiry", &self.expiry)
            .finish_non_exhaustive()
    }
}

fn all_digits(s: &str) -> bool {
    s.chars().all(|c| c.is_ascii_digit())
}

fn valid_expiry(expiry: &str) -> bool {
    let Some((month, year)) = expiry.split_once('/') else {
        return false;
    };
    month.len() == 2
        && year.len() == 2
        && all_digits(year)
        && all_digits(month)
        && month.parse::<u8>().is_ok_and(|m| (1..=12).contains(&m))
}

/// Places the order for the current cart.
#[derive(Debug, Clone)]
pub struct CheckoutService {
    gateway: Gateway,
    delay: Duration,
}

impl CheckoutService {
    pub(crate) const fn new(gateway: Gateway, delay: Duration) -> Self {
        Self { gateway, delay }
    }

    /// Wait out the simulated payment, then place the order.
    ///
    /// The server empties the cart on success, so `CartUpdated` is broadcast.
    ///
    /// # Errors
    ///
    /// - `ApiError::Rejected` if the server declines (e.g. empty cart, stock ran out)
    /// - `ApiError::SessionExpired` when logged out or the token expired
    #[instrument(skip(self, card), fields(card = %card.last_four()))]
    pub async fn pay(&self, card: &CardDetails) -> Result<CheckoutReceipt, ApiError> {
        tracing::debug!(delay_ms = self.delay.as_millis(), "Processing simulated payment");
        tokio::time::sleep(self.delay).await;

        let receipt: CheckoutReceipt =
            fetch_json(&self.gateway, "/checkout", RequestOptions::post()).await?;

        tracing::info!(order_id = %receipt.order_id, "Order placed");
        self.gateway.session().notify(AuthEvent::CartUpdated);
        Ok(receipt)
    }
}
