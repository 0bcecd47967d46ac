//! Core types for LM Store.
//!
//! This module provides type-safe wrappers for common domain concepts and the
//! payloads exchanged with the remote storefront API.

pub mod account;
pub mod cart;
pub mod credential;
pub mod id;
pub mod order;
pub mod password;
pub mod price;
pub mod product;
pub mod status;
mod wire;

pub use account::{AdminActivity, AuthenticatedUser, Credentials, LoginResponse, UserSummary};
pub use cart::{CartItemRequest, CartLine};
pub use credential::AccessToken;
pub use id::*;
pub use order::{CheckoutReceipt, Order};
pub use password::{Password, PasswordError, PasswordRule};
pub use price::Price;
pub use product::{NewProduct, Product};
pub use status::*;

/// Generic `{"message": ...}` acknowledgement returned by mutating endpoints.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MessageResponse {
    /// Human-readable confirmation.
    pub message: String,
}
