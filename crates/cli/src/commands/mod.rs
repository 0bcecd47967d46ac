//! CLI command implementations.

pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod orders;

use lm_store_storefront::{ApiError, ConfigError};
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Environment configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A storefront API call failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The command needs a session and none is stored.
    #[error("Not logged in")]
    NotLoggedIn,

    /// The logged-in account is not a store admin.
    #[error("Admin access required")]
    AdminRequired,
}
