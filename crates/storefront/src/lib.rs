//! LM Store storefront client library.
//!
//! Everything a storefront front end needs to talk to the remote store API:
//! the session context, the authenticated request gateway, and typed services
//! for the catalog, cart, checkout, orders and the admin inventory panel.
//!
//! # Example
//!
//! ```rust,ignore
//! use lm_store_storefront::{ClientConfig, StoreClient, session::FileSessionStore};
//!
//! let config = ClientConfig::from_env()?;
//! let store = FileSessionStore::new(&config.session_file);
//! let client = StoreClient::new(config, store)?;
//!
//! client.auth().login("ada", "Secret123").await?;
//! let lines = client.cart().view().await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod gateway;
pub mod sequencer;
pub mod session;

pub use client::StoreClient;
pub use config::{ClientConfig, ConfigError};
pub use error::{ApiError, Result};
pub use gateway::{Gateway, GatewayResponse, ReauthRequired, RequestOptions};
pub use session::{AuthEvent, Session, SessionCredential, SessionStore};
