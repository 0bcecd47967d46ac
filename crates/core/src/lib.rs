//! LM Store Core - Shared types library.
//!
//! This crate provides the types shared by every LM Store client component:
//! - `storefront` - Session handling, the authenticated gateway and API services
//! - `cli` - Command-line front end for shoppers and store admins
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no HTTP clients,
//! no session storage. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, prices, roles, credentials and the remote API's
//!   JSON payloads

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
