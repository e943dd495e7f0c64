//! QKart Core - Shared types library.
//!
//! This crate provides common types used across all QKart client components:
//! - `storefront` - Catalog, cart and session client for the QKart REST backend
//! - `cli` - Command-line front end over the storefront client
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for product IDs, costs, ratings, quantities
//!   and usernames, plus the product and cart data model

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
