//! QKart Storefront client library.
//!
//! Talks to the QKart REST backend and keeps the client-side state a
//! storefront front end renders from: the product catalog, the user's cart
//! and the login session.
//!
//! # Modules
//!
//! - [`api`] - REST client for catalog, cart and auth endpoints
//! - [`catalog`] - Catalog fetcher with loading/empty/error presentation state
//! - [`debounce`] - Search-as-you-type debouncer
//! - [`cart`] - Cart reconciliation and the add-to-cart decision
//! - [`session`] - Session context, persisted session store and session gate
//! - [`auth`] - Login and registration
//! - [`state`] - [`Storefront`], tying the pieces together

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod debounce;
pub mod error;
pub mod notify;
pub mod session;
pub mod state;

pub use error::{ClientError, Result};
pub use state::Storefront;
