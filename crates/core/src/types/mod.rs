//! Core types for QKart.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod id;
pub mod price;
pub mod product;
pub mod username;

pub use cart::{CartEntry, CartLineItem, Quantity, QuantityError};
pub use id::*;
pub use price::{Cost, CostError};
pub use product::{Product, Rating, RatingError};
pub use username::{Username, UsernameError};
