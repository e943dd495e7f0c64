//! Cart entries held by the backend and the line items derived from them.

use core::fmt;
use core::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::price::Cost;
use super::product::Product;

/// Errors that can occur when constructing a [`Quantity`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QuantityError {
    /// A cart entry cannot hold zero units.
    #[error("quantity must be greater than zero")]
    Zero,
}

/// Number of units of a product held in a cart. Always at least one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(NonZeroU32);

impl Quantity {
    /// A single unit.
    pub const ONE: Self = Self(NonZeroU32::MIN);

    /// Create a quantity.
    ///
    /// # Errors
    ///
    /// Returns [`QuantityError::Zero`] if `units` is zero.
    pub const fn new(units: u32) -> Result<Self, QuantityError> {
        match NonZeroU32::new(units) {
            Some(n) => Ok(Self(n)),
            None => Err(QuantityError::Zero),
        }
    }

    /// Number of units.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0.get()
    }
}

impl TryFrom<u32> for Quantity {
    type Error = QuantityError;

    fn try_from(units: u32) -> Result<Self, Self::Error> {
        Self::new(units)
    }
}

impl From<Quantity> for u32 {
    fn from(quantity: Quantity) -> Self {
        quantity.get()
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Server-authoritative record of a product held in the user's cart.
///
/// Sent by the backend as `{"productId": "...", "qty": 3}`. The client never
/// edits these locally; every cart mutation adopts the backend's returned
/// list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartEntry {
    /// Product this entry refers to.
    #[serde(rename = "productId")]
    pub product_id: ProductId,
    /// Units of the product in the cart.
    #[serde(rename = "qty")]
    pub quantity: Quantity,
}

impl CartEntry {
    /// Create a cart entry.
    #[must_use]
    pub fn new(product_id: impl Into<ProductId>, quantity: Quantity) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// Display-ready join of a [`CartEntry`] with its [`Product`]. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLineItem {
    /// Full product details from the catalog.
    pub product: Product,
    /// Units in the cart.
    pub quantity: Quantity,
}

impl CartLineItem {
    /// Cost of this line: unit cost times quantity.
    #[must_use]
    pub fn line_total(&self) -> Cost {
        self.product.cost.times(self.quantity)
    }
}
