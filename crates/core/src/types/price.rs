//! Type-safe product cost using decimal arithmetic.
//!
//! The backend reports costs as bare JSON numbers in the store's single
//! currency. There is no currency or tax handling; a [`Cost`] is only ever
//! summed and multiplied by quantities for cart totals. Both saturate at
//! [`Cost::MAX`] instead of overflowing.

use core::fmt;
use core::iter::Sum;
use core::ops::Add;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::cart::Quantity;

/// Errors that can occur when constructing a [`Cost`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CostError {
    /// The amount is below zero.
    #[error("cost cannot be negative (got {0})")]
    Negative(Decimal),
}

/// A non-negative monetary amount.
///
/// Serialized as a JSON number to match the backend's wire format.
///
/// ```
/// use qkart_core::{Cost, Quantity};
/// use rust_decimal::Decimal;
///
/// let cost = Cost::new(Decimal::from(100)).unwrap();
/// assert_eq!(cost.times(Quantity::new(3).unwrap()).to_string(), "$300");
/// assert!(Cost::new(Decimal::from(-1)).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Cost(Decimal);

impl Cost {
    /// A cost of zero.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Largest representable cost. Arithmetic saturates here.
    pub const MAX: Self = Self(Decimal::MAX);

    /// Create a cost, rejecting negative amounts.
    ///
    /// # Errors
    ///
    /// Returns [`CostError::Negative`] if `amount` is below zero.
    pub fn new(amount: Decimal) -> Result<Self, CostError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(CostError::Negative(amount));
        }
        Ok(Self(amount))
    }

    /// Get the underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Cost of `quantity` units at this unit cost.
    #[must_use]
    pub fn times(self, quantity: Quantity) -> Self {
        Self(self.0.saturating_mul(Decimal::from(quantity.get())))
    }
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0.normalize())
    }
}

impl Add for Cost {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Cost {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl TryFrom<Decimal> for Cost {
    type Error = CostError;

    fn try_from(amount: Decimal) -> Result<Self, Self::Error> {
        Self::new(amount)
    }
}

impl Serialize for Cost {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        rust_decimal::serde::float::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for Cost {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = rust_decimal::serde::float::deserialize(deserializer)?;
        Self::new(amount).map_err(serde::de::Error::custom)
    }
}
