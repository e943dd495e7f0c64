//! Product catalog types.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::price::Cost;

/// Errors that can occur when constructing a [`Rating`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RatingError {
    /// The rating is above the five-star maximum.
    #[error("rating must be at most {max} (got {got})")]
    OutOfRange {
        /// Maximum allowed rating.
        max: u8,
        /// The rejected value.
        got: u8,
    },
}

/// Aggregate product rating, an integer number of stars out of five.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[derive(Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    /// Highest possible rating.
    pub const MAX: u8 = 5;

    /// Create a rating.
    ///
    /// # Errors
    ///
    /// Returns [`RatingError::OutOfRange`] if `stars` exceeds [`Rating::MAX`].
    pub const fn new(stars: u8) -> Result<Self, RatingError> {
        if stars > Self::MAX {
            return Err(RatingError::OutOfRange {
                max: Self::MAX,
                got: stars,
            });
        }
        Ok(Self(stars))
    }

    /// Number of stars.
    #[must_use]
    pub const fn stars(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Rating {
    type Error = RatingError;

    fn try_from(stars: u8) -> Result<Self, Self::Error> {
        Self::new(stars)
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let filled = usize::from(self.0);
        let empty = usize::from(Self::MAX - self.0);
        write!(f, "{}{}", "★".repeat(filled), "☆".repeat(empty))
    }
}

/// A product available to buy.
///
/// Field names follow the backend's JSON: the ID is sent as `_id` and the
/// image URL as `image`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Unique product ID.
    #[serde(rename = "_id")]
    pub id: ProductId,
    /// Name or title of the product.
    pub name: String,
    /// Category the product belongs to.
    pub category: String,
    /// Price to buy one unit.
    pub cost: Cost,
    /// Aggregate rating out of five.
    pub rating: Rating,
    /// URL of the product image.
    #[serde(rename = "image")]
    pub image_url: String,
}
