//! Cart commands.
//!
//! # Usage
//!
//! ```bash
//! # Show the cart with item count and total
//! qkart cart show
//!
//! # Add a product from the catalog
//! qkart cart add KCRwjF7lN97HnEaY
//!
//! # Change the quantity of a product already in the cart (0 removes it)
//! qkart cart add KCRwjF7lN97HnEaY --qty 3 --update
//! ```

use std::io;

use qkart_core::ProductId;
use qkart_storefront::Storefront;
use qkart_storefront::cart::AddMode;

use crate::error::Result;
use crate::render;

/// Fetch catalog and cart, then print the reconciled line items.
pub async fn show(storefront: &Storefront) -> Result<()> {
    storefront.load().await;
    render::cart(&mut io::stdout().lock(), &storefront.line_items())?;
    Ok(())
}

/// Add a product to the cart, or set its quantity with `update`.
///
/// The current cart is fetched first so duplicate adds are detected. A
/// quantity of 0 is only accepted with `update`.
pub async fn add(storefront: &Storefront, product_id: &str, qty: u32, update: bool) -> Result<()> {
    let mode = if update { AddMode::Update } else { AddMode::Insert };

    storefront.load().await;
    storefront
        .add_to_cart(&ProductId::new(product_id), qty, mode)
        .await?;

    render::cart(&mut io::stdout().lock(), &storefront.line_items())?;
    Ok(())
}
