//! Catalog commands.
//!
//! # Usage
//!
//! ```bash
//! # List every product
//! qkart products
//!
//! # One-shot search
//! qkart products --search phone
//!
//! # Search as you type: each stdin line is a keystroke, debounced
//! qkart search
//! ```

use std::io::{self, Write};

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::oneshot;

use qkart_storefront::Storefront;
use qkart_storefront::catalog::CatalogView;

use crate::error::Result;
use crate::render;

/// List the catalog, optionally filtered by `search`.
pub async fn list(storefront: &Storefront, search: Option<&str>) -> Result<()> {
    let catalog = storefront.catalog();
    match search {
        Some(term) => catalog.fetch_by_search(term).await?,
        None => catalog.fetch_all().await?,
    };

    render::catalog(&mut io::stdout().lock(), &catalog.view())?;
    Ok(())
}

/// Interactive search: every line read from stdin is treated as the search
/// box's new contents. Results are printed whenever the catalog settles.
pub async fn search(storefront: &Storefront) -> Result<()> {
    let mut changes = storefront.catalog().subscribe();
    let (stop, mut stopped) = oneshot::channel::<()>();

    let printer = tokio::spawn(async move {
        loop {
            let stopping = tokio::select! {
                changed = changes.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    false
                }
                _ = &mut stopped => {
                    // Print a final update that raced with the stop signal.
                    if !changes.has_changed().unwrap_or(false) {
                        break;
                    }
                    true
                }
            };

            let state = changes.borrow_and_update().clone();
            if !state.loading {
                print_view(&state.view())?;
            }
            if stopping {
                break;
            }
        }
        Ok::<(), io::Error>(())
    });

    let mut debouncer = storefront.search_debouncer();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        debouncer.on_input(line);
    }

    debouncer.flush().await;
    let _ = stop.send(());
    match printer.await {
        Ok(result) => result?,
        Err(e) => tracing::warn!(error = %e, "Search printer task failed"),
    }
    Ok(())
}

fn print_view(view: &CatalogView) -> io::Result<()> {
    let mut out = io::stdout().lock();
    render::catalog(&mut out, view)?;
    writeln!(out)
}
