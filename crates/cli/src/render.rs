//! Plain-text rendering of storefront state.

use std::io::{self, Write};

use qkart_core::{CartLineItem, Product};
use qkart_storefront::cart::{compute_total, item_count};
use qkart_storefront::catalog::CatalogView;
use qkart_storefront::notify::Notification;
use qkart_storefront::session::{NavAction, Navigation};

/// Product grid, or the loading/empty/failed placeholder.
pub fn catalog(out: &mut impl Write, view: &CatalogView) -> io::Result<()> {
    match view {
        CatalogView::Loading => writeln!(out, "Loading Products..."),
        CatalogView::Empty => writeln!(out, "No products found"),
        CatalogView::Failed(message) => writeln!(out, "{message}"),
        CatalogView::Products(products) => {
            for product in products {
                product_card(out, product)?;
            }
            Ok(())
        }
    }
}

fn product_card(out: &mut impl Write, product: &Product) -> io::Result<()> {
    writeln!(
        out,
        "{id:<18} {name:<32} {cost:>8}  {rating}  [{category}]",
        id = product.id,
        name = product.name,
        cost = product.cost.to_string(),
        rating = product.rating,
        category = product.category,
    )
}

/// Cart line items with item count and total.
pub fn cart(out: &mut impl Write, items: &[CartLineItem]) -> io::Result<()> {
    if items.is_empty() {
        return writeln!(out, "Cart is empty. Add an item to the cart to see it here.");
    }

    for item in items {
        writeln!(
            out,
            "{id:<18} {name:<32} {qty:>3} x {cost:>8} = {line:>8}",
            id = item.product.id,
            name = item.product.name,
            qty = item.quantity.get(),
            cost = item.product.cost.to_string(),
            line = item.line_total().to_string(),
        )?;
    }
    writeln!(out, "Items: {}", item_count(items))?;
    writeln!(out, "Order total: {}", compute_total(items))
}

/// Header line: who is logged in and what they can do.
pub fn navigation(out: &mut impl Write, nav: &Navigation) -> io::Result<()> {
    let actions: Vec<&str> = nav
        .actions
        .iter()
        .map(|action| match action {
            NavAction::Login => "login",
            NavAction::Register => "register",
            NavAction::Logout => "logout",
            NavAction::BackToExplore => "back to explore",
        })
        .collect();

    match &nav.username {
        Some(username) => writeln!(out, "Logged in as {username} ({})", actions.join(", ")),
        None => writeln!(out, "Not logged in ({})", actions.join(", ")),
    }
}

pub fn notification(out: &mut impl Write, notification: &Notification) -> io::Result<()> {
    writeln!(out, "{}: {}", notification.level, notification.message)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use qkart_core::{Cost, ProductId, Quantity, Rating};

    use super::*;

    fn product(id: &str, cost: u32) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Item {id}"),
            category: "Sports".to_string(),
            cost: Cost::new(cost.into()).unwrap(),
            rating: Rating::new(5).unwrap(),
            image_url: String::new(),
        }
    }

    fn rendered(f: impl FnOnce(&mut Vec<u8>) -> io::Result<()>) -> String {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_catalog_placeholders() {
        assert_eq!(
            rendered(|out| catalog(out, &CatalogView::Loading)),
            "Loading Products...\n"
        );
        assert_eq!(
            rendered(|out| catalog(out, &CatalogView::Empty)),
            "No products found\n"
        );
    }

    #[test]
    fn test_catalog_lists_products() {
        let text = rendered(|out| {
            catalog(
                out,
                &CatalogView::Products(vec![product("a", 10), product("b", 20)]),
            )
        });
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("Item a"));
        assert!(text.contains("$20"));
    }

    #[test]
    fn test_cart_summary() {
        let items = vec![
            CartLineItem {
                product: product("a", 100),
                quantity: Quantity::new(2).unwrap(),
            },
            CartLineItem {
                product: product("b", 5),
                quantity: Quantity::ONE,
            },
        ];
        let text = rendered(|out| cart(out, &items));
        assert!(text.contains("Items: 3"));
        assert!(text.ends_with("Order total: $205\n"));
    }

    #[test]
    fn test_empty_cart() {
        let text = rendered(|out| cart(out, &[]));
        assert!(text.starts_with("Cart is empty"));
    }

    #[test]
    fn test_navigation_line() {
        let nav = Navigation {
            username: None,
            actions: vec![NavAction::Login, NavAction::Register],
        };
        assert_eq!(
            rendered(|out| navigation(out, &nav)),
            "Not logged in (login, register)\n"
        );
    }
}
