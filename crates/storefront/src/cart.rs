//! Cart reconciliation and the add-to-cart flow.
//!
//! The backend owns the cart. The client holds the last entry list the
//! backend returned and joins it against the catalog for display; it never
//! increments or decrements quantities itself.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, instrument};

use qkart_core::{CartEntry, CartLineItem, Cost, Product, ProductId};

use crate::api::StorefrontClient;
use crate::error::{BACKEND_UNREACHABLE, CART_FETCH_FAILED, ClientError, Result};
use crate::notify::{Notification, Notifier};
use crate::session::Session;

// =============================================================================
// Reconciler
// =============================================================================

/// Join cart entries against the catalog.
///
/// Output follows `entries` order. Entries whose product is missing from
/// `catalog` are dropped.
#[must_use]
pub fn reconcile(entries: &[CartEntry], catalog: &[Product]) -> Vec<CartLineItem> {
    let by_id: HashMap<&ProductId, &Product> = catalog.iter().map(|p| (&p.id, p)).collect();

    entries
        .iter()
        .filter_map(|entry| {
            by_id.get(&entry.product_id).map(|product| CartLineItem {
                product: (*product).clone(),
                quantity: entry.quantity,
            })
        })
        .collect()
}

/// Whether any entry refers to `product_id`.
#[must_use]
pub fn contains_product(entries: &[CartEntry], product_id: &ProductId) -> bool {
    entries.iter().any(|entry| &entry.product_id == product_id)
}

/// Sum of `quantity * cost` over all line items, saturating at [`Cost::MAX`].
#[must_use]
pub fn compute_total(items: &[CartLineItem]) -> Cost {
    items.iter().map(CartLineItem::line_total).sum()
}

/// Total number of units across all line items.
#[must_use]
pub fn item_count(items: &[CartLineItem]) -> u64 {
    items
        .iter()
        .fold(0u64, |count, item| count.saturating_add(u64::from(item.quantity.get())))
}

/// Shown when a non-update add asks for zero units.
pub const ZERO_QUANTITY_INSERT: &str = "Quantity must be at least 1 to add an item to the Cart";

// =============================================================================
// Add-to-cart decision
// =============================================================================

/// How an add-to-cart request was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddMode {
    /// "Add to cart" on a product card. Refused for products already in the
    /// cart.
    #[default]
    Insert,
    /// Explicit quantity change from the cart view.
    Update,
}

/// Outcome of the add-to-cart state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddDecision {
    RejectAuthRequired,
    RejectDuplicate,
    Insert,
    UpdateQuantity,
}

impl AddDecision {
    /// Whether a request goes to the backend.
    #[must_use]
    pub const fn proceeds(self) -> bool {
        matches!(self, Self::Insert | Self::UpdateQuantity)
    }
}

/// Decide what an add-to-cart request does.
///
/// An explicit update for a product not yet in the cart proceeds as an
/// update; the backend creates the entry.
#[must_use]
pub const fn decide(is_authenticated: bool, already_in_cart: bool, mode: AddMode) -> AddDecision {
    match (is_authenticated, already_in_cart, mode) {
        (false, _, _) => AddDecision::RejectAuthRequired,
        (true, true, AddMode::Insert) => AddDecision::RejectDuplicate,
        (true, false, AddMode::Insert) => AddDecision::Insert,
        (true, _, AddMode::Update) => AddDecision::UpdateQuantity,
    }
}

// =============================================================================
// CartService
// =============================================================================

/// Holds the backend's cart entries and performs cart requests.
///
/// Cheap to clone; clones share the same cart.
#[derive(Clone)]
pub struct CartService {
    inner: Arc<CartServiceInner>,
}

struct CartServiceInner {
    client: StorefrontClient,
    notifier: Arc<dyn Notifier>,
    entries: watch::Sender<Vec<CartEntry>>,
}

impl CartService {
    #[must_use]
    pub fn new(client: StorefrontClient, notifier: Arc<dyn Notifier>) -> Self {
        let (entries, _) = watch::channel(Vec::new());
        Self {
            inner: Arc::new(CartServiceInner {
                client,
                notifier,
                entries,
            }),
        }
    }

    /// Last cart entry list returned by the backend.
    #[must_use]
    pub fn entries(&self) -> Vec<CartEntry> {
        self.inner.entries.borrow().clone()
    }

    /// Follow cart changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<CartEntry>> {
        self.inner.entries.subscribe()
    }

    /// Display-ready line items for the current cart.
    #[must_use]
    pub fn line_items(&self, catalog: &[Product]) -> Vec<CartLineItem> {
        reconcile(&self.inner.entries.borrow(), catalog)
    }

    /// Forget the held cart.
    pub fn clear(&self) {
        self.inner.entries.send_replace(Vec::new());
    }

    /// Load the cart from the backend.
    ///
    /// Without a token nothing is sent and the cart is empty. On failure the
    /// cart falls back to empty and an error notification is emitted.
    ///
    /// # Errors
    ///
    /// Returns the request error after notifying it.
    #[instrument(skip_all, fields(username = session.username()))]
    pub async fn fetch(&self, session: &Session) -> Result<Vec<CartEntry>> {
        if !session.is_authenticated() {
            debug!("No session token, skipping cart fetch");
            self.clear();
            return Ok(Vec::new());
        }

        match self.inner.client.get_cart(session).await {
            Ok(entries) => {
                self.inner.entries.send_replace(entries.clone());
                Ok(entries)
            }
            Err(e) => {
                self.clear();
                e.capture();
                self.inner
                    .notifier
                    .notify(Notification::error(e.user_message(CART_FETCH_FAILED)));
                Err(e)
            }
        }
    }

    /// Add `product_id` to the cart, or set its quantity in
    /// [`AddMode::Update`].
    ///
    /// Rejected requests are never sent and produce a warning notification.
    /// On success the backend's full cart replaces the held one, silently.
    ///
    /// # Errors
    ///
    /// Returns `AuthRequired`, `DuplicateItem`, or `Validation` (zero quantity
    /// outside [`AddMode::Update`]) for rejected requests, and
    /// the request error (after notifying it) for failed ones.
    #[instrument(skip(self, session), fields(product_id = %product_id))]
    pub async fn add_to_cart(
        &self,
        session: &Session,
        product_id: &ProductId,
        qty: u32,
        mode: AddMode,
    ) -> Result<Vec<CartEntry>> {
        let already_in_cart = contains_product(&self.inner.entries.borrow(), product_id);

        match decide(session.is_authenticated(), already_in_cart, mode) {
            AddDecision::RejectAuthRequired => Err(self.reject(ClientError::AuthRequired)),
            AddDecision::RejectDuplicate => Err(self.reject(ClientError::DuplicateItem)),
            AddDecision::Insert if qty == 0 => Err(self.reject(ClientError::Validation(
                ZERO_QUANTITY_INSERT.to_string(),
            ))),
            decision @ (AddDecision::Insert | AddDecision::UpdateQuantity) => {
                debug!(?decision, qty, "Sending cart update");
                match self
                    .inner
                    .client
                    .update_cart(session, product_id, qty)
                    .await
                {
                    Ok(entries) => {
                        self.inner.entries.send_replace(entries.clone());
                        Ok(entries)
                    }
                    Err(e) => {
                        e.capture();
                        self.inner
                            .notifier
                            .notify(Notification::error(e.user_message(BACKEND_UNREACHABLE)));
                        Err(e)
                    }
                }
            }
        }
    }

    fn reject(&self, error: ClientError) -> ClientError {
        debug!(error = %error, "Add to cart rejected locally");
        self.inner
            .notifier
            .notify(Notification::warning(error.to_string()));
        error
    }
}

impl std::fmt::Debug for CartService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartService")
            .field("entries", &*self.inner.entries.borrow())
            .finish_non_exhaustive()
    }
}
