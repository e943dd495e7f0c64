//! Storefront state shared by every front end.

use std::sync::Arc;

use tracing::info;

use qkart_core::{CartEntry, CartLineItem, Cost, ProductId};

use crate::api::StorefrontClient;
use crate::auth::AuthService;
use crate::cart::{self, AddMode, CartService};
use crate::catalog::CatalogFetcher;
use crate::config::StorefrontConfig;
use crate::debounce::SearchDebouncer;
use crate::error::Result;
use crate::notify::Notifier;
use crate::session::{FileSessionStore, Navigation, Session, SessionGate, SessionStore};

/// Catalog, cart and session for one user.
///
/// This struct is cheaply cloneable via `Arc`. The session is read from the
/// store on each call and passed explicitly to the cart and API client.
#[derive(Clone)]
pub struct Storefront {
    inner: Arc<StorefrontInner>,
}

struct StorefrontInner {
    config: StorefrontConfig,
    client: StorefrontClient,
    gate: SessionGate,
    catalog: CatalogFetcher,
    cart: CartService,
    auth: AuthService,
}

impl Storefront {
    /// Create storefront state.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        config: StorefrontConfig,
        store: Arc<dyn SessionStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let client = StorefrontClient::new(&config)?;
        let gate = SessionGate::new(store);
        let catalog = CatalogFetcher::new(client.clone(), notifier.clone());
        let cart = CartService::new(client.clone(), notifier);
        let auth = AuthService::new(client.clone(), gate.clone());

        Ok(Self {
            inner: Arc::new(StorefrontInner {
                config,
                client,
                gate,
                catalog,
                cart,
                auth,
            }),
        })
    }

    /// Create storefront state persisting the session to the configured file.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_file_session(
        config: StorefrontConfig,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let store = Arc::new(FileSessionStore::new(config.session_file.clone()));
        Self::new(config, store, notifier)
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn client(&self) -> &StorefrontClient {
        &self.inner.client
    }

    #[must_use]
    pub fn gate(&self) -> &SessionGate {
        &self.inner.gate
    }

    #[must_use]
    pub fn catalog(&self) -> &CatalogFetcher {
        &self.inner.catalog
    }

    #[must_use]
    pub fn cart(&self) -> &CartService {
        &self.inner.cart
    }

    #[must_use]
    pub fn auth(&self) -> &AuthService {
        &self.inner.auth
    }

    /// Current session context.
    #[must_use]
    pub fn session(&self) -> Session {
        self.inner.gate.session()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.gate.is_authenticated()
    }

    /// Header affordances for the current session.
    #[must_use]
    pub fn navigation(&self, on_auth_page: bool) -> Navigation {
        Navigation::for_session(&self.session(), on_auth_page)
    }

    /// Initial load: the full catalog and, when logged in, the cart.
    ///
    /// Failures are notified and reflected in catalog/cart state.
    pub async fn load(&self) {
        let session = self.session();
        let (catalog, cart) = tokio::join!(
            self.inner.catalog.fetch_all(),
            self.inner.cart.fetch(&session)
        );
        info!(
            catalog_ok = catalog.is_ok(),
            cart_ok = cart.is_ok(),
            "Storefront loaded"
        );
    }

    /// Debouncer feeding searches into this storefront's catalog.
    #[must_use]
    pub fn search_debouncer(&self) -> SearchDebouncer<CatalogFetcher> {
        SearchDebouncer::new(self.inner.catalog.clone(), self.inner.config.search_debounce)
    }

    /// Add to (or, in [`AddMode::Update`], set the quantity in) the cart.
    ///
    /// # Errors
    ///
    /// See [`CartService::add_to_cart`].
    pub async fn add_to_cart(
        &self,
        product_id: &ProductId,
        qty: u32,
        mode: AddMode,
    ) -> Result<Vec<CartEntry>> {
        let session = self.session();
        self.inner
            .cart
            .add_to_cart(&session, product_id, qty, mode)
            .await
    }

    /// Cart joined against the current catalog.
    #[must_use]
    pub fn line_items(&self) -> Vec<CartLineItem> {
        self.inner.cart.line_items(&self.inner.catalog.products())
    }

    /// Total cost of the current cart.
    #[must_use]
    pub fn cart_total(&self) -> Cost {
        cart::compute_total(&self.line_items())
    }

    /// Clear the persisted session and reset catalog and cart state.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store cannot be cleared.
    pub fn logout(&self) -> Result<()> {
        self.inner.gate.logout()?;
        self.inner.cart.clear();
        self.inner.catalog.reset();
        info!("Logged out");
        Ok(())
    }
}

impl std::fmt::Debug for Storefront {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storefront")
            .field("config", &self.inner.config)
            .field("gate", &self.inner.gate)
            .finish_non_exhaustive()
    }
}
