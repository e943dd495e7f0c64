//! Catalog fetcher.
//!
//! Owns the in-memory catalog and its presentation state. Every successful
//! fetch replaces the catalog wholesale. Observers follow changes through a
//! `tokio::sync::watch` channel.
//!
//! Each fetch takes a generation number. When a response arrives after a
//! newer fetch has been issued it is dropped, so a slow search cannot
//! overwrite the results of a later one.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;
use tracing::{debug, instrument};

use qkart_core::Product;

use crate::api::StorefrontClient;
use crate::debounce::SearchTarget;
use crate::error::{BACKEND_UNREACHABLE, Result};
use crate::notify::{Notification, Notifier};

/// What a product listing should display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogView {
    Loading,
    /// Fetch succeeded with no products ("No products found").
    Empty,
    Products(Vec<Product>),
    /// Latest fetch failed; carries the user-facing message.
    Failed(String),
}

/// Observable catalog state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogState {
    pub loading: bool,
    /// Last successfully fetched catalog.
    pub products: Vec<Product>,
    /// Message of the latest fetch, if it failed.
    pub error: Option<String>,
}

impl CatalogState {
    /// Presentation state derived from the raw fields.
    #[must_use]
    pub fn view(&self) -> CatalogView {
        if self.loading {
            CatalogView::Loading
        } else if let Some(message) = &self.error {
            CatalogView::Failed(message.clone())
        } else if self.products.is_empty() {
            CatalogView::Empty
        } else {
            CatalogView::Products(self.products.clone())
        }
    }
}

#[derive(Debug, Clone)]
enum CatalogRequest {
    All,
    Search(String),
}

/// Fetches the catalog and publishes its state.
///
/// Cheap to clone; clones share the same catalog.
#[derive(Clone)]
pub struct CatalogFetcher {
    inner: Arc<CatalogFetcherInner>,
}

struct CatalogFetcherInner {
    client: StorefrontClient,
    notifier: Arc<dyn Notifier>,
    issued: AtomicU64,
    state: watch::Sender<CatalogState>,
}

impl CatalogFetcher {
    #[must_use]
    pub fn new(client: StorefrontClient, notifier: Arc<dyn Notifier>) -> Self {
        let (state, _) = watch::channel(CatalogState::default());
        Self {
            inner: Arc::new(CatalogFetcherInner {
                client,
                notifier,
                issued: AtomicU64::new(0),
                state,
            }),
        }
    }

    /// Fetch the full catalog.
    ///
    /// # Errors
    ///
    /// Returns the request error; the previous catalog is kept.
    pub async fn fetch_all(&self) -> Result<Vec<Product>> {
        self.fetch(CatalogRequest::All).await
    }

    /// Fetch products matching `term`. No matches is an empty success.
    ///
    /// # Errors
    ///
    /// Returns the request error; the previous catalog is kept.
    pub async fn fetch_by_search(&self, term: &str) -> Result<Vec<Product>> {
        self.fetch(CatalogRequest::Search(term.to_owned())).await
    }

    #[instrument(skip(self))]
    async fn fetch(&self, request: CatalogRequest) -> Result<Vec<Product>> {
        let generation = self.inner.issued.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.state.send_modify(|state| state.loading = true);

        let result = match &request {
            CatalogRequest::All => self.inner.client.get_products().await,
            CatalogRequest::Search(term) => self.inner.client.search_products(term).await,
        };

        if self.inner.issued.load(Ordering::SeqCst) != generation {
            debug!(generation, "Discarding stale catalog response");
            return result;
        }

        match &result {
            Ok(products) => {
                debug!(count = products.len(), "Catalog replaced");
                let products = products.clone();
                self.inner.state.send_modify(|state| {
                    state.loading = false;
                    state.products = products;
                    state.error = None;
                });
            }
            Err(e) => {
                e.capture();
                let message = e.user_message(BACKEND_UNREACHABLE);
                self.inner.notifier.notify(Notification::error(message.clone()));
                self.inner.state.send_modify(|state| {
                    state.loading = false;
                    state.error = Some(message);
                });
            }
        }

        result
    }

    /// Current catalog (last successful fetch).
    #[must_use]
    pub fn products(&self) -> Vec<Product> {
        self.inner.state.borrow().products.clone()
    }

    /// Current presentation state.
    #[must_use]
    pub fn view(&self) -> CatalogView {
        self.inner.state.borrow().view()
    }

    /// Whether a fetch is outstanding.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().loading
    }

    /// Follow catalog state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CatalogState> {
        self.inner.state.subscribe()
    }

    /// Forget the catalog and invalidate in-flight fetches.
    pub fn reset(&self) {
        self.inner.issued.fetch_add(1, Ordering::SeqCst);
        self.inner.state.send_replace(CatalogState::default());
    }
}

impl SearchTarget for CatalogFetcher {
    fn search(&self, term: String) -> impl Future<Output = ()> + Send + 'static {
        let fetcher = self.clone();
        async move {
            // Failures are already notified and recorded in the state.
            let _ = fetcher.fetch_by_search(&term).await;
        }
    }
}

impl std::fmt::Debug for CatalogFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogFetcher")
            .field("client", &self.inner.client)
            .field("state", &*self.inner.state.borrow())
            .finish_non_exhaustive()
    }
}
