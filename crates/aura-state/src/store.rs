use std::cmp::Ordering;
use std::str::FromStr;
use std::sync::Arc;

use tokio::sync::watch;

use aura_core::{Cart, Category, CoreError, Product, ProductId, Settings, Theme, TrialRequest};
use aura_trials::{
    submit_cart, CartSubmitError, RequestListObserver, Sourced, SubmitOptions, TrialSubmitter,
};

use crate::error::StateError;
use crate::settings::SettingsStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProductSort {
    #[default]
    Name,
    Price,
    Rating,
}

impl FromStr for ProductSort {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "name" => Ok(ProductSort::Name),
            "price" => Ok(ProductSort::Price),
            "rating" => Ok(ProductSort::Rating),
            _ => Err(CoreError::UnknownVariant {
                kind: "product sort",
                value: s.to_owned(),
            }),
        }
    }
}

/// One immutable view of the application. Subscribers receive a fresh
/// snapshot after every mutation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    pub products: Vec<Product>,
    /// Sequence number of the catalog fetch that produced `products`;
    /// 0 until a catalog has been applied.
    pub catalog_seq: u64,
    pub cart: Cart,
    pub selected_category: Option<Category>,
    pub search_query: String,
    pub product_sort: ProductSort,
    /// Mirror of known trial requests, newest first.
    pub trial_requests: Vec<TrialRequest>,
    pub settings: Settings,
}

impl AppState {
    /// Active products after the category and search filters, in the
    /// selected order. Name sorts A-Z, price low to high, rating high to low.
    #[must_use]
    pub fn visible_products(&self) -> Vec<&Product> {
        let mut visible: Vec<&Product> = self
            .products
            .iter()
            .filter(|p| p.is_active)
            .filter(|p| self.selected_category.is_none_or(|c| p.category == c))
            .filter(|p| p.matches_search(&self.search_query))
            .collect();

        visible.sort_by(|a, b| {
            let primary = match self.product_sort {
                ProductSort::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
                ProductSort::Price => a.price.cmp(&b.price),
                ProductSort::Rating => b.rating.partial_cmp(&a.rating).unwrap_or(Ordering::Equal),
            };
            primary.then_with(|| a.id.cmp(&b.id))
        });
        visible
    }
}

pub struct AppStore {
    state: watch::Sender<AppState>,
    settings: Arc<dyn SettingsStore>,
}

impl std::fmt::Debug for AppStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppStore")
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl AppStore {
    /// Builds a store with default state and the persisted settings. An
    /// unreadable settings file is logged and replaced by defaults.
    pub fn new(settings: Arc<dyn SettingsStore>) -> Self {
        let restored = match settings.load() {
            Ok(Some(saved)) => saved,
            Ok(None) => Settings::default(),
            Err(e) => {
                tracing::warn!(error = %e, "could not restore settings, using defaults");
                Settings::default()
            }
        };
        let (state, _) = watch::channel(AppState {
            settings: restored,
            ..AppState::default()
        });
        Self { state, settings }
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AppState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn snapshot(&self) -> AppState {
        self.state.borrow().clone()
    }

    /// Replaces the catalog if `seq` is newer than the one applied. Returns
    /// whether the update was applied; stale updates leave the state and
    /// subscribers untouched.
    pub fn set_products(&self, seq: u64, products: Vec<Product>) -> bool {
        let mut current = 0;
        let applied = self.state.send_if_modified(|state| {
            current = state.catalog_seq;
            if seq <= state.catalog_seq {
                return false;
            }
            state.catalog_seq = seq;
            state.products = products;
            true
        });
        if !applied {
            tracing::debug!(seq, current, "discarding stale catalog");
        }
        applied
    }

    /// Returns `false` when a product with the same id is already in the cart.
    pub fn add_to_cart(&self, product: Product) -> bool {
        self.state.send_if_modified(|state| state.cart.add(product))
    }

    pub fn remove_from_cart(&self, id: &ProductId) -> bool {
        self.state.send_if_modified(|state| state.cart.remove(id))
    }

    /// Empties the cart and its memo.
    pub fn clear_cart(&self) {
        self.state.send_modify(|state| state.cart.clear());
    }

    pub fn set_memo(&self, memo: impl Into<String>) {
        let memo = memo.into();
        self.state.send_modify(|state| state.cart.set_memo(memo));
    }

    pub fn set_category(&self, category: Option<Category>) {
        self.state
            .send_modify(|state| state.selected_category = category);
    }

    pub fn set_search_query(&self, query: impl Into<String>) {
        let query = query.into();
        self.state.send_modify(|state| state.search_query = query);
    }

    pub fn set_product_sort(&self, sort: ProductSort) {
        self.state.send_modify(|state| state.product_sort = sort);
    }

    pub fn set_trial_requests(&self, requests: Vec<TrialRequest>) {
        self.state
            .send_modify(|state| state.trial_requests = requests);
    }

    /// Applies and persists the theme.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] if persisting fails; the in-memory state keeps
    /// the new theme.
    pub fn set_theme(&self, theme: Theme) -> Result<(), StateError> {
        self.update_settings(|s| s.theme = theme)
    }

    /// Applies and persists the notification preference.
    ///
    /// # Errors
    ///
    /// Same as [`AppStore::set_theme`].
    pub fn set_notifications(&self, enabled: bool) -> Result<(), StateError> {
        self.update_settings(|s| s.notifications = enabled)
    }

    fn update_settings(&self, change: impl FnOnce(&mut Settings)) -> Result<(), StateError> {
        let mut updated = Settings::default();
        self.state.send_modify(|state| {
            change(&mut state.settings);
            updated = state.settings;
        });
        self.settings.save(&updated).inspect_err(|e| {
            tracing::warn!(error = %e, "failed to persist settings");
        })
    }

    /// Submits the current cart through `submitter`. On full success the
    /// submitted items and the memo are removed from the cart; on any
    /// failure the cart is left as it was.
    ///
    /// # Errors
    ///
    /// Whatever [`submit_cart`] returns.
    pub async fn submit_trial_cart<S: TrialSubmitter + ?Sized>(
        &self,
        submitter: &S,
        options: &SubmitOptions,
    ) -> Result<Vec<Sourced<TrialRequest>>, CartSubmitError> {
        let cart = self.state.borrow().cart.clone();
        let created = submit_cart(submitter, &cart, options).await?;

        self.state.send_modify(|state| {
            for item in cart.items() {
                state.cart.remove(&item.id);
            }
            if state.cart.memo() == cart.memo() {
                state.cart.set_memo(String::new());
            }
        });
        tracing::info!(count = created.len(), "trial cart submitted");
        Ok(created)
    }
}

impl RequestListObserver for AppStore {
    fn requests_changed(&self, requests: &[TrialRequest]) {
        self.set_trial_requests(requests.to_vec());
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
