use std::sync::Mutex;

use async_trait::async_trait;
use rust_decimal::Decimal;

use aura_core::{NewTrialRequest, TrialId};
use aura_trials::TrialError;

use super::*;
use crate::settings::{JsonFileSettings, MemorySettings};

fn product(id: &str, name: &str, price: i64, category: Category) -> Product {
    Product {
        id: ProductId::from(id),
        name: name.to_owned(),
        price: Decimal::new(price, 0),
        category,
        description: format!("{name} for salon use"),
        ingredients: String::new(),
        fragrance: String::new(),
        tags: Vec::new(),
        stock: 10,
        rating: 4.0,
        is_active: true,
        is_new: false,
        is_popular: false,
        is_limited: false,
    }
}

fn store() -> AppStore {
    AppStore::new(Arc::new(MemorySettings::default()))
}

/// Accepts payloads until `fail_at`, recording each one.
#[derive(Default)]
struct Recording {
    payloads: Mutex<Vec<NewTrialRequest>>,
    fail_at: Option<usize>,
}

#[async_trait]
impl TrialSubmitter for Recording {
    async fn submit(&self, request: NewTrialRequest) -> Result<Sourced<TrialRequest>, TrialError> {
        let mut payloads = self.payloads.lock().unwrap();
        let index = payloads.len();
        payloads.push(request.clone());
        if self.fail_at == Some(index) {
            return Err(TrialError::NotFound(TrialId::from("boom")));
        }
        Ok(Sourced::remote(request.into_record(
            TrialId(index.to_string()),
            chrono::Utc::now(),
        )))
    }
}

#[tokio::test]
async fn submitting_a_cart_sends_one_request_and_clears_cart_and_memo() {
    let store = store();
    store.add_to_cart(product("1", "Serum", 12800, Category::Skincare));
    store.set_memo("dry skin");
    let submitter = Recording::default();

    let created = store
        .submit_trial_cart(&submitter, &SubmitOptions::default())
        .await
        .unwrap();

    assert_eq!(created.len(), 1);
    let payloads = submitter.payloads.lock().unwrap();
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0].products[0].name, "Serum");
    assert_eq!(payloads[0].products[0].price, Decimal::new(12800, 0));
    assert_eq!(payloads[0].memo.as_deref(), Some("dry skin"));

    let state = store.snapshot();
    assert!(state.cart.is_empty());
    assert_eq!(state.cart.memo(), "");
}

#[tokio::test]
async fn partial_failure_leaves_the_cart_alone() {
    let store = store();
    store.add_to_cart(product("1", "P1", 1000, Category::Shampoo));
    store.add_to_cart(product("2", "P2", 2000, Category::Shampoo));
    store.set_memo("both please");
    let submitter = Recording {
        fail_at: Some(1),
        ..Recording::default()
    };

    let err = store
        .submit_trial_cart(&submitter, &SubmitOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CartSubmitError::Partial { ref submitted, .. } if submitted.len() == 1
    ));
    let state = store.snapshot();
    assert_eq!(state.cart.len(), 2);
    assert_eq!(state.cart.memo(), "both please");
}

#[tokio::test]
async fn empty_cart_is_rejected_without_submissions() {
    let store = store();
    let submitter = Recording::default();

    let err = store
        .submit_trial_cart(&submitter, &SubmitOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, CartSubmitError::Validation(CoreError::EmptyProducts)));
    assert!(submitter.payloads.lock().unwrap().is_empty());
}

#[test]
fn adding_the_same_product_twice_keeps_one_entry() {
    let store = store();
    let serum = product("1", "Serum", 12800, Category::Skincare);
    assert!(store.add_to_cart(serum.clone()));
    assert!(!store.add_to_cart(serum));
    assert_eq!(store.snapshot().cart.len(), 1);
}

#[test]
fn stale_catalog_updates_are_discarded() {
    let store = store();
    let mut rx = store.subscribe();

    assert!(store.set_products(2, vec![product("new", "New", 1, Category::Other)]));
    assert!(rx.has_changed().unwrap());
    rx.borrow_and_update();

    assert!(!store.set_products(1, vec![product("old", "Old", 1, Category::Other)]));
    assert!(!store.set_products(2, Vec::new()));
    assert!(!rx.has_changed().unwrap());

    let state = store.snapshot();
    assert_eq!(state.catalog_seq, 2);
    assert_eq!(state.products[0].id.as_str(), "new");
}

#[tokio::test]
async fn subscribers_observe_each_mutation() {
    let store = store();
    let mut rx = store.subscribe();

    store.set_search_query("serum");
    rx.changed().await.unwrap();
    assert_eq!(rx.borrow_and_update().search_query, "serum");

    store.set_category(Some(Category::Skincare));
    rx.changed().await.unwrap();
    assert_eq!(
        rx.borrow_and_update().selected_category,
        Some(Category::Skincare)
    );
}

#[test]
fn visible_products_filter_and_sort() {
    let store = store();
    let mut retired = product("9", "Retired Serum", 100, Category::Skincare);
    retired.is_active = false;
    let mut cheap = product("2", "basic serum", 900, Category::Skincare);
    cheap.rating = 3.1;
    let mut premium = product("1", "Advanced Serum", 12800, Category::Skincare);
    premium.rating = 4.9;
    store.set_products(
        1,
        vec![
            premium,
            cheap,
            retired,
            product("3", "Shampoo", 2800, Category::Shampoo),
        ],
    );

    store.set_category(Some(Category::Skincare));
    let ids = |s: &AppState| -> Vec<String> {
        s.visible_products().iter().map(|p| p.id.to_string()).collect()
    };
    assert_eq!(ids(&store.snapshot()), vec!["1", "2"]);

    store.set_product_sort(ProductSort::Price);
    assert_eq!(ids(&store.snapshot()), vec!["2", "1"]);

    store.set_product_sort(ProductSort::Rating);
    assert_eq!(ids(&store.snapshot()), vec!["1", "2"]);

    store.set_category(None);
    store.set_search_query("SHAMPOO");
    assert_eq!(ids(&store.snapshot()), vec!["3"]);
}

#[test]
fn settings_survive_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");

    let first = AppStore::new(Arc::new(JsonFileSettings::new(&path)));
    assert_eq!(first.snapshot().settings, Settings::default());
    first.set_theme(Theme::Dark).unwrap();
    first.set_notifications(false).unwrap();
    first.add_to_cart(product("1", "Serum", 12800, Category::Skincare));

    let second = AppStore::new(Arc::new(JsonFileSettings::new(&path)));
    let state = second.snapshot();
    assert_eq!(state.settings.theme, Theme::Dark);
    assert!(!state.settings.notifications);
    assert!(state.cart.is_empty(), "only settings are persisted");
}

#[test]
fn corrupt_settings_fall_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(&path, "]]").unwrap();

    let store = AppStore::new(Arc::new(JsonFileSettings::new(&path)));
    assert_eq!(store.snapshot().settings, Settings::default());
}

#[test]
fn product_sort_parses() {
    assert_eq!("Rating".parse::<ProductSort>().unwrap(), ProductSort::Rating);
    assert!("popularity".parse::<ProductSort>().is_err());
}

#[test]
fn observer_updates_the_request_mirror() {
    let store = store();
    let serum = product("1", "Serum", 1, Category::Skincare);
    let record = NewTrialRequest::for_products(vec![serum.snapshot()])
        .into_record(TrialId::from("1"), chrono::Utc::now());

    store.requests_changed(std::slice::from_ref(&record));

    assert_eq!(store.snapshot().trial_requests, vec![record]);
}
