//! Application state for the AuraSelect storefront and staff desk.
//!
//! [`AppStore`] owns one [`AppState`] snapshot behind a `tokio::sync::watch`
//! channel. Every setter replaces the snapshot synchronously and wakes
//! subscribers; only the theme and notification settings are persisted.

pub mod error;
pub mod refresh;
pub mod settings;
pub mod store;

pub use error::StateError;
pub use refresh::{spawn_catalog_refresh, CatalogOrigin, CatalogRefresher, RefreshOutcome};
pub use settings::{JsonFileSettings, MemorySettings, SettingsStore};
pub use store::{AppState, AppStore, ProductSort};
