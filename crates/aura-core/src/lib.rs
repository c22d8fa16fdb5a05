pub mod app_config;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod identity;
pub mod products;
pub mod query;
pub mod settings;
pub mod trials;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use cart::Cart;
pub use catalog::{load_catalog, CatalogFile};
pub use config::{load_app_config, load_app_config_from_env};
pub use identity::{CustomerIdentity, Session, UserRole};
pub use products::{Category, Product, ProductId, ProductSnapshot};
pub use query::{SortDirection, TrialFilter, TrialSortKey};
pub use settings::{Settings, Theme};
pub use trials::{
    InvalidTransition, NewTrialRequest, TrialEvent, TrialId, TrialRequest, TrialStats, TrialStatus,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read catalog file {path}: {source}")]
    CatalogFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog file: {0}")]
    CatalogFileParse(#[from] serde_yaml::Error),

    #[error("catalog validation failed: {0}")]
    Validation(String),
}

/// Domain rule violations detected before anything leaves the process.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("a trial request needs at least one product")]
    EmptyProducts,

    #[error("quantity {0} is out of range (1-10)")]
    QuantityOutOfRange(u32),

    #[error("trial duration {0} days is out of range (1-30)")]
    DurationOutOfRange(u32),

    #[error("product {0} is not active and cannot be trialled")]
    InactiveProduct(ProductId),

    #[error("unknown {kind}: {value}")]
    UnknownVariant { kind: &'static str, value: String },
}
