//! HTTP side of AuraSelect: the trial-request backend, the catalog service
//! and session resolution.
//!
//! Consumers depend on the [`TrialGateway`], [`CatalogSource`] and
//! [`SessionResolver`] traits; [`HttpGateway`] implements all three over
//! `reqwest`.

pub mod client;
pub mod error;
pub mod gateway;
pub(crate) mod retry;
pub mod types;

pub use client::HttpGateway;
pub use error::GatewayError;
pub use gateway::{CatalogSource, SessionResolver, TrialGateway};
