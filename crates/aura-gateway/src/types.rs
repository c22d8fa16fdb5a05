//! Wire types for the trial-request backend.
//!
//! The backend stores one product per request and issues integer ids; the
//! types here bridge that shape to the domain records in `aura_core`.

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use aura_core::trials::{DEFAULT_QUANTITY, DEFAULT_TRIAL_DURATION_DAYS};
use aura_core::{
    CustomerIdentity, NewTrialRequest, ProductId, ProductSnapshot, TrialId, TrialRequest,
    TrialStatus,
};

use crate::error::GatewayError;

/// Body of `POST /trial-requests`.
#[derive(Debug, Serialize)]
pub struct CreateTrialBody<'a> {
    pub product_id: &'a ProductId,
    /// Present only when the request covers more than one product.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_ids: Option<Vec<&'a ProductId>>,
    pub quantity: u32,
    pub trial_duration_days: u32,
    pub reason: Option<&'a str>,
    pub customer_notes: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<&'a str>,
}

impl<'a> CreateTrialBody<'a> {
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidPayload`] when `request` has no products.
    pub fn from_request(request: &'a NewTrialRequest) -> Result<Self, GatewayError> {
        let first = request.products.first().ok_or_else(|| {
            GatewayError::InvalidPayload("trial request has no products".to_owned())
        })?;
        let product_ids = (request.products.len() > 1)
            .then(|| request.products.iter().map(|p| &p.id).collect());

        Ok(Self {
            product_id: &first.id,
            product_ids,
            quantity: request.quantity,
            trial_duration_days: request.trial_duration_days,
            reason: request.reason.as_deref(),
            customer_notes: request.memo.as_deref(),
            customer_name: request.customer.as_ref().map(|c| c.name.as_str()),
            customer_email: request.customer.as_ref().map(|c| c.email.as_str()),
        })
    }
}

/// Body of `PATCH /trial-requests/{id}/status`.
#[derive(Debug, Serialize)]
pub struct StatusUpdateBody<'a> {
    pub status: TrialStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staff_notes: Option<&'a str>,
}

/// Collection endpoints answer either `{ "items": [...] }` or a bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Listing<T> {
    Wrapped { items: Vec<T> },
    Bare(Vec<T>),
}

impl<T> Listing<T> {
    pub fn into_items(self) -> Vec<T> {
        match self {
            Listing::Wrapped { items } | Listing::Bare(items) => items,
        }
    }
}

/// A trial request as the backend serialises it.
#[derive(Debug, Deserialize)]
pub struct RemoteTrialRecord {
    pub id: TrialId,
    #[serde(default)]
    pub product_id: Option<ProductId>,
    #[serde(default)]
    pub product_ids: Vec<ProductId>,
    #[serde(default)]
    pub products: Vec<ProductSnapshot>,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub product_category: Option<String>,
    #[serde(default)]
    pub unit_price: Option<Decimal>,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default = "default_duration")]
    pub trial_duration_days: u32,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default, alias = "memo")]
    pub customer_notes: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    pub status: TrialStatus,
    #[serde(default)]
    pub staff_notes: Option<String>,
    #[serde(deserialize_with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_quantity() -> u32 {
    DEFAULT_QUANTITY
}

fn default_duration() -> u32 {
    DEFAULT_TRIAL_DURATION_DAYS
}

impl RemoteTrialRecord {
    /// Converts to the domain record. Snapshots embedded in the payload win;
    /// otherwise they are rebuilt from the flat product columns.
    #[must_use]
    pub fn into_request(mut self) -> TrialRequest {
        let products = if self.products.is_empty() {
            self.flat_snapshots()
        } else {
            std::mem::take(&mut self.products)
        };
        let customer = match (self.customer_name, self.customer_email) {
            (None, None) => None,
            (name, email) => Some(CustomerIdentity {
                name: name.unwrap_or_default(),
                email: email.unwrap_or_default(),
            }),
        };

        TrialRequest {
            id: self.id,
            products,
            memo: aura_core::trials::normalize_text(self.customer_notes),
            customer,
            quantity: self.quantity,
            trial_duration_days: self.trial_duration_days,
            reason: aura_core::trials::normalize_text(self.reason),
            status: self.status,
            staff_notes: aura_core::trials::normalize_text(self.staff_notes),
            created_at: self.created_at,
            updated_at: self.updated_at.unwrap_or(self.created_at),
        }
    }

    /// Converts the answer to a create call, keeping the snapshots that were
    /// submitted and filling fields the backend did not echo.
    #[must_use]
    pub fn into_created(self, submitted: &NewTrialRequest) -> TrialRequest {
        let mut record = self.into_request();
        record.products.clone_from(&submitted.products);
        if record.memo.is_none() {
            record.memo.clone_from(&submitted.memo);
        }
        if record.customer.is_none() {
            record.customer.clone_from(&submitted.customer);
        }
        if record.reason.is_none() {
            record.reason.clone_from(&submitted.reason);
        }
        record
    }

    fn flat_snapshots(&self) -> Vec<ProductSnapshot> {
        let ids: Vec<ProductId> = if self.product_ids.is_empty() {
            self.product_id.iter().cloned().collect()
        } else {
            self.product_ids.clone()
        };

        ids.into_iter()
            .enumerate()
            .map(|(i, id)| {
                let primary = i == 0;
                ProductSnapshot {
                    name: self
                        .product_name
                        .clone()
                        .filter(|_| primary)
                        .unwrap_or_else(|| id.to_string()),
                    price: self.unit_price.filter(|_| primary).unwrap_or_default(),
                    category: self
                        .product_category
                        .as_deref()
                        .filter(|_| primary)
                        .and_then(|c| c.parse().ok()),
                    id,
                }
            })
            .collect()
    }
}

/// Accepts RFC 3339 and the offset-less ISO form the backend emits, which
/// is UTC.
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| format!("invalid timestamp '{raw}': {e}"))
}

fn timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}

fn optional_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) => parse_timestamp(&raw)
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}
