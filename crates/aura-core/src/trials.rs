//! Trial requests and the lifecycle they move through.
//!
//! A trial request is a customer's ask to try products at the salon. Staff
//! move it through a fixed transition graph:
//!
//! | From          | Event      | To            |
//! |---------------|------------|---------------|
//! | `pending`     | `approve`  | `approved`    |
//! | `pending`     | `reject`   | `rejected`    |
//! | `pending`     | `cancel`   | `cancelled`   |
//! | `approved`    | `start`    | `in_progress` |
//! | `approved`    | `complete` | `completed`   |
//! | `approved`    | `cancel`   | `cancelled`   |
//! | `in_progress` | `complete` | `completed`   |
//! | `in_progress` | `cancel`   | `cancelled`   |
//!
//! `rejected`, `completed` and `cancelled` are terminal.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::identity::CustomerIdentity;
use crate::products::{string_or_number, ProductSnapshot};
use crate::CoreError;

pub const DEFAULT_QUANTITY: u32 = 1;
pub const DEFAULT_TRIAL_DURATION_DAYS: u32 = 7;
const QUANTITY_RANGE: std::ops::RangeInclusive<u32> = 1..=10;
const DURATION_RANGE: std::ops::RangeInclusive<u32> = 1..=30;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct TrialId(pub String);

impl<'de> Deserialize<'de> for TrialId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        string_or_number(deserializer).map(Self)
    }
}

impl TrialId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TrialId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl std::fmt::Display for TrialId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Variant order is lifecycle order; sorting by status uses it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialStatus {
    Pending,
    Approved,
    InProgress,
    Completed,
    Rejected,
    Cancelled,
}

impl TrialStatus {
    pub const ALL: [TrialStatus; 6] = [
        TrialStatus::Pending,
        TrialStatus::Approved,
        TrialStatus::InProgress,
        TrialStatus::Completed,
        TrialStatus::Rejected,
        TrialStatus::Cancelled,
    ];

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TrialStatus::Rejected | TrialStatus::Completed | TrialStatus::Cancelled
        )
    }

    /// Resolves `event` against the transition table.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTransition`] when the table has no row for
    /// `(self, event)`, which includes every event on a terminal status.
    pub fn apply(self, event: TrialEvent) -> Result<TrialStatus, InvalidTransition> {
        use TrialEvent::{Approve, Cancel, Complete, Reject, Start};
        use TrialStatus::{Approved, Cancelled, Completed, InProgress, Pending, Rejected};

        match (self, event) {
            (Pending, Approve) => Ok(Approved),
            (Pending, Reject) => Ok(Rejected),
            (Pending | Approved | InProgress, Cancel) => Ok(Cancelled),
            (Approved, Start) => Ok(InProgress),
            (Approved | InProgress, Complete) => Ok(Completed),
            _ => Err(InvalidTransition { from: self, event }),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TrialStatus::Pending => "pending",
            TrialStatus::Approved => "approved",
            TrialStatus::InProgress => "in_progress",
            TrialStatus::Completed => "completed",
            TrialStatus::Rejected => "rejected",
            TrialStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for TrialStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrialStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase().replace('-', "_");
        TrialStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == lowered)
            .ok_or_else(|| CoreError::UnknownVariant {
                kind: "trial status",
                value: s.to_owned(),
            })
    }
}

/// Staff actions on a trial request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialEvent {
    Approve,
    Reject,
    Start,
    Complete,
    Cancel,
}

impl TrialEvent {
    /// The status this event leads to when it is legal.
    #[must_use]
    pub fn target(self) -> TrialStatus {
        match self {
            TrialEvent::Approve => TrialStatus::Approved,
            TrialEvent::Reject => TrialStatus::Rejected,
            TrialEvent::Start => TrialStatus::InProgress,
            TrialEvent::Complete => TrialStatus::Completed,
            TrialEvent::Cancel => TrialStatus::Cancelled,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TrialEvent::Approve => "approve",
            TrialEvent::Reject => "reject",
            TrialEvent::Start => "start",
            TrialEvent::Complete => "complete",
            TrialEvent::Cancel => "cancel",
        }
    }
}

impl std::fmt::Display for TrialEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrialEvent {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "approve" => Ok(TrialEvent::Approve),
            "reject" => Ok(TrialEvent::Reject),
            "start" => Ok(TrialEvent::Start),
            "complete" => Ok(TrialEvent::Complete),
            "cancel" => Ok(TrialEvent::Cancel),
            _ => Err(CoreError::UnknownVariant {
                kind: "trial event",
                value: s.to_owned(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot {event} a trial request that is {from}")]
pub struct InvalidTransition {
    pub from: TrialStatus,
    pub event: TrialEvent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRequest {
    pub id: TrialId,
    /// Snapshots taken at submission; never re-read from the catalog.
    pub products: Vec<ProductSnapshot>,
    pub memo: Option<String>,
    pub customer: Option<CustomerIdentity>,
    pub quantity: u32,
    pub trial_duration_days: u32,
    pub reason: Option<String>,
    pub status: TrialStatus,
    /// Only the latest note is kept; each transition that carries notes
    /// overwrites the previous one.
    pub staff_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TrialRequest {
    /// Applies `event`, stamping `updated_at` and replacing the staff notes
    /// when new ones are given. Leaves `self` untouched on error.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTransition`] when the event is not legal from the
    /// current status.
    pub fn apply(
        &mut self,
        event: TrialEvent,
        staff_notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), InvalidTransition> {
        let next = self.status.apply(event)?;
        self.status = next;
        self.updated_at = now;
        if let Some(notes) = normalize_text(staff_notes) {
            self.staff_notes = Some(notes);
        }
        Ok(())
    }

    /// Case-insensitive match over customer name/email, memo and product names.
    #[must_use]
    pub fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        let hit = |text: &str| text.to_lowercase().contains(&needle);

        self.customer
            .as_ref()
            .is_some_and(|c| hit(&c.name) || hit(&c.email))
            || self.memo.as_deref().is_some_and(hit)
            || self.products.iter().any(|p| hit(&p.name))
    }
}

/// A creation payload, before an id or timestamps exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTrialRequest {
    pub products: Vec<ProductSnapshot>,
    pub memo: Option<String>,
    pub customer: Option<CustomerIdentity>,
    pub quantity: u32,
    pub trial_duration_days: u32,
    pub reason: Option<String>,
}

impl NewTrialRequest {
    #[must_use]
    pub fn for_products(products: Vec<ProductSnapshot>) -> Self {
        Self {
            products,
            memo: None,
            customer: None,
            quantity: DEFAULT_QUANTITY,
            trial_duration_days: DEFAULT_TRIAL_DURATION_DAYS,
            reason: None,
        }
    }

    /// Sets the memo; blank text is stored as no memo.
    #[must_use]
    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = normalize_text(Some(memo.into()));
        self
    }

    #[must_use]
    pub fn with_customer(mut self, customer: Option<CustomerIdentity>) -> Self {
        self.customer = customer;
        self
    }

    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = normalize_text(Some(reason.into()));
        self
    }

    /// Checks the payload before anything is sent anywhere.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EmptyProducts`], [`CoreError::QuantityOutOfRange`]
    /// or [`CoreError::DurationOutOfRange`].
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.products.is_empty() {
            return Err(CoreError::EmptyProducts);
        }
        if !QUANTITY_RANGE.contains(&self.quantity) {
            return Err(CoreError::QuantityOutOfRange(self.quantity));
        }
        if !DURATION_RANGE.contains(&self.trial_duration_days) {
            return Err(CoreError::DurationOutOfRange(self.trial_duration_days));
        }
        Ok(())
    }

    /// Builds a `pending` record stamped with `now`.
    #[must_use]
    pub fn into_record(self, id: TrialId, now: DateTime<Utc>) -> TrialRequest {
        TrialRequest {
            id,
            products: self.products,
            memo: normalize_text(self.memo),
            customer: self.customer,
            quantity: self.quantity,
            trial_duration_days: self.trial_duration_days,
            reason: normalize_text(self.reason),
            status: TrialStatus::Pending,
            staff_notes: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Per-status counts for the staff dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialStats {
    #[serde(alias = "total_requests")]
    pub total: u64,
    #[serde(default, alias = "pending_requests")]
    pub pending: u64,
    #[serde(default, alias = "approved_requests")]
    pub approved: u64,
    #[serde(default, alias = "rejected_requests")]
    pub rejected: u64,
    #[serde(default, alias = "completed_requests")]
    pub completed: u64,
    #[serde(default)]
    pub in_progress: u64,
    #[serde(default)]
    pub cancelled: u64,
}

impl TrialStats {
    #[must_use]
    pub fn from_requests<'a, I>(requests: I) -> Self
    where
        I: IntoIterator<Item = &'a TrialRequest>,
    {
        let mut stats = Self::default();
        for request in requests {
            stats.total += 1;
            match request.status {
                TrialStatus::Pending => stats.pending += 1,
                TrialStatus::Approved => stats.approved += 1,
                TrialStatus::InProgress => stats.in_progress += 1,
                TrialStatus::Completed => stats.completed += 1,
                TrialStatus::Rejected => stats.rejected += 1,
                TrialStatus::Cancelled => stats.cancelled += 1,
            }
        }
        stats
    }
}

/// Trims free text and maps blank input to `None`.
#[must_use]
pub fn normalize_text(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_owned()).filter(|t| !t.is_empty())
}

#[cfg(test)]
#[path = "trials_test.rs"]
mod tests;
