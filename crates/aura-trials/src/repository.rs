//! Trial-request repository.
//!
//! Every call goes to the backend first. When the exchange fails, whether
//! the backend is unreachable or answers with a non-2xx status, the
//! repository answers from [`LocalFallbackStore`] instead and tags the
//! result with [`Source::Local`]. Only a refused status change and errors
//! raised before anything was sent are surfaced.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use aura_core::{NewTrialRequest, TrialEvent, TrialFilter, TrialId, TrialRequest, TrialStats};
use aura_gateway::{GatewayError, TrialGateway};

use crate::error::TrialError;
use crate::fallback::LocalFallbackStore;

/// Where an answer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Remote,
    Local,
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::Remote => write!(f, "remote"),
            Source::Local => write!(f, "local"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sourced<T> {
    pub source: Source,
    pub value: T,
}

impl<T> Sourced<T> {
    pub fn remote(value: T) -> Self {
        Self {
            source: Source::Remote,
            value,
        }
    }

    pub fn local(value: T) -> Self {
        Self {
            source: Source::Local,
            value,
        }
    }

    #[must_use]
    pub fn is_local(&self) -> bool {
        self.source == Source::Local
    }
}

/// Receives the full mirrored list, newest first, after every change.
pub trait RequestListObserver: Send + Sync {
    fn requests_changed(&self, requests: &[TrialRequest]);
}

pub struct TrialRepository<G> {
    gateway: G,
    fallback: Arc<LocalFallbackStore>,
    observer: Option<Arc<dyn RequestListObserver>>,
}

impl<G: TrialGateway> TrialRepository<G> {
    pub fn new(gateway: G) -> Self {
        Self::with_fallback(gateway, Arc::new(LocalFallbackStore::new()))
    }

    pub fn with_fallback(gateway: G, fallback: Arc<LocalFallbackStore>) -> Self {
        Self {
            gateway,
            fallback,
            observer: None,
        }
    }

    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn RequestListObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn fallback(&self) -> &LocalFallbackStore {
        &self.fallback
    }

    /// The last-known copy of a record, remote or local.
    #[must_use]
    pub fn find(&self, id: &TrialId) -> Option<TrialRequest> {
        self.fallback.get(id)
    }

    /// Validates and submits `request`. Falls back to a local `pending`
    /// record when the backend exchange fails.
    ///
    /// # Errors
    ///
    /// [`TrialError::Validation`] before any network call, or
    /// [`TrialError::Network`] when the request could not be built.
    pub async fn create(
        &self,
        request: NewTrialRequest,
    ) -> Result<Sourced<TrialRequest>, TrialError> {
        request.validate()?;

        let result = match self.gateway.create_trial(&request).await {
            Ok(created) => Sourced::remote(self.fallback.upsert(created)),
            Err(e) if e.is_client_side() => return Err(e.into()),
            Err(e) => {
                let now = Utc::now();
                let record = request.into_record(self.fallback.next_id(now), now);
                tracing::warn!(
                    error = %e,
                    id = %record.id,
                    "backend failed, trial request stored locally"
                );
                Sourced::local(self.fallback.upsert(record))
            }
        };

        self.notify();
        Ok(result)
    }

    /// Lists requests matching `filter`. Remote results refresh the mirror
    /// and are merged with records minted locally, which the backend has
    /// never seen. An unfiltered listing is complete, so mirrored backend
    /// records missing from it are dropped. When the backend exchange fails
    /// the whole mirror is filtered instead. Both paths run through
    /// [`TrialFilter::apply`].
    ///
    /// # Errors
    ///
    /// [`TrialError::Network`] only when the request could not be built.
    pub async fn list(
        &self,
        filter: &TrialFilter,
    ) -> Result<Sourced<Vec<TrialRequest>>, TrialError> {
        match self.gateway.list_trials(filter).await {
            Ok(records) => {
                let mut visible = if filter.selects_all() {
                    self.fallback.replace_remote(records)
                } else {
                    self.fallback.upsert_all(records)
                };
                visible.extend(
                    self.fallback
                        .snapshot()
                        .into_iter()
                        .filter(|r| LocalFallbackStore::is_local_id(&r.id)),
                );
                self.notify();
                Ok(Sourced::remote(filter.apply(visible)))
            }
            Err(e) if e.is_client_side() => Err(e.into()),
            Err(e) => {
                tracing::warn!(error = %e, "backend failed, listing local mirror");
                Ok(Sourced::local(filter.apply(self.fallback.snapshot())))
            }
        }
    }

    /// Applies `event` to the record with `id`.
    ///
    /// Legality is checked against the mirrored status first; an illegal
    /// event never reaches the backend. Records minted locally are only
    /// ever changed locally.
    ///
    /// # Errors
    ///
    /// - [`TrialError::InvalidTransition`] or [`TrialError::Refused`] for an
    ///   illegal event, including a 400/409/422 answer from the backend; the
    ///   record is left unchanged.
    /// - [`TrialError::NotFound`] when neither side knows `id`.
    /// - [`TrialError::Network`] when the backend exchange fails and the
    ///   record is not mirrored, or the request could not be built.
    pub async fn transition(
        &self,
        id: &TrialId,
        event: TrialEvent,
        staff_notes: Option<String>,
    ) -> Result<Sourced<TrialRequest>, TrialError> {
        let known = self.fallback.get(id);
        if let Some(record) = &known {
            record.status.apply(event)?;
        }

        if LocalFallbackStore::is_local_id(id) {
            return self.transition_locally(id, event, staff_notes, None);
        }

        let notes = staff_notes.as_deref();
        match self
            .gateway
            .update_trial_status(id, event.target(), notes)
            .await
        {
            Ok(updated) => {
                let stored = self.fallback.upsert(updated);
                tracing::info!(
                    id = %id,
                    event = %event,
                    status = %stored.status,
                    "trial request transitioned"
                );
                self.notify();
                Ok(Sourced::remote(stored))
            }
            Err(GatewayError::Rejected { message, .. }) => match known {
                Some(record) => {
                    tracing::warn!(
                        id = %id,
                        event = %event,
                        detail = %message,
                        "backend refused transition"
                    );
                    Err(TrialError::InvalidTransition(aura_core::InvalidTransition {
                        from: record.status,
                        event,
                    }))
                }
                None => Err(TrialError::Refused {
                    id: id.clone(),
                    event,
                    message,
                }),
            },
            Err(e) if e.is_client_side() => Err(e.into()),
            Err(GatewayError::NotFound { .. }) => {
                tracing::warn!(
                    id = %id,
                    "backend does not know the request, checking local mirror"
                );
                self.transition_locally(id, event, staff_notes, None)
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    id = %id,
                    "backend failed, transitioning local mirror"
                );
                self.transition_locally(id, event, staff_notes, Some(e))
            }
        }
    }

    fn transition_locally(
        &self,
        id: &TrialId,
        event: TrialEvent,
        staff_notes: Option<String>,
        failure: Option<GatewayError>,
    ) -> Result<Sourced<TrialRequest>, TrialError> {
        let outcome = self.fallback.update(id, |record| {
            record
                .apply(event, staff_notes, Utc::now())
                .map(|()| record.clone())
        });

        match outcome {
            Some(Ok(record)) => {
                tracing::info!(
                    id = %id,
                    event = %event,
                    status = %record.status,
                    "trial request transitioned locally"
                );
                self.notify();
                Ok(Sourced::local(record))
            }
            Some(Err(invalid)) => Err(invalid.into()),
            None => Err(match failure {
                Some(e) => TrialError::Network(e),
                None => TrialError::NotFound(id.clone()),
            }),
        }
    }

    /// Deletes the record with `id`. Deleting an unknown id succeeds.
    ///
    /// # Errors
    ///
    /// [`TrialError::Network`] only when the request could not be built.
    pub async fn remove(&self, id: &TrialId) -> Result<Sourced<()>, TrialError> {
        let source = if LocalFallbackStore::is_local_id(id) {
            Source::Local
        } else {
            match self.gateway.delete_trial(id).await {
                Ok(()) => Source::Remote,
                Err(e) if e.is_client_side() => return Err(e.into()),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        id = %id,
                        "backend failed, deleting from local mirror"
                    );
                    Source::Local
                }
            }
        };

        if self.fallback.remove(id) {
            self.notify();
        }
        Ok(Sourced { source, value: () })
    }

    /// Per-status counts, computed from the mirror when the backend exchange
    /// fails.
    ///
    /// # Errors
    ///
    /// [`TrialError::Network`] only when the request could not be built.
    pub async fn stats(&self) -> Result<Sourced<TrialStats>, TrialError> {
        match self.gateway.trial_stats().await {
            Ok(stats) => Ok(Sourced::remote(stats)),
            Err(e) if e.is_client_side() => Err(e.into()),
            Err(e) => {
                tracing::warn!(error = %e, "backend failed, counting local mirror");
                Ok(Sourced::local(TrialStats::from_requests(
                    self.fallback.snapshot().iter(),
                )))
            }
        }
    }

    /// The mirrored list, newest first.
    #[must_use]
    pub fn mirror(&self) -> Vec<TrialRequest> {
        TrialFilter::default().apply(self.fallback.snapshot())
    }

    fn notify(&self) {
        if let Some(observer) = &self.observer {
            observer.requests_changed(&self.mirror());
        }
    }
}

#[cfg(test)]
#[path = "repository_test.rs"]
mod tests;
