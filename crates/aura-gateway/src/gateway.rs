use async_trait::async_trait;

use aura_core::{
    NewTrialRequest, Product, Session, TrialFilter, TrialId, TrialRequest, TrialStats, TrialStatus,
};

use crate::error::GatewayError;

/// The trial-request backend.
#[async_trait]
pub trait TrialGateway: Send + Sync {
    /// Submits one request and returns the record the backend stored.
    async fn create_trial(&self, request: &NewTrialRequest) -> Result<TrialRequest, GatewayError>;

    async fn list_trials(&self, filter: &TrialFilter) -> Result<Vec<TrialRequest>, GatewayError>;

    /// Moves a request to `status`. A backend that refuses the move answers
    /// with [`GatewayError::Rejected`].
    async fn update_trial_status(
        &self,
        id: &TrialId,
        status: TrialStatus,
        staff_notes: Option<&str>,
    ) -> Result<TrialRequest, GatewayError>;

    /// Deletes a request. An id the backend does not know counts as deleted.
    async fn delete_trial(&self, id: &TrialId) -> Result<(), GatewayError>;

    async fn trial_stats(&self) -> Result<TrialStats, GatewayError>;
}

/// The catalog service.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch_products(&self) -> Result<Vec<Product>, GatewayError>;
}

/// The auth service.
#[async_trait]
pub trait SessionResolver: Send + Sync {
    async fn current_session(&self) -> Result<Session, GatewayError>;
}
