//! Staff-facing lifecycle operations.
//!
//! A [`LifecycleController`] binds a repository to the role of the person
//! acting. Customers may not move or delete requests; everyone else may,
//! subject to the transition table in [`aura_core::trials`].

use aura_core::{TrialEvent, TrialId, TrialRequest, UserRole};
use aura_gateway::TrialGateway;

use crate::error::TrialError;
use crate::repository::{Sourced, TrialRepository};

pub struct LifecycleController<'a, G> {
    repository: &'a TrialRepository<G>,
    role: UserRole,
}

impl<'a, G: TrialGateway> LifecycleController<'a, G> {
    pub fn new(repository: &'a TrialRepository<G>, role: UserRole) -> Self {
        Self { repository, role }
    }

    #[must_use]
    pub fn role(&self) -> UserRole {
        self.role
    }

    /// # Errors
    ///
    /// See [`LifecycleController::apply`].
    pub async fn approve(
        &self,
        id: &TrialId,
        staff_notes: Option<String>,
    ) -> Result<Sourced<TrialRequest>, TrialError> {
        self.apply(id, TrialEvent::Approve, staff_notes).await
    }

    /// # Errors
    ///
    /// See [`LifecycleController::apply`].
    pub async fn reject(
        &self,
        id: &TrialId,
        staff_notes: Option<String>,
    ) -> Result<Sourced<TrialRequest>, TrialError> {
        self.apply(id, TrialEvent::Reject, staff_notes).await
    }

    /// # Errors
    ///
    /// See [`LifecycleController::apply`].
    pub async fn start(
        &self,
        id: &TrialId,
        staff_notes: Option<String>,
    ) -> Result<Sourced<TrialRequest>, TrialError> {
        self.apply(id, TrialEvent::Start, staff_notes).await
    }

    /// # Errors
    ///
    /// See [`LifecycleController::apply`].
    pub async fn complete(
        &self,
        id: &TrialId,
        staff_notes: Option<String>,
    ) -> Result<Sourced<TrialRequest>, TrialError> {
        self.apply(id, TrialEvent::Complete, staff_notes).await
    }

    /// # Errors
    ///
    /// See [`LifecycleController::apply`].
    pub async fn cancel(
        &self,
        id: &TrialId,
        staff_notes: Option<String>,
    ) -> Result<Sourced<TrialRequest>, TrialError> {
        self.apply(id, TrialEvent::Cancel, staff_notes).await
    }

    /// Applies `event` on behalf of the bound role.
    ///
    /// # Errors
    ///
    /// [`TrialError::Forbidden`] for customers; otherwise whatever
    /// [`TrialRepository::transition`] returns.
    pub async fn apply(
        &self,
        id: &TrialId,
        event: TrialEvent,
        staff_notes: Option<String>,
    ) -> Result<Sourced<TrialRequest>, TrialError> {
        self.authorise(event.as_str())?;
        self.repository.transition(id, event, staff_notes).await
    }

    /// Deletes a request that has not reached a terminal status.
    ///
    /// # Errors
    ///
    /// [`TrialError::Forbidden`] for customers, [`TrialError::DeleteTerminal`]
    /// when the mirrored record is terminal, or whatever
    /// [`TrialRepository::remove`] returns.
    pub async fn delete(&self, id: &TrialId) -> Result<Sourced<()>, TrialError> {
        self.authorise("delete")?;
        if let Some(record) = self.repository.find(id) {
            if record.status.is_terminal() {
                return Err(TrialError::DeleteTerminal {
                    id: id.clone(),
                    status: record.status,
                });
            }
        }
        self.repository.remove(id).await
    }

    fn authorise(&self, action: &'static str) -> Result<(), TrialError> {
        if self.role.can_manage_trials() {
            Ok(())
        } else {
            tracing::warn!(role = %self.role, action, "lifecycle action refused");
            Err(TrialError::Forbidden {
                role: self.role,
                action,
            })
        }
    }
}
