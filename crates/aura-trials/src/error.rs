use thiserror::Error;

use aura_core::{CoreError, InvalidTransition, TrialEvent, TrialId, TrialStatus, UserRole};
use aura_gateway::GatewayError;

#[derive(Debug, Error)]
pub enum TrialError {
    /// The payload broke a domain rule; nothing was sent.
    #[error("validation failed: {0}")]
    Validation(#[from] CoreError),

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    /// The backend refused a status change for a record this process has
    /// not seen, so the local table could not be consulted first.
    #[error("backend refused to {event} trial request {id}: {message}")]
    Refused {
        id: TrialId,
        event: TrialEvent,
        message: String,
    },

    #[error("cannot delete trial request {id}: it is {status}")]
    DeleteTerminal { id: TrialId, status: TrialStatus },

    #[error("gateway error: {0}")]
    Network(#[from] GatewayError),

    #[error("role {role} may not {action} trial requests")]
    Forbidden {
        role: UserRole,
        action: &'static str,
    },

    #[error("trial request {0} not found")]
    NotFound(TrialId),
}

impl TrialError {
    /// True for every flavour of "this move is not allowed from here".
    #[must_use]
    pub fn is_invalid_transition(&self) -> bool {
        matches!(
            self,
            TrialError::InvalidTransition(_)
                | TrialError::Refused { .. }
                | TrialError::DeleteTerminal { .. }
        )
    }
}
