//! Trial-request workflow: the repository that falls back to a local mirror
//! when the backend is unreachable, the staff lifecycle controller, and the
//! compiler that turns a cart into creation calls.

pub mod compiler;
pub mod error;
pub mod fallback;
pub mod lifecycle;
pub mod repository;

#[cfg(test)]
pub(crate) mod test_support;

pub use compiler::{compile_cart, submit_cart, CartSubmitError, SubmitOptions, TrialSubmitter};
pub use error::TrialError;
pub use fallback::LocalFallbackStore;
pub use lifecycle::LifecycleController;
pub use repository::{RequestListObserver, Source, Sourced, TrialRepository};
