//! Turns a cart into trial-request creation calls.
//!
//! Each cart item becomes its own request, in cart order, carrying the
//! cart memo. Submissions are strictly sequential and stop at the first
//! failure; earlier submissions are not rolled back.

use async_trait::async_trait;
use thiserror::Error;

use aura_core::trials::{DEFAULT_QUANTITY, DEFAULT_TRIAL_DURATION_DAYS};
use aura_core::{Cart, CoreError, CustomerIdentity, NewTrialRequest, ProductId, TrialRequest};
use aura_gateway::TrialGateway;

use crate::error::TrialError;
use crate::repository::{Sourced, TrialRepository};

/// Anything that accepts one creation payload at a time.
#[async_trait]
pub trait TrialSubmitter: Send + Sync {
    async fn submit(&self, request: NewTrialRequest) -> Result<Sourced<TrialRequest>, TrialError>;
}

#[async_trait]
impl<G: TrialGateway> TrialSubmitter for TrialRepository<G> {
    async fn submit(&self, request: NewTrialRequest) -> Result<Sourced<TrialRequest>, TrialError> {
        self.create(request).await
    }
}

/// Per-submission fields shared by every request compiled from one cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOptions {
    pub customer: Option<CustomerIdentity>,
    pub quantity: u32,
    pub trial_duration_days: u32,
    pub reason: Option<String>,
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self {
            customer: None,
            quantity: DEFAULT_QUANTITY,
            trial_duration_days: DEFAULT_TRIAL_DURATION_DAYS,
            reason: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum CartSubmitError {
    /// Nothing was submitted.
    #[error("cart cannot be submitted: {0}")]
    Validation(#[from] CoreError),

    /// `submitted` went through before `failed` errored; `not_attempted`
    /// were never sent.
    #[error(
        "trial request for product {failed} failed after {} succeeded ({} not attempted): {source}",
        .submitted.len(),
        .not_attempted.len()
    )]
    Partial {
        submitted: Vec<Sourced<TrialRequest>>,
        failed: ProductId,
        not_attempted: Vec<ProductId>,
        #[source]
        source: TrialError,
    },
}

/// Builds one payload per cart item, in cart order.
///
/// # Errors
///
/// [`CoreError::EmptyProducts`] for an empty cart,
/// [`CoreError::InactiveProduct`] when any item is inactive, or the first
/// range violation in `options`.
pub fn compile_cart(
    cart: &Cart,
    options: &SubmitOptions,
) -> Result<Vec<NewTrialRequest>, CoreError> {
    if cart.is_empty() {
        return Err(CoreError::EmptyProducts);
    }
    if let Some(inactive) = cart.items().iter().find(|p| !p.is_active) {
        return Err(CoreError::InactiveProduct(inactive.id.clone()));
    }

    cart.items()
        .iter()
        .map(|product| {
            let mut request = NewTrialRequest::for_products(vec![product.snapshot()])
                .with_memo(cart.memo())
                .with_customer(options.customer.clone());
            request.quantity = options.quantity;
            request.trial_duration_days = options.trial_duration_days;
            if let Some(reason) = &options.reason {
                request = request.with_reason(reason.clone());
            }
            request.validate()?;
            Ok(request)
        })
        .collect()
}

/// Compiles `cart` and submits each payload in order through `submitter`.
/// The caller clears the cart only when this returns `Ok`.
///
/// # Errors
///
/// [`CartSubmitError::Validation`] before any submission, or
/// [`CartSubmitError::Partial`] at the first failed submission.
pub async fn submit_cart<S: TrialSubmitter + ?Sized>(
    submitter: &S,
    cart: &Cart,
    options: &SubmitOptions,
) -> Result<Vec<Sourced<TrialRequest>>, CartSubmitError> {
    let payloads = compile_cart(cart, options)?;
    let first_product = |p: &NewTrialRequest| p.products.first().map(|s| s.id.clone());

    let mut submitted = Vec::with_capacity(payloads.len());
    for (i, payload) in payloads.iter().enumerate() {
        match submitter.submit(payload.clone()).await {
            Ok(created) => {
                tracing::debug!(
                    id = %created.value.id,
                    source = %created.source,
                    "trial request submitted"
                );
                submitted.push(created);
            }
            Err(source) => {
                let failed = first_product(payload).unwrap_or_else(|| ProductId(String::new()));
                let not_attempted: Vec<ProductId> =
                    payloads[i + 1..].iter().filter_map(first_product).collect();
                tracing::warn!(
                    product = %failed,
                    submitted = submitted.len(),
                    not_attempted = not_attempted.len(),
                    error = %source,
                    "cart submission stopped"
                );
                return Err(CartSubmitError::Partial {
                    submitted,
                    failed,
                    not_attempted,
                    source,
                });
            }
        }
    }
    Ok(submitted)
}

#[cfg(test)]
#[path = "compiler_test.rs"]
mod tests;
