//! HTTP client for the AuraSelect backend.
//!
//! One [`HttpGateway`] serves the trial-request, catalog and auth endpoints.
//! Every request carries a fresh `x-request-id`. Reads and deletes are
//! retried on transient failures; creation and status changes are attempted
//! once, since a repeated status change is refused as illegal.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use aura_core::{
    AppConfig, NewTrialRequest, Product, Session, TrialFilter, TrialId, TrialRequest, TrialStats,
    TrialStatus,
};

use crate::error::GatewayError;
use crate::gateway::{CatalogSource, SessionResolver, TrialGateway};
use crate::retry::retry_with_backoff;
use crate::types::{CreateTrialBody, Listing, RemoteTrialRecord, StatusUpdateBody};

const DEFAULT_USER_AGENT: &str = "auraselect/0.1 (trial-desk)";
const REQUEST_ID_HEADER: &str = "x-request-id";

/// Client for the trial, catalog and auth endpoints.
///
/// Use [`HttpGateway::from_app_config`] in binaries or
/// [`HttpGateway::with_base_url`] to point at a mock server in tests.
/// Cloning is cheap and shares the connection pool.
#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: Url,
    token: Option<String>,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl std::fmt::Debug for HttpGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpGateway")
            .field("base_url", &self.base_url.as_str())
            .field("token", &self.token.as_ref().map(|_| "[redacted]"))
            .field("max_retries", &self.max_retries)
            .field("backoff_base_ms", &self.backoff_base_ms)
            .finish_non_exhaustive()
    }
}

impl HttpGateway {
    /// # Errors
    ///
    /// Returns [`GatewayError::Http`] if the `reqwest::Client` cannot be
    /// built, or [`GatewayError::InvalidBaseUrl`] for an unusable base URL.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, GatewayError> {
        let mut gateway = Self::build(
            &config.api_base_url,
            config.request_timeout_secs,
            &config.user_agent,
        )?;
        gateway.token.clone_from(&config.api_token);
        gateway.max_retries = config.max_retries;
        gateway.backoff_base_ms = config.retry_backoff_base_ms;
        Ok(gateway)
    }

    /// Creates a client with no token and no retries (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Same as [`HttpGateway::from_app_config`].
    pub fn with_base_url(base_url: &str, timeout_secs: u64) -> Result<Self, GatewayError> {
        Self::build(base_url, timeout_secs, DEFAULT_USER_AGENT)
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    #[must_use]
    pub fn with_retry(mut self, max_retries: u32, backoff_base_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.backoff_base_ms = backoff_base_ms;
        self
    }

    fn build(base_url: &str, timeout_secs: u64, user_agent: &str) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.min(10)))
            .user_agent(user_agent)
            .build()?;

        // Exactly one trailing slash, so endpoint segments extend the base
        // path instead of replacing its last segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised)
            .map_err(|e| GatewayError::InvalidBaseUrl(format!("'{base_url}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(GatewayError::InvalidBaseUrl(base_url.to_string()));
        }

        Ok(Self {
            client,
            base_url,
            token: None,
            max_retries: 0,
            backoff_base_ms: 0,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, GatewayError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| GatewayError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn list_url(&self, filter: &TrialFilter) -> Result<Url, GatewayError> {
        let mut url = self.endpoint(&["trial-requests"])?;
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(status) = filter.status {
                pairs.append_pair("status", status.as_str());
            }
            if let Some(search) = filter.search.as_deref().map(str::trim) {
                if !search.is_empty() {
                    pairs.append_pair("search", search);
                }
            }
            pairs.append_pair("sort_by", filter.sort_by.as_str());
            pairs.append_pair("sort_order", filter.direction.as_str());
        }
        Ok(url)
    }

    /// Sends the request built by `build`, retrying transient failures when
    /// `idempotent`, and maps non-2xx answers onto [`GatewayError`].
    async fn execute<F>(
        &self,
        url: &Url,
        idempotent: bool,
        build: F,
    ) -> Result<Response, GatewayError>
    where
        F: Fn() -> RequestBuilder,
    {
        let retries = if idempotent { self.max_retries } else { 0 };
        let build = &build;
        retry_with_backoff(retries, self.backoff_base_ms, move || async move {
            let request_id = Uuid::new_v4().to_string();
            tracing::debug!(url = %url, request_id = %request_id, "sending gateway request");
            let response = build().header(REQUEST_ID_HEADER, &request_id).send().await?;
            check_status(url, response).await
        })
        .await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T, GatewayError> {
        let response = self
            .execute(url, true, || self.authorised(self.client.get(url.clone())))
            .await?;
        decode(url, response).await
    }

    fn authorised(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

/// Maps a non-2xx response onto the matching [`GatewayError`] variant.
async fn check_status(url: &Url, response: Response) -> Result<Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::NOT_FOUND => GatewayError::NotFound {
            url: url.to_string(),
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GatewayError::Unauthorized {
            status: status.as_u16(),
        },
        StatusCode::BAD_REQUEST | StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
            GatewayError::Rejected {
                status: status.as_u16(),
                message: detail_message(&body),
            }
        }
        _ => GatewayError::UnexpectedStatus {
            status: status.as_u16(),
            url: url.to_string(),
            body,
        },
    })
}

/// Pulls a readable message out of an error body: the `detail` field when it
/// is a string, otherwise the raw body.
fn detail_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(serde_json::Value::as_str).map(str::to_owned))
        .unwrap_or_else(|| body.trim().to_owned())
}

async fn decode<T: DeserializeOwned>(url: &Url, response: Response) -> Result<T, GatewayError> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| GatewayError::Deserialize {
        context: url.to_string(),
        source: e,
    })
}

#[async_trait]
impl TrialGateway for HttpGateway {
    async fn create_trial(&self, request: &NewTrialRequest) -> Result<TrialRequest, GatewayError> {
        let body = CreateTrialBody::from_request(request)?;
        let url = self.endpoint(&["trial-requests"])?;
        let response = self
            .execute(&url, false, || {
                self.authorised(self.client.post(url.clone()).json(&body))
            })
            .await?;
        let record: RemoteTrialRecord = decode(&url, response).await?;
        Ok(record.into_created(request))
    }

    async fn list_trials(&self, filter: &TrialFilter) -> Result<Vec<TrialRequest>, GatewayError> {
        let url = self.list_url(filter)?;
        let listing: Listing<RemoteTrialRecord> = self.get_json(&url).await?;
        Ok(listing
            .into_items()
            .into_iter()
            .map(RemoteTrialRecord::into_request)
            .collect())
    }

    async fn update_trial_status(
        &self,
        id: &TrialId,
        status: TrialStatus,
        staff_notes: Option<&str>,
    ) -> Result<TrialRequest, GatewayError> {
        let url = self.endpoint(&["trial-requests", id.as_str(), "status"])?;
        let body = StatusUpdateBody {
            status,
            staff_notes: staff_notes.map(str::trim).filter(|n| !n.is_empty()),
        };
        let response = self
            .execute(&url, false, || {
                self.authorised(self.client.patch(url.clone()).json(&body))
            })
            .await?;
        let record: RemoteTrialRecord = decode(&url, response).await?;
        Ok(record.into_request())
    }

    async fn delete_trial(&self, id: &TrialId) -> Result<(), GatewayError> {
        let url = self.endpoint(&["trial-requests", id.as_str()])?;
        match self
            .execute(&url, true, || self.authorised(self.client.delete(url.clone())))
            .await
        {
            Ok(_) => Ok(()),
            Err(GatewayError::NotFound { .. }) => {
                tracing::debug!(id = %id, "trial request already absent on the backend");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn trial_stats(&self) -> Result<TrialStats, GatewayError> {
        let url = self.endpoint(&["trial-requests", "stats"])?;
        self.get_json(&url).await
    }
}

#[async_trait]
impl CatalogSource for HttpGateway {
    async fn fetch_products(&self) -> Result<Vec<Product>, GatewayError> {
        let url = self.endpoint(&["products"])?;
        let listing: Listing<Product> = self.get_json(&url).await?;
        Ok(listing.into_items())
    }
}

#[async_trait]
impl SessionResolver for HttpGateway {
    async fn current_session(&self) -> Result<Session, GatewayError> {
        if self.token.is_none() {
            return Err(GatewayError::MissingToken);
        }
        let url = self.endpoint(&["users", "me"])?;
        self.get_json(&url).await
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
