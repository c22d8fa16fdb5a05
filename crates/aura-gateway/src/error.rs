use thiserror::Error;

/// Errors returned by the backend clients.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend understood the request and refused it (400, 409, 422).
    #[error("request rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("resource not found: {url}")]
    NotFound { url: String },

    #[error("not authorised (status {status})")]
    Unauthorized { status: u16 },

    /// Any other non-2xx answer.
    #[error("unexpected status {status} from {url}: {body}")]
    UnexpectedStatus {
        status: u16,
        url: String,
        body: String,
    },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("no API token configured")]
    MissingToken,
}

impl GatewayError {
    /// True for errors raised before any request left the process: a bad
    /// base URL, an unsendable payload or a missing token. Every other
    /// error is a failed exchange with the backend.
    #[must_use]
    pub fn is_client_side(&self) -> bool {
        matches!(
            self,
            GatewayError::InvalidBaseUrl(_)
                | GatewayError::InvalidPayload(_)
                | GatewayError::MissingToken
        )
    }
}
