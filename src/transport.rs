use crate::errors::AppError;
use crate::models::LeadSubmission;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use url::Url;

/// Value of the `X-Lead-Source` header on every delivery.
pub const LEAD_SOURCE_HEADER: &str = "X-Lead-Source";
pub const LEAD_SOURCE: &str = "website-form";

/// A failed delivery attempt.
///
/// Network failures, timeouts, non-2xx statuses and undecodable bodies all
/// end up here; `status` is set only when the server answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportError {
    pub status: Option<u16>,
    pub message: String,
}

impl TransportError {
    /// A non-2xx response.
    pub fn http(status: u16, status_text: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: status_text.into(),
        }
    }

    /// No usable response (connection, timeout, decode).
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "HTTP {}: {}", status, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for TransportError {}

/// Capability to deliver one submission to one endpoint.
///
/// Implementations make a single attempt; retrying is the router's job.
#[async_trait]
pub trait LeadTransport: Send + Sync {
    async fn send(
        &self,
        endpoint: &str,
        payload: &LeadSubmission,
    ) -> Result<Value, TransportError>;
}

/// Delivers leads as JSON over HTTP.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpTransport {
    /// Creates a new `HttpTransport`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Origin the routed endpoint paths are resolved against.
    /// * `token` - Optional bearer token sent as `Authorization`.
    /// * `timeout` - Per-request timeout.
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self, AppError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| AppError::InternalError(format!("Invalid lead API base URL: {}", e)))?;

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    /// Absolute URL for an endpoint. Paths starting with `/` replace the base
    /// path; full URLs are used as-is.
    pub fn url_for(&self, endpoint: &str) -> Result<Url, TransportError> {
        self.base_url.join(endpoint).map_err(|e| {
            TransportError::network(format!("Invalid endpoint '{}': {}", endpoint, e))
        })
    }
}

#[async_trait]
impl LeadTransport for HttpTransport {
    async fn send(
        &self,
        endpoint: &str,
        payload: &LeadSubmission,
    ) -> Result<Value, TransportError> {
        let url = self.url_for(endpoint)?;
        tracing::debug!("POST {}", url);

        let mut request = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .header(LEAD_SOURCE_HEADER, LEAD_SOURCE)
            .json(payload);

        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request
            .send()
            .await
            .map_err(|e| TransportError::network(format!("Lead request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::debug!("Lead endpoint returned {}: {}", status, error_text);
            return Err(TransportError::http(
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown Status"),
            ));
        }

        response.json().await.map_err(|e| {
            TransportError::network(format!("Failed to parse lead response: {}", e))
        })
    }
}
