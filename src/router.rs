//! Lead routing and delivery.
//!
//! [`LeadRouter`] decides where a lead goes, stamps it with metadata and
//! delivers it with bounded exponential backoff. Configuration is immutable
//! and shared behind `Arc`s, so a router can be cloned freely and used from
//! many tasks at once; retry counters live on the stack of each call.

use crate::environment::{Environment, PageContext};
use crate::models::{LeadSubmission, Metadata, RawLeadData, SubmissionResult};
use crate::retry::RetryPolicy;
use crate::routing::{Region, RoutingTable};
use crate::transport::{LeadTransport, TransportError};
use serde_json::Value;
use std::sync::Arc;

/// Server response from a successful delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub response: Value,
    pub attempts: u32,
}

/// Final error once every attempt has failed.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryError {
    pub error: TransportError,
    pub attempts: u32,
}

#[derive(Clone)]
pub struct LeadRouter {
    routing: Arc<RoutingTable>,
    transport: Arc<dyn LeadTransport>,
    environment: Arc<dyn Environment>,
    policy: RetryPolicy,
}

impl LeadRouter {
    /// Router with the default routing tables, retry policy and a system-clock
    /// environment in UTC.
    pub fn new(transport: Arc<dyn LeadTransport>) -> Self {
        Self {
            routing: Arc::new(RoutingTable::default()),
            transport,
            environment: Arc::new(PageContext::default()),
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_routing(mut self, routing: RoutingTable) -> Self {
        self.routing = Arc::new(routing);
        self
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns a router that reads ambient values from `environment`. The
    /// routing tables and transport are shared with `self`.
    pub fn with_environment(&self, environment: Arc<dyn Environment>) -> Self {
        Self {
            routing: Arc::clone(&self.routing),
            transport: Arc::clone(&self.transport),
            environment,
            policy: self.policy,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn resolve_region(&self, country_code: &str) -> Region {
        self.routing.resolve_region(country_code)
    }

    /// Destination endpoint for a country code. Unknown codes route to the
    /// `other` endpoint.
    pub fn resolve_endpoint(&self, country_code: &str) -> &str {
        self.routing.resolve_endpoint(country_code)
    }

    /// Merges form data with metadata read from the environment.
    pub fn build_submission_payload(&self, raw: RawLeadData, country_code: &str) -> LeadSubmission {
        let env = &self.environment;
        let metadata = Metadata {
            submitted_at: env.now(),
            country: country_code.to_string(),
            region: self.resolve_region(country_code),
            user_agent: env.user_agent(),
            source: env.page_url().map(|url| url.to_string()),
            timezone: env.timezone(),
            utm_source: env.query_param("utm_source"),
            utm_medium: env.query_param("utm_medium"),
            utm_campaign: env.query_param("utm_campaign"),
        };

        LeadSubmission::new(raw, metadata)
    }

    /// Delivers `payload` to `endpoint`, retrying transport errors with
    /// exponential backoff until the policy's budget is spent.
    pub async fn send_with_retry(
        &self,
        endpoint: &str,
        payload: &LeadSubmission,
    ) -> Result<Delivery, DeliveryError> {
        let mut state = self.policy.start();

        loop {
            match self.transport.send(endpoint, payload).await {
                Ok(response) => {
                    return Ok(Delivery {
                        response,
                        attempts: state.attempts_made(),
                    })
                }
                Err(error) => {
                    let attempt = state.attempts_made();
                    match state.next_backoff() {
                        Some(delay) => {
                            tracing::warn!(
                                "Attempt {} failed, retrying in {}ms: {}",
                                attempt,
                                delay.as_millis(),
                                error
                            );
                            tokio::time::sleep(delay).await;
                        }
                        None => {
                            return Err(DeliveryError {
                                error,
                                attempts: attempt,
                            })
                        }
                    }
                }
            }
        }
    }

    /// Routes and delivers one lead. Delivery failure is reported through
    /// [`SubmissionResult::Failure`], never as an error.
    pub async fn submit(&self, raw: RawLeadData, country_code: &str) -> SubmissionResult {
        let endpoint = self.resolve_endpoint(country_code).to_string();
        let payload = self.build_submission_payload(raw, country_code);

        tracing::info!("Routing lead from {} to: {}", country_code, endpoint);

        match self.send_with_retry(&endpoint, &payload).await {
            Ok(delivery) => {
                tracing::info!(
                    "✓ Lead submitted successfully to {} after {} attempt(s)",
                    endpoint,
                    delivery.attempts
                );
                SubmissionResult::Success {
                    endpoint,
                    response: delivery.response,
                    attempts: delivery.attempts,
                }
            }
            Err(failure) => {
                tracing::error!(
                    "Lead submission failed to {} after {} attempt(s): {}",
                    endpoint,
                    failure.attempts,
                    failure.error
                );
                SubmissionResult::Failure {
                    endpoint,
                    error: failure.error,
                    payload,
                    attempts: failure.attempts,
                }
            }
        }
    }
}
