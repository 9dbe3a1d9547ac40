/// Router tests against deterministic in-memory transports
/// Backoff timing is checked on tokio's paused clock, so no test really sleeps
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use lead_router::environment::{FixedEnvironment, PageContext};
use lead_router::retry::RetryPolicy;
use lead_router::{
    EndpointTable, LeadRouter, LeadSubmission, LeadTransport, RawLeadData, Region, RegionMap,
    RoutingTable, SubmissionResult, TransportError,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

#[derive(Debug, Clone)]
struct Call {
    endpoint: String,
    at: Instant,
    payload: LeadSubmission,
}

/// Fails the first `failures` calls to each endpoint, then succeeds.
/// `None` fails forever.
struct FlakyTransport {
    failures: Option<usize>,
    calls: Mutex<Vec<Call>>,
}

impl FlakyTransport {
    fn new(failures: Option<usize>) -> Arc<Self> {
        Arc::new(Self {
            failures,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn calls_to(&self, endpoint: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.endpoint == endpoint)
            .collect()
    }
}

#[async_trait]
impl LeadTransport for FlakyTransport {
    async fn send(
        &self,
        endpoint: &str,
        payload: &LeadSubmission,
    ) -> Result<Value, TransportError> {
        let previous = {
            let mut calls = self.calls.lock().unwrap();
            let previous = calls.iter().filter(|c| c.endpoint == endpoint).count();
            calls.push(Call {
                endpoint: endpoint.to_string(),
                at: Instant::now(),
                payload: payload.clone(),
            });
            previous
        };

        match self.failures {
            Some(failures) if previous >= failures => Ok(json!({"success": true})),
            _ => Err(TransportError::http(500, "Internal Server Error")),
        }
    }
}

fn fixed_environment() -> Arc<FixedEnvironment> {
    let now = Utc.with_ymd_and_hms(2024, 9, 1, 10, 30, 0).unwrap();
    let page = Url::parse(
        "https://www.example.com/contact?utm_source=linkedin&utm_medium=social&utm_campaign=q3",
    )
    .unwrap();
    let context = PageContext::new("Europe/Berlin")
        .with_page_url(Some(page))
        .with_user_agent(Some("Mozilla/5.0 (X11; Linux x86_64)".to_string()));
    Arc::new(FixedEnvironment::new(now, context))
}

fn router_with(transport: Arc<FlakyTransport>) -> LeadRouter {
    LeadRouter::new(transport).with_environment(fixed_environment())
}

fn form() -> RawLeadData {
    json!({
        "firstName": "Ada",
        "lastName": "Lovelace",
        "email": "ada@example.com",
        "serviceInterest": "consulting"
    })
    .as_object()
    .cloned()
    .unwrap()
}

fn gaps(calls: &[Call]) -> Vec<Duration> {
    calls.windows(2).map(|w| w[1].at - w[0].at).collect()
}

#[cfg(test)]
mod endpoint_resolution_tests {
    use super::*;

    #[test]
    fn test_every_listed_country_resolves_to_its_endpoint() {
        let router = router_with(FlakyTransport::new(Some(0)));

        let eu = [
            "AT", "BE", "BG", "HR", "CY", "CZ", "DK", "EE", "FI", "FR", "DE", "GR", "HU", "IE",
            "IT", "LV", "LT", "LU", "MT", "NL", "PL", "PT", "RO", "SK", "SI", "ES", "SE",
        ];
        let asia = [
            "JP", "KR", "CN", "SG", "AU", "NZ", "IN", "MY", "TH", "VN", "PH", "ID",
        ];

        for code in eu {
            assert_eq!(router.resolve_endpoint(code), "/api/lead/eu", "{}", code);
            assert_eq!(
                router.resolve_endpoint(&code.to_lowercase()),
                "/api/lead/eu",
                "{}",
                code
            );
        }
        for code in ["GB", "UK", "gb", "uk"] {
            assert_eq!(router.resolve_endpoint(code), "/api/lead/uk");
        }
        for code in ["US", "CA", "MX", "us", "ca", "mx"] {
            assert_eq!(router.resolve_endpoint(code), "/api/lead/na");
        }
        for code in asia {
            assert_eq!(router.resolve_endpoint(code), "/api/lead/asia");
        }
    }

    #[test]
    fn test_unknown_countries_go_international() {
        let router = router_with(FlakyTransport::new(Some(0)));
        for code in ["ZZ", "BR", "ch", "NO", "", "XYZ"] {
            assert_eq!(router.resolve_endpoint(code), "/api/lead/intl", "{:?}", code);
        }
    }

    #[test]
    fn test_missing_region_endpoint_uses_default() {
        let routing = RoutingTable::new(
            RegionMap::from_entries([("de", Region::Eu), ("jp", Region::Asia)]),
            EndpointTable::new("/api/lead").with_endpoint(Region::Eu, "/api/lead/eu"),
        );
        let router = LeadRouter::new(FlakyTransport::new(Some(0))).with_routing(routing);

        assert_eq!(router.resolve_endpoint("DE"), "/api/lead/eu");
        assert_eq!(router.resolve_endpoint("JP"), "/api/lead");
        assert_eq!(router.resolve_endpoint("US"), "/api/lead");
    }
}

#[cfg(test)]
mod payload_tests {
    use super::*;

    #[test]
    fn test_metadata_region_per_country() {
        let router = router_with(FlakyTransport::new(Some(0)));

        let cases = [("FR", Region::Eu), ("US", Region::Na), ("ZZ", Region::Other)];
        for (country, region) in cases {
            let payload = router.build_submission_payload(form(), country);
            assert_eq!(payload.metadata.region, region, "{}", country);
            assert_eq!(payload.metadata.country, country);
        }
    }

    #[test]
    fn test_metadata_reads_environment() {
        let router = router_with(FlakyTransport::new(Some(0)));
        let payload = router.build_submission_payload(form(), "de");
        let value = serde_json::to_value(&payload).unwrap();

        assert_eq!(value["firstName"], "Ada");
        assert_eq!(value["serviceInterest"], "consulting");
        let metadata = &value["metadata"];
        assert_eq!(metadata["submittedAt"], "2024-09-01T10:30:00.000Z");
        assert_eq!(metadata["country"], "de");
        assert_eq!(metadata["region"], "eu");
        assert_eq!(metadata["userAgent"], "Mozilla/5.0 (X11; Linux x86_64)");
        assert_eq!(
            metadata["source"],
            "https://www.example.com/contact?utm_source=linkedin&utm_medium=social&utm_campaign=q3"
        );
        assert_eq!(metadata["timezone"], "Europe/Berlin");
        assert_eq!(metadata["utmSource"], "linkedin");
        assert_eq!(metadata["utmMedium"], "social");
        assert_eq!(metadata["utmCampaign"], "q3");
    }

    #[test]
    fn test_payload_is_deterministic_with_fixed_environment() {
        let router = router_with(FlakyTransport::new(Some(0)));
        assert_eq!(
            router.build_submission_payload(form(), "JP"),
            router.build_submission_payload(form(), "JP")
        );
    }
}

#[cfg(test)]
mod retry_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_success_on_first_attempt_does_not_retry() {
        let transport = FlakyTransport::new(Some(0));
        let router = router_with(transport.clone());

        let started = Instant::now();
        let result = router.submit(form(), "US").await;

        match &result {
            SubmissionResult::Success {
                endpoint,
                response,
                attempts,
            } => {
                assert_eq!(endpoint, "/api/lead/na");
                assert_eq!(response, &json!({"success": true}));
                assert_eq!(*attempts, 1);
            }
            other => panic!("Expected success, got {:?}", other),
        }
        assert_eq!(transport.calls().len(), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_failures_then_success_backs_off_1s_then_2s() {
        let transport = FlakyTransport::new(Some(2));
        let router = router_with(transport.clone());

        let result = router.submit(form(), "DE").await;

        assert!(result.is_success());
        assert_eq!(result.attempts(), 3);
        let calls = transport.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(
            gaps(&calls),
            vec![Duration::from_millis(1000), Duration::from_millis(2000)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_failing_returns_failure_with_original_payload() {
        let transport = FlakyTransport::new(None);
        let router = router_with(transport.clone());
        let expected_payload = router.build_submission_payload(form(), "GB");

        let started = Instant::now();
        let result = router.submit(form(), "GB").await;

        match &result {
            SubmissionResult::Failure {
                endpoint,
                error,
                payload,
                attempts,
            } => {
                assert_eq!(endpoint, "/api/lead/uk");
                assert_eq!(error, &TransportError::http(500, "Internal Server Error"));
                assert_eq!(payload, &expected_payload);
                assert_eq!(*attempts, 4);
            }
            other => panic!("Expected failure, got {:?}", other),
        }

        let calls = transport.calls();
        assert_eq!(calls.len(), 4);
        assert_eq!(
            gaps(&calls),
            vec![
                Duration::from_millis(1000),
                Duration::from_millis(2000),
                Duration::from_millis(4000)
            ]
        );
        assert_eq!(started.elapsed(), Duration::from_millis(7000));
        assert!(calls.iter().all(|c| c.payload == expected_payload));
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_policy_is_honoured() {
        let transport = FlakyTransport::new(None);
        let router = router_with(transport.clone())
            .with_policy(RetryPolicy::new(1, Duration::from_millis(250)));

        let result = router.submit(form(), "SG").await;

        assert!(!result.is_success());
        assert_eq!(result.attempts(), 2);
        assert_eq!(gaps(&transport.calls()), vec![Duration::from_millis(250)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_retries_fails_after_one_attempt() {
        let transport = FlakyTransport::new(None);
        let router =
            router_with(transport.clone()).with_policy(RetryPolicy::new(0, Duration::from_secs(1)));

        let started = Instant::now();
        let result = router.submit(form(), "FR").await;

        assert_eq!(result.attempts(), 1);
        assert_eq!(transport.calls().len(), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_with_retry_reports_final_error() {
        let transport = FlakyTransport::new(None);
        let router = router_with(transport.clone());
        let payload = router.build_submission_payload(form(), "CA");

        let err = router
            .send_with_retry("/api/lead/na", &payload)
            .await
            .unwrap_err();

        assert_eq!(err.attempts, 4);
        assert_eq!(err.error.status, Some(500));
        assert_eq!(err.error.to_string(), "HTTP 500: Internal Server Error");
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_submission_during_backoff_stops_retries() {
        let transport = FlakyTransport::new(None);
        let router = router_with(transport.clone());

        let outcome =
            tokio::time::timeout(Duration::from_millis(1500), router.submit(form(), "IT")).await;

        assert!(outcome.is_err());
        // Initial attempt at 0ms, first retry at 1000ms, next would be at 3000ms
        assert_eq!(transport.calls().len(), 2);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(transport.calls().len(), 2);
    }
}

#[cfg(test)]
mod concurrency_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_submissions_keep_independent_retry_state() {
        // Each endpoint fails twice; both submissions share one transport
        let transport = FlakyTransport::new(Some(2));
        let router = router_with(transport.clone());

        let eu = {
            let router = router.clone();
            tokio::spawn(async move { router.submit(form(), "FR").await })
        };
        let na = {
            let router = router.clone();
            tokio::spawn(async move { router.submit(form(), "US").await })
        };

        let eu = eu.await.unwrap();
        let na = na.await.unwrap();

        assert!(eu.is_success());
        assert!(na.is_success());
        assert_eq!(eu.attempts(), 3);
        assert_eq!(na.attempts(), 3);

        for endpoint in ["/api/lead/eu", "/api/lead/na"] {
            let calls = transport.calls_to(endpoint);
            assert_eq!(calls.len(), 3, "{}", endpoint);
            assert_eq!(
                gaps(&calls),
                vec![Duration::from_millis(1000), Duration::from_millis(2000)],
                "{}",
                endpoint
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_many_concurrent_submissions() {
        let transport = FlakyTransport::new(Some(1));
        let router = router_with(transport.clone());
        let countries = ["DE", "GB", "US", "JP", "BR"];

        let mut handles = HashMap::new();
        for country in countries {
            let router = router.clone();
            handles.insert(
                country,
                tokio::spawn(async move { router.submit(form(), country).await }),
            );
        }

        for (country, handle) in handles {
            let result = handle.await.unwrap();
            assert!(result.is_success(), "{}", country);
            assert_eq!(result.attempts(), 2, "{}", country);
        }
        assert_eq!(transport.calls().len(), countries.len() * 2);
    }
}
