use crate::config::Config;
use crate::environment::PageContext;
use crate::errors::AppError;
use crate::router::LeadRouter;
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use url::Url;

/// Country used when the form does not carry one.
pub const DEFAULT_COUNTRY: &str = "US";

/// Header a page can set to report the visitor's IANA timezone.
pub const TIMEZONE_HEADER: &str = "x-timezone";

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Router used for every submission; cloned per request with that
    /// request's page context.
    pub router: LeadRouter,
    /// Timezone recorded when the request does not report one.
    pub default_timezone: String,
}

impl AppState {
    pub fn new(router: LeadRouter, config: &Config) -> Self {
        Self {
            router,
            default_timezone: config.default_timezone.clone(),
        }
    }
}

/// Builds the intake service with its middleware stack.
pub fn app(state: Arc<AppState>) -> Router {
    let lead_routes = Router::new()
        .route("/leads", post(submit_lead))
        .route("/leads/route/:country", get(route_country))
        // Form posts are small; 1MB is plenty
        .layer(ServiceBuilder::new().layer(RequestBodyLimitLayer::new(1024 * 1024)));

    Router::new()
        .route("/health", get(health))
        .merge(lead_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Health check endpoint.
pub async fn health() -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "service": "lead-router",
        })),
    )
}

/// GET /leads/route/:country
///
/// Reports where a lead from `country` would be delivered.
pub async fn route_country(
    State(state): State<Arc<AppState>>,
    Path(country): Path<String>,
) -> Json<Value> {
    let region = state.router.resolve_region(&country);
    let endpoint = state.router.resolve_endpoint(&country);

    Json(json!({
        "country": country,
        "region": region,
        "endpoint": endpoint,
    }))
}

/// POST /leads
///
/// Accepts the form fields as a JSON object and routes them. The country code
/// comes from the `country` field, defaulting to `US`.
///
/// # Returns
///
/// * `200` with the serialized result on delivery.
/// * `502` with the serialized result (including the payload) when every
///   attempt failed.
/// * `400` when the body is not a JSON object.
pub async fn submit_lead(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let fields = match body {
        Value::Object(fields) => fields,
        _ => {
            return Err(AppError::BadRequest(
                "Lead body must be a JSON object".to_string(),
            ))
        }
    };

    let country = fields
        .get("country")
        .and_then(Value::as_str)
        .filter(|c| !c.is_empty())
        .unwrap_or(DEFAULT_COUNTRY)
        .to_string();

    let context = page_context(&headers, &state.default_timezone);
    let router = state.router.with_environment(Arc::new(context));
    let result = router.submit(fields, &country).await;

    let status = if result.is_success() {
        StatusCode::OK
    } else {
        StatusCode::BAD_GATEWAY
    };

    let mut body = serde_json::to_value(&result)
        .map_err(|e| AppError::InternalError(format!("Failed to encode result: {}", e)))?;
    if let Value::Object(map) = &mut body {
        map.insert("message".to_string(), json!(result.message()));
    }

    Ok((status, Json(body)))
}

/// Captures the submitter's page, browser and timezone from request headers.
fn page_context(headers: &HeaderMap, default_timezone: &str) -> PageContext {
    let header_str = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    let timezone = header_str(TIMEZONE_HEADER).unwrap_or_else(|| default_timezone.to_string());
    let page_url = header_str(header::REFERER.as_str()).and_then(|r| Url::parse(&r).ok());

    PageContext::new(timezone)
        .with_page_url(page_url)
        .with_user_agent(header_str(header::USER_AGENT.as_str()))
}
