use lead_router::config::Config;
use lead_router::handlers::{self, AppState};
use lead_router::router::LeadRouter;
use lead_router::transport::HttpTransport;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the intake service.
///
/// Initializes tracing and configuration, builds the HTTP transport and lead
/// router, then serves the intake routes.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lead_router=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let transport = HttpTransport::new(
        &config.lead_api_base_url,
        config.lead_api_token.clone(),
        config.request_timeout(),
    )?;
    tracing::info!(
        "✓ Lead transport initialized: {}",
        config.lead_api_base_url
    );

    let router = LeadRouter::new(Arc::new(transport)).with_policy(config.retry_policy());
    let policy = router.policy();
    tracing::info!(
        "Lead delivery: up to {} attempts, {}ms base backoff",
        policy.max_attempts(),
        policy.base_delay.as_millis()
    );
    let app = handlers::app(Arc::new(AppState::new(router, &config)));

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
