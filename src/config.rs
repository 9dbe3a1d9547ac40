use crate::retry::RetryPolicy;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub lead_api_base_url: String,
    pub lead_api_token: Option<String>, // Sent as a bearer token when set
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub request_timeout_secs: u64,
    pub default_timezone: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self {
            port: lookup("PORT")
                .unwrap_or_else(|| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            lead_api_base_url: lookup("LEAD_API_BASE_URL")
                .ok_or_else(|| anyhow::anyhow!("LEAD_API_BASE_URL environment variable required"))
                .and_then(|url| {
                    if url.trim().is_empty() {
                        anyhow::bail!("LEAD_API_BASE_URL cannot be empty");
                    }
                    if !url.starts_with("http://") && !url.starts_with("https://") {
                        anyhow::bail!("LEAD_API_BASE_URL must start with http:// or https://");
                    }
                    Ok(url)
                })?,
            lead_api_token: lookup("LEAD_API_TOKEN").filter(|s| !s.trim().is_empty()),
            max_retries: lookup("LEAD_MAX_RETRIES")
                .unwrap_or_else(|| "3".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("LEAD_MAX_RETRIES must be a non-negative integer"))?,
            retry_base_delay_ms: lookup("LEAD_RETRY_BASE_DELAY_MS")
                .unwrap_or_else(|| "1000".to_string())
                .parse()
                .map_err(|_| {
                    anyhow::anyhow!("LEAD_RETRY_BASE_DELAY_MS must be a number of milliseconds")
                })?,
            request_timeout_secs: lookup("LEAD_REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|| "30".to_string())
                .parse()
                .map_err(|_| {
                    anyhow::anyhow!("LEAD_REQUEST_TIMEOUT_SECS must be a number of seconds")
                })?,
            default_timezone: lookup("LEAD_DEFAULT_TIMEZONE")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "UTC".to_string()),
        };

        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Lead API Base URL: {}", config.lead_api_base_url);
        if config.lead_api_token.is_some() {
            tracing::info!("Lead API token configured");
        }
        tracing::debug!(
            "Retry policy: {} retries, {}ms base delay",
            config.max_retries,
            config.retry_base_delay_ms
        );
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_retries,
            Duration::from_millis(self.retry_base_delay_ms),
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
