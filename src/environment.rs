//! Ambient inputs read while building a submission.
//!
//! Everything that would otherwise come from the browser (current time, page
//! location, user agent, timezone) is read through [`Environment`] so payload
//! construction stays deterministic under test.

use chrono::{DateTime, Utc};
use url::Url;

/// Provider of the ambient values recorded in submission metadata.
pub trait Environment: Send + Sync {
    /// Current wall-clock time.
    fn now(&self) -> DateTime<Utc>;

    /// URL of the page the form was submitted from, if known.
    fn page_url(&self) -> Option<Url>;

    fn user_agent(&self) -> Option<String>;

    /// IANA timezone identifier of the submitter.
    fn timezone(&self) -> String;

    /// Reads a query-string parameter from the page URL.
    fn query_param(&self, name: &str) -> Option<String> {
        self.page_url().and_then(|url| {
            url.query_pairs()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.into_owned())
        })
    }
}

/// Context describing where a submission came from.
///
/// Time is taken from the system clock; the rest is whatever the caller
/// captured from the incoming request.
#[derive(Debug, Clone)]
pub struct PageContext {
    pub page_url: Option<Url>,
    pub user_agent: Option<String>,
    pub timezone: String,
}

impl PageContext {
    pub fn new(timezone: impl Into<String>) -> Self {
        Self {
            page_url: None,
            user_agent: None,
            timezone: timezone.into(),
        }
    }

    pub fn with_page_url(mut self, page_url: Option<Url>) -> Self {
        self.page_url = page_url;
        self
    }

    pub fn with_user_agent(mut self, user_agent: Option<String>) -> Self {
        self.user_agent = user_agent;
        self
    }
}

impl Default for PageContext {
    fn default() -> Self {
        Self::new("UTC")
    }
}

impl Environment for PageContext {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn page_url(&self) -> Option<Url> {
        self.page_url.clone()
    }

    fn user_agent(&self) -> Option<String> {
        self.user_agent.clone()
    }

    fn timezone(&self) -> String {
        self.timezone.clone()
    }
}

/// An environment frozen at a single instant, for reproducible payloads.
#[derive(Debug, Clone)]
pub struct FixedEnvironment {
    pub now: DateTime<Utc>,
    pub context: PageContext,
}

impl FixedEnvironment {
    pub fn new(now: DateTime<Utc>, context: PageContext) -> Self {
        Self { now, context }
    }
}

impl Environment for FixedEnvironment {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }

    fn page_url(&self) -> Option<Url> {
        self.context.page_url()
    }

    fn user_agent(&self) -> Option<String> {
        self.context.user_agent()
    }

    fn timezone(&self) -> String {
        self.context.timezone()
    }
}
