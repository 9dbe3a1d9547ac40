use crate::routing::Region;
use crate::transport::TransportError;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// Form fields exactly as submitted, keyed by field name.
pub type RawLeadData = Map<String, Value>;

pub const SUCCESS_MESSAGE: &str = "Lead submitted successfully";
pub const FAILURE_MESSAGE: &str =
    "Failed to submit lead. Please try again or contact us directly.";

/// Context attached to every lead. Computed once per submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Submission time, serialized as ISO-8601 with milliseconds (`...000Z`).
    #[serde(serialize_with = "serialize_iso_millis")]
    pub submitted_at: DateTime<Utc>,
    /// Country code as supplied by the caller.
    pub country: String,
    pub region: Region,
    pub user_agent: Option<String>,
    /// Page the form was submitted from.
    pub source: Option<String>,
    pub timezone: String,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
}

fn serialize_iso_millis<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// The JSON body POSTed to the lead endpoint: raw fields plus `metadata`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadSubmission {
    #[serde(flatten)]
    pub fields: RawLeadData,
    pub metadata: Metadata,
}

impl LeadSubmission {
    /// Merges raw form data with computed metadata. A raw `metadata` field is
    /// dropped so the computed object is the only one on the wire.
    pub fn new(mut fields: RawLeadData, metadata: Metadata) -> Self {
        fields.remove("metadata");
        Self { fields, metadata }
    }
}

/// Outcome of one `submit` call. Failures are values, not errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmissionResult {
    Success {
        endpoint: String,
        response: Value,
        attempts: u32,
    },
    Failure {
        endpoint: String,
        error: TransportError,
        /// The merged submission, kept so the caller can retry by hand or
        /// hand it to a fallback channel.
        payload: LeadSubmission,
        attempts: u32,
    },
}

impl SubmissionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, SubmissionResult::Success { .. })
    }

    pub fn endpoint(&self) -> &str {
        match self {
            SubmissionResult::Success { endpoint, .. } => endpoint,
            SubmissionResult::Failure { endpoint, .. } => endpoint,
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            SubmissionResult::Success { attempts, .. } => *attempts,
            SubmissionResult::Failure { attempts, .. } => *attempts,
        }
    }

    /// Text suitable for showing to the person who filled in the form.
    pub fn message(&self) -> &'static str {
        match self {
            SubmissionResult::Success { .. } => SUCCESS_MESSAGE,
            SubmissionResult::Failure { .. } => FAILURE_MESSAGE,
        }
    }
}
