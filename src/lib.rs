//! Lead Router Library
//!
//! Routes website lead submissions to a regional endpoint chosen from the
//! submitter's country, attaches submission metadata and delivers the lead
//! with bounded exponential-backoff retry.
//!
//! # Modules
//!
//! - `api`: Intake service surface.
//! - `core`: Routing, payload and delivery logic.
//! - `integrations`: Outbound transports.
//! - `config`: Configuration management.
//! - `environment`: Injectable clock and page context.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers.
//! - `models`: Submission payloads and results.
//! - `retry`: Backoff policy and per-delivery retry state.
//! - `router`: The lead router.
//! - `routing`: Country, region and endpoint tables.
//! - `transport`: Transport capability and HTTP implementation.

pub mod api;
pub mod core;
pub mod integrations;

pub mod config;
pub mod environment;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod retry;
pub mod router;
pub mod routing;
pub mod transport;

pub use models::{LeadSubmission, Metadata, RawLeadData, SubmissionResult};
pub use router::LeadRouter;
pub use routing::{EndpointTable, Region, RegionMap, RoutingTable};
pub use transport::{HttpTransport, LeadTransport, TransportError};
