//! cidwatch Core
//!
//! CID codec, manifest fetching, link liveness checking and the HTTP API
//! that composes them into digest, list and blocked-link reports.

pub mod api;
pub mod auth;
pub mod codec;
pub mod config;
pub mod gateway;
pub mod linkcheck;
pub mod manifest;
pub mod report;
pub mod runtime;

pub use api::{create_router, ApiError, ApiState, ProcessCidRequest};
pub use auth::{AuthError, Authenticator, BearerToken};
pub use codec::{display_digest, strip_after_separator, CidInfo, CodecError};
pub use config::{Config, ConfigError};
pub use linkcheck::{BlockReason, BlockRule, FailurePolicy, LinkCheckError, LinkChecker, LinkStatus};
pub use manifest::{parse_hash_list, FetchError, ManifestFetcher};
pub use report::{BlockedReport, ReportMode, Reporter};
pub use runtime::{run_server, serve, ServerError};

// Re-export Cid for external use
pub use cid::Cid;
