//! REST API: `POST /processCID` and health check

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::auth::{require_auth, AuthError, Authenticator, BearerToken};
use crate::codec;
use crate::config::Config;
use crate::gateway::build_client;
use crate::linkcheck::LinkChecker;
use crate::manifest::{FetchError, ManifestFetcher};
use crate::report::{ReportMode, Reporter};

const INVALID_OPTION: &str =
    "Invalid option. Please provide either 'digest', 'list', or 'checklink' as the first argument.";
const MISSING_CID: &str =
    "CID value is missing. Please provide the CID value as the second argument.";
const FETCH_FAILED: &str = "Error while fetching the list of CIDs:";

/// API state shared across handlers
#[derive(Clone)]
pub struct ApiState {
    pub reporter: Reporter,
    pub authenticator: Arc<dyn Authenticator>,
}

impl ApiState {
    /// Wire the fetcher, checker and bearer-token check from configuration
    pub fn from_config(config: &Config) -> reqwest::Result<Self> {
        let client = build_client(config.request_timeout())?;

        let fetcher = ManifestFetcher::new(client.clone(), config.gateway_url.clone())
            .with_max_bytes(config.max_manifest_bytes);
        let checker = LinkChecker::new(
            client,
            config.check_gateway().to_string(),
            config.block_rule.clone(),
        )
        .with_concurrency(config.check_concurrency);
        let reporter = Reporter::new(fetcher, checker)
            .with_display_quirk(config.display_quirk)
            .with_failure_policy(config.on_check_error);

        Ok(Self {
            reporter,
            authenticator: Arc::new(BearerToken::new(config.auth_key.clone())),
        })
    }
}

/// Body of `POST /processCID`
#[derive(Debug, Serialize, Deserialize)]
pub struct ProcessCidRequest {
    #[serde(default)]
    pub option: Option<String>,
    #[serde(default, rename = "inputCid")]
    pub input_cid: Option<String>,
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Create the REST API router
pub fn create_router(state: ApiState) -> Router {
    let protected = Router::new()
        .route("/processCID", post(process_cid))
        .route_layer(middleware::from_fn_with_state(
            state.authenticator.clone(),
            require_auth,
        ));

    Router::new()
        .route("/health", get(health_check))
        .merge(protected)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Run one report (POST /processCID)
async fn process_cid(
    State(state): State<ApiState>,
    payload: Result<Json<ProcessCidRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) =
        payload.map_err(|e| ApiError::InvalidRequest(format!("Invalid request body: {}", e)))?;

    let mode: ReportMode = request
        .option
        .as_deref()
        .and_then(|option| option.parse().ok())
        .ok_or_else(|| ApiError::InvalidRequest(INVALID_OPTION.to_string()))?;

    let input_cid = request
        .input_cid
        .filter(|cid| !cid.is_empty())
        .ok_or_else(|| ApiError::InvalidRequest(MISSING_CID.to_string()))?;

    codec::parse(&input_cid)
        .map_err(|e| ApiError::InvalidRequest(format!("Invalid CID value: {}", e)))?;

    info!("API: {:?} report for {}", mode, input_cid);

    let body = match mode {
        ReportMode::Digest => {
            let digests = state.reporter.digest(&input_cid).await?;
            json!({ "List of hash digest:": digests })
        }
        ReportMode::List => {
            let hashes = state.reporter.list(&input_cid).await?;
            json!({ "List of hashes:": hashes })
        }
        ReportMode::Checklink => {
            let report = state.reporter.check_links(&input_cid).await?;
            let mut body = json!({
                "List of blocked IPFS links:": report.blocked,
                "totalBlocked": report.blocked.len(),
            });
            if !report.errors.is_empty() {
                body["errors"] = json!(report.errors);
            }
            body
        }
    };

    Ok(Json(body))
}

/// API error type
#[derive(Debug)]
pub enum ApiError {
    InvalidRequest(String),
    Unauthorized(AuthError),
    Fetch(FetchError),
}

impl From<FetchError> for ApiError {
    fn from(e: FetchError) -> Self {
        ApiError::Fetch(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::InvalidRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: msg,
                    details: None,
                },
            ),
            ApiError::Unauthorized(e) => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse {
                    error: e.to_string(),
                    details: None,
                },
            ),
            ApiError::Fetch(e) => {
                error!("API error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        error: FETCH_FAILED.to_string(),
                        details: Some(e.to_string()),
                    },
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
