//! Link liveness checking against an IPFS gateway
//!
//! Each CID is resolved through the check gateway with a GET request and the
//! response is classified by a [`BlockRule`]: listed status codes, any
//! non-2xx status (optional), or a block-page marker in the body.

use futures::stream::{self, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::codec;
use crate::gateway::ipfs_url;

/// How much of a response body is inspected for block-page markers
pub const MAX_INSPECTED_BODY_BYTES: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum LinkCheckError {
    #[error("Invalid CID: {0}")]
    InvalidCid(#[from] codec::CodecError),

    #[error("Link request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Why a link was classified as blocked
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockReason {
    /// Status code is in the rule's deny list
    DeniedStatus(u16),
    /// Status code is outside 2xx
    NonSuccess(u16),
    /// Body contains a block-page marker
    ContentMarker(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkStatus {
    Live,
    Blocked(BlockReason),
}

impl LinkStatus {
    pub fn is_blocked(&self) -> bool {
        matches!(self, LinkStatus::Blocked(_))
    }
}

/// What to do with a link whose check itself failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// List the failure separately and keep going
    #[default]
    Report,
    /// Count the link as blocked (fail-closed)
    Blocked,
}

/// Detection rule for blocked links
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockRule {
    pub status_codes: Vec<u16>,
    pub treat_non_success_as_blocked: bool,
    pub content_markers: Vec<String>,
}

impl Default for BlockRule {
    fn default() -> Self {
        Self {
            status_codes: vec![403, 410, 451],
            treat_non_success_as_blocked: true,
            content_markers: vec![
                "unavailable for legal reasons".to_string(),
                "this content has been blocked".to_string(),
                "blocked by the gateway operator".to_string(),
            ],
        }
    }
}

impl BlockRule {
    /// Classify by status code alone
    pub fn classify_status(&self, status: u16) -> Option<BlockReason> {
        if self.status_codes.contains(&status) {
            return Some(BlockReason::DeniedStatus(status));
        }
        if self.treat_non_success_as_blocked && !(200..300).contains(&status) {
            return Some(BlockReason::NonSuccess(status));
        }
        None
    }

    /// Find the first block-page marker in a body, case-insensitively
    pub fn classify_body(&self, body: &str) -> Option<BlockReason> {
        let lowered = body.to_lowercase();
        self.content_markers
            .iter()
            .find(|marker| !marker.is_empty() && lowered.contains(&marker.to_lowercase()))
            .map(|marker| BlockReason::ContentMarker(marker.clone()))
    }
}

/// Checks whether published links are blocked
#[derive(Clone)]
pub struct LinkChecker {
    client: Client,
    gateway_url: String,
    rule: BlockRule,
    concurrency: usize,
}

impl LinkChecker {
    pub fn new(client: Client, gateway_url: impl Into<String>, rule: BlockRule) -> Self {
        Self {
            client,
            gateway_url: gateway_url.into(),
            rule,
            concurrency: 1,
        }
    }

    /// Allow up to `concurrency` checks in flight; results keep input order
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub async fn is_blocked(&self, cid: &str) -> Result<bool, LinkCheckError> {
        Ok(self.check(cid).await?.is_blocked())
    }

    /// Resolve a CID through the gateway and classify the response
    pub async fn check(&self, cid: &str) -> Result<LinkStatus, LinkCheckError> {
        codec::parse(cid)?;

        let url = ipfs_url(&self.gateway_url, cid);
        let mut resp = self.client.get(&url).send().await?;
        let status = resp.status().as_u16();

        if let Some(reason) = self.rule.classify_status(status) {
            debug!("Link {} blocked: HTTP {}", cid, status);
            return Ok(LinkStatus::Blocked(reason));
        }

        if self.rule.content_markers.is_empty() {
            return Ok(LinkStatus::Live);
        }

        let mut body = Vec::new();
        while let Some(chunk) = resp.chunk().await? {
            let room = MAX_INSPECTED_BODY_BYTES - body.len();
            body.extend_from_slice(&chunk[..chunk.len().min(room)]);
            if body.len() >= MAX_INSPECTED_BODY_BYTES {
                break;
            }
        }

        match self.rule.classify_body(&String::from_utf8_lossy(&body)) {
            Some(reason) => {
                debug!("Link {} blocked: {:?}", cid, reason);
                Ok(LinkStatus::Blocked(reason))
            }
            None => Ok(LinkStatus::Live),
        }
    }

    /// Check every CID, one outcome per input in input order.
    ///
    /// A failed check never stops the remaining ones.
    pub async fn check_all(&self, cids: &[String]) -> Vec<Result<LinkStatus, LinkCheckError>> {
        stream::iter(cids.iter().cloned())
            .map(|cid| async move {
                let outcome = self.check(&cid).await;
                if let Err(e) = &outcome {
                    warn!("Link check for {} failed: {}", cid, e);
                }
                outcome
            })
            .buffered(self.concurrency)
            .collect()
            .await
    }
}
