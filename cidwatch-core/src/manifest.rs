//! Manifest download and hash extraction
//!
//! A manifest is a file on IPFS listing further CIDs. It is either a JSON
//! array of strings or plain text with one or more CIDs per line, separated
//! by whitespace or commas. Entries keep their source order and duplicates
//! are preserved because callers number them by position.

use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::{debug, info};

use crate::codec;
use crate::gateway::ipfs_url;

/// Default cap on manifest size (10 MiB)
pub const DEFAULT_MAX_MANIFEST_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid CID: {0}")]
    InvalidCid(#[from] codec::CodecError),

    #[error("Gateway request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Gateway returned HTTP {status} for {url}")]
    Status { status: StatusCode, url: String },

    #[error("Manifest exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error("Malformed manifest: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, FetchError>;

/// Downloads manifests from an IPFS gateway
#[derive(Clone)]
pub struct ManifestFetcher {
    client: Client,
    gateway_url: String,
    max_bytes: usize,
}

impl ManifestFetcher {
    pub fn new(client: Client, gateway_url: impl Into<String>) -> Self {
        Self {
            client,
            gateway_url: gateway_url.into(),
            max_bytes: DEFAULT_MAX_MANIFEST_BYTES,
        }
    }

    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Download the manifest addressed by `cid` and return the CIDs it lists
    pub async fn fetch_and_extract_hashes(&self, cid: &str) -> Result<Vec<String>> {
        codec::parse(cid)?;

        let content = self.download(cid).await?;
        let hashes = parse_hash_list(&content)?;

        info!(
            "Manifest {}: extracted {} hashes from {} bytes",
            cid,
            hashes.len(),
            content.len()
        );
        Ok(hashes)
    }

    async fn download(&self, cid: &str) -> Result<Vec<u8>> {
        let url = ipfs_url(&self.gateway_url, cid);
        debug!("Fetching manifest from {}", url);

        let mut resp = self.client.get(&url).send().await?;
        if !resp.status().is_success() {
            return Err(FetchError::Status {
                status: resp.status(),
                url,
            });
        }

        if let Some(len) = resp.content_length() {
            if len > self.max_bytes as u64 {
                return Err(FetchError::TooLarge {
                    limit: self.max_bytes,
                });
            }
        }

        let mut content = Vec::new();
        while let Some(chunk) = resp.chunk().await? {
            if content.len() + chunk.len() > self.max_bytes {
                return Err(FetchError::TooLarge {
                    limit: self.max_bytes,
                });
            }
            content.extend_from_slice(&chunk);
        }

        Ok(content)
    }
}

/// Extract the ordered list of CIDs from manifest content.
///
/// Content starting with `[` must be a JSON array of strings. Anything else
/// is split on whitespace and commas. Candidates are stripped of surrounding
/// quotes and an `/ipfs/` or `ipfs://` prefix; those that still do not decode
/// as a CID are dropped.
pub fn parse_hash_list(content: &[u8]) -> Result<Vec<String>> {
    let text = std::str::from_utf8(content)
        .map_err(|e| FetchError::Parse(format!("content is not UTF-8: {}", e)))?;
    let text = text.trim_start_matches('\u{feff}').trim();

    if text.starts_with('[') {
        let entries: Vec<String> = serde_json::from_str(text)
            .map_err(|e| FetchError::Parse(format!("invalid JSON list: {}", e)))?;
        return Ok(entries
            .iter()
            .filter_map(|entry| normalize_candidate(entry))
            .map(str::to_string)
            .collect());
    }

    Ok(text
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter_map(normalize_candidate)
        .map(str::to_string)
        .collect())
}

fn normalize_candidate(raw: &str) -> Option<&str> {
    let trimmed = raw.trim().trim_matches(|c: char| c == '"' || c == '\'');
    let stripped = trimmed
        .strip_prefix("ipfs://")
        .or_else(|| trimmed.strip_prefix("/ipfs/"))
        .unwrap_or(trimmed);
    let candidate = stripped.trim_end_matches('/');

    if candidate.is_empty() || !codec::is_cid(candidate) {
        return None;
    }
    Some(candidate)
}
