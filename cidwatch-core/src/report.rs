//! Report modes served by `POST /processCID`
//!
//! Every mode fetches the manifest for the input CID and numbers entries
//! from 1, with the input CID itself always first.

use tracing::info;

use crate::codec::{self, CodecError};
use crate::linkcheck::{FailurePolicy, LinkCheckError, LinkChecker, LinkStatus};
use crate::manifest::{FetchError, ManifestFetcher};

/// Requested report mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportMode {
    Digest,
    List,
    Checklink,
}

impl std::str::FromStr for ReportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "digest" => Ok(ReportMode::Digest),
            "list" => Ok(ReportMode::List),
            "checklink" => Ok(ReportMode::Checklink),
            other => Err(format!("unknown report mode: {}", other)),
        }
    }
}

/// Result of the `checklink` mode
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockedReport {
    /// Display digests of blocked links, numbered by list position
    pub blocked: Vec<String>,
    /// Links whose check failed under [`FailurePolicy::Report`]
    pub errors: Vec<String>,
}

/// Composes the manifest fetcher, codec and link checker into reports
#[derive(Clone)]
pub struct Reporter {
    fetcher: ManifestFetcher,
    checker: LinkChecker,
    display_quirk: bool,
    failure_policy: FailurePolicy,
}

impl Reporter {
    pub fn new(fetcher: ManifestFetcher, checker: LinkChecker) -> Self {
        Self {
            fetcher,
            checker,
            display_quirk: true,
            failure_policy: FailurePolicy::default(),
        }
    }

    pub fn with_display_quirk(mut self, enabled: bool) -> Self {
        self.display_quirk = enabled;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// `"CID <index>: <display digest>"`
    pub fn digest_line(&self, cid: &str, index: usize) -> Result<String, CodecError> {
        Ok(format!(
            "CID {}: {}",
            index,
            codec::display_digest(cid, self.display_quirk)?
        ))
    }

    /// Input CID followed by the manifest entries
    async fn numbered_hashes(&self, input_cid: &str) -> Result<Vec<String>, FetchError> {
        let mut hashes = vec![input_cid.to_string()];
        hashes.extend(self.fetcher.fetch_and_extract_hashes(input_cid).await?);
        Ok(hashes)
    }

    pub async fn list(&self, input_cid: &str) -> Result<Vec<String>, FetchError> {
        let hashes = self.numbered_hashes(input_cid).await?;

        Ok(hashes
            .iter()
            .enumerate()
            .map(|(i, cid)| format!("CID {}: {}", i + 1, cid))
            .collect())
    }

    pub async fn digest(&self, input_cid: &str) -> Result<Vec<String>, FetchError> {
        let hashes = self.numbered_hashes(input_cid).await?;

        hashes
            .iter()
            .enumerate()
            .map(|(i, cid)| self.digest_line(cid, i + 1).map_err(FetchError::from))
            .collect()
    }

    pub async fn check_links(&self, input_cid: &str) -> Result<BlockedReport, FetchError> {
        let hashes = self.numbered_hashes(input_cid).await?;
        info!("Checking {} links for {}", hashes.len(), input_cid);

        let outcomes = self.checker.check_all(&hashes).await;
        let mut report = BlockedReport::default();

        for (i, (cid, outcome)) in hashes.iter().zip(outcomes).enumerate() {
            let index = i + 1;
            match (outcome, self.failure_policy) {
                (Ok(LinkStatus::Live), _) => {}
                (Ok(LinkStatus::Blocked(_)), _) | (Err(_), FailurePolicy::Blocked) => {
                    report.blocked.push(self.digest_line(cid, index)?);
                }
                (Err(e), FailurePolicy::Report) => {
                    report.errors.push(failure_line(cid, index, &e));
                }
            }
        }

        info!(
            "Link check for {}: {} blocked, {} failed",
            input_cid,
            report.blocked.len(),
            report.errors.len()
        );
        Ok(report)
    }
}

fn failure_line(cid: &str, index: usize, error: &LinkCheckError) -> String {
    format!("CID {}: {} ({})", index, cid, error)
}
