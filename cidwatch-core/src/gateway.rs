//! IPFS gateway plumbing shared by the manifest fetcher and link checker

use std::time::Duration;

use reqwest::Client;

/// Build the reqwest client used for every outbound gateway request.
///
/// Redirects are followed (reqwest's default policy of up to 10 hops).
pub fn build_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("cidwatch/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Gateway path URL for a CID (`{base}/ipfs/{cid}`)
pub fn ipfs_url(base: &str, cid: &str) -> String {
    format!("{}/ipfs/{}", base.trim_end_matches('/'), cid)
}
