//! End-to-end tests: a running cidwatch server in front of a mock IPFS gateway
//!
//! These tests verify the full request path:
//! - Bearer-token authentication
//! - Manifest download and hash extraction
//! - Digest formatting and blocked-link reporting

use cidwatch_core::{codec, runtime::serve, Cid, Config, FailurePolicy};
use httpmock::Method::GET;
use httpmock::MockServer;
use multihash::Multihash;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

const TOKEN: &str = "integration-token";

/// Initialize tracing for tests
fn init_tracing() {
    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

fn cid_for(data: &[u8]) -> String {
    let hash = Sha256::digest(data);
    let mh = Multihash::<64>::wrap(0x12, &hash).unwrap();
    Cid::new_v0(mh).unwrap().to_string()
}

async fn start(config: Config) -> SocketAddr {
    init_tracing();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve(listener, config));
    addr
}

fn config_for(gateway: &MockServer) -> Config {
    Config {
        auth_key: TOKEN.to_string(),
        gateway_url: gateway.base_url(),
        request_timeout_secs: 5,
        ..Config::default()
    }
}

async fn post(addr: SocketAddr, body: Value) -> (u16, Value) {
    let resp = reqwest::Client::new()
        .post(format!("http://{}/processCID", addr))
        .bearer_auth(TOKEN)
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

/// Five links, positions 2 and 4 blocked
#[tokio::test]
async fn test_checklink_counts_blocked_positions() {
    let gateway = MockServer::start_async().await;
    let root = cid_for(b"root");
    let entries: Vec<String> = (1..=4u8).map(|i| cid_for(&[i])).collect();

    gateway
        .mock_async(|when, then| {
            when.method(GET).path(format!("/ipfs/{}", root));
            then.status(200).body(entries.join("\n"));
        })
        .await;
    for (i, cid) in entries.iter().enumerate() {
        let position = i + 2;
        let status = if position == 2 || position == 4 { 451 } else { 200 };
        gateway
            .mock_async(|when, then| {
                when.method(GET).path(format!("/ipfs/{}", cid));
                then.status(status).body("content");
            })
            .await;
    }

    let addr = start(config_for(&gateway)).await;
    let (status, body) = post(addr, json!({ "option": "checklink", "inputCid": root })).await;

    assert_eq!(status, 200);
    assert_eq!(body["totalBlocked"], 2);
    assert_eq!(
        body["List of blocked IPFS links:"],
        json!([
            format!("CID 2: {}", codec::display_digest(&entries[0], true).unwrap()),
            format!("CID 4: {}", codec::display_digest(&entries[2], true).unwrap()),
        ])
    );
}

/// Unreachable links are reported separately and do not abort the batch
#[tokio::test]
async fn test_checklink_survives_failed_check() {
    let gateway = MockServer::start_async().await;
    let root = cid_for(b"root");
    let slow = cid_for(b"slow");
    let blocked = cid_for(b"blocked");

    gateway
        .mock_async(|when, then| {
            when.method(GET).path(format!("/ipfs/{}", root));
            then.status(200).body(format!("{}\n{}", slow, blocked));
        })
        .await;
    gateway
        .mock_async(|when, then| {
            when.method(GET).path(format!("/ipfs/{}", slow));
            then.status(200).delay(Duration::from_secs(3)).body("late");
        })
        .await;
    gateway
        .mock_async(|when, then| {
            when.method(GET).path(format!("/ipfs/{}", blocked));
            then.status(403);
        })
        .await;

    let config = Config {
        request_timeout_secs: 1,
        check_concurrency: 2,
        ..config_for(&gateway)
    };
    let addr = start(config.clone()).await;
    let (status, body) = post(addr, json!({ "option": "checklink", "inputCid": root })).await;

    assert_eq!(status, 200);
    assert_eq!(body["totalBlocked"], 1);
    let errors = body["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].as_str().unwrap().starts_with(&format!("CID 2: {}", slow)));

    let fail_closed = Config {
        on_check_error: FailurePolicy::Blocked,
        ..config
    };
    let addr = start(fail_closed).await;
    let (status, body) = post(addr, json!({ "option": "checklink", "inputCid": root })).await;

    assert_eq!(status, 200);
    assert_eq!(body["totalBlocked"], 2);
    assert!(body.get("errors").is_none());
}

#[tokio::test]
async fn test_digest_without_quirk() {
    let gateway = MockServer::start_async().await;
    let root = cid_for(b"root");

    gateway
        .mock_async(|when, then| {
            when.method(GET).path(format!("/ipfs/{}", root));
            then.status(200).body("");
        })
        .await;

    let config = Config {
        display_quirk: false,
        ..config_for(&gateway)
    };
    let addr = start(config).await;
    let (status, body) = post(addr, json!({ "option": "digest", "inputCid": root })).await;

    assert_eq!(status, 200);
    assert_eq!(
        body["List of hash digest:"],
        json!([format!("CID 1: BASE32 ENCODING (V1): {}", root.to_uppercase())])
    );
}

#[tokio::test]
async fn test_gateway_down_is_500() {
    let config = Config {
        auth_key: TOKEN.to_string(),
        gateway_url: "http://127.0.0.1:1".to_string(),
        request_timeout_secs: 2,
        ..Config::default()
    };
    let addr = start(config).await;
    let (status, body) = post(addr, json!({ "option": "list", "inputCid": cid_for(b"x") })).await;

    assert_eq!(status, 500);
    assert_eq!(body["error"], "Error while fetching the list of CIDs:");
    assert!(body["details"].is_string());
}
