//! Tests for the relay client against an in-process mock relay.
use alloy::{primitives::B256, rpc::types::mev::EthSendBundle};
use searcher::{
    tasks::submit::{Flashbots, RelayError},
    test_utils::{ack_response, error_response, setup_logging, spawn_mock_relay, test_signer},
};
use std::time::{Duration, Instant};

async fn connect(relay_url: url::Url, timeout: Duration) -> Flashbots {
    Flashbots::new(relay_url, test_signer().await, timeout).expect("relay client builds")
}

fn test_bundle(target_block: u64) -> EthSendBundle {
    EthSendBundle { block_number: target_block, ..Default::default() }
}

#[tokio::test]
async fn acknowledgement_carries_bundle_hash() {
    setup_logging();
    let hash = B256::repeat_byte(0xab);
    let (url, recorder) = spawn_mock_relay(ack_response(hash), Duration::ZERO).await;

    let relay = connect(url, Duration::from_secs(2)).await;
    let ack = relay.send_bundle(&test_bundle(101)).await.expect("relay accepts");

    assert_eq!(ack.bundle_hash, hash);
    assert_eq!(recorder.len(), 1);
}

#[tokio::test]
async fn request_is_signed_json_rpc() {
    let (url, recorder) = spawn_mock_relay(ack_response(B256::ZERO), Duration::ZERO).await;

    let relay = connect(url, Duration::from_secs(2)).await;
    relay.send_bundle(&test_bundle(101)).await.expect("relay accepts");

    let requests = recorder.requests();
    let request = &requests[0];

    let signature = request.signature.as_deref().expect("signature header present");
    assert!(signature.contains(':'));

    assert_eq!(request.body["jsonrpc"], "2.0");
    assert_eq!(request.body["method"], "eth_sendBundle");
    // params is the bundle object wrapped in an array
    assert_eq!(request.body["params"][0]["blockNumber"], "0x65");
}

#[tokio::test]
async fn rejection_surfaces_relay_message() {
    let (url, _recorder) =
        spawn_mock_relay(error_response(-32000, "bundle not accepted"), Duration::ZERO).await;

    let relay = connect(url, Duration::from_secs(2)).await;
    let err = relay.send_bundle(&test_bundle(101)).await.unwrap_err();

    assert!(matches!(err, RelayError::Rejected { code: -32000, .. }));
    assert!(err.to_string().contains("bundle not accepted"));
}

#[tokio::test]
async fn unresponsive_relay_resolves_within_timeout_bound() {
    // Relay sits on the request far longer than the client's bounded wait.
    let (url, _recorder) = spawn_mock_relay(ack_response(B256::ZERO), Duration::from_secs(30)).await;

    let relay = connect(url, Duration::from_secs(1)).await;

    let start = Instant::now();
    let err = relay.send_bundle(&test_bundle(101)).await.unwrap_err();

    assert!(matches!(err, RelayError::Timeout(_)));
    assert!(start.elapsed() < Duration::from_secs(3));
}
