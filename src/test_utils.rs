//! Test utilities for testing searcher tasks.
use crate::{config::SearcherConfig, tasks::call::CallSpec};
use alloy::primitives::{Address, B256, Bytes, U256};
use axum::{
    Json, Router,
    extract::State,
    http::HeaderMap,
    routing::post,
};
use eyre::Result;
use init4_bin_base::{
    deps::tracing_subscriber::{
        EnvFilter, Layer, fmt, layer::SubscriberExt, registry, util::SubscriberInitExt,
    },
    utils::signer::LocalOrAws,
};
use serde_json::{Value, json};
use std::{
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

/// Private key used by test signers.
pub const TEST_KEY: &str = "1111111111111111111111111111111111111111111111111111111111111111";

/// Sets up a searcher config with test values.
pub fn setup_test_config() -> Result<SearcherConfig> {
    let config = SearcherConfig {
        ws_rpc: "ws://localhost:8546".parse()?,
        relay_url: "http://localhost:9062".parse()?,
        chain_id: 5,
        searcher_key: TEST_KEY.into(),
        target_address: Address::repeat_byte(0x42),
        call_signature: "mint()".into(),
        call_value: 10_000_000_000_000_000, // 0.01 ether
        max_fee_per_gas: 3_000_000_000,
        max_priority_fee_per_gas: 2_000_000_000,
        gas_limit: 2_201_501,
        relay_timeout_secs: 1,
        inflight_limit: Some(4),
        searcher_port: 8080,
    };
    Ok(config)
}

/// Returns the call spec matching [`setup_test_config`].
pub fn test_call_spec() -> CallSpec {
    CallSpec::new(
        Address::repeat_byte(0x42),
        "mint()",
        Bytes::new(),
        U256::from(10_000_000_000_000_000u64),
        3_000_000_000,
        2_000_000_000,
        2_201_501,
        5,
    )
    .expect("test call spec is valid")
}

/// Returns a deterministic local signer for tests.
pub async fn test_signer() -> LocalOrAws {
    LocalOrAws::load(TEST_KEY, Some(5)).await.expect("test key loads")
}

/// Initializes a logger that prints during testing.
pub fn setup_logging() {
    // Initialize logging
    let filter = EnvFilter::from_default_env();
    let fmt = fmt::layer().with_filter(filter);
    let registry = registry().with(fmt);
    let _ = registry.try_init();
}

/// A canned JSON-RPC acknowledgement for the mock relay.
pub fn ack_response(bundle_hash: B256) -> Value {
    json!({"jsonrpc": "2.0", "id": 1, "result": {"bundleHash": bundle_hash}})
}

/// A canned JSON-RPC error payload for the mock relay.
pub fn error_response(code: i64, message: &str) -> Value {
    json!({"jsonrpc": "2.0", "id": 1, "error": {"code": code, "message": message}})
}

/// A request captured by the mock relay.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// Value of the `X-Flashbots-Signature` header, if present.
    pub signature: Option<String>,
    /// The JSON-RPC request body.
    pub body: Value,
    /// When the request reached the mock relay.
    pub received_at: Instant,
}

/// Shared handle to the requests captured by a mock relay.
#[derive(Debug, Clone, Default)]
pub struct RelayRecorder {
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl RelayRecorder {
    /// Snapshot of the captured requests, in arrival order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of requests captured so far.
    pub fn len(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// True if no requests were captured yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone)]
struct MockRelayState {
    recorder: RelayRecorder,
    response: Value,
    delay: Duration,
}

/// Spawns a mock relay on an ephemeral port that records every request and
/// answers each with the given canned response after the given delay.
pub async fn spawn_mock_relay(response: Value, delay: Duration) -> (url::Url, RelayRecorder) {
    let recorder = RelayRecorder::default();
    let state = MockRelayState { recorder: recorder.clone(), response, delay };
    let router = Router::new().route("/", post(relay_handler)).with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("binds ephemeral");
    let url = format!("http://{}", listener.local_addr().expect("has local addr"))
        .parse()
        .expect("valid url");

    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, router).await {
            tracing::error!(%err, "mock relay serve failed");
        }
    });

    (url, recorder)
}

async fn relay_handler(
    State(state): State<MockRelayState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    let signature = headers
        .get("x-flashbots-signature")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    state.recorder.requests.lock().unwrap().push(RecordedRequest {
        signature,
        body,
        received_at: Instant::now(),
    });

    tokio::time::sleep(state.delay).await;
    Json(state.response.clone())
}

/// Spawns a stub chain RPC on an ephemeral port. Answers just enough of the
/// JSON-RPC surface for the fill provider to assign a nonce and sign.
pub async fn spawn_mock_chain() -> url::Url {
    let router = Router::new().route("/", post(chain_handler));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("binds ephemeral");
    let url = format!("http://{}", listener.local_addr().expect("has local addr"))
        .parse()
        .expect("valid url");

    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, router).await {
            tracing::error!(%err, "mock chain serve failed");
        }
    });

    url
}

async fn chain_handler(Json(body): Json<Value>) -> Json<Value> {
    let id = body.get("id").cloned().unwrap_or(json!(1));
    let result = match body.get("method").and_then(Value::as_str).unwrap_or_default() {
        "eth_chainId" => json!("0x5"),
        "eth_getTransactionCount" => json!("0x0"),
        "eth_blockNumber" => json!("0x64"),
        _ => json!("0x0"),
    };
    Json(json!({"jsonrpc": "2.0", "id": id, "result": result}))
}
