//! A raw Flashbots-style relay API wrapper.
use alloy::{
    primitives::keccak256,
    rpc::types::mev::{EthBundleHash, EthSendBundle},
    signers::Signer,
};
use init4_bin_base::utils::signer::LocalOrAws;
use reqwest::header::CONTENT_TYPE;
use serde_json::json;
use std::time::Duration;

type Result<T> = core::result::Result<T, RelayError>;

/// Errors surfaced by one relay submission attempt.
///
/// None of these are fatal to the submission loop. The orchestrator logs
/// them and waits for the next block; the relay offers no retry for a
/// target height that has passed.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The relay did not respond within the bounded wait.
    #[error("relay did not respond within {0:?}")]
    Timeout(Duration),

    /// Error reaching the relay over HTTP.
    #[error("error contacting relay: {0}")]
    Http(reqwest::Error),

    /// The relay rejected the submission with a JSON-RPC error payload.
    /// Covers malformed bundles, stale target heights, rejected signatures,
    /// and relay-side throttling.
    #[error("relay rejected bundle: {message} (code {code})")]
    Rejected {
        /// JSON-RPC error code reported by the relay.
        code: i64,
        /// Human-readable message reported by the relay.
        message: String,
    },

    /// The relay responded with a body that is not valid JSON-RPC.
    #[error("malformed relay response: {0}")]
    MalformedResponse(#[from] serde_json::Error),

    /// Signing the submission attestation failed.
    #[error("failed to sign relay payload: {0}")]
    Signer(#[from] alloy::signers::Error),
}

/// A client for submitting bundles to one configured relay endpoint.
///
/// Every request carries an EIP-191 signature over the body hash in the
/// `X-Flashbots-Signature` header, produced by the same signer that
/// authorizes the bundled transactions. The relay uses it to reject
/// spoofed-origin submissions.
#[derive(Debug)]
pub struct Flashbots {
    /// The relay endpoint.
    pub relay_url: url::Url,
    /// Signer is loaded once at startup and shared by all attempts.
    signer: LocalOrAws,
    /// Bounded wait applied to each relay exchange.
    timeout: Duration,
    client: reqwest::Client,
}

impl Flashbots {
    /// Create a new relay client with a bounded per-request timeout.
    pub fn new(relay_url: url::Url, signer: LocalOrAws, timeout: Duration) -> eyre::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { relay_url, signer, timeout, client })
    }

    /// Submits a bundle for consideration in its target block via
    /// `eth_sendBundle`.
    ///
    /// An `Ok` acknowledgement means the relay accepted the bundle, NOT that
    /// it will be included - inclusion depends on whether the producer of
    /// the target block cooperates with this relay.
    pub async fn send_bundle(&self, bundle: &EthSendBundle) -> Result<EthBundleHash> {
        let params = serde_json::to_value(bundle)?;
        let v = self.raw_call("eth_sendBundle", params).await?;
        let hash: EthBundleHash =
            serde_json::from_value(v.get("result").cloned().unwrap_or(serde_json::Value::Null))?;
        Ok(hash)
    }

    /// Makes a raw JSON-RPC call with the Flashbots signature header to the
    /// method with the given params.
    async fn raw_call(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value> {
        let params = match params {
            serde_json::Value::Array(_) => params,
            other => serde_json::Value::Array(vec![other]),
        };

        let body = json!({"jsonrpc":"2.0","id":1,"method":method,"params":params});
        let body_bz = serde_json::to_vec(&body)?;

        let signature = self.flashbots_signature(&body_bz).await?;

        let resp = self
            .client
            .post(self.relay_url.as_str())
            .header(CONTENT_TYPE, "application/json")
            .header("X-Flashbots-Signature", signature)
            .body(body_bz)
            .send()
            .await
            .map_err(|err| self.classify(err))?;

        let text = resp.text().await.map_err(|err| self.classify(err))?;
        let v: serde_json::Value = serde_json::from_str(&text)?;

        if let Some(err) = v.get("error") {
            let code = err.get("code").and_then(serde_json::Value::as_i64).unwrap_or_default();
            let message = err
                .get("message")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("unknown relay error")
                .to_string();
            return Err(RelayError::Rejected { code, message });
        }
        Ok(v)
    }

    /// Maps a transport error to the relay error taxonomy, distinguishing
    /// the bounded-wait elapse from other HTTP failures.
    fn classify(&self, err: reqwest::Error) -> RelayError {
        if err.is_timeout() { RelayError::Timeout(self.timeout) } else { RelayError::Http(err) }
    }

    /// Builds an EIP-191 signature over the given body bytes for the
    /// `X-Flashbots-Signature` header.
    async fn flashbots_signature(&self, body_bz: &[u8]) -> Result<String> {
        let payload = format!("0x{:x}", keccak256(body_bz));
        let signature = self.signer.sign_message(payload.as_ref()).await?;
        let address = self.signer.address();
        Ok(format!("{address}:{signature}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_signer;

    #[tokio::test]
    async fn signature_header_is_address_colon_sig() {
        let signer = test_signer().await;
        let address = signer.address();

        let relay = Flashbots::new(
            "http://localhost:9062".parse().unwrap(),
            signer,
            Duration::from_secs(1),
        )
        .unwrap();

        let header = relay.flashbots_signature(b"{}").await.unwrap();
        let (addr, sig) = header.split_once(':').unwrap();
        assert_eq!(addr, address.to_string());
        assert!(sig.starts_with("0x"));
    }

    #[test]
    fn rejection_displays_relay_message() {
        let err = RelayError::Rejected { code: -32000, message: "bundle not accepted".into() };
        assert!(err.to_string().contains("bundle not accepted"));
    }
}
