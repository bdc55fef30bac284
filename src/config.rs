use crate::tasks::{call::CallSpec, submit::Flashbots};
use alloy::{
    network::{Ethereum, EthereumWallet},
    primitives::{Address, Bytes, U256},
    providers::{
        Identity, ProviderBuilder, RootProvider,
        fillers::{
            BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller,
            SimpleNonceManager, WalletFiller,
        },
    },
};
use eyre::Result;
use init4_bin_base::utils::{from_env::FromEnv, provider::PubSubConfig, signer::LocalOrAws};
use std::time::Duration;
use tokio::join;

/// Type alias for the pubsub provider used to watch the chain head.
pub type WatchProvider = RootProvider<Ethereum>;

/// The provider type used to fill and sign the per-block bundle transaction.
pub type ChainProvider = FillProvider<
    JoinFill<
        JoinFill<
            JoinFill<
                JoinFill<JoinFill<Identity, BlobGasFiller>, GasFiller>,
                NonceFiller<SimpleNonceManager>,
            >,
            ChainIdFiller,
        >,
        WalletFiller<EthereumWallet>,
    >,
    RootProvider,
>;

/// The default cap on simultaneous in-flight relay submissions if no
/// user-specified value is set.
pub const DEFAULT_INFLIGHT_LIMIT: usize = 8;

/// Configuration for a searcher submitting one bundle per observed block to
/// a single relay on a single chain.
#[derive(Debug, Clone, FromEnv)]
pub struct SearcherConfig {
    /// URL for the chain RPC node.
    #[from_env(
        var = "WS_RPC_URL",
        desc = "URL for the chain RPC node. This MUST be a valid WS url starting with ws:// or wss://. Http providers cannot serve the block subscription."
    )]
    pub ws_rpc: PubSubConfig,

    /// URL of the relay that receives the per-block bundles.
    #[from_env(var = "RELAY_URL", desc = "Relay endpoint for privately submitting bundles")]
    pub relay_url: url::Url,

    /// Chain ID of the target network.
    #[from_env(var = "CHAIN_ID", desc = "Chain ID of the target network")]
    pub chain_id: u64,

    /// Key for the searcher wallet - AWS Key ID _OR_ local private key.
    /// Authorizes the bundled transaction and attests the relay submission.
    #[from_env(
        var = "SEARCHER_KEY",
        desc = "Key for the searcher wallet - AWS Key ID _OR_ local private key",
        infallible
    )]
    pub searcher_key: String,

    /// Address of the deployed contract called every block.
    #[from_env(var = "TARGET_ADDRESS", desc = "Address of the deployed contract called every block")]
    pub target_address: Address,

    /// Solidity signature of the function called on the target contract.
    #[from_env(
        var = "CALL_SIGNATURE",
        desc = "Solidity signature of the function called on the target contract, e.g. mint()",
        infallible
    )]
    pub call_signature: String,

    /// Value in wei attached to the call.
    #[from_env(var = "CALL_VALUE", desc = "Value in wei attached to the call")]
    pub call_value: u64,

    /// Fee ceiling per gas unit, in wei.
    #[from_env(
        var = "MAX_FEE_PER_GAS",
        desc = "Fee ceiling per gas unit, in wei",
        default = 3000000000
    )]
    pub max_fee_per_gas: u64,

    /// Priority fee ceiling per gas unit, in wei.
    #[from_env(
        var = "MAX_PRIORITY_FEE_PER_GAS",
        desc = "Priority fee ceiling per gas unit, in wei",
        default = 2000000000
    )]
    pub max_priority_fee_per_gas: u64,

    /// Gas limit for the bundled transaction.
    #[from_env(var = "GAS_LIMIT", desc = "Gas limit for the bundled transaction", default = 2201501)]
    pub gas_limit: u64,

    /// Bounded wait for each relay exchange, in seconds.
    #[from_env(
        var = "RELAY_TIMEOUT_SECS",
        desc = "Bounded wait for each relay exchange, in seconds",
        default = 5
    )]
    pub relay_timeout_secs: u64,

    /// The max number of simultaneous in-flight relay submissions.
    #[from_env(
        var = "INFLIGHT_LIMIT",
        desc = "The max number of simultaneous in-flight relay submissions"
    )]
    pub inflight_limit: Option<usize>,

    /// Port for the searcher healthcheck server.
    #[from_env(var = "SEARCHER_PORT", desc = "Port for the searcher healthcheck server")]
    pub searcher_port: u16,
}

impl SearcherConfig {
    /// Connect to the searcher signer.
    pub async fn connect_signer(&self) -> Result<LocalOrAws> {
        static ONCE: tokio::sync::OnceCell<LocalOrAws> = tokio::sync::OnceCell::const_new();

        ONCE.get_or_try_init(|| async {
            LocalOrAws::load(&self.searcher_key, Some(self.chain_id)).await
        })
        .await
        .cloned()
        .map_err(Into::into)
    }

    /// Connect to the pubsub provider used for the block subscription.
    pub async fn connect_watch_provider(&self) -> Result<WatchProvider> {
        static ONCE: tokio::sync::OnceCell<WatchProvider> = tokio::sync::OnceCell::const_new();

        ONCE.get_or_try_init(|| async {
            RootProvider::connect_with(self.ws_rpc.clone()).await.map_err(Into::into)
        })
        .await
        .cloned()
    }

    /// Connect to the fill provider used to sign the bundle transaction.
    pub async fn connect_provider(&self) -> Result<ChainProvider> {
        let (provider, signer) = join!(self.connect_watch_provider(), self.connect_signer());

        Ok(ProviderBuilder::new_with_network()
            .disable_recommended_fillers()
            .filler(BlobGasFiller::default())
            .with_gas_estimation()
            .with_nonce_management(SimpleNonceManager::default())
            .fetch_chain_id()
            .wallet(EthereumWallet::from(signer?))
            .connect_provider(provider?))
    }

    /// Connect to the relay client.
    pub async fn connect_relay(&self) -> Result<Flashbots> {
        let signer = self.connect_signer().await?;
        Flashbots::new(self.relay_url.clone(), signer, self.relay_timeout())
    }

    /// Build the validated call spec from the configured call parameters.
    /// Fails fast on a malformed signature or inverted fee ceilings.
    pub fn call_spec(&self) -> Result<CallSpec> {
        CallSpec::new(
            self.target_address,
            &self.call_signature,
            Bytes::new(),
            U256::from(self.call_value),
            self.max_fee_per_gas as u128,
            self.max_priority_fee_per_gas as u128,
            self.gas_limit,
            self.chain_id,
        )
    }

    /// The bounded wait applied to each relay exchange.
    pub const fn relay_timeout(&self) -> Duration {
        Duration::from_secs(self.relay_timeout_secs)
    }

    /// The cap on simultaneous in-flight relay submissions.
    pub fn inflight_limit(&self) -> usize {
        match self.inflight_limit {
            Some(limit) if limit > 0 => limit,
            _ => DEFAULT_INFLIGHT_LIMIT,
        }
    }
}
