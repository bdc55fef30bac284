use init4_bin_base::{
    deps::tracing::{info, info_span},
    utils::from_env::FromEnv,
};
use searcher::{
    config::SearcherConfig,
    service::serve_searcher,
    tasks::{submit::SubmitTask, watcher::BlockWatcher},
};
use std::sync::Arc;
use tokio::select;

// Note: Must be set to `multi_thread` to support async tasks.
// See: https://docs.rs/tokio/latest/tokio/attr.main.html
#[tokio::main(flavor = "multi_thread")]
async fn main() -> eyre::Result<()> {
    let _guard = init4_bin_base::init4();
    let init_span_guard = info_span!("searcher initialization");

    // Pull the configuration from the environment
    let config = SearcherConfig::from_env()?;

    // Validate the call parameters before touching the network
    let call = config.call_spec()?;

    // Connect the signer, providers, and relay client
    let watcher = BlockWatcher::new(&config).await?;
    let provider = config.connect_provider().await?;
    let relay = Arc::new(config.connect_relay().await?);

    // Spawn the chain head watcher
    let (events, watcher_jh) = watcher.spawn();

    // Spawn the submit task, fed by the watcher channel
    let submit = SubmitTask { config: config.clone(), call, provider, relay };
    let submit_jh = submit.spawn(events);

    // Start the healthcheck server
    let server = serve_searcher(([0, 0, 0, 0], config.searcher_port));

    // We have finished initializing the searcher, so we can drop the init
    // span guard.
    drop(init_span_guard);

    select! {
        _ = watcher_jh => {
            info!("watcher task finished");
        },
        _ = submit_jh => {
            info!("submit task finished");
        },
        _ = server => {
            info!("server finished");
        }
    }

    info!("shutting down");

    Ok(())
}
