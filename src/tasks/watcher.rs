//! Chain head subscription task.
use crate::config::{SearcherConfig, WatchProvider};
use alloy::{primitives::B256, providers::Provider};
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_stream::StreamExt;
use tracing::{debug, error, info, info_span};

/// A new chain head observed on the watched chain.
///
/// Heights are monotonically increasing in the order the provider reports
/// them, but are not guaranteed to be consecutive: a provider may coalesce
/// rapid blocks and skip heights.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockEvent {
    /// Height of the observed block.
    pub number: u64,
    /// Hash of the observed block header.
    pub hash: B256,
}

/// A task that maintains the block subscription and emits one [`BlockEvent`]
/// per new header reported by the provider.
///
/// If the subscription cannot be established or ends, the task exits after
/// an error-level log. The binary treats that exit as fatal, so a dropped
/// subscription terminates the process with a reported connectivity error
/// rather than stalling silently.
#[derive(Debug)]
pub struct BlockWatcher {
    provider: WatchProvider,
}

impl BlockWatcher {
    /// Create a new [`BlockWatcher`] connected per the given config.
    pub async fn new(config: &SearcherConfig) -> eyre::Result<Self> {
        let provider = config.connect_watch_provider().await?;
        Ok(Self { provider })
    }

    async fn task_future(self, sender: mpsc::UnboundedSender<BlockEvent>) {
        let span = info_span!("BlockWatcher::task_future::init");

        let mut headers = match self.provider.subscribe_blocks().await {
            Ok(sub) => sub,
            Err(err) => {
                span_error!(span, %err, "failed to subscribe to new blocks");
                return;
            }
        }
        .into_stream();

        span_debug!(span, "subscribed to chain heads");
        drop(span);

        while let Some(header) = headers.next().await {
            let event = BlockEvent { number: header.number, hash: header.hash };
            info!(number = event.number, hash = %event.hash, "observed new chain head");

            if sender.send(event).is_err() {
                debug!("downstream task gone - exiting watcher");
                return;
            }
        }

        error!("block subscription ended - chain connectivity lost");
    }

    /// Spawns the watcher and returns the receiving end of the block event
    /// channel along with the task handle.
    pub fn spawn(self) -> (mpsc::UnboundedReceiver<BlockEvent>, JoinHandle<()>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let handle = tokio::spawn(self.task_future(sender));
        (receiver, handle)
    }
}
