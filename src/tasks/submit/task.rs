//! Submit task receives chain head events from the watcher and dispatches
//! one independent bundle submission per observed block.
use crate::{
    config::{ChainProvider, SearcherConfig},
    tasks::{call::CallSpec, submit::relay::Flashbots, watcher::BlockEvent},
};
use alloy::{eips::Encodable2718, rpc::types::mev::EthSendBundle};
use init4_bin_base::deps::metrics::{counter, histogram};
use std::{sync::Arc, time::Instant};
use tokio::{
    sync::{Semaphore, mpsc},
    task::JoinHandle,
};
use tracing::{Instrument, debug, debug_span, error, info};

/// Orchestrates bundle submission: one independent attempt per observed
/// chain head, each targeting the block after the observed one.
///
/// A new head arriving while an attempt is still in flight dispatches
/// another attempt concurrently. There is no cross-attempt coordination, no
/// deduplication, and no retry for a height - the next opportunity is simply
/// the next block. Simultaneous in-flight relay calls are capped by a
/// semaphore sized from the config; permits are acquired inside the spawned
/// attempt so no block event is ever dropped.
#[derive(Debug)]
pub struct SubmitTask {
    /// Searcher configuration.
    pub config: SearcherConfig,
    /// The validated call bundled on every block.
    pub call: CallSpec,
    /// Provider used to fill and sign the bundle transaction.
    pub provider: ChainProvider,
    /// Shared relay client.
    pub relay: Arc<Flashbots>,
}

impl SubmitTask {
    /// Task future for the submit task. Runs until the watcher channel
    /// closes; submission failures never end the loop.
    async fn task_future(self, mut inbound: mpsc::UnboundedReceiver<BlockEvent>) {
        debug!("starting submit task");

        let permits = Arc::new(Semaphore::new(self.config.inflight_limit()));

        loop {
            let Some(event) = inbound.recv().await else {
                debug!("watcher channel closed - exiting submit task");
                break;
            };

            let span = debug_span!(
                "SubmitTask::attempt",
                observed = event.number,
                hash = %event.hash,
                target = event.number.saturating_add(1),
            );

            let attempt = Attempt {
                call: self.call.clone(),
                provider: self.provider.clone(),
                relay: self.relay.clone(),
                permits: permits.clone(),
            };

            tokio::spawn(attempt.run(event).instrument(span));
        }
    }

    /// Spawns the submit task, consuming block events from the given
    /// watcher channel.
    pub fn spawn(self, inbound: mpsc::UnboundedReceiver<BlockEvent>) -> JoinHandle<()> {
        tokio::spawn(self.task_future(inbound))
    }
}

/// One submission attempt. Cloned out of the task per block event; attempts
/// share no mutable state.
#[derive(Debug, Clone)]
struct Attempt {
    call: CallSpec,
    provider: ChainProvider,
    relay: Arc<Flashbots>,
    permits: Arc<Semaphore>,
}

impl Attempt {
    /// Fills and signs the configured call, then packages the encoded
    /// envelope into a bundle targeting the given block.
    async fn prepare(&self, target_block: u64) -> eyre::Result<EthSendBundle> {
        let sendable = self.provider.fill(self.call.to_tx_request()).await?;

        let Some(envelope) = sendable.as_envelope() else {
            eyre::bail!("filler did not produce a signed envelope");
        };
        debug!(tx_hash = %envelope.hash(), "filled bundle transaction");

        Ok(EthSendBundle {
            txs: vec![envelope.encoded_2718().into()],
            block_number: target_block,
            ..Default::default()
        })
    }

    /// Runs the attempt to completion. All failures are local: they are
    /// logged within the attempt span and never propagate to the loop.
    async fn run(self, event: BlockEvent) {
        let Ok(_permit) = self.permits.acquire().await else {
            debug!("permit pool closed - abandoning attempt");
            return;
        };

        let target_block = event.number.saturating_add(1);

        let bundle = match self.prepare(target_block).await {
            Ok(bundle) => bundle,
            Err(err) => {
                counter!("searcher.failed_preparations").increment(1);
                error!(%err, "failed to prepare bundle");
                return;
            }
        };

        let submit_start = Instant::now();
        let result = self.relay.send_bundle(&bundle).await;
        histogram!("searcher.submit_timer").record(submit_start.elapsed().as_millis() as f64);

        match result {
            Ok(ack) => {
                counter!("searcher.submitted_bundles").increment(1);
                info!(
                    bundle_hash = %ack.bundle_hash,
                    observed = event.number,
                    target_block,
                    "bundle accepted by relay"
                );
            }
            Err(err) => {
                counter!("searcher.failed_submissions").increment(1);
                error!(%err, observed = event.number, target_block, "bundle submission failed");
            }
        }
    }
}
