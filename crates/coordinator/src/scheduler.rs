//! Request loop driving the coordinator.

use crate::error::SyncResult;
use crate::manager::FastSyncManager;
use crate::messages::SyncMessage;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Periodically dispatches trie requests and evaluates completeness.
#[derive(Debug, Clone)]
pub struct RequestScheduler {
    manager: Arc<FastSyncManager>,
}

impl RequestScheduler {
    /// Creates a scheduler for `manager`
    pub fn new(manager: Arc<FastSyncManager>) -> Self {
        Self { manager }
    }

    /// Sends up to `requests_per_tick` trie requests to random peers.
    ///
    /// A request that cannot be sent goes back to its queue and ends the
    /// round. Returns the number of requests sent.
    pub fn dispatch_trie_requests(&self) -> SyncResult<usize> {
        let transport = self.manager.transport();
        let mut sent = 0;
        for _ in 0..self.manager.config().requests_per_tick {
            let Some(request) = self.manager.create_next_trie_request()? else {
                break;
            };
            let Some(peer) = transport.random_peer() else {
                debug!(target: "fastsync::scheduler", "no peer for trie request");
                self.manager.requeue(&request);
                break;
            };
            if let Err(err) = transport.send(
                peer.id,
                &peer.display,
                SyncMessage::RequestTrieData(request.clone()),
            ) {
                warn!(target: "fastsync::scheduler", peer = %peer.display, error = %err, "trie request failed");
                self.manager.requeue(&request);
                break;
            }
            sent += 1;
        }
        Ok(sent)
    }

    /// Runs until fast sync completes, `shutdown` flips to true or a fatal
    /// error surfaces.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> SyncResult<()> {
        let config = self.manager.config();
        let mut requests = time::interval(config.request_interval());
        requests.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut completeness = time::interval(config.completeness_interval());
        completeness.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            target: "fastsync::scheduler",
            request_interval_ms = config.request_interval_ms,
            completeness_interval_ms = config.completeness_interval_ms,
            "request scheduler started"
        );

        loop {
            if *shutdown.borrow() {
                info!(target: "fastsync::scheduler", "request scheduler stopping");
                return Ok(());
            }
            if self.manager.is_complete() {
                info!(target: "fastsync::scheduler", "fast sync finished, scheduler exiting");
                return Ok(());
            }

            tokio::select! {
                _ = requests.tick() => {
                    match self.dispatch_trie_requests() {
                        Ok(sent) if sent > 0 => {
                            debug!(target: "fastsync::scheduler", sent, "dispatched trie requests");
                        }
                        Ok(_) => {}
                        Err(err) if err.is_fatal() => return Err(err),
                        Err(err) => {
                            warn!(target: "fastsync::scheduler", error = %err, "trie request round failed");
                        }
                    }
                }
                _ = completeness.tick() => {
                    match self.manager.check_completeness() {
                        Ok(_) => {}
                        Err(err) if err.is_fatal() => return Err(err),
                        Err(err) => {
                            warn!(target: "fastsync::scheduler", error = %err, "completeness check failed");
                        }
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        info!(target: "fastsync::scheduler", "shutdown handle dropped, scheduler stopping");
                        return Ok(());
                    }
                }
            }
        }
    }
}
