//! Serves block ranges requested by other peers.

use crate::messages::{RequestBlocks, ResponseBlocks, SyncMessage, WireMessage};
use crate::traits::{BlockStore, Transport};
use fastsync_core::PeerId;
use std::sync::Arc;
use tracing::{debug, error, trace};

/// Answers inbound `RequestBlocks` messages from the local block-store.
pub struct RequestBlocksHandler {
    chain: Arc<dyn BlockStore>,
    transport: Arc<dyn Transport>,
}

impl RequestBlocksHandler {
    /// Creates a handler reading from `chain` and replying over `transport`
    pub fn new(chain: Arc<dyn BlockStore>, transport: Arc<dyn Transport>) -> Self {
        Self { chain, transport }
    }

    /// Handles a raw request. Returns true if a response was sent.
    pub fn receive(&self, peer: PeerId, peer_display: &str, message: &[u8]) -> bool {
        if message.is_empty() {
            debug!(target: "fastsync::handler", peer = %peer_display, "request-blocks empty message");
            return false;
        }

        let request = match RequestBlocks::decode(message) {
            Ok(request) => RequestBlocks::new(request.from_block, request.count, request.descending),
            Err(err) => {
                error!(
                    target: "fastsync::handler",
                    peer = %peer_display,
                    len = message.len(),
                    error = %err,
                    "request-blocks decode error"
                );
                trace!(target: "fastsync::handler", bytes = %hex::encode(message), "request-blocks raw message");
                return false;
            }
        };

        debug!(
            target: "fastsync::handler",
            peer = %peer_display,
            from = request.from_block,
            count = request.count,
            order = request.order(),
            "request-blocks"
        );

        let Some((first, last)) = request.range() else {
            return false;
        };
        let blocks = match self.chain.get_blocks_by_range(first, last) {
            Ok(blocks) if !blocks.is_empty() => blocks,
            Ok(_) => return false,
            Err(err) => {
                debug!(target: "fastsync::handler", first, last, error = %err, "block range unavailable");
                return false;
            }
        };

        let response = SyncMessage::ResponseBlocks(ResponseBlocks { blocks });
        match self.transport.send(peer, peer_display, response) {
            Ok(()) => true,
            Err(err) => {
                debug!(target: "fastsync::handler", peer = %peer_display, error = %err, "failed to send blocks");
                false
            }
        }
    }
}
