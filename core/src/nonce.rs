//! Nonce allocator
//!
//! Picks the nonce for a new transaction. Callers must hold the sender's
//! [`SenderLane`] so the read of the local baseline and the later insertion
//! cannot interleave with another allocation for the same sender.

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::TxnError;
use crate::inflight::SenderLane;
use crate::rpc::NodeRpc;

/// Where an allocated nonce came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonceSource {
    /// Supplied by the caller
    Explicit,
    /// Successor of the highest inflight nonce for the sender
    Inflight,
    /// Pending transaction count reported by the node
    Node,
}

pub struct NonceAllocator {
    rpc: Arc<dyn NodeRpc>,
    predict_nonces: bool,
}

impl NonceAllocator {
    pub fn new(rpc: Arc<dyn NodeRpc>, predict_nonces: bool) -> Self {
        Self { rpc, predict_nonces }
    }

    /// Choose the nonce for the next transaction from `lane`'s sender.
    ///
    /// An explicit nonce is used verbatim with no collision check against
    /// inflight entries. Otherwise a local baseline always wins over the node,
    /// since the node may not yet have seen our earlier submissions.
    pub async fn allocate(
        &self,
        lane: &SenderLane,
        explicit: Option<u64>,
    ) -> Result<(u64, NonceSource), TxnError> {
        if let Some(nonce) = explicit {
            debug!("[NonceAllocator] {} using explicit nonce {}", lane.sender(), nonce);
            return Ok((nonce, NonceSource::Explicit));
        }

        if let Some(highest) = lane.highest_nonce() {
            let nonce = highest.checked_add(1).ok_or(TxnError::NonceOverflow(highest))?;
            debug!(
                "[NonceAllocator] {} using inflight nonce {} ({} inflight)",
                lane.sender(),
                nonce,
                lane.len()
            );
            return Ok((nonce, NonceSource::Inflight));
        }

        if !self.predict_nonces {
            return Err(TxnError::NonceRequired);
        }

        let nonce = self
            .rpc
            .get_transaction_count(lane.sender())
            .await
            .map_err(TxnError::NonceQueryFailed)?;
        info!("[NonceAllocator] {} node reports next nonce {}", lane.sender(), nonce);
        Ok((nonce, NonceSource::Node))
    }
}
