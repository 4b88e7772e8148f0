//! Receipt Poller
//!
//! One task per submitted transaction. Polls `eth_getTransactionReceipt`
//! on a fixed interval until a receipt appears or the deadline passes, sends
//! the single reply for the message, then clears the inflight entry.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

use crate::context::TxnContext;
use crate::error::{RpcError, TxnError};
use crate::inflight::{InflightRegistry, InflightTxn, TxnOutcome};
use crate::reply::ReplyBuilder;
use crate::rpc::NodeRpc;

#[derive(Clone)]
pub struct ReceiptPoller {
    rpc: Arc<dyn NodeRpc>,
    registry: Arc<InflightRegistry>,
    replies: ReplyBuilder,
    max_wait: Duration,
    poll_interval: Duration,
}

impl ReceiptPoller {
    pub fn new(
        rpc: Arc<dyn NodeRpc>,
        registry: Arc<InflightRegistry>,
        replies: ReplyBuilder,
        max_wait: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            rpc,
            registry,
            replies,
            max_wait,
            poll_interval,
        }
    }

    /// Drive `txn` to a terminal outcome and reply through `ctx`
    pub async fn run(&self, txn: Arc<InflightTxn>, ctx: Arc<dyn TxnContext>) -> TxnOutcome {
        let deadline = txn.submitted_at + self.max_wait;
        let hash = format!("{:#x}", txn.tx_hash);
        let mut last_error: Option<RpcError> = None;
        let mut checks = 0u32;

        let outcome = loop {
            checks += 1;
            match self.rpc.get_transaction_receipt(txn.tx_hash).await {
                Ok(Some(receipt)) => {
                    let reply = self
                        .replies
                        .receipt_reply(ctx.headers(), ctx.received_at(), &txn, &receipt);
                    let outcome = if receipt.is_success() {
                        info!(
                            "[ReceiptPoller] {} txn mined: {} nonce={} ({}ms)",
                            txn.kind,
                            hash,
                            txn.nonce,
                            txn.submitted_at.elapsed().as_millis()
                        );
                        TxnOutcome::MinedSuccess
                    } else {
                        warn!(
                            "[ReceiptPoller] {} txn mined with failure status: {} nonce={}",
                            txn.kind, hash, txn.nonce
                        );
                        TxnOutcome::MinedFailure
                    };
                    ctx.reply(reply);
                    break outcome;
                }
                Ok(None) => {
                    debug!("[ReceiptPoller] {} not mined yet (check {})", hash, checks);
                    last_error = None;
                }
                Err(e) => {
                    warn!("[ReceiptPoller] Failed to get receipt for {}: {}", hash, e);
                    last_error = Some(e);
                }
            }

            let now = Instant::now();
            if now >= deadline {
                break match last_error.take() {
                    Some(e) => {
                        error!(
                            "[ReceiptPoller] Giving up on {} after {} checks: {}",
                            hash, checks, e
                        );
                        let err = TxnError::ReceiptQueryFailed(e);
                        ctx.send_error_reply_with_tx(err.status(), &err, &hash);
                        TxnOutcome::ReceiptError
                    }
                    None => {
                        warn!(
                            "[ReceiptPoller] {} txn timed out: {} after {} checks",
                            txn.kind, hash, checks
                        );
                        let err = TxnError::ReceiptTimeout;
                        ctx.send_error_reply_with_tx(err.status(), &err, &hash);
                        TxnOutcome::TimedOut
                    }
                };
            }

            sleep(self.poll_interval.min(deadline.saturating_duration_since(now))).await;
        };

        self.registry.remove(&txn).await;
        txn.complete(outcome);
        outcome
    }
}
