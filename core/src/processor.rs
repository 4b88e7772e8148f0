//! Transaction Processor
//!
//! Entry point for inbound messages. Decodes the request, allocates a nonce,
//! submits through the node and hands the transaction to a receipt poller.
//! Anything that fails before the node accepts the transaction is replied to
//! immediately; everything after is replied to by the poller.

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, Bytes, B256, U64};
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::collaborators::{CallEncoder, ContractCompiler, NoCompiler, NoEncoder};
use crate::context::TxnContext;
use crate::decoder::decode_request;
use crate::error::TxnError;
use crate::inflight::{InflightRegistry, InflightTxn};
use crate::messages::{ContractCode, TxnRequest};
use crate::nonce::NonceAllocator;
use crate::poller::ReceiptPoller;
use crate::reply::ReplyBuilder;
use crate::rpc::{NodeRpc, SendTxArgs};

/// Default time to wait for a receipt
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(60);

/// Default gap between receipt checks
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxnProcessorConfig {
    /// How long a poller waits for a receipt before timing out
    pub max_wait: Duration,
    /// Gap between receipt checks
    pub poll_interval: Duration,
    /// Ask the node for the next nonce when the caller gives none
    pub predict_nonces: bool,
    /// Add `<field>Hex` siblings to receipt replies
    pub hex_values_in_receipt: bool,
}

impl Default for TxnProcessorConfig {
    fn default() -> Self {
        Self {
            max_wait: DEFAULT_MAX_WAIT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            predict_nonces: false,
            hex_values_in_receipt: false,
        }
    }
}

pub struct TxnProcessor {
    conf: TxnProcessorConfig,
    rpc: Arc<dyn NodeRpc>,
    registry: Arc<InflightRegistry>,
    allocator: NonceAllocator,
    poller: ReceiptPoller,
    compiler: Arc<dyn ContractCompiler>,
    encoder: Arc<dyn CallEncoder>,
    pollers: TaskTracker,
}

impl TxnProcessor {
    pub fn new(conf: TxnProcessorConfig, rpc: Arc<dyn NodeRpc>) -> Self {
        let registry = Arc::new(InflightRegistry::new());
        let allocator = NonceAllocator::new(rpc.clone(), conf.predict_nonces);
        let poller = ReceiptPoller::new(
            rpc.clone(),
            registry.clone(),
            ReplyBuilder::new(conf.hex_values_in_receipt),
            conf.max_wait,
            conf.poll_interval,
        );

        Self {
            conf,
            rpc,
            registry,
            allocator,
            poller,
            compiler: Arc::new(NoCompiler),
            encoder: Arc::new(NoEncoder),
            pollers: TaskTracker::new(),
        }
    }

    pub fn with_compiler(mut self, compiler: Arc<dyn ContractCompiler>) -> Self {
        self.compiler = compiler;
        self
    }

    pub fn with_encoder(mut self, encoder: Arc<dyn CallEncoder>) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn config(&self) -> &TxnProcessorConfig {
        &self.conf
    }

    /// Handle one inbound message.
    ///
    /// Returns once the transaction is submitted (or the message has been
    /// rejected). The returned handle can be awaited for the poller's outcome.
    pub async fn on_message(&self, ctx: Arc<dyn TxnContext>) -> Option<Arc<InflightTxn>> {
        debug!("[TxnProcessor] Processing {}", ctx);

        let request = match decode_request(ctx.headers(), ctx.body()) {
            Ok(request) => request,
            Err(e) => {
                warn!("[TxnProcessor] Rejected {}: {}", ctx, e);
                ctx.send_error_reply(e.status(), &e);
                return None;
            }
        };

        let (to, data) = match self.build_payload(&request) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("[TxnProcessor] Could not build payload for {}: {}", ctx, e);
                ctx.send_error_reply(e.status(), &e);
                return None;
            }
        };

        let common = request.common();
        let kind = request.kind();

        // Held until the new entry is inserted
        let mut lane = self.registry.lock_sender(common.from).await;

        let (nonce, source) = match self.allocator.allocate(&lane, common.nonce).await {
            Ok(allocated) => allocated,
            Err(e) => {
                error!("[TxnProcessor] Nonce allocation failed for {}: {}", common.from, e);
                ctx.send_error_reply(e.status(), &e);
                return None;
            }
        };

        let args = SendTxArgs {
            from: common.from,
            to,
            nonce: U64::from(nonce),
            gas: U64::from(common.gas),
            gas_price: common.gas_price,
            value: common.value,
            data,
        };

        let tx_hash = match self.rpc.send_transaction(&args).await {
            Ok(hash) if hash != B256::ZERO => hash,
            Ok(_) => {
                let e = TxnError::MissingTransactionHash;
                error!("[TxnProcessor] {} txn from {} nonce={}: {}", kind, common.from, nonce, e);
                ctx.send_error_reply(e.status(), &e);
                return None;
            }
            Err(rpc_err) => {
                error!(
                    "[TxnProcessor] Failed to send {} txn from {} nonce={}: {}",
                    kind, common.from, nonce, rpc_err
                );
                let e = TxnError::SubmissionFailed(rpc_err);
                ctx.send_error_reply(e.status(), &e);
                return None;
            }
        };

        let txn = Arc::new(InflightTxn::new(common.from, nonce, tx_hash, kind));
        lane.insert(txn.clone());
        let inflight = lane.len();
        drop(lane);

        info!(
            "[TxnProcessor] Sent {} txn: {:#x} from={:#x} nonce={} ({:?}, {} inflight for sender)",
            kind, tx_hash, common.from, nonce, source, inflight
        );

        let poller = self.poller.clone();
        let polled = txn.clone();
        self.pollers.spawn(async move {
            poller.run(polled, ctx).await;
        });

        Some(txn)
    }

    /// Resolve the `to` address and call data for a request
    fn build_payload(&self, request: &TxnRequest) -> Result<(Option<Address>, Option<Bytes>), TxnError> {
        match request {
            TxnRequest::DeployContract(deploy) => {
                let (bytecode, abi) = match &deploy.code {
                    ContractCode::Compiled { bytecode, abi } => (bytecode.clone(), abi.clone()),
                    ContractCode::Solidity { source, contract_name } => {
                        let compiled = self
                            .compiler
                            .compile(source, contract_name.as_deref())
                            .map_err(TxnError::CompilationFailed)?;
                        (compiled.bytecode, compiled.abi)
                    }
                };

                if deploy.parameters.is_empty() {
                    return Ok((None, Some(bytecode)));
                }

                let args = self
                    .encoder
                    .encode_constructor(&abi, &deploy.parameters)
                    .map_err(TxnError::EncodingFailed)?;
                let mut data = bytecode.to_vec();
                data.extend_from_slice(&args);
                Ok((None, Some(Bytes::from(data))))
            }
            TxnRequest::SendTransaction(send) => {
                let data = self
                    .encoder
                    .encode_call(&send.method)
                    .map_err(TxnError::EncodingFailed)?;
                Ok((Some(send.to), Some(data)))
            }
        }
    }

    /// Snapshot of a sender's inflight transactions
    pub async fn inflight(&self, sender: Address) -> Vec<Arc<InflightTxn>> {
        self.registry.snapshot(sender).await
    }

    /// Number of transactions still awaiting a receipt
    pub async fn inflight_count(&self) -> usize {
        self.registry.len().await
    }

    /// Wait for every running poller to finish
    pub async fn drain(&self) {
        self.pollers.close();
        self.pollers.wait().await;
        self.pollers.reopen();
    }
}
