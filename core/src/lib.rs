//! Ethereum transaction bridge
//!
//! Accepts `DeployContract` and `SendTransaction` requests from a messaging
//! layer, submits them through a node's JSON-RPC interface and replies with
//! the mined receipt, an on-chain failure, or an error.
//!
//! Flow for one message:
//! ```text
//! TxnContext
//!     → decode (reject: error reply)
//!         → lock sender lane → allocate nonce (reject: error reply)
//!             → eth_sendTransaction (reject: error reply)
//!                 → insert inflight → spawn ReceiptPoller
//!                     → TransactionSuccess | TransactionFailure | Error(+hash)
//! ```

pub mod collaborators;
pub mod context;
pub mod decoder;
pub mod error;
pub mod inflight;
pub mod messages;
pub mod nonce;
pub mod poller;
pub mod processor;
pub mod registry;
pub mod reply;
pub mod rpc;

pub use collaborators::{CallEncoder, CompiledContract, ContractCompiler, NoCompiler, NoEncoder};
pub use context::TxnContext;
pub use decoder::decode_request;
pub use error::{RegistryError, RpcError, TxnError};
pub use inflight::{InflightRegistry, InflightTxn, TxnOutcome};
pub use messages::{CommonHeaders, ReplyMessage, TxnRequest};
pub use processor::{TxnProcessor, TxnProcessorConfig};
pub use registry::{ContractArtifact, RemoteRegistry, RemoteRegistryConf};
pub use reply::ReplyBuilder;
pub use rpc::{HttpRpcClient, NodeRpc, SendTxArgs, TxnReceipt};
