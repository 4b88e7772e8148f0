//! Error types for the transaction bridge.
//!
//! Every failure that reaches a caller is a [`TxnError`]. Its HTTP-style
//! status separates caller mistakes (400) from node and infrastructure
//! problems (500).

use thiserror::Error;

/// Client-class status for validation and allocation failures.
pub const STATUS_BAD_REQUEST: u16 = 400;

/// Server-class status for RPC, submission and confirmation failures.
pub const STATUS_SERVER_ERROR: u16 = 500;

/// Failure talking to the node over JSON-RPC.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RpcError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Parse error: {0}")]
    Parse(String),
    /// The node answered with a JSON-RPC error object. Displayed verbatim.
    #[error("{message}")]
    Rpc { code: i64, message: String },
}

/// Custom errors for transaction processing.
///
/// Variants are grouped by the stage that raises them. Decode and allocation
/// failures are always reported before any inflight entry exists.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TxnError {
    // ========================
    // Decode Errors
    // ========================

    /// The header `type` is not one this processor handles
    #[error("Unknown message type '{0}'")]
    UnknownMessageType(String),

    /// The body could not be parsed into the declared request shape
    #[error("Unable to process message: {0}")]
    MalformedPayload(String),

    #[error("'from' must be supplied")]
    MissingSender,

    #[error("Supplied 'from' address is invalid: {0}")]
    InvalidSender(String),

    #[error("'to' must be supplied")]
    MissingTarget,

    #[error("Supplied 'to' address is invalid: {0}")]
    InvalidTarget(String),

    #[error("'method' must be supplied")]
    MissingMethod,

    #[error("Missing Compiled Code + ABI, or Solidity")]
    MissingCode,

    #[error("Supplied 'compiled' code is not valid hex: {0}")]
    InvalidCode(String),

    #[error("Converting supplied 'nonce' to integer: {0}")]
    InvalidNonce(String),

    #[error("Converting supplied 'value' to big integer: {0}")]
    InvalidValue(String),

    #[error("'gas' must be supplied")]
    MissingGas,

    #[error("Converting supplied 'gas' to integer: {0}")]
    InvalidGas(String),

    #[error("Converting supplied 'gasPrice' to big integer: {0}")]
    InvalidGasPrice(String),

    // ========================
    // Collaborator Errors
    // ========================

    #[error("Compilation failed: {0}")]
    CompilationFailed(String),

    #[error("Encoding call data failed: {0}")]
    EncodingFailed(String),

    // ========================
    // Allocation Errors
    // ========================

    /// No explicit nonce, no inflight baseline, and prediction is disabled
    #[error("'nonce' must be supplied when nonce prediction is disabled")]
    NonceRequired,

    /// The highest inflight nonce is `u64::MAX`, so it has no successor
    #[error("No nonce follows inflight nonce {0}; supply 'nonce' explicitly")]
    NonceOverflow(u64),

    #[error("{0}")]
    NonceQueryFailed(RpcError),

    // ========================
    // Submission / Confirmation Errors
    // ========================

    #[error("{0}")]
    SubmissionFailed(RpcError),

    /// The node returned success but no usable transaction hash
    #[error("Node did not return a transaction hash")]
    MissingTransactionHash,

    #[error("Timed out waiting for transaction receipt")]
    ReceiptTimeout,

    #[error("Error obtaining transaction receipt: {0}")]
    ReceiptQueryFailed(RpcError),
}

impl TxnError {
    /// Status code reported alongside this error.
    pub fn status(&self) -> u16 {
        match self {
            TxnError::NonceQueryFailed(_)
            | TxnError::SubmissionFailed(_)
            | TxnError::MissingTransactionHash
            | TxnError::ReceiptTimeout
            | TxnError::ReceiptQueryFailed(_) => STATUS_SERVER_ERROR,
            _ => STATUS_BAD_REQUEST,
        }
    }
}

/// Failure resolving contract artifacts from the remote registry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Error querying contract registry")]
    Request,
    #[error("Error processing contract registry response")]
    Response,
    #[error("'{0}' missing in contract registry response")]
    MissingProperty(String),
    #[error("'{0}' not a string in contract registry response")]
    NotAString(String),
    #[error("'{0}' empty in contract registry response")]
    EmptyProperty(String),
    #[error("Invalid contract registry configuration: {0}")]
    Config(String),
}
