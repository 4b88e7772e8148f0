use ethbridge::{RegistryError, RpcError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Node client error: {0}")]
    Rpc(#[from] RpcError),
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Reply writer stopped unexpectedly")]
    WriterStopped,
    #[error("Contract not found in registry: {0}")]
    NotFound(String),
    #[error("lookup needs --id or --address")]
    LookupKeyMissing,
}
