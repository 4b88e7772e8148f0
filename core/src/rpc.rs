//! Node RPC module
//!
//! The [`NodeRpc`] trait names the three JSON-RPC calls the processor makes.
//! [`HttpRpcClient`] is the production implementation over HTTP.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use alloy_primitives::{Address, Bytes, B256, U256, U64};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::RpcError;

pub const METHOD_SEND_TRANSACTION: &str = "eth_sendTransaction";
pub const METHOD_GET_TRANSACTION_COUNT: &str = "eth_getTransactionCount";
pub const METHOD_GET_TRANSACTION_RECEIPT: &str = "eth_getTransactionReceipt";

/// Default request timeout for the HTTP client
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(30);

/// Arguments to `eth_sendTransaction`. Signing is left to the node.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendTxArgs {
    pub from: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
    pub nonce: U64,
    pub gas: U64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<U256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<U256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Bytes>,
}

/// Mined transaction receipt, as returned by `eth_getTransactionReceipt`.
///
/// Every field is optional so partial receipts from non-standard nodes still
/// decode; the reply builder emits only what is present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxnReceipt {
    pub block_hash: Option<B256>,
    pub block_number: Option<U256>,
    pub contract_address: Option<Address>,
    pub cumulative_gas_used: Option<U256>,
    pub from: Option<Address>,
    pub gas_used: Option<U256>,
    pub status: Option<U256>,
    pub to: Option<Address>,
    pub transaction_hash: Option<B256>,
    pub transaction_index: Option<U256>,
}

impl TxnReceipt {
    /// A receipt is successful only when it carries a non-zero status.
    pub fn is_success(&self) -> bool {
        self.status.map(|s| !s.is_zero()).unwrap_or(false)
    }
}

/// The node calls the transaction processor depends on
#[async_trait]
pub trait NodeRpc: Send + Sync {
    /// Submit a transaction for the node to sign and broadcast
    async fn send_transaction(&self, args: &SendTxArgs) -> Result<B256, RpcError>;

    /// Next usable nonce for `address`, counting pending transactions
    async fn get_transaction_count(&self, address: Address) -> Result<u64, RpcError>;

    /// `Ok(None)` means not mined yet
    async fn get_transaction_receipt(&self, hash: B256) -> Result<Option<TxnReceipt>, RpcError>;
}

/// JSON-RPC client over HTTP
pub struct HttpRpcClient {
    client: reqwest::Client,
    rpc_url: String,
    next_id: AtomicU64,
}

impl HttpRpcClient {
    pub fn new(rpc_url: String, timeout: Duration) -> Result<Self, RpcError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RpcError::Network(e.to_string()))?;

        Ok(Self {
            client,
            rpc_url,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    /// Issue a single JSON-RPC call and return its `result` member
    async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        debug!("[NodeRpc] {} id={} -->", method, id);

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RpcError::Network(e.to_string()))?;

        let status = response.status();
        let json: Value = response
            .json()
            .await
            .map_err(|e| RpcError::Parse(format!("HTTP {}: {}", status, e)))?;

        if let Some(error) = json.get("error").filter(|e| !e.is_null()) {
            let code = error.get("code").and_then(Value::as_i64).unwrap_or_default();
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            debug!("[NodeRpc] {} id={} <-- error {}: {}", method, id, code, message);
            return Err(RpcError::Rpc { code, message });
        }

        debug!("[NodeRpc] {} id={} <-- ok", method, id);

        json.get("result")
            .cloned()
            .ok_or_else(|| RpcError::Parse("No result in response".to_string()))
    }
}

#[async_trait]
impl NodeRpc for HttpRpcClient {
    async fn send_transaction(&self, args: &SendTxArgs) -> Result<B256, RpcError> {
        let result = self
            .call(METHOD_SEND_TRANSACTION, serde_json::json!([args]))
            .await?;
        serde_json::from_value(result).map_err(|e| RpcError::Parse(e.to_string()))
    }

    async fn get_transaction_count(&self, address: Address) -> Result<u64, RpcError> {
        let result = self
            .call(METHOD_GET_TRANSACTION_COUNT, serde_json::json!([address, "pending"]))
            .await?;
        let count: U64 = serde_json::from_value(result).map_err(|e| RpcError::Parse(e.to_string()))?;
        Ok(count.to::<u64>())
    }

    async fn get_transaction_receipt(&self, hash: B256) -> Result<Option<TxnReceipt>, RpcError> {
        let result = self
            .call(METHOD_GET_TRANSACTION_RECEIPT, serde_json::json!([hash]))
            .await?;
        if result.is_null() {
            return Ok(None);
        }
        serde_json::from_value(result)
            .map(Some)
            .map_err(|e| RpcError::Parse(e.to_string()))
    }
}
