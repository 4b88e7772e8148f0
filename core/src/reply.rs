//! Reply builder
//!
//! Turns a terminal outcome into the reply sent upstream. Receipt numbers are
//! emitted as decimal strings; with hex values enabled each one also gets a
//! `<field>Hex` sibling, added in one pass over the finished body.

use alloy_primitives::{Address, U256};
use serde_json::{Map, Value};
use tokio::time::Instant;

use crate::error::TxnError;
use crate::inflight::InflightTxn;
use crate::messages::{
    CommonHeaders, ReplyHeaders, ReplyMessage, TxnKind, MSG_TYPE_ERROR,
    MSG_TYPE_TRANSACTION_FAILURE, MSG_TYPE_TRANSACTION_SUCCESS,
};
use crate::rpc::TxnReceipt;

/// Body fields that hold integers
pub const NUMERIC_FIELDS: &[&str] = &[
    "blockNumber",
    "cumulativeGasUsed",
    "gasUsed",
    "nonce",
    "status",
    "transactionIndex",
];

/// Suffix for the hex sibling of a numeric field
pub const HEX_SUFFIX: &str = "Hex";

#[derive(Debug, Clone, Copy, Default)]
pub struct ReplyBuilder {
    hex_values: bool,
}

impl ReplyBuilder {
    pub fn new(hex_values: bool) -> Self {
        Self { hex_values }
    }

    /// Build a `TransactionSuccess` or `TransactionFailure` reply from a
    /// mined receipt.
    pub fn receipt_reply(
        &self,
        request: &CommonHeaders,
        received_at: Instant,
        txn: &InflightTxn,
        receipt: &TxnReceipt,
    ) -> ReplyMessage {
        let msg_type = if receipt.is_success() {
            MSG_TYPE_TRANSACTION_SUCCESS
        } else {
            MSG_TYPE_TRANSACTION_FAILURE
        };

        let mut body = Map::new();
        if let Some(hash) = receipt.block_hash {
            body.insert("blockHash".into(), Value::String(format!("{:#x}", hash)));
        }
        put_decimal(&mut body, "blockNumber", receipt.block_number);
        if txn.kind == TxnKind::Deploy {
            put_address(&mut body, "contractAddress", receipt.contract_address);
        }
        put_decimal(&mut body, "cumulativeGasUsed", receipt.cumulative_gas_used);
        put_address(&mut body, "from", receipt.from.or(Some(txn.from)));
        put_decimal(&mut body, "gasUsed", receipt.gas_used);
        put_decimal(&mut body, "nonce", Some(U256::from(txn.nonce)));
        put_decimal(&mut body, "status", receipt.status);
        if txn.kind == TxnKind::Send {
            put_address(&mut body, "to", receipt.to);
        }
        let hash = receipt.transaction_hash.unwrap_or(txn.tx_hash);
        body.insert("transactionHash".into(), Value::String(format!("{:#x}", hash)));
        put_decimal(&mut body, "transactionIndex", receipt.transaction_index);

        if self.hex_values {
            add_hex_siblings(&mut body);
        }

        ReplyMessage {
            headers: reply_headers(request, msg_type, received_at),
            body,
        }
    }
}

/// Build an `Error` reply. The transaction hash is only present for failures
/// after submission.
pub fn error_reply(
    request: &CommonHeaders,
    received_at: Instant,
    status: u16,
    err: &TxnError,
    tx_hash: Option<&str>,
) -> ReplyMessage {
    let mut body = Map::new();
    body.insert("status".into(), Value::from(status));
    body.insert("errorMessage".into(), Value::String(err.to_string()));
    if let Some(hash) = tx_hash {
        body.insert("transactionHash".into(), Value::String(hash.to_string()));
    }
    ReplyMessage {
        headers: reply_headers(request, MSG_TYPE_ERROR, received_at),
        body,
    }
}

fn reply_headers(request: &CommonHeaders, msg_type: &str, received_at: Instant) -> ReplyHeaders {
    ReplyHeaders {
        msg_type: msg_type.to_string(),
        request_id: request.id.clone(),
        context: request.context.clone(),
        elapsed: received_at.elapsed().as_secs_f64(),
    }
}

fn put_decimal(body: &mut Map<String, Value>, name: &str, value: Option<U256>) {
    if let Some(v) = value {
        body.insert(name.to_string(), Value::String(v.to_string()));
    }
}

fn put_address(body: &mut Map<String, Value>, name: &str, value: Option<Address>) {
    if let Some(addr) = value {
        body.insert(name.to_string(), Value::String(format!("{:#x}", addr)));
    }
}

/// Add `<field>Hex` for every numeric field present. Decimal values stay as
/// they are.
pub fn add_hex_siblings(body: &mut Map<String, Value>) {
    for name in NUMERIC_FIELDS {
        let parsed = body
            .get(*name)
            .and_then(Value::as_str)
            .and_then(|s| U256::from_str_radix(s, 10).ok());
        if let Some(v) = parsed {
            body.insert(format!("{}{}", name, HEX_SUFFIX), Value::String(format!("0x{:x}", v)));
        }
    }
}
