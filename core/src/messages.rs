//! Message types exchanged with the upstream messaging layer
//!
//! Inbound requests share a `headers` block whose `type` selects the body
//! shape. Replies carry their own headers plus a flat set of fields.

use alloy_primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const MSG_TYPE_DEPLOY_CONTRACT: &str = "DeployContract";
pub const MSG_TYPE_SEND_TRANSACTION: &str = "SendTransaction";
pub const MSG_TYPE_TRANSACTION_SUCCESS: &str = "TransactionSuccess";
pub const MSG_TYPE_TRANSACTION_FAILURE: &str = "TransactionFailure";
pub const MSG_TYPE_ERROR: &str = "Error";

/// Headers common to every inbound message
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommonHeaders {
    /// Caller-assigned correlation id
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Discriminant selecting the request variant
    #[serde(rename = "type", default)]
    pub msg_type: String,
    /// Arbitrary correlation metadata echoed back on the reply
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub context: Map<String, Value>,
}

/// Envelope used for the first decode phase: headers only.
#[derive(Debug, Default, Deserialize)]
pub struct RequestCommon {
    #[serde(default)]
    pub headers: CommonHeaders,
}

/// A numeric field that callers may send as a JSON string or number
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawNumber {
    Text(String),
    Number(serde_json::Number),
}

impl RawNumber {
    pub fn as_text(&self) -> String {
        match self {
            RawNumber::Text(s) => s.trim().to_string(),
            RawNumber::Number(n) => n.to_string(),
        }
    }
}

/// Fields shared by both request bodies, as they arrive on the wire
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTxnCommon {
    pub from: Option<String>,
    pub nonce: Option<RawNumber>,
    pub value: Option<RawNumber>,
    pub gas: Option<RawNumber>,
    pub gas_price: Option<RawNumber>,
}

/// Wire body of a `DeployContract` request
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDeployContract {
    #[serde(flatten)]
    pub common: RawTxnCommon,
    pub compiled: Option<String>,
    pub abi: Option<Value>,
    pub solidity: Option<String>,
    pub contract_name: Option<String>,
    #[serde(default)]
    pub parameters: Vec<Value>,
}

/// Wire body of a `SendTransaction` request
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSendTransaction {
    #[serde(flatten)]
    pub common: RawTxnCommon,
    pub to: Option<String>,
    pub method: Option<MethodCall>,
}

/// Method descriptor handed to the call encoder
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    pub name: String,
    /// ABI input descriptors, when the caller supplies them
    #[serde(default)]
    pub inputs: Vec<Value>,
    #[serde(default)]
    pub params: Vec<Value>,
}

/// Validated fields shared by both request variants
#[derive(Debug, Clone, PartialEq)]
pub struct TxnCommon {
    pub headers: CommonHeaders,
    pub from: Address,
    /// Explicit caller-managed nonce, `None` to auto-assign
    pub nonce: Option<u64>,
    pub value: Option<U256>,
    pub gas: u64,
    pub gas_price: Option<U256>,
}

/// Where the deployment bytecode comes from
#[derive(Debug, Clone, PartialEq)]
pub enum ContractCode {
    /// Precompiled bytecode plus its ABI
    Compiled { bytecode: Bytes, abi: Value },
    /// Solidity source to be compiled by a [`crate::ContractCompiler`]
    Solidity {
        source: String,
        contract_name: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeployContract {
    pub common: TxnCommon,
    pub code: ContractCode,
    /// Constructor arguments
    pub parameters: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SendTransaction {
    pub common: TxnCommon,
    pub to: Address,
    pub method: MethodCall,
}

/// A decoded, validated inbound request
#[derive(Debug, Clone, PartialEq)]
pub enum TxnRequest {
    DeployContract(DeployContract),
    SendTransaction(SendTransaction),
}

impl TxnRequest {
    pub fn common(&self) -> &TxnCommon {
        match self {
            TxnRequest::DeployContract(d) => &d.common,
            TxnRequest::SendTransaction(s) => &s.common,
        }
    }

    pub fn kind(&self) -> TxnKind {
        match self {
            TxnRequest::DeployContract(_) => TxnKind::Deploy,
            TxnRequest::SendTransaction(_) => TxnKind::Send,
        }
    }
}

/// Which request variant produced a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnKind {
    Deploy,
    Send,
}

impl std::fmt::Display for TxnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TxnKind::Deploy => write!(f, "Deploy"),
            TxnKind::Send => write!(f, "Send"),
        }
    }
}

/// Headers attached to every reply
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyHeaders {
    #[serde(rename = "type")]
    pub msg_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub request_id: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub context: Map<String, Value>,
    /// Seconds between receipt of the request and this reply
    #[serde(default)]
    pub elapsed: f64,
}

/// An outbound reply: headers plus a flat body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplyMessage {
    pub headers: ReplyHeaders,
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

impl ReplyMessage {
    pub fn msg_type(&self) -> &str {
        &self.headers.msg_type
    }

    /// Look up a body field as a string
    pub fn field(&self, name: &str) -> Option<&str> {
        self.body.get(name).and_then(Value::as_str)
    }
}
