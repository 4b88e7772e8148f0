#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use ethbridge::messages::{MethodCall, RequestCommon};
use ethbridge::{
    CallEncoder, CommonHeaders, CompiledContract, ContractCompiler, NodeRpc, ReplyMessage, RpcError,
    SendTxArgs, TxnContext, TxnError, TxnProcessor, TxnProcessorConfig, TxnReceipt,
};
use serde_json::Value;
use tokio::time::Instant;

pub const TEST_FROM_ADDR: &str = "0x83dBC8e329b38cBA0Fc4ed99b1Ce9c2a390ABdC1";
pub const TEST_TO_ADDR: &str = "0xD7FAC2bCe408Ed7C6ded07a32038b1F79C2b27d3";
pub const TEST_TX_HASH: &str = "0xac18e98664e160305cdb77e75e5eae32e55447e94ad8ceb0123729589ed09f8b";

pub const MAX_WAIT: Duration = Duration::from_millis(250);
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

// ============================================================================
// Request Fixtures
// ============================================================================

pub fn good_deploy_txn_json() -> String {
    format!(
        r#"{{
            "headers": {{"type": "DeployContract", "id": "deploy-1"}},
            "compiled": "0x6080604052",
            "abi": [],
            "from": "{TEST_FROM_ADDR}",
            "nonce": "123",
            "gas": "123"
        }}"#
    )
}

pub fn good_send_txn_json() -> String {
    format!(
        r#"{{
            "headers": {{"type": "SendTransaction", "id": "send-1"}},
            "from": "{TEST_FROM_ADDR}",
            "to": "{TEST_TO_ADDR}",
            "gas": "123",
            "method": {{"name": "test"}}
        }}"#
    )
}

pub fn send_txn_json_with_nonce(nonce: u64) -> String {
    format!(
        r#"{{
            "headers": {{"type": "SendTransaction"}},
            "from": "{TEST_FROM_ADDR}",
            "to": "{TEST_TO_ADDR}",
            "gas": "123",
            "nonce": "{nonce}",
            "method": {{"name": "test"}}
        }}"#
    )
}

pub fn from_addr() -> Address {
    Address::from_str(TEST_FROM_ADDR).unwrap()
}

pub fn good_receipt() -> TxnReceipt {
    TxnReceipt {
        block_hash: Some(B256::from_str("0x6e710868fd2d0ac1f141ba3f0cd569e38ce1999d8f39518ee7633d2b9a7122af").unwrap()),
        block_number: Some(U256::from(12345)),
        contract_address: Some(Address::from_str("0x28a62Cb478a3c3d4DAAD84F1148ea16cd1A66F37").unwrap()),
        cumulative_gas_used: Some(U256::from(23456)),
        from: Some(Address::from_str("0xBa25be62a5C55d4ad1d5520268806A8730A4DE5E").unwrap()),
        gas_used: Some(U256::from(345678)),
        status: Some(U256::from(1)),
        to: Some(Address::from_str(TEST_TO_ADDR).unwrap()),
        transaction_hash: Some(B256::from_str("0xe2215336b09f9b5b82e36e1144ed64f40a42e61b68fdaca82549fd98b8531a89").unwrap()),
        transaction_index: Some(U256::from(456789)),
    }
}

// ============================================================================
// Mock Node
// ============================================================================

/// Records every call and answers from canned results
pub struct MockRpc {
    /// `None` hands out a distinct hash per submission
    pub send_hash: Option<B256>,
    pub send_err: Option<RpcError>,
    pub send_delay: Duration,
    pub count: Result<u64, RpcError>,
    pub receipt: Result<Option<TxnReceipt>, RpcError>,
    /// Number of receipt checks that report "not mined" before `receipt` applies
    pub receipt_after: u64,
    /// Answers handed out in order before falling back to `receipt`
    pub receipt_script: Mutex<VecDeque<Result<Option<TxnReceipt>, RpcError>>>,
    /// Receipts for specific hashes, checked before anything else
    pub mined: Mutex<HashMap<B256, TxnReceipt>>,
    pub calls: Mutex<Vec<String>>,
    pub sent: Mutex<Vec<SendTxArgs>>,
    pub next_hash: AtomicU64,
    pub receipt_checks: AtomicU64,
}

impl Default for MockRpc {
    fn default() -> Self {
        Self {
            send_hash: None,
            send_err: None,
            send_delay: Duration::ZERO,
            count: Ok(0),
            receipt: Ok(None),
            receipt_after: 0,
            receipt_script: Mutex::new(VecDeque::new()),
            mined: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
            next_hash: AtomicU64::new(1),
            receipt_checks: AtomicU64::new(0),
        }
    }
}

impl MockRpc {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn sent(&self) -> Vec<SendTxArgs> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_nonces(&self) -> Vec<u64> {
        self.sent().iter().map(|a| a.nonce.to::<u64>()).collect()
    }

    /// Make `hash` mined from the next receipt check on
    pub fn mine(&self, hash: B256, receipt: TxnReceipt) {
        self.mined.lock().unwrap().insert(hash, receipt);
    }

    pub fn receipt_calls(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| *c == "eth_getTransactionReceipt")
            .count()
    }

    fn record(&self, method: &str) {
        self.calls.lock().unwrap().push(method.to_string());
    }
}

#[async_trait]
impl NodeRpc for MockRpc {
    async fn send_transaction(&self, args: &SendTxArgs) -> Result<B256, RpcError> {
        self.record("eth_sendTransaction");
        if !self.send_delay.is_zero() {
            tokio::time::sleep(self.send_delay).await;
        }
        if let Some(err) = &self.send_err {
            return Err(err.clone());
        }
        self.sent.lock().unwrap().push(args.clone());
        Ok(self.send_hash.unwrap_or_else(|| {
            let n = self.next_hash.fetch_add(1, Ordering::SeqCst);
            B256::left_padding_from(&n.to_be_bytes())
        }))
    }

    async fn get_transaction_count(&self, _address: Address) -> Result<u64, RpcError> {
        self.record("eth_getTransactionCount");
        self.count.clone()
    }

    async fn get_transaction_receipt(&self, hash: B256) -> Result<Option<TxnReceipt>, RpcError> {
        self.record("eth_getTransactionReceipt");
        if let Some(receipt) = self.mined.lock().unwrap().get(&hash) {
            return Ok(Some(receipt.clone()));
        }
        if let Some(answer) = self.receipt_script.lock().unwrap().pop_front() {
            return answer;
        }
        let check = self.receipt_checks.fetch_add(1, Ordering::SeqCst);
        if check < self.receipt_after {
            return Ok(None);
        }
        self.receipt.clone()
    }
}

// ============================================================================
// Collaborator Stubs
// ============================================================================

pub struct StubCompiler;

impl ContractCompiler for StubCompiler {
    fn compile(&self, _source: &str, _contract_name: Option<&str>) -> Result<CompiledContract, String> {
        Ok(CompiledContract {
            bytecode: Bytes::from(vec![0x60, 0x80]),
            abi: Value::Array(vec![]),
        })
    }
}

/// Encodes a method as its name bytes so tests can see what was sent
pub struct StubEncoder;

impl CallEncoder for StubEncoder {
    fn encode_call(&self, method: &MethodCall) -> Result<Bytes, String> {
        Ok(Bytes::from(method.name.as_bytes().to_vec()))
    }

    fn encode_constructor(&self, _abi: &Value, params: &[Value]) -> Result<Bytes, String> {
        Ok(Bytes::from(vec![params.len() as u8]))
    }
}

// ============================================================================
// Recording Context
// ============================================================================

#[derive(Debug, Clone)]
pub struct ErrorReply {
    pub status: u16,
    pub err: TxnError,
    pub tx_hash: Option<String>,
    pub at: Instant,
}

pub struct TestTxnContext {
    headers: CommonHeaders,
    body: Vec<u8>,
    received_at: Instant,
    pub replies: Mutex<Vec<ReplyMessage>>,
    pub error_replies: Mutex<Vec<ErrorReply>>,
}

impl TestTxnContext {
    pub fn new(json: &str) -> Arc<Self> {
        let headers = serde_json::from_str::<RequestCommon>(json)
            .map(|c| c.headers)
            .unwrap_or_default();
        Self::build(headers, json)
    }

    /// Context whose header type is declared by the transport, not the body
    pub fn with_type(json: &str, msg_type: &str) -> Arc<Self> {
        let headers = CommonHeaders {
            msg_type: msg_type.to_string(),
            ..Default::default()
        };
        Self::build(headers, json)
    }

    fn build(headers: CommonHeaders, json: &str) -> Arc<Self> {
        Arc::new(Self {
            headers,
            body: json.as_bytes().to_vec(),
            received_at: Instant::now(),
            replies: Mutex::new(Vec::new()),
            error_replies: Mutex::new(Vec::new()),
        })
    }

    pub fn replies(&self) -> Vec<ReplyMessage> {
        self.replies.lock().unwrap().clone()
    }

    pub fn error_replies(&self) -> Vec<ErrorReply> {
        self.error_replies.lock().unwrap().clone()
    }

    pub fn total_replies(&self) -> usize {
        self.replies.lock().unwrap().len() + self.error_replies.lock().unwrap().len()
    }
}

impl fmt::Display for TestTxnContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<testmessage>")
    }
}

impl TxnContext for TestTxnContext {
    fn headers(&self) -> &CommonHeaders {
        &self.headers
    }

    fn body(&self) -> &[u8] {
        &self.body
    }

    fn received_at(&self) -> Instant {
        self.received_at
    }

    fn reply(&self, reply: ReplyMessage) {
        self.replies.lock().unwrap().push(reply);
    }

    fn send_error_reply(&self, status: u16, err: &TxnError) {
        self.error_replies.lock().unwrap().push(ErrorReply {
            status,
            err: err.clone(),
            tx_hash: None,
            at: Instant::now(),
        });
    }

    fn send_error_reply_with_tx(&self, status: u16, err: &TxnError, tx_hash: &str) {
        self.error_replies.lock().unwrap().push(ErrorReply {
            status,
            err: err.clone(),
            tx_hash: Some(tx_hash.to_string()),
            at: Instant::now(),
        });
    }
}

// ============================================================================
// Processor Setup
// ============================================================================

pub fn test_config() -> TxnProcessorConfig {
    TxnProcessorConfig {
        max_wait: MAX_WAIT,
        poll_interval: POLL_INTERVAL,
        ..Default::default()
    }
}

pub fn new_processor(conf: TxnProcessorConfig, rpc: &Arc<MockRpc>) -> TxnProcessor {
    TxnProcessor::new(conf, rpc.clone())
        .with_compiler(Arc::new(StubCompiler))
        .with_encoder(Arc::new(StubEncoder))
}
