//! Messaging boundary
//!
//! The upstream layer hands each inbound message to the processor wrapped in
//! a [`TxnContext`]. Exactly one of the reply methods is invoked per message.

use std::fmt;

use tokio::time::Instant;

use crate::error::TxnError;
use crate::messages::{CommonHeaders, ReplyMessage};

pub trait TxnContext: fmt::Display + Send + Sync {
    /// Headers already parsed by the transport
    fn headers(&self) -> &CommonHeaders;

    /// Raw message body, decoded according to `headers().msg_type`
    fn body(&self) -> &[u8];

    /// When the message arrived, used for the reply's `elapsed` header
    fn received_at(&self) -> Instant;

    /// Deliver a success or failure receipt reply
    fn reply(&self, reply: ReplyMessage);

    /// Deliver an error that happened before submission
    fn send_error_reply(&self, status: u16, err: &TxnError);

    /// Deliver an error for a transaction the node already accepted
    fn send_error_reply_with_tx(&self, status: u16, err: &TxnError, tx_hash: &str);
}
