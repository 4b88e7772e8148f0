//! Line-delimited JSON transport
//!
//! Each stdin line is one request. Replies are serialized one per line on
//! stdout by a single writer task, so concurrent pollers never interleave
//! partial lines.

use std::fmt;
use std::sync::Arc;

use ethbridge::messages::RequestCommon;
use ethbridge::reply::error_reply;
use ethbridge::{CommonHeaders, ReplyMessage, TxnContext, TxnError, TxnProcessor};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::error::ServiceError;

/// One request read from the input stream
pub struct StdioContext {
    line: u64,
    headers: CommonHeaders,
    body: Vec<u8>,
    received_at: Instant,
    replies: mpsc::UnboundedSender<ReplyMessage>,
}

impl StdioContext {
    /// Parse the headers of a line. The body is decoded later by the processor.
    pub fn parse(
        line: u64,
        body: Vec<u8>,
        replies: mpsc::UnboundedSender<ReplyMessage>,
    ) -> Result<Self, TxnError> {
        let common: RequestCommon =
            serde_json::from_slice(&body).map_err(|e| TxnError::MalformedPayload(e.to_string()))?;
        Ok(Self {
            line,
            headers: common.headers,
            body,
            received_at: Instant::now(),
            replies,
        })
    }

    fn send(&self, reply: ReplyMessage) {
        if self.replies.send(reply).is_err() {
            warn!("[Stdio] Reply writer gone, dropping reply for {}", self);
        }
    }
}

impl fmt::Display for StdioContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.headers.id.is_empty() {
            write!(f, "line {}", self.line)
        } else {
            write!(f, "line {} (id={})", self.line, self.headers.id)
        }
    }
}

impl TxnContext for StdioContext {
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
        self.send(reply);
    }

    fn send_error_reply(&self, status: u16, err: &TxnError) {
        self.send(error_reply(&self.headers, self.received_at, status, err, None));
    }

    fn send_error_reply_with_tx(&self, status: u16, err: &TxnError, tx_hash: &str) {
        self.send(error_reply(&self.headers, self.received_at, status, err, Some(tx_hash)));
    }
}

/// Counters reported when the input closes
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ServeSummary {
    pub messages: u64,
    pub unparseable: u64,
    pub submitted: u64,
    pub replies: u64,
}

/// Write replies until every sender is dropped
pub async fn write_replies<W>(
    mut rx: mpsc::UnboundedReceiver<ReplyMessage>,
    mut out: W,
) -> Result<u64, ServiceError>
where
    W: AsyncWrite + Unpin,
{
    let mut written = 0u64;
    while let Some(reply) = rx.recv().await {
        let mut line = serde_json::to_vec(&reply)?;
        line.push(b'\n');
        out.write_all(&line).await?;
        out.flush().await?;
        written += 1;
        debug!("[Stdio] Wrote {} reply for '{}'", reply.msg_type(), reply.headers.request_id);
    }
    out.shutdown().await?;
    Ok(written)
}

/// Process every line of `input`, then wait for all pollers and the writer.
///
/// Messages are submitted in arrival order; receipt polling for each runs in
/// the background while later lines are read.
pub async fn serve<R, W>(processor: Arc<TxnProcessor>, input: R, output: W) -> Result<ServeSummary, ServiceError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let writer = tokio::spawn(write_replies(rx, output));

    let mut summary = ServeSummary::default();
    let mut lines = input.lines();
    let mut line_no = 0u64;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }
        summary.messages += 1;

        let ctx = match StdioContext::parse(line_no, line.into_bytes(), tx.clone()) {
            Ok(ctx) => Arc::new(ctx),
            Err(e) => {
                warn!("[Stdio] line {}: {}", line_no, e);
                summary.unparseable += 1;
                let reply = error_reply(&CommonHeaders::default(), Instant::now(), e.status(), &e, None);
                if tx.send(reply).is_err() {
                    return Err(ServiceError::WriterStopped);
                }
                continue;
            }
        };

        if processor.on_message(ctx).await.is_some() {
            summary.submitted += 1;
        }
    }

    info!(
        "[Stdio] Input closed after {} messages, waiting for {} inflight",
        summary.messages,
        processor.inflight_count().await
    );
    processor.drain().await;
    drop(tx);

    summary.replies = match writer.await {
        Ok(result) => result?,
        Err(e) => {
            error!("[Stdio] Reply writer task failed: {}", e);
            return Err(ServiceError::WriterStopped);
        }
    };
    Ok(summary)
}
