//! Inflight registry
//!
//! Tracks submitted-but-unresolved transactions per sender. Each sender has
//! its own lane guarded by an async mutex; holding the lane serializes nonce
//! allocation, submission and insertion for that sender while other senders
//! proceed independently.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use alloy_primitives::{Address, B256};
use tokio::sync::{watch, Mutex as AsyncMutex, OwnedMutexGuard};
use tokio::time::Instant;

use crate::messages::TxnKind;

/// Terminal outcome of an inflight transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnOutcome {
    /// Mined with a success status
    MinedSuccess,
    /// Mined but reverted on-chain
    MinedFailure,
    /// No receipt before the deadline
    TimedOut,
    /// Receipt queries were still failing at the deadline
    ReceiptError,
}

impl std::fmt::Display for TxnOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TxnOutcome::MinedSuccess => write!(f, "MinedSuccess"),
            TxnOutcome::MinedFailure => write!(f, "MinedFailure"),
            TxnOutcome::TimedOut => write!(f, "TimedOut"),
            TxnOutcome::ReceiptError => write!(f, "ReceiptError"),
        }
    }
}

/// A transaction the node accepted but whose outcome is not yet known
#[derive(Debug)]
pub struct InflightTxn {
    pub from: Address,
    pub nonce: u64,
    pub tx_hash: B256,
    pub kind: TxnKind,
    pub submitted_at: Instant,
    outcome: watch::Sender<Option<TxnOutcome>>,
}

impl InflightTxn {
    pub fn new(from: Address, nonce: u64, tx_hash: B256, kind: TxnKind) -> Self {
        let (outcome, _) = watch::channel(None);
        Self {
            from,
            nonce,
            tx_hash,
            kind,
            submitted_at: Instant::now(),
            outcome,
        }
    }

    /// Current outcome, `None` while pending
    pub fn outcome(&self) -> Option<TxnOutcome> {
        *self.outcome.borrow()
    }

    /// Record the terminal outcome and wake every waiter. Only the first call
    /// has any effect.
    pub(crate) fn complete(&self, outcome: TxnOutcome) {
        self.outcome.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(outcome);
            true
        });
    }

    /// Wait until the poller reaches a terminal outcome
    pub async fn wait(&self) -> TxnOutcome {
        let mut rx = self.outcome.subscribe();
        loop {
            if let Some(outcome) = *rx.borrow_and_update() {
                return outcome;
            }
            // The sender lives in `self`, so the channel cannot close here
            if rx.changed().await.is_err() {
                return TxnOutcome::ReceiptError;
            }
        }
    }
}

type Lane = Arc<AsyncMutex<Vec<Arc<InflightTxn>>>>;

/// Per-sender index of inflight transactions
#[derive(Debug, Default)]
pub struct InflightRegistry {
    lanes: Mutex<HashMap<Address, Lane>>,
}

impl InflightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lane(&self, sender: &Address) -> Lane {
        let mut lanes = self.lanes.lock().unwrap_or_else(|e| e.into_inner());
        lanes.entry(*sender).or_default().clone()
    }

    /// Take exclusive hold of a sender's lane. Allocation and insertion for
    /// that sender happen while the returned guard is alive.
    pub async fn lock_sender(&self, sender: Address) -> SenderLane {
        let guard = self.lane(&sender).lock_owned().await;
        SenderLane { sender, guard }
    }

    /// Remove exactly this entry. Another transaction sharing its nonce (a
    /// caller-supplied replacement) stays inflight. Returns whether it was present.
    pub async fn remove(&self, txn: &Arc<InflightTxn>) -> bool {
        let sender = txn.from;
        let lane = self.lane(&sender);
        let removed = {
            let mut txns = lane.lock().await;
            let before = txns.len();
            txns.retain(|t| !Arc::ptr_eq(t, txn));
            txns.len() != before
        };
        self.prune(&sender, lane);
        removed
    }

    /// Drop an empty lane nobody else holds
    fn prune(&self, sender: &Address, lane: Lane) {
        let mut lanes = self.lanes.lock().unwrap_or_else(|e| e.into_inner());
        // Two references: ours and the map's
        if Arc::strong_count(&lane) == 2 {
            if let Ok(txns) = lane.try_lock() {
                if txns.is_empty() {
                    lanes.remove(sender);
                }
            }
        }
    }

    /// Snapshot of a sender's inflight transactions, in submission order
    pub async fn snapshot(&self, sender: Address) -> Vec<Arc<InflightTxn>> {
        let lane = {
            let lanes = self.lanes.lock().unwrap_or_else(|e| e.into_inner());
            match lanes.get(&sender) {
                Some(lane) => lane.clone(),
                None => return Vec::new(),
            }
        };
        let txns = lane.lock().await;
        txns.clone()
    }

    /// Total inflight transactions across all senders
    pub async fn len(&self) -> usize {
        let lanes: Vec<Lane> = {
            let lanes = self.lanes.lock().unwrap_or_else(|e| e.into_inner());
            lanes.values().cloned().collect()
        };
        let mut total = 0;
        for lane in lanes {
            total += lane.lock().await.len();
        }
        total
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Exclusive hold on one sender's inflight sequence
pub struct SenderLane {
    sender: Address,
    guard: OwnedMutexGuard<Vec<Arc<InflightTxn>>>,
}

impl SenderLane {
    pub fn sender(&self) -> Address {
        self.sender
    }

    /// Highest nonce currently inflight for this sender
    pub fn highest_nonce(&self) -> Option<u64> {
        self.guard.iter().map(|t| t.nonce).max()
    }

    pub fn len(&self) -> usize {
        self.guard.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard.is_empty()
    }

    /// Append a newly submitted transaction
    pub fn insert(&mut self, txn: Arc<InflightTxn>) {
        self.guard.push(txn);
    }
}
