//! Ledger client trait for submission and confirmation.
//!
//! Abstracts the node so the pipeline can run against the REST client in
//! production and against scripted ledgers in tests.

use std::collections::VecDeque;
use std::sync::Arc;

use omni_registry::{BoxFuture, NodeStatus, PendingTransaction};
use omni_txn::{SuggestedParams, TxId};
use parking_lot::Mutex;

use crate::error::{LedgerError, SubmitError};

/// Node operations the executor needs.
pub trait LedgerClient: Send + Sync {
    fn suggested_params(&self) -> BoxFuture<'_, Result<SuggestedParams, LedgerError>>;

    /// Submit a signed group as one unit. Called exactly once per execution.
    fn send_raw_group(&self, signed_group: Vec<u8>) -> BoxFuture<'_, Result<TxId, SubmitError>>;

    fn pending_status(&self, tx_id: TxId)
        -> BoxFuture<'_, Result<PendingTransaction, LedgerError>>;

    fn status(&self) -> BoxFuture<'_, Result<NodeStatus, LedgerError>>;

    /// Resolve once a block after `round` exists.
    fn wait_for_block_after(&self, round: u64) -> BoxFuture<'_, Result<NodeStatus, LedgerError>>;
}

/// Arc wrapper for LedgerClient trait objects.
pub type DynLedgerClient = Arc<dyn LedgerClient>;

/// Scripted ledger for testing.
///
/// Pending polls pop from a queue; once the queue is empty every poll
/// answers "still pending".
#[derive(Debug)]
pub struct MockLedger {
    params: Mutex<SuggestedParams>,
    submissions: Mutex<Vec<Vec<u8>>>,
    next_submit: Mutex<Option<SubmitError>>,
    pending: Mutex<VecDeque<Result<PendingTransaction, LedgerError>>>,
    polls: Mutex<Vec<TxId>>,
    round: Mutex<u64>,
}

impl MockLedger {
    pub fn new(params: SuggestedParams) -> Self {
        let round = params.last_round;
        Self {
            params: Mutex::new(params),
            submissions: Mutex::new(Vec::new()),
            next_submit: Mutex::new(None),
            pending: Mutex::new(VecDeque::new()),
            polls: Mutex::new(Vec::new()),
            round: Mutex::new(round),
        }
    }

    /// Make the next submission fail.
    pub fn fail_next_submit(&self, error: SubmitError) {
        *self.next_submit.lock() = Some(error);
    }

    /// Queue the answer of the next pending poll.
    pub fn push_pending(&self, result: Result<PendingTransaction, LedgerError>) {
        self.pending.lock().push_back(result);
    }

    /// Queue a confirmation at `round`.
    pub fn push_confirmed(&self, round: u64) {
        self.push_pending(Ok(PendingTransaction {
            confirmed_round: Some(round),
            pool_error: String::new(),
        }));
    }

    pub fn submissions(&self) -> Vec<Vec<u8>> {
        self.submissions.lock().clone()
    }

    pub fn polls(&self) -> Vec<TxId> {
        self.polls.lock().clone()
    }

    pub fn current_round(&self) -> u64 {
        *self.round.lock()
    }
}

impl LedgerClient for MockLedger {
    fn suggested_params(&self) -> BoxFuture<'_, Result<SuggestedParams, LedgerError>> {
        Box::pin(async move { Ok(self.params.lock().clone()) })
    }

    fn send_raw_group(&self, signed_group: Vec<u8>) -> BoxFuture<'_, Result<TxId, SubmitError>> {
        Box::pin(async move {
            self.submissions.lock().push(signed_group.clone());
            if let Some(error) = self.next_submit.lock().take() {
                return Err(error);
            }
            let first = omni_txn::SignedTransaction::decode_group(&signed_group)
                .map_err(|e| SubmitError::Rejected(e.to_string()))?;
            let lead = first
                .first()
                .ok_or_else(|| SubmitError::Rejected("empty group".to_string()))?;
            lead.txn
                .tx_id()
                .map_err(|e| SubmitError::Rejected(e.to_string()))
        })
    }

    fn pending_status(
        &self,
        tx_id: TxId,
    ) -> BoxFuture<'_, Result<PendingTransaction, LedgerError>> {
        Box::pin(async move {
            self.polls.lock().push(tx_id);
            self.pending
                .lock()
                .pop_front()
                .unwrap_or_else(|| Ok(PendingTransaction::default()))
        })
    }

    fn status(&self) -> BoxFuture<'_, Result<NodeStatus, LedgerError>> {
        Box::pin(async move {
            Ok(NodeStatus {
                last_round: *self.round.lock(),
            })
        })
    }

    fn wait_for_block_after(&self, round: u64) -> BoxFuture<'_, Result<NodeStatus, LedgerError>> {
        Box::pin(async move {
            let mut current = self.round.lock();
            *current = (*current).max(round + 1);
            Ok(NodeStatus {
                last_round: *current,
            })
        })
    }
}
