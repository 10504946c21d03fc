//! Submission & Confirmation Pipeline.
//!
//! `execute` runs one group through three strictly ordered phases:
//!
//! 1. Sign every member (one signing pass)
//! 2. Submit the signed group exactly once
//! 3. Poll for inclusion, at most `wait_rounds` checks, waiting for the next
//!    block between checks
//!
//! A refused group is returned as `Rejected` and never resubmitted; it has to
//! be recomposed from current state.

use std::sync::Arc;

use omni_txn::{MarketAction, OperationGroup, TxId};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{PipelineError, PipelineResult, SubmitError};
use crate::ledger::DynLedgerClient;
use crate::signer::SignerRegistry;

/// Default number of confirmation checks.
pub const DEFAULT_WAIT_ROUNDS: u32 = 4;

/// Result of one execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TransactionOutcome {
    /// Included in a block.
    Confirmed {
        tx_id: TxId,
        confirmed_round: u64,
        /// Checks spent before inclusion was observed.
        checks: u32,
    },
    /// Not observed within the bound. The group may still land; re-query
    /// ledger state before retrying.
    TimedOut { tx_id: TxId },
    /// Refused by the network. Terminal for this group instance.
    Rejected { reason: String },
}

impl TransactionOutcome {
    /// Short label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed { .. } => "confirmed",
            Self::TimedOut { .. } => "timed_out",
            Self::Rejected { .. } => "rejected",
        }
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed { .. })
    }

    pub fn tx_id(&self) -> Option<TxId> {
        match self {
            Self::Confirmed { tx_id, .. } | Self::TimedOut { tx_id } => Some(*tx_id),
            Self::Rejected { .. } => None,
        }
    }
}

/// User-visible state of an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ActionStatus {
    InProgress,
    Confirmed { tx_id: TxId },
    Rejected { reason: String },
    TimedOutPending { tx_id: TxId },
}

impl From<&TransactionOutcome> for ActionStatus {
    fn from(outcome: &TransactionOutcome) -> Self {
        match outcome {
            TransactionOutcome::Confirmed { tx_id, .. } => Self::Confirmed { tx_id: *tx_id },
            TransactionOutcome::TimedOut { tx_id } => Self::TimedOutPending { tx_id: *tx_id },
            TransactionOutcome::Rejected { reason } => Self::Rejected {
                reason: reason.clone(),
            },
        }
    }
}

/// Signs, submits and confirms operation groups.
#[derive(Clone)]
pub struct Pipeline {
    ledger: DynLedgerClient,
    signers: Arc<SignerRegistry>,
}

impl Pipeline {
    pub fn new(ledger: DynLedgerClient, signers: Arc<SignerRegistry>) -> Self {
        Self { ledger, signers }
    }

    pub fn ledger(&self) -> &DynLedgerClient {
        &self.ledger
    }

    pub fn signers(&self) -> &Arc<SignerRegistry> {
        &self.signers
    }

    /// Sign, submit once, and wait up to `wait_rounds` checks for inclusion.
    ///
    /// # Errors
    /// - `PipelineError::Signing`: nothing was submitted
    /// - `PipelineError::Transport`: submission outcome unknown
    pub async fn execute(
        &self,
        group: OperationGroup,
        wait_rounds: u32,
    ) -> PipelineResult<TransactionOutcome> {
        let action = group.action();
        let tx_id = group.lead_tx_id();

        let signed = self.signers.sign_group(&group).await?;
        let wire = signed.to_wire();

        debug!(action = %action, tx_id = %tx_id, bytes = wire.len(), "Submitting group");
        match self.ledger.send_raw_group(wire).await {
            Ok(reported) => {
                if reported != tx_id {
                    warn!(
                        expected = %tx_id,
                        reported = %reported,
                        "Node reported a different transaction id"
                    );
                }
            }
            Err(SubmitError::Rejected(reason)) => {
                info!(
                    action = %action,
                    tx_id = %tx_id,
                    reason = %reason,
                    "Group rejected on submission"
                );
                return Ok(TransactionOutcome::Rejected { reason });
            }
            Err(SubmitError::Transport(e)) => {
                warn!(
                    action = %action,
                    tx_id = %tx_id,
                    error = %e,
                    "Group submission outcome unknown"
                );
                return Err(PipelineError::Transport(e));
            }
        }

        let start_round = match self.ledger.status().await {
            Ok(status) => status.last_round,
            Err(e) => {
                warn!(error = %e, "Failed to read node status, counting from first valid round");
                group
                    .members()
                    .first()
                    .map(|m| m.txn.first_valid)
                    .unwrap_or_default()
            }
        };

        let outcome = self
            .await_confirmation(action, tx_id, start_round, wait_rounds.max(1))
            .await;
        info!(action = %action, tx_id = %tx_id, outcome = outcome.as_str(), "Execution finished");
        Ok(outcome)
    }

    async fn await_confirmation(
        &self,
        action: MarketAction,
        tx_id: TxId,
        start_round: u64,
        wait_rounds: u32,
    ) -> TransactionOutcome {
        let mut round = start_round;
        for check in 1..=wait_rounds {
            match self.ledger.pending_status(tx_id).await {
                Ok(pending) if pending.is_confirmed() => {
                    return TransactionOutcome::Confirmed {
                        tx_id,
                        confirmed_round: pending.confirmed_round.unwrap_or(round),
                        checks: check,
                    };
                }
                Ok(pending) if !pending.pool_error.is_empty() => {
                    info!(
                        action = %action,
                        tx_id = %tx_id,
                        reason = %pending.pool_error,
                        "Group evicted from pool"
                    );
                    return TransactionOutcome::Rejected {
                        reason: pending.pool_error,
                    };
                }
                Ok(_) => debug!(tx_id = %tx_id, check, round, "Group still pending"),
                Err(e) => warn!(tx_id = %tx_id, check, error = %e, "Confirmation poll failed"),
            }

            if check < wait_rounds {
                round = match self.ledger.wait_for_block_after(round).await {
                    Ok(status) => status.last_round,
                    Err(e) => {
                        warn!(round, error = %e, "Wait for next block failed");
                        round + 1
                    }
                };
            }
        }

        TransactionOutcome::TimedOut { tx_id }
    }
}
