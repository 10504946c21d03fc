//! Production `LedgerClient` backed by the node REST client.

use std::sync::Arc;

use omni_registry::{AlgodClient, BoxFuture, NodeStatus, PendingTransaction, RegistryError};
use omni_txn::{SuggestedParams, TxId};
use tracing::warn;

use crate::error::{LedgerError, SubmitError};
use crate::ledger::LedgerClient;

/// Node-backed ledger client.
///
/// A submission answered with a 4xx status is a refusal of the group
/// (`SubmitError::Rejected`); anything else that keeps the node from
/// answering is `SubmitError::Transport`.
#[derive(Debug, Clone)]
pub struct RealLedgerClient {
    client: Arc<AlgodClient>,
}

impl RealLedgerClient {
    pub fn new(client: Arc<AlgodClient>) -> Self {
        Self { client }
    }
}

fn ledger_error(e: RegistryError) -> LedgerError {
    LedgerError(e.to_string())
}

fn submit_error(e: RegistryError) -> SubmitError {
    if e.is_client_error() {
        match e {
            RegistryError::Http { message, .. } => SubmitError::Rejected(message),
            other => SubmitError::Rejected(other.to_string()),
        }
    } else {
        warn!(error = %e, "Submission did not get a node answer");
        SubmitError::Transport(e.to_string())
    }
}

impl LedgerClient for RealLedgerClient {
    fn suggested_params(&self) -> BoxFuture<'_, Result<SuggestedParams, LedgerError>> {
        Box::pin(async move { self.client.suggested_params().await.map_err(ledger_error) })
    }

    fn send_raw_group(&self, signed_group: Vec<u8>) -> BoxFuture<'_, Result<TxId, SubmitError>> {
        Box::pin(async move {
            self.client
                .send_raw_transactions(signed_group)
                .await
                .map_err(submit_error)
        })
    }

    fn pending_status(
        &self,
        tx_id: TxId,
    ) -> BoxFuture<'_, Result<PendingTransaction, LedgerError>> {
        Box::pin(async move {
            self.client
                .pending_transaction(&tx_id)
                .await
                .map_err(ledger_error)
        })
    }

    fn status(&self) -> BoxFuture<'_, Result<NodeStatus, LedgerError>> {
        Box::pin(async move { self.client.status().await.map_err(ledger_error) })
    }

    fn wait_for_block_after(&self, round: u64) -> BoxFuture<'_, Result<NodeStatus, LedgerError>> {
        Box::pin(async move {
            self.client
                .wait_for_block_after(round)
                .await
                .map_err(ledger_error)
        })
    }
}
