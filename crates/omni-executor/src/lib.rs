//! Signing, submission and confirmation of marketplace operation groups.
//!
//! # Key Components
//!
//! - [`SignerRegistry`]: routes each acting address to its standard or
//!   enclave backend and signs a whole group in one pass
//! - [`LedgerClient`]: node seam (params, submission, pending status, rounds)
//! - [`Pipeline`]: sign -> submit once -> bounded confirmation polling
//!
//! # Outcomes
//!
//! 1. Included within the bound -> `TransactionOutcome::Confirmed`
//! 2. Not observed within the bound -> `TransactionOutcome::TimedOut`
//! 3. Refused by the node or evicted from the pool -> `TransactionOutcome::Rejected`

pub mod error;
pub mod ledger;
pub mod pipeline;
pub mod real_ledger;
pub mod signer;

// Error types
pub use error::{
    BackendError, LedgerError, PipelineError, PipelineResult, SigningError, SigningResult,
    SubmitError,
};

// Ledger seam
pub use ledger::{DynLedgerClient, LedgerClient, MockLedger};
pub use real_ledger::RealLedgerClient;

// Pipeline
pub use pipeline::{ActionStatus, Pipeline, TransactionOutcome, DEFAULT_WAIT_ROUNDS};

// Signing
pub use signer::{
    DynEnclaveBackend, DynStandardBackend, EnclaveBackend, EnclaveSignItem, MockEnclaveBackend,
    MockStandardBackend, SignedGroup, SignedMember, SignerRegistry, StandardBackend, SIGNATURE_LEN,
};
