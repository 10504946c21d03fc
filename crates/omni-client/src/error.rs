//! Client error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Composition error: {0}")]
    Composition(#[from] omni_txn::CompositionError),

    #[error("Signing error: {0}")]
    Signing(#[from] omni_executor::SigningError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] omni_executor::PipelineError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] omni_executor::LedgerError),

    #[error("Registry error: {0}")]
    Registry(#[from] omni_registry::RegistryError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] omni_telemetry::TelemetryError),
}

pub type ClientResult<T> = Result<T, ClientError>;
