//! Prometheus metrics and structured logging for the omni marketplace client.
//!
//! - Prometheus collectors for composition, execution outcomes, signing
//!   failures and listing discovery
//! - Structured logging with tracing (JSON in production)

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
