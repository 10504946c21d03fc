//! Atomic marketplace client.
//!
//! Library consumed by presentation code:
//! - `config`: TOML configuration with environment path override
//! - `client`: `MarketplaceClient`, the facade over composition, signing,
//!   submission and listing discovery
//!
//! Call [`init_logging`] once at startup before using the client.

pub mod client;
pub mod config;
pub mod error;

pub use client::MarketplaceClient;
pub use config::{MarketConfig, NodeConfig, CONFIG_ENV, DEFAULT_CONFIG_PATH};
pub use error::{ClientError, ClientResult};
pub use omni_telemetry::init_logging;
