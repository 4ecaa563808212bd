//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → GatewayOptions shared via Arc with Gateway, Network, Transaction
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no process-wide instance
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::ConfigError;
pub use schema::GatewayConfig;
pub use schema::GatewayOptions;
pub use schema::{ChannelConfig, ClientConfig, ObservabilityConfig, OrdererConfig, PeerConfig};
pub use schema::{QueryOptions, TransactionOptions};
