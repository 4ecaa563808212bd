//! Fabric Gateway client library

pub mod channel;
pub mod config;
pub mod events;
pub mod gateway;
pub mod identity;
pub mod observability;
pub mod query;
pub mod transaction;
pub mod transport;

pub use config::schema::{GatewayConfig, GatewayOptions};
pub use events::{ListenerHandle, ListenerOptions};
pub use gateway::{ConnectOptions, Contract, Gateway, GatewayError, Network};
pub use identity::{IdentityContext, Wallet};
pub use transaction::{Transaction, TransactionError};
