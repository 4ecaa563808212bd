//! Gateway: composition root of the client.
//!
//! # Data Flow
//! ```text
//! Gateway::connect(topology, ConnectOptions)
//!     → strategy names resolved through the query and commit registries
//!     → get_network(channel)   (one Network per channel, cached)
//!         → Network: query handler + EventServiceManager + listeners
//!         → get_contract(chaincode, namespace) → Contract
//!             → create_transaction(name) → Transaction
//! Gateway::disconnect → every Network closes its listeners and event services
//! ```

pub mod contract;
pub mod gateway;
pub mod network;
pub mod types;

pub use contract::Contract;
pub use gateway::{ConnectOptions, Gateway};
pub use network::Network;
pub use types::{GatewayError, GatewayResult};
