//! Gateway error definitions.

use thiserror::Error;

use crate::config::ConfigError;
use crate::events::EventError;
use crate::identity::IdentityError;
use crate::transaction::TransactionError;
use crate::transport::TransportError;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Channel {0} is not known to the gateway")]
    UnknownChannel(String),

    #[error("Gateway is disconnected")]
    Disconnected,

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Event(#[from] EventError),

    #[error(transparent)]
    Transaction(#[from] TransactionError),
}

pub type GatewayResult<T> = Result<T, GatewayError>;
