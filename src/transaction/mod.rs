//! Transaction subsystem.
//!
//! # Data Flow
//! ```text
//! Contract::create_transaction
//!     → transaction.rs (single-use Transaction)
//!         submit:   endorse → validation.rs → commit strategy → orderer → wait
//!         evaluate: query proposal → QueryHandler
//!     → args.rs (string-only check for JSON arguments)
//!     → types.rs (TransactionError with per-peer responses attached)
//! ```
//!
//! # Design Decisions
//! - A transaction can be invoked once; the second call fails without
//!   touching the network
//! - Commit listening starts before the envelope is sent to the orderer
//! - Submission is never retried

pub mod args;
pub mod transaction;
pub mod types;
pub mod validation;

pub use args::verify_arguments;
pub use transaction::{Transaction, TransactionContext};
pub use types::{TransactionError, TransactionResult};
pub use validation::{validate_peer_responses, EndorsementCheck, ValidatedResponses};
