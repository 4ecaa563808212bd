//! Argument checks for dynamically typed callers.

use serde_json::Value;

use crate::transaction::types::{TransactionError, TransactionResult};

/// Accept only JSON strings; the error lists every other value.
pub fn verify_arguments(args: &[Value]) -> TransactionResult<Vec<String>> {
    let offenders: Vec<String> = args
        .iter()
        .filter(|v| !v.is_string())
        .map(|v| v.to_string())
        .collect();
    if !offenders.is_empty() {
        return Err(TransactionError::InvalidArguments(offenders.join(", ")));
    }

    Ok(args
        .iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect())
}
