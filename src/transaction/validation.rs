//! Endorsement response validation.

use crate::channel::{EndorsementResponse, ProposalResponse};
use crate::identity::{IdentityContext, Verifier};
use crate::observability::metrics;
use crate::transaction::types::{TransactionError, TransactionResult};

/// Endorsement responses split into usable and failed.
#[derive(Debug, Clone, Default)]
pub struct ValidatedResponses {
    pub valid: Vec<EndorsementResponse>,
    pub invalid: Vec<EndorsementResponse>,
}

impl ValidatedResponses {
    /// Payload of the first valid response, if it carries one.
    pub fn first_payload(&self) -> Option<Vec<u8>> {
        self.valid
            .first()
            .and_then(|r| r.result.as_ref().ok())
            .map(|r| r.payload.clone())
            .filter(|payload| !payload.is_empty())
    }

    pub fn valid_proposal_responses(&self) -> Vec<ProposalResponse> {
        self.valid.iter().filter_map(|r| r.result.clone().ok()).collect()
    }
}

/// Optional endorsement signature check.
pub struct EndorsementCheck<'a> {
    pub verifier: &'a dyn Verifier,
    pub identity: &'a IdentityContext,
}

/// Partition responses; fail when none are usable.
pub fn validate_peer_responses(
    responses: &[EndorsementResponse],
    check: Option<EndorsementCheck<'_>>,
) -> TransactionResult<ValidatedResponses> {
    if responses.is_empty() {
        return Err(TransactionError::NoResults);
    }

    let mut validated = ValidatedResponses::default();
    for response in responses {
        let usable = match &response.result {
            Ok(proposal_response) if proposal_response.is_endorsed() => match &check {
                Some(check) => endorsement_verifies(check, response),
                None => true,
            },
            _ => false,
        };
        if usable {
            validated.valid.push(response.clone());
        } else {
            validated.invalid.push(response.clone());
        }
    }

    if !validated.invalid.is_empty() {
        metrics::record_endorsement_failures(validated.invalid.len());
        for response in &validated.invalid {
            tracing::warn!(peer = %response.peer, detail = %describe(response), "Invalid endorsement response");
        }
    }

    if validated.valid.is_empty() {
        let lines: Vec<String> = validated.invalid.iter().map(describe).collect();
        let message = format!(
            "No valid responses from any peers. {} peer error responses:\n    {}",
            lines.len(),
            lines.join("\n    ")
        );
        return Err(TransactionError::NoValidResponses {
            message,
            responses: responses.to_vec(),
        });
    }

    Ok(validated)
}

fn endorsement_verifies(check: &EndorsementCheck<'_>, response: &EndorsementResponse) -> bool {
    let Ok(proposal_response) = &response.result else {
        return false;
    };
    let Some(endorsement) = &proposal_response.endorsement else {
        return false;
    };

    let digest = check
        .identity
        .hash(&endorsement.signed_message(&proposal_response.payload));
    match check
        .verifier
        .verify(&endorsement.endorser, &endorsement.signature, &digest)
    {
        Ok(true) => true,
        Ok(false) => false,
        Err(e) => {
            tracing::warn!(peer = %response.peer, error = %e, "Endorsement verification failed");
            false
        }
    }
}

/// "peer=X, status=Y, message=Z"
fn describe(response: &EndorsementResponse) -> String {
    match &response.result {
        Ok(r) => format!("peer={}, status={}, message={}", response.peer, r.status, r.message),
        Err(e) => format!("peer={}, status=error, message={}", response.peer, e),
    }
}
