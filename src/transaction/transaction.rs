//! One invocation of a chaincode function.
//!
//! # Submit
//! ```text
//! mark invoked → build + sign proposal (tx id minted on first use)
//!     → endorse (explicit peers | discovery | endorsing orgs | all channel peers)
//!     → validate responses (fail before the orderer when none are valid)
//!     → commit handler: start_listening
//!     → build + sign envelope → orderer (non-SUCCESS cancels listening)
//!     → commit handler: wait_for_events
//!     → first valid payload
//! ```

use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use crate::channel::{
    BroadcastResponse, Channel, CommitEnvelope, DiscoveryHandler, DiscoveryRequest, EndorsementResponse, Peer,
    ProposalBuilder, ProposalRequest, ProposalResponse, ProposalResult, SignedProposal,
};
use crate::config::GatewayOptions;
use crate::events::{CommitContext, EventServiceManager, TxEventHandlerFactory};
use crate::identity::{IdentityContext, TransactionId, Verifier};
use crate::observability::metrics;
use crate::query::{Query, QueryHandler, SingleQueryHandler};
use crate::transaction::args::verify_arguments;
use crate::transaction::types::{TransactionError, TransactionResult};
use crate::transaction::validation::{validate_peer_responses, EndorsementCheck};

/// Everything a transaction needs from its contract and network.
#[derive(Clone)]
pub struct TransactionContext {
    pub channel: Arc<dyn Channel>,
    pub chaincode_id: String,
    pub identity: IdentityContext,
    pub options: Arc<GatewayOptions>,
    pub query_handler: Arc<dyn QueryHandler>,
    pub event_strategy: Arc<dyn TxEventHandlerFactory>,
    pub event_manager: Arc<EventServiceManager>,
    pub discovery: Option<Arc<dyn DiscoveryHandler>>,
    pub verifier: Arc<dyn Verifier>,
}

/// A single-use chaincode invocation.
pub struct Transaction {
    context: TransactionContext,
    name: String,
    transient: HashMap<String, Vec<u8>>,
    endorsing_peers: Option<Vec<Peer>>,
    endorsing_orgs: Option<Vec<String>>,
    event_strategy: Option<Arc<dyn TxEventHandlerFactory>>,
    transaction_id: OnceLock<TransactionId>,
    invoked: AtomicBool,
}

impl Transaction {
    pub fn new(context: TransactionContext, name: impl Into<String>) -> Self {
        Self {
            context,
            name: name.into(),
            transient: HashMap::new(),
            endorsing_peers: None,
            endorsing_orgs: None,
            event_strategy: None,
            transaction_id: OnceLock::new(),
            invoked: AtomicBool::new(false),
        }
    }

    /// Fully qualified function name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Transaction id, minted on first use.
    pub fn transaction_id(&self) -> &str {
        &self.minted_id().id
    }

    fn minted_id(&self) -> &TransactionId {
        self.transaction_id
            .get_or_init(|| self.context.identity.calculate_transaction_id())
    }

    /// Private data passed to the chaincode but never written to the ledger.
    pub fn set_transient(&mut self, transient: HashMap<String, Vec<u8>>) -> &mut Self {
        self.transient = transient;
        self
    }

    /// Endorse with exactly these peers. Clears any endorsing organizations.
    pub fn set_endorsing_peers(&mut self, peers: Vec<Peer>) -> &mut Self {
        self.endorsing_peers = Some(peers);
        self.endorsing_orgs = None;
        self
    }

    /// Endorse with peers of these organizations. Clears any endorsing peers.
    pub fn set_endorsing_organizations<I, S>(&mut self, msp_ids: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.endorsing_orgs = Some(msp_ids.into_iter().map(Into::into).collect());
        self.endorsing_peers = None;
        self
    }

    /// Override the network's commit strategy for this transaction.
    pub fn set_event_strategy(&mut self, factory: Arc<dyn TxEventHandlerFactory>) -> &mut Self {
        self.event_strategy = Some(factory);
        self
    }

    fn mark_invoked(&self) -> TransactionResult<()> {
        if self.invoked.swap(true, Ordering::SeqCst) {
            return Err(TransactionError::AlreadyInvoked {
                name: self.name.clone(),
            });
        }
        Ok(())
    }

    fn build_proposal(&self, builder: ProposalBuilder, args: Vec<String>) -> ProposalResult<SignedProposal> {
        let request = ProposalRequest {
            function: self.name.clone(),
            args,
            transient: self.transient.clone(),
        };
        builder
            .build(&self.context.identity, self.minted_id(), request)
            .sign(&self.context.identity)
    }

    /// Submit for endorsement and ordering, then wait for the commit.
    ///
    /// Returns the first valid endorsement payload, or `None` when empty.
    pub async fn submit(&self, args: &[&str]) -> TransactionResult<Option<Vec<u8>>> {
        self.mark_invoked()?;
        self.submit_inner(args.iter().map(|a| a.to_string()).collect()).await
    }

    /// [`submit`](Self::submit) for callers holding JSON values; any non-string fails.
    pub async fn submit_values(&self, args: &[Value]) -> TransactionResult<Option<Vec<u8>>> {
        let args = verify_arguments(args)?;
        self.mark_invoked()?;
        self.submit_inner(args).await
    }

    async fn submit_inner(&self, args: Vec<String>) -> TransactionResult<Option<Vec<u8>>> {
        let context = &self.context;
        let transaction_id = self.transaction_id().to_string();
        let timeout = context.options.transaction.request_timeout();

        let proposal = self
            .build_proposal(
                ProposalBuilder::endorsement(context.channel.name(), &context.chaincode_id),
                args,
            )
            .map_err(|e| self.failed("invalid", e.into()))?;

        tracing::debug!(transaction_id = %transaction_id, function = %self.name, "Submitting transaction");

        let responses = self
            .endorse(&proposal, timeout)
            .await
            .map_err(|e| self.failed("endorsement_failed", e.into()))?;

        let check = context
            .options
            .transaction
            .verify_endorsements
            .then(|| EndorsementCheck {
                verifier: context.verifier.as_ref(),
                identity: &context.identity,
            });
        let validated =
            validate_peer_responses(&responses, check).map_err(|e| self.failed("endorsement_failed", e))?;

        let factory = self
            .event_strategy
            .clone()
            .unwrap_or_else(|| context.event_strategy.clone());
        let commit_context = CommitContext {
            manager: context.event_manager.clone(),
            channel: context.channel.clone(),
            msp_id: context.identity.msp_id().to_string(),
            timeout: context.options.transaction.commit_timeout(),
        };
        let handler = factory.create(&transaction_id, &commit_context);

        if let Err(source) = handler.start_listening().await {
            handler.cancel_listening();
            return Err(self.failed(
                "commit_failed",
                TransactionError::Commit {
                    source,
                    responses: responses.clone(),
                },
            ));
        }

        let broadcast = match self.send_to_orderer(&proposal, &validated.valid_proposal_responses(), timeout).await {
            Ok(broadcast) => broadcast,
            Err(source) => {
                handler.cancel_listening();
                return Err(self.failed(
                    "orderer_failed",
                    TransactionError::Proposal {
                        source,
                        responses: responses.clone(),
                    },
                ));
            }
        };

        if !broadcast.is_success() {
            handler.cancel_listening();
            return Err(self.failed(
                "orderer_rejected",
                TransactionError::OrdererRejected {
                    transaction_id,
                    status: broadcast.status,
                    responses,
                },
            ));
        }

        if let Err(source) = handler.wait_for_events().await {
            return Err(self.failed("commit_failed", TransactionError::Commit { source, responses }));
        }

        metrics::record_transaction("success");
        tracing::info!(transaction_id = %transaction_id, function = %self.name, "Transaction committed");
        Ok(validated.first_payload())
    }

    async fn endorse(&self, proposal: &SignedProposal, timeout: Duration) -> ProposalResult<Vec<EndorsementResponse>> {
        let channel = &self.context.channel;

        if let Some(peers) = &self.endorsing_peers {
            return proposal.send(peers, timeout).await;
        }

        if let Some(discovery) = &self.context.discovery {
            let request = DiscoveryRequest {
                required_orgs: self.endorsing_orgs.clone(),
                timeout,
            };
            return proposal.send_to_handler(discovery.as_ref(), &request).await;
        }

        let targets = match &self.endorsing_orgs {
            Some(orgs) => self.organization_peers(orgs),
            None => channel.endorsers(None),
        };
        proposal.send(&targets, timeout).await
    }

    fn organization_peers(&self, msp_ids: &[String]) -> Vec<Peer> {
        msp_ids
            .iter()
            .flat_map(|msp_id| self.context.channel.endorsers(Some(msp_id.as_str())))
            .collect()
    }

    async fn send_to_orderer(
        &self,
        proposal: &SignedProposal,
        responses: &[ProposalResponse],
        timeout: Duration,
    ) -> ProposalResult<BroadcastResponse> {
        let envelope = CommitEnvelope::build(proposal, responses).sign(&self.context.identity)?;
        match &self.context.discovery {
            Some(discovery) => envelope.send_to_handler(discovery.as_ref(), timeout).await,
            None => envelope.send(&self.context.channel.committers(), timeout).await,
        }
    }

    fn failed(&self, outcome: &'static str, error: TransactionError) -> TransactionError {
        metrics::record_transaction(outcome);
        tracing::error!(
            transaction_id = %self.transaction_id(),
            function = %self.name,
            responses = error.responses().len(),
            error = %error,
            "Transaction submit failed"
        );
        error
    }

    /// Evaluate read-only and return the chaincode's response payload.
    pub async fn evaluate(&self, args: &[&str]) -> TransactionResult<Vec<u8>> {
        self.mark_invoked()?;
        self.evaluate_inner(args.iter().map(|a| a.to_string()).collect()).await
    }

    /// [`evaluate`](Self::evaluate) for callers holding JSON values.
    pub async fn evaluate_values(&self, args: &[Value]) -> TransactionResult<Vec<u8>> {
        let args = verify_arguments(args)?;
        self.mark_invoked()?;
        self.evaluate_inner(args).await
    }

    async fn evaluate_inner(&self, args: Vec<String>) -> TransactionResult<Vec<u8>> {
        let context = &self.context;
        let proposal = self.build_proposal(ProposalBuilder::query(context.channel.name(), &context.chaincode_id), args)?;
        let query = Query::new(proposal, context.options.query.timeout());

        tracing::debug!(transaction_id = %query.transaction_id(), function = %self.name, "Evaluating transaction");

        let payload = match (&self.endorsing_peers, &self.endorsing_orgs) {
            (Some(peers), _) => SingleQueryHandler::new(peers.clone()).evaluate(&query).await?,
            (None, Some(orgs)) => {
                SingleQueryHandler::new(self.organization_peers(orgs))
                    .evaluate(&query)
                    .await?
            }
            (None, None) => context.query_handler.evaluate(&query).await?,
        };
        Ok(payload)
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("name", &self.name)
            .field("chaincode_id", &self.context.chaincode_id)
            .field("transaction_id", &self.transaction_id.get().map(|t| &t.id))
            .field("endorsing_peers", &self.endorsing_peers)
            .field("endorsing_orgs", &self.endorsing_orgs)
            .field("invoked", &self.invoked.load(Ordering::SeqCst))
            .finish()
    }
}
