//! Commit event handling strategies.
//!
//! # Lifecycle
//! ```text
//! factory.create(tx id, context) → handler
//!     → start_listening   (before the envelope reaches the orderer)
//!     → wait_for_events   (resolves per policy, or times out)
//!     → cancel_listening  (idempotent; on success, timeout and every failure)
//! ```

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

use crate::channel::{Channel, Peer};
use crate::events::manager::EventServiceManager;
use crate::events::service::{EventHandler, EventService, RegistrationId};
use crate::events::types::{CommitError, EventError, EventInfo, StartOptions, VALID_CODE};

/// Waits for a submitted transaction to be committed.
#[async_trait]
pub trait TxEventHandler: Send + Sync {
    async fn start_listening(&self) -> Result<(), CommitError>;

    async fn wait_for_events(&self) -> Result<(), CommitError>;

    /// Stop listening. Safe to call any number of times.
    fn cancel_listening(&self);
}

/// What a handler factory gets to work with.
#[derive(Clone)]
pub struct CommitContext {
    pub manager: Arc<EventServiceManager>,
    pub channel: Arc<dyn Channel>,
    pub msp_id: String,
    pub timeout: Duration,
}

/// Builds one handler per submitted transaction.
pub trait TxEventHandlerFactory: Send + Sync {
    fn create(&self, transaction_id: &str, context: &CommitContext) -> Arc<dyn TxEventHandler>;
}

/// Which peers must report a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Peers of the client's own organization.
    Msp,
    /// Every peer of the channel.
    Network,
}

/// How many reports are enough.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Every peer in scope has reported and at least one committed.
    AllForTx,
    /// The first successful commit.
    AnyForTx,
}

/// Factory for [`TransactionEventHandler`] with a fixed scope and policy.
#[derive(Debug, Clone, Copy)]
pub struct StrategyFactory {
    pub scope: Scope,
    pub policy: Policy,
}

impl TxEventHandlerFactory for StrategyFactory {
    fn create(&self, transaction_id: &str, context: &CommitContext) -> Arc<dyn TxEventHandler> {
        let peers = match self.scope {
            Scope::Msp => context.channel.endorsers(Some(context.msp_id.as_str())),
            Scope::Network => context.channel.endorsers(None),
        };
        Arc::new(TransactionEventHandler::new(
            transaction_id,
            peers,
            self.policy,
            context.manager.clone(),
            context.timeout,
        ))
    }
}

/// Factory for handlers that do not wait at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopFactory;

impl TxEventHandlerFactory for NoopFactory {
    fn create(&self, _transaction_id: &str, _context: &CommitContext) -> Arc<dyn TxEventHandler> {
        Arc::new(NoopEventHandler)
    }
}

#[derive(Debug, Default)]
pub struct NoopEventHandler;

#[async_trait]
impl TxEventHandler for NoopEventHandler {
    async fn start_listening(&self) -> Result<(), CommitError> {
        Ok(())
    }

    async fn wait_for_events(&self) -> Result<(), CommitError> {
        Ok(())
    }

    fn cancel_listening(&self) {}
}

type Outcome = Result<(), CommitError>;

struct ProgressState {
    pending: HashSet<String>,
    succeeded: usize,
    errors: Vec<String>,
    done: Option<oneshot::Sender<Outcome>>,
}

/// Commit reports for one transaction, fed by per-peer event services.
struct Progress {
    transaction_id: String,
    policy: Policy,
    state: Mutex<ProgressState>,
}

impl Progress {
    fn resolve(&self, state: &mut ProgressState, outcome: Outcome) {
        if let Some(done) = state.done.take() {
            let _ = done.send(outcome);
        }
    }

    fn record(&self, peer: &str, result: Result<&str, String>) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.done.is_none() || !state.pending.remove(peer) {
            return;
        }

        match result {
            Ok(status) if status == VALID_CODE => {
                tracing::debug!(transaction_id = %self.transaction_id, peer = %peer, "Commit event received");
                state.succeeded += 1;
                if self.policy == Policy::AnyForTx {
                    self.resolve(&mut state, Ok(()));
                    return;
                }
            }
            Ok(status) => {
                let outcome = Err(CommitError::Rejected {
                    transaction_id: self.transaction_id.clone(),
                    peer: peer.to_string(),
                    status: status.to_string(),
                });
                self.resolve(&mut state, outcome);
                return;
            }
            Err(message) => {
                tracing::warn!(transaction_id = %self.transaction_id, peer = %peer, error = %message, "Commit event error");
                state.errors.push(message);
            }
        }

        if state.pending.is_empty() {
            let outcome = if state.succeeded > 0 {
                Ok(())
            } else {
                Err(CommitError::NoSuccessfulEvents {
                    transaction_id: self.transaction_id.clone(),
                    errors: state.errors.clone(),
                })
            };
            self.resolve(&mut state, outcome);
        }
    }

    fn pending(&self) -> Vec<String> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let mut pending: Vec<_> = state.pending.iter().cloned().collect();
        pending.sort();
        pending
    }
}

#[async_trait]
impl EventHandler for Progress {
    async fn on_event(&self, event: Result<EventInfo, EventError>) {
        match event {
            Ok(info) => {
                let status = info.status.unwrap_or_default();
                self.record(&info.event_service, Ok(status.as_str()));
            }
            Err(e) => {
                if let Some(peer) = e.service() {
                    self.record(peer, Err(e.to_string()));
                }
            }
        }
    }
}

/// Listens on one filtered event service per peer in scope.
pub struct TransactionEventHandler {
    transaction_id: String,
    peers: Vec<Peer>,
    manager: Arc<EventServiceManager>,
    timeout: Duration,
    progress: Arc<Progress>,
    receiver: Mutex<Option<oneshot::Receiver<Outcome>>>,
    registrations: Mutex<Vec<(Arc<EventService>, RegistrationId)>>,
}

impl TransactionEventHandler {
    pub fn new(
        transaction_id: &str,
        peers: Vec<Peer>,
        policy: Policy,
        manager: Arc<EventServiceManager>,
        timeout: Duration,
    ) -> Self {
        let (done, receiver) = oneshot::channel();
        let progress = Progress {
            transaction_id: transaction_id.to_string(),
            policy,
            state: Mutex::new(ProgressState {
                pending: peers.iter().map(|p| p.name().to_string()).collect(),
                succeeded: 0,
                errors: Vec::new(),
                done: Some(done),
            }),
        };

        Self {
            transaction_id: transaction_id.to_string(),
            peers,
            manager,
            timeout,
            progress: Arc::new(progress),
            receiver: Mutex::new(Some(receiver)),
            registrations: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl TxEventHandler for TransactionEventHandler {
    async fn start_listening(&self) -> Result<(), CommitError> {
        if self.peers.is_empty() {
            tracing::warn!(transaction_id = %self.transaction_id, "No event peers in scope, not waiting for commit");
            let mut state = self.progress.state.lock().unwrap_or_else(|e| e.into_inner());
            self.progress.resolve(&mut state, Ok(()));
            return Ok(());
        }

        let services = self.manager.get_event_services(Some(self.peers.as_slice()))?;
        for service in services {
            let id = service.register_transaction_listener(Some(self.transaction_id.clone()), self.progress.clone());
            self.registrations
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push((service.clone(), id));

            if let Err(e) = self.manager.start_event_service(&service, StartOptions::default()).await {
                self.progress.record(service.name(), Err(e.to_string()));
            }
        }
        Ok(())
    }

    async fn wait_for_events(&self) -> Result<(), CommitError> {
        let receiver = self.receiver.lock().unwrap_or_else(|e| e.into_inner()).take();
        let Some(receiver) = receiver else {
            return Ok(());
        };

        let outcome = match tokio::time::timeout(self.timeout, receiver).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(CommitError::NoSuccessfulEvents {
                transaction_id: self.transaction_id.clone(),
                errors: vec!["commit listener dropped".to_string()],
            }),
            Err(_) => Err(CommitError::Timeout {
                transaction_id: self.transaction_id.clone(),
                timeout_secs: self.timeout.as_secs(),
                peers: self.progress.pending(),
            }),
        };
        self.cancel_listening();
        outcome
    }

    fn cancel_listening(&self) {
        let registrations = std::mem::take(&mut *self.registrations.lock().unwrap_or_else(|e| e.into_inner()));
        for (service, id) in registrations {
            service.unregister(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(policy: Policy, peers: &[&str]) -> (Progress, oneshot::Receiver<Outcome>) {
        let (done, receiver) = oneshot::channel();
        let progress = Progress {
            transaction_id: "tx1".into(),
            policy,
            state: Mutex::new(ProgressState {
                pending: peers.iter().map(|p| p.to_string()).collect(),
                succeeded: 0,
                errors: Vec::new(),
                done: Some(done),
            }),
        };
        (progress, receiver)
    }

    #[test]
    fn test_all_for_tx_waits_for_every_peer() {
        let (progress, mut receiver) = progress(Policy::AllForTx, &["p1", "p2"]);
        progress.record("p1", Ok("VALID"));
        assert!(receiver.try_recv().is_err());
        progress.record("p2", Err("disconnected".into()));
        assert_eq!(receiver.try_recv().unwrap(), Ok(()));
    }

    #[test]
    fn test_any_for_tx_first_success() {
        let (progress, mut receiver) = progress(Policy::AnyForTx, &["p1", "p2"]);
        progress.record("p2", Ok("VALID"));
        assert_eq!(receiver.try_recv().unwrap(), Ok(()));
    }

    #[test]
    fn test_invalid_code_rejects() {
        let (progress, mut receiver) = progress(Policy::AnyForTx, &["p1", "p2"]);
        progress.record("p1", Ok("MVCC_READ_CONFLICT"));
        match receiver.try_recv().unwrap() {
            Err(CommitError::Rejected { peer, status, .. }) => {
                assert_eq!(peer, "p1");
                assert_eq!(status, "MVCC_READ_CONFLICT");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_all_errors() {
        let (progress, mut receiver) = progress(Policy::AllForTx, &["p1"]);
        progress.record("unknown", Ok("VALID"));
        progress.record("p1", Err("down".into()));
        match receiver.try_recv().unwrap() {
            Err(CommitError::NoSuccessfulEvents { errors, .. }) => assert_eq!(errors, vec!["down"]),
            other => panic!("unexpected {:?}", other),
        }
    }
}
