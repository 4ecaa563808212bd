//! Contract: a chaincode (optionally one namespace within it) on a network.

use std::sync::Arc;

use crate::events::{ContractEvent, EventCallback, EventResult, ListenerHandle, ListenerOptions};
use crate::gateway::network::Network;
use crate::transaction::{Transaction, TransactionResult};

#[derive(Debug, Clone)]
pub struct Contract {
    network: Arc<Network>,
    chaincode_id: String,
    namespace: Option<String>,
}

impl Contract {
    pub(crate) fn new(network: Arc<Network>, chaincode_id: &str, namespace: Option<&str>) -> Self {
        Self {
            network,
            chaincode_id: chaincode_id.to_string(),
            namespace: namespace.filter(|ns| !ns.is_empty()).map(str::to_string),
        }
    }

    pub fn chaincode_id(&self) -> &str {
        &self.chaincode_id
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn network(&self) -> &Arc<Network> {
        &self.network
    }

    fn qualified_name(&self, name: &str) -> String {
        match &self.namespace {
            Some(namespace) => format!("{}:{}", namespace, name),
            None => name.to_string(),
        }
    }

    /// New single-use transaction for function `name`.
    pub fn create_transaction(&self, name: &str) -> Transaction {
        Transaction::new(
            self.network.transaction_context(&self.chaincode_id),
            self.qualified_name(name),
        )
    }

    pub async fn submit_transaction(&self, name: &str, args: &[&str]) -> TransactionResult<Option<Vec<u8>>> {
        self.create_transaction(name).submit(args).await
    }

    pub async fn evaluate_transaction(&self, name: &str, args: &[&str]) -> TransactionResult<Vec<u8>> {
        self.create_transaction(name).evaluate(args).await
    }

    /// Chaincode events of this contract whose name matches `event_name` (a regular expression).
    pub async fn add_contract_listener<C>(
        &self,
        event_name: &str,
        callback: C,
        options: ListenerOptions,
    ) -> EventResult<ListenerHandle>
    where
        C: EventCallback<ContractEvent> + 'static,
    {
        self.network
            .add_contract_listener(&self.chaincode_id, event_name, callback, options)
            .await
    }

    pub fn remove_contract_listener(&self, handle: &ListenerHandle) -> bool {
        self.network.remove_listener(handle)
    }
}
