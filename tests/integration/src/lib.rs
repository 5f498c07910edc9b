//! Shared fixtures for the cross-crate scenario tests: an in-memory dataverse
//! describing execution orders, and gateways wired against it.

use std::sync::Arc;

use warden_auth::Authenticator;
use warden_core::AuthenticatorConfig;
use warden_credentials::testing::{credential, sign_credential, TestKey};
use warden_credentials::{DocumentLoader, ProofSuite};
use warden_dataverse::ontology::{self, execution_status};
use warden_dataverse::testing::{MemoryTriplestore, ScriptedLogic, TRIPLESTORE_ADDRESS};
use warden_dataverse::DataverseClient;

pub const ORDER: &str = "urn:order:genomics";
pub const ZONE: &str = "urn:zone:research";

/// Builds the knowledge graph of one execution order.
pub struct OrderGraph {
    store: MemoryTriplestore,
}

impl Default for OrderGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderGraph {
    pub fn new() -> Self {
        Self {
            store: MemoryTriplestore::new().with_iri(ORDER, ontology::HAS_ZONE, ZONE),
        }
    }

    /// An execution of the order with its statuses, participants and consumed resources.
    pub fn execution(
        mut self,
        id: &str,
        statuses: &[&str],
        participants: &[&str],
        consumes: &[&str],
    ) -> Self {
        self.store = self.store.with_iri(ORDER, ontology::HAS_EXECUTION, id);
        for status in statuses {
            self.store = self.store.with_iri(id, ontology::HAS_STATUS, &execution_status(status));
        }
        for participant in participants {
            self.store = self.store.with_iri(id, ontology::HAS_PARTICIPANT, participant);
        }
        for resource in consumes {
            self.store = self.store.with_iri(id, ontology::CONSUMES, resource);
        }
        self
    }

    /// Attach governance code `gov_code` to `resource`.
    pub fn governed(mut self, resource: &str, gov_code: &str) -> Self {
        let governance = format!("{resource}#governance");
        self.store = self
            .store
            .with_iri(resource, ontology::HAS_GOVERNANCE, &governance)
            .with_literal(&governance, ontology::HAS_GOVERNANCE_CODE, gov_code);
        self
    }

    /// Publish `dataset` through `service` at `uri`.
    pub fn published(mut self, dataset: &str, service: &str, uri: &str) -> Self {
        let publication = format!("{dataset}#publication:{service}");
        self.store = self
            .store
            .with_iri(&publication, ontology::DESCRIBES, dataset)
            .with_iri(&publication, ontology::SERVED_BY, service)
            .with_literal(&publication, ontology::HAS_ACCESS_URI, uri);
        self
    }

    pub fn build(self) -> Arc<MemoryTriplestore> {
        Arc::new(self.store)
    }
}

/// A gateway protecting `service_id`, reading the given graph.
pub fn gateway(
    service_id: &str,
    secret: &[u8],
    graph: Arc<MemoryTriplestore>,
    logic: Arc<ScriptedLogic>,
    loader: Arc<dyn DocumentLoader>,
) -> Authenticator {
    let dataverse = Arc::new(DataverseClient::new(graph, TRIPLESTORE_ADDRESS));
    Authenticator::new(
        AuthenticatorConfig::new(service_id),
        secret.to_vec(),
        loader,
        dataverse,
        logic,
    )
    .unwrap()
}

/// A self-issued credential of `key` asking `to_service` for access on behalf of [`ORDER`].
pub fn present(key: &TestKey, to_service: &str, suite: ProofSuite) -> Vec<u8> {
    let did = key.did();
    let vc = sign_credential(credential(&did, &did, to_service, ORDER), key, suite);
    serde_json::to_vec(&vc).unwrap()
}
