use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use warden_core::ExecutionOrderContext;

use crate::error::DataverseError;
use crate::ontology;
use crate::query::{
    SelectQuery, SelectResponse, TriplePattern, VarOrNamedNode, VarOrNode, VarOrNodeOrLiteral,
};

/// Trait for running read-only smart queries against a contract.
#[async_trait]
pub trait ContractQuerier: Send + Sync {
    /// Send `msg` to the contract at `contract` and return its JSON response.
    async fn query_smart(&self, contract: &str, msg: &Value) -> Result<Value, DataverseError>;
}

/// Queries contracts through a chain REST (LCD) gateway.
#[derive(Clone)]
pub struct LcdContractQuerier {
    client: reqwest::Client,
    endpoint: String,
}

impl LcdContractQuerier {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, DataverseError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DataverseError::Transport(format!("couldn't build http client: {e}")))?;
        Ok(Self::with_client(client, endpoint))
    }

    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        }
    }

    fn smart_url(&self, contract: &str, msg: &Value) -> String {
        let encoded = URL_SAFE.encode(msg.to_string());
        format!(
            "{}/cosmwasm/wasm/v1/contract/{contract}/smart/{encoded}",
            self.endpoint
        )
    }
}

#[derive(Deserialize)]
struct SmartQueryResponse {
    data: Value,
}

#[async_trait]
impl ContractQuerier for LcdContractQuerier {
    async fn query_smart(&self, contract: &str, msg: &Value) -> Result<Value, DataverseError> {
        let response: SmartQueryResponse = self
            .client
            .get(self.smart_url(contract, msg))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.data)
    }
}

#[derive(Deserialize)]
struct DataverseInfo {
    triplestore_address: String,
}

/// Client for the fixed queries made against the dataverse triplestore.
pub struct DataverseClient {
    querier: Arc<dyn ContractQuerier>,
    triplestore: String,
}

impl DataverseClient {
    /// Resolve the triplestore of the dataverse contract at `dataverse_addr`.
    pub async fn connect(
        querier: Arc<dyn ContractQuerier>,
        dataverse_addr: &str,
    ) -> Result<Self, DataverseError> {
        let data = querier
            .query_smart(dataverse_addr, &json!({ "dataverse": {} }))
            .await?;
        let info: DataverseInfo = serde_json::from_value(data)?;
        tracing::info!(
            dataverse = dataverse_addr,
            triplestore = %info.triplestore_address,
            "resolved dataverse triplestore"
        );
        Ok(Self::new(querier, info.triplestore_address))
    }

    /// Use an already known triplestore address.
    pub fn new(querier: Arc<dyn ContractQuerier>, triplestore: impl Into<String>) -> Self {
        Self {
            querier,
            triplestore: triplestore.into(),
        }
    }

    pub fn triplestore(&self) -> &str {
        &self.triplestore
    }

    /// Run a SELECT query against the triplestore.
    pub async fn select(&self, query: SelectQuery) -> Result<SelectResponse, DataverseError> {
        let msg = serde_json::to_value(query.into_message())?;
        let data = self.querier.query_smart(&self.triplestore, &msg).await?;
        Ok(serde_json::from_value(data)?)
    }

    /// Zone and per-execution statuses of the executions of `order_id` in
    /// which `executing_service` participates.
    ///
    /// The zone is required; executions without a status or without this
    /// service are left out rather than reported as errors.
    pub async fn get_execution_order_context(
        &self,
        order_id: &str,
        executing_service: &str,
    ) -> Result<ExecutionOrderContext, DataverseError> {
        let zone = self.get_execution_order_zone(order_id).await?;

        let query = SelectQuery::new(
            &["execution", "status"],
            vec![
                TriplePattern::new(
                    VarOrNode::iri(order_id),
                    VarOrNamedNode::prefixed(ontology::HAS_EXECUTION),
                    VarOrNodeOrLiteral::var("execution"),
                ),
                TriplePattern::new(
                    VarOrNode::var("execution"),
                    VarOrNamedNode::prefixed(ontology::HAS_PARTICIPANT),
                    VarOrNodeOrLiteral::iri(executing_service),
                ),
                TriplePattern::new(
                    VarOrNode::var("execution"),
                    VarOrNamedNode::prefixed(ontology::HAS_STATUS),
                    VarOrNodeOrLiteral::var("status"),
                ),
            ],
        );
        let response = self.select(query).await?;

        let mut context = ExecutionOrderContext::new(zone);
        for execution in response.values("execution", &[])? {
            for status in response.values("status", &[("execution", execution.as_str())])? {
                context.add_status(execution.clone(), status);
            }
        }

        tracing::debug!(
            order = order_id,
            zone = %context.zone,
            executions = context.executions.len(),
            "fetched execution order context"
        );
        Ok(context)
    }

    /// The zone `order_id` executes in.
    pub async fn get_execution_order_zone(&self, order_id: &str) -> Result<String, DataverseError> {
        let query = SelectQuery::new(
            &["zone"],
            vec![TriplePattern::new(
                VarOrNode::iri(order_id),
                VarOrNamedNode::prefixed(ontology::HAS_ZONE),
                VarOrNodeOrLiteral::var("zone"),
            )],
        );
        unique(
            self.select(query).await?.values("zone", &[])?,
            &format!("zone of execution order '{order_id}'"),
        )
    }

    /// Resources consumed by one execution of an order.
    pub async fn get_execution_consumed_resources(
        &self,
        order_id: &str,
        execution_id: &str,
    ) -> Result<BTreeSet<String>, DataverseError> {
        let query = SelectQuery::new(
            &["resource"],
            vec![
                TriplePattern::new(
                    VarOrNode::iri(order_id),
                    VarOrNamedNode::prefixed(ontology::HAS_EXECUTION),
                    VarOrNodeOrLiteral::iri(execution_id),
                ),
                TriplePattern::new(
                    VarOrNode::iri(execution_id),
                    VarOrNamedNode::prefixed(ontology::CONSUMES),
                    VarOrNodeOrLiteral::var("resource"),
                ),
            ],
        );
        let resources = self.select(query).await?.values("resource", &[])?;
        tracing::debug!(
            execution = execution_id,
            resources = resources.len(),
            "fetched consumed resources"
        );
        Ok(resources)
    }

    /// Access URI of `resource_id` as published by `served_by_service`.
    pub async fn get_resource_publication(
        &self,
        resource_id: &str,
        served_by_service: &str,
    ) -> Result<String, DataverseError> {
        let query = SelectQuery::new(
            &["uri"],
            vec![
                TriplePattern::new(
                    VarOrNode::var("publication"),
                    VarOrNamedNode::prefixed(ontology::DESCRIBES),
                    VarOrNodeOrLiteral::iri(resource_id),
                ),
                TriplePattern::new(
                    VarOrNode::var("publication"),
                    VarOrNamedNode::prefixed(ontology::SERVED_BY),
                    VarOrNodeOrLiteral::iri(served_by_service),
                ),
                TriplePattern::new(
                    VarOrNode::var("publication"),
                    VarOrNamedNode::prefixed(ontology::HAS_ACCESS_URI),
                    VarOrNodeOrLiteral::var("uri"),
                ),
            ],
        );
        let uris = self.select(query).await?.values("uri", &[])?;
        unique(
            uris,
            &format!("publication of '{resource_id}' served by '{served_by_service}'"),
        )
    }

    /// URI of the governance code attached to `resource_id`.
    pub async fn get_resource_gov_code(&self, resource_id: &str) -> Result<String, DataverseError> {
        let query = SelectQuery::new(
            &["code"],
            vec![
                TriplePattern::new(
                    VarOrNode::iri(resource_id),
                    VarOrNamedNode::prefixed(ontology::HAS_GOVERNANCE),
                    VarOrNodeOrLiteral::var("governance"),
                ),
                TriplePattern::new(
                    VarOrNode::var("governance"),
                    VarOrNamedNode::prefixed(ontology::HAS_GOVERNANCE_CODE),
                    VarOrNodeOrLiteral::var("code"),
                ),
            ],
        );
        let codes = self.select(query).await?.values("code", &[])?;
        unique(codes, &format!("governance code of '{resource_id}'"))
    }
}

fn unique(values: BTreeSet<String>, what: &str) -> Result<String, DataverseError> {
    let count = values.len();
    let mut values = values.into_iter();
    match (values.next(), count) {
        (Some(value), 1) => Ok(value),
        (None, _) => Err(DataverseError::NotFound(what.to_string())),
        _ => Err(DataverseError::Ambiguous(format!("{count} candidates for {what}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ontology::execution_status;
    use crate::testing::MemoryTriplestore;

    const ORDER: &str = "urn:order:1";
    const SERVICE: &str = "did:key:z6MkService";

    fn store() -> MemoryTriplestore {
        MemoryTriplestore::new()
            .with_iri(ORDER, ontology::HAS_ZONE, "urn:zone:1")
            .with_iri(ORDER, ontology::HAS_EXECUTION, "urn:exec:1")
            .with_iri(ORDER, ontology::HAS_EXECUTION, "urn:exec:2")
            .with_iri("urn:exec:1", ontology::HAS_PARTICIPANT, SERVICE)
            .with_iri("urn:exec:2", ontology::HAS_PARTICIPANT, "did:key:z6MkOther")
            .with_iri("urn:exec:1", ontology::HAS_STATUS, &execution_status("InExecution"))
            .with_iri("urn:exec:2", ontology::HAS_STATUS, &execution_status("InExecution"))
            .with_iri("urn:exec:1", ontology::CONSUMES, SERVICE)
            .with_iri("urn:exec:1", ontology::CONSUMES, "urn:dataset:1")
            .with_iri("urn:pub:1", ontology::DESCRIBES, "urn:dataset:1")
            .with_iri("urn:pub:1", ontology::SERVED_BY, SERVICE)
            .with_literal("urn:pub:1", ontology::HAS_ACCESS_URI, "https://s3.example/ds1")
            .with_iri("urn:dataset:1", ontology::HAS_GOVERNANCE, "urn:gov:1")
            .with_literal("urn:gov:1", ontology::HAS_GOVERNANCE_CODE, "https://gov.example/ds1.pl")
    }

    async fn client(store: MemoryTriplestore) -> (Arc<MemoryTriplestore>, DataverseClient) {
        let store = Arc::new(store);
        let client = DataverseClient::connect(store.clone(), store.dataverse_address())
            .await
            .unwrap();
        (store, client)
    }

    #[tokio::test]
    async fn test_connect_resolves_triplestore() {
        let (store, client) = client(store()).await;
        assert_eq!(client.triplestore(), store.triplestore_address());
        assert_eq!(store.calls(), 1);
    }

    #[tokio::test]
    async fn test_connect_unknown_dataverse() {
        let store = Arc::new(store());
        let result = DataverseClient::connect(store, "okp41unknown").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_execution_order_context_scoped_to_service() {
        let (_, client) = client(store()).await;
        let ctx = client.get_execution_order_context(ORDER, SERVICE).await.unwrap();
        assert_eq!(ctx.zone, "urn:zone:1");
        assert_eq!(ctx.executions.len(), 1);
        assert!(ctx.executions["urn:exec:1"].contains(&execution_status("InExecution")));
    }

    #[tokio::test]
    async fn test_unknown_order_not_found() {
        let (_, client) = client(store()).await;
        let result = client.get_execution_order_context("urn:order:x", SERVICE).await;
        assert!(matches!(result, Err(DataverseError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_order_without_matching_executions_keeps_zone() {
        let store = MemoryTriplestore::new()
            .with_iri(ORDER, ontology::HAS_ZONE, "urn:zone:1")
            .with_iri(ORDER, ontology::HAS_EXECUTION, "urn:exec:1")
            .with_iri("urn:exec:1", ontology::HAS_PARTICIPANT, SERVICE)
            .with_iri(ORDER, ontology::HAS_EXECUTION, "urn:exec:2")
            .with_iri("urn:exec:2", ontology::HAS_PARTICIPANT, "did:key:z6MkOther")
            .with_iri("urn:exec:2", ontology::HAS_STATUS, &execution_status("InExecution"));
        let (_, client) = client(store).await;
        let ctx = client.get_execution_order_context(ORDER, SERVICE).await.unwrap();
        assert_eq!(ctx.zone, "urn:zone:1");
        assert!(ctx.executions.is_empty());
    }

    #[tokio::test]
    async fn test_multiple_zones_ambiguous() {
        let store = store().with_iri(ORDER, ontology::HAS_ZONE, "urn:zone:2");
        let (_, client) = client(store).await;
        let result = client.get_execution_order_context(ORDER, SERVICE).await;
        assert!(matches!(result, Err(DataverseError::Ambiguous(_))));
    }

    #[tokio::test]
    async fn test_consumed_resources() {
        let (_, client) = client(store()).await;
        let resources = client
            .get_execution_consumed_resources(ORDER, "urn:exec:1")
            .await
            .unwrap();
        assert_eq!(resources.len(), 2);
        assert!(resources.contains(SERVICE));

        let none = client
            .get_execution_consumed_resources("urn:order:x", "urn:exec:1")
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_resource_publication() {
        let (_, client) = client(store()).await;
        let uri = client
            .get_resource_publication("urn:dataset:1", SERVICE)
            .await
            .unwrap();
        assert_eq!(uri, "https://s3.example/ds1");

        let other = client
            .get_resource_publication("urn:dataset:1", "did:key:z6MkOther")
            .await;
        assert!(matches!(other, Err(DataverseError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_gov_code() {
        let store = store().with_literal(
            "urn:gov:1",
            ontology::HAS_GOVERNANCE_CODE,
            "https://gov.example/other.pl",
        );
        let (_, client) = client(store).await;
        assert!(matches!(
            client.get_resource_gov_code("urn:dataset:1").await,
            Err(DataverseError::Ambiguous(_))
        ));
        assert!(matches!(
            client.get_resource_gov_code("urn:dataset:2").await,
            Err(DataverseError::NotFound(_))
        ));
    }

    #[test]
    fn test_smart_url_shape() {
        let querier = LcdContractQuerier::with_client(reqwest::Client::new(), "http://lcd:1317/");
        let url = querier.smart_url("okp41abc", &json!({"dataverse": {}}));
        assert_eq!(
            url,
            format!(
                "http://lcd:1317/cosmwasm/wasm/v1/contract/okp41abc/smart/{}",
                URL_SAFE.encode(r#"{"dataverse":{}}"#)
            )
        );
    }
}
