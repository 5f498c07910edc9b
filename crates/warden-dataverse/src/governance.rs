use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use warden_core::{GovernanceAction, GovernanceExecAnswer};

use crate::client::DataverseClient;
use crate::error::DataverseError;
use crate::program::{gov_check_program, unquote_atom, GOV_CHECK_QUERY};

/// Answer of a logic module `Ask` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicAnswer {
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub variables: Vec<String>,
    #[serde(default)]
    pub results: Vec<AnswerResult>,
}

/// One solution of a query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub substitutions: Vec<Substitution>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Substitution {
    pub variable: String,
    pub expression: String,
}

impl AnswerResult {
    fn binding(&self, variable: &str) -> Option<&str> {
        self.substitutions
            .iter()
            .find(|s| s.variable == variable)
            .map(|s| s.expression.as_str())
    }
}

/// Trait for submitting programs to a remote logic inference service.
#[async_trait]
pub trait LogicQuerier: Send + Sync {
    /// Run `query` against `program`.
    async fn ask(&self, program: &str, query: &str) -> Result<LogicAnswer, DataverseError>;
}

/// Asks the logic module through the chain REST (LCD) gateway.
#[derive(Clone)]
pub struct LcdLogicQuerier {
    client: reqwest::Client,
    endpoint: String,
}

impl LcdLogicQuerier {
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
}

#[derive(Serialize)]
struct AskRequest<'a> {
    program: &'a str,
    query: &'a str,
}

#[derive(Deserialize)]
struct AskResponse {
    answer: Option<LogicAnswer>,
}

#[async_trait]
impl LogicQuerier for LcdLogicQuerier {
    async fn ask(&self, program: &str, query: &str) -> Result<LogicAnswer, DataverseError> {
        let response: AskResponse = self
            .client
            .post(format!("{}/okp4/okp4d/logic/ask", self.endpoint))
            .json(&AskRequest { program, query })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.answer.unwrap_or_default())
    }
}

/// Evaluates the governance attached to dataverse resources.
pub struct GovernanceEvaluator {
    dataverse: Arc<DataverseClient>,
    logic: Arc<dyn LogicQuerier>,
}

impl GovernanceEvaluator {
    pub fn new(dataverse: Arc<DataverseClient>, logic: Arc<dyn LogicQuerier>) -> Self {
        Self { dataverse, logic }
    }

    /// Decide whether `subject` may perform `action` on `resource` in `zone`.
    pub async fn evaluate(
        &self,
        resource: &str,
        action: GovernanceAction,
        subject: &str,
        zone: &str,
    ) -> Result<GovernanceExecAnswer, DataverseError> {
        let gov_code = self.dataverse.get_resource_gov_code(resource).await?;
        let program = gov_check_program(&gov_code, action, subject, zone);
        let answer = self.logic.ask(&program, GOV_CHECK_QUERY).await?;
        let decision = interpret(&answer)?;

        tracing::debug!(
            resource,
            %action,
            result = %decision.result,
            evidence = %decision.evidence,
            "governance evaluated"
        );
        Ok(decision)
    }
}

/// Read the decision out of a `tell(Result, Evidence)` answer.
///
/// Exactly one solution binding both variables is accepted.
pub fn interpret(answer: &LogicAnswer) -> Result<GovernanceExecAnswer, DataverseError> {
    let solution = match answer.results.as_slice() {
        [] => {
            return Err(DataverseError::NotFound(
                "governance program gave no decision".into(),
            ))
        }
        [single] if !answer.has_more => single,
        _ => {
            return Err(DataverseError::Ambiguous(
                "governance program gave several decisions".into(),
            ))
        }
    };
    if let Some(error) = &solution.error {
        return Err(DataverseError::Logic(error.clone()));
    }

    let bound = |variable: &str| {
        solution
            .binding(variable)
            .ok_or_else(|| DataverseError::Decode(format!("unbound variable: {variable}")))
    };
    Ok(GovernanceExecAnswer {
        result: unquote_atom(bound("Result")?),
        evidence: bound("Evidence")?.to_string(),
    })
}
