//! The authentication and authorization protocols.
//!
//! `authenticate` exchanges a credential for a capability token once the
//! dataverse shows the caller takes part in a running execution of its order
//! and every governance involved permits it. `authorize` only checks a token
//! against the requested URI; governance is never re-evaluated.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;

use warden_core::{AuthClaim, AuthError, AuthenticatorConfig, GovernanceAction};
use warden_credentials::{CredentialVerifier, DocumentLoader};
use warden_dataverse::{DataverseClient, DataverseError, GovernanceEvaluator, LogicQuerier};

use crate::token::{TokenClaims, TokenCodec};

/// Authenticator of one protected service.
///
/// Holds no per-call state and can be shared behind an `Arc`.
pub struct Authenticator {
    service_id: String,
    verifier: CredentialVerifier,
    dataverse: Arc<DataverseClient>,
    governance: GovernanceEvaluator,
    tokens: TokenCodec,
}

fn rejected(step: &str, err: impl Into<AuthError>) -> AuthError {
    let err = err.into().context(step);
    tracing::warn!(step, kind = %err.kind(), error = %err, "authentication rejected");
    err
}

impl Authenticator {
    pub fn new(
        config: AuthenticatorConfig,
        secret: Vec<u8>,
        loader: Arc<dyn DocumentLoader>,
        dataverse: Arc<DataverseClient>,
        logic: Arc<dyn LogicQuerier>,
    ) -> Result<Self, AuthError> {
        let tokens = TokenCodec::new(config.service_id.clone(), secret, config.token_validity())?;
        Ok(Self {
            verifier: CredentialVerifier::new(config.service_id.clone(), loader),
            governance: GovernanceEvaluator::new(Arc::clone(&dataverse), logic),
            service_id: config.service_id,
            dataverse,
            tokens,
        })
    }

    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    /// Exchange a verifiable credential for a capability token.
    pub async fn authenticate(&self, credential: &[u8]) -> Result<String, AuthError> {
        self.authenticate_at(credential, Utc::now()).await
    }

    /// Exchange a verifiable credential for a capability token as of `now`.
    pub async fn authenticate_at(
        &self,
        credential: &[u8],
        now: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let claim = self
            .verifier
            .verify_at(credential, now)
            .await
            .map_err(|e| rejected("couldn't parse VC", e))?;

        let context = self
            .dataverse
            .get_execution_order_context(&claim.for_order, &self.service_id)
            .await
            .map_err(|e| rejected("couldn't fetch execution order context", e))?;

        let executions = context.executions_in_progress();
        if executions.is_empty() {
            return Err(rejected(
                "execution order",
                AuthError::Validation(format!("order '{}' not in progress", claim.for_order)),
            ));
        }

        let mut resources = BTreeSet::new();
        for execution in executions {
            let consumed = self
                .dataverse
                .get_execution_consumed_resources(&claim.for_order, execution)
                .await
                .map_err(|e| rejected("couldn't fetch execution consumed resources", e))?;
            if consumed.contains(&self.service_id) {
                resources.extend(consumed);
            }
        }
        if resources.is_empty() {
            return Err(rejected(
                "execution order",
                AuthError::Validation("not concerned by this execution order".into()),
            ));
        }

        self.check_governance(&self.service_id, GovernanceAction::ServiceUse, &claim, &context.zone)
            .await?;

        let mut readable = BTreeSet::new();
        for resource in resources.iter().filter(|r| **r != self.service_id) {
            let uri = match self
                .dataverse
                .get_resource_publication(resource, &self.service_id)
                .await
            {
                Ok(uri) => uri,
                Err(DataverseError::NotFound(_)) => {
                    tracing::debug!(resource = %resource, "resource not published by this service");
                    continue;
                }
                Err(e) => return Err(rejected("couldn't fetch resource publication", e)),
            };
            self.check_governance(resource, GovernanceAction::DatasetRead, &claim, &context.zone)
                .await?;
            readable.insert(uri);
        }

        let token = self
            .tokens
            .issue_at(&claim.subject_id, readable.iter().cloned(), now)
            .map_err(|e| rejected("couldn't issue token", e))?;
        tracing::info!(
            subject = %claim.subject_id,
            order = %claim.for_order,
            granted = readable.len(),
            "authentication succeeded"
        );
        Ok(token)
    }

    async fn check_governance(
        &self,
        resource: &str,
        action: GovernanceAction,
        claim: &AuthClaim,
        zone: &str,
    ) -> Result<(), AuthError> {
        let answer = self
            .governance
            .evaluate(resource, action, &claim.subject_id, zone)
            .await
            .map_err(|e| rejected("couldn't exec governance", e))?;
        if answer.is_permitted() {
            return Ok(());
        }
        Err(rejected(
            "governance",
            AuthError::GovernanceDenied {
                subject: resource.to_string(),
                evidence: answer.evidence,
            },
        ))
    }

    /// Check that `token` grants read access to `uri`.
    pub fn authorize(&self, token: &str, uri: &str) -> Result<TokenClaims, AuthError> {
        self.authorize_at(token, uri, Utc::now())
    }

    /// Check that `token` grants read access to `uri` as of `now`.
    pub fn authorize_at(
        &self,
        token: &str,
        uri: &str,
        now: DateTime<Utc>,
    ) -> Result<TokenClaims, AuthError> {
        let claims = self.tokens.verify_at(token, now)?;
        if !claims.can_read(uri) {
            tracing::debug!(subject = %claims.sub, uri, "access to requested resource unauthorized");
            return Err(AuthError::Forbidden(format!(
                "access to '{uri}' unauthorized"
            )));
        }
        Ok(claims)
    }
}
