use chrono::{DateTime, Utc};
use std::sync::Arc;

use warden_core::AuthClaim;

use crate::credential::{custom_str_claim, VerifiableCredential};
use crate::error::CredentialError;
use crate::jsonld::Contexts;
use crate::loader::DocumentLoader;
use crate::proof::verify_proof;

/// Verifies authentication credentials addressed to one service.
pub struct CredentialVerifier {
    service_id: String,
    loader: Arc<dyn DocumentLoader>,
}

impl CredentialVerifier {
    pub fn new(service_id: impl Into<String>, loader: Arc<dyn DocumentLoader>) -> Self {
        Self {
            service_id: service_id.into(),
            loader,
        }
    }

    /// The service credentials must target.
    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    /// Verify a raw credential and extract its claim.
    pub async fn verify(&self, raw: &[u8]) -> Result<AuthClaim, CredentialError> {
        self.verify_at(raw, Utc::now()).await
    }

    /// Verify a raw credential as of `now`.
    pub async fn verify_at(
        &self,
        raw: &[u8],
        now: DateTime<Utc>,
    ) -> Result<AuthClaim, CredentialError> {
        let vc = VerifiableCredential::from_slice(raw)?;

        let document = serde_json::Value::Object(vc.document().clone());
        let contexts = Contexts::load(&document, self.loader.as_ref()).await?;
        tracing::trace!(contexts = contexts.len(), "credential contexts loaded");

        let signer = verify_proof(&vc, &contexts)?;
        tracing::debug!(signer = %signer, "credential proof verified");

        if vc.is_expired_at(now)? {
            return Err(CredentialError::Expired);
        }

        let subject = vc.subject()?;
        let subject_id = subject
            .get("id")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| CredentialError::InvalidClaim("vc claim has no id".into()))?;
        let claim = AuthClaim {
            subject_id: subject_id.to_string(),
            target_service: custom_str_claim(subject, "toService")?.to_string(),
            for_order: custom_str_claim(subject, "forOrder")?.to_string(),
        };

        if claim.target_service != self.service_id {
            return Err(CredentialError::InvalidClaim(format!(
                "auth claim doesn't target us, but service: {}",
                claim.target_service
            )));
        }
        if vc.issuer()? != claim.subject_id {
            return Err(CredentialError::InvalidClaim(
                "auth claim subject different from issuer".into(),
            ));
        }

        tracing::info!(
            subject = %claim.subject_id,
            order = %claim.for_order,
            "credential verified"
        );
        Ok(claim)
    }
}
