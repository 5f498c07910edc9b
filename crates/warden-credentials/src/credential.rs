use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::error::CredentialError;

/// Base context of the W3C Verifiable Credentials data model v1.
pub const CREDENTIALS_V1_CONTEXT: &str = "https://www.w3.org/2018/credentials/v1";
/// Base context of the W3C Verifiable Credentials data model v2.
pub const CREDENTIALS_V2_CONTEXT: &str = "https://www.w3.org/ns/credentials/v2";

const VC_TYPE: &str = "VerifiableCredential";

/// A linked-data verifiable credential, kept as its JSON document.
///
/// Construction checks the credential shape; proof and claim checks are done
/// by the accessors and by [`crate::CredentialVerifier`].
#[derive(Debug, Clone)]
pub struct VerifiableCredential {
    document: Map<String, Value>,
}

impl VerifiableCredential {
    /// Parse raw credential bytes.
    pub fn from_slice(raw: &[u8]) -> Result<Self, CredentialError> {
        let value: Value = serde_json::from_slice(raw)
            .map_err(|e| CredentialError::Malformed(format!("invalid JSON: {e}")))?;
        Self::from_value(value)
    }

    /// Wrap a JSON document, checking the credential shape.
    pub fn from_value(value: Value) -> Result<Self, CredentialError> {
        let Value::Object(document) = value else {
            return Err(CredentialError::Malformed(
                "credential must be a JSON object".into(),
            ));
        };
        let vc = Self { document };
        vc.check_shape()?;
        Ok(vc)
    }

    fn check_shape(&self) -> Result<(), CredentialError> {
        let base = match self.context() {
            Value::Array(items) => items.first(),
            single => Some(single),
        };
        match base.and_then(Value::as_str) {
            Some(CREDENTIALS_V1_CONTEXT) | Some(CREDENTIALS_V2_CONTEXT) => {}
            _ => {
                return Err(CredentialError::Malformed(
                    "first @context entry must be the verifiable credentials context".into(),
                ))
            }
        }

        let is_vc = match self.document.get("type") {
            Some(Value::String(t)) => t == VC_TYPE,
            Some(Value::Array(types)) => types.iter().any(|t| t.as_str() == Some(VC_TYPE)),
            _ => false,
        };
        if !is_vc {
            return Err(CredentialError::Malformed(format!(
                "type must include {VC_TYPE}"
            )));
        }

        self.issuer()?;
        if !self.document.contains_key("credentialSubject") {
            return Err(CredentialError::Malformed(
                "missing credentialSubject".into(),
            ));
        }
        Ok(())
    }

    /// The JSON document.
    pub fn document(&self) -> &Map<String, Value> {
        &self.document
    }

    /// The `@context` value (null when absent).
    pub fn context(&self) -> &Value {
        self.document.get("@context").unwrap_or(&Value::Null)
    }

    /// The issuer ID: either the `issuer` string or `issuer.id`.
    pub fn issuer(&self) -> Result<&str, CredentialError> {
        match self.document.get("issuer") {
            Some(Value::String(id)) => Ok(id),
            Some(Value::Object(issuer)) => issuer
                .get("id")
                .and_then(Value::as_str)
                .ok_or_else(|| CredentialError::Malformed("issuer object has no id".into())),
            _ => Err(CredentialError::Malformed("missing issuer".into())),
        }
    }

    /// The expiry instant, from `expirationDate` (v1) or `validUntil` (v2).
    pub fn expiration(&self) -> Result<Option<DateTime<Utc>>, CredentialError> {
        let raw = self
            .document
            .get("expirationDate")
            .or_else(|| self.document.get("validUntil"));
        match raw {
            None => Ok(None),
            Some(Value::String(s)) => DateTime::parse_from_rfc3339(s)
                .map(|dt| Some(dt.with_timezone(&Utc)))
                .map_err(|e| CredentialError::Malformed(format!("invalid expiration date: {e}"))),
            Some(_) => Err(CredentialError::Malformed(
                "expiration date must be a string".into(),
            )),
        }
    }

    /// Whether the credential has expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> Result<bool, CredentialError> {
        Ok(self.expiration()?.is_some_and(|exp| now >= exp))
    }

    /// The single embedded proof.
    pub fn proof(&self) -> Result<&Map<String, Value>, CredentialError> {
        match self.document.get("proof") {
            None | Some(Value::Null) => Err(CredentialError::MissingProof),
            Some(Value::Object(proof)) => Ok(proof),
            Some(Value::Array(proofs)) => match proofs.as_slice() {
                [] => Err(CredentialError::MissingProof),
                [Value::Object(proof)] => Ok(proof),
                [_] => Err(CredentialError::InvalidProof("proof must be an object".into())),
                _ => Err(CredentialError::InvalidProof(format!(
                    "expected a single proof, got {}",
                    proofs.len()
                ))),
            },
            Some(_) => Err(CredentialError::InvalidProof("proof must be an object".into())),
        }
    }

    /// The credential without its proof, as signed by the issuer.
    pub fn unsecured_document(&self) -> Value {
        let mut document = self.document.clone();
        document.remove("proof");
        Value::Object(document)
    }

    /// The single subject claim.
    pub fn subject(&self) -> Result<&Map<String, Value>, CredentialError> {
        let single = match self.document.get("credentialSubject") {
            Some(Value::Array(claims)) if claims.len() == 1 => &claims[0],
            Some(Value::Array(claims)) => {
                return Err(CredentialError::InvalidClaim(format!(
                    "expected a single vc claim, got {}",
                    claims.len()
                )))
            }
            Some(claim) => claim,
            None => return Err(CredentialError::Malformed("missing credentialSubject".into())),
        };
        single
            .as_object()
            .ok_or_else(|| CredentialError::InvalidClaim("malformed vc subject".into()))
    }
}

/// Read a custom string field of a subject claim.
pub fn custom_str_claim<'a>(
    claim: &'a Map<String, Value>,
    name: &str,
) -> Result<&'a str, CredentialError> {
    match claim.get(name) {
        None => Err(CredentialError::InvalidClaim(format!(
            "malformed vc claim: '{name}' missing"
        ))),
        Some(Value::String(value)) => Ok(value),
        Some(_) => Err(CredentialError::InvalidClaim(format!(
            "malformed vc claim: expected '{name}' to be a string"
        ))),
    }
}
