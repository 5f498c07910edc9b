//! RDF dataset canonicalization (URDNA2015) of JSON-LD documents.
//!
//! Documents that describe the same graph canonicalize to the same N-Quads,
//! whatever their JSON shape, member order or blank node labels.

use serde_json::Value;

use warden_crypto::{sha256, Hash};

use crate::error::CredentialError;
use crate::jsonld::{self, Contexts};

/// Canonical N-Quads of `document`, one sorted line per quad.
pub fn canonical_nquads(document: &Value, contexts: &Contexts) -> Result<String, CredentialError> {
    let dataset = jsonld::to_rdf(document, contexts)?;
    rdf_canon::canonicalize(&dataset).map_err(|e| CredentialError::Canonicalization(e.to_string()))
}

/// SHA-256 of the canonical N-Quads of `document`.
pub fn canonical_hash(document: &Value, contexts: &Contexts) -> Result<Hash, CredentialError> {
    Ok(sha256(canonical_nquads(document, contexts)?.as_bytes()))
}
