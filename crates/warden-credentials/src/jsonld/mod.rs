//! Strict JSON-LD processing of credentials.
//!
//! Documents are converted to RDF datasets for canonicalization. Every
//! property and type must expand to an IRI under the document's contexts; a
//! term that expansion would silently drop is rejected instead.

mod context;
mod rdf;

use oxrdf::Dataset;
use serde_json::Value;
use std::collections::HashMap;

use crate::error::CredentialError;
use crate::loader::{ContextDocument, DocumentLoader};

use self::rdf::RdfWriter;

/// Upper bound on remote contexts pulled in by one document.
const MAX_REMOTE_CONTEXTS: usize = 16;

/// The remote contexts a document references, fetched ahead of expansion.
#[derive(Debug, Default, Clone)]
pub struct Contexts {
    documents: HashMap<String, ContextDocument>,
}

impl Contexts {
    /// Fetch every context `document` references, directly or through
    /// other contexts.
    pub async fn load(document: &Value, loader: &dyn DocumentLoader) -> Result<Self, CredentialError> {
        let mut contexts = Self::default();
        let mut pending = Vec::new();
        embedded_refs(document, &mut pending);

        while let Some(url) = pending.pop() {
            if contexts.documents.contains_key(&url) {
                continue;
            }
            contexts.check_capacity()?;
            let fetched = loader.load(&url).await?;
            contexts.insert(url, fetched, &mut pending)?;
        }
        Ok(contexts)
    }

    /// Like [`Contexts::load`], over a synchronous fetch function.
    pub fn load_with<F>(document: &Value, mut fetch: F) -> Result<Self, CredentialError>
    where
        F: FnMut(&str) -> Result<ContextDocument, CredentialError>,
    {
        let mut contexts = Self::default();
        let mut pending = Vec::new();
        embedded_refs(document, &mut pending);

        while let Some(url) = pending.pop() {
            if contexts.documents.contains_key(&url) {
                continue;
            }
            contexts.check_capacity()?;
            let fetched = fetch(&url)?;
            contexts.insert(url, fetched, &mut pending)?;
        }
        Ok(contexts)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn check_capacity(&self) -> Result<(), CredentialError> {
        if self.documents.len() >= MAX_REMOTE_CONTEXTS {
            return Err(CredentialError::Malformed(format!(
                "more than {MAX_REMOTE_CONTEXTS} remote contexts"
            )));
        }
        Ok(())
    }

    fn insert(
        &mut self,
        url: String,
        document: ContextDocument,
        pending: &mut Vec<String>,
    ) -> Result<(), CredentialError> {
        let context = document
            .get("@context")
            .ok_or_else(|| CredentialError::ContextLoad {
                url: url.clone(),
                reason: "document has no @context".into(),
            })?;
        context_refs(context, pending);
        self.documents.insert(url, document);
        Ok(())
    }

    /// The `@context` value of a fetched document.
    pub(crate) fn context(&self, url: &str) -> Result<&Value, CredentialError> {
        self.documents
            .get(url)
            .and_then(|document| document.get("@context"))
            .ok_or_else(|| CredentialError::ContextLoad {
                url: url.to_string(),
                reason: "context was not loaded".into(),
            })
    }
}

/// Context URLs referenced by a `@context` value.
fn context_refs(context: &Value, out: &mut Vec<String>) {
    match context {
        Value::String(url) => out.push(url.clone()),
        Value::Array(items) => items.iter().for_each(|item| context_refs(item, out)),
        Value::Object(definitions) => definitions
            .values()
            .for_each(|definition| embedded_refs(definition, out)),
        _ => {}
    }
}

/// Context URLs of every `@context` member nested in `value`.
fn embedded_refs(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, member) in map {
                if key == "@context" {
                    context_refs(member, out);
                } else {
                    embedded_refs(member, out);
                }
            }
        }
        Value::Array(items) => items.iter().for_each(|item| embedded_refs(item, out)),
        _ => {}
    }
}

/// Convert a JSON-LD document to an RDF dataset.
pub fn to_rdf(document: &Value, contexts: &Contexts) -> Result<Dataset, CredentialError> {
    let mut writer = RdfWriter::new(contexts);
    writer.document(document)?;
    Ok(writer.into_dataset())
}
