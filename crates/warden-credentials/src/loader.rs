//! JSON-LD context document loading.
//!
//! Context documents are addressed by URL and treated as immutable, so a
//! process-wide [`CachingDocumentLoader`] can front any other loader.

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use sieve_cache::SieveCache;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::error::CredentialError;

/// A loaded context document, shared between callers.
pub type ContextDocument = Arc<Value>;

/// Default number of context documents kept in memory.
pub const DEFAULT_CONTEXT_CACHE_SIZE: usize = 64;

/// Trait for loading remote JSON-LD context documents.
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    /// Load the document published at `url`.
    async fn load(&self, url: &str) -> Result<ContextDocument, CredentialError>;
}

#[async_trait]
impl<L: DocumentLoader + ?Sized> DocumentLoader for Arc<L> {
    async fn load(&self, url: &str) -> Result<ContextDocument, CredentialError> {
        (**self).load(url).await
    }
}

/// Serves documents from an in-memory map, never touching the network.
#[derive(Default)]
pub struct StaticDocumentLoader {
    documents: DashMap<String, ContextDocument>,
}

impl StaticDocumentLoader {
    /// Create an empty loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a document, builder style.
    pub fn with_document(self, url: impl Into<String>, document: Value) -> Self {
        self.insert(url, document);
        self
    }

    /// Register a document.
    pub fn insert(&self, url: impl Into<String>, document: Value) {
        self.documents.insert(url.into(), Arc::new(document));
    }

    /// Number of registered documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Look up a registered document.
    pub fn get(&self, url: &str) -> Result<ContextDocument, CredentialError> {
        self.documents
            .get(url)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| CredentialError::ContextLoad {
                url: url.to_string(),
                reason: "unknown document".into(),
            })
    }
}

#[async_trait]
impl DocumentLoader for StaticDocumentLoader {
    async fn load(&self, url: &str) -> Result<ContextDocument, CredentialError> {
        self.get(url)
    }
}

/// Fetches documents over HTTP(S).
#[derive(Clone)]
pub struct HttpDocumentLoader {
    client: reqwest::Client,
}

impl HttpDocumentLoader {
    /// Create a loader whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, CredentialError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CredentialError::ContextLoad {
                url: String::new(),
                reason: format!("couldn't build http client: {e}"),
            })?;
        Ok(Self { client })
    }

    /// Create a loader over an existing client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DocumentLoader for HttpDocumentLoader {
    async fn load(&self, url: &str) -> Result<ContextDocument, CredentialError> {
        let load_err = |reason: String| CredentialError::ContextLoad {
            url: url.to_string(),
            reason,
        };

        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(load_err("only http(s) contexts can be fetched".into()));
        }

        tracing::debug!(url, "fetching JSON-LD context");
        let document: Value = self
            .client
            .get(url)
            .header(
                reqwest::header::ACCEPT,
                "application/ld+json, application/json",
            )
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| load_err(e.to_string()))?
            .json()
            .await
            .map_err(|e| load_err(format!("invalid JSON: {e}")))?;

        Ok(Arc::new(document))
    }
}

/// Bounded cache in front of another loader, keyed by document URL.
pub struct CachingDocumentLoader<L> {
    inner: L,
    cache: Arc<Mutex<SieveCache<String, ContextDocument>>>,
}

impl<L: DocumentLoader> CachingDocumentLoader<L> {
    /// Wrap `inner` with a cache holding at most `capacity` documents.
    pub fn new(inner: L, capacity: usize) -> Result<Self, CredentialError> {
        let cache = SieveCache::new(capacity).map_err(|e| CredentialError::ContextLoad {
            url: String::new(),
            reason: format!("couldn't initialize context cache: {e}"),
        })?;
        Ok(Self {
            inner,
            cache: Arc::new(Mutex::new(cache)),
        })
    }

    /// Number of cached documents.
    pub async fn cached(&self) -> usize {
        self.cache.lock().await.len()
    }
}

#[async_trait]
impl<L: DocumentLoader> DocumentLoader for CachingDocumentLoader<L> {
    async fn load(&self, url: &str) -> Result<ContextDocument, CredentialError> {
        let key = url.to_string();
        if let Some(document) = self.cache.lock().await.get(&key) {
            return Ok(Arc::clone(document));
        }

        // Not held across the fetch: concurrent misses may load twice.
        let document = self.inner.load(url).await?;
        self.cache.lock().await.insert(key, Arc::clone(&document));
        Ok(document)
    }
}
