//! Warden Credentials — Verification of linked-data verifiable credentials
//! presented for authentication.

pub mod canonical;
pub mod credential;
pub mod error;
pub mod jsonld;
pub mod loader;
pub mod proof;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;
pub mod verifier;

pub use credential::VerifiableCredential;
pub use error::CredentialError;
pub use loader::{
    CachingDocumentLoader, ContextDocument, DocumentLoader, HttpDocumentLoader,
    StaticDocumentLoader,
};
pub use proof::ProofSuite;
pub use verifier::CredentialVerifier;
