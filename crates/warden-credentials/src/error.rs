use warden_core::AuthError;

/// Credential verification errors.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("malformed credential: {0}")]
    Malformed(String),

    #[error("invalid credential claim: {0}")]
    InvalidClaim(String),

    #[error("undefined JSON-LD term: {0}")]
    UndefinedTerm(String),

    #[error("couldn't canonicalize document: {0}")]
    Canonicalization(String),

    #[error("missing verifiable credential proof")]
    MissingProof,

    #[error("invalid proof: {0}")]
    InvalidProof(String),

    #[error("unsupported proof type: {0}")]
    UnsupportedProof(String),

    #[error("verifiable credential expired")]
    Expired,

    #[error("couldn't load context '{url}': {reason}")]
    ContextLoad { url: String, reason: String },

    #[error("crypto error: {0}")]
    Crypto(#[from] warden_crypto::CryptoError),
}

impl From<CredentialError> for AuthError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::Malformed(_)
            | CredentialError::InvalidClaim(_)
            | CredentialError::UndefinedTerm(_)
            | CredentialError::Canonicalization(_) => AuthError::Validation(err.to_string()),
            CredentialError::ContextLoad { .. } => AuthError::Transport(err.to_string()),
            CredentialError::MissingProof
            | CredentialError::InvalidProof(_)
            | CredentialError::UnsupportedProof(_)
            | CredentialError::Expired
            | CredentialError::Crypto(_) => AuthError::Verification(err.to_string()),
        }
    }
}
