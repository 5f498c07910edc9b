/// Cryptographic operation errors.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("unsupported key codec: 0x{0:x}")]
    UnsupportedCodec(u16),

    #[error("invalid DID: {0}")]
    InvalidDid(String),

    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("signature verification failed")]
    SignatureVerificationFailed,
}
