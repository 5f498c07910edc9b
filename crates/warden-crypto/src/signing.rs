use ed25519_dalek::Verifier as _;
use k256::ecdsa::signature::Verifier as _;

use crate::error::CryptoError;
use crate::keys::PublicKey;

/// Verify a raw signature over `message`.
///
/// Ed25519 signatures are 64 bytes. secp256k1 signatures are 64-byte `r || s`
/// ECDSA signatures over the SHA-256 digest of `message`, with low `s`.
pub fn verify(message: &[u8], signature: &[u8], pubkey: &PublicKey) -> Result<(), CryptoError> {
    match pubkey {
        PublicKey::Ed25519(key) => {
            let bytes: [u8; 64] = signature.try_into().map_err(|_| {
                CryptoError::InvalidSignature(format!(
                    "Ed25519 signature must be 64 bytes, got {}",
                    signature.len()
                ))
            })?;
            let sig = ed25519_dalek::Signature::from_bytes(&bytes);
            key.verify(message, &sig)
                .map_err(|_| CryptoError::SignatureVerificationFailed)
        }
        PublicKey::Secp256k1(key) => {
            let sig = k256::ecdsa::Signature::from_slice(signature)
                .map_err(|e| CryptoError::InvalidSignature(e.to_string()))?;
            key.verify(message, &sig)
                .map_err(|_| CryptoError::SignatureVerificationFailed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::Signer as _;
    use k256::ecdsa::signature::Signer as _;
    use rand::rngs::OsRng;

    fn ed25519_pair() -> (ed25519_dalek::SigningKey, PublicKey) {
        let sk = ed25519_dalek::SigningKey::generate(&mut OsRng);
        let pk = PublicKey::from(sk.verifying_key());
        (sk, pk)
    }

    fn secp256k1_pair() -> (k256::ecdsa::SigningKey, PublicKey) {
        let sk = k256::ecdsa::SigningKey::random(&mut OsRng);
        let pk = PublicKey::from(k256::ecdsa::VerifyingKey::from(&sk));
        (sk, pk)
    }

    #[test]
    fn test_ed25519_sign_verify_roundtrip() {
        let (sk, pk) = ed25519_pair();
        let sig = sk.sign(b"hello warden");
        assert!(verify(b"hello warden", &sig.to_bytes(), &pk).is_ok());
    }

    #[test]
    fn test_ed25519_wrong_message_fails() {
        let (sk, pk) = ed25519_pair();
        let sig = sk.sign(b"correct message");
        assert!(matches!(
            verify(b"wrong message", &sig.to_bytes(), &pk),
            Err(CryptoError::SignatureVerificationFailed)
        ));
    }

    #[test]
    fn test_ed25519_wrong_key_fails() {
        let (sk, _) = ed25519_pair();
        let (_, other) = ed25519_pair();
        let sig = sk.sign(b"test message");
        assert!(verify(b"test message", &sig.to_bytes(), &other).is_err());
    }

    #[test]
    fn test_ed25519_invalid_length() {
        let (_, pk) = ed25519_pair();
        assert!(matches!(
            verify(b"msg", &[0u8; 32], &pk),
            Err(CryptoError::InvalidSignature(_))
        ));
    }

    #[test]
    fn test_secp256k1_sign_verify_roundtrip() {
        let (sk, pk) = secp256k1_pair();
        let sig: k256::ecdsa::Signature = sk.sign(b"hello warden");
        assert!(verify(b"hello warden", &sig.to_bytes(), &pk).is_ok());
    }

    #[test]
    fn test_secp256k1_tampered_message_fails() {
        let (sk, pk) = secp256k1_pair();
        let sig: k256::ecdsa::Signature = sk.sign(b"original");
        assert!(verify(b"tampered", &sig.to_bytes(), &pk).is_err());
    }

    #[test]
    fn test_secp256k1_invalid_signature_bytes() {
        let (_, pk) = secp256k1_pair();
        assert!(verify(b"msg", &[0u8; 10], &pk).is_err());
    }

    #[test]
    fn test_cross_algorithm_fails() {
        let (sk, _) = ed25519_pair();
        let (_, secp) = secp256k1_pair();
        let sig = sk.sign(b"msg");
        assert!(verify(b"msg", &sig.to_bytes(), &secp).is_err());
    }
}
