//! `did:key` resolution.
//!
//! A `did:key` carries its public key in the method-specific identifier: a
//! base58btc multibase string over a multicodec-prefixed key.

use std::fmt;
use std::str::FromStr;

use crate::encoding::{multibase_decode, multibase_encode};
use crate::error::CryptoError;
use crate::keys::PublicKey;

const DID_KEY_PREFIX: &str = "did:key:";

/// A parsed `did:key` together with the key it encodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DidKey {
    fingerprint: String,
    public_key: PublicKey,
}

impl DidKey {
    /// Build the `did:key` of a public key.
    pub fn from_public_key(public_key: PublicKey) -> Self {
        let fingerprint = multibase_encode(&public_key.to_multicodec());
        Self {
            fingerprint,
            public_key,
        }
    }

    /// The multibase fingerprint (method-specific identifier).
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// The key encoded in the DID.
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// The conventional verification method of this DID:
    /// `did:key:<fingerprint>#<fingerprint>`.
    pub fn verification_method(&self) -> String {
        format!("{}#{}", self, self.fingerprint)
    }

    /// Resolve the key referenced by a verification method URL.
    ///
    /// The method must belong to `controller` and its fragment must be the
    /// DID's own fingerprint.
    pub fn resolve_verification_method(
        controller: &str,
        verification_method: &str,
    ) -> Result<Self, CryptoError> {
        let (did, fragment) = verification_method.split_once('#').ok_or_else(|| {
            CryptoError::InvalidDid(format!(
                "verification method '{verification_method}' has no fragment"
            ))
        })?;
        if did != controller {
            return Err(CryptoError::InvalidDid(format!(
                "verification method '{verification_method}' is not controlled by '{controller}'"
            )));
        }
        let did_key: DidKey = did.parse()?;
        if did_key.fingerprint != fragment {
            return Err(CryptoError::InvalidDid(format!(
                "verification method fragment '#{fragment}' does not match the key fingerprint"
            )));
        }
        Ok(did_key)
    }
}

impl FromStr for DidKey {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fingerprint = s.strip_prefix(DID_KEY_PREFIX).ok_or_else(|| {
            CryptoError::InvalidDid(format!("expected a '{DID_KEY_PREFIX}' DID, got: {s}"))
        })?;
        if fingerprint.is_empty() || fingerprint.contains(':') {
            return Err(CryptoError::InvalidDid(format!(
                "malformed did:key identifier: {s}"
            )));
        }
        let bytes = multibase_decode(fingerprint)?;
        let public_key = PublicKey::from_multicodec(&bytes)?;
        Ok(Self {
            fingerprint: fingerprint.to_string(),
            public_key,
        })
    }
}

impl fmt::Display for DidKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", DID_KEY_PREFIX, self.fingerprint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeyType;
    use rand::rngs::OsRng;

    #[test]
    fn test_parse_known_ed25519_did() {
        // Test vector published with the did:key method.
        let did: DidKey = "did:key:z6MkhaXgBZDvotDkL5257faiztiGiC2QtKLGpbnnEGta2doK"
            .parse()
            .unwrap();
        assert_eq!(did.public_key().key_type(), KeyType::Ed25519);
        assert_eq!(
            did.fingerprint(),
            "z6MkhaXgBZDvotDkL5257faiztiGiC2QtKLGpbnnEGta2doK"
        );
    }

    #[test]
    fn test_display_roundtrip() {
        let sk = ed25519_dalek::SigningKey::generate(&mut OsRng);
        let did = DidKey::from_public_key(sk.verifying_key().into());
        let text = did.to_string();
        assert!(text.starts_with("did:key:z6Mk"));
        assert_eq!(text.parse::<DidKey>().unwrap(), did);
    }

    #[test]
    fn test_secp256k1_did_prefix() {
        let sk = k256::ecdsa::SigningKey::random(&mut OsRng);
        let did = DidKey::from_public_key(k256::ecdsa::VerifyingKey::from(&sk).into());
        assert!(did.to_string().starts_with("did:key:zQ3s"));
    }

    #[test]
    fn test_reject_other_methods() {
        assert!("did:web:example.com".parse::<DidKey>().is_err());
        assert!("did:key:".parse::<DidKey>().is_err());
        assert!("did:key:z6Mk:extra".parse::<DidKey>().is_err());
    }

    #[test]
    fn test_resolve_verification_method() {
        let sk = ed25519_dalek::SigningKey::generate(&mut OsRng);
        let did = DidKey::from_public_key(sk.verifying_key().into());
        let resolved =
            DidKey::resolve_verification_method(&did.to_string(), &did.verification_method())
                .unwrap();
        assert_eq!(resolved, did);
    }

    #[test]
    fn test_resolve_verification_method_wrong_controller() {
        let a = DidKey::from_public_key(ed25519_dalek::SigningKey::generate(&mut OsRng).verifying_key().into());
        let b = DidKey::from_public_key(ed25519_dalek::SigningKey::generate(&mut OsRng).verifying_key().into());
        let result = DidKey::resolve_verification_method(&a.to_string(), &b.verification_method());
        assert!(matches!(result, Err(CryptoError::InvalidDid(_))));
    }

    #[test]
    fn test_resolve_verification_method_wrong_fragment() {
        let did = DidKey::from_public_key(ed25519_dalek::SigningKey::generate(&mut OsRng).verifying_key().into());
        let vm = format!("{}#keys-1", did);
        assert!(DidKey::resolve_verification_method(&did.to_string(), &vm).is_err());
        assert!(DidKey::resolve_verification_method(&did.to_string(), &did.to_string()).is_err());
    }
}
