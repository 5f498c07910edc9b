use std::fmt;

use crate::error::CryptoError;

/// Multicodec code of an Ed25519 public key.
pub const ED25519_CODEC: u16 = 0xed;
/// Multicodec code of a compressed secp256k1 public key.
pub const SECP256K1_CODEC: u16 = 0xe7;

/// Signature algorithm family of a public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyType {
    Ed25519,
    Secp256k1,
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ed25519 => write!(f, "Ed25519"),
            Self::Secp256k1 => write!(f, "secp256k1"),
        }
    }
}

/// A verification key resolved from a DID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKey {
    Ed25519(ed25519_dalek::VerifyingKey),
    Secp256k1(k256::ecdsa::VerifyingKey),
}

impl PublicKey {
    /// Create an Ed25519 key from raw bytes (32 bytes).
    pub fn ed25519_from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let bytes_arr: [u8; 32] = bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
            expected: 32,
            actual: bytes.len(),
        })?;
        let key = ed25519_dalek::VerifyingKey::from_bytes(&bytes_arr)
            .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;
        Ok(Self::Ed25519(key))
    }

    /// Create a secp256k1 key from its SEC1 compressed encoding (33 bytes).
    pub fn secp256k1_from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != 33 {
            return Err(CryptoError::InvalidKeyLength {
                expected: 33,
                actual: bytes.len(),
            });
        }
        let key = k256::ecdsa::VerifyingKey::from_sec1_bytes(bytes)
            .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;
        Ok(Self::Secp256k1(key))
    }

    /// Decode a multicodec-prefixed key, as found in a `did:key` fingerprint.
    pub fn from_multicodec(bytes: &[u8]) -> Result<Self, CryptoError> {
        let (code, key) = read_codec(bytes)?;
        match code {
            ED25519_CODEC => Self::ed25519_from_bytes(key),
            SECP256K1_CODEC => Self::secp256k1_from_bytes(key),
            other => Err(CryptoError::UnsupportedCodec(other)),
        }
    }

    /// Encode as a multicodec-prefixed byte string.
    pub fn to_multicodec(&self) -> Vec<u8> {
        let (code, key) = match self {
            Self::Ed25519(k) => (ED25519_CODEC, k.as_bytes().to_vec()),
            Self::Secp256k1(k) => (SECP256K1_CODEC, k.to_encoded_point(true).as_bytes().to_vec()),
        };
        let mut out = Vec::with_capacity(key.len() + 2);
        // Both codes fit in a two-byte unsigned varint.
        out.push((code as u8) | 0x80);
        out.push((code >> 7) as u8);
        out.extend_from_slice(&key);
        out
    }

    /// Algorithm family of this key.
    pub fn key_type(&self) -> KeyType {
        match self {
            Self::Ed25519(_) => KeyType::Ed25519,
            Self::Secp256k1(_) => KeyType::Secp256k1,
        }
    }

    /// Encode the raw key as hex.
    pub fn to_hex(&self) -> String {
        match self {
            Self::Ed25519(k) => hex::encode(k.as_bytes()),
            Self::Secp256k1(k) => hex::encode(k.to_encoded_point(true).as_bytes()),
        }
    }
}

/// Split an unsigned-varint multicodec prefix from the key bytes.
fn read_codec(bytes: &[u8]) -> Result<(u16, &[u8]), CryptoError> {
    let mut code: u16 = 0;
    for (i, byte) in bytes.iter().take(2).enumerate() {
        code |= u16::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((code, &bytes[i + 1..]));
        }
    }
    Err(CryptoError::InvalidEncoding(
        "missing or oversized multicodec prefix".into(),
    ))
}

impl From<ed25519_dalek::VerifyingKey> for PublicKey {
    fn from(key: ed25519_dalek::VerifyingKey) -> Self {
        Self::Ed25519(key)
    }
}

impl From<k256::ecdsa::VerifyingKey> for PublicKey {
    fn from(key: k256::ecdsa::VerifyingKey) -> Self {
        Self::Secp256k1(key)
    }
}
