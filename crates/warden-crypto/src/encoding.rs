use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use crate::error::CryptoError;

/// Multibase prefix for base58btc.
const BASE58BTC: char = 'z';

/// Decode a base58btc multibase string (`z…`).
pub fn multibase_decode(value: &str) -> Result<Vec<u8>, CryptoError> {
    let encoded = value.strip_prefix(BASE58BTC).ok_or_else(|| {
        CryptoError::InvalidEncoding(format!(
            "expected base58btc multibase prefix '{BASE58BTC}'"
        ))
    })?;
    bs58::decode(encoded)
        .into_vec()
        .map_err(|e| CryptoError::InvalidEncoding(format!("invalid base58: {}", e)))
}

/// Encode bytes as a base58btc multibase string.
pub fn multibase_encode(bytes: &[u8]) -> String {
    format!("{BASE58BTC}{}", bs58::encode(bytes).into_string())
}

/// Decode unpadded base64url, as used in JWS segments.
pub fn b64url_decode(value: &str) -> Result<Vec<u8>, CryptoError> {
    URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|e| CryptoError::InvalidEncoding(format!("invalid base64url: {}", e)))
}

/// Encode bytes as unpadded base64url.
pub fn b64url_encode(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}
