pub mod did_key;
pub mod encoding;
pub mod error;
pub mod hashing;
pub mod keys;
pub mod signing;

pub use did_key::DidKey;
pub use encoding::{b64url_decode, b64url_encode, multibase_decode, multibase_encode};
pub use error::CryptoError;
pub use hashing::{sha256, Hash};
pub use keys::{KeyType, PublicKey};
pub use signing::verify;
