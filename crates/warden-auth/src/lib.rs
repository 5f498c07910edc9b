//! Warden Auth — Exchanges verified credentials for capability tokens and
//! enforces those tokens on resource access.

pub mod authenticator;
pub mod token;

pub use authenticator::Authenticator;
pub use token::{Capabilities, TokenClaims, TokenCodec, TokenError};
