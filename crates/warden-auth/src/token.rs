//! Capability tokens: HS256 JWTs scoping what a service may read.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;
use zeroize::Zeroizing;

use warden_core::AuthError;

/// Token issuance and verification errors.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("invalid signing secret: {0}")]
    InvalidSecret(String),

    #[error("couldn't sign token: {0}")]
    Encode(String),

    #[error("invalid token: {0}")]
    Invalid(String),

    #[error("token expired")]
    Expired,

    #[error("token not yet valid")]
    NotYetValid,
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        AuthError::Token(err.to_string())
    }
}

/// Resources a token grants access to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// URIs the bearer may read.
    #[serde(default)]
    pub read: BTreeSet<String>,
}

/// Claims carried by a capability token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub jti: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
    pub can: Capabilities,
}

impl TokenClaims {
    /// Whether `uri` is one of the granted read URIs.
    pub fn can_read(&self, uri: &str) -> bool {
        self.can.read.contains(uri)
    }
}

/// Issues and verifies the capability tokens of one service.
pub struct TokenCodec {
    issuer: String,
    secret: Zeroizing<Vec<u8>>,
    validity: Duration,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("issuer", &self.issuer)
            .field("secret", &"<redacted>")
            .field("validity", &self.validity)
            .finish()
    }
}

impl TokenCodec {
    pub fn new(
        issuer: impl Into<String>,
        secret: impl Into<Vec<u8>>,
        validity: Duration,
    ) -> Result<Self, TokenError> {
        let secret = Zeroizing::new(secret.into());
        if secret.is_empty() {
            return Err(TokenError::InvalidSecret("secret is empty".into()));
        }
        Ok(Self {
            issuer: issuer.into(),
            secret,
            validity,
        })
    }

    /// Create a codec from a hex-encoded secret.
    pub fn from_hex(
        issuer: impl Into<String>,
        secret_hex: &str,
        validity: Duration,
    ) -> Result<Self, TokenError> {
        let secret = Zeroizing::new(
            hex::decode(secret_hex.trim())
                .map_err(|e| TokenError::InvalidSecret(format!("not hex: {e}")))?,
        );
        Self::new(issuer, secret.to_vec(), validity)
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn validity(&self) -> Duration {
        self.validity
    }

    /// Issue a token granting `subject` read access to `readable`.
    pub fn issue<I>(&self, subject: &str, readable: I) -> Result<String, TokenError>
    where
        I: IntoIterator<Item = String>,
    {
        self.issue_at(subject, readable, Utc::now())
    }

    /// Issue a token as of `now`.
    pub fn issue_at<I>(
        &self,
        subject: &str,
        readable: I,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError>
    where
        I: IntoIterator<Item = String>,
    {
        let iat = now.timestamp();
        let validity = i64::try_from(self.validity.as_secs())
            .map_err(|_| TokenError::Encode("validity window too large".into()))?;
        let claims = TokenClaims {
            iss: self.issuer.clone(),
            sub: subject.to_string(),
            aud: subject.to_string(),
            jti: Uuid::now_v7().to_string(),
            iat,
            nbf: iat,
            exp: iat.saturating_add(validity),
            can: Capabilities {
                read: readable.into_iter().collect(),
            },
        };

        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&self.secret),
        )
        .map_err(|e| TokenError::Encode(e.to_string()))
    }

    /// Verify a token's signature, issuer and time bounds.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify a token as of `now`.
    ///
    /// A token is expired from `exp` on and not valid before `nbf`.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "nbf", "iss", "sub", "aud"]);

        let claims = jsonwebtoken::decode::<TokenClaims>(
            token,
            &DecodingKey::from_secret(&self.secret),
            &validation,
        )
        .map_err(|e| TokenError::Invalid(e.to_string()))?
        .claims;

        let now = now.timestamp();
        if now >= claims.exp {
            return Err(TokenError::Expired);
        }
        if now < claims.nbf {
            return Err(TokenError::NotYetValid);
        }
        Ok(claims)
    }
}
