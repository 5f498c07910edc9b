//! Warden Core — Fundamental types, errors, and configuration shared by the
//! Warden access gateway crates.

pub mod config;
pub mod error;
pub mod types;

pub use config::{AuthenticatorConfig, DEFAULT_TOKEN_VALIDITY_SECS};
pub use error::{AuthError, ErrorKind};
pub use types::{
    AuthClaim, ExecutionOrderContext, ExecutionStatus, GovernanceAction, GovernanceExecAnswer,
    PERMITTED,
};
