use std::fmt;

/// Errors produced by the authentication and authorization protocols.
///
/// Every variant is terminal: the pipeline stops at the first error and the
/// caller decides how to report it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("verification error: {0}")]
    Verification(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("ambiguous result: {0}")]
    Ambiguous(String),

    #[error("access rejected by governance of {subject}, evidence: {evidence}")]
    GovernanceDenied { subject: String, evidence: String },

    #[error("token error: {0}")]
    Token(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("transport error: {0}")]
    Transport(String),
}

/// Coarse classification of an [`AuthError`], used for status mapping and
/// assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Verification,
    NotFound,
    Ambiguous,
    GovernanceDenied,
    Token,
    Forbidden,
    Transport,
}

impl AuthError {
    /// The kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Verification(_) => ErrorKind::Verification,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Ambiguous(_) => ErrorKind::Ambiguous,
            Self::GovernanceDenied { .. } => ErrorKind::GovernanceDenied,
            Self::Token(_) => ErrorKind::Token,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::Transport(_) => ErrorKind::Transport,
        }
    }

    /// Prefix the message with the pipeline step that produced it, keeping
    /// the kind unchanged.
    pub fn context(self, step: &str) -> Self {
        let wrap = |msg: String| format!("{step}: {msg}");
        match self {
            Self::Validation(m) => Self::Validation(wrap(m)),
            Self::Verification(m) => Self::Verification(wrap(m)),
            Self::NotFound(m) => Self::NotFound(wrap(m)),
            Self::Ambiguous(m) => Self::Ambiguous(wrap(m)),
            Self::Token(m) => Self::Token(wrap(m)),
            Self::Forbidden(m) => Self::Forbidden(wrap(m)),
            Self::Transport(m) => Self::Transport(wrap(m)),
            denied @ Self::GovernanceDenied { .. } => denied,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Validation => "validation",
            Self::Verification => "verification",
            Self::NotFound => "not_found",
            Self::Ambiguous => "ambiguous",
            Self::GovernanceDenied => "governance_denied",
            Self::Token => "token",
            Self::Forbidden => "forbidden",
            Self::Transport => "transport",
        };
        write!(f, "{}", name)
    }
}
