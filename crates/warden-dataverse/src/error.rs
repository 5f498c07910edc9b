use warden_core::AuthError;

/// Dataverse query and governance evaluation errors.
#[derive(Debug, thiserror::Error)]
pub enum DataverseError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("couldn't decode response: {0}")]
    Decode(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("ambiguous: {0}")]
    Ambiguous(String),

    #[error("logic engine error: {0}")]
    Logic(String),
}

impl From<serde_json::Error> for DataverseError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<reqwest::Error> for DataverseError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<DataverseError> for AuthError {
    fn from(err: DataverseError) -> Self {
        match err {
            DataverseError::NotFound(_) => AuthError::NotFound(err.to_string()),
            DataverseError::Ambiguous(_) => AuthError::Ambiguous(err.to_string()),
            DataverseError::Transport(_)
            | DataverseError::Decode(_)
            | DataverseError::Logic(_) => AuthError::Transport(err.to_string()),
        }
    }
}
