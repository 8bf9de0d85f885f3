use thiserror::Error;

/// Failures reported by an auth/data provider.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Backend returned {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Not authenticated")]
    NotAuthenticated,
}

impl ProviderError {
    /// Whether repeating the same idempotent request may succeed.
    ///
    /// Transport failures and query errors are transient. Credential
    /// rejections, malformed payloads and local storage faults are not.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Transport(_) => true,
            ProviderError::Http { status, .. } => !matches!(status, 401 | 403),
            ProviderError::Decode(_) | ProviderError::Storage(_) | ProviderError::NotAuthenticated => {
                false
            }
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ProviderError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            ProviderError::Http {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            ProviderError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::Decode(err.to_string())
    }
}

impl From<std::io::Error> for ProviderError {
    fn from(err: std::io::Error) -> Self {
        ProviderError::Storage(err.to_string())
    }
}

/// Profile lookup gave up without a definitive row or absence.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("profile lookup for {subject_id} failed after {attempts} attempt(s): {last_error}")]
pub struct ResolutionFailure {
    pub subject_id: String,
    pub attempts: u32,
    pub last_error: ProviderError,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("Session error: {0}")]
    SessionRetrieval(ProviderError),

    #[error("Failed to load user profile. Please sign in again. ({0})")]
    ResolutionFailure(#[from] ResolutionFailure),

    #[error("Sign-out failed: {0}")]
    SignOut(ProviderError),
}
