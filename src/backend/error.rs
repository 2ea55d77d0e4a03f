use serde::Deserialize;
use thiserror::Error;

/// Typed error for backend requests.
///
/// Distinguishes transport failures from non-success responses so callers can
/// decide between recovery (keep the token, keep previous state) and clearing.
#[derive(Debug, Error)]
pub enum BackendError {
    /// No token is held by the session.
    #[error("not authenticated: save a GitHub token first")]
    NotAuthenticated,

    /// Network-level failure (DNS, connection, timeout).
    #[error("network error: {0}")]
    Network(String),

    /// The backend rejected the token.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The backend returned a non-success HTTP status.
    #[error("backend error {status}: {detail}")]
    Status { status: u16, detail: String },

    /// The response body did not match the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The endpoint answered but reported the operation as unsuccessful.
    #[error("{0}")]
    Rejected(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            BackendError::Decode(e.to_string())
        } else {
            BackendError::Network(e.to_string())
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

impl BackendError {
    /// Build an error from a non-success status and the raw response body.
    /// FastAPI wraps messages as `{"detail": ...}`; anything else is kept verbatim.
    pub fn from_response(status: u16, body: &str) -> Self {
        let detail = match serde_json::from_str::<ErrorBody>(body) {
            Ok(ErrorBody {
                detail: serde_json::Value::String(s),
            }) => s,
            Ok(ErrorBody { detail }) => detail.to_string(),
            Err(_) if body.trim().is_empty() => format!("HTTP {status}"),
            Err(_) => body.trim().to_string(),
        };
        if status == 401 {
            BackendError::Unauthorized(detail)
        } else {
            BackendError::Status { status, detail }
        }
    }

    /// GitHub answers listing calls on a repository without commits with an
    /// "empty repository" error. That is a valid, empty file set.
    pub fn is_empty_repository(&self) -> bool {
        match self {
            BackendError::Status { detail, .. } => {
                let detail = detail.to_lowercase();
                detail.contains("repository is empty") || detail.contains("repository empty")
            }
            _ => false,
        }
    }

    /// Transient failures leave a previously valid token in place.
    pub fn is_transient(&self) -> bool {
        match self {
            BackendError::Network(_) => true,
            BackendError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
