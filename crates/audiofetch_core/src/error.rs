use thiserror::Error;

/// Failures surfaced to the user. None of them is fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("network failure: {0}")]
    NetworkFailure(String),
    #[error("rate limited by server")]
    RateLimited,
    #[error("credential rejected")]
    InvalidCredential,
    #[error("server rejected request with status {status}")]
    ServerRejected { status: u16, detail: Option<String> },
}

impl ClientError {
    /// Classifies a non-2xx response to a mutating request.
    pub fn from_status(status: u16, detail: Option<String>) -> Self {
        match status {
            429 => ClientError::RateLimited,
            _ => ClientError::ServerRejected { status, detail },
        }
    }

    /// Server-supplied detail text when present, `fallback` otherwise.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ClientError::RateLimited => {
                "Rate limit exceeded. Please wait a minute before trying again.".to_string()
            }
            ClientError::InvalidCredential => "Invalid password".to_string(),
            ClientError::ServerRejected {
                detail: Some(detail),
                ..
            } if !detail.trim().is_empty() => detail.clone(),
            ClientError::ServerRejected { .. } | ClientError::NetworkFailure(_) => {
                fallback.to_string()
            }
        }
    }
}
