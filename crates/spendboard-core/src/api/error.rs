use thiserror::Error;

/// Failure talking to the expense backend.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Forbidden by the server: {0}")]
    AccessDenied(String),

    #[error("Credentials or session token rejected")]
    Unauthorized,

    #[error("No such endpoint: {0}")]
    NotFound(String),

    #[error("Too many requests, slow down")]
    RateLimited,

    #[error("Request rejected: {0}")]
    BadRequest(String),

    #[error("Backend failed: {0}")]
    ServerError(String),

    #[error("Could not reach the backend: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),
}

/// Response bodies longer than this are cut before they reach an error
const MAX_BODY_IN_ERROR: usize = 500;

impl ApiError {
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_BODY_IN_ERROR {
            return body.to_string();
        }
        let mut end = MAX_BODY_IN_ERROR;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            400 | 422 => ApiError::BadRequest(truncated),
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(truncated),
            404 => ApiError::NotFound(truncated),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(truncated),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }

    /// Short message suitable for showing to the user
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Unauthorized => "Email or password is incorrect, or the session has ended".to_string(),
            ApiError::NetworkError(e) if e.is_timeout() => {
                "The backend took too long to answer. Try again.".to_string()
            }
            ApiError::NetworkError(_) => {
                "Could not reach the backend. Check the API URL and your connection.".to_string()
            }
            other => other.to_string(),
        }
    }
}
