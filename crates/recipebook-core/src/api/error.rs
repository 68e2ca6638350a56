use serde::Deserialize;
use thiserror::Error;

/// User-facing authentication failure.
///
/// The `Display` text of each variant is the message shown to the user.
/// `Unknown` carries the underlying detail for logs only.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("This email already exists!")]
    EmailExists,

    #[error("This email does not exist!")]
    EmailNotFound,

    #[error("The password does not match!")]
    InvalidPassword,

    #[error("An error occurred!")]
    Unknown(String),
}

/// Maximum length for error response bodies kept in error details
const MAX_ERROR_BODY_LENGTH: usize = 500;

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

impl AuthError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    /// Map a provider error code to its variant. Matching is exact.
    pub fn from_code(code: &str) -> Self {
        match code {
            "EMAIL_EXISTS" => AuthError::EmailExists,
            "EMAIL_NOT_FOUND" => AuthError::EmailNotFound,
            "INVALID_PASSWORD" => AuthError::InvalidPassword,
            other => AuthError::Unknown(format!("provider error code {}", other)),
        }
    }

    /// Map an HTTP error body shaped `{"error": {"message": CODE}}`.
    ///
    /// Anything that does not have that shape becomes `Unknown`.
    pub fn from_error_body(body: &str) -> Self {
        let code = serde_json::from_str::<ErrorEnvelope>(body)
            .ok()
            .and_then(|envelope| envelope.error)
            .and_then(|detail| detail.message);

        match code {
            Some(code) => Self::from_code(&code),
            None => AuthError::Unknown(format!(
                "unrecognized error body: {}",
                Self::truncate_body(body)
            )),
        }
    }

    /// The message to display, same as `to_string()`.
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        AuthError::Unknown(format!("network error: {}", err))
    }
}
