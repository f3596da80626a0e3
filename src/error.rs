//! Error handling for fluent-request

use thiserror::Error;

/// Main error type for request operations
#[derive(Error, Debug)]
pub enum RequestError {
    /// The transfer engine could not be created.
    #[error("Initialization error: {0}")]
    Initialization(String),

    /// The transfer engine reported a failed transfer.
    #[error("Error #{code} : {message}")]
    Transfer { code: u32, message: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl RequestError {
    /// Build a transfer failure with a curl-compatible code.
    pub fn transfer(code: u32, message: impl Into<String>) -> Self {
        RequestError::Transfer {
            code,
            message: message.into(),
        }
    }

    /// Numeric transfer code, if this is a transfer failure.
    pub fn transfer_code(&self) -> Option<u32> {
        match self {
            RequestError::Transfer { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Result type alias for request operations
pub type Result<T> = std::result::Result<T, RequestError>;

#[cfg(test)]
mod tests {
    use super::RequestError;

    #[test]
    fn transfer_error_displays_code_and_message() {
        let err = RequestError::transfer(7, "Failed to connect");
        assert_eq!(err.to_string(), "Error #7 : Failed to connect");
        assert_eq!(err.transfer_code(), Some(7));
    }

    #[test]
    fn non_transfer_errors_have_no_code() {
        let err = RequestError::Initialization("no runtime".to_string());
        assert_eq!(err.transfer_code(), None);
    }
}
