//! Error type for the dashboard surface.

use thiserror::Error;

/// Request-level error with an HTTP status mapping.
#[derive(Error, Debug)]
pub enum Error {
    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input or request
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::InvalidInput(_) => 400,
            Self::Internal(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(Error::NotFound("store".into()).status_code(), 404);
        assert_eq!(Error::InvalidInput("days".into()).status_code(), 400);
        assert_eq!(Error::Internal("test".into()).status_code(), 500);
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            Error::NotFound("data/tagged.csv".into()).to_string(),
            "Not found: data/tagged.csv"
        );
    }
}
