//! Error types for N5 container access and tile serving

use thiserror::Error;

/// Main error type for n5ng operations
#[derive(Error, Debug)]
pub enum N5Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid N5 format: {0}")]
    InvalidFormat(String),

    #[error("Unsupported N5 version: {0}")]
    UnsupportedVersion(String),

    #[error("Compression error: {0}")]
    Compression(String),

    #[error("Decompression error: {0}")]
    Decompression(String),

    #[error("Invalid dimensions: {0}")]
    InvalidDimensions(String),

    #[error("Out of bounds: {0}")]
    OutOfBounds(String),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl N5Error {
    /// True for errors caused by the caller's input rather than the server
    pub fn is_client_error(&self) -> bool {
        matches!(self, N5Error::OutOfBounds(_) | N5Error::InvalidRequest(_))
    }
}

/// Specialized Result type for n5ng operations
pub type Result<T> = std::result::Result<T, N5Error>;

impl From<serde_json::Error> for N5Error {
    fn from(err: serde_json::Error) -> Self {
        N5Error::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors() {
        assert!(N5Error::OutOfBounds("x".into()).is_client_error());
        assert!(N5Error::InvalidRequest("x".into()).is_client_error());
        assert!(!N5Error::NotFound("x".into()).is_client_error());
        assert!(!N5Error::Metadata("x".into()).is_client_error());
        // a non-3D array on disk is not the caller's fault
        assert!(!N5Error::InvalidDimensions("x".into()).is_client_error());
    }

    #[test]
    fn test_json_error_conversion() {
        let err: N5Error = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, N5Error::Serialization(_)));
    }
}
