//! Error types for the imagery services.

use thiserror::Error;

/// Result type alias using ImageryError.
pub type ImageryResult<T> = Result<T, ImageryError>;

/// Primary error type for imagery search and ranking.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ImageryError {
    // === Request Errors ===
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("Band {0} not allowed")]
    UnsupportedBand(String),

    // === Data Errors ===
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    // === Upstream Errors ===
    #[error("Upstream unavailable ({service}): {message}")]
    UpstreamUnavailable { service: String, message: String },
}

impl ImageryError {
    /// Build an `UpstreamUnavailable` error for a named collaborator.
    pub fn upstream(service: impl Into<String>, message: impl Into<String>) -> Self {
        ImageryError::UpstreamUnavailable {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Short machine-readable name, used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            ImageryError::MissingParameter(_) => "missing_parameter",
            ImageryError::InvalidFormat(_) => "invalid_format",
            ImageryError::InvalidCoordinate(_) => "invalid_coordinate",
            ImageryError::UnsupportedBand(_) => "unsupported_band",
            ImageryError::ShapeMismatch(_) => "shape_mismatch",
            ImageryError::UpstreamUnavailable { .. } => "upstream_unavailable",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            ImageryError::MissingParameter(_)
            | ImageryError::InvalidFormat(_)
            | ImageryError::InvalidCoordinate(_)
            | ImageryError::UnsupportedBand(_) => 400,

            ImageryError::ShapeMismatch(_) | ImageryError::UpstreamUnavailable { .. } => 500,
        }
    }

    /// Whether repeating the failed call could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ImageryError::UpstreamUnavailable { .. })
    }
}

impl From<serde_json::Error> for ImageryError {
    fn from(err: serde_json::Error) -> Self {
        ImageryError::upstream("json", format!("Malformed payload: {}", err))
    }
}
