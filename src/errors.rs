use std::fmt;

/// Errors raised by the capture session and its stream backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    PermissionDenied(String),
    DeviceUnavailable(String),
    AcquisitionError(String),
    ControlError(String),
    InvalidState(String),
    EncodeError(String),
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CaptureError::PermissionDenied(msg) => write!(f, "Camera permission denied: {}", msg),
            CaptureError::DeviceUnavailable(msg) => write!(f, "Camera unavailable: {}", msg),
            CaptureError::AcquisitionError(msg) => write!(f, "Stream acquisition error: {}", msg),
            CaptureError::ControlError(msg) => write!(f, "Stream control error: {}", msg),
            CaptureError::InvalidState(msg) => write!(f, "Invalid session state: {}", msg),
            CaptureError::EncodeError(msg) => write!(f, "Still encode error: {}", msg),
        }
    }
}

impl std::error::Error for CaptureError {}

/// Errors surfaced by the backend service contracts (identity, tables, storage)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("authentication required")]
    AuthRequired,
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("invalid input: {0}")]
    Invalid(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("query failed: {0}")]
    Query(String),
    #[error("storage operation failed: {0}")]
    Storage(String),
    #[error("transport failed: {0}")]
    Transport(String),
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("services are not configured: {0}")]
    NotConfigured(String),
}
