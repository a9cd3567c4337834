// SPDX-License-Identifier: MPL-2.0

//! Error types for the camera session

use crate::backends::camera::types::BackendError;
use std::fmt;

/// Result type alias using SessionError
pub type SessionResult<T> = Result<T, SessionError>;

/// Main session error type
///
/// `NotReady`, `Busy` and `InvalidArgument` are synchronous rejections returned
/// straight to the caller. `Hardware` and `Io` arrive through completion
/// callbacks or command handles. `Cancelled` only ever shows up in logs.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    /// Operation attempted while the session is not running
    NotReady(String),
    /// Gate, capture or stop conflict
    Busy(String),
    /// Out-of-range coordinates, malformed ratio strings, unknown modes
    InvalidArgument(String),
    /// Backend bind/capture/focus failure
    Hardware(BackendError),
    /// Superseded focus request
    Cancelled,
    /// Pipeline encode/decode or persistence failure
    Io(String),
    /// Unexpected failure during teardown
    Fatal(String),
}

/// Capture pipeline errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// Raw bytes could not be decoded into pixels
    Decode(String),
    /// Pixel buffer could not be encoded
    Encode(String),
    /// A transform produced or received an empty image
    InvalidDimensions { width: u32, height: u32 },
}

impl SessionError {
    /// Short machine-readable kind, used by the CLI and by host bridges
    pub fn kind(&self) -> &'static str {
        match self {
            SessionError::NotReady(_) => "NotReady",
            SessionError::Busy(_) => "Busy",
            SessionError::InvalidArgument(_) => "InvalidArgument",
            SessionError::Hardware(_) => "HardwareError",
            SessionError::Cancelled => "Cancelled",
            SessionError::Io(_) => "IOError",
            SessionError::Fatal(_) => "Fatal",
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::NotReady(msg) => write!(f, "Camera not ready: {}", msg),
            SessionError::Busy(msg) => write!(f, "Camera is busy: {}", msg),
            SessionError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            SessionError::Hardware(e) => write!(f, "Hardware error: {}", e),
            SessionError::Cancelled => write!(f, "Cancelled by a newer request"),
            SessionError::Io(msg) => write!(f, "I/O error: {}", msg),
            SessionError::Fatal(msg) => write!(f, "Fatal error: {}", msg),
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Decode(msg) => write!(f, "Decoding failed: {}", msg),
            PipelineError::Encode(msg) => write!(f, "Encoding failed: {}", msg),
            PipelineError::InvalidDimensions { width, height } => {
                write!(f, "Invalid image dimensions: {}x{}", width, height)
            }
        }
    }
}

impl std::error::Error for SessionError {}
impl std::error::Error for PipelineError {}

impl From<BackendError> for SessionError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Cancelled => SessionError::Cancelled,
            other => SessionError::Hardware(other),
        }
    }
}

impl From<PipelineError> for SessionError {
    fn from(err: PipelineError) -> Self {
        SessionError::Io(err.to_string())
    }
}

impl From<std::io::Error> for SessionError {
    fn from(err: std::io::Error) -> Self {
        SessionError::Io(err.to_string())
    }
}
