//! Error taxonomy for the scanning core.
//!
//! Every kind is caught at the boundary where it occurs and surfaced as a
//! terminal session state; none of them unwind through the controller.

use std::time::Duration;

/// Why a candidate file (or typed URL) was refused before any work started.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("No file selected")]
    Empty,
    #[error("Unsupported file type '{mime_type}'. Please select an image file (JPG, PNG, GIF, BMP, WEBP)")]
    WrongType { mime_type: String },
    #[error("File is too large ({size_bytes} bytes). The limit is 10 MB")]
    TooLarge { size_bytes: u64 },
    #[error("Please enter a URL to scan")]
    EmptyUrl,
}

impl ValidationError {
    /// Short machine-readable tag used in JSON responses.
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::Empty => "empty",
            ValidationError::WrongType { .. } => "wrong_type",
            ValidationError::TooLarge { .. } => "too_large",
            ValidationError::EmptyUrl => "empty_url",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("No QR code detected in this image.")]
    NoQrFound,
    #[error("Failed to load image: {0}")]
    ImageLoad(String),
}

/// The decode capability could not be made available.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LibraryLoadError {
    #[error("QR decoder did not load within {0:?}")]
    Timeout(Duration),
    #[error("Failed to load QR decoder: {0}")]
    LoadFailure(String),
}

/// The classifier round trip failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NetworkError {
    #[error("{message} (HTTP {status})")]
    NonSuccessStatus { status: u16, message: String },
    #[error("Could not reach the classification service: {0}")]
    TransportFailure(String),
    #[error("Unexpected response from the classification service: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScanError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    LibraryLoad(#[from] LibraryLoadError),
    #[error(transparent)]
    Network(#[from] NetworkError),
}

impl ScanError {
    /// Operational hints shown next to the message. Only network failures
    /// carry any.
    pub fn remediation_hints(&self) -> Vec<String> {
        match self {
            ScanError::Network(_) => vec![
                "ensure the classification service is running".to_string(),
                "ensure the classification model has been trained and loaded".to_string(),
            ],
            ScanError::LibraryLoad(_) => {
                vec!["retry the scan to reload the QR decoder".to_string()]
            }
            _ => Vec::new(),
        }
    }
}

/// A command the controller refused without changing the session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("Please select a QR code image first.")]
    NoFileSelected,
    #[error("A scan is already in progress")]
    Busy,
    #[error(transparent)]
    Rejected(#[from] ValidationError),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}
