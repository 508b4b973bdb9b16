//! Session data owned by the controller, and the events it emits.
//!
//! A `ScanSession` is replaced wholesale whenever the user starts over; its
//! `generation` identifies it so late asynchronous results can be matched
//! against the session that started them.

use std::fmt;
use std::rc::Rc;

use serde::Serialize;

use crate::classifier::{Classification, RiskBand};
use crate::error::{ScanError, ValidationError};

/// An accepted image file. Immutable once created.
#[derive(Clone, PartialEq, Eq)]
pub struct SelectedImage {
    name: String,
    mime_type: String,
    bytes: Rc<[u8]>,
}

impl SelectedImage {
    pub(crate) fn new(name: String, mime_type: String, bytes: Rc<[u8]>) -> Self {
        Self { name, mime_type, bytes }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn summary(&self) -> ImageSummary {
        ImageSummary {
            name: self.name.clone(),
            mime_type: self.mime_type.clone(),
            size_bytes: self.size_bytes(),
        }
    }
}

impl fmt::Debug for SelectedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectedImage")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("size_bytes", &self.bytes.len())
            .finish()
    }
}

/// Metadata view of a [`SelectedImage`], without the bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageSummary {
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Idle,
    FileSelected,
    Decoding,
    DecodeFailed,
    Dispatching,
    DispatchFailed,
    Succeeded,
}

impl SessionState {
    /// A scan or dispatch is outstanding.
    pub fn is_busy(self) -> bool {
        matches!(self, SessionState::Decoding | SessionState::Dispatching)
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionState::DecodeFailed | SessionState::DispatchFailed | SessionState::Succeeded
        )
    }
}

/// A human-readable failure with operational hints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Failure {
    pub kind: &'static str,
    pub message: String,
    pub hints: Vec<String>,
}

impl From<&ScanError> for Failure {
    fn from(err: &ScanError) -> Self {
        let kind = match err {
            ScanError::Validation(_) => "validation",
            ScanError::Decode(_) => "decode",
            ScanError::LibraryLoad(_) => "library_load",
            ScanError::Network(_) => "network",
        };
        Self { kind, message: err.to_string(), hints: err.remediation_hints() }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScanSession {
    pub(crate) generation: u64,
    pub(crate) state: SessionState,
    pub(crate) current_image: Option<Rc<SelectedImage>>,
    pub(crate) decoded_url: Option<String>,
    pub(crate) classifier_result: Option<Classification>,
    pub(crate) failure: Option<Failure>,
}

impl ScanSession {
    pub(crate) fn fresh(generation: u64) -> Self {
        Self { generation, ..Self::default() }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn current_image(&self) -> Option<&SelectedImage> {
        self.current_image.as_deref()
    }

    pub fn decoded_url(&self) -> Option<&str> {
        self.decoded_url.as_deref()
    }

    pub fn classifier_result(&self) -> Option<&Classification> {
        self.classifier_result.as_ref()
    }

    pub fn failure(&self) -> Option<&Failure> {
        self.failure.as_ref()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            generation: self.generation,
            state: self.state,
            image: self.current_image.as_ref().map(|i| i.summary()),
            decoded_url: self.decoded_url.clone(),
            result: self.classifier_result.clone(),
            risk: self.classifier_result.as_ref().map(Classification::risk_band),
            failure: self.failure.clone(),
        }
    }
}

/// Serializable view of a session for the presenter boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub generation: u64,
    pub state: SessionState,
    pub image: Option<ImageSummary>,
    pub decoded_url: Option<String>,
    pub result: Option<Classification>,
    pub risk: Option<RiskBand>,
    pub failure: Option<Failure>,
}

/// What accompanies a state notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    None,
    Rejected { code: &'static str, message: String },
    FileSelected { image: ImageSummary },
    DecodedUrl { url: String },
    Result { result: Classification, risk: RiskBand },
    Failed { failure: Failure },
}

impl EventPayload {
    pub fn rejected(err: &ValidationError) -> Self {
        EventPayload::Rejected { code: err.code(), message: err.to_string() }
    }
}

/// One notification to the presenter: the session's state after a
/// transition plus whatever the transition produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionEvent {
    pub generation: u64,
    pub state: SessionState,
    pub payload: EventPayload,
}
