pub mod controller;
pub mod state;

pub use controller::ScanSessionController;
pub use state::{EventPayload, ScanSession, SelectedImage, SessionEvent, SessionSnapshot, SessionState};
