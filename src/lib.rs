//! SafeLink QR scanner core.
//!
//! Turns a user-selected image into a decoded URL and hands that URL to the
//! external classification service. The pieces:
//!
//! - [`scan`]: file validation, pixel strategies, the decode search
//! - [`session`]: the scan-session state machine and its data
//! - [`classifier`]: the classification service client
//! - [`presenter`]: where state notifications go
//!
//! [`handle_command`] exposes the controller through a small HTTP-shaped
//! command table, routed with `matchit`, that answers in JSON.

pub mod classifier;
pub mod config;
pub mod error;
pub mod presenter;
pub mod routes;
pub mod scan;
pub mod session;

#[cfg(test)]
pub(crate) mod test_support;

pub use classifier::{Classification, Classifier, HttpClassifier, RiskBand, ServiceStatus};
pub use config::ScannerConfig;
pub use error::{CommandError, DecodeError, LibraryLoadError, NetworkError, ScanError, ValidationError};
pub use presenter::{LogPresenter, Presenter, RecordingPresenter};
pub use scan::validate::CandidateFile;
pub use session::{ScanSessionController, SessionEvent, SessionSnapshot, SessionState};

use routes::util::json_error;

/// Process an HTTP-like command against the controller and return a JSON body.
///
/// # Arguments
/// * `method`: HTTP method (e.g., "GET", "POST")
/// * `path`: URL path (e.g., "/api/qr/scan")
/// * `query`: Query string (e.g., "?url=https%3A%2F%2Fexample.com")
/// * `body`: Request body, JSON object or form encoded. Empty for GET.
pub async fn handle_command<P: Presenter>(
    controller: &ScanSessionController<P>,
    method: &str,
    path: &str,
    query: &str,
    body: &str,
) -> String {
    let mut router = matchit::Router::new();

    router.insert("/api/qr/select", "qr_select").ok();
    router.insert("/api/qr/scan", "qr_scan").ok();
    router.insert("/api/qr/reset", "qr_reset").ok();
    router.insert("/api/url/scan", "url_scan").ok();
    router.insert("/api/session", "session").ok();
    router.insert("/api/service/status", "service_status").ok();

    match router.at(path) {
        Ok(matched) => match (*matched.value, method) {
            ("qr_select", "POST") => routes::qr::handle_select_post(controller, body),
            ("qr_scan", "POST") => routes::qr::handle_scan_post(controller).await,
            ("qr_reset", "POST") => routes::qr::handle_reset_post(controller),
            ("url_scan", "POST") => routes::url::handle_scan_post(controller, query, body).await,
            ("session", "GET") => routes::session::handle_session_get(controller),
            ("service_status", "GET") => routes::session::handle_status_get(controller).await,

            _ => method_not_allowed(),
        },
        Err(_) => not_found(),
    }
}

fn not_found() -> String {
    json_error(404, "route not found")
}

fn method_not_allowed() -> String {
    json_error(405, "method not allowed")
}
