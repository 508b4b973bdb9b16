//! Read-only views: the current session and the classification service.

use serde_json::json;

use super::util::json_ok;
use crate::presenter::Presenter;
use crate::session::ScanSessionController;

/// Handle GET /api/session.
pub fn handle_session_get<P: Presenter>(ctrl: &ScanSessionController<P>) -> String {
    json_ok(&ctrl.snapshot())
}

/// Handle GET /api/service/status: probe health and model info.
pub async fn handle_status_get<P: Presenter>(ctrl: &ScanSessionController<P>) -> String {
    let status = ctrl.check_service_status().await;
    json_ok(&json!({ "ready": status.is_ready(), "service": status }))
}
