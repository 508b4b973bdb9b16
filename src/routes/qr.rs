//! Route handlers for /api/qr/*
//!
//! POST /api/qr/select fields (JSON object or form body):
//!   name     : original file name
//!   data     : `data:<mime>;base64,<payload>` or bare base64
//!   mime_type: overrides the data URL's MIME type; inferred from `name`
//!               when neither is given
//!
//! POST /api/qr/scan and POST /api/qr/reset take no fields.

use super::util::{
    command_error, decode_image_payload, get_param, json_error, json_error_with_code, json_ok,
    request_fields,
};
use crate::presenter::Presenter;
use crate::scan::validate::{CandidateFile, mime_from_extension};
use crate::session::ScanSessionController;

const DEFAULT_NAME: &str = "upload";

/// Handle POST /api/qr/select: validate and adopt an image.
pub fn handle_select_post<P: Presenter>(ctrl: &ScanSessionController<P>, body: &str) -> String {
    let fields = request_fields(body);
    let name = get_param(&fields, "name").map(str::trim).filter(|n| !n.is_empty()).unwrap_or(DEFAULT_NAME);
    let data = get_param(&fields, "data").unwrap_or("").trim();

    let candidate = if data.is_empty() {
        None
    } else {
        let payload = match decode_image_payload(data) {
            Ok(payload) => payload,
            Err(e) => return json_error(400, &e.to_string()),
        };
        let mime_type = get_param(&fields, "mime_type")
            .filter(|m| !m.trim().is_empty())
            .map(str::to_string)
            .or(payload.mime_type)
            .or_else(|| mime_from_extension(name).map(str::to_string))
            .unwrap_or_default();
        Some(CandidateFile::new(name, mime_type, payload.bytes))
    };

    match ctrl.select_file(candidate) {
        Ok(()) => json_ok(&ctrl.snapshot()),
        Err(reason) => json_error_with_code(422, reason.code(), &reason.to_string()),
    }
}

/// Handle POST /api/qr/scan: decode the selected image and classify it.
/// Responds once the session has settled.
pub async fn handle_scan_post<P: Presenter>(ctrl: &ScanSessionController<P>) -> String {
    match ctrl.start_scan().await {
        Ok(()) => json_ok(&ctrl.snapshot()),
        Err(e) => command_error(&e),
    }
}

/// Handle POST /api/qr/reset.
pub fn handle_reset_post<P: Presenter>(ctrl: &ScanSessionController<P>) -> String {
    ctrl.reset();
    json_ok(&ctrl.snapshot())
}
