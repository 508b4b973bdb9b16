//! Route handler for POST /api/url/scan: classify a typed URL.
//!
//! The URL is read from the `url` body field (JSON or form), falling back to
//! the `url` query parameter.

use super::util::{command_error, get_param, json_ok, parse_query, request_fields};
use crate::presenter::Presenter;
use crate::session::ScanSessionController;

pub async fn handle_scan_post<P: Presenter>(
    ctrl: &ScanSessionController<P>,
    query: &str,
    body: &str,
) -> String {
    let fields = request_fields(body);
    let params = parse_query(query);
    let url = get_param(&fields, "url")
        .or_else(|| get_param(&params, "url"))
        .unwrap_or("");

    match ctrl.submit_url(url).await {
        Ok(()) => json_ok(&ctrl.snapshot()),
        Err(e) => command_error(&e),
    }
}
