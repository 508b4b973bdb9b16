//! Request parsing and response helpers shared by the route handlers.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use serde_json::{Value, json};

use crate::error::CommandError;

/// Parse a URL-encoded form body into key-value pairs.
pub fn parse_form_body(body: &str) -> Vec<(String, String)> {
    if body.is_empty() {
        return Vec::new();
    }
    body.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, val) = pair.split_once('=').unwrap_or((pair, ""));
            (percent_decode(key), percent_decode(val))
        })
        .collect()
}

/// Percent-decode a URL-encoded value. Malformed escapes pass through.
pub fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => {
                match (hex_val(bytes[i + 1]), hex_val(bytes[i + 2])) {
                    (Some(h), Some(l)) => {
                        out.push(h << 4 | l);
                        i += 3;
                        continue;
                    }
                    _ => out.push(b'%'),
                }
            }
            b'+' => out.push(b' '),
            b => out.push(b),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Parse a query string into key-value pairs.
pub fn parse_query(query: &str) -> Vec<(String, String)> {
    parse_form_body(query.strip_prefix('?').unwrap_or(query))
}

/// Request fields from either a JSON object body or a form body. Only string,
/// number and boolean members of a JSON object are kept.
pub fn request_fields(body: &str) -> Vec<(String, String)> {
    let trimmed = body.trim_start();
    if !trimmed.starts_with('{') {
        return parse_form_body(body.trim());
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => map
            .into_iter()
            .filter_map(|(k, v)| match v {
                Value::String(s) => Some((k, s)),
                Value::Number(n) => Some((k, n.to_string())),
                Value::Bool(b) => Some((k, b.to_string())),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Look up a value by key.
pub fn get_param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

// ── Image payloads ─────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("data URL is not base64-encoded")]
    NotBase64,
    #[error("malformed data URL")]
    MalformedDataUrl,
    #[error("invalid base64 image payload: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Decoded image bytes plus the MIME type a data URL declared, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Accept `data:<mime>;base64,<payload>` or bare base64.
pub fn decode_image_payload(data: &str) -> Result<ImagePayload, PayloadError> {
    let data = data.trim();
    let Some(rest) = data.strip_prefix("data:") else {
        return Ok(ImagePayload { mime_type: None, bytes: STANDARD.decode(data)? });
    };
    let (header, payload) = rest.split_once(',').ok_or(PayloadError::MalformedDataUrl)?;
    let mut params = header.split(';');
    let mime = params.next().unwrap_or("").trim();
    if !params.any(|p| p.trim().eq_ignore_ascii_case("base64")) {
        return Err(PayloadError::NotBase64);
    }
    Ok(ImagePayload {
        mime_type: (!mime.is_empty()).then(|| mime.to_string()),
        bytes: STANDARD.decode(payload.trim())?,
    })
}

// ── Responses ──────────────────────────────────────────────────────

pub fn json_ok<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|e| json_error(500, &format!("failed to serialize response: {e}")))
}

pub fn json_error(status: u16, message: &str) -> String {
    json!({ "status": status, "error": message }).to_string()
}

pub fn json_error_with_code(status: u16, code: &str, message: &str) -> String {
    json!({ "status": status, "code": code, "error": message }).to_string()
}

/// 409 for a command refused in the current state, 422 for a rejected input.
pub fn command_error(err: &CommandError) -> String {
    match err {
        CommandError::NoFileSelected => json_error_with_code(409, "no_file_selected", &err.to_string()),
        CommandError::Busy => json_error_with_code(409, "busy", &err.to_string()),
        CommandError::Rejected(reason) => json_error_with_code(422, reason.code(), &reason.to_string()),
    }
}
