//! Image side of a scan: file acceptance, pixel strategies, and the decode
//! search. Everything here is synchronous and holds no state between calls.

pub mod decode;
pub mod loader;
pub mod preprocess;
pub mod validate;

use crate::error::DecodeError;
use decode::{DecodeEngine, DecodeReport, QrDecoder};

/// Load encoded image bytes and run the full strategy search.
///
/// `Err` only when the bytes are not a decodable raster; an image without a
/// QR code yields a report with no payload.
pub fn scan_bytes(bytes: &[u8], decoder: &dyn QrDecoder) -> Result<DecodeReport, DecodeError> {
    let raster = preprocess::load_raster(bytes)?;
    tracing::debug!(width = raster.width(), height = raster.height(), "image loaded");
    Ok(DecodeEngine::new(decoder).decode(preprocess::strategies(&raster)))
}

/// Like [`scan_bytes`] but folds a missing payload into `NoQrFound`.
pub fn extract_url(bytes: &[u8], decoder: &dyn QrDecoder) -> Result<String, DecodeError> {
    scan_bytes(bytes, decoder)?.payload.ok_or(DecodeError::NoQrFound)
}
