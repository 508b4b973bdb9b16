//! Pixel-transform strategies feeding the decode engine.
//!
//! Each strategy is a pure function of the source raster and produces its own
//! RGBA buffer. The order of [`Strategy::ORDER`] is the order the decode
//! engine tries them in:
//!
//! - **Direct** → native resolution copy
//! - **Resized** → long edge scaled down to 800 px (Lanczos3)
//! - **ContrastEnhanced** → per-channel linear stretch around mid-grey
//! - **GrayscaleThreshold** → BT.601 luma binarized at 128
use image::RgbaImage;
use image::imageops::{self, FilterType};
use serde::Serialize;

use crate::error::DecodeError;

/// Long-edge target for the resized strategy.
pub const RESIZE_TARGET: u32 = 800;
pub const CONTRAST_FACTOR: f32 = 2.0;
pub const LUMA_THRESHOLD: u32 = 128;

/// Interleaved RGBA samples, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u8>,
}

impl PixelBuffer {
    pub fn new(width: usize, height: usize, pixels: Vec<u8>) -> Result<Self, PreprocessError> {
        if width == 0 || height == 0 {
            return Err(PreprocessError::EmptyImage);
        }
        let expected = width * height * 4;
        if pixels.len() != expected {
            return Err(PreprocessError::BufferMismatch { expected, actual: pixels.len() });
        }
        Ok(Self { width, height, pixels })
    }

    fn from_image(img: RgbaImage) -> Result<Self, PreprocessError> {
        let (w, h) = img.dimensions();
        Self::new(w as usize, h as usize, img.into_raw())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PreprocessError {
    #[error("image has no pixels")]
    EmptyImage,
    #[error("pixel buffer holds {actual} bytes, expected {expected}")]
    BufferMismatch { expected: usize, actual: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Direct,
    Resized,
    ContrastEnhanced,
    GrayscaleThreshold,
}

impl Strategy {
    pub const ORDER: [Strategy; 4] = [
        Strategy::Direct,
        Strategy::Resized,
        Strategy::ContrastEnhanced,
        Strategy::GrayscaleThreshold,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Strategy::Direct => "direct",
            Strategy::Resized => "resized",
            Strategy::ContrastEnhanced => "contrast_enhanced",
            Strategy::GrayscaleThreshold => "grayscale_threshold",
        }
    }

    pub fn apply(self, source: &RgbaImage) -> Result<PixelBuffer, PreprocessError> {
        let (w, h) = source.dimensions();
        if w == 0 || h == 0 {
            return Err(PreprocessError::EmptyImage);
        }
        match self {
            Strategy::Direct => PixelBuffer::from_image(source.clone()),
            Strategy::Resized => match resized_dimensions(w, h) {
                Some((nw, nh)) => {
                    PixelBuffer::from_image(imageops::resize(source, nw, nh, FilterType::Lanczos3))
                }
                None => PixelBuffer::from_image(source.clone()),
            },
            Strategy::ContrastEnhanced => {
                PixelBuffer::new(w as usize, h as usize, enhance_contrast(source.as_raw()))
            }
            Strategy::GrayscaleThreshold => {
                PixelBuffer::new(w as usize, h as usize, luma_threshold(source.as_raw()))
            }
        }
    }
}

/// One strategy's buffer, or the reason it could not be produced.
#[derive(Debug, Clone)]
pub struct StrategyOutput {
    pub strategy: Strategy,
    pub buffer: Result<PixelBuffer, PreprocessError>,
}

// ── Public API ─────────────────────────────────────────────────────

/// Decode encoded image bytes (PNG, JPEG, GIF, BMP, WEBP) into an RGBA raster.
pub fn load_raster(bytes: &[u8]) -> Result<RgbaImage, DecodeError> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| DecodeError::ImageLoad(e.to_string()))?
        .to_rgba8();
    if img.width() == 0 || img.height() == 0 {
        return Err(DecodeError::ImageLoad("image has no pixels".to_string()));
    }
    Ok(img)
}

/// Lazily produce every strategy's buffer in engine order.
///
/// Buffers are built on demand, so an early decode hit skips the remaining
/// transforms.
pub fn strategies(source: &RgbaImage) -> impl Iterator<Item = StrategyOutput> + '_ {
    Strategy::ORDER
        .into_iter()
        .map(move |strategy| StrategyOutput { strategy, buffer: strategy.apply(source) })
}

/// Eagerly produce all four buffers.
pub fn prepare_all(source: &RgbaImage) -> Vec<StrategyOutput> {
    strategies(source).collect()
}

// ── Transforms ─────────────────────────────────────────────────────
// Operate on flat interleaved RGBA buffers; alpha is never touched.

/// Target size when the long edge exceeds [`RESIZE_TARGET`], `None` otherwise.
///
/// Integer math keeps `floor(side * 800 / long_edge)` exact.
pub fn resized_dimensions(width: u32, height: u32) -> Option<(u32, u32)> {
    let long_edge = width.max(height);
    if long_edge <= RESIZE_TARGET {
        return None;
    }
    let scale = |side: u32| -> u32 {
        let scaled = u64::from(side) * u64::from(RESIZE_TARGET) / u64::from(long_edge);
        (scaled as u32).max(1)
    };
    Some((scale(width), scale(height)))
}

/// `out = clamp(in * factor + 128 * (1 - factor))` on R, G and B.
fn enhance_contrast(rgba: &[u8]) -> Vec<u8> {
    let intercept = 128.0 * (1.0 - CONTRAST_FACTOR);
    let mut out = rgba.to_vec();
    for px in out.chunks_exact_mut(4) {
        for c in &mut px[..3] {
            *c = (f32::from(*c) * CONTRAST_FACTOR + intercept).round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}

/// BT.601 luma, `floor(0.299R + 0.587G + 0.114B)`, in exact integer form.
pub fn luma(r: u8, g: u8, b: u8) -> u32 {
    (299 * u32::from(r) + 587 * u32::from(g) + 114 * u32::from(b)) / 1000
}

/// Binarize R, G and B to 255 where luma exceeds the threshold, else 0.
fn luma_threshold(rgba: &[u8]) -> Vec<u8> {
    let mut out = rgba.to_vec();
    for px in out.chunks_exact_mut(4) {
        let v = if luma(px[0], px[1], px[2]) > LUMA_THRESHOLD { 255 } else { 0 };
        px[0] = v;
        px[1] = v;
        px[2] = v;
    }
    out
}

// ── Tests ──────────────────────────────────────────────────────────
