//! Ordered exhaustive search over (strategy, inversion mode) pairs.
//!
//! Strategies come from [`preprocess`](super::preprocess) in fixed order and
//! each is tried with inversion modes `dontInvert → onlyInvert → attemptBoth`,
//! so at most 4 × 3 = 12 attempts. The first non-empty payload wins. A
//! failing attempt never aborts the search, and a strategy whose buffer could
//! not be produced is skipped.
//!
//! The symbol decoding itself is delegated to a [`QrDecoder`]; the production
//! implementation wraps `rqrr`.
use std::panic::{self, AssertUnwindSafe};

use rqrr::PreparedImage;
use serde::Serialize;

use super::preprocess::{PixelBuffer, Strategy, StrategyOutput};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum InversionMode {
    #[serde(rename = "dontInvert")]
    DontInvert,
    #[serde(rename = "onlyInvert")]
    OnlyInvert,
    #[serde(rename = "attemptBoth")]
    AttemptBoth,
}

impl InversionMode {
    pub const ORDER: [InversionMode; 3] =
        [InversionMode::DontInvert, InversionMode::OnlyInvert, InversionMode::AttemptBoth];

    pub fn as_str(self) -> &'static str {
        match self {
            InversionMode::DontInvert => "dontInvert",
            InversionMode::OnlyInvert => "onlyInvert",
            InversionMode::AttemptBoth => "attemptBoth",
        }
    }
}

/// A single decode attempt blew up inside the capability.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("decode attempt failed: {0}")]
pub struct DecodeFault(pub String);

/// The imported "find and decode a QR symbol" capability.
pub trait QrDecoder {
    /// `Ok(None)` when no symbol was found under `mode`.
    fn try_decode(
        &self,
        image: &PixelBuffer,
        mode: InversionMode,
    ) -> Result<Option<String>, DecodeFault>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum DecodeOutcome {
    Found(String),
    NotFound,
    Errored(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodeAttempt {
    pub strategy: Strategy,
    pub inversion: InversionMode,
    pub outcome: DecodeOutcome,
}

/// Result of one search: the payload (if any) plus the attempts made, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeReport {
    pub payload: Option<String>,
    pub attempts: Vec<DecodeAttempt>,
}

impl DecodeReport {
    /// The attempt that produced the payload.
    pub fn winning_attempt(&self) -> Option<&DecodeAttempt> {
        self.attempts
            .iter()
            .find(|a| matches!(a.outcome, DecodeOutcome::Found(_)))
    }
}

pub struct DecodeEngine<'a> {
    decoder: &'a dyn QrDecoder,
}

impl<'a> DecodeEngine<'a> {
    pub fn new(decoder: &'a dyn QrDecoder) -> Self {
        Self { decoder }
    }

    pub fn decode<I>(&self, candidates: I) -> DecodeReport
    where
        I: IntoIterator<Item = StrategyOutput>,
    {
        let mut report = DecodeReport::default();

        for candidate in candidates {
            let buffer = match candidate.buffer {
                Ok(buffer) => buffer,
                Err(e) => {
                    tracing::debug!(strategy = candidate.strategy.name(), error = %e, "strategy skipped");
                    continue;
                }
            };

            for mode in InversionMode::ORDER {
                let outcome = match self.decoder.try_decode(&buffer, mode) {
                    Ok(Some(text)) if !text.is_empty() => DecodeOutcome::Found(text),
                    Ok(_) => DecodeOutcome::NotFound,
                    Err(fault) => DecodeOutcome::Errored(fault.0),
                };
                tracing::debug!(
                    strategy = candidate.strategy.name(),
                    inversion = mode.as_str(),
                    outcome = ?outcome,
                    "decode attempt"
                );

                let found = match &outcome {
                    DecodeOutcome::Found(text) => Some(text.clone()),
                    _ => None,
                };
                report.attempts.push(DecodeAttempt {
                    strategy: candidate.strategy,
                    inversion: mode,
                    outcome,
                });
                if found.is_some() {
                    report.payload = found;
                    return report;
                }
            }
        }

        report
    }
}

// ── rqrr-backed capability ─────────────────────────────────────────

/// Decodes with `rqrr` on a BT.601 greyscale view of the buffer.
#[derive(Debug, Default, Clone, Copy)]
pub struct RqrrDecoder;

impl QrDecoder for RqrrDecoder {
    fn try_decode(
        &self,
        image: &PixelBuffer,
        mode: InversionMode,
    ) -> Result<Option<String>, DecodeFault> {
        let (w, h) = (image.width, image.height);
        if w == 0 || h == 0 || image.pixels.len() < w * h * 4 {
            return Err(DecodeFault(format!("short pixel buffer for {w}x{h}")));
        }
        let grey = rgba_to_greyscale(&image.pixels, w, h);

        // rqrr has panicked on degenerate grids before; contain it to this attempt.
        panic::catch_unwind(AssertUnwindSafe(|| match mode {
            InversionMode::DontInvert => try_decode_greyscale(&grey, w, h),
            InversionMode::OnlyInvert => try_decode_greyscale(&invert(&grey), w, h),
            InversionMode::AttemptBoth => try_decode_greyscale(&grey, w, h)
                .or_else(|| try_decode_greyscale(&invert(&grey), w, h)),
        }))
        .map_err(|payload| {
            let msg = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "decoder panicked".to_string());
            DecodeFault(msg)
        })
    }
}

/// Try every detected grid, returning the first that decodes.
fn try_decode_greyscale(grey: &[u8], w: usize, h: usize) -> Option<String> {
    let mut img = PreparedImage::prepare_from_greyscale(w, h, |x, y| grey[y * w + x]);
    img.detect_grids()
        .iter()
        .filter_map(|g| g.decode().ok())
        .map(|(_, content)| content)
        .next()
}

/// Integer BT.601 luminance: (77R + 150G + 29B) >> 8.
fn rgba_to_greyscale(rgba: &[u8], width: usize, height: usize) -> Vec<u8> {
    let len = width * height;
    let mut grey = Vec::with_capacity(len);
    for px in rgba.chunks_exact(4).take(len) {
        let r = px[0] as u32;
        let g = px[1] as u32;
        let b = px[2] as u32;
        grey.push(((77 * r + 150 * g + 29 * b) >> 8) as u8);
    }
    grey
}

fn invert(grey: &[u8]) -> Vec<u8> {
    grey.iter().map(|&p| 255 - p).collect()
}

// ── Tests ──────────────────────────────────────────────────────────
