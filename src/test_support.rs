//! Fixtures shared by the unit tests: rendered QR images, scripted decoders
//! and loaders, and a classifier whose responses can be held back.

use std::cell::{Cell, RefCell};
use std::io::Cursor;
use std::rc::Rc;

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use qrcode::{Color, QrCode};
use tokio::sync::Semaphore;

use crate::classifier::{Classification, Classifier, HealthInfo, ModelInfo, ServiceStatus, UrlFeatures};
use crate::error::{LibraryLoadError, NetworkError};
use crate::scan::decode::{DecodeFault, InversionMode, QrDecoder};
use crate::scan::loader::DecoderLoader;
use crate::scan::preprocess::PixelBuffer;
use crate::scan::validate::CandidateFile;

const QUIET_ZONE: u32 = 4;

/// Black-on-white QR code centred on a `canvas`×`canvas` white image.
pub fn render_qr(payload: &str, canvas: u32) -> RgbaImage {
    let code = QrCode::new(payload.as_bytes()).expect("payload fits in a QR code");
    let modules = code.width() as u32;
    let total = modules + 2 * QUIET_ZONE;
    let scale = (canvas / total).max(1);
    let offset = canvas.saturating_sub(total * scale) / 2;

    let mut img = RgbaImage::from_pixel(canvas, canvas, Rgba([255, 255, 255, 255]));
    for (i, color) in code.to_colors().into_iter().enumerate() {
        if color != Color::Dark {
            continue;
        }
        let (mx, my) = (i as u32 % modules, i as u32 / modules);
        let x0 = offset + (QUIET_ZONE + mx) * scale;
        let y0 = offset + (QUIET_ZONE + my) * scale;
        for y in y0..(y0 + scale).min(canvas) {
            for x in x0..(x0 + scale).min(canvas) {
                img.put_pixel(x, y, Rgba([0, 0, 0, 255]));
            }
        }
    }
    img
}

/// White-on-black variant of [`render_qr`].
pub fn render_qr_inverted(payload: &str, canvas: u32) -> RgbaImage {
    let mut img = render_qr(payload, canvas);
    for px in img.pixels_mut() {
        for c in &mut px.0[..3] {
            *c = 255 - *c;
        }
    }
    img
}

/// A smooth colour ramp with nothing resembling a finder pattern.
pub fn gradient_image(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x * 255 / width.max(1)) as u8, (y * 255 / height.max(1)) as u8, 128, 255])
    })
}

pub fn encode_png(img: &RgbaImage) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(img.clone())
        .write_to(&mut out, ImageFormat::Png)
        .expect("png encoding");
    out.into_inner()
}

pub fn png_file(name: &str, img: &RgbaImage) -> CandidateFile {
    CandidateFile::new(name, "image/png", encode_png(img))
}

// ── Decoders and loaders ───────────────────────────────────────────

/// Decoder driven by a closure; counts its invocations.
pub struct FnDecoder<F> {
    f: F,
    calls: Cell<usize>,
}

impl<F> FnDecoder<F>
where
    F: Fn(&PixelBuffer, InversionMode) -> Result<Option<String>, DecodeFault>,
{
    pub fn new(f: F) -> Self {
        Self { f, calls: Cell::new(0) }
    }
}

impl<F> FnDecoder<F> {
    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl<F> QrDecoder for FnDecoder<F>
where
    F: Fn(&PixelBuffer, InversionMode) -> Result<Option<String>, DecodeFault>,
{
    fn try_decode(
        &self,
        image: &PixelBuffer,
        mode: InversionMode,
    ) -> Result<Option<String>, DecodeFault> {
        self.calls.set(self.calls.get() + 1);
        (self.f)(image, mode)
    }
}

/// Hands out a fixed decoder immediately.
pub struct StaticLoader {
    decoder: Rc<dyn QrDecoder>,
}

impl StaticLoader {
    pub fn new(decoder: Rc<dyn QrDecoder>) -> Self {
        Self { decoder }
    }
}

#[async_trait(?Send)]
impl DecoderLoader for StaticLoader {
    async fn load(&self) -> Result<Rc<dyn QrDecoder>, LibraryLoadError> {
        Ok(self.decoder.clone())
    }
}

/// Hands out a decoder once a permit is added to `gate`.
pub struct GatedLoader {
    gate: Rc<Semaphore>,
    decoder: Rc<dyn QrDecoder>,
}

impl GatedLoader {
    pub fn new(gate: Rc<Semaphore>, decoder: Rc<dyn QrDecoder>) -> Self {
        Self { gate, decoder }
    }
}

#[async_trait(?Send)]
impl DecoderLoader for GatedLoader {
    async fn load(&self) -> Result<Rc<dyn QrDecoder>, LibraryLoadError> {
        self.gate.acquire().await.expect("gate closed").forget();
        Ok(self.decoder.clone())
    }
}

// ── Classifier ─────────────────────────────────────────────────────

pub fn classification_for(url: &str) -> Classification {
    Classification {
        url: url.to_string(),
        prediction: "legitimate".to_string(),
        is_safe: true,
        risk_score: 4.2,
        confidence: 95.8,
        model_used: "RandomForest".to_string(),
        features: UrlFeatures::default(),
        domain: None,
        risk_level: Some("Low".to_string()),
    }
}

type Respond = Box<dyn Fn(&str) -> Result<Classification, NetworkError>>;

/// Scripted classifier. Records every URL it is asked about; when gated,
/// each call waits for its own permit before answering.
pub struct FakeClassifier {
    respond: Respond,
    gate: Option<Rc<Semaphore>>,
    calls: RefCell<Vec<String>>,
}

impl FakeClassifier {
    /// Answers "legitimate" for whatever URL it is given.
    pub fn echo() -> Self {
        Self::responding(|url| Ok(classification_for(url)))
    }

    pub fn failing(err: NetworkError) -> Self {
        Self::responding(move |_| Err(err.clone()))
    }

    pub fn responding(f: impl Fn(&str) -> Result<Classification, NetworkError> + 'static) -> Self {
        Self { respond: Box::new(f), gate: None, calls: RefCell::new(Vec::new()) }
    }

    pub fn gated(mut self, gate: Rc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

#[async_trait(?Send)]
impl Classifier for FakeClassifier {
    async fn classify(&self, url: &str) -> Result<Classification, NetworkError> {
        self.calls.borrow_mut().push(url.to_string());
        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        (self.respond)(url)
    }

    async fn service_status(&self) -> ServiceStatus {
        ServiceStatus {
            health: Some(HealthInfo {
                status: "ok".to_string(),
                message: "running".to_string(),
                model_status: "loaded".to_string(),
            }),
            model: Some(ModelInfo { model_loaded: true, ..ModelInfo::default() }),
            errors: Vec::new(),
        }
    }
}
