//! The scan-session state machine.
//!
//! ```text
//! Idle → FileSelected → Decoding ─┬→ DecodeFailed
//!                                 └→ Dispatching ─┬→ DispatchFailed
//!                                                 └→ Succeeded
//! ```
//!
//! The controller is the only owner of session data. It runs on a single
//! thread: every method takes `&self`, and asynchronous work (decoder load,
//! image load, the classifier round trip) is awaited in place. Each session
//! carries a generation number; a result arriving after the user selected a
//! new file or reset is dropped instead of applied.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use crate::classifier::{Classifier, ServiceStatus};
use crate::config::ScannerConfig;
use crate::error::{CommandError, DecodeError, ScanError, ValidationError};
use crate::presenter::Presenter;
use crate::scan::loader::{BuiltinLoader, DecoderLoader, DecoderSlot};
use crate::scan::validate::{self, CandidateFile};
use crate::scan;
use crate::session::state::{
    EventPayload, Failure, ScanSession, SelectedImage, SessionEvent, SessionSnapshot, SessionState,
};

pub struct ScanSessionController<P: Presenter> {
    session: RefCell<ScanSession>,
    last_generation: Cell<u64>,
    decoder: DecoderSlot,
    classifier: Box<dyn Classifier>,
    presenter: P,
}

impl<P: Presenter> ScanSessionController<P> {
    /// Controller backed by the built-in `rqrr` decoder.
    pub fn new(config: &ScannerConfig, classifier: Box<dyn Classifier>, presenter: P) -> Self {
        Self::with_decoder_loader(
            Box::new(BuiltinLoader),
            config.decoder_load_timeout(),
            classifier,
            presenter,
        )
    }

    pub fn with_decoder_loader(
        loader: Box<dyn DecoderLoader>,
        load_timeout: Duration,
        classifier: Box<dyn Classifier>,
        presenter: P,
    ) -> Self {
        Self {
            session: RefCell::new(ScanSession::fresh(0)),
            last_generation: Cell::new(0),
            decoder: DecoderSlot::new(loader, load_timeout),
            classifier,
            presenter,
        }
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn state(&self) -> SessionState {
        self.session.borrow().state()
    }

    pub fn generation(&self) -> u64 {
        self.session.borrow().generation()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.session.borrow().snapshot()
    }

    pub fn decoded_url(&self) -> Option<String> {
        self.session.borrow().decoded_url().map(str::to_string)
    }

    // ── Commands ───────────────────────────────────────────────────

    /// Validate a candidate file. On acceptance a new session starts in
    /// `FileSelected`, abandoning whatever the previous one was doing.
    /// A rejection leaves the session untouched.
    pub fn select_file(&self, file: Option<CandidateFile>) -> Result<(), ValidationError> {
        match validate::validate(file) {
            Ok(image) => {
                let summary = image.summary();
                let generation = self.replace_session(|s| {
                    s.state = SessionState::FileSelected;
                    s.current_image = Some(Rc::new(image));
                });
                tracing::info!(generation, name = %summary.name, "file selected");
                self.emit(generation, SessionState::FileSelected, EventPayload::FileSelected { image: summary });
                Ok(())
            }
            Err(err) => {
                tracing::info!(reason = %err, "file rejected");
                let (generation, state) = {
                    let s = self.session.borrow();
                    (s.generation(), s.state())
                };
                self.emit(generation, state, EventPayload::rejected(&err));
                Err(err)
            }
        }
    }

    /// Decode the selected image and, on success, classify the URL.
    ///
    /// Only valid from `FileSelected`. While a scan or dispatch is
    /// outstanding this returns `Busy` and emits nothing.
    pub async fn start_scan(&self) -> Result<(), CommandError> {
        let (generation, image) = {
            let mut s = self.session.borrow_mut();
            match s.state {
                SessionState::Decoding | SessionState::Dispatching => {
                    tracing::debug!(generation = s.generation, "scan already in flight");
                    return Err(CommandError::Busy);
                }
                SessionState::FileSelected => {}
                _ => return Err(CommandError::NoFileSelected),
            }
            let Some(image) = s.current_image.clone() else {
                return Err(CommandError::NoFileSelected);
            };
            s.state = SessionState::Decoding;
            (s.generation, image)
        };
        self.emit(generation, SessionState::Decoding, EventPayload::None);

        match self.decode(generation, &image).await {
            Some(Ok(url)) => self.dispatch(generation, url).await,
            Some(Err(err)) => self.fail(generation, SessionState::DecodeFailed, err),
            None => {}
        }
        Ok(())
    }

    /// Classify a typed URL without an image.
    pub async fn submit_url(&self, url: &str) -> Result<(), CommandError> {
        let url = url.trim();
        if url.is_empty() {
            let err = ValidationError::EmptyUrl;
            let (generation, state) = {
                let s = self.session.borrow();
                (s.generation(), s.state())
            };
            self.emit(generation, state, EventPayload::rejected(&err));
            return Err(err.into());
        }
        if self.state().is_busy() {
            return Err(CommandError::Busy);
        }
        let generation = self.replace_session(|_| {});
        self.dispatch(generation, url.to_string()).await;
        Ok(())
    }

    /// Drop the current session and return to `Idle`.
    pub fn reset(&self) {
        let generation = self.replace_session(|_| {});
        tracing::info!(generation, "session reset");
        self.emit(generation, SessionState::Idle, EventPayload::None);
    }

    /// Load the decoder ahead of the first scan. Failures are logged and the
    /// load is retried by the next scan.
    pub async fn preload_decoder(&self) -> bool {
        match self.decoder.get().await {
            Ok(_) => true,
            Err(err) => {
                tracing::warn!(error = %err, "QR decoder preload failed");
                false
            }
        }
    }

    /// Probe the classification service. Informational only.
    pub async fn check_service_status(&self) -> ServiceStatus {
        self.classifier.service_status().await
    }

    // ── Stages ─────────────────────────────────────────────────────

    /// `None` when the session went stale while waiting.
    async fn decode(
        &self,
        generation: u64,
        image: &SelectedImage,
    ) -> Option<Result<String, ScanError>> {
        let decoder = match self.decoder.get().await {
            Ok(decoder) => decoder,
            Err(err) => return self.is_current(generation).then(|| Err(err.into())),
        };
        // Image load completes on a later turn.
        tokio::task::yield_now().await;
        if !self.is_current(generation) {
            tracing::warn!(generation, "discarding stale decode");
            return None;
        }

        let result = scan::scan_bytes(image.bytes(), decoder.as_ref()).and_then(|report| {
            tracing::info!(generation, attempts = report.attempts.len(), found = report.payload.is_some(), "decode finished");
            report.payload.ok_or(DecodeError::NoQrFound)
        });
        Some(result.map_err(ScanError::from))
    }

    async fn dispatch(&self, generation: u64, url: String) {
        let applied = self.update(generation, |s| {
            s.state = SessionState::Dispatching;
            s.decoded_url = Some(url.clone());
            EventPayload::DecodedUrl { url: url.clone() }
        });
        if !applied {
            return;
        }

        let result = self.classifier.classify(&url).await;

        match result {
            Ok(classification) => {
                self.update(generation, |s| {
                    s.state = SessionState::Succeeded;
                    s.classifier_result = Some(classification.clone());
                    EventPayload::Result { risk: classification.risk_band(), result: classification }
                });
            }
            Err(err) => self.fail(generation, SessionState::DispatchFailed, err.into()),
        }
    }

    fn fail(&self, generation: u64, state: SessionState, err: ScanError) {
        let failure = Failure::from(&err);
        self.update(generation, |s| {
            s.state = state;
            s.failure = Some(failure.clone());
            EventPayload::Failed { failure }
        });
    }

    // ── Session bookkeeping ────────────────────────────────────────

    fn is_current(&self, generation: u64) -> bool {
        self.session.borrow().generation == generation
    }

    /// Start a fresh session, let `init` fill it, and return its generation.
    fn replace_session(&self, init: impl FnOnce(&mut ScanSession)) -> u64 {
        let generation = self.last_generation.get() + 1;
        self.last_generation.set(generation);
        let mut session = ScanSession::fresh(generation);
        init(&mut session);
        *self.session.borrow_mut() = session;
        generation
    }

    /// Apply `f` if `generation` is still current, then notify. Returns
    /// whether the update was applied.
    fn update(&self, generation: u64, f: impl FnOnce(&mut ScanSession) -> EventPayload) -> bool {
        let (state, payload) = {
            let mut s = self.session.borrow_mut();
            if s.generation != generation {
                tracing::warn!(stale = generation, current = s.generation, "discarding stale result");
                return false;
            }
            let payload = f(&mut *s);
            (s.state, payload)
        };
        tracing::info!(generation, ?state, "session transition");
        self.emit(generation, state, payload);
        true
    }

    fn emit(&self, generation: u64, state: SessionState, payload: EventPayload) {
        self.presenter.present(&SessionEvent { generation, state, payload });
    }
}

// ── Tests ──────────────────────────────────────────────────────────
