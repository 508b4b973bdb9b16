//! Presenter sinks. The controller pushes every transition here and never
//! touches a presentation surface itself.

use std::cell::RefCell;
use std::rc::Rc;

use crate::session::state::{EventPayload, SessionEvent, SessionState};

pub trait Presenter {
    fn present(&self, event: &SessionEvent);
}

impl<P: Presenter + ?Sized> Presenter for Rc<P> {
    fn present(&self, event: &SessionEvent) {
        (**self).present(event)
    }
}

/// Writes each event to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPresenter;

impl Presenter for LogPresenter {
    fn present(&self, event: &SessionEvent) {
        let generation = event.generation;
        let state = event.state;
        match &event.payload {
            EventPayload::Failed { failure } => {
                tracing::warn!(generation, ?state, message = %failure.message, "scan failed")
            }
            EventPayload::Rejected { message, .. } => {
                tracing::warn!(generation, ?state, %message, "file rejected")
            }
            EventPayload::Result { result, risk } => {
                tracing::info!(generation, ?state, url = %result.url, prediction = %result.prediction, ?risk, "classified")
            }
            EventPayload::DecodedUrl { url } => tracing::info!(generation, ?state, %url, "QR decoded"),
            EventPayload::FileSelected { image } => {
                tracing::info!(generation, ?state, name = %image.name, size = image.size_bytes, "file selected")
            }
            EventPayload::None => tracing::info!(generation, ?state, "session updated"),
        }
    }
}

/// Keeps every event in order; the command table reads the latest one and
/// tests inspect the whole history.
#[derive(Debug, Default)]
pub struct RecordingPresenter {
    events: RefCell<Vec<SessionEvent>>,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SessionEvent> {
        self.events.borrow().clone()
    }

    pub fn last(&self) -> Option<SessionEvent> {
        self.events.borrow().last().cloned()
    }

    pub fn states(&self) -> Vec<SessionState> {
        self.events.borrow().iter().map(|e| e.state).collect()
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }
}

impl Presenter for RecordingPresenter {
    fn present(&self, event: &SessionEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

/// Fans one event out to several sinks.
pub struct Tee<A, B>(pub A, pub B);

impl<A: Presenter, B: Presenter> Presenter for Tee<A, B> {
    fn present(&self, event: &SessionEvent) {
        self.0.present(event);
        self.1.present(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(state: SessionState) -> SessionEvent {
        SessionEvent { generation: 1, state, payload: EventPayload::None }
    }

    #[test]
    fn recording_keeps_order() {
        let rec = RecordingPresenter::new();
        rec.present(&event(SessionState::FileSelected));
        rec.present(&event(SessionState::Decoding));
        assert_eq!(rec.states(), vec![SessionState::FileSelected, SessionState::Decoding]);
        assert_eq!(rec.last().map(|e| e.state), Some(SessionState::Decoding));
    }

    #[test]
    fn tee_reaches_both_sinks() {
        let a = Rc::new(RecordingPresenter::new());
        let b = Rc::new(RecordingPresenter::new());
        let tee = Tee(a.clone(), Tee(b.clone(), LogPresenter));
        tee.present(&event(SessionState::Idle));
        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 1);
    }
}
