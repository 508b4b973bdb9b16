//! One-time, timeout-gated acquisition of the QR decode capability.
//!
//! The first scan (or an explicit preload) awaits the loader under a fixed
//! timeout. Success is cached for the lifetime of the slot; a failure or a
//! timeout is not, so the next scan retries the load.

use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::OnceCell;

use super::decode::{QrDecoder, RqrrDecoder};
use crate::error::LibraryLoadError;

#[async_trait(?Send)]
pub trait DecoderLoader {
    async fn load(&self) -> Result<Rc<dyn QrDecoder>, LibraryLoadError>;
}

/// The statically linked `rqrr` decoder; always available.
#[derive(Debug, Default)]
pub struct BuiltinLoader;

#[async_trait(?Send)]
impl DecoderLoader for BuiltinLoader {
    async fn load(&self) -> Result<Rc<dyn QrDecoder>, LibraryLoadError> {
        Ok(Rc::new(RqrrDecoder))
    }
}

pub struct DecoderSlot {
    loader: Box<dyn DecoderLoader>,
    timeout: Duration,
    decoder: OnceCell<Rc<dyn QrDecoder>>,
}

impl DecoderSlot {
    pub fn new(loader: Box<dyn DecoderLoader>, timeout: Duration) -> Self {
        Self { loader, timeout, decoder: OnceCell::new() }
    }

    pub fn is_loaded(&self) -> bool {
        self.decoder.initialized()
    }

    /// Return the decoder, loading it first if needed. Concurrent callers
    /// share one in-flight load.
    pub async fn get(&self) -> Result<Rc<dyn QrDecoder>, LibraryLoadError> {
        self.decoder
            .get_or_try_init(|| async {
                tracing::debug!(timeout = ?self.timeout, "loading QR decoder");
                match tokio::time::timeout(self.timeout, self.loader.load()).await {
                    Ok(result) => result,
                    Err(_) => Err(LibraryLoadError::Timeout(self.timeout)),
                }
            })
            .await
            .cloned()
    }
}
