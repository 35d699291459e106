use crate::constants::DEFAULT_NONCE_LENGTH;
use crate::error::CspError;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use std::{
    fmt,
    ops::Deref,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

/// Fills buffers with cryptographically secure random bytes.
pub trait RandomSource: Send + Sync + 'static {
    fn fill(&self, buffer: &mut [u8]) -> Result<(), CspError>;
}

/// The operating system CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    #[inline]
    fn fill(&self, buffer: &mut [u8]) -> Result<(), CspError> {
        getrandom::getrandom(buffer).map_err(|e| CspError::CryptoError(e.to_string()))
    }
}

/// Produces a fresh base64 nonce on every call. Nothing is cached or reused.
#[derive(Clone)]
pub struct NonceGenerator {
    length: usize,
    source: Arc<dyn RandomSource>,
    generated: Arc<AtomicUsize>,
}

impl fmt::Debug for NonceGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NonceGenerator")
            .field("length", &self.length)
            .field("generated", &self.generated())
            .finish()
    }
}

impl NonceGenerator {
    #[inline]
    pub fn new() -> Self {
        Self::with_length(DEFAULT_NONCE_LENGTH)
    }

    /// A zero length falls back to the default.
    pub fn with_length(length: usize) -> Self {
        Self {
            length: if length == 0 { DEFAULT_NONCE_LENGTH } else { length },
            source: Arc::new(OsRandom),
            generated: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_source(mut self, source: impl RandomSource) -> Self {
        self.source = Arc::new(source);
        self
    }

    /// Draws `length` bytes and base64-encodes them.
    ///
    /// # Errors
    ///
    /// Returns [`CspError::CryptoError`] if the random source fails. There
    /// is no fallback generator.
    pub fn generate(&self) -> Result<String, CspError> {
        let mut buffer = vec![0u8; self.length];
        self.source.fill(&mut buffer).map_err(|err| {
            log::error!("secure random source unavailable: {}", err);
            err
        })?;

        self.generated.fetch_add(1, Ordering::Relaxed);
        Ok(BASE64.encode(&buffer))
    }

    #[inline]
    pub fn length(&self) -> usize {
        self.length
    }

    #[inline]
    pub fn generated(&self) -> usize {
        self.generated.load(Ordering::Relaxed)
    }
}

impl Default for NonceGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// The nonce for the request currently being handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestNonce(pub String);

impl RequestNonce {
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for RequestNonce {
    type Target = String;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for RequestNonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
