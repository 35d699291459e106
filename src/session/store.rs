use crate::constants::{DEFAULT_SESSION_CAPACITY, DEFAULT_SESSION_COOKIE};
use lru::LruCache;
use parking_lot::{Mutex, RwLock};
use std::{borrow::Cow, fmt, num::NonZeroUsize, sync::Arc};

/// The nonce that was current when a session was established.
///
/// Written once, then read for the session's lifetime. Later writes are
/// ignored so every reader sees the same value.
#[derive(Debug, Default)]
pub struct SessionNonce {
    value: RwLock<Option<String>>,
}

impl SessionNonce {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `nonce` if nothing is stored yet. Returns `true` when this call
    /// did the write.
    pub fn establish(&self, nonce: &str) -> bool {
        if self.value.read().is_some() {
            return false;
        }

        let mut value = self.value.write();
        if value.is_some() {
            return false;
        }
        *value = Some(nonce.to_owned());
        true
    }

    #[inline]
    pub fn get(&self) -> Option<String> {
        self.value.read().clone()
    }

    #[inline]
    pub fn is_established(&self) -> bool {
        self.value.read().is_some()
    }
}

/// Session id to [`SessionNonce`] holders, bounded by an LRU.
///
/// Once `capacity` sessions are held, establishing another evicts the one
/// least recently seen. A request presenting an evicted id starts over with
/// a new session.
pub struct SessionNonceStore {
    sessions: Mutex<LruCache<String, Arc<SessionNonce>>>,
    cookie_name: Cow<'static, str>,
}

impl SessionNonceStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_SESSION_CAPACITY)
    }

    /// A capacity of zero falls back to the default.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity)
            .or_else(|| NonZeroUsize::new(DEFAULT_SESSION_CAPACITY))
            .unwrap_or(NonZeroUsize::MIN);

        Self {
            sessions: Mutex::new(LruCache::new(capacity)),
            cookie_name: Cow::Borrowed(DEFAULT_SESSION_COOKIE),
        }
    }

    pub fn with_cookie_name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.cookie_name = name.into();
        self
    }

    #[inline]
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.sessions.lock().cap().get()
    }

    /// Returns the holder for `session_id`, writing `nonce` into it if the
    /// session is new. An existing session keeps its original nonce.
    pub fn establish(&self, session_id: &str, nonce: &str) -> (Arc<SessionNonce>, bool) {
        let holder = {
            let mut sessions = self.sessions.lock();
            let existing = sessions.get(session_id).cloned();
            match existing {
                Some(holder) => holder,
                None => {
                    let holder = Arc::new(SessionNonce::new());
                    if let Some((evicted, _)) = sessions.push(session_id.to_owned(), holder.clone()) {
                        log::debug!("session {} evicted", evicted);
                    }
                    holder
                }
            }
        };

        let created = holder.establish(nonce);
        if created {
            log::debug!("session {} established with a new nonce", session_id);
        }
        (holder, created)
    }

    /// Looks the session up and marks it as recently used.
    #[inline]
    pub fn holder(&self, session_id: &str) -> Option<Arc<SessionNonce>> {
        self.sessions.lock().get(session_id).cloned()
    }

    #[inline]
    pub fn get(&self, session_id: &str) -> Option<String> {
        self.holder(session_id).and_then(|holder| holder.get())
    }

    /// Discards the session. Returns `true` if it existed.
    pub fn end(&self, session_id: &str) -> bool {
        let removed = self.sessions.lock().pop(session_id).is_some();
        if removed {
            log::debug!("session {} ended", session_id);
        }
        removed
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }

    #[inline]
    pub fn clear(&self) {
        self.sessions.lock().clear();
    }
}

impl fmt::Debug for SessionNonceStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sessions = self.sessions.lock();
        f.debug_struct("SessionNonceStore")
            .field("sessions", &sessions.len())
            .field("capacity", &sessions.cap())
            .field("cookie_name", &self.cookie_name)
            .finish()
    }
}

impl Default for SessionNonceStore {
    fn default() -> Self {
        Self::new()
    }
}
