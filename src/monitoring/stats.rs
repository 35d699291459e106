use crate::core::mode::PolicyMode;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

#[derive(Debug)]
pub struct CspStats {
    request_count: AtomicUsize,
    secure_count: AtomicUsize,
    insecure_count: AtomicUsize,
    nonce_generation_count: AtomicUsize,
    nonce_failure_count: AtomicUsize,
    rejected_host_count: AtomicUsize,
    session_established_count: AtomicUsize,
    start_time: Instant,
}

impl Default for CspStats {
    fn default() -> Self {
        Self {
            request_count: Default::default(),
            secure_count: Default::default(),
            insecure_count: Default::default(),
            nonce_generation_count: Default::default(),
            nonce_failure_count: Default::default(),
            rejected_host_count: Default::default(),
            session_established_count: Default::default(),
            start_time: Instant::now(),
        }
    }
}

impl CspStats {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn mode_count(&self, mode: PolicyMode) -> usize {
        match mode {
            PolicyMode::Secure => self.secure_count.load(Ordering::Relaxed),
            PolicyMode::Insecure => self.insecure_count.load(Ordering::Relaxed),
        }
    }

    #[inline]
    pub fn nonce_generation_count(&self) -> usize {
        self.nonce_generation_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn nonce_failure_count(&self) -> usize {
        self.nonce_failure_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn rejected_host_count(&self) -> usize {
        self.rejected_host_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn session_established_count(&self) -> usize {
        self.session_established_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    #[inline]
    pub(crate) fn increment_request_count(&self) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn increment_mode_count(&self, mode: PolicyMode) {
        match mode {
            PolicyMode::Secure => self.secure_count.fetch_add(1, Ordering::Relaxed),
            PolicyMode::Insecure => self.insecure_count.fetch_add(1, Ordering::Relaxed),
        };
    }

    #[inline]
    pub(crate) fn increment_nonce_generation_count(&self) {
        self.nonce_generation_count.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn increment_nonce_failure_count(&self) {
        self.nonce_failure_count.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn increment_rejected_host_count(&self) {
        self.rejected_host_count.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn increment_session_established_count(&self) {
        self.session_established_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            requests: self.request_count(),
            secure_requests: self.mode_count(PolicyMode::Secure),
            insecure_requests: self.mode_count(PolicyMode::Insecure),
            nonces_generated: self.nonce_generation_count(),
            nonce_failures: self.nonce_failure_count(),
            rejected_hosts: self.rejected_host_count(),
            sessions_established: self.session_established_count(),
            uptime_secs: self.uptime_secs(),
        }
    }
}

/// Point-in-time copy of [`CspStats`], serializable for status endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub requests: usize,
    pub secure_requests: usize,
    pub insecure_requests: usize,
    pub nonces_generated: usize,
    pub nonce_failures: usize,
    pub rejected_hosts: usize,
    pub sessions_established: usize,
    pub uptime_secs: u64,
}

impl fmt::Display for CspStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "CSP Statistics:")?;
        writeln!(f, "  Requests: {}", self.request_count())?;
        writeln!(
            f,
            "  Secure / Insecure: {} / {}",
            self.mode_count(PolicyMode::Secure),
            self.mode_count(PolicyMode::Insecure)
        )?;
        writeln!(f, "  Nonces Generated: {}", self.nonce_generation_count())?;
        writeln!(f, "  Nonce Failures: {}", self.nonce_failure_count())?;
        writeln!(f, "  Rejected Hosts: {}", self.rejected_host_count())?;
        writeln!(f, "  Sessions Established: {}", self.session_established_count())?;
        write!(f, "  Uptime: {}s", self.uptime_secs())
    }
}
