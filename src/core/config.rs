use crate::core::mode::{Environment, FixedMode, ModeSource, PolicyMode};
use crate::core::policy::{build_policy, CspPolicy};
use crate::error::CspError;
use crate::monitoring::stats::CspStats;
use crate::security::nonce::NonceGenerator;
use crate::session::SessionNonceStore;
use std::fmt;
use std::sync::Arc;

/// Everything the CSP middleware needs to build a policy for a request.
#[derive(Clone)]
pub struct CspConfig {
    mode_source: Arc<dyn ModeSource>,
    environment: Environment,
    nonce_generator: Arc<NonceGenerator>,
    session_store: Option<Arc<SessionNonceStore>>,
    stats: Arc<CspStats>,
}

impl fmt::Debug for CspConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CspConfig")
            .field("mode", &self.current_mode())
            .field("environment", &self.environment)
            .field("nonce_generator", &self.nonce_generator)
            .field("sessions", &self.session_store.as_ref().map(|s| s.len()))
            .finish()
    }
}

impl CspConfig {
    pub fn new(mode_source: impl ModeSource, environment: Environment) -> Self {
        Self {
            mode_source: Arc::new(mode_source),
            environment,
            nonce_generator: Arc::new(NonceGenerator::new()),
            session_store: None,
            stats: Arc::new(CspStats::new()),
        }
    }

    /// Reads the mode for the request being handled.
    #[inline]
    pub fn current_mode(&self) -> PolicyMode {
        self.mode_source.current_mode()
    }

    #[inline]
    pub fn environment(&self) -> Environment {
        self.environment
    }

    #[inline]
    pub fn nonce_generator(&self) -> &Arc<NonceGenerator> {
        &self.nonce_generator
    }

    #[inline]
    pub fn session_store(&self) -> Option<&Arc<SessionNonceStore>> {
        self.session_store.as_ref()
    }

    #[inline]
    pub fn stats(&self) -> &Arc<CspStats> {
        &self.stats
    }

    pub fn generate_nonce(&self) -> Result<String, CspError> {
        match self.nonce_generator.generate() {
            Ok(nonce) => {
                self.stats.increment_nonce_generation_count();
                Ok(nonce)
            }
            Err(err) => {
                self.stats.increment_nonce_failure_count();
                Err(err)
            }
        }
    }

    /// Builds the policy for `mode`, using this config's environment.
    pub fn policy_for(
        &self,
        mode: PolicyMode,
        host: &str,
        nonce: &str,
    ) -> Result<CspPolicy, CspError> {
        build_policy(mode, self.environment, host, nonce).map_err(|err| {
            if matches!(err, CspError::InvalidHost(_)) {
                self.stats.increment_rejected_host_count();
            }
            err
        })
    }
}

impl Default for CspConfig {
    fn default() -> Self {
        CspConfigBuilder::new().build()
    }
}

#[derive(Default)]
pub struct CspConfigBuilder {
    mode_source: Option<Arc<dyn ModeSource>>,
    environment: Option<Environment>,
    nonce_generator: Option<NonceGenerator>,
    session_store: Option<Arc<SessionNonceStore>>,
    stats: Option<Arc<CspStats>>,
}

impl CspConfigBuilder {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a mode fixed for the life of the config.
    #[inline]
    pub fn mode(self, mode: PolicyMode) -> Self {
        self.mode_source(FixedMode(mode))
    }

    #[inline]
    pub fn mode_source(mut self, source: impl ModeSource) -> Self {
        self.mode_source = Some(Arc::new(source));
        self
    }

    #[inline]
    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = Some(environment);
        self
    }

    #[inline]
    pub fn nonce_generator(mut self, generator: NonceGenerator) -> Self {
        self.nonce_generator = Some(generator);
        self
    }

    #[inline]
    pub fn session_store(mut self, store: Arc<SessionNonceStore>) -> Self {
        self.session_store = Some(store);
        self
    }

    #[inline]
    pub fn stats(mut self, stats: Arc<CspStats>) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Missing pieces default to Secure mode, Production, the OS random
    /// source, and no session store.
    pub fn build(self) -> CspConfig {
        CspConfig {
            mode_source: self
                .mode_source
                .unwrap_or_else(|| Arc::new(FixedMode(PolicyMode::Secure))),
            environment: self.environment.unwrap_or_default(),
            nonce_generator: Arc::new(self.nonce_generator.unwrap_or_default()),
            session_store: self.session_store,
            stats: self.stats.unwrap_or_default(),
        }
    }
}
