pub mod app;
pub mod constants;
pub mod core;
pub mod error;
pub mod middleware;
pub mod monitoring;
pub mod prelude;
pub mod security;
pub mod session;
mod utils;

// Re-export commonly used types for convenience
pub use crate::core::{
    build_policy, extract_nonce, parse_policy, CspConfig, CspConfigBuilder, CspPolicy,
    CspPolicyBuilder, CspSettings, Environment, FixedMode, ModeHandle, ModeSource, PolicyMode,
    Source,
};
pub use error::CspError;
pub use middleware::{configure_csp, csp_middleware, CspExtensions, CspMiddleware};
pub use monitoring::{CspStats, StatsSnapshot};
pub use security::{NonceGenerator, OsRandom, RandomSource, RequestNonce};
pub use session::{SessionId, SessionNonce, SessionNonceStore};
