pub use crate::core::{
    build_policy, CspConfig, CspConfigBuilder, CspPolicy, Environment, ModeHandle, PolicyMode,
    Source,
};
pub use crate::middleware::{configure_csp, csp_middleware, CspExtensions, CspMiddleware};
pub use crate::monitoring::CspStats;
pub use crate::security::{NonceGenerator, RequestNonce};
pub use crate::session::SessionNonceStore;
