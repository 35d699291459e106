pub mod config;
pub mod directives;
pub mod mode;
pub mod parse;
pub mod policy;
pub mod settings;
pub mod source;

pub use config::{CspConfig, CspConfigBuilder};
pub use directives::*;
pub use mode::{Environment, FixedMode, ModeHandle, ModeSource, PolicyMode};
pub use parse::{extract_nonce, nonces_in, parse_policy};
pub use policy::{build_policy, CspPolicy, CspPolicyBuilder};
pub use settings::CspSettings;
pub use source::Source;
