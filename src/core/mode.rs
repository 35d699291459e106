use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr, sync::Arc};

use crate::error::CspError;

/// Which policy flavor to emit.
///
/// `Secure` is the default: any missing or unrecognized setting resolves to
/// it, so a bad config never opens the policy up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PolicyMode {
    #[default]
    Secure,
    Insecure,
}

impl PolicyMode {
    /// Case-insensitive parse. Returns `None` for anything other than
    /// `secure` or `insecure`.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("secure") {
            Some(Self::Secure)
        } else if value.eq_ignore_ascii_case("insecure") {
            Some(Self::Insecure)
        } else {
            None
        }
    }

    /// Resolves an optional raw setting, failing closed.
    pub fn from_setting(value: Option<&str>) -> Self {
        match value {
            None => Self::Secure,
            Some(raw) => Self::parse(raw).unwrap_or_else(|| {
                log::warn!("unrecognized CSP mode {:?}, falling back to Secure", raw);
                Self::Secure
            }),
        }
    }

    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Secure => "Secure",
            Self::Insecure => "Insecure",
        }
    }

    #[inline]
    pub const fn is_secure(&self) -> bool {
        matches!(self, Self::Secure)
    }
}

impl fmt::Display for PolicyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyMode {
    type Err = CspError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| CspError::ConfigError(format!("unknown CSP mode: {}", s)))
    }
}

/// Hosting environment, fixed at process start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl Environment {
    /// `development`/`dev` (any case) selects Development; everything else,
    /// including absence, is Production.
    pub fn from_value(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("development") || v.eq_ignore_ascii_case("dev") => {
                Self::Development
            }
            _ => Self::Production,
        }
    }

    /// Reads `APP_ENVIRONMENT`.
    pub fn from_env() -> Self {
        let value = std::env::var(crate::constants::ENVIRONMENT_ENV_VAR).ok();
        Self::from_value(value.as_deref())
    }

    #[inline]
    pub const fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "Development",
            Self::Production => "Production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the middleware reads the mode from on every request.
pub trait ModeSource: Send + Sync + 'static {
    fn current_mode(&self) -> PolicyMode;
}

/// A mode resolved once at startup.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedMode(pub PolicyMode);

impl ModeSource for FixedMode {
    #[inline]
    fn current_mode(&self) -> PolicyMode {
        self.0
    }
}

/// A mode that can be swapped while the server runs. Readers never block.
#[derive(Debug, Clone)]
pub struct ModeHandle {
    mode: Arc<ArcSwap<PolicyMode>>,
}

impl ModeHandle {
    pub fn new(mode: PolicyMode) -> Self {
        Self {
            mode: Arc::new(ArcSwap::from_pointee(mode)),
        }
    }

    #[inline]
    pub fn get(&self) -> PolicyMode {
        **self.mode.load()
    }

    /// Stores `mode` and returns the one it replaced.
    pub fn set(&self, mode: PolicyMode) -> PolicyMode {
        let previous = *self.mode.swap(Arc::new(mode));
        if previous != mode {
            log::info!("CSP mode changed from {} to {}", previous, mode);
        }
        previous
    }

    /// Re-reads the settings file and environment, then stores the result.
    pub fn reload_from(&self, path: Option<&std::path::Path>) -> PolicyMode {
        let mode = crate::core::settings::CspSettings::load(path).mode;
        self.set(mode);
        mode
    }
}

impl Default for ModeHandle {
    fn default() -> Self {
        Self::new(PolicyMode::default())
    }
}

impl ModeSource for ModeHandle {
    #[inline]
    fn current_mode(&self) -> PolicyMode {
        self.get()
    }
}
