use crate::constants::MODE_ENV_VAR;
use crate::core::mode::PolicyMode;
use crate::error::CspError;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    csp: CspSection,
}

#[derive(Debug, Default, Deserialize)]
struct CspSection {
    // Kept as a raw string so an unknown value degrades to Secure instead of
    // failing the whole file.
    mode: Option<String>,
}

/// Application-level CSP settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CspSettings {
    pub mode: PolicyMode,
}

impl CspSettings {
    /// Parses the `[csp]` table of a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, CspError> {
        let file: SettingsFile =
            toml::from_str(source).map_err(|e| CspError::ConfigError(e.to_string()))?;
        Ok(Self::resolve(file.csp.mode.as_deref(), None))
    }

    /// Combines a file value with an environment override. The override wins
    /// when present; absence of both means Secure.
    pub fn resolve(file_mode: Option<&str>, env_mode: Option<&str>) -> Self {
        Self {
            mode: PolicyMode::from_setting(env_mode.or(file_mode)),
        }
    }

    /// Loads settings from `path` (if any) and `CSP_MODE`. Read and parse
    /// failures are logged and treated as an absent setting.
    pub fn load(path: Option<&Path>) -> Self {
        let file_mode = path.and_then(|path| match read_file_mode(path) {
            Ok(mode) => mode,
            Err(err) => {
                log::warn!(
                    "could not read CSP settings from {}: {}; treating mode as absent",
                    path.display(),
                    err
                );
                None
            }
        });
        let env_mode = std::env::var(MODE_ENV_VAR).ok();

        let settings = Self::resolve(file_mode.as_deref(), env_mode.as_deref());
        log::debug!("resolved CSP mode: {}", settings.mode);
        settings
    }
}

fn read_file_mode(path: &Path) -> Result<Option<String>, CspError> {
    let contents = std::fs::read_to_string(path)?;
    let file: SettingsFile =
        toml::from_str(&contents).map_err(|e| CspError::ConfigError(e.to_string()))?;
    Ok(file.csp.mode)
}
