//! Environment lookups and path-variable resolution.
//!
//! Stored paths may carry `${HOME}`, `${APPDATA}`, `${XDG_CONFIG_HOME}` and
//! `${LOCALAPPDATA}` tokens. [`PathVars`] captures their values once and
//! [`PathVars::resolve`] substitutes them without touching process state again.

use std::path::{PathBuf, MAIN_SEPARATOR};

use crate::error::{Error, Result};

const APP_DIR_NAME: &str = "skills-manager";
const SYSTEM_CONFIG_FILE: &str = "config.yaml";

/// Returns the user's home directory.
pub fn home_dir() -> Result<PathBuf> {
    #[cfg(unix)]
    if let Ok(home) = std::env::var("HOME") {
        return Ok(PathBuf::from(home));
    }
    dirs::home_dir().ok_or_else(|| Error::Invalid("home directory not found".into()))
}

/// Returns the fixed path of the system-level config file.
///
/// `SKILLS_MANAGER_CONFIG` overrides the default
/// `{config_dir}/skills-manager/config.yaml`.
pub fn system_config_path() -> Result<PathBuf> {
    if let Ok(custom) = std::env::var("SKILLS_MANAGER_CONFIG") {
        if !custom.trim().is_empty() {
            return Ok(PathBuf::from(custom));
        }
    }
    let base = match dirs::config_dir() {
        Some(dir) => dir,
        None => home_dir()?.join(".config"),
    };
    Ok(base.join(APP_DIR_NAME).join(SYSTEM_CONFIG_FILE))
}

/// Values substituted for the path-variable tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathVars {
    pub home: String,
    pub app_data: String,
    pub xdg_config_home: String,
    pub local_app_data: String,
}

impl PathVars {
    /// Snapshots the token values from the process environment.
    ///
    /// `HOME` falls back to `USERPROFILE`; `XDG_CONFIG_HOME` falls back to
    /// `{HOME}/.config` when a home directory is known.
    pub fn from_env() -> Self {
        let var = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());
        let home = var("HOME").or_else(|| var("USERPROFILE")).unwrap_or_default();
        let xdg_config_home = var("XDG_CONFIG_HOME").unwrap_or_else(|| {
            if home.is_empty() {
                String::new()
            } else {
                PathBuf::from(&home)
                    .join(".config")
                    .to_string_lossy()
                    .into_owned()
            }
        });
        Self {
            home,
            app_data: var("APPDATA").unwrap_or_default(),
            xdg_config_home,
            local_app_data: var("LOCALAPPDATA").unwrap_or_default(),
        }
    }

    /// Substitutes every known token, then rewrites `/` to the host separator.
    pub fn resolve(&self, value: &str) -> String {
        let substituted = value
            .replace("${HOME}", &self.home)
            .replace("${APPDATA}", &self.app_data)
            .replace("${XDG_CONFIG_HOME}", &self.xdg_config_home)
            .replace("${LOCALAPPDATA}", &self.local_app_data);
        if MAIN_SEPARATOR == '/' {
            substituted
        } else {
            substituted.replace('/', &MAIN_SEPARATOR.to_string())
        }
    }
}

/// Resolves path-variable tokens against the current process environment.
pub fn resolve_path_vars(value: &str) -> String {
    PathVars::from_env().resolve(value)
}
