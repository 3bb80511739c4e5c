use std::path::PathBuf;
use std::time::Duration;

use skills_manager_repos::DEFAULT_MAX_CONCURRENT;
use skills_manager_state::{system_config_path, Result, DEFAULT_DEBOUNCE};

/// Startup settings, built once and handed to [`SkillsManager::open`](crate::SkillsManager::open).
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Location of the system config file.
    pub system_config_path: PathBuf,
    /// Quiet period before buffered config changes are written.
    pub debounce: Duration,
    /// Cap on simultaneously running git processes.
    pub git_max_concurrent: usize,
}

impl AppConfig {
    /// Defaults, honouring `SKILLS_MANAGER_CONFIG` for the system config path.
    pub fn from_env() -> Result<Self> {
        Ok(Self::at(system_config_path()?))
    }

    /// Defaults with an explicit system config path.
    pub fn at(system_config_path: impl Into<PathBuf>) -> Self {
        Self {
            system_config_path: system_config_path.into(),
            debounce: DEFAULT_DEBOUNCE,
            git_max_concurrent: DEFAULT_MAX_CONCURRENT,
        }
    }

    pub fn with_system_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.system_config_path = path.into();
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skills_manager_test_utils::{env_guard, set_env_var};

    #[test]
    fn env_override_selects_system_config_path() {
        let _g = env_guard();
        let _v = set_env_var("SKILLS_MANAGER_CONFIG", Some("/tmp/sm/config.yaml"));
        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.system_config_path, PathBuf::from("/tmp/sm/config.yaml"));
        assert_eq!(config.debounce, Duration::from_millis(500));
        assert_eq!(config.git_max_concurrent, 4);
    }

    #[test]
    fn builder_overrides() {
        let config = AppConfig::at("/first/config.yaml")
            .with_system_config_path("/elsewhere/config.yaml")
            .with_debounce(Duration::from_millis(5));
        assert_eq!(config.system_config_path, PathBuf::from("/elsewhere/config.yaml"));
        assert_eq!(config.debounce, Duration::from_millis(5));
    }
}
