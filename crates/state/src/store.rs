//! Cached, debounced configuration store.
//!
//! Both domains load lazily on first access. Mutations update the cache,
//! mark the domain dirty and schedule a trailing-edge flush after the
//! debounce window; a mutation inside the window supersedes the pending
//! flush. [`ConfigStore::flush`] writes dirty domains immediately and is the
//! only durability guarantee callers get.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock, Weak};
use std::time::Duration;

use tokio::sync::{Mutex, RwLock, RwLockWriteGuard};

use crate::env::PathVars;
use crate::error::{Error, Result};
use crate::model::{PlatformPreset, SystemConfig, SystemConfigPatch, UserConfig, UserConfigPatch};
use crate::persistence;

/// Default coalescing window for config writes.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

static BUILTIN_PRESETS: LazyLock<Vec<PlatformPreset>> = LazyLock::new(|| {
    match serde_yaml::from_str(include_str!("../resources/presets.yaml")) {
        Ok(presets) => presets,
        Err(err) => {
            tracing::error!(
                target: "skills_manager::store",
                error = %err,
                "Built-in preset catalog is malformed"
            );
            Vec::new()
        }
    }
});

/// Construction parameters for [`ConfigStore`].
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub system_config_path: PathBuf,
    pub debounce: Duration,
    pub path_vars: PathVars,
}

impl StoreOptions {
    pub fn new(system_config_path: impl Into<PathBuf>) -> Self {
        Self {
            system_config_path: system_config_path.into(),
            debounce: DEFAULT_DEBOUNCE,
            path_vars: PathVars::from_env(),
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_path_vars(mut self, vars: PathVars) -> Self {
        self.path_vars = vars;
        self
    }
}

struct LoadedUser {
    /// `{baseDir}/config`, or `None` while no base directory is known.
    config_dir: Option<PathBuf>,
    config: UserConfig,
}

#[derive(Default)]
struct State {
    system: Option<SystemConfig>,
    user: Option<LoadedUser>,
    system_dirty: bool,
    user_dirty: bool,
}

struct Inner {
    system_path: PathBuf,
    debounce: Duration,
    vars: PathVars,
    state: RwLock<State>,
    /// Serializes disk writes so an older snapshot never lands after a newer one.
    flush_lock: Mutex<()>,
    flush_generation: AtomicU64,
}

/// Shared handle to both config domains. Cloning is cheap.
#[derive(Clone)]
pub struct ConfigStore {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigStore")
            .field("system_path", &self.inner.system_path)
            .field("debounce", &self.inner.debounce)
            .finish()
    }
}

impl ConfigStore {
    pub fn open(options: StoreOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                system_path: options.system_config_path,
                debounce: options.debounce,
                vars: options.path_vars,
                state: RwLock::new(State::default()),
                flush_lock: Mutex::new(()),
                flush_generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn system_config_path(&self) -> &Path {
        &self.inner.system_path
    }

    pub fn path_vars(&self) -> &PathVars {
        &self.inner.vars
    }

    /// Resolves path-variable tokens with the values captured at startup.
    pub fn resolve_path(&self, value: &str) -> String {
        self.inner.vars.resolve(value)
    }

    async fn loaded(&self) -> RwLockWriteGuard<'_, State> {
        let mut state = self.inner.state.write().await;
        if state.system.is_none() {
            state.system = Some(persistence::load_system(&self.inner.system_path).await);
        }
        if state.user.is_none() {
            let config_dir = state
                .system
                .as_ref()
                .and_then(|s| s.base_dir.as_deref())
                .map(persistence::config_dir);
            let config = match &config_dir {
                Some(dir) => persistence::load_user(dir).await,
                None => UserConfig::default(),
            };
            state.user = Some(LoadedUser { config_dir, config });
        }
        state
    }

    pub async fn system_config(&self) -> SystemConfig {
        {
            let state = self.inner.state.read().await;
            if let Some(system) = &state.system {
                return system.clone();
            }
        }
        let state = self.loaded().await;
        state.system.clone().unwrap_or_default()
    }

    /// Shallow-merges `patch` into the system config.
    ///
    /// A changed `baseDir` flushes pending user writes to the old location
    /// and reloads the user domain from the new one before returning.
    pub async fn set_system_config(&self, patch: SystemConfigPatch) -> Result<SystemConfig> {
        let _flush = self.inner.flush_lock.lock().await;
        let mut state = self.loaded().await;
        let mut next = state.system.clone().unwrap_or_default();
        let old_base = next.base_dir.clone();
        next.apply(patch);
        let new_base = next.base_dir.clone();

        // nothing is committed until the old user domain is safely on disk
        if new_base != old_base {
            if state.user_dirty {
                if let Some(LoadedUser {
                    config_dir: Some(dir),
                    config,
                }) = &state.user
                {
                    persistence::save_user(dir, config).await?;
                }
                state.user_dirty = false;
            }
            let config_dir = new_base.as_deref().map(persistence::config_dir);
            let config = match &config_dir {
                Some(dir) => persistence::load_user(dir).await,
                None => UserConfig::default(),
            };
            tracing::info!(
                target: "skills_manager::store",
                base_dir = ?new_base,
                "Base directory changed, user config reloaded"
            );
            state.user = Some(LoadedUser { config_dir, config });
        }
        state.system = Some(next.clone());
        state.system_dirty = true;
        drop(state);
        drop(_flush);
        self.schedule_flush();
        Ok(next)
    }

    /// Returns the user config; empty while no base directory is configured.
    pub async fn user_config(&self) -> UserConfig {
        {
            let state = self.inner.state.read().await;
            if let Some(user) = &state.user {
                return user.config.clone();
            }
        }
        let state = self.loaded().await;
        state
            .user
            .as_ref()
            .map(|u| u.config.clone())
            .unwrap_or_default()
    }

    /// Shallow-merges `patch` into the user config.
    ///
    /// Without a base directory this is a logged no-op.
    pub async fn set_user_config(&self, patch: UserConfigPatch) -> Result<()> {
        let mut state = self.loaded().await;
        let Some(user) = state.user.as_mut().filter(|u| u.config_dir.is_some()) else {
            tracing::warn!(
                target: "skills_manager::store",
                "Ignoring user config update: base directory is not configured"
            );
            return Ok(());
        };
        user.config.apply(patch);
        state.user_dirty = true;
        drop(state);
        self.schedule_flush();
        Ok(())
    }

    /// Atomically edits the user config under the store lock.
    ///
    /// `edit` works on a copy; the copy replaces the cached config only when
    /// `edit` succeeds. Fails with [`Error::BaseDirUnset`] when no base
    /// directory is configured.
    pub async fn edit_user_config<R, F>(&self, edit: F) -> Result<R>
    where
        F: FnOnce(&mut UserConfig) -> Result<R>,
    {
        let mut state = self.loaded().await;
        let Some(user) = state.user.as_mut().filter(|u| u.config_dir.is_some()) else {
            tracing::warn!(
                target: "skills_manager::store",
                "Rejecting user config edit: base directory is not configured"
            );
            return Err(Error::BaseDirUnset);
        };
        let mut draft = user.config.clone();
        let out = edit(&mut draft)?;
        if draft != user.config {
            user.config = draft;
            state.user_dirty = true;
            drop(state);
            self.schedule_flush();
        }
        Ok(out)
    }

    /// Built-in presets (paths resolved) followed by presets stored in system config.
    pub async fn presets(&self) -> Vec<PlatformPreset> {
        let mut presets: Vec<PlatformPreset> = BUILTIN_PRESETS
            .iter()
            .map(|p| PlatformPreset {
                skills_dir: self.resolve_path(&p.skills_dir),
                rules_file: self.resolve_path(&p.rules_file),
                ..p.clone()
            })
            .collect();
        presets.extend(self.system_config().await.presets);
        presets
    }

    pub async fn base_dir(&self) -> Option<PathBuf> {
        self.system_config().await.base_dir
    }

    pub async fn require_base_dir(&self) -> Result<PathBuf> {
        self.base_dir().await.ok_or(Error::BaseDirUnset)
    }

    /// `{baseDir}/config`.
    pub async fn config_dir(&self) -> Result<PathBuf> {
        Ok(persistence::config_dir(&self.require_base_dir().await?))
    }

    /// `{baseDir}/skills`, parent of every repository working tree.
    pub async fn skills_root(&self) -> Result<PathBuf> {
        Ok(self.require_base_dir().await?.join("skills"))
    }

    /// `{baseDir}/rules`, parent of every rule content file.
    pub async fn rules_root(&self) -> Result<PathBuf> {
        Ok(self.require_base_dir().await?.join("rules"))
    }

    /// True while either domain has changes not yet on disk.
    pub async fn is_dirty(&self) -> bool {
        let state = self.inner.state.read().await;
        state.system_dirty || state.user_dirty
    }

    /// Writes every dirty domain now.
    pub async fn flush(&self) -> Result<()> {
        let _flush = self.inner.flush_lock.lock().await;
        let (system, user) = {
            let mut state = self.inner.state.write().await;
            let system = if state.system_dirty {
                state.system_dirty = false;
                state.system.clone()
            } else {
                None
            };
            let user = if state.user_dirty {
                state.user_dirty = false;
                state
                    .user
                    .as_ref()
                    .and_then(|u| u.config_dir.clone().map(|dir| (dir, u.config.clone())))
            } else {
                None
            };
            (system, user)
        };

        if let Some(system) = system {
            if let Err(err) = persistence::save_system(&self.inner.system_path, &system).await {
                self.inner.state.write().await.system_dirty = true;
                return Err(err);
            }
            tracing::debug!(
                target: "skills_manager::store",
                path = %self.inner.system_path.display(),
                "System config written"
            );
        }
        if let Some((dir, config)) = user {
            if let Err(err) = persistence::save_user(&dir, &config).await {
                self.inner.state.write().await.user_dirty = true;
                return Err(err);
            }
            tracing::debug!(
                target: "skills_manager::store",
                dir = %dir.display(),
                "User config written"
            );
        }
        Ok(())
    }

    fn schedule_flush(&self) {
        let generation = self.inner.flush_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let debounce = self.inner.debounce;
        tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if inner.flush_generation.load(Ordering::SeqCst) != generation {
                return;
            }
            let store = ConfigStore { inner };
            if let Err(err) = store.flush().await {
                tracing::error!(
                    target: "skills_manager::store",
                    error = %err,
                    "Debounced config flush failed"
                );
            }
        });
    }
}
