//! Shared test utilities for skills-manager crates.
//!
//! Provides env-var guards for tests that touch process-global state and a
//! [`TestFixture`] laying out a temporary base directory, a platform root and
//! fake skill repositories.

use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex, MutexGuard};

/// Serialize tests that mutate process-global state (env vars, cwd, etc).
pub fn env_guard() -> MutexGuard<'static, ()> {
    static TEST_SERIAL: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));
    TEST_SERIAL.lock().unwrap_or_else(|e| e.into_inner())
}

/// RAII guard for environment variables - restores original value on drop.
pub struct EnvVarGuard {
    key: &'static str,
    previous: Option<String>,
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        if let Some(v) = &self.previous {
            std::env::set_var(self.key, v);
        } else {
            std::env::remove_var(self.key);
        }
    }
}

/// Set (or with `None`, remove) an environment variable until the guard drops.
///
/// # Example
/// ```
/// let _guard = skills_manager_test_utils::set_env_var("MY_VAR", Some("value"));
/// assert_eq!(std::env::var("MY_VAR").unwrap(), "value");
/// ```
pub fn set_env_var(key: &'static str, value: Option<&str>) -> EnvVarGuard {
    let previous = std::env::var(key).ok();
    if let Some(val) = value {
        std::env::set_var(key, val);
    } else {
        std::env::remove_var(key);
    }
    EnvVarGuard { key, previous }
}

/// Temporary layout for exercising the store, indexer and link engine.
///
/// The tempdir is removed when the fixture drops.
pub struct TestFixture {
    pub tempdir: tempfile::TempDir,
    /// Path used for the system config file.
    pub system_config: PathBuf,
    /// Base directory holding config/, skills/ and rules/.
    pub base_dir: PathBuf,
    /// Root under which platform skills dirs and rules files are placed.
    pub platform_root: PathBuf,
}

impl TestFixture {
    /// Creates the fixture. `base_dir` and `platform_root` exist afterwards;
    /// the system config file does not.
    pub fn new() -> std::io::Result<Self> {
        let tempdir = tempfile::tempdir()?;
        let system_config = tempdir.path().join("app").join("config.yaml");
        let base_dir = tempdir.path().join("base");
        let platform_root = tempdir.path().join("platforms");
        std::fs::create_dir_all(&base_dir)?;
        std::fs::create_dir_all(&platform_root)?;
        Ok(Self {
            tempdir,
            system_config,
            base_dir,
            platform_root,
        })
    }

    /// `{base_dir}/skills/{repo_id}`, the working tree location of a repository.
    pub fn repo_path(&self, repo_id: &str) -> PathBuf {
        self.base_dir.join("skills").join(repo_id)
    }

    /// Skills directory for a named platform (not created).
    pub fn platform_skills_dir(&self, platform: &str) -> PathBuf {
        self.platform_root.join(platform).join("skills")
    }

    /// Rules file for a named platform (not created).
    pub fn platform_rules_file(&self, platform: &str) -> PathBuf {
        self.platform_root.join(platform).join("RULES.md")
    }
}

/// Writes `{root}/{rel}/SKILL.MD` with a `description:` line and returns the skill dir.
pub fn create_skill(root: &Path, rel: &str, description: &str) -> std::io::Result<PathBuf> {
    let content = format!("name: {}\ndescription: {}\n\n# Usage\n", leaf(rel), description);
    create_skill_with_manifest(root, rel, &content)
}

/// Writes `{root}/{rel}/SKILL.MD` with arbitrary content.
pub fn create_skill_with_manifest(
    root: &Path,
    rel: &str,
    content: &str,
) -> std::io::Result<PathBuf> {
    let dir = root.join(rel);
    std::fs::create_dir_all(&dir)?;
    std::fs::write(dir.join("SKILL.MD"), content)?;
    Ok(dir)
}

fn leaf(rel: &str) -> &str {
    rel.rsplit('/').next().unwrap_or(rel)
}
