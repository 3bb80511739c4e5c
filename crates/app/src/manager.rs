//! The application facade wiring every component to one config store.

use std::sync::Arc;

use skills_manager_discovery::SkillIndex;
use skills_manager_repos::{GitCli, GitClient, RepositoryManager};
use skills_manager_state::{
    ConfigStore, PlatformRegistry, Result, RuleCatalog, StoreOptions,
};
use skills_manager_sync::LinkEngine;

use crate::app_config::AppConfig;

/// Entry point for every skills-manager operation.
#[derive(Debug, Clone)]
pub struct SkillsManager {
    store: ConfigStore,
    platforms: PlatformRegistry,
    rules: RuleCatalog,
    repos: RepositoryManager,
    skills: SkillIndex,
    links: LinkEngine,
}

impl SkillsManager {
    /// Opens the store and uses the `git` executable (honouring `gitPath`).
    pub async fn open(config: AppConfig) -> Self {
        let max_concurrent = config.git_max_concurrent;
        let store = Self::open_store(config);
        let git_path = store.system_config().await.git_path;
        let git = GitCli::new(git_path, max_concurrent);
        Self::assemble(store, Arc::new(git))
    }

    /// Like [`open`](Self::open) with a caller-supplied git client.
    pub fn with_git(config: AppConfig, git: Arc<dyn GitClient>) -> Self {
        Self::assemble(Self::open_store(config), git)
    }

    fn open_store(config: AppConfig) -> ConfigStore {
        ConfigStore::open(
            StoreOptions::new(config.system_config_path).with_debounce(config.debounce),
        )
    }

    fn assemble(store: ConfigStore, git: Arc<dyn GitClient>) -> Self {
        Self {
            platforms: PlatformRegistry::new(store.clone()),
            rules: RuleCatalog::new(store.clone()),
            repos: RepositoryManager::new(store.clone(), git),
            skills: SkillIndex::new(store.clone()),
            links: LinkEngine::new(store.clone()),
            store,
        }
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn platforms(&self) -> &PlatformRegistry {
        &self.platforms
    }

    pub fn rules(&self) -> &RuleCatalog {
        &self.rules
    }

    pub fn repositories(&self) -> &RepositoryManager {
        &self.repos
    }

    pub fn skills(&self) -> &SkillIndex {
        &self.skills
    }

    pub fn links(&self) -> &LinkEngine {
        &self.links
    }

    /// Undeploys a rule from every platform linking it, then deletes it.
    pub async fn delete_rule(&self, id: &str) -> Result<()> {
        let rule = self.rules.require(id).await?;
        for platform_id in &rule.linked_platforms {
            match self.links.undeploy(id, platform_id).await {
                Ok(_) => {}
                Err(err) if err.is_not_found() => {
                    tracing::warn!(
                        target: "skills_manager::rules",
                        rule = %id,
                        platform = %platform_id,
                        "Linked platform vanished before undeploy"
                    );
                }
                Err(err) => return Err(err),
            }
        }
        self.rules.delete(id).await
    }

    /// Reports whether the configured git binary runs.
    pub async fn git_installed(&self) -> bool {
        self.repos.git().version().await.is_ok()
    }

    pub fn app_version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    /// Writes any buffered config changes.
    pub async fn shutdown(&self) -> Result<()> {
        self.store.flush().await
    }
}
