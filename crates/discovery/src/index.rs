//! Skill listings over every registered repository.

use std::path::PathBuf;

use skills_manager_state::{ConfigStore, EntityKind, Error, Result, UserConfig};

use crate::scanner::scan_skills;
use crate::types::{split_skill_id, Skill};

/// Read-only index of skills; nothing is cached, every call rescans.
#[derive(Debug, Clone)]
pub struct SkillIndex {
    store: ConfigStore,
}

impl SkillIndex {
    pub fn new(store: ConfigStore) -> Self {
        Self { store }
    }

    /// Scans one working tree on the blocking pool.
    pub async fn scan(repo_path: PathBuf, repo_id: String) -> Result<Vec<Skill>> {
        let path = repo_path.clone();
        tokio::task::spawn_blocking(move || scan_skills(&path, &repo_id))
            .await
            .map_err(|err| Error::io(repo_path, std::io::Error::other(err)))
    }

    /// Every skill of every registered repository, with live link views.
    pub async fn list_all(&self) -> Result<Vec<Skill>> {
        let cfg = self.store.user_config().await;
        let mut all = Vec::new();
        for repo in &cfg.repositories {
            let skills = Self::scan(repo.local_path.clone(), repo.id.clone()).await?;
            all.extend(skills.into_iter().map(|s| with_live_links(&cfg, s)));
        }
        tracing::debug!(
            target: "skills_manager::discovery",
            repositories = cfg.repositories.len(),
            skills = all.len(),
            "Indexed skills"
        );
        Ok(all)
    }

    pub async fn list_for_repo(&self, repo_id: &str) -> Result<Vec<Skill>> {
        let cfg = self.store.user_config().await;
        let repo = cfg
            .repository(repo_id)
            .ok_or_else(|| Error::not_found(EntityKind::Repository, repo_id))?;
        let skills = Self::scan(repo.local_path.clone(), repo.id.clone()).await?;
        Ok(skills
            .into_iter()
            .map(|s| with_live_links(&cfg, s))
            .collect())
    }

    /// Looks up one skill, scanning only the repository its id names.
    pub async fn find(&self, skill_id: &str) -> Result<Option<Skill>> {
        let Some((repo_id, _)) = split_skill_id(skill_id) else {
            return Ok(None);
        };
        let cfg = self.store.user_config().await;
        let Some(repo) = cfg.repository(repo_id) else {
            return Ok(None);
        };
        let skills = Self::scan(repo.local_path.clone(), repo.id.clone()).await?;
        Ok(skills
            .into_iter()
            .find(|s| s.id == skill_id)
            .map(|s| with_live_links(&cfg, s)))
    }

    pub async fn require(&self, skill_id: &str) -> Result<Skill> {
        self.find(skill_id)
            .await?
            .ok_or_else(|| Error::not_found(EntityKind::Skill, skill_id))
    }
}

fn with_live_links(cfg: &UserConfig, mut skill: Skill) -> Skill {
    skill.linked_platforms = cfg.platforms_linking_skill(&skill.id);
    skill
}
