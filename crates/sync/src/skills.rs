//! Skill links into platform skills directories.

use std::path::{Path, PathBuf};

use skills_manager_discovery::Skill;
use skills_manager_repos::org_from_url;
use skills_manager_state::{Error, Result};

use crate::engine::LinkEngine;
use crate::fs_link::{create_dir_link, inspect, remove_link, LinkState};
use crate::outcome::{LinkOutcome, UnlinkOutcome};

fn skills_dir(platform_id: &str, raw: &str) -> Result<PathBuf> {
    if raw.trim().is_empty() {
        return Err(Error::Invalid(format!(
            "platform {platform_id} has no skills directory"
        )));
    }
    Ok(PathBuf::from(raw))
}

impl LinkEngine {
    /// Org-prefixed fallback link name, `{org}-{skillName}`.
    async fn scoped_name(&self, skill: &Skill) -> String {
        let cfg = self.store.user_config().await;
        let org = cfg
            .repository(&skill.repo_id)
            .and_then(|repo| org_from_url(&repo.url))
            .unwrap_or_else(|| {
                skill
                    .repo_id
                    .split_once('_')
                    .map(|(owner, _)| owner.to_string())
                    .unwrap_or_else(|| skill.repo_id.clone())
            });
        format!("{org}-{}", skill.name)
    }

    /// Exposes a skill to a platform via a directory link.
    ///
    /// An existing correct link (default or scoped name) is reused. Otherwise
    /// the default name is used when free and the scoped name when the
    /// default is taken; both taken is a [`Error::Conflict`].
    pub async fn link(&self, skill_id: &str, platform_id: &str) -> Result<LinkOutcome> {
        let skill = self.skills.require(skill_id).await?;
        let platform = self.platforms.require(platform_id).await?;
        let dir = skills_dir(platform_id, &platform.skills_dir)?;

        let default_path = dir.join(&skill.name);
        let scoped_path = dir.join(self.scoped_name(&skill).await);
        let default_state = inspect(&default_path, &skill.local_path).await?;
        let scoped_state = inspect(&scoped_path, &skill.local_path).await?;

        let outcome = match (&default_state, &scoped_state) {
            (LinkState::Correct, _) => LinkOutcome {
                link_path: default_path,
                scoped: false,
                created: false,
            },
            (_, LinkState::Correct) => LinkOutcome {
                link_path: scoped_path,
                scoped: true,
                created: false,
            },
            (LinkState::Missing, _) => {
                create_dir_link(&skill.local_path, &default_path).await?;
                LinkOutcome {
                    link_path: default_path,
                    scoped: false,
                    created: true,
                }
            }
            (_, LinkState::Missing) => {
                tracing::info!(
                    target: "skills_manager::link",
                    skill = %skill_id,
                    platform = %platform_id,
                    taken = %default_path.display(),
                    link = %scoped_path.display(),
                    "Default link name taken, using scoped name"
                );
                create_dir_link(&skill.local_path, &scoped_path).await?;
                LinkOutcome {
                    link_path: scoped_path,
                    scoped: true,
                    created: true,
                }
            }
            _ => {
                return Err(Error::conflict(
                    default_path,
                    format!(
                        "both {} and {} are occupied",
                        skill.name,
                        scoped_path
                            .file_name()
                            .map(|n| n.to_string_lossy().into_owned())
                            .unwrap_or_default()
                    ),
                ))
            }
        };

        let id = skill_id.to_string();
        self.platforms
            .modify(platform_id, move |p| {
                if !p.linked_skills.contains(&id) {
                    p.linked_skills.push(id);
                }
            })
            .await?;
        tracing::info!(
            target: "skills_manager::link",
            skill = %skill_id,
            platform = %platform_id,
            link = %outcome.link_path.display(),
            created = outcome.created,
            "Skill linked"
        );
        Ok(outcome)
    }

    /// Removes a platform's link to a skill and drops the association.
    ///
    /// If the skill no longer resolves (its repository is gone) only the
    /// association is dropped; any stray link stays for manual removal.
    pub async fn unlink(&self, skill_id: &str, platform_id: &str) -> Result<UnlinkOutcome> {
        let platform = self.platforms.require(platform_id).await?;
        let outcome = match self.skills.find(skill_id).await? {
            Some(skill) if !platform.skills_dir.trim().is_empty() => {
                let dir = Path::new(&platform.skills_dir);
                let mut removed = false;
                for candidate in [dir.join(&skill.name), dir.join(self.scoped_name(&skill).await)] {
                    if inspect(&candidate, &skill.local_path).await?.is_correct() {
                        remove_link(&candidate).await?;
                        removed = true;
                    }
                }
                UnlinkOutcome {
                    removed,
                    config_only: false,
                }
            }
            Some(_) => UnlinkOutcome {
                removed: false,
                config_only: true,
            },
            None => {
                tracing::warn!(
                    target: "skills_manager::link",
                    skill = %skill_id,
                    platform = %platform_id,
                    "Skill no longer resolves; dropping association only, any stray link is left in place"
                );
                UnlinkOutcome {
                    removed: false,
                    config_only: true,
                }
            }
        };

        self.platforms
            .modify(platform_id, |p| p.linked_skills.retain(|s| s != skill_id))
            .await?;
        tracing::info!(
            target: "skills_manager::link",
            skill = %skill_id,
            platform = %platform_id,
            removed = outcome.removed,
            "Skill unlinked"
        );
        Ok(outcome)
    }
}
