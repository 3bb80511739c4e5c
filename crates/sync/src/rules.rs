//! Rule blocks merged into platform rules files.

use std::io;
use std::path::{Path, PathBuf};

use skills_manager_state::{write_atomic, EntityKind, Error, IoResultExt, Result};
use time::OffsetDateTime;

use crate::engine::LinkEngine;
use crate::fs_link::remove_link;
use crate::markers::{contains_block, merge_block, strip_block};
use crate::outcome::{DeployMode, DeployOutcome, FileStatus, UnlinkOutcome};

fn rules_file(platform_id: &str, raw: &str) -> Result<PathBuf> {
    if raw.trim().is_empty() {
        return Err(Error::Invalid(format!(
            "platform {platform_id} has no rules file"
        )));
    }
    Ok(PathBuf::from(raw))
}

/// `{path}.bak_{YYYYMMDDHHMMSS}` in local time.
pub fn backup_path(path: &Path) -> PathBuf {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    let stamp = format!(
        "{:04}{:02}{:02}{:02}{:02}{:02}",
        now.year(),
        u8::from(now.month()),
        now.day(),
        now.hour(),
        now.minute(),
        now.second()
    );
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".bak_{stamp}"));
    PathBuf::from(name)
}

/// Current mergeable text of a rules file, clearing a non-file occupant per `mode`.
async fn prepare_rules_file(
    path: &Path,
    mode: Option<DeployMode>,
) -> Result<(String, Option<PathBuf>)> {
    let meta = match tokio::fs::symlink_metadata(path).await {
        Ok(meta) => meta,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok((String::new(), None)),
        Err(err) => return Err(Error::io(path, err)),
    };
    if meta.is_file() {
        let text = tokio::fs::read_to_string(path).await.at_path(path)?;
        return Ok((text, None));
    }

    let occupant = if meta.file_type().is_symlink() {
        "a symbolic link"
    } else if meta.is_dir() {
        "a directory"
    } else {
        "not a regular file"
    };
    match mode {
        None => Err(Error::conflict(
            path,
            format!("rules file is {occupant}; deploy with overwrite or backup"),
        )),
        Some(DeployMode::Overwrite) => {
            if meta.is_dir() {
                tokio::fs::remove_dir_all(path).await.at_path(path)?;
            } else {
                remove_link(path).await?;
            }
            tracing::info!(
                target: "skills_manager::link",
                path = %path.display(),
                occupant,
                "Removed rules file occupant"
            );
            Ok((String::new(), None))
        }
        Some(DeployMode::Backup) => {
            let backup = backup_path(path);
            tokio::fs::rename(path, &backup).await.at_path(path)?;
            tracing::info!(
                target: "skills_manager::link",
                path = %path.display(),
                backup = %backup.display(),
                "Backed up rules file occupant"
            );
            Ok((String::new(), Some(backup)))
        }
    }
}

impl LinkEngine {
    /// Writes (or replaces) the rule's block in the platform's rules file.
    ///
    /// A rules file that is a symlink or directory is a [`Error::Conflict`]
    /// unless `mode` says how to displace it.
    pub async fn deploy(
        &self,
        rule_id: &str,
        platform_id: &str,
        mode: Option<DeployMode>,
    ) -> Result<DeployOutcome> {
        self.rules.require(rule_id).await?;
        let platform = self.platforms.require(platform_id).await?;
        let path = rules_file(platform_id, &platform.rules_file)?;
        let content = self.rules.content(rule_id).await?;

        let (existing, backup) = prepare_rules_file(&path, mode).await?;
        write_atomic(&path, merge_block(&existing, rule_id, &content).as_bytes()).await?;
        self.record_rule_link(rule_id, platform_id, true).await?;

        tracing::info!(
            target: "skills_manager::link",
            rule = %rule_id,
            platform = %platform_id,
            rules_file = %path.display(),
            "Rule deployed"
        );
        Ok(DeployOutcome {
            rules_file: path,
            backup,
        })
    }

    /// Removes the rule's block from the platform's rules file.
    ///
    /// The file itself is kept even when nothing else remains in it.
    pub async fn undeploy(&self, rule_id: &str, platform_id: &str) -> Result<UnlinkOutcome> {
        self.rules.require(rule_id).await?;
        let platform = self.platforms.require(platform_id).await?;

        let outcome = if platform.rules_file.trim().is_empty() {
            UnlinkOutcome {
                removed: false,
                config_only: true,
            }
        } else {
            let path = PathBuf::from(&platform.rules_file);
            match tokio::fs::symlink_metadata(&path).await {
                Ok(meta) if meta.is_file() => {
                    let text = tokio::fs::read_to_string(&path).await.at_path(&path)?;
                    let removed = contains_block(&text, rule_id);
                    if removed {
                        write_atomic(&path, strip_block(&text, rule_id).as_bytes()).await?;
                    }
                    UnlinkOutcome {
                        removed,
                        config_only: false,
                    }
                }
                Ok(_) => {
                    tracing::warn!(
                        target: "skills_manager::link",
                        path = %path.display(),
                        "Rules file is not a regular file, leaving it untouched"
                    );
                    UnlinkOutcome {
                        removed: false,
                        config_only: true,
                    }
                }
                Err(err) if err.kind() == io::ErrorKind::NotFound => UnlinkOutcome::default(),
                Err(err) => return Err(Error::io(path, err)),
            }
        };

        self.record_rule_link(rule_id, platform_id, false).await?;
        tracing::info!(
            target: "skills_manager::link",
            rule = %rule_id,
            platform = %platform_id,
            removed = outcome.removed,
            "Rule undeployed"
        );
        Ok(outcome)
    }

    pub async fn check_file_status(&self, platform_id: &str, rule_id: &str) -> Result<FileStatus> {
        let Some(platform) = self.platforms.get(platform_id).await? else {
            return Ok(FileStatus::Missing);
        };
        if platform.rules_file.trim().is_empty() {
            return Ok(FileStatus::Missing);
        }
        let path = PathBuf::from(&platform.rules_file);
        match tokio::fs::symlink_metadata(&path).await {
            Ok(meta) if meta.is_file() => {
                let text = tokio::fs::read_to_string(&path).await.at_path(&path)?;
                Ok(if contains_block(&text, rule_id) {
                    FileStatus::Linked
                } else {
                    FileStatus::Conflict
                })
            }
            Ok(_) => Ok(FileStatus::Conflict),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(FileStatus::Clean),
            Err(err) => Err(Error::io(path, err)),
        }
    }

    /// Rewrites every linked rule's block with its current content.
    ///
    /// Returns the ids written; linked ids without a catalog entry are skipped.
    pub async fn redeploy(&self, platform_id: &str) -> Result<Vec<String>> {
        let platform = self.platforms.require(platform_id).await?;
        let path = rules_file(platform_id, &platform.rules_file)?;
        let (mut text, _) = prepare_rules_file(&path, None).await?;

        let mut written = Vec::new();
        for rule_id in &platform.linked_rules {
            if self.rules.get(rule_id).await?.is_none() {
                tracing::warn!(
                    target: "skills_manager::link",
                    rule = %rule_id,
                    platform = %platform_id,
                    "Linked rule no longer exists, skipping"
                );
                continue;
            }
            let content = self.rules.content(rule_id).await?;
            text = merge_block(&text, rule_id, &content);
            written.push(rule_id.clone());
        }
        if !written.is_empty() {
            write_atomic(&path, text.as_bytes()).await?;
        }
        tracing::info!(
            target: "skills_manager::link",
            platform = %platform_id,
            rules = written.len(),
            "Rules redeployed"
        );
        Ok(written)
    }

    /// Adds or drops the rule/platform pair on both sides of the association.
    async fn record_rule_link(&self, rule_id: &str, platform_id: &str, linked: bool) -> Result<()> {
        self.store
            .edit_user_config(|cfg| {
                let platform = cfg
                    .platform_mut(platform_id)
                    .ok_or_else(|| Error::not_found(EntityKind::Platform, platform_id))?;
                if linked {
                    if !platform.linked_rules.iter().any(|r| r == rule_id) {
                        platform.linked_rules.push(rule_id.to_string());
                    }
                } else {
                    platform.linked_rules.retain(|r| r != rule_id);
                }
                if let Some(rule) = cfg.rule_mut(rule_id) {
                    if linked {
                        if !rule.linked_platforms.iter().any(|p| p == platform_id) {
                            rule.linked_platforms.push(platform_id.to_string());
                        }
                    } else {
                        rule.linked_platforms.retain(|p| p != platform_id);
                    }
                }
                Ok(())
            })
            .await
    }
}
