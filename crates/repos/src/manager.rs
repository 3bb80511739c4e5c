//! Registered skill repositories and their working trees.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use skills_manager_state::{
    now_rfc3339, ConfigStore, EntityKind, Error, IoResultExt, Result, SkillRepository,
    UpdateStatus,
};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinSet;

use crate::git::GitClient;
use crate::url::{normalize_url, repo_identity};

const PROGRESS_CAPACITY: usize = 256;

/// A progress or log line emitted while a repository is being cloned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoProgress {
    pub repo_id: String,
    pub line: String,
}

/// Result of polling one repository against its remote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCheck {
    pub repo_id: String,
    pub has_updates: bool,
    pub behind_count: u32,
    pub ahead_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UpdateCheck {
    fn failed(repo_id: &str, message: String) -> Self {
        Self {
            repo_id: repo_id.to_string(),
            error: Some(message),
            ..Self::default()
        }
    }
}

/// Clones, pulls, polls and deletes repositories, keeping their records in
/// the user config.
#[derive(Clone)]
pub struct RepositoryManager {
    store: ConfigStore,
    git: Arc<dyn GitClient>,
    events: broadcast::Sender<RepoProgress>,
}

impl fmt::Debug for RepositoryManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepositoryManager")
            .field("store", &self.store)
            .field("subscribers", &self.events.receiver_count())
            .finish_non_exhaustive()
    }
}

impl RepositoryManager {
    pub fn new(store: ConfigStore, git: Arc<dyn GitClient>) -> Self {
        let (events, _) = broadcast::channel(PROGRESS_CAPACITY);
        Self { store, git, events }
    }

    pub fn git(&self) -> &Arc<dyn GitClient> {
        &self.git
    }

    /// Observes clone progress for every repository.
    pub fn subscribe(&self) -> broadcast::Receiver<RepoProgress> {
        self.events.subscribe()
    }

    pub async fn list(&self) -> Result<Vec<SkillRepository>> {
        Ok(self.store.user_config().await.repositories)
    }

    pub async fn get(&self, id: &str) -> Result<Option<SkillRepository>> {
        Ok(self.store.user_config().await.repository(id).cloned())
    }

    pub async fn require(&self, id: &str) -> Result<SkillRepository> {
        self.get(id)
            .await?
            .ok_or_else(|| Error::not_found(EntityKind::Repository, id))
    }

    /// Record plus a check that its working tree is still on disk.
    async fn require_present(&self, id: &str) -> Result<SkillRepository> {
        let repo = self.require(id).await?;
        if !tokio::fs::try_exists(&repo.local_path)
            .await
            .at_path(&repo.local_path)?
        {
            return Err(Error::not_found(EntityKind::Repository, id));
        }
        Ok(repo)
    }

    /// Shallow-clones `url` into `{baseDir}/skills/{owner_repo}` and registers it.
    pub async fn clone_repository(&self, url: &str) -> Result<SkillRepository> {
        let url = normalize_url(url);
        let identity = repo_identity(&url)?;
        let id = identity.id();

        let cfg = self.store.user_config().await;
        if cfg.repositories.iter().any(|r| r.id == id || r.url == url) {
            return Err(Error::already_exists(EntityKind::Repository, &id));
        }

        let skills_root = self.store.skills_root().await?;
        tokio::fs::create_dir_all(&skills_root)
            .await
            .at_path(&skills_root)?;
        let local_path = skills_root.join(&id);
        match tokio::fs::create_dir(&local_path).await {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(Error::conflict(
                    &local_path,
                    "directory exists but is not a registered repository",
                ));
            }
            Err(err) => return Err(Error::io(&local_path, err)),
        }

        tracing::info!(
            target: "skills_manager::repos",
            repo = %id,
            url = %url,
            "Cloning repository"
        );
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let events = self.events.clone();
        let repo_id = id.clone();
        let forward = tokio::spawn(async move {
            while let Some(line) = rx.recv().await {
                tracing::trace!(target: "skills_manager::repos", repo = %repo_id, %line);
                let _ = events.send(RepoProgress {
                    repo_id: repo_id.clone(),
                    line,
                });
            }
        });
        let cloned = self.git.clone_shallow(&url, &local_path, tx).await;
        let _ = forward.await;

        if let Err(err) = cloned {
            remove_partial_clone(&local_path).await;
            return Err(err);
        }

        let repo = SkillRepository {
            id: id.clone(),
            name: identity.display_name(),
            url,
            local_path,
            last_updated: now_rfc3339(),
            update_status: Some(UpdateStatus::UpToDate),
            behind_count: Some(0),
            check_error: None,
        };
        let stored = repo.clone();
        self.store
            .edit_user_config(move |cfg| {
                if cfg.repository(&stored.id).is_some() {
                    return Err(Error::already_exists(EntityKind::Repository, &stored.id));
                }
                cfg.repositories.push(stored);
                Ok(())
            })
            .await?;
        tracing::info!(target: "skills_manager::repos", repo = %id, "Repository cloned");
        Ok(repo)
    }

    /// Fast-forwards the working tree and marks the record up to date.
    pub async fn pull(&self, id: &str) -> Result<SkillRepository> {
        let repo = self.require_present(id).await?;
        self.git.pull(&repo.local_path).await?;
        let updated = self
            .store
            .edit_user_config(|cfg| {
                let record = cfg
                    .repository_mut(id)
                    .ok_or_else(|| Error::not_found(EntityKind::Repository, id))?;
                record.last_updated = now_rfc3339();
                record.update_status = Some(UpdateStatus::UpToDate);
                record.behind_count = Some(0);
                record.check_error = None;
                Ok(record.clone())
            })
            .await?;
        tracing::info!(target: "skills_manager::repos", repo = %id, "Repository pulled");
        Ok(updated)
    }

    /// Fetches and compares with upstream.
    ///
    /// Git failures are recorded on the repository (`updateStatus: error`)
    /// and returned inside the [`UpdateCheck`] instead of as an `Err`.
    pub async fn check_updates(&self, id: &str) -> Result<UpdateCheck> {
        let repo = self.require_present(id).await?;
        self.record_status(id, |r| r.update_status = Some(UpdateStatus::Checking))
            .await?;

        let polled = async {
            self.git.fetch(&repo.local_path).await?;
            self.git.ahead_behind(&repo.local_path).await
        }
        .await;

        match polled {
            Ok(counts) => {
                let behind = counts.behind > 0;
                self.record_status(id, |r| {
                    r.update_status = Some(if behind {
                        UpdateStatus::Behind
                    } else {
                        UpdateStatus::UpToDate
                    });
                    r.behind_count = Some(counts.behind);
                    r.check_error = None;
                })
                .await?;
                if behind {
                    tracing::info!(
                        target: "skills_manager::repos",
                        repo = %id,
                        behind = counts.behind,
                        "Repository has upstream changes"
                    );
                }
                Ok(UpdateCheck {
                    repo_id: id.to_string(),
                    has_updates: behind,
                    behind_count: counts.behind,
                    ahead_count: counts.ahead,
                    error: None,
                })
            }
            Err(err) => {
                let message = err.to_string();
                tracing::warn!(
                    target: "skills_manager::repos",
                    repo = %id,
                    error = %message,
                    "Update check failed"
                );
                let recorded = message.clone();
                self.record_status(id, move |r| {
                    r.update_status = Some(UpdateStatus::Error);
                    r.check_error = Some(recorded);
                })
                .await?;
                Ok(UpdateCheck::failed(id, message))
            }
        }
    }

    /// Polls every registered repository concurrently; never fails as a whole.
    pub async fn check_all_updates(&self) -> Vec<UpdateCheck> {
        let ids: Vec<String> = self
            .store
            .user_config()
            .await
            .repositories
            .into_iter()
            .map(|r| r.id)
            .collect();

        let mut tasks = JoinSet::new();
        for id in ids {
            let manager = self.clone();
            tasks.spawn(async move {
                match manager.check_updates(&id).await {
                    Ok(check) => check,
                    Err(err) => UpdateCheck::failed(&id, err.to_string()),
                }
            });
        }

        let mut checks = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(check) => checks.push(check),
                Err(err) => tracing::error!(
                    target: "skills_manager::repos",
                    error = %err,
                    "Update check task panicked"
                ),
            }
        }
        checks.sort_by(|a, b| a.repo_id.cmp(&b.repo_id));
        checks
    }

    /// Removes the working tree and the record; unknown ids are ignored.
    ///
    /// Platform links into the tree are left for the link engine to clean up.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let Some(repo) = self.get(id).await? else {
            tracing::debug!(target: "skills_manager::repos", repo = %id, "Delete of unknown repository ignored");
            return Ok(());
        };
        let skills_root = self.store.skills_root().await?;
        if repo.local_path.parent() == Some(skills_root.as_path()) {
            match tokio::fs::remove_dir_all(&repo.local_path).await {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => return Err(Error::io(&repo.local_path, err)),
            }
        } else {
            tracing::warn!(
                target: "skills_manager::repos",
                repo = %id,
                path = %repo.local_path.display(),
                "Working tree is outside the skills directory, leaving it on disk"
            );
        }
        self.store
            .edit_user_config(|cfg| {
                cfg.repositories.retain(|r| r.id != id);
                Ok(())
            })
            .await?;
        tracing::info!(target: "skills_manager::repos", repo = %id, "Repository deleted");
        Ok(())
    }

    async fn record_status<F>(&self, id: &str, edit: F) -> Result<()>
    where
        F: FnOnce(&mut SkillRepository),
    {
        self.store
            .edit_user_config(|cfg| {
                let record = cfg
                    .repository_mut(id)
                    .ok_or_else(|| Error::not_found(EntityKind::Repository, id))?;
                edit(record);
                Ok(())
            })
            .await
    }
}

async fn remove_partial_clone(path: &Path) {
    if let Err(err) = tokio::fs::remove_dir_all(path).await {
        if err.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(
                target: "skills_manager::repos",
                path = %path.display(),
                error = %err,
                "Failed to remove partial clone"
            );
        }
    }
}
