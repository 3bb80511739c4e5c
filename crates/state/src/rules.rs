//! User-authored rules and their owned content files.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{EntityKind, Error, Result};
use crate::model::{now_rfc3339, Rule, UserConfig};
use crate::persistence::write_atomic;
use crate::platforms::slugify;
use crate::store::ConfigStore;

/// Input for [`RuleCatalog::update`]; `Some` fields replace stored ones.
#[derive(Debug, Clone, Default)]
pub struct RuleUpdate {
    pub id: String,
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RuleCatalog {
    store: ConfigStore,
}

/// Hidden per-call file in `rules_root` holding content until registration.
fn staging_path(rules_root: &Path, id: &str) -> PathBuf {
    static NEXT: AtomicU64 = AtomicU64::new(0);
    let n = NEXT.fetch_add(1, Ordering::Relaxed);
    rules_root.join(format!(".{id}.{}-{n}.staged", std::process::id()))
}

/// Replaces the stored `linkedPlatforms` with the view derived from platforms.
fn with_live_links(cfg: &UserConfig, mut rule: Rule) -> Rule {
    rule.linked_platforms = cfg.platforms_linking_rule(&rule.id);
    rule
}

impl RuleCatalog {
    pub fn new(store: ConfigStore) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Result<Vec<Rule>> {
        let cfg = self.store.user_config().await;
        Ok(cfg
            .rules
            .iter()
            .cloned()
            .map(|r| with_live_links(&cfg, r))
            .collect())
    }

    pub async fn get(&self, id: &str) -> Result<Option<Rule>> {
        let cfg = self.store.user_config().await;
        Ok(cfg.rule(id).cloned().map(|r| with_live_links(&cfg, r)))
    }

    pub async fn require(&self, id: &str) -> Result<Rule> {
        self.get(id)
            .await?
            .ok_or_else(|| Error::not_found(EntityKind::Rule, id))
    }

    /// Registers a rule and writes its initial content to `{baseDir}/rules/{id}.md`.
    ///
    /// Content is staged under a unique name and moved into place only after
    /// the record is registered, so a losing duplicate never touches the
    /// winner's file.
    pub async fn create(
        &self,
        name: &str,
        description: Option<String>,
        content: Option<&str>,
    ) -> Result<Rule> {
        let id = slugify(name);
        if id.is_empty() {
            return Err(Error::Invalid(format!("rule name {name:?} does not yield an id")));
        }
        let rules_root = self.store.rules_root().await?;
        let local_path = rules_root.join(format!("{id}.md"));
        if self.store.user_config().await.rule(&id).is_some() {
            return Err(Error::already_exists(EntityKind::Rule, &id));
        }
        let staged = staging_path(&rules_root, &id);
        write_atomic(&staged, content.unwrap_or_default().as_bytes()).await?;

        let rule = Rule {
            id: id.clone(),
            name: name.to_string(),
            description,
            local_path: local_path.clone(),
            linked_platforms: Vec::new(),
            created_at: now_rfc3339(),
        };
        let stored = rule.clone();
        let registered = self
            .store
            .edit_user_config(move |cfg| {
                if cfg.rule(&stored.id).is_some() {
                    return Err(Error::already_exists(EntityKind::Rule, &stored.id));
                }
                cfg.rules.push(stored);
                Ok(())
            })
            .await;
        if let Err(err) = registered {
            let _ = tokio::fs::remove_file(&staged).await;
            return Err(err);
        }
        if let Err(err) = tokio::fs::rename(&staged, &local_path).await {
            let _ = tokio::fs::remove_file(&staged).await;
            let unregister = id.clone();
            let _ = self
                .store
                .edit_user_config(move |cfg| {
                    cfg.rules.retain(|r| r.id != unregister);
                    Ok(())
                })
                .await;
            return Err(Error::io(local_path, err));
        }
        tracing::info!(target: "skills_manager::rules", rule = %id, "Rule created");
        Ok(rule)
    }

    pub async fn update(&self, update: RuleUpdate) -> Result<Rule> {
        self.store
            .edit_user_config(|cfg| {
                let rule = cfg
                    .rule_mut(&update.id)
                    .ok_or_else(|| Error::not_found(EntityKind::Rule, &update.id))?;
                if let Some(name) = update.name {
                    rule.name = name;
                }
                if let Some(description) = update.description {
                    rule.description = Some(description);
                }
                let rule = rule.clone();
                Ok(with_live_links(cfg, rule))
            })
            .await
    }

    /// Drops the record and its content file; unknown ids are ignored.
    ///
    /// Deployed blocks are not touched here; undeploy first.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let removed = self
            .store
            .edit_user_config(|cfg| {
                let index = cfg.rules.iter().position(|r| r.id == id);
                Ok(index.map(|i| cfg.rules.remove(i)))
            })
            .await?;
        if let Some(rule) = removed {
            match tokio::fs::remove_file(&rule.local_path).await {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => return Err(Error::io(rule.local_path, err)),
            }
            tracing::info!(target: "skills_manager::rules", rule = %id, "Rule deleted");
        }
        Ok(())
    }

    /// Rule text; an absent content file reads as empty.
    pub async fn content(&self, id: &str) -> Result<String> {
        let rule = self.require(id).await?;
        match tokio::fs::read_to_string(&rule.local_path).await {
            Ok(text) => Ok(text),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(err) => Err(Error::io(rule.local_path, err)),
        }
    }

    pub async fn set_content(&self, id: &str, content: &str) -> Result<()> {
        let rule = self.require(id).await?;
        write_atomic(&rule.local_path, content.as_bytes()).await
    }

    pub async fn content_path(&self, id: &str) -> Result<PathBuf> {
        Ok(self.require(id).await?.local_path)
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SystemConfigPatch;
    use crate::platforms::{NewPlatform, PlatformRegistry};
    use crate::store::StoreOptions;
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};

    async fn catalog() -> (TempDir, RuleCatalog) {
        let dir = tempdir().unwrap();
        let store = ConfigStore::open(
            StoreOptions::new(dir.path().join("system.yaml"))
                .with_debounce(Duration::from_millis(10)),
        );
        store
            .set_system_config(SystemConfigPatch {
                base_dir: Some(dir.path().join("base")),
                ..Default::default()
            })
            .await
            .unwrap();
        (dir, RuleCatalog::new(store))
    }

    #[tokio::test]
    async fn create_writes_owned_content_file() {
        let (dir, rules) = catalog().await;
        let rule = rules.create("Test Rule", None, Some("# Content")).await.unwrap();
        assert_eq!(rule.id, "test-rule");
        assert_eq!(rule.local_path, dir.path().join("base/rules/test-rule.md"));
        assert_eq!(std::fs::read_to_string(&rule.local_path).unwrap(), "# Content");
        assert_eq!(rules.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_name_is_rejected_without_clobbering_content() {
        let (_dir, rules) = catalog().await;
        let rule = rules.create("Dup", None, Some("first")).await.unwrap();
        let err = rules.create("dup", None, Some("second")).await.unwrap_err();
        assert!(err.is_already_exists());
        assert_eq!(std::fs::read_to_string(&rule.local_path).unwrap(), "first");
    }

    #[tokio::test]
    async fn concurrent_duplicates_keep_the_winners_content() {
        let (dir, rules) = catalog().await;
        let (first, second) = tokio::join!(
            rules.create("Race", None, Some("first")),
            rules.create("race", None, Some("second")),
        );
        let (winner, loser, expected) = match (first, second) {
            (Ok(rule), Err(err)) => (rule, err, "first"),
            (Err(err), Ok(rule)) => (rule, err, "second"),
            other => panic!("exactly one create should win: {other:?}"),
        };
        assert!(loser.is_already_exists());
        assert_eq!(std::fs::read_to_string(&winner.local_path).unwrap(), expected);
        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("base/rules"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("race.md")]);
    }

    #[tokio::test]
    async fn delete_removes_record_and_file() {
        let (_dir, rules) = catalog().await;
        let rule = rules.create("Delete Me", None, None).await.unwrap();
        rules.delete(&rule.id).await.unwrap();
        assert!(rules.list().await.unwrap().is_empty());
        assert!(!rule.local_path.exists());
        rules.delete(&rule.id).await.unwrap();
    }

    #[tokio::test]
    async fn content_round_trips_and_missing_file_reads_empty() {
        let (_dir, rules) = catalog().await;
        let rule = rules.create("Update Me", None, Some("Old")).await.unwrap();
        rules.set_content(&rule.id, "New").await.unwrap();
        assert_eq!(rules.content(&rule.id).await.unwrap(), "New");

        std::fs::remove_file(&rule.local_path).unwrap();
        assert_eq!(rules.content(&rule.id).await.unwrap(), "");
        assert!(rules.content("ghost").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn linked_platforms_are_derived_from_platform_records() {
        let (_dir, rules) = catalog().await;
        let rule = rules.create("Style", None, None).await.unwrap();
        let platforms = PlatformRegistry::new(rules.store().clone());
        platforms
            .create(NewPlatform {
                name: "P".into(),
                skills_dir: "/tmp/p/skills".into(),
                rules_file: "/tmp/p/RULES.md".into(),
                linked_rules: Some(vec![rule.id.clone()]),
                ..Default::default()
            })
            .await
            .unwrap();
        let fetched = rules.require(&rule.id).await.unwrap();
        assert_eq!(fetched.linked_platforms, vec!["p".to_string()]);
    }
}
