//! CRUD over platform definitions.
//!
//! Definitions are stored with their raw (possibly templated) paths; every
//! value handed back to callers has `skillsDir`/`rulesFile` resolved.

use crate::error::{EntityKind, Error, Result};
use crate::model::PlatformDefinition;
use crate::store::ConfigStore;

/// Derives a stable id from a display name.
///
/// Lowercases, collapses every run of non-alphanumeric characters into one
/// hyphen and trims hyphens from both ends.
pub fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_hyphen = false;
    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !out.is_empty() {
                out.push('-');
            }
            pending_hyphen = false;
            out.push(c);
        } else {
            pending_hyphen = true;
        }
    }
    out
}

/// Input for [`PlatformRegistry::create`].
#[derive(Debug, Clone, Default)]
pub struct NewPlatform {
    pub name: String,
    pub skills_dir: String,
    pub rules_file: String,
    pub enabled: Option<bool>,
    pub linked_skills: Option<Vec<String>>,
    pub linked_rules: Option<Vec<String>>,
}

/// Input for [`PlatformRegistry::update`]; `Some` fields replace stored ones.
#[derive(Debug, Clone, Default)]
pub struct PlatformUpdate {
    pub id: String,
    pub name: Option<String>,
    pub skills_dir: Option<String>,
    pub rules_file: Option<String>,
    pub enabled: Option<bool>,
    pub linked_skills: Option<Vec<String>>,
    pub linked_rules: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct PlatformRegistry {
    store: ConfigStore,
}

impl PlatformRegistry {
    pub fn new(store: ConfigStore) -> Self {
        Self { store }
    }

    fn resolved(&self, mut def: PlatformDefinition) -> PlatformDefinition {
        def.skills_dir = self.store.resolve_path(&def.skills_dir);
        def.rules_file = self.store.resolve_path(&def.rules_file);
        def
    }

    pub async fn list(&self) -> Result<Vec<PlatformDefinition>> {
        let cfg = self.store.user_config().await;
        Ok(cfg
            .platforms
            .into_iter()
            .map(|p| self.resolved(p))
            .collect())
    }

    pub async fn get(&self, id: &str) -> Result<Option<PlatformDefinition>> {
        let cfg = self.store.user_config().await;
        Ok(cfg.platform(id).cloned().map(|p| self.resolved(p)))
    }

    /// Like [`get`](Self::get) but absent ids are [`Error::NotFound`].
    pub async fn require(&self, id: &str) -> Result<PlatformDefinition> {
        self.get(id)
            .await?
            .ok_or_else(|| Error::not_found(EntityKind::Platform, id))
    }

    pub async fn create(&self, new: NewPlatform) -> Result<PlatformDefinition> {
        let id = slugify(&new.name);
        if id.is_empty() {
            return Err(Error::Invalid(format!(
                "platform name {:?} does not yield an id",
                new.name
            )));
        }
        let def = PlatformDefinition {
            id: id.clone(),
            name: new.name,
            skills_dir: new.skills_dir,
            rules_file: new.rules_file,
            enabled: new.enabled.unwrap_or(true),
            linked_skills: new.linked_skills.unwrap_or_default(),
            linked_rules: new.linked_rules.unwrap_or_default(),
        };
        let stored = def.clone();
        self.store
            .edit_user_config(move |cfg| {
                if cfg.platform(&stored.id).is_some() {
                    return Err(Error::already_exists(EntityKind::Platform, &stored.id));
                }
                cfg.platforms.push(stored);
                Ok(())
            })
            .await?;
        tracing::info!(target: "skills_manager::platforms", platform = %id, "Platform created");
        Ok(self.resolved(def))
    }

    pub async fn update(&self, update: PlatformUpdate) -> Result<PlatformDefinition> {
        let def = self
            .store
            .edit_user_config(|cfg| {
                let def = cfg
                    .platform_mut(&update.id)
                    .ok_or_else(|| Error::not_found(EntityKind::Platform, &update.id))?;
                if let Some(name) = update.name {
                    def.name = name;
                }
                if let Some(skills_dir) = update.skills_dir {
                    def.skills_dir = skills_dir;
                }
                if let Some(rules_file) = update.rules_file {
                    def.rules_file = rules_file;
                }
                if let Some(enabled) = update.enabled {
                    def.enabled = enabled;
                }
                if let Some(linked_skills) = update.linked_skills {
                    def.linked_skills = linked_skills;
                }
                if let Some(linked_rules) = update.linked_rules {
                    def.linked_rules = linked_rules;
                }
                Ok(def.clone())
            })
            .await?;
        Ok(self.resolved(def))
    }

    /// Applies `edit` to the stored (unresolved) record under the store lock.
    pub async fn modify<F>(&self, id: &str, edit: F) -> Result<PlatformDefinition>
    where
        F: FnOnce(&mut PlatformDefinition),
    {
        let def = self
            .store
            .edit_user_config(|cfg| {
                let def = cfg
                    .platform_mut(id)
                    .ok_or_else(|| Error::not_found(EntityKind::Platform, id))?;
                edit(def);
                Ok(def.clone())
            })
            .await?;
        Ok(self.resolved(def))
    }

    /// Removes a platform; unknown ids are ignored.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let removed = self
            .store
            .edit_user_config(|cfg| {
                let before = cfg.platforms.len();
                cfg.platforms.retain(|p| p.id != id);
                Ok(before != cfg.platforms.len())
            })
            .await?;
        if removed {
            tracing::info!(target: "skills_manager::platforms", platform = %id, "Platform deleted");
        }
        Ok(())
    }
}
