//! Persisted configuration records.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const SYSTEM_CONFIG_VERSION: u32 = 1;

/// UI theme preference, stored for the presentation layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

/// Process-wide configuration living at the fixed application-data path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_dir: Option<PathBuf>,
    #[serde(default)]
    pub theme: Theme,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Explicit git binary; when unset the binary is looked up on `PATH`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_path: Option<PathBuf>,
    #[serde(default)]
    pub presets: Vec<PlatformPreset>,
}

fn default_version() -> u32 {
    SYSTEM_CONFIG_VERSION
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            version: SYSTEM_CONFIG_VERSION,
            base_dir: None,
            theme: Theme::default(),
            language: None,
            git_path: None,
            presets: Vec::new(),
        }
    }
}

/// Shallow patch for [`SystemConfig`]; `Some` fields replace the stored value.
#[derive(Debug, Clone, Default)]
pub struct SystemConfigPatch {
    pub base_dir: Option<PathBuf>,
    pub theme: Option<Theme>,
    pub language: Option<String>,
    pub git_path: Option<PathBuf>,
    pub presets: Option<Vec<PlatformPreset>>,
}

impl SystemConfig {
    pub fn apply(&mut self, patch: SystemConfigPatch) {
        if let Some(base_dir) = patch.base_dir {
            self.base_dir = Some(base_dir);
        }
        if let Some(theme) = patch.theme {
            self.theme = theme;
        }
        if let Some(language) = patch.language {
            self.language = Some(language);
        }
        if let Some(git_path) = patch.git_path {
            self.git_path = Some(git_path);
        }
        if let Some(presets) = patch.presets {
            self.presets = presets;
        }
    }
}

/// A template for creating platforms (built-in or user-supplied).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformPreset {
    pub name: String,
    pub skills_dir: String,
    pub rules_file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A target installation with its own skills directory and rules file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformDefinition {
    pub id: String,
    pub name: String,
    pub skills_dir: String,
    #[serde(default)]
    pub rules_file: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub linked_skills: Vec<String>,
    #[serde(default)]
    pub linked_rules: Vec<String>,
}

fn default_true() -> bool {
    true
}

/// Sync state of a cloned repository relative to its remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpdateStatus {
    Checking,
    UpToDate,
    Behind,
    Error,
}

/// A cloned external repository holding skills.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillRepository {
    pub id: String,
    pub name: String,
    pub url: String,
    pub local_path: PathBuf,
    /// RFC 3339 timestamp of the last clone or pull.
    pub last_updated: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_status: Option<UpdateStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behind_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_error: Option<String>,
}

/// User-authored instruction text owned by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub local_path: PathBuf,
    #[serde(default)]
    pub linked_platforms: Vec<String>,
    pub created_at: String,
}

/// User-level configuration stored under `{baseDir}/config/`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserConfig {
    pub platforms: Vec<PlatformDefinition>,
    pub repositories: Vec<SkillRepository>,
    pub rules: Vec<Rule>,
}

/// Shallow patch for [`UserConfig`]; each `Some` collection replaces the stored one.
#[derive(Debug, Clone, Default)]
pub struct UserConfigPatch {
    pub platforms: Option<Vec<PlatformDefinition>>,
    pub repositories: Option<Vec<SkillRepository>>,
    pub rules: Option<Vec<Rule>>,
}

impl UserConfig {
    pub fn apply(&mut self, patch: UserConfigPatch) {
        if let Some(platforms) = patch.platforms {
            self.platforms = platforms;
        }
        if let Some(repositories) = patch.repositories {
            self.repositories = repositories;
        }
        if let Some(rules) = patch.rules {
            self.rules = rules;
        }
    }

    pub fn platform(&self, id: &str) -> Option<&PlatformDefinition> {
        self.platforms.iter().find(|p| p.id == id)
    }

    pub fn platform_mut(&mut self, id: &str) -> Option<&mut PlatformDefinition> {
        self.platforms.iter_mut().find(|p| p.id == id)
    }

    pub fn repository(&self, id: &str) -> Option<&SkillRepository> {
        self.repositories.iter().find(|r| r.id == id)
    }

    pub fn repository_mut(&mut self, id: &str) -> Option<&mut SkillRepository> {
        self.repositories.iter_mut().find(|r| r.id == id)
    }

    pub fn rule(&self, id: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.id == id)
    }

    pub fn rule_mut(&mut self, id: &str) -> Option<&mut Rule> {
        self.rules.iter_mut().find(|r| r.id == id)
    }

    /// Ids of platforms whose `linkedSkills` contain `skill_id`.
    pub fn platforms_linking_skill(&self, skill_id: &str) -> Vec<String> {
        self.platforms
            .iter()
            .filter(|p| p.linked_skills.iter().any(|s| s == skill_id))
            .map(|p| p.id.clone())
            .collect()
    }

    /// Ids of platforms whose `linkedRules` contain `rule_id`.
    pub fn platforms_linking_rule(&self, rule_id: &str) -> Vec<String> {
        self.platforms
            .iter()
            .filter(|p| p.linked_rules.iter().any(|r| r == rule_id))
            .map(|p| p.id.clone())
            .collect()
    }
}

/// Current UTC time as RFC 3339.
pub fn now_rfc3339() -> String {
    use time::format_description::well_known::Rfc3339;
    time::OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}
