//! On-disk layout and YAML persistence for both config domains.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, IoResultExt, Result};
use crate::model::{PlatformDefinition, Rule, SkillRepository, SystemConfig, UserConfig};

pub const PLATFORMS_FILE: &str = "ai-agent.yaml";
pub const REPOSITORIES_FILE: &str = "skills.yaml";
pub const RULES_FILE: &str = "rules.yaml";

const SYSTEM_HEADER: &str = "\
# skills-manager system configuration
#
# baseDir  - root directory holding config/, skills/ and rules/
# presets  - additional platform presets merged with the built-in catalog
";

const PLATFORMS_HEADER: &str = "\
# skills-manager platforms
#
# Each platform has a skills directory that receives skill links and a
# rules file that receives merged rule blocks. linkedSkills/linkedRules
# record which skills and rules are exposed to the platform.
";

const REPOSITORIES_HEADER: &str = "\
# skills-manager skill repositories
#
# Repositories are shallow clones stored under {baseDir}/skills/{id}.
";

const RULES_HEADER: &str = "\
# skills-manager rule catalog
#
# Rule content lives in {baseDir}/rules/{id}.md.
";

#[derive(Debug, Default, Serialize, Deserialize)]
struct PlatformsDoc {
    #[serde(default)]
    platforms: Vec<PlatformDefinition>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RepositoriesDoc {
    #[serde(default)]
    repositories: Vec<SkillRepository>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RulesDoc {
    #[serde(default)]
    rules: Vec<Rule>,
}

/// Directory holding the user config files for a base directory.
pub fn config_dir(base_dir: &Path) -> PathBuf {
    base_dir.join("config")
}

/// Reads a YAML document, falling back to its default when the file is
/// missing, empty or corrupt. Corruption is logged, never fatal.
async fn read_or_default<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(
                target: "skills_manager::store",
                path = %path.display(),
                "Config file missing, using defaults"
            );
            return T::default();
        }
        Err(err) => {
            tracing::warn!(
                target: "skills_manager::store",
                path = %path.display(),
                error = %err,
                "Failed to read config file, using defaults"
            );
            return T::default();
        }
    };
    if text.trim().is_empty() {
        return T::default();
    }
    match serde_yaml::from_str(&text) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(
                target: "skills_manager::store",
                path = %path.display(),
                error = %err,
                "Corrupt config file, using defaults"
            );
            T::default()
        }
    }
}

/// Serializes `value` under a comment header and writes it atomically.
async fn write_with_header<T: Serialize>(path: &Path, header: &str, value: &T) -> Result<()> {
    let body = serde_yaml::to_string(value).map_err(|source| Error::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    let mut text = String::with_capacity(header.len() + body.len() + 1);
    text.push_str(header);
    text.push('\n');
    text.push_str(&body);
    write_atomic(path, text.as_bytes()).await
}

/// Writes via a sibling temp file and rename so readers never see a torn file.
pub async fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.at_path(parent)?;
    }
    let mut temp_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);
    tokio::fs::write(&temp_path, data).await.at_path(&temp_path)?;
    tokio::fs::rename(&temp_path, path).await.at_path(path)?;
    Ok(())
}

pub async fn load_system(path: &Path) -> SystemConfig {
    read_or_default(path).await
}

pub async fn save_system(path: &Path, config: &SystemConfig) -> Result<()> {
    write_with_header(path, SYSTEM_HEADER, config).await
}

pub async fn load_user(config_dir: &Path) -> UserConfig {
    let platforms: PlatformsDoc = read_or_default(&config_dir.join(PLATFORMS_FILE)).await;
    let repositories: RepositoriesDoc =
        read_or_default(&config_dir.join(REPOSITORIES_FILE)).await;
    let rules: RulesDoc = read_or_default(&config_dir.join(RULES_FILE)).await;
    UserConfig {
        platforms: platforms.platforms,
        repositories: repositories.repositories,
        rules: rules.rules,
    }
}

pub async fn save_user(config_dir: &Path, config: &UserConfig) -> Result<()> {
    write_with_header(
        &config_dir.join(PLATFORMS_FILE),
        PLATFORMS_HEADER,
        &PlatformsDoc {
            platforms: config.platforms.clone(),
        },
    )
    .await?;
    write_with_header(
        &config_dir.join(REPOSITORIES_FILE),
        REPOSITORIES_HEADER,
        &RepositoriesDoc {
            repositories: config.repositories.clone(),
        },
    )
    .await?;
    write_with_header(
        &config_dir.join(RULES_FILE),
        RULES_HEADER,
        &RulesDoc {
            rules: config.rules.clone(),
        },
    )
    .await
}
