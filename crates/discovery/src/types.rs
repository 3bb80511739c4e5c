use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A skill bundle discovered inside a repository working tree.
///
/// Skills are never persisted; they exist while their manifest exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    /// `{repoId}/{relative path}` with `/` separators.
    pub id: String,
    pub repo_id: String,
    /// The skill directory's own name.
    pub name: String,
    /// Absolute path of the skill directory.
    pub local_path: PathBuf,
    pub description: String,
    /// Platforms whose `linkedSkills` contain this skill (computed on read).
    #[serde(default)]
    pub linked_platforms: Vec<String>,
}

/// Splits a skill id into its repository id and relative path.
///
/// ```
/// use skills_manager_discovery::split_skill_id;
///
/// assert_eq!(split_skill_id("acme_toolkit/tools/fmt"), Some(("acme_toolkit", "tools/fmt")));
/// assert_eq!(split_skill_id("no-slash"), None);
/// ```
pub fn split_skill_id(id: &str) -> Option<(&str, &str)> {
    id.split_once('/')
        .filter(|(repo, rel)| !repo.is_empty() && !rel.is_empty())
}
