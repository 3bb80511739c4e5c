//! Results reported by link and deploy operations.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// A skill link that exists after [`link`](crate::LinkEngine::link).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkOutcome {
    pub link_path: PathBuf,
    /// The org-prefixed name was used because the default one is taken.
    pub scoped: bool,
    /// False when a correct link was already in place.
    pub created: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlinkOutcome {
    /// A filesystem artifact (link or rule block) was removed.
    pub removed: bool,
    /// Only the association record was touched; the artifact could not be located.
    pub config_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployOutcome {
    pub rules_file: PathBuf,
    /// Where a displaced occupant was moved in [`DeployMode::Backup`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup: Option<PathBuf>,
}

/// How to treat a rules file path that cannot be merged into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployMode {
    /// Delete the occupant.
    Overwrite,
    /// Rename the occupant to `{rulesFile}.bak_{YYYYMMDDHHMMSS}`.
    Backup,
}

impl FromStr for DeployMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "overwrite" => Ok(DeployMode::Overwrite),
            "backup" => Ok(DeployMode::Backup),
            other => Err(format!("unknown deploy mode '{other}' (expected overwrite or backup)")),
        }
    }
}

/// State of a platform's rules file with respect to one rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    /// Platform absent or it has no rules file.
    Missing,
    /// Nothing at the rules file path.
    Clean,
    /// The rules file carries this rule's block.
    Linked,
    /// Something else occupies the path.
    Conflict,
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FileStatus::Missing => "missing",
            FileStatus::Clean => "clean",
            FileStatus::Linked => "linked",
            FileStatus::Conflict => "conflict",
        };
        f.write_str(label)
    }
}
