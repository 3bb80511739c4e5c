//! Repository URL normalization and identity.

use std::sync::LazyLock;

use regex::Regex;
use skills_manager_state::{Error, Result};

static SHORTHAND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w-]+/[\w.-]+$").expect("shorthand pattern is valid"));

/// Owner and repository name parsed from a clone URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoIdentity {
    pub owner: String,
    pub repo: String,
}

impl RepoIdentity {
    /// Stable registry id, `owner_repo`.
    pub fn id(&self) -> String {
        format!("{}_{}", self.owner, self.repo)
    }

    /// Display name, `owner/repo`.
    pub fn display_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

fn strip_git_suffix(value: &str) -> &str {
    match value.strip_suffix(".git") {
        Some(stripped) if !stripped.is_empty() => stripped,
        _ => value,
    }
}

/// Expands `owner/repo` shorthand to a GitHub HTTPS URL.
///
/// Anything else (explicit scheme, scp-style `git@host:path`, local paths) is
/// returned as given, minus surrounding whitespace and a trailing slash.
///
/// ```
/// use skills_manager_repos::normalize_url;
///
/// assert_eq!(normalize_url("acme/toolkit"), "https://github.com/acme/toolkit.git");
/// assert_eq!(normalize_url("git@github.com:acme/toolkit.git"), "git@github.com:acme/toolkit.git");
/// ```
pub fn normalize_url(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    if SHORTHAND.is_match(trimmed) {
        if let Some((owner, repo)) = trimmed.split_once('/') {
            return format!("https://github.com/{owner}/{}.git", strip_git_suffix(repo));
        }
    }
    trimmed.to_string()
}

/// Path part of a URL with scheme and host removed.
fn url_path(url: &str) -> &str {
    if let Some((_, rest)) = url.split_once("://") {
        return rest.split_once('/').map(|(_, path)| path).unwrap_or("");
    }
    // scp-like syntax: user@host:path
    if let Some((head, path)) = url.split_once(':') {
        if head.contains('@') && !head.contains('/') {
            return path;
        }
    }
    url
}

/// Parses the last two path segments of `url` as owner and repository.
pub fn repo_identity(url: &str) -> Result<RepoIdentity> {
    let normalized = normalize_url(url);
    let path = strip_git_suffix(url_path(&normalized).trim_end_matches('/'));
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        [.., owner, repo] => Ok(RepoIdentity {
            owner: (*owner).to_string(),
            repo: (*repo).to_string(),
        }),
        _ => Err(Error::Invalid(format!(
            "cannot derive owner/repo from repository URL {url:?}"
        ))),
    }
}

/// Organisation (owner) segment of a repository URL, if one can be found.
///
/// Handles `https://host/org/repo`, `git@host:org/repo` and falls back to the
/// second-to-last path segment for anything else.
pub fn org_from_url(url: &str) -> Option<String> {
    repo_identity(url).ok().map(|identity| identity.owner)
}
