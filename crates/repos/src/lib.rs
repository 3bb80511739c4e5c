//! Skill repository management for skills-manager.
//!
//! Repositories are shallow git clones living under `{baseDir}/skills/{owner_repo}`.
//! [`RepositoryManager`] owns their lifecycle and records; git itself sits
//! behind the [`GitClient`] trait so tests can substitute a fake.

#![deny(unsafe_code)]

pub mod git;
pub mod manager;
pub mod url;

pub use git::{
    resolve_git_binary, AheadBehind, GitCli, GitClient, ProgressSender, DEFAULT_MAX_CONCURRENT,
};
pub use manager::{RepoProgress, RepositoryManager, UpdateCheck};
pub use url::{normalize_url, org_from_url, repo_identity, RepoIdentity};
