//! Directory link primitives.
//!
//! Links are directory symlinks on unix. On Windows they are directory
//! junctions, which need no elevated rights; a directory symlink is tried
//! only when the junction cannot be made, and a refused request surfaces as
//! [`Error::PermissionDenied`].

use std::io;
use std::path::{Path, PathBuf};

use skills_manager_state::{Error, IoResultExt, Result};

/// What currently sits at a would-be link path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkState {
    /// Nothing at the path.
    Missing,
    /// A symlink resolving to the expected target.
    Correct,
    /// A symlink pointing somewhere else (possibly dangling).
    OtherLink(PathBuf),
    /// A regular file or directory.
    Occupied,
}

impl LinkState {
    pub fn is_correct(&self) -> bool {
        matches!(self, LinkState::Correct)
    }
}

async fn same_location(a: &Path, b: &Path) -> bool {
    match (
        tokio::fs::canonicalize(a).await,
        tokio::fs::canonicalize(b).await,
    ) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Classifies `link` relative to the directory it should point at.
pub async fn inspect(link: &Path, target: &Path) -> Result<LinkState> {
    let meta = match tokio::fs::symlink_metadata(link).await {
        Ok(meta) => meta,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(LinkState::Missing),
        Err(err) => return Err(Error::io(link, err)),
    };
    if !meta.file_type().is_symlink() {
        return Ok(LinkState::Occupied);
    }
    let dest = tokio::fs::read_link(link).await.at_path(link)?;
    let absolute = match link.parent() {
        Some(parent) if dest.is_relative() => parent.join(&dest),
        _ => dest.clone(),
    };
    if same_location(&absolute, target).await {
        Ok(LinkState::Correct)
    } else {
        Ok(LinkState::OtherLink(dest))
    }
}

fn map_link_error(link: &Path, err: io::Error) -> Error {
    // ERROR_PRIVILEGE_NOT_HELD
    let privilege = cfg!(windows) && err.raw_os_error() == Some(1314);
    if privilege || err.kind() == io::ErrorKind::PermissionDenied {
        Error::PermissionDenied {
            path: link.to_path_buf(),
            source: err,
        }
    } else {
        Error::io(link, err)
    }
}

/// Creates a directory symlink at `link` pointing to `target`, creating parents.
pub async fn create_dir_link(target: &Path, link: &Path) -> Result<()> {
    if let Some(parent) = link.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|err| map_link_error(parent, err))?;
    }
    #[cfg(unix)]
    let created = tokio::fs::symlink(target, link).await;
    #[cfg(windows)]
    let created = create_junction(target, link).await;
    created.map_err(|err| map_link_error(link, err))
}

#[cfg(windows)]
async fn create_junction(target: &Path, link: &Path) -> io::Result<()> {
    let (junction_target, junction_path) = (target.to_path_buf(), link.to_path_buf());
    let made = tokio::task::spawn_blocking(move || junction::create(junction_target, junction_path))
        .await
        .map_err(io::Error::other)?;
    match made {
        Ok(()) => Ok(()),
        Err(err) => {
            tracing::debug!(
                target: "skills_manager::link",
                link = %link.display(),
                error = %err,
                "Junction failed, trying a directory symlink"
            );
            tokio::fs::symlink_dir(target, link).await
        }
    }
}

/// Removes a symlink (or Windows junction) without touching what it points to.
pub async fn remove_link(link: &Path) -> Result<()> {
    match tokio::fs::remove_file(link).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        #[cfg(windows)]
        Err(_) => tokio::fs::remove_dir(link).await.at_path(link),
        #[cfg(not(windows))]
        Err(err) => Err(Error::io(link, err)),
    }
}
