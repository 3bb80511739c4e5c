//! Error taxonomy shared by every skills-manager component.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Result type used across the skills-manager library crates.
pub type Result<T> = std::result::Result<T, Error>;

/// The kind of entity an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Platform,
    Skill,
    Rule,
    Repository,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EntityKind::Platform => "platform",
            EntityKind::Skill => "skill",
            EntityKind::Rule => "rule",
            EntityKind::Repository => "repository",
        };
        f.write_str(label)
    }
}

/// Errors raised by the configuration store, registries and the link engine.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A referenced platform, skill, rule or repository id is absent.
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    /// An id or URL is already registered.
    #[error("{kind} already exists: {id}")]
    AlreadyExists { kind: EntityKind, id: String },

    /// A filesystem path is occupied by something this tool does not manage.
    #[error("conflict at {}: {reason}", path.display())]
    Conflict { path: PathBuf, reason: String },

    /// The host refused to create a symbolic link.
    #[error(
        "permission denied creating link at {}: administrator rights or developer mode may be required",
        path.display()
    )]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Underlying filesystem failure.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A version-control command failed.
    #[error("git {command} failed: {message}")]
    Git { command: String, message: String },

    /// A config file could not be parsed or serialized.
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The user-level base directory has not been configured yet.
    #[error("base directory is not configured")]
    BaseDirUnset,

    /// The caller supplied input that cannot be used (empty name, bad URL, ...).
    #[error("invalid input: {0}")]
    Invalid(String),
}

impl Error {
    pub fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        Error::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn already_exists(kind: EntityKind, id: impl Into<String>) -> Self {
        Error::AlreadyExists {
            kind,
            id: id.into(),
        }
    }

    pub fn conflict(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::Conflict {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns true for [`Error::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Returns true for [`Error::AlreadyExists`].
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Error::AlreadyExists { .. })
    }

    /// Returns true for [`Error::Conflict`].
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict { .. })
    }
}

/// Attaches the offending path to a raw `io::Error`.
pub trait IoResultExt<T> {
    fn at_path(self, path: &Path) -> Result<T>;
}

impl<T> IoResultExt<T> for std::result::Result<T, io::Error> {
    fn at_path(self, path: &Path) -> Result<T> {
        self.map_err(|source| Error::io(path, source))
    }
}
