//! Persistent state for skills-manager.
//!
//! This crate owns:
//! - The error taxonomy shared by every component.
//! - Path-variable resolution for stored paths.
//! - The debounced [`ConfigStore`] holding the system and user config domains.
//! - [`PlatformRegistry`] and [`RuleCatalog`], the CRUD layers over user config.

#![deny(unsafe_code)]

pub mod env;
pub mod error;
pub mod model;
pub mod persistence;
pub mod platforms;
pub mod rules;
pub mod store;

pub use env::{home_dir, resolve_path_vars, system_config_path, PathVars};
pub use error::{EntityKind, Error, IoResultExt, Result};
pub use model::{
    now_rfc3339, PlatformDefinition, PlatformPreset, Rule, SkillRepository, SystemConfig,
    SystemConfigPatch, Theme, UpdateStatus, UserConfig, UserConfigPatch,
};
pub use persistence::write_atomic;
pub use platforms::{slugify, NewPlatform, PlatformRegistry, PlatformUpdate};
pub use rules::{RuleCatalog, RuleUpdate};
pub use store::{ConfigStore, StoreOptions, DEFAULT_DEBOUNCE};
