//! Skill discovery for skills-manager.
//!
//! A skill is any directory inside a cloned repository that directly holds
//! a `SKILL.MD` manifest. This crate provides:
//! - A bounded, hidden-directory-pruning scan of one working tree.
//! - Description extraction from the manifest.
//! - [`SkillIndex`], listing skills across registered repositories with the
//!   platforms that currently link each one.
//!
//! # Examples
//!
//! ```
//! use skills_manager_discovery::scan_skills;
//! use tempfile::tempdir;
//!
//! let temp = tempdir().unwrap();
//! let skill_dir = temp.path().join("alpha");
//! std::fs::create_dir_all(&skill_dir).unwrap();
//! std::fs::write(skill_dir.join("SKILL.MD"), "description: First skill\n").unwrap();
//!
//! let skills = scan_skills(temp.path(), "acme_toolkit");
//! assert_eq!(skills.len(), 1);
//! assert_eq!(skills[0].id, "acme_toolkit/alpha");
//! assert_eq!(skills[0].description, "First skill");
//! ```

#![deny(unsafe_code)]

/// Listings across registered repositories.
pub mod index;
/// Working-tree scanning and manifest parsing.
pub mod scanner;
/// The skill record.
pub mod types;

pub use index::SkillIndex;
pub use scanner::{
    extract_description, is_hidden_component, scan_skills, MANIFEST_FILE, MAX_SCAN_DEPTH,
};
pub use types::{split_skill_id, Skill};
