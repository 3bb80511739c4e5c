//! Link and deploy engine for skills-manager.
//!
//! Keeps platform associations (`linkedSkills`, `linkedRules`) in step with
//! the artifacts that realize them:
//! - skills are exposed as directory links in the platform's skills directory,
//!   falling back to an org-prefixed name when the plain name is taken;
//! - rules are merged into the platform's rules file as marker-delimited
//!   blocks that can be replaced or removed without touching the rest.
//!
//! # Examples
//!
//! ```
//! use skills_manager_sync::markers::{merge_block, strip_block};
//!
//! let original = "# My notes\n";
//! let deployed = merge_block(original, "style", "Prefer tabs.");
//! assert!(deployed.contains("Prefer tabs."));
//! assert_eq!(strip_block(&deployed, "style"), original);
//! ```

#![deny(unsafe_code)]

mod engine;
pub mod fs_link;
pub mod markers;
mod outcome;
mod rules;
mod skills;

pub use engine::LinkEngine;
pub use outcome::{DeployMode, DeployOutcome, FileStatus, LinkOutcome, UnlinkOutcome};
pub use rules::backup_path;
