//! Command-line interface for the `skills-manager` application.
//!
//! This crate is the executable entry point; parsing, logging setup and every
//! command live in the `skills-manager-app` crate.

fn main() -> anyhow::Result<()> {
    skills_manager_app::run()
}
