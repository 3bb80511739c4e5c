use clap::{Args, Parser, Subcommand, ValueEnum};
use skills_manager_state::Theme;
use skills_manager_sync::DeployMode;
use std::path::PathBuf;

/// Command-line interface for the `skills-manager` application.
#[derive(Debug, Parser)]
#[command(
    name = "skills-manager",
    version,
    about = "Share skills and rules across AI agent platforms"
)]
pub struct Cli {
    /// System config file (overrides the platform default location).
    #[arg(long, global = true, env = "SKILLS_MANAGER_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,
    /// Prints results as JSON.
    #[arg(long, global = true, default_value_t = false)]
    pub json: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Shows or edits the system configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Lists platform presets (built-in and configured).
    Presets,
    /// Manages target platforms.
    Platform {
        #[command(subcommand)]
        action: PlatformAction,
    },
    /// Manages skill repositories.
    Repo {
        #[command(subcommand)]
        action: RepoAction,
    },
    /// Lists skills and links them into platforms.
    Skill {
        #[command(subcommand)]
        action: SkillAction,
    },
    /// Manages rules and deploys them into platform rules files.
    Rule {
        #[command(subcommand)]
        action: RuleAction,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ThemeArg {
    Light,
    Dark,
    System,
}

impl From<ThemeArg> for Theme {
    fn from(value: ThemeArg) -> Self {
        match value {
            ThemeArg::Light => Theme::Light,
            ThemeArg::Dark => Theme::Dark,
            ThemeArg::System => Theme::System,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Prints the system configuration.
    Show,
    /// Updates system configuration fields.
    Set {
        /// Root directory for config/, skills/ and rules/.
        #[arg(long, value_name = "DIR")]
        base_dir: Option<PathBuf>,
        #[arg(long, value_enum)]
        theme: Option<ThemeArg>,
        #[arg(long)]
        language: Option<String>,
        /// Explicit git executable.
        #[arg(long, value_name = "PATH")]
        git_path: Option<PathBuf>,
    },
}

#[derive(Debug, Subcommand)]
pub enum PlatformAction {
    List,
    /// Adds a platform, optionally starting from a preset.
    Add {
        name: String,
        /// Preset name to copy paths from.
        #[arg(long)]
        preset: Option<String>,
        /// Skills directory; `${HOME}`-style variables are allowed.
        #[arg(long, value_name = "DIR")]
        skills_dir: Option<String>,
        #[arg(long, value_name = "FILE")]
        rules_file: Option<String>,
        /// Registers the platform disabled.
        #[arg(long, default_value_t = false)]
        disabled: bool,
    },
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, value_name = "DIR")]
        skills_dir: Option<String>,
        #[arg(long, value_name = "FILE")]
        rules_file: Option<String>,
        #[arg(long)]
        enabled: Option<bool>,
    },
    Remove {
        id: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum RepoAction {
    List,
    /// Clones a repository (`owner/repo` or a full git URL).
    Add {
        url: String,
    },
    Pull {
        id: String,
    },
    /// Checks one repository (or all) for upstream changes.
    Check {
        id: Option<String>,
    },
    Remove {
        id: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum SkillAction {
    List {
        /// Only skills from this repository.
        #[arg(long)]
        repo: Option<String>,
    },
    Link {
        skill_id: String,
        platform_id: String,
    },
    Unlink {
        skill_id: String,
        platform_id: String,
    },
}

/// Rule text given inline or read from a file.
#[derive(Debug, Args)]
#[group(multiple = false)]
pub struct ContentArgs {
    #[arg(long)]
    pub content: Option<String>,
    #[arg(long, value_name = "FILE")]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum RuleAction {
    List,
    Add {
        name: String,
        #[arg(long)]
        description: Option<String>,
        #[command(flatten)]
        content: ContentArgs,
    },
    /// Prints a rule's content.
    Show {
        id: String,
    },
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[command(flatten)]
        content: ContentArgs,
    },
    /// Undeploys a rule everywhere and deletes it.
    Remove {
        id: String,
    },
    Deploy {
        rule_id: String,
        platform_id: String,
        /// What to do when the rules file is a link or directory: overwrite or backup.
        #[arg(long)]
        mode: Option<DeployMode>,
    },
    Undeploy {
        rule_id: String,
        platform_id: String,
    },
    /// Shows whether a platform's rules file carries a rule.
    Status {
        platform_id: String,
        rule_id: String,
    },
    /// Rewrites every rule linked to a platform with current content.
    Redeploy {
        platform_id: String,
    },
}
