//! Command handlers behind the CLI.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use skills_manager_state::{NewPlatform, PlatformUpdate, RuleUpdate, SystemConfigPatch};

use crate::app_config::AppConfig;
use crate::cli::{
    Cli, Commands, ConfigAction, ContentArgs, PlatformAction, RepoAction, RuleAction, SkillAction,
};
use crate::manager::SkillsManager;

/// Prints either JSON or a human rendering.
#[derive(Debug, Clone, Copy)]
struct Output {
    json: bool,
}

impl Output {
    fn emit<T: Serialize>(&self, value: &T, human: impl FnOnce(&T)) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            human(value);
        }
        Ok(())
    }
}

pub(crate) async fn dispatch(cli: Cli) -> Result<()> {
    let config = match cli.config {
        Some(path) => AppConfig::at(path),
        None => AppConfig::from_env()?,
    };
    let manager = SkillsManager::open(config).await;
    let out = Output { json: cli.json };

    let result = match cli.command {
        Commands::Config { action } => handle_config(&manager, out, action).await,
        Commands::Presets => handle_presets(&manager, out).await,
        Commands::Platform { action } => handle_platform(&manager, out, action).await,
        Commands::Repo { action } => handle_repo(&manager, out, action).await,
        Commands::Skill { action } => handle_skill(&manager, out, action).await,
        Commands::Rule { action } => handle_rule(&manager, out, action).await,
    };
    let flushed = manager.shutdown().await;
    result?;
    flushed.context("writing configuration")?;
    Ok(())
}

async fn handle_config(manager: &SkillsManager, out: Output, action: ConfigAction) -> Result<()> {
    let store = manager.store();
    let config = match action {
        ConfigAction::Show => store.system_config().await,
        ConfigAction::Set {
            base_dir,
            theme,
            language,
            git_path,
        } => {
            store
                .set_system_config(SystemConfigPatch {
                    base_dir,
                    theme: theme.map(Into::into),
                    language,
                    git_path,
                    presets: None,
                })
                .await?
        }
    };
    out.emit(&config, |c| {
        println!("Config file: {}", store.system_config_path().display());
        match &c.base_dir {
            Some(dir) => println!("Base directory: {}", dir.display()),
            None => println!("Base directory: (not set)"),
        }
        println!("Theme: {:?}", c.theme);
        if let Some(language) = &c.language {
            println!("Language: {language}");
        }
        if let Some(git) = &c.git_path {
            println!("Git: {}", git.display());
        }
        println!("Version: {}", SkillsManager::app_version());
    })
}

async fn handle_presets(manager: &SkillsManager, out: Output) -> Result<()> {
    let presets = manager.store().presets().await;
    out.emit(&presets, |presets| {
        for p in presets {
            println!("{}", p.name);
            println!("  skills: {}", p.skills_dir);
            println!("  rules:  {}", p.rules_file);
        }
    })
}

async fn handle_platform(
    manager: &SkillsManager,
    out: Output,
    action: PlatformAction,
) -> Result<()> {
    let platforms = manager.platforms();
    match action {
        PlatformAction::List => {
            let list = platforms.list().await?;
            out.emit(&list, |list| {
                if list.is_empty() {
                    println!("No platforms configured.");
                }
                for p in list {
                    let state = if p.enabled { "" } else { " (disabled)" };
                    println!("{} [{}]{state}", p.name, p.id);
                    println!("  skills: {} ({} linked)", p.skills_dir, p.linked_skills.len());
                    println!("  rules:  {} ({} linked)", p.rules_file, p.linked_rules.len());
                }
            })
        }
        PlatformAction::Add {
            name,
            preset,
            skills_dir,
            rules_file,
            disabled,
        } => {
            let preset = match preset {
                Some(wanted) => Some(
                    manager
                        .store()
                        .presets()
                        .await
                        .into_iter()
                        .find(|p| p.name.eq_ignore_ascii_case(&wanted))
                        .ok_or_else(|| anyhow!("unknown preset '{wanted}'"))?,
                ),
                None => None,
            };
            let skills_dir = skills_dir
                .or_else(|| preset.as_ref().map(|p| p.skills_dir.clone()))
                .ok_or_else(|| anyhow!("--skills-dir or --preset is required"))?;
            let rules_file = rules_file
                .or_else(|| preset.as_ref().map(|p| p.rules_file.clone()))
                .unwrap_or_default();
            let created = platforms
                .create(NewPlatform {
                    name,
                    skills_dir,
                    rules_file,
                    enabled: Some(!disabled),
                    ..Default::default()
                })
                .await?;
            out.emit(&created, |p| println!("Added platform {} [{}]", p.name, p.id))
        }
        PlatformAction::Update {
            id,
            name,
            skills_dir,
            rules_file,
            enabled,
        } => {
            let updated = platforms
                .update(PlatformUpdate {
                    id,
                    name,
                    skills_dir,
                    rules_file,
                    enabled,
                    ..Default::default()
                })
                .await?;
            out.emit(&updated, |p| println!("Updated platform {}", p.id))
        }
        PlatformAction::Remove { id } => {
            platforms.delete(&id).await?;
            out.emit(&id, |id| println!("Removed platform {id}"))
        }
    }
}

async fn handle_repo(manager: &SkillsManager, out: Output, action: RepoAction) -> Result<()> {
    let repos = manager.repositories();
    match action {
        RepoAction::List => {
            let list = repos.list().await?;
            out.emit(&list, |list| {
                if list.is_empty() {
                    println!("No repositories.");
                }
                for r in list {
                    let status = r
                        .update_status
                        .map(|s| format!(" {s:?}"))
                        .unwrap_or_default();
                    println!("{} [{}]{status}", r.name, r.id);
                    println!("  {}", r.url);
                    if let Some(err) = &r.check_error {
                        println!("  last check failed: {err}");
                    }
                }
            })
        }
        RepoAction::Add { url } => {
            let mut progress = repos.subscribe();
            let show_progress = !out.json;
            let clone = repos.clone_repository(&url);
            tokio::pin!(clone);
            let repo = loop {
                tokio::select! {
                    result = &mut clone => break result?,
                    Ok(event) = progress.recv() => {
                        if show_progress {
                            eprintln!("{}", event.line);
                        }
                    }
                }
            };
            while let Ok(event) = progress.try_recv() {
                if show_progress {
                    eprintln!("{}", event.line);
                }
            }
            out.emit(&repo, |r| {
                println!("Cloned {} into {}", r.name, r.local_path.display())
            })
        }
        RepoAction::Pull { id } => {
            let repo = repos.pull(&id).await?;
            out.emit(&repo, |r| println!("Pulled {}", r.name))
        }
        RepoAction::Check { id } => {
            let checks = match id {
                Some(id) => vec![repos.check_updates(&id).await?],
                None => repos.check_all_updates().await,
            };
            out.emit(&checks, |checks| {
                for c in checks {
                    match &c.error {
                        Some(err) => println!("{}: check failed: {err}", c.repo_id),
                        None if c.has_updates => {
                            println!("{}: {} commit(s) behind", c.repo_id, c.behind_count)
                        }
                        None => println!("{}: up to date", c.repo_id),
                    }
                }
            })
        }
        RepoAction::Remove { id } => {
            repos.delete(&id).await?;
            out.emit(&id, |id| println!("Removed repository {id}"))
        }
    }
}

async fn handle_skill(manager: &SkillsManager, out: Output, action: SkillAction) -> Result<()> {
    match action {
        SkillAction::List { repo } => {
            let skills = match repo {
                Some(repo) => manager.skills().list_for_repo(&repo).await?,
                None => manager.skills().list_all().await?,
            };
            out.emit(&skills, |skills| {
                if skills.is_empty() {
                    println!("No skills found.");
                }
                for s in skills {
                    println!("{}", s.id);
                    if !s.description.is_empty() {
                        println!("  {}", s.description);
                    }
                    if !s.linked_platforms.is_empty() {
                        println!("  linked: {}", s.linked_platforms.join(", "));
                    }
                }
            })
        }
        SkillAction::Link {
            skill_id,
            platform_id,
        } => {
            let outcome = manager.links().link(&skill_id, &platform_id).await?;
            out.emit(&outcome, |o| {
                let verb = if o.created { "Linked" } else { "Already linked" };
                println!("{verb}: {}", o.link_path.display());
            })
        }
        SkillAction::Unlink {
            skill_id,
            platform_id,
        } => {
            let outcome = manager.links().unlink(&skill_id, &platform_id).await?;
            out.emit(&outcome, |o| {
                if o.config_only {
                    println!("Removed association only; no link could be located");
                } else if o.removed {
                    println!("Unlinked {skill_id}");
                } else {
                    println!("No link found; association removed");
                }
            })
        }
    }
}

async fn read_content(args: ContentArgs) -> Result<Option<String>> {
    match (args.content, args.file) {
        (Some(text), _) => Ok(Some(text)),
        (None, Some(path)) => Ok(Some(read_file(path).await?)),
        (None, None) => Ok(None),
    }
}

async fn read_file(path: PathBuf) -> Result<String> {
    tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("reading {}", path.display()))
}

async fn handle_rule(manager: &SkillsManager, out: Output, action: RuleAction) -> Result<()> {
    let rules = manager.rules();
    let links = manager.links();
    match action {
        RuleAction::List => {
            let list = rules.list().await?;
            out.emit(&list, |list| {
                if list.is_empty() {
                    println!("No rules.");
                }
                for r in list {
                    println!("{} [{}]", r.name, r.id);
                    if let Some(desc) = &r.description {
                        println!("  {desc}");
                    }
                    if !r.linked_platforms.is_empty() {
                        println!("  deployed to: {}", r.linked_platforms.join(", "));
                    }
                }
            })
        }
        RuleAction::Add {
            name,
            description,
            content,
        } => {
            let content = read_content(content).await?;
            let rule = rules.create(&name, description, content.as_deref()).await?;
            out.emit(&rule, |r| {
                println!("Added rule {} at {}", r.id, r.local_path.display())
            })
        }
        RuleAction::Show { id } => {
            let text = rules.content(&id).await?;
            out.emit(&text, |t| print!("{t}"))
        }
        RuleAction::Edit {
            id,
            name,
            description,
            content,
        } => {
            if let Some(text) = read_content(content).await? {
                rules.set_content(&id, &text).await?;
            }
            let rule = if name.is_some() || description.is_some() {
                rules
                    .update(RuleUpdate {
                        id,
                        name,
                        description,
                    })
                    .await?
            } else {
                rules.require(&id).await?
            };
            out.emit(&rule, |r| println!("Updated rule {}", r.id))
        }
        RuleAction::Remove { id } => {
            manager.delete_rule(&id).await?;
            out.emit(&id, |id| println!("Removed rule {id}"))
        }
        RuleAction::Deploy {
            rule_id,
            platform_id,
            mode,
        } => {
            let outcome = links.deploy(&rule_id, &platform_id, mode).await?;
            out.emit(&outcome, |o| {
                println!("Deployed {rule_id} into {}", o.rules_file.display());
                if let Some(backup) = &o.backup {
                    println!("Previous file moved to {}", backup.display());
                }
            })
        }
        RuleAction::Undeploy {
            rule_id,
            platform_id,
        } => {
            let outcome = links.undeploy(&rule_id, &platform_id).await?;
            out.emit(&outcome, |o| {
                if o.removed {
                    println!("Removed {rule_id} from {platform_id}");
                } else {
                    println!("{rule_id} was not present in {platform_id}'s rules file");
                }
            })
        }
        RuleAction::Status {
            platform_id,
            rule_id,
        } => {
            let status = links.check_file_status(&platform_id, &rule_id).await?;
            out.emit(&status, |s| println!("{s}"))
        }
        RuleAction::Redeploy { platform_id } => {
            let written = links.redeploy(&platform_id).await?;
            out.emit(&written, |w| {
                println!("Redeployed {} rule(s) to {platform_id}", w.len())
            })
        }
    }
}
