//! Exercises [`GitCli`] against a local source repository when git is installed.

use std::path::Path;
use std::process::Command;
use std::sync::Arc;
use std::time::Duration;

use skills_manager_repos::{GitCli, GitClient, RepositoryManager};
use skills_manager_state::{ConfigStore, StoreOptions, SystemConfigPatch, UpdateStatus};
use skills_manager_test_utils::{create_skill, TestFixture};

fn git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_AUTHOR_NAME", "Test")
        .env("GIT_AUTHOR_EMAIL", "test@example.com")
        .env("GIT_COMMITTER_NAME", "Test")
        .env("GIT_COMMITTER_EMAIL", "test@example.com")
        .status()
        .expect("run git");
    assert!(status.success(), "git {args:?} failed");
}

fn git_available() -> bool {
    which::which("git").is_ok()
}

#[tokio::test]
async fn clone_check_and_pull_against_local_source() {
    if !git_available() {
        eprintln!("git not installed; skipping");
        return;
    }
    let fixture = TestFixture::new().unwrap();
    let source = fixture.tempdir.path().join("remote/acme/toolkit");
    std::fs::create_dir_all(&source).unwrap();
    git(&source, &["init", "--quiet"]);
    create_skill(&source, "formatter", "formats code").unwrap();
    git(&source, &["add", "."]);
    git(&source, &["commit", "--quiet", "-m", "initial"]);

    let store = ConfigStore::open(
        StoreOptions::new(&fixture.system_config).with_debounce(Duration::from_millis(10)),
    );
    store
        .set_system_config(SystemConfigPatch {
            base_dir: Some(fixture.base_dir.clone()),
            ..Default::default()
        })
        .await
        .unwrap();
    let cli = GitCli::default();
    assert!(cli.version().await.unwrap().starts_with("git version"));
    let manager = RepositoryManager::new(store, Arc::new(cli));

    let url = format!("file://{}", source.display());
    let repo = manager.clone_repository(&url).await.unwrap();
    assert_eq!(repo.id, "acme_toolkit");
    assert!(repo.local_path.join("formatter/SKILL.MD").is_file());

    let check = manager.check_updates("acme_toolkit").await.unwrap();
    assert_eq!(check.error, None);
    assert!(!check.has_updates);

    create_skill(&source, "linter", "lints code").unwrap();
    git(&source, &["add", "."]);
    git(&source, &["commit", "--quiet", "-m", "add linter"]);

    let check = manager.check_updates("acme_toolkit").await.unwrap();
    assert_eq!(check.error, None);
    assert_eq!(check.behind_count, 1);
    assert_eq!(
        manager.require("acme_toolkit").await.unwrap().update_status,
        Some(UpdateStatus::Behind)
    );

    let pulled = manager.pull("acme_toolkit").await.unwrap();
    assert_eq!(pulled.update_status, Some(UpdateStatus::UpToDate));
    assert!(repo.local_path.join("linter/SKILL.MD").is_file());
}

#[tokio::test]
async fn clone_of_missing_remote_fails_cleanly() {
    if !git_available() {
        return;
    }
    let fixture = TestFixture::new().unwrap();
    let store = ConfigStore::open(
        StoreOptions::new(&fixture.system_config).with_debounce(Duration::from_millis(10)),
    );
    store
        .set_system_config(SystemConfigPatch {
            base_dir: Some(fixture.base_dir.clone()),
            ..Default::default()
        })
        .await
        .unwrap();
    let manager = RepositoryManager::new(store, Arc::new(GitCli::default()));

    let url = format!("file://{}/nowhere/acme/ghost", fixture.tempdir.path().display());
    assert!(manager.clone_repository(&url).await.is_err());
    assert!(!fixture.repo_path("acme_ghost").exists());
    assert!(manager.list().await.unwrap().is_empty());
}
