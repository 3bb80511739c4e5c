//! Integration tests for skill links and rule deployment.
//!
//! Test categories:
//! 1. Skill links (default names, scoped fallback, idempotence, conflicts)
//! 2. Unlinking, including the config-only path after a repository is gone
//! 3. Rule blocks (round trip, status, redeploy, displaced occupants)

#![cfg(unix)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use skills_manager_state::{
    now_rfc3339, ConfigStore, NewPlatform, PlatformDefinition, PlatformRegistry, RuleCatalog,
    SkillRepository, StoreOptions, SystemConfigPatch,
};
use skills_manager_sync::{DeployMode, FileStatus, LinkEngine};
use skills_manager_test_utils::{create_skill, TestFixture};

// =============================================================================
// Test Fixtures and Helpers
// =============================================================================

struct LinkTestContext {
    fixture: TestFixture,
    store: ConfigStore,
    engine: LinkEngine,
}

impl LinkTestContext {
    async fn new() -> Self {
        let fixture = TestFixture::new().expect("fixture");
        let store = ConfigStore::open(
            StoreOptions::new(&fixture.system_config).with_debounce(Duration::from_millis(10)),
        );
        store
            .set_system_config(SystemConfigPatch {
                base_dir: Some(fixture.base_dir.clone()),
                ..Default::default()
            })
            .await
            .expect("set base dir");
        let engine = LinkEngine::new(store.clone());
        Self {
            fixture,
            store,
            engine,
        }
    }

    /// Registers `{owner}/{repo}` with skills at the given relative paths.
    async fn add_repo(&self, owner: &str, repo: &str, skills: &[&str]) -> String {
        let id = format!("{owner}_{repo}");
        let path = self.fixture.repo_path(&id);
        for rel in skills {
            create_skill(&path, rel, &format!("{rel} from {owner}")).expect("skill");
        }
        let record = SkillRepository {
            id: id.clone(),
            name: format!("{owner}/{repo}"),
            url: format!("https://github.com/{owner}/{repo}.git"),
            local_path: path,
            last_updated: now_rfc3339(),
            update_status: None,
            behind_count: None,
            check_error: None,
        };
        self.store
            .edit_user_config(move |cfg| {
                cfg.repositories.push(record);
                Ok(())
            })
            .await
            .expect("register repo");
        id
    }

    async fn add_platform(&self, name: &str) -> PlatformDefinition {
        PlatformRegistry::new(self.store.clone())
            .create(NewPlatform {
                name: name.into(),
                skills_dir: self.skills_dir(name).display().to_string(),
                rules_file: self.rules_file(name).display().to_string(),
                ..Default::default()
            })
            .await
            .expect("platform")
    }

    fn skills_dir(&self, platform: &str) -> PathBuf {
        self.fixture.platform_skills_dir(platform)
    }

    fn rules_file(&self, platform: &str) -> PathBuf {
        self.fixture.platform_rules_file(platform)
    }

    async fn platform(&self, id: &str) -> PlatformDefinition {
        PlatformRegistry::new(self.store.clone())
            .require(id)
            .await
            .expect("platform exists")
    }

    fn rules(&self) -> RuleCatalog {
        RuleCatalog::new(self.store.clone())
    }
}

fn link_target(link: &Path) -> PathBuf {
    std::fs::read_link(link).expect("is a symlink")
}

// =============================================================================
// 1. Skill links
// =============================================================================

#[tokio::test]
async fn link_creates_default_named_symlink_and_records_association() {
    let ctx = LinkTestContext::new().await;
    let repo = ctx.add_repo("acme", "toolkit", &["formatter"]).await;
    let platform = ctx.add_platform("P").await;

    let outcome = ctx
        .engine
        .link("acme_toolkit/formatter", &platform.id)
        .await
        .unwrap();
    let expected = ctx.skills_dir("P").join("formatter");
    assert_eq!(outcome.link_path, expected);
    assert!(outcome.created);
    assert!(!outcome.scoped);
    assert_eq!(
        link_target(&expected),
        ctx.fixture.repo_path(&repo).join("formatter")
    );
    assert_eq!(
        ctx.platform(&platform.id).await.linked_skills,
        vec!["acme_toolkit/formatter".to_string()]
    );
}

#[tokio::test]
async fn linking_twice_is_idempotent() {
    let ctx = LinkTestContext::new().await;
    ctx.add_repo("acme", "toolkit", &["formatter"]).await;
    let platform = ctx.add_platform("P").await;

    ctx.engine
        .link("acme_toolkit/formatter", &platform.id)
        .await
        .unwrap();
    let again = ctx
        .engine
        .link("acme_toolkit/formatter", &platform.id)
        .await
        .unwrap();
    assert!(!again.created);
    assert_eq!(ctx.platform(&platform.id).await.linked_skills.len(), 1);
    assert_eq!(std::fs::read_dir(ctx.skills_dir("P")).unwrap().count(), 1);
}

#[tokio::test]
async fn same_named_skills_from_different_orgs_get_distinct_links() {
    let ctx = LinkTestContext::new().await;
    ctx.add_repo("acme", "toolkit", &["fmt"]).await;
    ctx.add_repo("beta", "pack", &["tools/fmt"]).await;
    let platform = ctx.add_platform("P").await;

    let first = ctx
        .engine
        .link("acme_toolkit/fmt", &platform.id)
        .await
        .unwrap();
    let second = ctx
        .engine
        .link("beta_pack/tools/fmt", &platform.id)
        .await
        .unwrap();

    assert_eq!(first.link_path, ctx.skills_dir("P").join("fmt"));
    assert_eq!(second.link_path, ctx.skills_dir("P").join("beta-fmt"));
    assert!(second.scoped);
    assert_ne!(link_target(&first.link_path), link_target(&second.link_path));

    // re-linking finds the scoped link instead of creating a third artifact
    let again = ctx
        .engine
        .link("beta_pack/tools/fmt", &platform.id)
        .await
        .unwrap();
    assert_eq!(again.link_path, second.link_path);
    assert!(!again.created);
}

#[tokio::test]
async fn both_names_occupied_is_a_conflict() {
    let ctx = LinkTestContext::new().await;
    ctx.add_repo("acme", "toolkit", &["fmt"]).await;
    let platform = ctx.add_platform("P").await;
    std::fs::create_dir_all(ctx.skills_dir("P").join("fmt")).unwrap();
    std::fs::create_dir_all(ctx.skills_dir("P").join("acme-fmt")).unwrap();

    let err = ctx
        .engine
        .link("acme_toolkit/fmt", &platform.id)
        .await
        .unwrap_err();
    assert!(err.is_conflict(), "{err}");
    assert!(ctx.platform(&platform.id).await.linked_skills.is_empty());
}

#[tokio::test]
async fn link_with_unknown_ids_is_not_found() {
    let ctx = LinkTestContext::new().await;
    ctx.add_repo("acme", "toolkit", &["fmt"]).await;
    let platform = ctx.add_platform("P").await;

    assert!(ctx
        .engine
        .link("acme_toolkit/nope", &platform.id)
        .await
        .unwrap_err()
        .is_not_found());
    assert!(ctx
        .engine
        .link("acme_toolkit/fmt", "ghost")
        .await
        .unwrap_err()
        .is_not_found());
}

// =============================================================================
// 2. Unlinking
// =============================================================================

#[tokio::test]
async fn unlink_removes_scoped_link_and_association() {
    let ctx = LinkTestContext::new().await;
    ctx.add_repo("acme", "toolkit", &["fmt"]).await;
    let platform = ctx.add_platform("P").await;
    std::fs::create_dir_all(ctx.skills_dir("P").join("fmt")).unwrap();

    let linked = ctx
        .engine
        .link("acme_toolkit/fmt", &platform.id)
        .await
        .unwrap();
    assert!(linked.scoped);

    let outcome = ctx
        .engine
        .unlink("acme_toolkit/fmt", &platform.id)
        .await
        .unwrap();
    assert!(outcome.removed);
    assert!(std::fs::symlink_metadata(&linked.link_path).is_err());
    assert!(ctx.skills_dir("P").join("fmt").is_dir());
    assert!(ctx.platform(&platform.id).await.linked_skills.is_empty());
}

#[tokio::test]
async fn unlink_after_repository_removal_only_cleans_config() {
    let ctx = LinkTestContext::new().await;
    let repo = ctx.add_repo("acme", "toolkit", &["fmt"]).await;
    let platform = ctx.add_platform("P").await;
    let linked = ctx
        .engine
        .link("acme_toolkit/fmt", &platform.id)
        .await
        .unwrap();

    ctx.store
        .edit_user_config(|cfg| {
            cfg.repositories.retain(|r| r.id != repo);
            Ok(())
        })
        .await
        .unwrap();

    let outcome = ctx
        .engine
        .unlink("acme_toolkit/fmt", &platform.id)
        .await
        .unwrap();
    assert!(outcome.config_only);
    assert!(!outcome.removed);
    assert!(std::fs::symlink_metadata(&linked.link_path).is_ok());
    assert!(ctx.platform(&platform.id).await.linked_skills.is_empty());
}

// =============================================================================
// 3. Rule blocks
// =============================================================================

#[tokio::test]
async fn deploy_then_undeploy_restores_rules_file() {
    let ctx = LinkTestContext::new().await;
    let platform = ctx.add_platform("P").await;
    let rule = ctx
        .rules()
        .create("Code Style", None, Some("Prefer small functions.\n"))
        .await
        .unwrap();
    let rules_file = ctx.rules_file("P");
    std::fs::create_dir_all(rules_file.parent().unwrap()).unwrap();
    let original = "# Project notes\n\nKeep it simple.\n";
    std::fs::write(&rules_file, original).unwrap();

    assert_eq!(
        ctx.engine.check_file_status(&platform.id, &rule.id).await.unwrap(),
        FileStatus::Conflict
    );
    let outcome = ctx.engine.deploy(&rule.id, &platform.id, None).await.unwrap();
    assert_eq!(outcome.rules_file, rules_file);
    let deployed = std::fs::read_to_string(&rules_file).unwrap();
    assert!(deployed.starts_with(original));
    assert!(deployed.contains("Prefer small functions."));
    assert_eq!(
        ctx.engine.check_file_status(&platform.id, &rule.id).await.unwrap(),
        FileStatus::Linked
    );
    assert_eq!(
        ctx.platform(&platform.id).await.linked_rules,
        vec![rule.id.clone()]
    );
    let stored = ctx.store.user_config().await;
    assert_eq!(
        stored.rule(&rule.id).unwrap().linked_platforms,
        vec![platform.id.clone()]
    );

    ctx.engine.deploy(&rule.id, &platform.id, None).await.unwrap();
    assert_eq!(std::fs::read_to_string(&rules_file).unwrap(), deployed);

    let undeployed = ctx.engine.undeploy(&rule.id, &platform.id).await.unwrap();
    assert!(undeployed.removed);
    assert_eq!(std::fs::read_to_string(&rules_file).unwrap(), original);
    assert!(ctx.platform(&platform.id).await.linked_rules.is_empty());
    let stored = ctx.store.user_config().await;
    assert!(stored.rule(&rule.id).unwrap().linked_platforms.is_empty());
}

#[tokio::test]
async fn undeploy_restores_file_without_final_newline() {
    let ctx = LinkTestContext::new().await;
    let platform = ctx.add_platform("P").await;
    let rule = ctx
        .rules()
        .create("Tone", None, Some("Be brief."))
        .await
        .unwrap();
    let rules_file = ctx.rules_file("P");
    std::fs::create_dir_all(rules_file.parent().unwrap()).unwrap();

    for original in ["# Notes\n\n- no trailing newline", "\n\n", "   "] {
        std::fs::write(&rules_file, original).unwrap();
        ctx.engine.deploy(&rule.id, &platform.id, None).await.unwrap();
        ctx.engine.undeploy(&rule.id, &platform.id).await.unwrap();
        assert_eq!(
            std::fs::read_to_string(&rules_file).unwrap(),
            original,
            "{original:?}"
        );
    }
}

#[tokio::test]
async fn status_reports_clean_and_missing() {
    let ctx = LinkTestContext::new().await;
    let platform = ctx.add_platform("P").await;
    let rule = ctx.rules().create("Style", None, None).await.unwrap();

    assert_eq!(
        ctx.engine.check_file_status(&platform.id, &rule.id).await.unwrap(),
        FileStatus::Clean
    );
    assert_eq!(
        ctx.engine.check_file_status("ghost", &rule.id).await.unwrap(),
        FileStatus::Missing
    );
}

#[tokio::test]
async fn two_rules_share_one_rules_file() {
    let ctx = LinkTestContext::new().await;
    let platform = ctx.add_platform("P").await;
    let rules = ctx.rules();
    let a = rules.create("Alpha", None, Some("alpha text")).await.unwrap();
    let b = rules.create("Beta", None, Some("beta text")).await.unwrap();

    ctx.engine.deploy(&a.id, &platform.id, None).await.unwrap();
    ctx.engine.deploy(&b.id, &platform.id, None).await.unwrap();
    ctx.engine.undeploy(&a.id, &platform.id).await.unwrap();

    let text = std::fs::read_to_string(ctx.rules_file("P")).unwrap();
    assert!(!text.contains("alpha text"));
    assert!(text.contains("beta text"));
    assert!(!text.starts_with('\n'));
    assert_eq!(
        ctx.platform(&platform.id).await.linked_rules,
        vec![b.id.clone()]
    );
}

#[tokio::test]
async fn redeploy_refreshes_block_content() {
    let ctx = LinkTestContext::new().await;
    let platform = ctx.add_platform("P").await;
    let rules = ctx.rules();
    let rule = rules.create("Style", None, Some("old wording")).await.unwrap();
    ctx.engine.deploy(&rule.id, &platform.id, None).await.unwrap();

    rules.set_content(&rule.id, "new wording").await.unwrap();
    let written = ctx.engine.redeploy(&platform.id).await.unwrap();
    assert_eq!(written, vec![rule.id.clone()]);

    let text = std::fs::read_to_string(ctx.rules_file("P")).unwrap();
    assert!(text.contains("new wording"));
    assert!(!text.contains("old wording"));
}

#[tokio::test]
async fn symlinked_rules_file_needs_a_mode() {
    let ctx = LinkTestContext::new().await;
    let platform = ctx.add_platform("P").await;
    let rule = ctx.rules().create("Style", None, Some("be nice")).await.unwrap();

    let elsewhere = ctx.fixture.tempdir.path().join("shared-rules.md");
    std::fs::write(&elsewhere, "shared\n").unwrap();
    let rules_file = ctx.rules_file("P");
    std::fs::create_dir_all(rules_file.parent().unwrap()).unwrap();
    std::os::unix::fs::symlink(&elsewhere, &rules_file).unwrap();

    let err = ctx
        .engine
        .deploy(&rule.id, &platform.id, None)
        .await
        .unwrap_err();
    assert!(err.is_conflict());
    assert!(ctx.platform(&platform.id).await.linked_rules.is_empty());

    let outcome = ctx
        .engine
        .deploy(&rule.id, &platform.id, Some(DeployMode::Backup))
        .await
        .unwrap();
    let backup = outcome.backup.expect("backup path");
    assert!(std::fs::symlink_metadata(&backup)
        .unwrap()
        .file_type()
        .is_symlink());
    assert!(!std::fs::symlink_metadata(&rules_file)
        .unwrap()
        .file_type()
        .is_symlink());
    assert!(std::fs::read_to_string(&rules_file)
        .unwrap()
        .contains("be nice"));
    assert_eq!(std::fs::read_to_string(&elsewhere).unwrap(), "shared\n");
}

#[tokio::test]
async fn overwrite_mode_replaces_directory_occupant() {
    let ctx = LinkTestContext::new().await;
    let platform = ctx.add_platform("P").await;
    let rule = ctx.rules().create("Style", None, Some("be nice")).await.unwrap();
    std::fs::create_dir_all(ctx.rules_file("P")).unwrap();

    assert_eq!(
        ctx.engine.check_file_status(&platform.id, &rule.id).await.unwrap(),
        FileStatus::Conflict
    );
    let outcome = ctx
        .engine
        .deploy(&rule.id, &platform.id, Some(DeployMode::Overwrite))
        .await
        .unwrap();
    assert!(outcome.backup.is_none());
    assert!(ctx.rules_file("P").is_file());
}

#[tokio::test]
async fn deploy_of_unknown_rule_is_not_found() {
    let ctx = LinkTestContext::new().await;
    let platform = ctx.add_platform("P").await;
    assert!(ctx
        .engine
        .deploy("ghost", &platform.id, None)
        .await
        .unwrap_err()
        .is_not_found());
    assert!(!ctx.rules_file("P").exists());
}
