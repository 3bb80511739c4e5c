use std::time::Duration;

use skills_manager_discovery::SkillIndex;
use skills_manager_state::{
    now_rfc3339, ConfigStore, NewPlatform, PlatformRegistry, SkillRepository, StoreOptions,
    SystemConfigPatch,
};
use skills_manager_test_utils::{create_skill, TestFixture};

async fn store_for(fixture: &TestFixture) -> ConfigStore {
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
    store
}

async fn register_repo(store: &ConfigStore, fixture: &TestFixture, id: &str) {
    let repo = SkillRepository {
        id: id.to_string(),
        name: id.replace('_', "/"),
        url: format!("https://github.com/{}", id.replace('_', "/")),
        local_path: fixture.repo_path(id),
        last_updated: now_rfc3339(),
        update_status: None,
        behind_count: None,
        check_error: None,
    };
    store
        .edit_user_config(move |cfg| {
            cfg.repositories.push(repo);
            Ok(())
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn lists_skills_across_repositories() {
    let fixture = TestFixture::new().unwrap();
    let store = store_for(&fixture).await;
    create_skill(&fixture.repo_path("acme_toolkit"), "tools/fmt", "Formatter").unwrap();
    create_skill(&fixture.repo_path("beta_pack"), "fmt", "Another formatter").unwrap();
    register_repo(&store, &fixture, "acme_toolkit").await;
    register_repo(&store, &fixture, "beta_pack").await;

    let index = SkillIndex::new(store);
    let ids: Vec<_> = index
        .list_all()
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(ids, vec!["acme_toolkit/tools/fmt", "beta_pack/fmt"]);

    let beta = index.list_for_repo("beta_pack").await.unwrap();
    assert_eq!(beta.len(), 1);
    assert!(index
        .list_for_repo("ghost")
        .await
        .unwrap_err()
        .is_not_found());
}

#[tokio::test]
async fn find_reports_linking_platforms() {
    let fixture = TestFixture::new().unwrap();
    let store = store_for(&fixture).await;
    create_skill(&fixture.repo_path("acme_toolkit"), "tools/fmt", "Formatter").unwrap();
    register_repo(&store, &fixture, "acme_toolkit").await;

    PlatformRegistry::new(store.clone())
        .create(NewPlatform {
            name: "Claude".into(),
            skills_dir: fixture.platform_skills_dir("claude").display().to_string(),
            rules_file: fixture.platform_rules_file("claude").display().to_string(),
            linked_skills: Some(vec!["acme_toolkit/tools/fmt".into()]),
            ..Default::default()
        })
        .await
        .unwrap();

    let index = SkillIndex::new(store);
    let skill = index.require("acme_toolkit/tools/fmt").await.unwrap();
    assert_eq!(skill.linked_platforms, vec!["claude".to_string()]);
    assert_eq!(skill.description, "Formatter");

    assert!(index.find("acme_toolkit/tools/missing").await.unwrap().is_none());
    assert!(index.find("unknown_repo/fmt").await.unwrap().is_none());
    assert!(index.require("malformed").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn skills_vanish_with_their_manifest() {
    let fixture = TestFixture::new().unwrap();
    let store = store_for(&fixture).await;
    let dir = create_skill(&fixture.repo_path("acme_toolkit"), "gone", "Temporary").unwrap();
    register_repo(&store, &fixture, "acme_toolkit").await;

    let index = SkillIndex::new(store);
    assert_eq!(index.list_all().await.unwrap().len(), 1);
    std::fs::remove_file(dir.join("SKILL.MD")).unwrap();
    assert!(index.list_all().await.unwrap().is_empty());
}
