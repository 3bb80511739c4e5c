use skills_manager_discovery::SkillIndex;
use skills_manager_state::{ConfigStore, PlatformRegistry, RuleCatalog};

/// Realizes platform associations on disk.
///
/// Skills become directory links inside the platform's `skillsDir`; rules
/// become marker-delimited blocks inside its `rulesFile`. Association records
/// (`linkedSkills`, `linkedRules`, `Rule::linked_platforms`) are updated only
/// after the filesystem step succeeds.
#[derive(Debug, Clone)]
pub struct LinkEngine {
    pub(crate) store: ConfigStore,
    pub(crate) platforms: PlatformRegistry,
    pub(crate) rules: RuleCatalog,
    pub(crate) skills: SkillIndex,
}

impl LinkEngine {
    pub fn new(store: ConfigStore) -> Self {
        Self {
            platforms: PlatformRegistry::new(store.clone()),
            rules: RuleCatalog::new(store.clone()),
            skills: SkillIndex::new(store.clone()),
            store,
        }
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }
}
