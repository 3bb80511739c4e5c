use std::path::Path;
use std::sync::LazyLock;

use pathdiff::diff_paths;
use regex::Regex;
use walkdir::WalkDir;

use crate::types::Skill;

/// A directory is a skill iff it directly contains this file.
pub const MANIFEST_FILE: &str = "SKILL.MD";

/// Directories nested deeper than this many levels below the first are not visited.
pub const MAX_SCAN_DEPTH: usize = 3;

static DESCRIPTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^description:\s*(.+)$").expect("description pattern is valid")
});

/// Returns true if the name starts with a dot (hidden file/directory).
pub fn is_hidden_component(name: &str) -> bool {
    name.starts_with('.')
}

/// Extracts the trimmed value of the first `description:` line, or "".
pub fn extract_description(manifest: &str) -> String {
    DESCRIPTION
        .captures(manifest)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

fn relative_id(path: &Path, root: &Path) -> String {
    let rel = diff_paths(path, root).unwrap_or_else(|| path.to_path_buf());
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Walks `repo_path` and returns every skill bundle below it, sorted by id.
///
/// Hidden directories are pruned, a skill directory is not descended into,
/// and unreadable entries are logged and skipped. A missing `repo_path`
/// yields no skills.
pub fn scan_skills(repo_path: &Path, repo_id: &str) -> Vec<Skill> {
    if !repo_path.is_dir() {
        return Vec::new();
    }
    let mut skills = Vec::new();
    let mut walker = WalkDir::new(repo_path)
        .min_depth(1)
        .max_depth(MAX_SCAN_DEPTH + 1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || (e.file_type().is_dir()
                    && !is_hidden_component(&e.file_name().to_string_lossy()))
        });

    while let Some(next) = walker.next() {
        let entry = match next {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(
                    target: "skills_manager::discovery",
                    repo = %repo_id,
                    error = %err,
                    "Skipping unreadable entry"
                );
                continue;
            }
        };
        let manifest = entry.path().join(MANIFEST_FILE);
        if !manifest.is_file() {
            continue;
        }
        walker.skip_current_dir();

        let content = match std::fs::read_to_string(&manifest) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!(
                    target: "skills_manager::discovery",
                    path = %manifest.display(),
                    error = %err,
                    "Skipping skill with unreadable manifest"
                );
                continue;
            }
        };
        let rel = relative_id(entry.path(), repo_path);
        skills.push(Skill {
            id: format!("{repo_id}/{rel}"),
            repo_id: repo_id.to_string(),
            name: entry.file_name().to_string_lossy().into_owned(),
            local_path: entry.path().to_path_buf(),
            description: extract_description(&content),
            linked_platforms: Vec::new(),
        });
    }
    skills.sort_by(|a, b| a.id.cmp(&b.id));
    skills
}

#[cfg(test)]
mod tests {
    use super::*;
    use skills_manager_test_utils::{create_skill, create_skill_with_manifest};
    use tempfile::tempdir;

    #[test]
    fn description_is_trimmed() {
        assert_eq!(extract_description("description:   formats code  \n"), "formats code");
        assert_eq!(
            extract_description("name: x\ndescription: A cool skill\r\nbody"),
            "A cool skill"
        );
    }

    #[test]
    fn missing_description_is_empty() {
        assert_eq!(extract_description("# Just a heading\n"), "");
        assert_eq!(extract_description("  description: indented"), "");
    }

    #[test]
    fn finds_top_level_skill_and_ignores_plain_dirs() {
        let tmp = tempdir().unwrap();
        create_skill(tmp.path(), "my-skill", "A cool skill").unwrap();
        std::fs::create_dir_all(tmp.path().join("not-a-skill")).unwrap();

        let skills = scan_skills(tmp.path(), "test-repo");
        assert_eq!(skills.len(), 1);
        assert_eq!(skills[0].id, "test-repo/my-skill");
        assert_eq!(skills[0].name, "my-skill");
        assert_eq!(skills[0].description, "A cool skill");
        assert_eq!(skills[0].local_path, tmp.path().join("my-skill"));
    }

    #[test]
    fn nested_skills_use_posix_relative_ids() {
        let tmp = tempdir().unwrap();
        create_skill(tmp.path(), "category/nested-skill", "Nested").unwrap();
        let skills = scan_skills(tmp.path(), "nested-repo");
        assert_eq!(skills.len(), 1);
        assert_eq!(skills[0].id, "nested-repo/category/nested-skill");
        assert_eq!(skills[0].name, "nested-skill");
    }

    #[test]
    fn skill_directories_are_not_descended_into() {
        let tmp = tempdir().unwrap();
        create_skill(tmp.path(), "outer", "outer").unwrap();
        create_skill(tmp.path(), "outer/inner", "inner").unwrap();
        let ids: Vec<_> = scan_skills(tmp.path(), "r").into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["r/outer"]);
    }

    #[test]
    fn hidden_directories_are_pruned() {
        let tmp = tempdir().unwrap();
        create_skill(tmp.path(), ".git/hooks-skill", "hidden").unwrap();
        create_skill(tmp.path(), ".hidden", "hidden").unwrap();
        create_skill(tmp.path(), "visible", "shown").unwrap();
        let ids: Vec<_> = scan_skills(tmp.path(), "r").into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["r/visible"]);
    }

    #[test]
    fn depth_is_bounded() {
        let tmp = tempdir().unwrap();
        create_skill(tmp.path(), "a/b/c/at-limit", "ok").unwrap();
        create_skill(tmp.path(), "a/b/c/d/too-deep", "no").unwrap();
        let ids: Vec<_> = scan_skills(tmp.path(), "r").into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["r/a/b/c/at-limit"]);
    }

    #[test]
    fn manifest_name_is_exact() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path().join("lower");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("README.md"), "description: nope").unwrap();
        create_skill_with_manifest(tmp.path(), "upper", "no description here").unwrap();
        let skills = scan_skills(tmp.path(), "r");
        assert_eq!(skills.len(), 1);
        assert_eq!(skills[0].description, "");
    }

    #[test]
    fn missing_repo_yields_nothing() {
        let tmp = tempdir().unwrap();
        assert!(scan_skills(&tmp.path().join("gone"), "r").is_empty());
    }
}
