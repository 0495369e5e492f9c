//! Integration tests for the curate-save-reload workflow
//! These drive the public controller API against an in-memory repository.

use anyhow::Result;
use pr_builder::application::Controller;
use pr_builder::application::presets::PresetStore;
use pr_builder::domain::{
    ContentMode, DomainError, FileChange, FileVersion, Filter, FilterRule, PresetLocation,
    ReconciliationError, ValidationError,
};
use pr_builder::infra::repository::RepositoryReader;
use std::path::Path;
use tempfile::tempdir;

struct MemoryRepo {
    branch: &'static str,
    files: Vec<FileChange>,
}

impl RepositoryReader for MemoryRepo {
    fn current_branch(&self) -> Result<String> {
        Ok(self.branch.to_string())
    }

    fn default_branch(&self) -> Result<String> {
        Ok("main".to_string())
    }

    fn changed_files(&self, _source: &str, _target: &str) -> Result<Vec<FileChange>> {
        Ok(self.files.clone())
    }

    fn file_content_at(&self, reference: &str, path: &str) -> Result<String> {
        Ok(format!("{path}@{reference}"))
    }
}

fn change(path: &str) -> FileChange {
    FileChange::new(
        path,
        format!("@@ -1 +1 @@\n-old {path}\n+new {path}\n"),
        format!("old {path}\n"),
        format!("new {path}\n").repeat(10),
    )
    .with_stats(1, 1)
}

fn open(root: &Path, branch: &'static str, paths: &[&str]) -> Controller {
    let repo = MemoryRepo {
        branch,
        files: paths.iter().map(|p| change(p)).collect(),
    };
    let presets = PresetStore::new(root.join(".pr-builder"), Some(root.join("home")));
    let mut controller = Controller::new(root, Box::new(repo)).with_presets(presets);
    controller.initialize(None).unwrap();
    controller
}

#[test]
fn test_curated_session_round_trips() {
    let dir = tempdir().unwrap();
    let session = dir.path().join(".pr-builder/session.yaml");
    let paths = ["src/lib.rs", "src/lib_test.rs", "README.md"];

    let mut first = open(dir.path(), "feature", &paths);
    first.toggle_file_inclusion("README.md").unwrap();
    first.set_full_file("src/lib.rs", FileVersion::Both).unwrap();
    first.apply_filter_preset("exclude_tests").unwrap();
    first.add_context_note("Refactor only, no behavior change").unwrap();
    first.set_title("Split the parser");
    first.load_prompt_preset("detailed").unwrap();
    first.save_session(&session).unwrap();

    let mut second = open(dir.path(), "feature", &paths);
    let report = second.load_session(&session).unwrap();
    assert!(report.pruned.is_empty());
    assert!(report.missing_preset.is_none());

    let data = second.data();
    assert!(!data.file("README.md").unwrap().included);
    let lib = data.file("src/lib.rs").unwrap();
    assert_eq!(lib.mode, ContentMode::FullBoth);
    assert_eq!(lib.tokens, lib.tokens_for(ContentMode::FullBoth));
    assert_eq!(data.active_filters.len(), 1);
    assert_eq!(data.additional_context.len(), 1);
    assert_eq!(data.title, "Split the parser");
    assert_eq!(
        data.current_preset.as_ref().map(|p| p.id.as_str()),
        Some("detailed")
    );

    let visible: Vec<_> = data.visible_files().iter().map(|f| f.path.clone()).collect();
    assert_eq!(visible, vec!["src/lib.rs", "README.md"]);
}

#[test]
fn test_session_entries_for_vanished_files_are_pruned() {
    let dir = tempdir().unwrap();
    let session = dir.path().join("session.yaml");

    let mut first = open(dir.path(), "feature", &["a.rs", "b.rs"]);
    first.toggle_file_inclusion("b.rs").unwrap();
    first.save_session(&session).unwrap();

    // b.rs was reverted, c.rs is new.
    let mut second = open(dir.path(), "feature", &["a.rs", "c.rs"]);
    let report = second.load_session(&session).unwrap();
    assert_eq!(report.pruned, vec!["b.rs".to_string()]);

    let data = second.data();
    assert!(data.file("b.rs").is_err());
    assert!(data.file("c.rs").unwrap().included);
    assert_eq!(data.file("c.rs").unwrap().mode, ContentMode::Diff);
}

#[test]
fn test_session_from_another_branch_is_rejected() {
    let dir = tempdir().unwrap();
    let session = dir.path().join("session.yaml");

    let mut feature = open(dir.path(), "feature", &["a.rs"]);
    feature.toggle_file_inclusion("a.rs").unwrap();
    feature.save_session(&session).unwrap();

    let mut hotfix = open(dir.path(), "hotfix", &["a.rs"]);
    let err = hotfix.load_session(&session).unwrap_err();
    assert_eq!(
        err.to_string(),
        ReconciliationError {
            stored: "feature".to_string(),
            live: "hotfix".to_string(),
        }
        .to_string()
    );
    assert!(matches!(err, DomainError::Reconciliation(_)));
    assert!(err.is_user_error());
    // Nothing from the rejected session leaked in.
    assert!(hotfix.data().file("a.rs").unwrap().included);
}

#[test]
fn test_active_filters_compose_with_and() {
    let dir = tempdir().unwrap();
    let mut controller = open(
        dir.path(),
        "feature",
        &["src/api.go", "src/api_test.go", "docs/guide.md", "go.sum"],
    );

    controller
        .add_filter(Filter::from_patterns(
            "Only src",
            "",
            &[],
            &["src/**".to_string()],
        ))
        .unwrap();
    controller
        .add_filter(Filter::from_patterns(
            "No tests",
            "",
            &["**/*_test.go".to_string()],
            &[],
        ))
        .unwrap();

    let visible: Vec<_> = controller
        .data()
        .visible_files()
        .iter()
        .map(|f| f.path.clone())
        .collect();
    assert_eq!(visible, vec!["src/api.go"]);

    let filtered = controller.data().filtered_files().len();
    assert_eq!(filtered, 3);

    // Hidden files keep their inclusion flag and come back when filters go.
    controller.clear_filters();
    assert_eq!(controller.data().visible_files().len(), 4);
    assert!(controller.data().changed_files.iter().all(|f| f.included));
}

#[test]
fn test_filter_preview_changes_nothing() {
    let dir = tempdir().unwrap();
    let controller = open(dir.path(), "feature", &["a.rs", "a_test.rs"]);
    let before = controller.data().clone();

    let result = controller
        .test_filter(&Filter::from_patterns(
            "No tests",
            "",
            &["**/*_test.rs".to_string()],
            &[],
        ))
        .unwrap();
    assert_eq!(result.matched, vec!["a.rs".to_string()]);
    assert_eq!(result.unmatched, vec!["a_test.rs".to_string()]);
    assert_eq!(controller.data(), &before);
}

#[test]
fn test_generation_requires_a_visible_included_file() {
    let dir = tempdir().unwrap();
    let mut controller = open(dir.path(), "feature", &["a.rs", "b.rs"]);
    controller.set_all_visible_included(false);

    let err = controller.build_generation_request().unwrap_err();
    assert!(matches!(
        err,
        DomainError::Validation(ValidationError::NoFilesIncluded)
    ));

    controller.set_file_included("b.rs", true).unwrap();
    let request = controller.build_generation_request().unwrap();
    assert_eq!(request.files.len(), 1);
    assert_eq!(request.files[0].path, "b.rs");
}

#[test]
fn test_project_presets_shadow_global_ones() {
    let dir = tempdir().unwrap();
    let mut controller = open(dir.path(), "feature", &["a.rs", "b.md"]);

    let rules = [FilterRule::exclude("**/*.md", 0)];
    let global = controller
        .save_filter_preset("Team docs", "global copy", &rules, PresetLocation::Global)
        .unwrap();
    let project = controller
        .save_filter_preset("Team docs", "project copy", &rules, PresetLocation::Project)
        .unwrap();
    assert_eq!(global.id, project.id);

    let listed = controller.list_filter_presets().unwrap();
    let locations: Vec<_> = listed
        .iter()
        .filter(|p| p.id == project.id)
        .map(|p| p.location)
        .collect();
    assert_eq!(locations, vec![PresetLocation::Project, PresetLocation::Global]);

    let applied = controller.apply_filter_preset(&project.id).unwrap();
    assert_eq!(applied.description, "project copy");
    assert_eq!(controller.data().visible_files().len(), 1);
}

#[test]
fn test_saving_to_builtin_scope_is_rejected() {
    let dir = tempdir().unwrap();
    let controller = open(dir.path(), "feature", &["a.rs"]);
    let err = controller
        .save_prompt_preset("Mine", "", PresetLocation::Builtin)
        .unwrap_err();
    assert!(matches!(
        err,
        DomainError::Validation(ValidationError::ReadOnlyPresetLocation(_))
    ));
}
