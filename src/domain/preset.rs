//! Prompt and filter presets.
//!
//! Presets live in three places, consulted in a fixed order: the built-ins
//! compiled into the binary, the repository's `.pr-builder/` directory and the
//! user's global `~/.pr-builder/` directory. The first id match wins, so a
//! file on disk can never shadow a built-in.

use crate::domain::filter::{Filter, FilterKind, FilterRule};
use crate::prompts;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresetLocation {
    Builtin,
    Project,
    Global,
}

impl fmt::Display for PresetLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            PresetLocation::Builtin => "builtin",
            PresetLocation::Project => "project",
            PresetLocation::Global => "global",
        };
        write!(f, "{value}")
    }
}

impl FromStr for PresetLocation {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input {
            "builtin" => Ok(PresetLocation::Builtin),
            "project" => Ok(PresetLocation::Project),
            "global" => Ok(PresetLocation::Global),
            other => Err(format!("invalid preset location: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptPreset {
    pub id: String,
    pub name: String,
    pub description: String,
    pub template: String,
    pub location: PresetLocation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterPreset {
    pub id: String,
    pub name: String,
    pub description: String,
    pub rules: Vec<FilterRule>,
    pub location: PresetLocation,
}

impl FilterPreset {
    pub fn to_filter(&self) -> Filter {
        Filter {
            name: self.name.clone(),
            description: self.description.clone(),
            rules: self.rules.clone(),
        }
    }
}

/// File-name stem for a preset: lower-cased, spaces replaced by underscores.
pub fn slugify(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

/// The id a preset saved under `name` will have once written to disk.
pub fn preset_file_name(name: &str) -> String {
    format!("{}.yaml", slugify(name))
}

pub fn builtin_prompt_presets() -> Vec<PromptPreset> {
    let builtin = |id: &str, name: &str, description: &str, template: &str| PromptPreset {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        template: template.to_string(),
        location: PresetLocation::Builtin,
    };

    vec![
        builtin(
            "default",
            "Default",
            "Standard PR description format",
            prompts::DEFAULT_PROMPT,
        ),
        builtin(
            "detailed",
            "Detailed",
            "Comprehensive PR description with executive summary",
            "Create a comprehensive PR description including: executive summary, detailed changes by component, rationale, testing strategy, deployment notes, and rollback plan.",
        ),
        builtin(
            "concise",
            "Concise",
            "Brief and to-the-point PR description",
            "Write a brief PR description: what changed, why, and how to test.",
        ),
        builtin(
            "conventional",
            "Conventional Commits",
            "Follows conventional commits format",
            "Generate a PR description following the conventional commits format with type, scope, breaking changes, and footer.",
        ),
    ]
}

pub fn builtin_filter_presets() -> Vec<FilterPreset> {
    let builtin = |id: &str, name: &str, description: &str, excludes: &[&str]| FilterPreset {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        rules: excludes
            .iter()
            .enumerate()
            .map(|(order, pattern)| FilterRule {
                kind: FilterKind::Exclude,
                pattern: pattern.to_string(),
                order,
            })
            .collect(),
        location: PresetLocation::Builtin,
    };

    vec![
        builtin(
            "exclude_tests",
            "Exclude Tests",
            "Hide test and spec files",
            &["**/*test*", "**/*spec*"],
        ),
        builtin(
            "exclude_docs",
            "Exclude Docs",
            "Hide documentation",
            &["**/*.md", "**/*.rst", "docs/**"],
        ),
        builtin(
            "exclude_lockfiles",
            "Exclude Lockfiles",
            "Hide dependency lockfiles",
            &[
                "**/Cargo.lock",
                "**/go.sum",
                "**/package-lock.json",
                "**/yarn.lock",
                "**/pnpm-lock.yaml",
            ],
        ),
        builtin(
            "exclude_generated",
            "Exclude Generated",
            "Hide generated and vendored code",
            &["**/*.pb.go", "**/*_generated.*", "**/vendor/**", "**/dist/**"],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_lowercases_and_underscores() {
        assert_eq!(slugify("Exclude Tests"), "exclude_tests");
        assert_eq!(preset_file_name("Only Go Files"), "only_go_files.yaml");
    }

    #[test]
    fn builtin_ids_are_unique() {
        let prompts = builtin_prompt_presets();
        let filters = builtin_filter_presets();
        let mut ids: Vec<_> = prompts.iter().map(|p| p.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), prompts.len());
        assert!(filters.iter().all(|f| !f.rules.is_empty()));
        assert!(prompts.iter().all(|p| p.location == PresetLocation::Builtin));
    }

    #[test]
    fn default_builtin_uses_default_prompt() {
        let default = builtin_prompt_presets()
            .into_iter()
            .find(|p| p.id == "default")
            .unwrap();
        assert_eq!(default.template, prompts::DEFAULT_PROMPT);
    }
}
