//! Session persistence.
//!
//! A [`Session`] is the part of [`PrData`] a user wants remembered between
//! runs. It is never turned back into a `PrData` on its own: [`Session::apply_to`]
//! overlays it onto state freshly built from the repository, pruning entries
//! for files that are no longer part of the diff.

use crate::domain::{
    ContentMode, ContextItem, ContextKind, DomainError, Filter, FilterKind, FilterRule,
    GitContextItem, GitHistoryConfig, PrData, PromptPreset, ReconciliationError, StorageError,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const SESSION_VERSION: &str = "1.0";
pub const DATA_DIR: &str = ".pr-builder";
const SESSION_FILE: &str = "session.yaml";

/// `<repo>/.pr-builder/session.yaml`
pub fn default_session_path(repo_path: &Path) -> PathBuf {
    repo_path.join(DATA_DIR).join(SESSION_FILE)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub version: String,
    pub source_branch: String,
    #[serde(default)]
    pub target_branch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_history: Option<GitHistoryConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub git_context: Vec<GitContextItem>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub files: Vec<FileEntry>,
    #[serde(default)]
    pub filters: Vec<FilterEntry>,
    #[serde(default)]
    pub context: Vec<ContextEntry>,
    #[serde(default)]
    pub prompt: PromptEntry,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub path: String,
    pub included: bool,
    #[serde(default = "default_mode")]
    pub mode: String,
}

fn default_mode() -> String {
    ContentMode::Diff.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterEntry {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub rules: Vec<RuleEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleEntry {
    #[serde(rename = "type")]
    pub kind: FilterKind,
    pub pattern: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextEntry {
    #[serde(rename = "type")]
    pub kind: ContextKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

/// What happened while overlaying a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Stored file entries with no counterpart in the live diff.
    pub pruned: Vec<String>,
    /// Stored prompt preset that could not be resolved.
    pub missing_preset: Option<String>,
}

impl From<&FilterRule> for RuleEntry {
    fn from(rule: &FilterRule) -> Self {
        Self {
            kind: rule.kind,
            pattern: rule.pattern.clone(),
        }
    }
}

impl From<&Filter> for FilterEntry {
    fn from(filter: &Filter) -> Self {
        Self {
            name: filter.name.clone(),
            description: filter.description.clone(),
            rules: filter.rules.iter().map(RuleEntry::from).collect(),
        }
    }
}

impl FilterEntry {
    pub fn to_filter(&self) -> Filter {
        let mut filter = Filter::new(&self.name, &self.description);
        for rule in &self.rules {
            filter.push_rule(rule.kind, &rule.pattern);
        }
        filter
    }
}

impl From<&ContextItem> for ContextEntry {
    fn from(item: &ContextItem) -> Self {
        Self {
            kind: item.kind,
            path: item.path.clone(),
            content: item.content.clone(),
        }
    }
}

impl ContextEntry {
    /// Token estimates are recomputed from the content, never read back.
    pub fn to_item(&self) -> ContextItem {
        ContextItem::new(self.kind, self.path.clone(), &self.content)
    }
}

impl Session {
    /// Captures the full current state.
    pub fn from_data(data: &PrData) -> Self {
        let prompt = match &data.current_preset {
            Some(preset) => PromptEntry {
                preset: Some(preset.id.clone()),
                template: None,
            },
            None => PromptEntry {
                preset: None,
                template: Some(data.current_prompt.clone()),
            },
        };

        Self {
            version: SESSION_VERSION.to_string(),
            source_branch: data.source_branch.clone(),
            target_branch: data.target_branch.clone(),
            git_history: Some(data.effective_git_history()),
            git_context: data.git_context.clone(),
            title: data.title.clone(),
            description: data.description.clone(),
            files: data
                .changed_files
                .iter()
                .map(|file| FileEntry {
                    path: file.path.clone(),
                    included: file.included,
                    mode: file.mode.to_string(),
                })
                .collect(),
            filters: data.active_filters.iter().map(FilterEntry::from).collect(),
            context: data
                .additional_context
                .iter()
                .map(ContextEntry::from)
                .collect(),
            prompt,
        }
    }

    /// Overlays this session onto freshly fetched state.
    ///
    /// Fails without touching `data` when the session was recorded on another
    /// branch. Per-file settings are matched by path; filters, context, git
    /// selections, title, description and prompt are replaced outright.
    /// `resolve_prompt` looks up a stored preset id and returns `Ok(None)`
    /// when no scope has it. Any error it returns aborts the load before
    /// `data` is touched.
    pub fn apply_to(
        &self,
        data: &mut PrData,
        resolve_prompt: impl Fn(&str) -> Result<Option<PromptPreset>, DomainError>,
    ) -> Result<ApplyReport, DomainError> {
        if self.source_branch != data.source_branch {
            return Err(ReconciliationError {
                stored: self.source_branch.clone(),
                live: data.source_branch.clone(),
            }
            .into());
        }

        let mut report = ApplyReport::default();
        let template = self
            .prompt
            .template
            .as_ref()
            .filter(|template| !template.is_empty());
        let prompt = match &self.prompt.preset {
            Some(id) => match resolve_prompt(id)? {
                Some(preset) => Some((preset.template.clone(), Some(preset))),
                None => {
                    report.missing_preset = Some(id.clone());
                    template.map(|template| (template.clone(), None))
                }
            },
            None => template.map(|template| (template.clone(), None)),
        };

        for entry in &self.files {
            let Some(file) = data
                .changed_files
                .iter_mut()
                .find(|file| file.path == entry.path)
            else {
                report.pruned.push(entry.path.clone());
                continue;
            };
            file.included = entry.included;
            match ContentMode::from_str(&entry.mode) {
                Ok(mode) => file.mode = mode,
                Err(err) => log::warn!("{}: {err}, keeping {}", entry.path, file.mode),
            }
        }
        for file in &mut data.changed_files {
            file.recompute_tokens();
        }

        data.active_filters = self.filters.iter().map(FilterEntry::to_filter).collect();
        data.additional_context = self.context.iter().map(ContextEntry::to_item).collect();
        data.git_context = self.git_context.clone();
        data.git_history = self.git_history;
        data.title = self.title.clone();
        data.description = self.description.clone();

        if let Some((template, preset)) = prompt {
            data.set_prompt(template, preset);
        }

        Ok(report)
    }

    pub fn to_yaml(&self) -> Result<String, StorageError> {
        serde_yaml::to_string(self).map_err(|source| StorageError::Serialize {
            what: "session",
            source,
        })
    }

    pub fn from_yaml(text: &str, path: &Path) -> Result<Self, StorageError> {
        serde_yaml::from_str(text).map_err(|source| StorageError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StorageError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let yaml = self.to_yaml()?;
        std::fs::write(path, yaml).map_err(|source| StorageError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("session saved to {}", path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, StorageError> {
        let text = std::fs::read_to_string(path).map_err(|source| StorageError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text, path)
    }
}

/// Convenience used by the controller: read a session file and overlay it.
pub fn load_into(
    path: &Path,
    data: &mut PrData,
    resolve_prompt: impl Fn(&str) -> Result<Option<PromptPreset>, DomainError>,
) -> Result<ApplyReport, DomainError> {
    let session = Session::load(path)?;
    let report = session.apply_to(data, resolve_prompt)?;
    log::info!(
        "session loaded from {} ({} stale file entries pruned)",
        path.display(),
        report.pruned.len()
    );
    Ok(report)
}
