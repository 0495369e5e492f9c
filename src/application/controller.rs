//! The controller every command goes through.
//!
//! It owns the [`PrData`] for one invocation together with the collaborators
//! needed to build and persist it. Nothing here is global: callers construct a
//! controller per run and inject the repository reader they want.

use crate::application::generated::{
    GeneratedPrData, LastGenerated, last_generated_path, parse_generated,
};
use crate::application::git_context;
use crate::application::presets::PresetStore;
use crate::application::repo_config::RepoConfig;
use crate::application::request::GenerationRequest;
use crate::application::session::{self, ApplyReport, Session};
use crate::domain::{
    ContextItem, DomainError, DomainResult, FileVersion, Filter, FilterPreset, FilterRule,
    FilterTestResult, GitContextItem, GitHistoryConfig, PresetLocation, PrData, PromptPreset,
    ValidationError,
};
use crate::infra::generation::{GenerationCancelled, GenerationClient};
use crate::infra::repository::RepositoryReader;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// Result of a completed generation.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub raw: String,
    pub parsed: Option<GeneratedPrData>,
    pub parse_error: Option<String>,
    pub saved_to: PathBuf,
}

pub struct Controller {
    repo_path: PathBuf,
    repo: Box<dyn RepositoryReader>,
    presets: PresetStore,
    data: PrData,
}

impl Controller {
    pub fn new(repo_path: impl Into<PathBuf>, repo: Box<dyn RepositoryReader>) -> Self {
        let repo_path = repo_path.into();
        let presets = PresetStore::for_repo(&repo_path);
        Self {
            repo_path,
            repo,
            presets,
            data: PrData::default(),
        }
    }

    pub fn with_presets(mut self, presets: PresetStore) -> Self {
        self.presets = presets;
        self
    }

    pub fn data(&self) -> &PrData {
        &self.data
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    pub fn presets(&self) -> &PresetStore {
        &self.presets
    }

    pub fn default_session_path(&self) -> PathBuf {
        session::default_session_path(&self.repo_path)
    }

    /// Reads branch identity and the changed-file set from the repository and
    /// replaces the current state with it. `target` defaults to the
    /// repository's default branch.
    pub fn initialize(&mut self, target: Option<&str>) -> DomainResult<()> {
        let source = self
            .repo
            .current_branch()
            .map_err(DomainError::Repository)?;
        let target = match target {
            Some(target) => target.to_string(),
            None => self
                .repo
                .default_branch()
                .map_err(DomainError::Repository)?,
        };
        let files = self
            .repo
            .changed_files(&source, &target)
            .map_err(DomainError::Repository)?;

        log::info!(
            "initialized {source} -> {target} with {} changed files",
            files.len()
        );
        self.data = PrData::new(source, target, files);
        Ok(())
    }

    // Session

    pub fn save_session(&self, path: &Path) -> DomainResult<()> {
        Session::from_data(&self.data).save(path)?;
        Ok(())
    }

    pub fn load_session(&mut self, path: &Path) -> DomainResult<ApplyReport> {
        let presets = &self.presets;
        let report = session::load_into(path, &mut self.data, |id| {
            match presets.resolve_prompt_preset(id) {
                Ok(preset) => Ok(Some(preset)),
                Err(DomainError::NotFound(_)) => Ok(None),
                Err(err) => Err(err),
            }
        })?;
        if let Some(id) = &report.missing_preset {
            log::warn!("prompt preset {id} from session not found");
        }
        Ok(report)
    }

    /// Loads `path` when it exists. Returns `None` for a fresh session.
    pub fn load_session_if_present(&mut self, path: &Path) -> DomainResult<Option<ApplyReport>> {
        if !path.exists() {
            log::debug!("no session at {}", path.display());
            return Ok(None);
        }
        self.load_session(path).map(Some)
    }

    /// Applies the repository's default filter presets. Returns how many were
    /// added.
    pub fn apply_default_filter_presets(&mut self) -> DomainResult<usize> {
        let config = RepoConfig::load(&self.repo_path)?;
        for id in &config.defaults.filter_presets {
            self.apply_filter_preset(id)?;
        }
        Ok(config.defaults.filter_presets.len())
    }

    // Metadata

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.data.title = title.into();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.data.description = description.into();
    }

    // Files

    pub fn toggle_file_inclusion(&mut self, path: &str) -> DomainResult<bool> {
        Ok(self.data.toggle_file_inclusion(path)?)
    }

    pub fn set_file_included(&mut self, path: &str, included: bool) -> DomainResult<()> {
        Ok(self.data.set_file_included(path, included)?)
    }

    pub fn set_all_visible_included(&mut self, included: bool) -> usize {
        self.data.set_all_visible_included(included)
    }

    pub fn set_full_file(&mut self, path: &str, version: FileVersion) -> DomainResult<()> {
        Ok(self.data.set_full_file(path, version)?)
    }

    pub fn restore_to_diff(&mut self, path: &str) -> DomainResult<()> {
        Ok(self.data.restore_to_diff(path)?)
    }

    // Filters

    pub fn add_filter(&mut self, filter: Filter) -> DomainResult<()> {
        Ok(self.data.add_filter(filter)?)
    }

    pub fn remove_filter(&mut self, index: usize) -> DomainResult<Filter> {
        Ok(self.data.remove_filter(index)?)
    }

    pub fn clear_filters(&mut self) {
        self.data.clear_filters();
    }

    pub fn test_filter(&self, filter: &Filter) -> DomainResult<FilterTestResult> {
        filter.validate()?;
        Ok(self.data.test_filter(filter))
    }

    pub fn list_filter_presets(&self) -> DomainResult<Vec<FilterPreset>> {
        self.presets.list_filter_presets()
    }

    /// Resolves a filter preset and appends it to the active filters.
    pub fn apply_filter_preset(&mut self, id: &str) -> DomainResult<Filter> {
        let filter = self.presets.resolve_filter_preset(id)?.to_filter();
        self.data.add_filter(filter.clone())?;
        Ok(filter)
    }

    pub fn save_filter_preset(
        &self,
        name: &str,
        description: &str,
        rules: &[FilterRule],
        location: PresetLocation,
    ) -> DomainResult<FilterPreset> {
        self.presets
            .save_filter_preset(name, description, rules, location)
    }

    // Context

    /// Reads `path` as it exists on the source branch and adds it as context.
    pub fn add_context_file(&mut self, path: &str) -> DomainResult<()> {
        let content = self
            .repo
            .file_content_at(&self.data.source_branch, path)
            .map_err(DomainError::Repository)?;
        self.data.add_context_item(ContextItem::file(path, content));
        Ok(())
    }

    pub fn add_context_note(&mut self, text: &str) -> DomainResult<()> {
        if text.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "note",
                value: text.to_string(),
            }
            .into());
        }
        self.data.add_context_item(ContextItem::note(text));
        Ok(())
    }

    pub fn remove_context_item(&mut self, index: usize) -> DomainResult<ContextItem> {
        Ok(self.data.remove_context_item(index)?)
    }

    pub fn set_git_history(&mut self, config: GitHistoryConfig) {
        self.data.git_history = Some(config);
    }

    pub fn add_git_context(&mut self, item: GitContextItem) {
        self.data.add_git_context(item);
    }

    pub fn remove_git_context(&mut self, index: usize) -> DomainResult<GitContextItem> {
        Ok(self.data.remove_git_context(index)?)
    }

    pub fn clear_git_context(&mut self) {
        self.data.clear_git_context();
    }

    // Prompt

    pub fn set_prompt(&mut self, template: impl Into<String>) {
        self.data.set_prompt(template, None);
    }

    pub fn load_prompt_preset(&mut self, id: &str) -> DomainResult<()> {
        let preset = self.presets.resolve_prompt_preset(id)?;
        self.data.set_prompt(preset.template.clone(), Some(preset));
        Ok(())
    }

    pub fn list_prompt_presets(&self) -> DomainResult<Vec<PromptPreset>> {
        self.presets.list_prompt_presets()
    }

    /// Saves the current prompt text as a preset.
    pub fn save_prompt_preset(
        &self,
        name: &str,
        description: &str,
        location: PresetLocation,
    ) -> DomainResult<PromptPreset> {
        self.presets
            .save_prompt_preset(name, description, &self.data.current_prompt, location)
    }

    // Generation

    /// Snapshot of what would be sent: included and visible files, user
    /// context, then git history and git context read from the repository.
    pub fn build_generation_request(&self) -> DomainResult<GenerationRequest> {
        let files: Vec<_> = self
            .data
            .included_visible_files()
            .into_iter()
            .cloned()
            .collect();
        if files.is_empty() {
            return Err(ValidationError::NoFilesIncluded.into());
        }

        let mut context = self.data.additional_context.clone();
        let history = self.data.effective_git_history();
        match git_context::build_history(
            self.repo.as_ref(),
            &self.data.source_branch,
            &self.data.target_branch,
            &history,
        ) {
            Ok(Some(item)) => context.push(item),
            Ok(None) => {}
            Err(err) => log::warn!("skipping git history: {err:#}"),
        }
        for item in &self.data.git_context {
            let materialized =
                git_context::materialize(self.repo.as_ref(), item, history.include_numstat)
                    .map_err(DomainError::Repository)?;
            context.push(materialized);
        }

        Ok(GenerationRequest {
            source_branch: self.data.source_branch.clone(),
            target_branch: self.data.target_branch.clone(),
            title: self.data.title.clone(),
            description: self.data.description.clone(),
            files,
            additional_context: context,
            prompt: self.data.current_prompt.clone(),
        })
    }

    /// Sends the current request to `client` and records the answer in
    /// `last-generated.yaml`. Cancellation leaves no record behind.
    pub async fn generate(
        &self,
        client: &dyn GenerationClient,
        cancel: CancellationToken,
    ) -> DomainResult<GenerationOutcome> {
        let request = self.build_generation_request()?;
        let payload = request.compile().map_err(DomainError::Generation)?;
        log::info!(
            "generating with {} (~{} tokens)",
            client.id(),
            request.total_tokens()
        );

        let raw = match client.generate(&payload, cancel).await {
            Ok(raw) => raw,
            Err(err) => {
                if err.downcast_ref::<GenerationCancelled>().is_some() {
                    log::info!("generation cancelled");
                }
                return Err(DomainError::Generation(err));
            }
        };

        let (parsed, parse_error) = match parse_generated(&raw) {
            Ok(parsed) => (Some(parsed), None),
            Err(err) => {
                log::warn!("could not parse generated output: {err}");
                (None, Some(err))
            }
        };

        let record = LastGenerated {
            generated_at: chrono::Utc::now().to_rfc3339(),
            agent: client.id().to_string(),
            source_branch: request.source_branch,
            target_branch: request.target_branch,
            parsed: parsed.clone(),
            parse_error: parse_error.clone(),
            raw: raw.clone(),
        };
        let saved_to = last_generated_path(&self.repo_path);
        record.save(&saved_to)?;

        Ok(GenerationOutcome {
            raw,
            parsed,
            parse_error,
            saved_to,
        })
    }
}
