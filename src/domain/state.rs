use crate::domain::context::{ContextItem, GitContextItem, GitHistoryConfig};
use crate::domain::error::{NotFoundError, ValidationError};
use crate::domain::file::{ContentMode, FileChange, FileVersion};
use crate::domain::filter::{Filter, FilterSet, FilterTestResult};
use crate::domain::preset::{PromptPreset, builtin_prompt_presets};
use crate::prompts;

/// Everything the user curates for one pull request.
///
/// Built fresh from the live repository on every run; a saved session is only
/// ever overlaid onto it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrData {
    pub source_branch: String,
    pub target_branch: String,
    pub title: String,
    pub description: String,
    pub changed_files: Vec<FileChange>,
    pub active_filters: Vec<Filter>,
    pub additional_context: Vec<ContextItem>,
    pub current_prompt: String,
    pub current_preset: Option<PromptPreset>,
    /// `None` means "never configured"; the defaults apply.
    pub git_history: Option<GitHistoryConfig>,
    pub git_context: Vec<GitContextItem>,
}

impl Default for PrData {
    fn default() -> Self {
        let default_preset = builtin_prompt_presets()
            .into_iter()
            .find(|preset| preset.id == "default");
        Self {
            source_branch: String::new(),
            target_branch: String::new(),
            title: String::new(),
            description: String::new(),
            changed_files: Vec::new(),
            active_filters: Vec::new(),
            additional_context: Vec::new(),
            current_prompt: prompts::DEFAULT_PROMPT.to_string(),
            current_preset: default_preset,
            git_history: None,
            git_context: Vec::new(),
        }
    }
}

impl PrData {
    pub fn new(
        source_branch: impl Into<String>,
        target_branch: impl Into<String>,
        changed_files: Vec<FileChange>,
    ) -> Self {
        Self {
            source_branch: source_branch.into(),
            target_branch: target_branch.into(),
            changed_files,
            ..Default::default()
        }
    }

    fn filter_set(&self) -> FilterSet {
        FilterSet::new(&self.active_filters)
    }

    pub fn passes_filters(&self, path: &str) -> bool {
        self.active_filters.is_empty() || self.filter_set().passes(path)
    }

    /// Files that pass every active filter, in original order.
    pub fn visible_files(&self) -> Vec<&FileChange> {
        if self.active_filters.is_empty() {
            return self.changed_files.iter().collect();
        }
        let set = self.filter_set();
        self.changed_files
            .iter()
            .filter(|file| set.passes(&file.path))
            .collect()
    }

    /// Files hidden by the active filters, in original order.
    pub fn filtered_files(&self) -> Vec<&FileChange> {
        if self.active_filters.is_empty() {
            return Vec::new();
        }
        let set = self.filter_set();
        self.changed_files
            .iter()
            .filter(|file| !set.passes(&file.path))
            .collect()
    }

    /// Visible files that are also marked for inclusion.
    pub fn included_visible_files(&self) -> Vec<&FileChange> {
        self.visible_files()
            .into_iter()
            .filter(|file| file.included)
            .collect()
    }

    pub fn file(&self, path: &str) -> Result<&FileChange, NotFoundError> {
        self.changed_files
            .iter()
            .find(|file| file.path == path)
            .ok_or_else(|| NotFoundError::File(path.to_string()))
    }

    fn file_mut(&mut self, path: &str) -> Result<&mut FileChange, NotFoundError> {
        self.changed_files
            .iter_mut()
            .find(|file| file.path == path)
            .ok_or_else(|| NotFoundError::File(path.to_string()))
    }

    /// Flips inclusion and returns the new value.
    pub fn toggle_file_inclusion(&mut self, path: &str) -> Result<bool, NotFoundError> {
        let file = self.file_mut(path)?;
        file.toggle_included();
        Ok(file.included)
    }

    pub fn set_file_included(&mut self, path: &str, included: bool) -> Result<(), NotFoundError> {
        self.file_mut(path)?.included = included;
        Ok(())
    }

    /// Sets inclusion on every visible file; filtered files are left alone.
    /// Returns how many files were touched.
    pub fn set_all_visible_included(&mut self, included: bool) -> usize {
        let set = self.filter_set();
        let mut touched = 0;
        for file in &mut self.changed_files {
            if set.passes(&file.path) {
                file.included = included;
                touched += 1;
            }
        }
        touched
    }

    pub fn set_full_file(&mut self, path: &str, version: FileVersion) -> Result<(), NotFoundError> {
        self.file_mut(path)?.set_mode(ContentMode::from(version));
        Ok(())
    }

    pub fn restore_to_diff(&mut self, path: &str) -> Result<(), NotFoundError> {
        self.file_mut(path)?.set_mode(ContentMode::Diff);
        Ok(())
    }

    pub fn add_filter(&mut self, filter: Filter) -> Result<(), ValidationError> {
        filter.validate()?;
        self.active_filters.push(filter);
        Ok(())
    }

    pub fn remove_filter(&mut self, index: usize) -> Result<Filter, ValidationError> {
        if index >= self.active_filters.len() {
            return Err(ValidationError::FilterIndexOutOfRange {
                index,
                len: self.active_filters.len(),
            });
        }
        Ok(self.active_filters.remove(index))
    }

    pub fn clear_filters(&mut self) {
        self.active_filters.clear();
    }

    /// Evaluates `filter` alone against every changed file. Active filters are
    /// ignored and nothing is modified.
    pub fn test_filter(&self, filter: &Filter) -> FilterTestResult {
        let set = FilterSet::new([filter]);
        let mut result = FilterTestResult::default();
        for file in &self.changed_files {
            if set.passes(&file.path) {
                result.matched.push(file.path.clone());
            } else {
                result.unmatched.push(file.path.clone());
            }
        }
        result
    }

    pub fn add_context_item(&mut self, item: ContextItem) {
        self.additional_context.push(item);
    }

    pub fn remove_context_item(&mut self, index: usize) -> Result<ContextItem, ValidationError> {
        if index >= self.additional_context.len() {
            return Err(ValidationError::ContextIndexOutOfRange {
                index,
                len: self.additional_context.len(),
            });
        }
        Ok(self.additional_context.remove(index))
    }

    pub fn add_git_context(&mut self, item: GitContextItem) {
        self.git_context.push(item);
    }

    pub fn remove_git_context(&mut self, index: usize) -> Result<GitContextItem, ValidationError> {
        if index >= self.git_context.len() {
            return Err(ValidationError::GitContextIndexOutOfRange {
                index,
                len: self.git_context.len(),
            });
        }
        Ok(self.git_context.remove(index))
    }

    pub fn clear_git_context(&mut self) {
        self.git_context.clear();
    }

    pub fn set_prompt(&mut self, template: impl Into<String>, preset: Option<PromptPreset>) {
        self.current_prompt = template.into();
        self.current_preset = preset;
    }

    pub fn effective_git_history(&self) -> GitHistoryConfig {
        self.git_history.unwrap_or_default()
    }

    /// Tokens of visible included files plus all additional context.
    pub fn total_tokens(&self) -> usize {
        let files: usize = self
            .included_visible_files()
            .iter()
            .map(|file| file.tokens)
            .sum();
        let context: usize = self.additional_context.iter().map(|item| item.tokens).sum();
        files + context
    }
}
