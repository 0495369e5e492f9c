//! Filter and prompt preset storage.
//!
//! One YAML file per preset, named `<slug>.yaml`. The file name is the preset
//! id. Lookups consult built-ins, then the project directory, then the global
//! directory, and stop at the first hit.

use crate::application::session::{DATA_DIR, RuleEntry};
use crate::domain::{
    DomainError, FilterPreset, FilterRule, NotFoundError, PresetLocation, PromptPreset,
    StorageError, ValidationError, builtin_filter_presets, builtin_prompt_presets,
    preset_file_name,
};
use crate::infra::app_config::global_data_dir;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::path::{Path, PathBuf};

const FILTERS_DIR: &str = "filters";
const PROMPTS_DIR: &str = "prompts";
const SEARCH_ORDER: [PresetLocation; 3] = [
    PresetLocation::Builtin,
    PresetLocation::Project,
    PresetLocation::Global,
];

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FilterPresetFile {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    rules: Vec<RuleEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PromptPresetFile {
    name: String,
    #[serde(default)]
    description: String,
    template: String,
}

#[derive(Debug, Clone)]
pub struct PresetStore {
    project_root: PathBuf,
    global_root: Option<PathBuf>,
}

impl PresetStore {
    /// Store rooted at `<repo>/.pr-builder` and the user's global directory.
    pub fn for_repo(repo_path: &Path) -> Self {
        Self::new(repo_path.join(DATA_DIR), global_data_dir())
    }

    pub fn new(project_root: PathBuf, global_root: Option<PathBuf>) -> Self {
        Self {
            project_root,
            global_root,
        }
    }

    fn dir(&self, location: PresetLocation, kind: &str) -> Result<Option<PathBuf>, DomainError> {
        match location {
            PresetLocation::Builtin => Ok(None),
            PresetLocation::Project => Ok(Some(self.project_root.join(kind))),
            PresetLocation::Global => self
                .global_root
                .as_ref()
                .map(|root| Some(root.join(kind)))
                .ok_or_else(|| StorageError::HomeDirUnavailable.into()),
        }
    }

    pub fn filter_presets(&self, location: PresetLocation) -> Result<Vec<FilterPreset>, DomainError> {
        let Some(dir) = self.dir(location, FILTERS_DIR)? else {
            return Ok(builtin_filter_presets());
        };
        let presets = read_dir::<FilterPresetFile>(&dir)?
            .into_iter()
            .map(|(id, file)| FilterPreset {
                id,
                name: file.name,
                description: file.description,
                rules: rules_from_entries(&file.rules),
                location,
            })
            .collect();
        Ok(sorted(presets, |p: &FilterPreset| (p.name.clone(), p.id.clone())))
    }

    pub fn prompt_presets(&self, location: PresetLocation) -> Result<Vec<PromptPreset>, DomainError> {
        let Some(dir) = self.dir(location, PROMPTS_DIR)? else {
            return Ok(builtin_prompt_presets());
        };
        let presets = read_dir::<PromptPresetFile>(&dir)?
            .into_iter()
            .map(|(id, file)| PromptPreset {
                id,
                name: file.name,
                description: file.description,
                template: file.template,
                location,
            })
            .collect();
        Ok(sorted(presets, |p: &PromptPreset| (p.name.clone(), p.id.clone())))
    }

    /// Every reachable filter preset: built-in, project, then global.
    pub fn list_filter_presets(&self) -> Result<Vec<FilterPreset>, DomainError> {
        let mut all = Vec::new();
        for location in SEARCH_ORDER {
            match self.filter_presets(location) {
                Ok(presets) => all.extend(presets),
                Err(DomainError::Storage(StorageError::HomeDirUnavailable)) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(all)
    }

    pub fn list_prompt_presets(&self) -> Result<Vec<PromptPreset>, DomainError> {
        let mut all = Vec::new();
        for location in SEARCH_ORDER {
            match self.prompt_presets(location) {
                Ok(presets) => all.extend(presets),
                Err(DomainError::Storage(StorageError::HomeDirUnavailable)) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(all)
    }

    pub fn resolve_filter_preset(&self, id: &str) -> Result<FilterPreset, DomainError> {
        self.find(id, Self::filter_presets, |preset| &preset.id)?
            .ok_or_else(|| NotFoundError::FilterPreset(id.to_string()).into())
    }

    pub fn resolve_prompt_preset(&self, id: &str) -> Result<PromptPreset, DomainError> {
        self.find(id, Self::prompt_presets, |preset| &preset.id)?
            .ok_or_else(|| NotFoundError::PromptPreset(id.to_string()).into())
    }

    /// Walks the scopes in order and stops at the first one holding `id`.
    /// Later scopes are not read once a match is found.
    fn find<T>(
        &self,
        id: &str,
        scope: impl Fn(&Self, PresetLocation) -> Result<Vec<T>, DomainError>,
        id_of: impl Fn(&T) -> &String,
    ) -> Result<Option<T>, DomainError> {
        for location in SEARCH_ORDER {
            let presets = match scope(self, location) {
                Ok(presets) => presets,
                Err(DomainError::Storage(StorageError::HomeDirUnavailable)) => continue,
                Err(err) => return Err(err),
            };
            if let Some(found) = presets.into_iter().find(|preset| id_of(preset) == id) {
                log::debug!("preset {id} resolved from {location}");
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    pub fn save_filter_preset(
        &self,
        name: &str,
        description: &str,
        rules: &[FilterRule],
        location: PresetLocation,
    ) -> Result<FilterPreset, DomainError> {
        if rules.is_empty() {
            return Err(ValidationError::MissingPattern(name.to_string()).into());
        }
        let file = FilterPresetFile {
            name: name.trim().to_string(),
            description: description.to_string(),
            rules: rules.iter().map(RuleEntry::from).collect(),
        };
        let id = self.write(location, FILTERS_DIR, &file.name, &file)?;
        Ok(FilterPreset {
            id,
            name: file.name,
            description: file.description,
            rules: rules_from_entries(&file.rules),
            location,
        })
    }

    pub fn save_prompt_preset(
        &self,
        name: &str,
        description: &str,
        template: &str,
        location: PresetLocation,
    ) -> Result<PromptPreset, DomainError> {
        let file = PromptPresetFile {
            name: name.trim().to_string(),
            description: description.to_string(),
            template: template.to_string(),
        };
        let id = self.write(location, PROMPTS_DIR, &file.name, &file)?;
        Ok(PromptPreset {
            id,
            name: file.name,
            description: file.description,
            template: file.template,
            location,
        })
    }

    fn write<T: Serialize>(
        &self,
        location: PresetLocation,
        kind: &str,
        name: &str,
        value: &T,
    ) -> Result<String, DomainError> {
        if name.is_empty() {
            return Err(ValidationError::MissingPresetName.into());
        }
        let Some(dir) = self.dir(location, kind)? else {
            return Err(ValidationError::ReadOnlyPresetLocation(location.to_string()).into());
        };
        std::fs::create_dir_all(&dir).map_err(|source| StorageError::CreateDir {
            path: dir.clone(),
            source,
        })?;

        let id = preset_file_name(name);
        let path = dir.join(&id);
        let yaml = serde_yaml::to_string(value).map_err(|source| StorageError::Serialize {
            what: "preset",
            source,
        })?;
        std::fs::write(&path, yaml).map_err(|source| StorageError::Write {
            path: path.clone(),
            source,
        })?;
        log::info!("saved preset {id} to {}", path.display());
        Ok(id)
    }
}

fn rules_from_entries(entries: &[RuleEntry]) -> Vec<FilterRule> {
    entries
        .iter()
        .enumerate()
        .map(|(order, entry)| FilterRule {
            kind: entry.kind,
            pattern: entry.pattern.clone(),
            order,
        })
        .collect()
}

fn sorted<T, K: Ord>(mut items: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T> {
    items.sort_by_key(|item| key(item));
    items
}

/// Reads every `*.yaml` file in `dir`. A missing directory is empty;
/// files that fail to read or parse are skipped.
fn read_dir<T: DeserializeOwned>(dir: &Path) -> Result<Vec<(String, T)>, StorageError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(StorageError::Read {
                path: dir.to_path_buf(),
                source,
            });
        }
    };

    let mut out = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("yaml") {
            continue;
        }
        let Some(id) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            continue;
        };
        let parsed = std::fs::read_to_string(&path)
            .map_err(|err| err.to_string())
            .and_then(|text| serde_yaml::from_str::<T>(&text).map_err(|err| err.to_string()));
        match parsed {
            Ok(value) => out.push((id, value)),
            Err(err) => log::warn!("skipping preset {}: {err}", path.display()),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FilterKind;
    use tempfile::tempdir;

    fn store(root: &Path) -> PresetStore {
        PresetStore::new(root.join("project"), Some(root.join("global")))
    }

    #[test]
    fn builtins_are_always_listed_first() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        store
            .save_prompt_preset("Aardvark", "", "first alphabetically", PresetLocation::Project)
            .unwrap();

        let all = store.list_prompt_presets().unwrap();
        assert_eq!(all[0].location, PresetLocation::Builtin);
        assert_eq!(all.last().unwrap().id, "aardvark.yaml");
    }

    #[test]
    fn saved_filter_preset_round_trips() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        let rules = vec![FilterRule::exclude("**/*.md", 0), FilterRule::include("src/**", 1)];
        let saved = store
            .save_filter_preset("Only Source", "src without docs", &rules, PresetLocation::Global)
            .unwrap();
        assert_eq!(saved.id, "only_source.yaml");
        assert!(dir.path().join("global/filters/only_source.yaml").exists());

        let resolved = store.resolve_filter_preset("only_source.yaml").unwrap();
        assert_eq!(resolved.rules, rules);
        assert_eq!(resolved.location, PresetLocation::Global);

        let text = std::fs::read_to_string(dir.path().join("global/filters/only_source.yaml"))
            .unwrap();
        assert!(text.contains("type: exclude"));
        assert!(!text.contains("order"));
    }

    #[test]
    fn project_shadows_global_but_not_builtin() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        store
            .save_prompt_preset("Team", "", "project text", PresetLocation::Project)
            .unwrap();
        store
            .save_prompt_preset("Team", "", "global text", PresetLocation::Global)
            .unwrap();
        assert_eq!(
            store.resolve_prompt_preset("team.yaml").unwrap().template,
            "project text"
        );

        store
            .save_prompt_preset("Default", "", "shadow attempt", PresetLocation::Project)
            .unwrap();
        assert_eq!(
            store.resolve_prompt_preset("default").unwrap().location,
            PresetLocation::Builtin
        );
    }

    #[test]
    fn unknown_id_is_not_found() {
        let dir = tempdir().unwrap();
        let err = store(dir.path()).resolve_filter_preset("nope.yaml").unwrap_err();
        assert!(matches!(
            err,
            DomainError::NotFound(NotFoundError::FilterPreset(id)) if id == "nope.yaml"
        ));
    }

    #[test]
    fn builtin_location_is_read_only() {
        let dir = tempdir().unwrap();
        let err = store(dir.path())
            .save_prompt_preset("X", "", "t", PresetLocation::Builtin)
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::Validation(ValidationError::ReadOnlyPresetLocation(_))
        ));
        let err = store(dir.path())
            .save_prompt_preset("  ", "", "t", PresetLocation::Project)
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::Validation(ValidationError::MissingPresetName)
        ));
    }

    #[test]
    fn broken_files_are_skipped() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        let filters = dir.path().join("project/filters");
        std::fs::create_dir_all(&filters).unwrap();
        std::fs::write(filters.join("broken.yaml"), "rules: [").unwrap();
        std::fs::write(
            filters.join("good.yaml"),
            "name: Good\nrules:\n  - type: include\n    pattern: '*.rs'\n",
        )
        .unwrap();

        let project = store.filter_presets(PresetLocation::Project).unwrap();
        assert_eq!(project.len(), 1);
        assert_eq!(project[0].rules[0].kind, FilterKind::Include);
    }

    #[test]
    fn builtins_resolve_when_project_dir_is_unreadable() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        std::fs::create_dir_all(dir.path().join("project")).unwrap();
        std::fs::write(dir.path().join("project/prompts"), "not a directory").unwrap();
        std::fs::write(dir.path().join("project/filters"), "not a directory").unwrap();

        assert_eq!(
            store.resolve_prompt_preset("concise").unwrap().location,
            PresetLocation::Builtin
        );
        assert_eq!(
            store.resolve_filter_preset("exclude_docs").unwrap().location,
            PresetLocation::Builtin
        );

        // Anything past the built-ins still has to read the broken scope.
        let err = store.resolve_prompt_preset("team.yaml").unwrap_err();
        assert!(matches!(err, DomainError::Storage(StorageError::Read { .. })));
        assert!(store.list_prompt_presets().is_err());
    }

    #[test]
    fn missing_global_root_is_tolerated_when_listing() {
        let dir = tempdir().unwrap();
        let store = PresetStore::new(dir.path().join("project"), None);
        assert_eq!(
            store.list_filter_presets().unwrap().len(),
            builtin_filter_presets().len()
        );
        assert!(store
            .save_filter_preset("x", "", &[FilterRule::exclude("*", 0)], PresetLocation::Global)
            .is_err());
    }
}
