use crate::application::session::DATA_DIR;
use crate::domain::StorageError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "config.yaml";

/// Per-repository settings from `<repo>/.pr-builder/config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoConfig {
    #[serde(default)]
    pub defaults: RepoDefaults,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoDefaults {
    /// Filter preset ids applied when a new session starts.
    #[serde(default)]
    pub filter_presets: Vec<String>,
}

pub fn repo_config_path(repo_path: &Path) -> PathBuf {
    repo_path.join(DATA_DIR).join(CONFIG_FILE)
}

impl RepoConfig {
    /// A missing file is an empty config.
    pub fn load(repo_path: &Path) -> Result<Self, StorageError> {
        let path = repo_config_path(repo_path);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => return Err(StorageError::Read { path, source }),
        };
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&text).map_err(|source| StorageError::Parse { path, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_config_is_empty() {
        let dir = tempdir().unwrap();
        assert_eq!(RepoConfig::load(dir.path()).unwrap(), RepoConfig::default());
    }

    #[test]
    fn reads_default_filter_presets() {
        let dir = tempdir().unwrap();
        let path = repo_config_path(dir.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            "defaults:\n  filter_presets:\n    - exclude_tests\n    - team.yaml\n",
        )
        .unwrap();
        let config = RepoConfig::load(dir.path()).unwrap();
        assert_eq!(config.defaults.filter_presets, vec!["exclude_tests", "team.yaml"]);
    }

    #[test]
    fn malformed_config_is_a_parse_error() {
        let dir = tempdir().unwrap();
        let path = repo_config_path(dir.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "defaults: [").unwrap();
        assert!(matches!(
            RepoConfig::load(dir.path()),
            Err(StorageError::Parse { .. })
        ));
    }
}
