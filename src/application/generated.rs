use crate::application::session::DATA_DIR;
use crate::domain::StorageError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const LAST_GENERATED_FILE: &str = "last-generated.yaml";

static YAML_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:ya?ml)?[ \t]*\n(.*?)\n?```").expect("yaml fence regex"));

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseNotes {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
}

/// The structured answer the default prompt asks for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedPrData {
    pub title: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub changelog: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_notes: Option<ReleaseNotes>,
}

/// Parses the agent's answer. Accepts a fenced YAML block anywhere in the
/// text, or a bare YAML document.
pub fn parse_generated(text: &str) -> Result<GeneratedPrData, String> {
    let candidates: Vec<&str> = YAML_FENCE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .chain(std::iter::once(text.trim()))
        .collect();

    let mut last_err = String::from("empty response");
    for candidate in candidates {
        match serde_yaml::from_str::<GeneratedPrData>(candidate) {
            Ok(parsed) if !parsed.title.trim().is_empty() => return Ok(parsed),
            Ok(_) => last_err = "response has no title".to_string(),
            Err(err) => last_err = err.to_string(),
        }
    }
    Err(last_err)
}

/// Record of the most recent generation, kept next to the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastGenerated {
    pub generated_at: String,
    pub agent: String,
    pub source_branch: String,
    pub target_branch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parsed: Option<GeneratedPrData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parse_error: Option<String>,
    pub raw: String,
}

pub fn last_generated_path(repo_path: &Path) -> PathBuf {
    repo_path.join(DATA_DIR).join(LAST_GENERATED_FILE)
}

impl LastGenerated {
    pub fn save(&self, path: &Path) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StorageError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let yaml = serde_yaml::to_string(self).map_err(|source| StorageError::Serialize {
            what: "generated output",
            source,
        })?;
        std::fs::write(path, yaml).map_err(|source| StorageError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fenced_yaml_with_chatter() {
        let text = "Sure! Here it is:\n\n```yaml\ntitle: add widget support\nbody: |\n  - adds widgets\nchangelog: add widgets\nrelease_notes:\n  title: Widgets\n  body: You can now use widgets.\n```\nAnything else?";
        let parsed = parse_generated(text).unwrap();
        assert_eq!(parsed.title, "add widget support");
        assert_eq!(parsed.body, "- adds widgets\n");
        assert_eq!(parsed.release_notes.unwrap().title, "Widgets");
    }

    #[test]
    fn parses_bare_yaml() {
        let parsed = parse_generated("title: fix parser\nbody: handles empty input\n").unwrap();
        assert_eq!(parsed.title, "fix parser");
        assert!(parsed.changelog.is_empty());
    }

    #[test]
    fn prose_is_rejected() {
        assert!(parse_generated("I could not find any changes.").is_err());
        assert!(parse_generated("```yaml\nbody: no title\ntitle: ''\n```").is_err());
    }

    #[test]
    fn last_generated_is_written_as_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = last_generated_path(dir.path());
        let record = LastGenerated {
            generated_at: "2024-01-01T00:00:00+00:00".to_string(),
            agent: "claude".to_string(),
            source_branch: "feature".to_string(),
            target_branch: "main".to_string(),
            parsed: None,
            parse_error: Some("response has no title".to_string()),
            raw: "hello".to_string(),
        };
        record.save(&path).unwrap();
        let back: LastGenerated =
            serde_yaml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back, record);
    }
}
