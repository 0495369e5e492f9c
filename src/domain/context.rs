use crate::domain::tokens;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextKind {
    File,
    Note,
    /// Commit log summary produced while building a generation request.
    GitHistory,
}

impl fmt::Display for ContextKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            ContextKind::File => "file",
            ContextKind::Note => "note",
            ContextKind::GitHistory => "git_history",
        };
        write!(f, "{value}")
    }
}

impl FromStr for ContextKind {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input {
            "file" => Ok(ContextKind::File),
            "note" => Ok(ContextKind::Note),
            "git_history" => Ok(ContextKind::GitHistory),
            other => Err(format!("invalid context type: {other}")),
        }
    }
}

/// Extra material sent alongside the changed files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextItem {
    pub kind: ContextKind,
    pub path: Option<String>,
    pub content: String,
    pub tokens: usize,
}

impl ContextItem {
    pub fn new(kind: ContextKind, path: Option<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            kind,
            path,
            tokens: tokens::count(&content),
            content,
        }
    }

    pub fn file(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(ContextKind::File, Some(path.into()), content)
    }

    pub fn note(content: impl Into<String>) -> Self {
        Self::new(ContextKind::Note, None, content)
    }

    pub fn git_history(content: impl Into<String>) -> Self {
        Self::new(ContextKind::GitHistory, None, content)
    }

    /// Short human label: the path for files, a truncated first line for notes.
    pub fn label(&self) -> String {
        match (&self.kind, &self.path) {
            (ContextKind::File, Some(path)) => path.clone(),
            _ => {
                let first = self.content.lines().next().unwrap_or_default();
                if first.chars().count() > 60 {
                    let short: String = first.chars().take(57).collect();
                    format!("{short}...")
                } else {
                    first.to_string()
                }
            }
        }
    }
}

/// Settings for the commit-log summary attached to generation requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitHistoryConfig {
    pub enabled: bool,
    pub max_commits: usize,
    pub include_merges: bool,
    pub first_parent: bool,
    pub include_numstat: bool,
}

impl Default for GitHistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_commits: 20,
            include_merges: false,
            first_parent: true,
            include_numstat: false,
        }
    }
}

/// A git reference selected as context. Only the reference is stored; the
/// content is read from the repository when a request is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GitContextItem {
    Commit {
        #[serde(rename = "ref")]
        reference: String,
    },
    CommitPatch {
        #[serde(rename = "ref")]
        reference: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        paths: Vec<String>,
    },
    FileAtRef {
        #[serde(rename = "ref")]
        reference: String,
        path: String,
    },
    FileDiff {
        from: String,
        to: String,
        path: String,
    },
}

impl fmt::Display for GitContextItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GitContextItem::Commit { reference } => write!(f, "commit ref={reference}"),
            GitContextItem::CommitPatch { reference, paths } if paths.is_empty() => {
                write!(f, "commit_patch ref={reference}")
            }
            GitContextItem::CommitPatch { reference, paths } => {
                write!(f, "commit_patch ref={reference} paths={}", paths.join(","))
            }
            GitContextItem::FileAtRef { reference, path } => {
                write!(f, "file_at_ref ref={reference} path={path}")
            }
            GitContextItem::FileDiff { from, to, path } => {
                write!(f, "file_diff from={from} to={to} path={path}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_follow_content_length() {
        let item = ContextItem::note("x".repeat(9));
        assert_eq!(item.tokens, 3);
        assert_eq!(item.kind, ContextKind::Note);
        assert!(item.path.is_none());
    }

    #[test]
    fn label_prefers_path_for_files() {
        assert_eq!(ContextItem::file("docs/a.md", "body").label(), "docs/a.md");
        let long = ContextItem::note("n".repeat(100));
        assert_eq!(long.label().chars().count(), 60);
    }

    #[test]
    fn git_context_items_use_kind_tag() {
        let item = GitContextItem::FileAtRef {
            reference: "main".to_string(),
            path: "README.md".to_string(),
        };
        let yaml = serde_yaml::to_string(&item).unwrap();
        assert!(yaml.contains("kind: file_at_ref"));
        assert!(yaml.contains("ref: main"));
        let back: GitContextItem = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, item);
    }
}
