use crate::domain::tokens;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which full-file version to show instead of the diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileVersion {
    Before,
    After,
    Both,
}

impl fmt::Display for FileVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            FileVersion::Before => "before",
            FileVersion::After => "after",
            FileVersion::Both => "both",
        };
        write!(f, "{value}")
    }
}

impl FromStr for FileVersion {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_ascii_lowercase().as_str() {
            "before" => Ok(FileVersion::Before),
            "after" => Ok(FileVersion::After),
            "both" => Ok(FileVersion::Both),
            other => Err(format!("invalid file version: {other}")),
        }
    }
}

/// How a changed file is represented in the generation payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentMode {
    #[default]
    Diff,
    FullBefore,
    FullAfter,
    FullBoth,
}

impl ContentMode {
    pub fn is_full(self) -> bool {
        !matches!(self, ContentMode::Diff)
    }

    pub fn version(self) -> Option<FileVersion> {
        match self {
            ContentMode::Diff => None,
            ContentMode::FullBefore => Some(FileVersion::Before),
            ContentMode::FullAfter => Some(FileVersion::After),
            ContentMode::FullBoth => Some(FileVersion::Both),
        }
    }
}

impl From<FileVersion> for ContentMode {
    fn from(version: FileVersion) -> Self {
        match version {
            FileVersion::Before => ContentMode::FullBefore,
            FileVersion::After => ContentMode::FullAfter,
            FileVersion::Both => ContentMode::FullBoth,
        }
    }
}

impl fmt::Display for ContentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            ContentMode::Diff => "diff",
            ContentMode::FullBefore => "full_before",
            ContentMode::FullAfter => "full_after",
            ContentMode::FullBoth => "full_both",
        };
        write!(f, "{value}")
    }
}

impl FromStr for ContentMode {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input {
            "diff" => Ok(ContentMode::Diff),
            "full_before" => Ok(ContentMode::FullBefore),
            "full_after" => Ok(ContentMode::FullAfter),
            "full_both" => Ok(ContentMode::FullBoth),
            other => Err(format!("invalid content mode: {other}")),
        }
    }
}

/// A file changed between the target and source branch.
///
/// `tokens` always reflects the text selected by `mode`; every transition goes
/// through [`FileChange::set_mode`], which recomputes it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct FileChange {
    pub path: String,
    pub included: bool,
    pub additions: usize,
    pub deletions: usize,
    pub tokens: usize,
    pub mode: ContentMode,
    #[serde(skip)]
    pub diff: String,
    #[serde(skip)]
    pub full_before: String,
    #[serde(skip)]
    pub full_after: String,
}

impl FileChange {
    /// A freshly fetched change: included, shown as a diff.
    pub fn new(
        path: impl Into<String>,
        diff: impl Into<String>,
        full_before: impl Into<String>,
        full_after: impl Into<String>,
    ) -> Self {
        let mut file = Self {
            path: path.into(),
            included: true,
            diff: diff.into(),
            full_before: full_before.into(),
            full_after: full_after.into(),
            ..Default::default()
        };
        file.recompute_tokens();
        file
    }

    pub fn with_stats(mut self, additions: usize, deletions: usize) -> Self {
        self.additions = additions;
        self.deletions = deletions;
        self
    }

    pub fn set_mode(&mut self, mode: ContentMode) {
        self.mode = mode;
        self.recompute_tokens();
    }

    pub fn toggle_included(&mut self) {
        self.included = !self.included;
    }

    pub fn recompute_tokens(&mut self) {
        self.tokens = self.tokens_for(self.mode);
    }

    pub fn tokens_for(&self, mode: ContentMode) -> usize {
        match mode {
            ContentMode::Diff => tokens::count(&self.diff),
            ContentMode::FullBefore => tokens::count(&self.full_before),
            ContentMode::FullAfter => tokens::count(&self.full_after),
            ContentMode::FullBoth => {
                tokens::count(&self.full_before) + tokens::count(&self.full_after)
            }
        }
    }

    /// Text that represents this file in its current mode.
    pub fn selected_content(&self) -> String {
        match self.mode {
            ContentMode::Diff => self.diff.clone(),
            ContentMode::FullBefore => self.full_before.clone(),
            ContentMode::FullAfter => self.full_after.clone(),
            ContentMode::FullBoth => {
                let before = self.full_before.trim_end_matches('\n');
                let after = self.full_after.trim_end_matches('\n');
                match (before.is_empty(), after.is_empty()) {
                    (false, false) => format!("{before}\n{after}"),
                    (false, true) => before.to_string(),
                    _ => after.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FileChange {
        FileChange::new("src/lib.rs", "d".repeat(40), "b".repeat(80), "a".repeat(120))
    }

    #[test]
    fn new_file_starts_included_as_diff() {
        let file = sample();
        assert!(file.included);
        assert_eq!(file.mode, ContentMode::Diff);
        assert_eq!(file.tokens, 10);
    }

    #[test]
    fn mode_change_recomputes_tokens() {
        let mut file = sample();
        file.set_mode(ContentMode::FullBefore);
        assert_eq!(file.tokens, 20);
        file.set_mode(ContentMode::FullAfter);
        assert_eq!(file.tokens, 30);
        file.set_mode(ContentMode::FullBoth);
        assert_eq!(file.tokens, 50);
        file.set_mode(ContentMode::Diff);
        assert_eq!(file.tokens, 10);
    }

    #[test]
    fn content_mode_display_parse() {
        for mode in [
            ContentMode::Diff,
            ContentMode::FullBefore,
            ContentMode::FullAfter,
            ContentMode::FullBoth,
        ] {
            assert_eq!(ContentMode::from_str(&mode.to_string()).unwrap(), mode);
        }
        assert!(ContentMode::from_str("full").is_err());
    }

    #[test]
    fn file_version_parse_is_case_insensitive() {
        assert_eq!(FileVersion::from_str("BOTH").unwrap(), FileVersion::Both);
        assert_eq!(
            ContentMode::from(FileVersion::Before),
            ContentMode::FullBefore
        );
    }

    #[test]
    fn full_both_content_joins_versions() {
        let mut file = FileChange::new("a.txt", "", "old\n", "new\n");
        file.set_mode(ContentMode::FullBoth);
        assert_eq!(file.selected_content(), "old\nnew");
    }
}
