//! The repository seam.
//!
//! Everything pr-builder knows about the working copy comes through
//! [`RepositoryReader`]. Production code shells out to `git`; tests provide an
//! in-memory implementation.

use crate::domain::{FileChange, GitHistoryConfig};
use anyhow::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitHeader {
    pub sha: String,
    pub author: String,
    pub date: String,
    pub subject: String,
}

impl CommitHeader {
    pub fn short_sha(&self) -> &str {
        self.sha.get(..7).unwrap_or(&self.sha)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumstatEntry {
    pub path: String,
    pub additions: usize,
    pub deletions: usize,
}

pub trait RepositoryReader: Send + Sync {
    fn current_branch(&self) -> Result<String>;

    fn default_branch(&self) -> Result<String>;

    /// Files changed on `source` relative to its merge base with `target`,
    /// each populated with its diff, both full versions and line stats.
    fn changed_files(&self, source: &str, target: &str) -> Result<Vec<FileChange>>;

    fn file_content_at(&self, reference: &str, path: &str) -> Result<String>;

    /// One line per commit reachable from `source` but not from `target`.
    fn commit_log(&self, source: &str, target: &str, config: &GitHistoryConfig) -> Result<String> {
        let _ = (source, target, config);
        anyhow::bail!("commit history is not available from this repository")
    }

    fn commit_header(&self, reference: &str) -> Result<CommitHeader> {
        anyhow::bail!("cannot read commit {reference} from this repository")
    }

    fn commit_numstat(&self, reference: &str) -> Result<Vec<NumstatEntry>> {
        anyhow::bail!("cannot read stats for commit {reference} from this repository")
    }

    fn commit_patch(&self, reference: &str, paths: &[String]) -> Result<String> {
        let _ = paths;
        anyhow::bail!("cannot read patch for commit {reference} from this repository")
    }

    fn file_diff(&self, from: &str, to: &str, path: &str) -> Result<String> {
        anyhow::bail!("cannot diff {path} between {from} and {to} in this repository")
    }
}

/// Parses `git diff --numstat` style output. Binary files (`-`) count as zero.
pub fn parse_numstat(output: &str) -> Vec<NumstatEntry> {
    output
        .lines()
        .filter_map(|line| {
            let mut parts = line.splitn(3, '\t');
            let additions = parts.next()?.trim();
            let deletions = parts.next()?.trim();
            let path = parts.next()?.trim();
            if path.is_empty() {
                return None;
            }
            Some(NumstatEntry {
                path: path.to_string(),
                additions: additions.parse().unwrap_or(0),
                deletions: deletions.parse().unwrap_or(0),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numstat_lines() {
        let out = "3\t1\tsrc/main.rs\n-\t-\tassets/logo.png\n\n10\t0\tdocs/with space.md\n";
        let entries = parse_numstat(out);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].path, "src/main.rs");
        assert_eq!((entries[0].additions, entries[0].deletions), (3, 1));
        assert_eq!((entries[1].additions, entries[1].deletions), (0, 0));
        assert_eq!(entries[2].path, "docs/with space.md");
    }

    #[test]
    fn short_sha_handles_short_input() {
        let header = CommitHeader {
            sha: "abc".to_string(),
            author: String::new(),
            date: String::new(),
            subject: String::new(),
        };
        assert_eq!(header.short_sha(), "abc");
    }
}
