//! `git` command-line adapter for [`RepositoryReader`].

use crate::domain::{FileChange, GitHistoryConfig};
use crate::infra::repository::{CommitHeader, NumstatEntry, RepositoryReader, parse_numstat};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

const FIELD_SEP: char = '\u{1f}';

/// Walks up from `path` until a directory containing `.git` is found.
pub fn get_git_root(path: &Path) -> Option<PathBuf> {
    let mut current = Some(path);

    while let Some(p) = current {
        if p.join(".git").exists() {
            return Some(p.to_path_buf());
        }
        current = p.parent();
    }

    None
}

#[derive(Debug, Clone)]
pub struct GitCli {
    repo_root: PathBuf,
    git: PathBuf,
}

impl GitCli {
    /// Opens the repository containing `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let path = path
            .canonicalize()
            .with_context(|| format!("repository path {} does not exist", path.display()))?;
        let repo_root = get_git_root(&path)
            .with_context(|| format!("{} is not inside a git repository", path.display()))?;
        let git = which::which("git").context("git executable not found in PATH")?;
        log::debug!("using git at {} for {}", git.display(), repo_root.display());
        Ok(Self { repo_root, git })
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    fn output(&self, args: &[&str]) -> Result<std::process::Output> {
        Command::new(&self.git)
            .args(args)
            .current_dir(&self.repo_root)
            .output()
            .with_context(|| format!("failed to run git {}", args.join(" ")))
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        let output = self.output(args)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("git {} failed: {}", args.join(" "), stderr.trim());
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Like [`GitCli::run`] but a failing command yields `None`.
    fn try_run(&self, args: &[&str]) -> Option<String> {
        let output = self.output(args).ok()?;
        output
            .status
            .success()
            .then(|| String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn branch_exists(&self, name: &str) -> bool {
        self.try_run(&["rev-parse", "--verify", "--quiet", &format!("refs/heads/{name}")])
            .is_some()
    }
}

impl RepositoryReader for GitCli {
    fn current_branch(&self) -> Result<String> {
        let branch = self.run(&["rev-parse", "--abbrev-ref", "HEAD"])?;
        Ok(branch.trim().to_string())
    }

    fn default_branch(&self) -> Result<String> {
        if let Some(head) = self.try_run(&["symbolic-ref", "refs/remotes/origin/HEAD"]) {
            let head = head.trim();
            if let Some(name) = head.strip_prefix("refs/remotes/origin/") {
                return Ok(name.to_string());
            }
        }
        for candidate in ["main", "master"] {
            if self.branch_exists(candidate) {
                return Ok(candidate.to_string());
            }
        }
        log::warn!("could not determine default branch, assuming main");
        Ok("main".to_string())
    }

    fn changed_files(&self, source: &str, target: &str) -> Result<Vec<FileChange>> {
        let range = format!("{target}...{source}");
        let numstat = self.run(&["diff", "--no-renames", "--numstat", &range])?;

        let mut files = Vec::new();
        for entry in parse_numstat(&numstat) {
            let diff = self.run(&["diff", "--no-renames", &range, "--", &entry.path])?;
            // Added files have no "before", deleted files no "after".
            let before = self
                .try_run(&["show", &format!("{target}:{}", entry.path)])
                .unwrap_or_default();
            let after = self
                .try_run(&["show", &format!("{source}:{}", entry.path)])
                .unwrap_or_default();
            files.push(
                FileChange::new(entry.path, diff, before, after)
                    .with_stats(entry.additions, entry.deletions),
            );
        }
        log::debug!("{} files changed between {target} and {source}", files.len());
        Ok(files)
    }

    fn file_content_at(&self, reference: &str, path: &str) -> Result<String> {
        self.run(&["show", &format!("{reference}:{path}")])
    }

    fn commit_log(&self, source: &str, target: &str, config: &GitHistoryConfig) -> Result<String> {
        let max = format!("-n{}", config.max_commits);
        let range = format!("{target}..{source}");
        let mut args = vec!["log", "--date=short", "--format=%h %ad %an: %s", max.as_str()];
        if config.first_parent {
            args.push("--first-parent");
        }
        if !config.include_merges {
            args.push("--no-merges");
        }
        if config.include_numstat {
            args.push("--numstat");
        }
        args.push(&range);
        self.run(&args)
    }

    fn commit_header(&self, reference: &str) -> Result<CommitHeader> {
        let format = format!("--format=%H{FIELD_SEP}%an{FIELD_SEP}%aI{FIELD_SEP}%s");
        let out = self.run(&["show", "-s", &format, reference])?;
        let mut fields = out.trim_end().splitn(4, FIELD_SEP);
        let mut next = || fields.next().unwrap_or_default().to_string();
        let header = CommitHeader {
            sha: next(),
            author: next(),
            date: next(),
            subject: next(),
        };
        if header.sha.is_empty() {
            anyhow::bail!("could not resolve commit {reference}");
        }
        Ok(header)
    }

    fn commit_numstat(&self, reference: &str) -> Result<Vec<NumstatEntry>> {
        let out = self.run(&["show", "--format=", "--numstat", "--no-renames", reference])?;
        Ok(parse_numstat(&out))
    }

    fn commit_patch(&self, reference: &str, paths: &[String]) -> Result<String> {
        let mut args = vec!["show", "--format=", "--patch", "--no-color", reference];
        if !paths.is_empty() {
            args.push("--");
            args.extend(paths.iter().map(String::as_str));
        }
        self.run(&args)
    }

    fn file_diff(&self, from: &str, to: &str, path: &str) -> Result<String> {
        self.run(&["diff", "--no-color", from, to, "--", path])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn git(dir: &Path, args: &[&str]) -> bool {
        Command::new("git")
            .args(args)
            .current_dir(dir)
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    /// Creates a repo with `main` and a `feature` branch that edits one file
    /// and adds another. Returns `None` when git is unavailable.
    fn fixture(dir: &Path) -> Option<()> {
        let steps: &[&[&str]] = &[
            &["init", "-q", "-b", "main"],
            &["config", "user.email", "dev@example.com"],
            &["config", "user.name", "Dev"],
            &["config", "commit.gpgsign", "false"],
        ];
        for step in steps {
            if !git(dir, step) {
                return None;
            }
        }
        std::fs::write(dir.join("a.go"), "package a\n").ok()?;
        git(dir, &["add", "."]).then_some(())?;
        git(dir, &["commit", "-q", "-m", "initial"]).then_some(())?;
        git(dir, &["checkout", "-q", "-b", "feature"]).then_some(())?;
        std::fs::write(dir.join("a.go"), "package a\n\nfunc A() {}\n").ok()?;
        std::fs::write(dir.join("b_test.go"), "package a\n").ok()?;
        git(dir, &["add", "."]).then_some(())?;
        git(dir, &["commit", "-q", "-m", "add A"]).then_some(())
    }

    #[test]
    fn test_get_git_root_walks_up() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        std::fs::create_dir_all(dir.path().join("src/nested")).unwrap();
        let root = get_git_root(&dir.path().join("src/nested")).unwrap();
        assert_eq!(root, dir.path());
    }

    #[test]
    fn test_open_rejects_missing_path() {
        let dir = tempdir().unwrap();
        assert!(GitCli::open(&dir.path().join("missing")).is_err());
    }

    #[test]
    fn test_reads_branches_and_changes() {
        let dir = tempdir().unwrap();
        if fixture(dir.path()).is_none() {
            return; // Skip if git is not installed or failed
        }
        let repo = GitCli::open(dir.path()).unwrap();

        assert_eq!(repo.current_branch().unwrap(), "feature");
        assert_eq!(repo.default_branch().unwrap(), "main");

        let files = repo.changed_files("feature", "main").unwrap();
        let paths: Vec<_> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["a.go", "b_test.go"]);

        let a = &files[0];
        assert_eq!(a.full_before, "package a\n");
        assert!(a.full_after.contains("func A()"));
        assert!(a.diff.contains("+func A() {}"));
        assert_eq!(a.additions, 2);
        assert!(a.included);

        let b = &files[1];
        assert!(b.full_before.is_empty());
    }

    #[test]
    fn test_reads_commit_details() {
        let dir = tempdir().unwrap();
        if fixture(dir.path()).is_none() {
            return;
        }
        let repo = GitCli::open(dir.path()).unwrap();

        let header = repo.commit_header("HEAD").unwrap();
        assert_eq!(header.subject, "add A");
        assert_eq!(header.author, "Dev");

        let stats = repo.commit_numstat("HEAD").unwrap();
        assert_eq!(stats.len(), 2);

        let patch = repo.commit_patch("HEAD", &["a.go".to_string()]).unwrap();
        assert!(patch.contains("a.go"));
        assert!(!patch.contains("b_test.go"));

        let log = repo
            .commit_log("feature", "main", &GitHistoryConfig::default())
            .unwrap();
        assert_eq!(log.lines().count(), 1);
        assert!(log.contains("add A"));

        assert_eq!(
            repo.file_content_at("main", "a.go").unwrap(),
            "package a\n"
        );
        assert!(repo.file_diff("main", "feature", "a.go").unwrap().contains("+func A"));
    }
}
