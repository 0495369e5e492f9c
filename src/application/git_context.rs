//! Turns reference-only git selections into context text.
//!
//! Each selection becomes a small XML-ish block so the agent can tell where
//! one piece of git output ends and the next begins. Large outputs are cut
//! down to [`MAX_BYTES`] / [`MAX_TOKENS`] with a visible marker.

use crate::domain::{ContextItem, ContextKind, GitContextItem, GitHistoryConfig, tokens};
use crate::infra::repository::RepositoryReader;
use anyhow::{Context, Result};
use std::fmt::Write as _;

pub const MAX_BYTES: usize = 120_000;
pub const MAX_TOKENS: usize = 2_000;

/// Cuts `text` to fit both caps (0 disables a cap) and appends a marker when
/// anything was dropped. Returns the text and whether it was truncated.
pub fn truncate_with_caps(text: &str, max_bytes: usize, max_tokens: usize) -> (String, bool) {
    let mut limit = text.len();
    if max_tokens > 0 && tokens::count(text) > max_tokens {
        limit = limit.min(max_tokens * 4);
    }
    if max_bytes > 0 {
        limit = limit.min(max_bytes);
    }
    if limit >= text.len() {
        return (text.to_string(), false);
    }
    while !text.is_char_boundary(limit) {
        limit -= 1;
    }
    let kept = text[..limit].trim_end_matches('\n');
    (
        format!("{kept}\n... [TRUNCATED: max_bytes={max_bytes} max_tokens={max_tokens}]\n"),
        true,
    )
}

fn capped(text: &str) -> String {
    truncate_with_caps(text, MAX_BYTES, MAX_TOKENS).0
}

pub fn escape_attr(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}

pub fn escape_text(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// The commit-log summary for the branch range, or `None` when disabled or
/// the range has no commits.
pub fn build_history(
    repo: &dyn RepositoryReader,
    source: &str,
    target: &str,
    config: &GitHistoryConfig,
) -> Result<Option<ContextItem>> {
    if !config.enabled || config.max_commits == 0 {
        return Ok(None);
    }
    let log = repo.commit_log(source, target, config)?;
    if log.trim().is_empty() {
        return Ok(None);
    }
    let body = capped(&log);
    let content = format!(
        "<git_history from=\"{}\" to=\"{}\">\n{}\n</git_history>\n",
        escape_attr(target),
        escape_attr(source),
        body.trim_end_matches('\n')
    );
    Ok(Some(ContextItem::git_history(content)))
}

/// Reads the repository for one selection and renders it as a context item.
pub fn materialize(
    repo: &dyn RepositoryReader,
    item: &GitContextItem,
    include_numstat: bool,
) -> Result<ContextItem> {
    let content = match item {
        GitContextItem::Commit { reference } => commit_block(repo, reference, include_numstat)?,
        GitContextItem::CommitPatch { reference, paths } => {
            let header = repo.commit_header(reference)?;
            let patch = repo
                .commit_patch(&header.sha, paths)
                .with_context(|| format!("failed to read patch for {reference}"))?;
            let mut out = format!(
                "<git_commit_patch ref=\"{}\" sha=\"{}\"",
                escape_attr(reference),
                escape_attr(header.short_sha())
            );
            if !paths.is_empty() {
                let _ = write!(out, " paths=\"{}\"", escape_attr(&paths.join(",")));
            }
            let _ = write!(
                out,
                ">\n<patch>\n{}\n</patch>\n</git_commit_patch>\n",
                capped(&patch).trim_end_matches('\n')
            );
            out
        }
        GitContextItem::FileAtRef { reference, path } => {
            let content = repo
                .file_content_at(reference, path)
                .with_context(|| format!("failed to read {path} at {reference}"))?;
            format!(
                "<git_file_at_ref ref=\"{}\" path=\"{}\">\n<content>\n{}\n</content>\n</git_file_at_ref>\n",
                escape_attr(reference),
                escape_attr(path),
                capped(&content).trim_end_matches('\n')
            )
        }
        GitContextItem::FileDiff { from, to, path } => {
            let diff = repo
                .file_diff(from, to, path)
                .with_context(|| format!("failed to diff {path}"))?;
            format!(
                "<git_file_diff from=\"{}\" to=\"{}\" path=\"{}\">\n<diff>\n{}\n</diff>\n</git_file_diff>\n",
                escape_attr(from),
                escape_attr(to),
                escape_attr(path),
                capped(&diff).trim_end_matches('\n')
            )
        }
    };

    let path = match item {
        GitContextItem::FileAtRef { path, .. } | GitContextItem::FileDiff { path, .. } => {
            Some(path.clone())
        }
        _ => None,
    };
    Ok(ContextItem::new(ContextKind::GitHistory, path, content))
}

fn commit_block(repo: &dyn RepositoryReader, reference: &str, include_numstat: bool) -> Result<String> {
    let header = repo.commit_header(reference)?;

    let mut out = format!(
        "<git_commit ref=\"{}\" sha=\"{}\">\n",
        escape_attr(reference),
        escape_attr(header.short_sha())
    );
    let _ = writeln!(out, "<subject>{}</subject>", escape_text(&header.subject));
    let _ = writeln!(out, "<author>{}</author>", escape_text(&header.author));
    let _ = writeln!(out, "<date>{}</date>", escape_text(&header.date));

    // Stats are best-effort; a commit without them is still useful context.
    let stats = repo.commit_numstat(&header.sha).unwrap_or_else(|err| {
        log::debug!("no numstat for {reference}: {err:#}");
        Vec::new()
    });
    let additions: usize = stats.iter().map(|s| s.additions).sum();
    let deletions: usize = stats.iter().map(|s| s.deletions).sum();
    let _ = writeln!(
        out,
        "<summary files=\"{}\" additions=\"{additions}\" deletions=\"{deletions}\"/>",
        stats.len()
    );

    if include_numstat && !stats.is_empty() {
        let mut lines = String::new();
        for stat in &stats {
            let _ = writeln!(
                lines,
                "<file path=\"{}\" additions=\"{}\" deletions=\"{}\"/>",
                escape_attr(&stat.path),
                stat.additions,
                stat.deletions
            );
        }
        let _ = writeln!(out, "<numstat>\n{}\n</numstat>", capped(&lines).trim_end_matches('\n'));
    }
    out.push_str("</git_commit>\n");
    Ok(out)
}
