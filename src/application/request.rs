//! Generation requests and prompt compilation.
//!
//! A [`GenerationRequest`] is a snapshot of exactly what will be sent: the
//! included-and-visible files, the user context plus any materialized git
//! context, and the selected prompt. [`GenerationRequest::compile`] turns it
//! into the system/user pair an agent receives.

use crate::application::git_context::{escape_attr, escape_text};
use crate::domain::{ContentMode, ContextItem, ContextKind, FileChange};
use crate::infra::generation::GenerationPayload;
use crate::prompts;
use anyhow::Result;
use serde::Serialize;
use serde_json::{Value, json};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub source_branch: String,
    pub target_branch: String,
    pub title: String,
    pub description: String,
    pub files: Vec<FileChange>,
    pub additional_context: Vec<ContextItem>,
    pub prompt: String,
}

/// One named chunk of file content. Files shown as `full_both` yield two.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileSection {
    pub path: String,
    pub mode: String,
    pub fence: String,
    pub content: String,
}

fn fence_for(path: &str, mode: ContentMode) -> String {
    if mode == ContentMode::Diff {
        return "diff".to_string();
    }
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("text")
        .to_string()
}

pub fn file_sections(file: &FileChange) -> Vec<FileSection> {
    let section = |path: String, mode: ContentMode, content: &str| FileSection {
        fence: fence_for(&file.path, mode),
        path,
        mode: mode.to_string(),
        content: content.trim_end_matches('\n').to_string(),
    };

    match file.mode {
        ContentMode::FullBoth => {
            let mut sections = Vec::new();
            if !file.full_before.trim().is_empty() {
                sections.push(section(
                    format!("{}:before", file.path),
                    ContentMode::FullBefore,
                    &file.full_before,
                ));
            }
            if !file.full_after.trim().is_empty() {
                sections.push(section(
                    format!("{}:after", file.path),
                    ContentMode::FullAfter,
                    &file.full_after,
                ));
            }
            sections
        }
        mode => vec![section(file.path.clone(), mode, &file.selected_content())],
    }
}

impl GenerationRequest {
    pub fn total_tokens(&self) -> usize {
        let files: usize = self.files.iter().map(|f| f.tokens).sum();
        let context: usize = self.additional_context.iter().map(|c| c.tokens).sum();
        files + context
    }

    /// Variables available to user prompt templates.
    pub fn template_vars(&self) -> Value {
        let mut diff_parts = Vec::new();
        let mut code = Vec::new();
        for file in &self.files {
            if file.mode == ContentMode::Diff {
                if !file.diff.trim().is_empty() {
                    diff_parts.push(format!(
                        "<file name=\"{}\" type=\"diff\">\n<diff>\n{}\n</diff>\n</file>",
                        escape_attr(&file.path),
                        file.diff.trim_end_matches('\n')
                    ));
                }
            } else {
                code.extend(
                    file_sections(file)
                        .into_iter()
                        .filter(|s| !s.content.trim().is_empty())
                        .map(|s| json!({"path": s.path, "content": s.content})),
                );
            }
        }

        let mut context = Vec::new();
        let mut notes = Vec::new();
        let mut commits = Vec::new();
        for item in &self.additional_context {
            if item.content.trim().is_empty() {
                continue;
            }
            match item.kind {
                ContextKind::File => context.push(json!({
                    "path": item.path.clone().unwrap_or_default(),
                    "content": item.content.trim_end_matches('\n'),
                })),
                ContextKind::Note => notes.push(item.content.trim().to_string()),
                ContextKind::GitHistory => commits.push(item.content.trim_end_matches('\n').to_string()),
            }
        }

        json!({
            "source_branch": self.source_branch,
            "target_branch": self.target_branch,
            "title": self.title,
            "description": self.description,
            "diff": diff_parts.join("\n\n"),
            "code": code,
            "context": context,
            "notes": notes.join("\n"),
            "commits": commits.join("\n\n"),
        })
    }

    fn user_context_vars(&self) -> Value {
        let files: Vec<FileSection> = self.files.iter().flat_map(file_sections).collect();
        let commits: Vec<&str> = self
            .additional_context
            .iter()
            .filter(|c| c.kind == ContextKind::GitHistory)
            .map(|c| c.content.trim_end_matches('\n'))
            .collect();
        let context: Vec<Value> = self
            .additional_context
            .iter()
            .filter(|c| c.kind != ContextKind::GitHistory)
            .map(|c| {
                json!({
                    "is_note": c.kind == ContextKind::Note,
                    "label": c.label(),
                    "content": c.content.trim_end_matches('\n'),
                })
            })
            .collect();

        json!({
            "source_branch": self.source_branch,
            "target_branch": self.target_branch,
            "title": self.title,
            "description": self.description.trim(),
            "file_count": self.files.len(),
            "files": files,
            "commits": commits.join("\n\n"),
            "context_count": context.len(),
            "context": context,
        })
    }

    /// Renders the system prompt (when it is a template) and the markdown
    /// context that forms the user message.
    pub fn compile(&self) -> Result<GenerationPayload> {
        let system = if prompts::is_template(&self.prompt) {
            prompts::render_user_template(&self.prompt, &self.template_vars())?
        } else {
            self.prompt.clone()
        };
        let user = prompts::render("context", &self.user_context_vars())?;
        Ok(GenerationPayload { system, user })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Separator {
    #[default]
    Xml,
    Markdown,
    Simple,
    BeginEnd,
    Default,
}

impl fmt::Display for Separator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Separator::Xml => "xml",
            Separator::Markdown => "markdown",
            Separator::Simple => "simple",
            Separator::BeginEnd => "begin-end",
            Separator::Default => "default",
        };
        write!(f, "{value}")
    }
}

impl FromStr for Separator {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input {
            "xml" => Ok(Separator::Xml),
            "markdown" => Ok(Separator::Markdown),
            "simple" => Ok(Separator::Simple),
            "begin-end" => Ok(Separator::BeginEnd),
            "default" => Ok(Separator::Default),
            other => Err(format!("invalid separator: {other}")),
        }
    }
}

fn cdata(text: &str) -> String {
    text.replace("]]>", "]]]]><![CDATA[>")
}

/// The compiled payload as one text document, for copying into another tool.
pub fn export_payload(
    request: &GenerationRequest,
    payload: &GenerationPayload,
    separator: Separator,
) -> String {
    let system = payload.system.trim_end_matches('\n');
    let user = payload.user.trim_end_matches('\n');

    match separator {
        Separator::Xml => format!(
            "<pr-builder>\n<branches>\n<source>{}</source>\n<target>{}</target>\n</branches>\n\
             <llm_payload>\n<system><![CDATA[{}]]></system>\n<user><![CDATA[{}]]></user>\n\
             </llm_payload>\n</pr-builder>\n",
            escape_text(&request.source_branch),
            escape_text(&request.target_branch),
            cdata(&payload.system),
            cdata(&payload.user),
        ),
        Separator::Markdown => format!(
            "# LLM payload\n\n## System\n\n```text\n{system}\n```\n\n## User\n\n```text\n{user}\n```\n"
        ),
        Separator::Simple => format!(
            "--- START SYSTEM PROMPT ---\n{system}\n--- END SYSTEM PROMPT ---\n\n\
             --- START USER PROMPT ---\n{user}\n--- END USER PROMPT ---\n"
        ),
        Separator::BeginEnd => format!(
            "--- BEGIN SYSTEM PROMPT ---\n{system}\n--- END SYSTEM PROMPT ---\n\n\
             --- BEGIN USER PROMPT ---\n{user}\n--- END USER PROMPT ---\n"
        ),
        Separator::Default => format!("System:\n{system}\n\nUser:\n{user}\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FileVersion;

    fn request() -> GenerationRequest {
        let mut full = FileChange::new("src/lib.rs", "-old\n+new\n", "fn old() {}\n", "fn new() {}\n");
        full.set_mode(ContentMode::from(FileVersion::Both));
        GenerationRequest {
            source_branch: "feature".to_string(),
            target_branch: "main".to_string(),
            title: "Add A".to_string(),
            description: String::new(),
            files: vec![FileChange::new("a.go", "+func A() {}\n", "", "func A() {}\n"), full],
            additional_context: vec![
                ContextItem::note("Fixes ABC-1"),
                ContextItem::file("docs/design.md", "# Design\n"),
                ContextItem::git_history("<git_history>abc add A</git_history>\n"),
            ],
            prompt: prompts::DEFAULT_PROMPT.to_string(),
        }
    }

    #[test]
    fn template_vars_split_files_and_context() {
        let vars = request().template_vars();
        assert_eq!(
            vars["diff"],
            "<file name=\"a.go\" type=\"diff\">\n<diff>\n+func A() {}\n</diff>\n</file>"
        );
        let code = vars["code"].as_array().unwrap();
        assert_eq!(code.len(), 2);
        assert_eq!(code[0]["path"], "src/lib.rs:before");
        assert_eq!(code[1]["content"], "fn new() {}");
        assert_eq!(vars["notes"], "Fixes ABC-1");
        assert_eq!(vars["context"][0]["path"], "docs/design.md");
        assert_eq!(vars["commits"], "<git_history>abc add A</git_history>");
    }

    #[test]
    fn plain_prompt_is_used_verbatim() {
        let payload = request().compile().unwrap();
        assert_eq!(payload.system, prompts::DEFAULT_PROMPT);
        assert!(payload.user.contains("- Source branch: feature"));
        assert!(payload.user.contains("## Included files (2)"));
        assert!(payload.user.contains("### a.go (diff)"));
        assert!(payload.user.contains("```diff\n+func A() {}\n```"));
        assert!(payload.user.contains("### src/lib.rs:after (full_after)"));
        assert!(payload.user.contains("- Fixes ABC-1"));
        assert!(payload.user.contains("### docs/design.md"));
        assert!(payload.user.contains("## Git history"));
    }

    #[test]
    fn template_prompt_is_rendered() {
        let mut req = request();
        req.prompt = "Describe {{title}} for {{target_branch}}.\n{{notes}}".to_string();
        let payload = req.compile().unwrap();
        assert_eq!(payload.system, "Describe Add A for main.\nFixes ABC-1");
    }

    #[test]
    fn export_separators() {
        let req = request();
        let payload = GenerationPayload {
            system: "sys ]]> end".to_string(),
            user: "usr\n".to_string(),
        };
        let xml = export_payload(&req, &payload, Separator::Xml);
        assert!(xml.starts_with("<pr-builder>\n<branches>\n<source>feature</source>"));
        assert!(xml.contains("<system><![CDATA[sys ]]]]><![CDATA[> end]]></system>"));

        let simple = export_payload(&req, &payload, Separator::Simple);
        assert!(simple.contains("--- START USER PROMPT ---\nusr\n--- END USER PROMPT ---"));
        let plain = export_payload(&req, &payload, Separator::Default);
        assert_eq!(plain, "System:\nsys ]]> end\n\nUser:\nusr\n");

        assert_eq!("begin-end".parse::<Separator>().unwrap(), Separator::BeginEnd);
        assert!("yaml".parse::<Separator>().is_err());
    }

    #[test]
    fn total_tokens_sums_files_and_context() {
        let req = request();
        let expected: usize = req.files.iter().map(|f| f.tokens).sum::<usize>()
            + req.additional_context.iter().map(|c| c.tokens).sum::<usize>();
        assert_eq!(req.total_tokens(), expected);
    }
}
