use crate::commands::Ctx;
use crate::domain::{PrData, tokens};
use anyhow::Result;
use clap::Subcommand;
use serde_json::json;
use std::path::PathBuf;

#[derive(Subcommand, Debug)]
pub enum SessionCommand {
    /// Start over from the live diff and the repository defaults
    Init {
        /// Write the new session to disk
        #[arg(long)]
        save: bool,
    },

    /// Load a session file and save it as the current session
    Load {
        /// Session file to load (defaults to the current session path)
        path: Option<PathBuf>,
    },

    /// Save the current session, optionally to another file
    Save { path: Option<PathBuf> },

    /// Print the current session
    Show {
        #[arg(long)]
        json: bool,
    },

    /// Set the pull request title or description
    Meta {
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },

    /// Estimate the token size of what would be sent
    TokenCount {
        /// List every file, including excluded and filtered ones
        #[arg(long)]
        all: bool,
    },
}

pub fn run(ctx: &Ctx, cmd: SessionCommand) -> Result<()> {
    match cmd {
        SessionCommand::Init { save } => {
            let controller = ctx.fresh()?;
            let data = controller.data();
            println!(
                "{} -> {}: {} changed files",
                data.source_branch,
                data.target_branch,
                data.changed_files.len()
            );
            if save {
                let path = ctx.save(&controller)?;
                println!("saved {}", path.display());
            }
        }
        SessionCommand::Load { path } => {
            let mut controller = ctx.fresh()?;
            let path = path.unwrap_or_else(|| ctx.session_path(&controller));
            let report = controller.load_session(&path)?;
            println!("loaded {}", path.display());
            if !report.pruned.is_empty() {
                println!("dropped {} files no longer in the diff", report.pruned.len());
            }
            let saved = ctx.save(&controller)?;
            if saved != path {
                println!("saved {}", saved.display());
            }
        }
        SessionCommand::Save { path } => {
            let controller = ctx.open()?;
            let path = match path {
                Some(path) => {
                    controller.save_session(&path)?;
                    path
                }
                None => ctx.save(&controller)?,
            };
            println!("saved {}", path.display());
        }
        SessionCommand::Show { json } => {
            let controller = ctx.open()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&show_json(controller.data()))?);
            } else {
                print_summary(controller.data());
            }
        }
        SessionCommand::Meta { title, description } => {
            let mut controller = ctx.open()?;
            if let Some(title) = title {
                controller.set_title(title);
            }
            if let Some(description) = description {
                controller.set_description(description);
            }
            let data = controller.data();
            println!("title: {}", data.title);
            if !data.description.is_empty() {
                println!("description: {}", data.description);
            }
            ctx.save(&controller)?;
        }
        SessionCommand::TokenCount { all } => {
            let controller = ctx.open()?;
            print_token_count(controller.data(), all);
        }
    }
    Ok(())
}

fn show_json(data: &PrData) -> serde_json::Value {
    let visible: Vec<&str> = data.visible_files().iter().map(|f| f.path.as_str()).collect();
    json!({
        "source_branch": data.source_branch,
        "target_branch": data.target_branch,
        "title": data.title,
        "description": data.description,
        "files": data.changed_files,
        "visible_files": visible,
        "filters": data.active_filters,
        "context": data.additional_context,
        "git_history": data.effective_git_history(),
        "git_context": data.git_context,
        "prompt": {
            "preset": data.current_preset.as_ref().map(|p| p.id.as_str()),
            "template": data.current_prompt,
        },
        "total_tokens": data.total_tokens(),
    })
}

fn print_summary(data: &PrData) {
    println!("{} -> {}", data.source_branch, data.target_branch);
    if !data.title.is_empty() {
        println!("title: {}", data.title);
    }

    let visible = data.visible_files();
    println!(
        "\nfiles ({} visible, {} filtered):",
        visible.len(),
        data.changed_files.len() - visible.len()
    );
    for file in visible {
        let mark = if file.included { "x" } else { " " };
        println!(
            "  [{mark}] {} (+{} -{}, {}, ~{} tokens)",
            file.path, file.additions, file.deletions, file.mode, file.tokens
        );
    }

    if !data.active_filters.is_empty() {
        println!("\nfilters:");
        for (index, filter) in data.active_filters.iter().enumerate() {
            println!("  {index}: {} ({} rules)", filter.name, filter.rules.len());
        }
    }
    if !data.additional_context.is_empty() {
        println!("\ncontext:");
        for (index, item) in data.additional_context.iter().enumerate() {
            println!("  {index}: [{}] {} (~{} tokens)", item.kind, item.label(), item.tokens);
        }
    }

    let prompt = match &data.current_preset {
        Some(preset) => format!("preset {}", preset.id),
        None => format!("custom (~{} tokens)", tokens::count(&data.current_prompt)),
    };
    println!("\nprompt: {prompt}");
    println!("total: ~{} tokens", data.total_tokens());
}

fn print_token_count(data: &PrData, all: bool) {
    let files: Vec<_> = if all {
        data.changed_files.iter().collect()
    } else {
        data.included_visible_files()
    };
    for file in files {
        let state = match (data.passes_filters(&file.path), file.included) {
            (false, _) => "filtered",
            (true, false) => "excluded",
            (true, true) => "included",
        };
        println!("{:>8}  {:<9} {}", file.tokens, state, file.path);
    }
    for item in &data.additional_context {
        println!("{:>8}  {:<9} {}", item.tokens, item.kind.to_string(), item.label());
    }
    let prompt = tokens::count(&data.current_prompt);
    println!("{prompt:>8}  prompt");
    println!("{:>8}  total", data.total_tokens() + prompt);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ContextItem, FileChange, Filter};

    #[test]
    fn json_view_lists_visible_files_and_preset() {
        let mut data = PrData::new(
            "feature",
            "main",
            vec![
                FileChange::new("a.go", "+a", "", "a"),
                FileChange::new("b_test.go", "+b", "", "b"),
            ],
        );
        data.add_filter(Filter::from_patterns("t", "", &["**/*test*".to_string()], &[]))
            .unwrap();
        data.add_context_item(ContextItem::note("hello"));

        let value = show_json(&data);
        assert_eq!(value["visible_files"], json!(["a.go"]));
        assert_eq!(value["prompt"]["preset"], "default");
        assert_eq!(value["files"][1]["path"], "b_test.go");
        assert_eq!(value["context"][0]["kind"], "note");
        assert!(value["files"][0].get("diff").is_none());
    }
}
