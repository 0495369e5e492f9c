use crate::commands::Ctx;
use crate::domain::{GitContextItem, GitHistoryConfig};
use anyhow::Result;
use clap::{Args, Subcommand};

#[derive(Subcommand, Debug)]
pub enum ContextCommand {
    /// Add a repository file (read from the source branch) or a note
    Add {
        /// File path relative to the repository root
        #[arg(required_unless_present = "note", conflicts_with = "note")]
        path: Option<String>,

        #[arg(long)]
        note: Option<String>,
    },

    /// List context items
    List,

    /// Remove a context item by index
    Remove { index: usize },

    /// Git-derived context
    #[command(subcommand)]
    Git(GitCommand),
}

#[derive(Subcommand, Debug)]
pub enum GitCommand {
    /// Commit history between the target and source branch
    #[command(subcommand)]
    History(HistoryCommand),

    /// Add a git reference as context
    #[command(subcommand)]
    Add(GitAddCommand),

    /// List git context items
    List,

    /// Remove a git context item by index
    Remove { index: usize },

    /// Remove all git context items
    Clear,
}

#[derive(Subcommand, Debug)]
pub enum HistoryCommand {
    /// Print the effective history settings
    Show,
    Enable,
    Disable,
    /// Change history settings
    Set(HistorySettings),
}

#[derive(Args, Debug, Default)]
pub struct HistorySettings {
    #[arg(long)]
    pub max_commits: Option<usize>,
    #[arg(long)]
    pub include_merges: Option<bool>,
    #[arg(long)]
    pub first_parent: Option<bool>,
    #[arg(long)]
    pub include_numstat: Option<bool>,
}

impl HistorySettings {
    fn apply(&self, mut config: GitHistoryConfig) -> GitHistoryConfig {
        if let Some(max) = self.max_commits {
            config.max_commits = max;
        }
        if let Some(value) = self.include_merges {
            config.include_merges = value;
        }
        if let Some(value) = self.first_parent {
            config.first_parent = value;
        }
        if let Some(value) = self.include_numstat {
            config.include_numstat = value;
        }
        config
    }
}

#[derive(Subcommand, Debug)]
pub enum GitAddCommand {
    /// Commit metadata and stats
    Commit {
        #[arg(value_name = "REF")]
        reference: String,
    },
    /// A commit's patch, optionally limited to some paths
    CommitPatch {
        #[arg(value_name = "REF")]
        reference: String,
        #[arg(long = "path")]
        paths: Vec<String>,
    },
    /// A file as it exists at a reference
    FileAt {
        #[arg(value_name = "REF")]
        reference: String,
        path: String,
    },
    /// A file's diff between two references
    FileDiff {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        path: String,
    },
}

impl From<GitAddCommand> for GitContextItem {
    fn from(cmd: GitAddCommand) -> Self {
        match cmd {
            GitAddCommand::Commit { reference } => GitContextItem::Commit { reference },
            GitAddCommand::CommitPatch { reference, paths } => {
                GitContextItem::CommitPatch { reference, paths }
            }
            GitAddCommand::FileAt { reference, path } => {
                GitContextItem::FileAtRef { reference, path }
            }
            GitAddCommand::FileDiff { from, to, path } => {
                GitContextItem::FileDiff { from, to, path }
            }
        }
    }
}

pub fn run(ctx: &Ctx, cmd: ContextCommand) -> Result<()> {
    match cmd {
        ContextCommand::Add { path, note } => {
            let mut controller = ctx.open()?;
            match (note, path) {
                (Some(note), _) => {
                    controller.add_context_note(&note)?;
                    println!("added note");
                }
                (None, Some(path)) => {
                    controller.add_context_file(&path)?;
                    println!("added {path}");
                }
                (None, None) => anyhow::bail!("give a path or --note"),
            }
            ctx.save(&controller)?;
        }
        ContextCommand::List => {
            let controller = ctx.open()?;
            let items = &controller.data().additional_context;
            if items.is_empty() {
                println!("no context items");
            }
            for (index, item) in items.iter().enumerate() {
                println!("{index}: [{}] {} (~{} tokens)", item.kind, item.label(), item.tokens);
            }
        }
        ContextCommand::Remove { index } => {
            let mut controller = ctx.open()?;
            let removed = controller.remove_context_item(index)?;
            println!("removed {}", removed.label());
            ctx.save(&controller)?;
        }
        ContextCommand::Git(cmd) => run_git(ctx, cmd)?,
    }
    Ok(())
}

fn run_git(ctx: &Ctx, cmd: GitCommand) -> Result<()> {
    let mut controller = ctx.open()?;
    match cmd {
        GitCommand::History(HistoryCommand::Show) => {
            let data = controller.data();
            let config = data.effective_git_history();
            let origin = if data.git_history.is_some() { "session" } else { "defaults" };
            println!("range: {}..{}", data.target_branch, data.source_branch);
            println!("source: {origin}");
            println!("enabled: {}", config.enabled);
            println!("max_commits: {}", config.max_commits);
            println!("include_merges: {}", config.include_merges);
            println!("first_parent: {}", config.first_parent);
            println!("include_numstat: {}", config.include_numstat);
            return Ok(());
        }
        GitCommand::History(HistoryCommand::Enable) => {
            let config = controller.data().effective_git_history();
            controller.set_git_history(GitHistoryConfig {
                enabled: true,
                ..config
            });
            println!("git history enabled");
        }
        GitCommand::History(HistoryCommand::Disable) => {
            let config = controller.data().effective_git_history();
            controller.set_git_history(GitHistoryConfig {
                enabled: false,
                ..config
            });
            println!("git history disabled");
        }
        GitCommand::History(HistoryCommand::Set(settings)) => {
            let config = settings.apply(controller.data().effective_git_history());
            controller.set_git_history(config);
            println!("git history updated");
        }
        GitCommand::Add(cmd) => {
            let item = GitContextItem::from(cmd);
            println!("added {item}");
            controller.add_git_context(item);
        }
        GitCommand::List => {
            let items = &controller.data().git_context;
            if items.is_empty() {
                println!("no git context items");
            }
            for (index, item) in items.iter().enumerate() {
                println!("{index}: {item}");
            }
            return Ok(());
        }
        GitCommand::Remove { index } => {
            let removed = controller.remove_git_context(index)?;
            println!("removed {removed}");
        }
        GitCommand::Clear => {
            controller.clear_git_context();
            println!("cleared git context");
        }
    }
    ctx.save(&controller)?;
    Ok(())
}
