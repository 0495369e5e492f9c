//! Command surface.
//!
//! Each subcommand builds a [`Controller`] for the repository, overlays the
//! saved session when there is one, applies its change and saves again.
//! Read-only commands skip the final save.

pub mod context;
pub mod file;
pub mod filter;
pub mod generate;
pub mod prompt;
pub mod session;

use crate::application::{Controller, default_session_path};
use crate::domain::DomainError;
use crate::infra::git::GitCli;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pr-builder")]
#[command(version)]
#[command(about = "Curate the context for an AI-written pull request description", long_about = None)]
pub struct Cli {
    /// Repository to work in
    #[arg(long, global = true, default_value = ".")]
    pub repo: PathBuf,

    /// Branch to compare against (defaults to the repository's default branch)
    #[arg(long, global = true)]
    pub target: Option<String>,

    /// Session file (defaults to <repo>/.pr-builder/session.yaml)
    #[arg(long, global = true)]
    pub session: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create, inspect and persist the session
    #[command(subcommand)]
    Session(session::SessionCommand),

    /// Choose which changed files are sent and how
    #[command(subcommand)]
    File(file::FileCommand),

    /// Hide files with include/exclude glob filters
    #[command(subcommand)]
    Filter(filter::FilterCommand),

    /// Attach notes, files and git history
    #[command(subcommand)]
    Context(context::ContextCommand),

    /// Select the prompt used for generation
    #[command(subcommand)]
    Prompt(prompt::PromptCommand),

    /// Generate the pull request description
    Generate(generate::GenerateArgs),
}

/// Per-invocation settings shared by every subcommand.
#[derive(Debug, Clone)]
pub struct Ctx {
    pub repo: PathBuf,
    pub target: Option<String>,
    pub session: Option<PathBuf>,
}

impl Ctx {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            repo: cli.repo.clone(),
            target: cli.target.clone(),
            session: cli.session.clone(),
        }
    }

    fn controller(&self) -> Result<Controller> {
        let git = GitCli::open(&self.repo)?;
        let root = git.repo_root().to_path_buf();
        let mut controller = Controller::new(root, Box::new(git));
        controller.initialize(self.target.as_deref())?;
        Ok(controller)
    }

    pub fn session_path(&self, controller: &Controller) -> PathBuf {
        self.session
            .clone()
            .unwrap_or_else(|| default_session_path(controller.repo_path()))
    }

    /// A controller with no saved state applied beyond the repo defaults.
    pub fn fresh(&self) -> Result<Controller> {
        let mut controller = self.controller()?;
        let applied = controller.apply_default_filter_presets()?;
        if applied > 0 {
            log::info!("applied {applied} default filter presets");
        }
        Ok(controller)
    }

    /// A controller with the saved session overlaid, or a fresh one when
    /// nothing has been saved yet.
    pub fn open(&self) -> Result<Controller> {
        let mut controller = self.controller()?;
        let path = self.session_path(&controller);
        match controller.load_session_if_present(&path)? {
            Some(report) => {
                for path in &report.pruned {
                    log::debug!("dropped stale session entry {path}");
                }
            }
            None => {
                controller.apply_default_filter_presets()?;
            }
        }
        Ok(controller)
    }

    pub fn save(&self, controller: &Controller) -> Result<PathBuf> {
        let path = self.session_path(controller);
        controller
            .save_session(&path)
            .with_context(|| format!("saving session to {}", path.display()))?;
        Ok(path)
    }
}

/// `?` on a [`DomainError`] inside an `anyhow` function keeps the typed error
/// reachable through `downcast_ref`.
pub fn is_user_error(err: &anyhow::Error) -> bool {
    err.downcast_ref::<DomainError>()
        .is_some_and(DomainError::is_user_error)
}

pub async fn run(cli: Cli) -> Result<()> {
    let ctx = Ctx::from_cli(&cli);
    match cli.command {
        Commands::Session(cmd) => session::run(&ctx, cmd),
        Commands::File(cmd) => file::run(&ctx, cmd),
        Commands::Filter(cmd) => filter::run(&ctx, cmd),
        Commands::Context(cmd) => context::run(&ctx, cmd),
        Commands::Prompt(cmd) => prompt::run(&ctx, cmd),
        Commands::Generate(args) => generate::run(&ctx, args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_work_after_subcommands() {
        let cli = Cli::try_parse_from([
            "pr-builder",
            "file",
            "toggle",
            "a.go",
            "--repo",
            "/tmp/x",
            "--target",
            "develop",
        ])
        .unwrap();
        assert_eq!(cli.repo, PathBuf::from("/tmp/x"));
        assert_eq!(cli.target.as_deref(), Some("develop"));
    }

    #[test]
    fn user_errors_are_recognised_through_anyhow() {
        let err: anyhow::Error =
            DomainError::from(crate::domain::ValidationError::NoFilesIncluded).into();
        assert!(is_user_error(&err));
        let err = anyhow::anyhow!("git exploded");
        assert!(!is_user_error(&err));
    }
}
