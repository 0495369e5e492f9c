use crate::commands::Ctx;
use crate::domain::FileVersion;
use anyhow::Result;
use clap::Subcommand;

#[derive(Subcommand, Debug)]
pub enum FileCommand {
    /// Include or exclude a file from generation
    Toggle { path: String },

    /// Send the full file instead of its diff
    Full {
        path: String,
        /// before, after or both
        #[arg(long, default_value = "after")]
        version: FileVersion,
    },

    /// Go back to sending the diff
    Diff { path: String },

    /// Include every visible file
    IncludeAll,

    /// Exclude every visible file
    ExcludeAll,
}

pub fn run(ctx: &Ctx, cmd: FileCommand) -> Result<()> {
    let mut controller = ctx.open()?;
    match cmd {
        FileCommand::Toggle { path } => {
            let included = controller.toggle_file_inclusion(&path)?;
            let state = if included { "included" } else { "excluded" };
            println!("{path}: {state}");
        }
        FileCommand::Full { path, version } => {
            controller.set_full_file(&path, version)?;
            let tokens = controller.data().file(&path)?.tokens;
            println!("{path}: full file ({version}), ~{tokens} tokens");
        }
        FileCommand::Diff { path } => {
            controller.restore_to_diff(&path)?;
            let tokens = controller.data().file(&path)?.tokens;
            println!("{path}: diff, ~{tokens} tokens");
        }
        FileCommand::IncludeAll => {
            let count = controller.set_all_visible_included(true);
            println!("included {count} files");
        }
        FileCommand::ExcludeAll => {
            let count = controller.set_all_visible_included(false);
            println!("excluded {count} files");
        }
    }
    ctx.save(&controller)?;
    Ok(())
}
