use crate::commands::Ctx;
use crate::domain::PresetLocation;
use anyhow::{Context, Result};
use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand, Debug)]
pub enum PromptCommand {
    /// Use a custom prompt
    Set {
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        template: Option<String>,

        /// Read the prompt from a file
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Use a prompt preset by id
    Preset { id: String },

    /// List prompt presets
    List,

    /// Save the current prompt as a preset
    Save {
        #[arg(short, long)]
        name: String,

        #[arg(short, long, default_value = "")]
        description: String,

        /// Save to ~/.pr-builder instead of the repository
        #[arg(long)]
        global: bool,
    },

    /// Print the current prompt
    Show,
}

pub fn run(ctx: &Ctx, cmd: PromptCommand) -> Result<()> {
    let mut controller = ctx.open()?;
    match cmd {
        PromptCommand::Set { template, file } => {
            let text = match (template, file) {
                (Some(text), _) => text,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("reading prompt from {}", path.display()))?,
                (None, None) => anyhow::bail!("give --template or --file"),
            };
            controller.set_prompt(text);
            println!("prompt updated");
        }
        PromptCommand::Preset { id } => {
            controller.load_prompt_preset(&id)?;
            println!("using prompt preset {id}");
        }
        PromptCommand::List => {
            let current = controller.data().current_preset.as_ref().map(|p| p.id.clone());
            for preset in controller.list_prompt_presets()? {
                let mark = if current.as_deref() == Some(preset.id.as_str()) { "*" } else { " " };
                println!(
                    "{mark} {:<24} {:<8} {}",
                    preset.id, preset.location, preset.description
                );
            }
            return Ok(());
        }
        PromptCommand::Save {
            name,
            description,
            global,
        } => {
            let location = if global {
                PresetLocation::Global
            } else {
                PresetLocation::Project
            };
            let preset = controller.save_prompt_preset(&name, &description, location)?;
            println!("saved {} ({})", preset.id, preset.location);
            return Ok(());
        }
        PromptCommand::Show => {
            let data = controller.data();
            if let Some(preset) = &data.current_preset {
                println!("# preset: {} ({})", preset.id, preset.location);
            }
            println!("{}", data.current_prompt);
            return Ok(());
        }
    }
    ctx.save(&controller)?;
    Ok(())
}
