use crate::commands::Ctx;
use crate::domain::{Filter, PresetLocation};
use anyhow::Result;
use clap::{Args, Subcommand};

#[derive(Args, Debug, Clone)]
pub struct FilterSpec {
    /// Filter name
    #[arg(short, long)]
    pub name: String,

    #[arg(short, long, default_value = "")]
    pub description: String,

    /// Hide files matching this glob (repeatable)
    #[arg(short = 'e', long = "exclude")]
    pub exclude: Vec<String>,

    /// Hide files NOT matching this glob (repeatable)
    #[arg(short = 'i', long = "include")]
    pub include: Vec<String>,
}

impl FilterSpec {
    pub fn to_filter(&self) -> Filter {
        Filter::from_patterns(&self.name, &self.description, &self.exclude, &self.include)
    }
}

#[derive(Subcommand, Debug)]
pub enum FilterCommand {
    /// Add a filter to the active set
    Add(FilterSpec),

    /// List active filters
    List,

    /// Remove an active filter by index
    Remove { index: usize },

    /// Remove all active filters
    Clear,

    /// Show which files are visible and which are filtered
    Show,

    /// Preview a filter against the changed files without saving it
    Test(FilterSpec),

    /// Reusable filter presets
    #[command(subcommand)]
    Preset(PresetCommand),
}

#[derive(Subcommand, Debug)]
pub enum PresetCommand {
    /// List built-in, project and global filter presets
    List,

    /// Save rules as a preset
    Save {
        #[command(flatten)]
        spec: FilterSpec,

        /// Save to ~/.pr-builder instead of the repository
        #[arg(long)]
        global: bool,
    },

    /// Add a preset to the active filters
    Apply { id: String },
}

pub fn run(ctx: &Ctx, cmd: FilterCommand) -> Result<()> {
    match cmd {
        FilterCommand::Add(spec) => {
            let mut controller = ctx.open()?;
            controller.add_filter(spec.to_filter())?;
            report_visibility(&controller);
            ctx.save(&controller)?;
        }
        FilterCommand::List => {
            let controller = ctx.open()?;
            let filters = &controller.data().active_filters;
            if filters.is_empty() {
                println!("no active filters");
            }
            for (index, filter) in filters.iter().enumerate() {
                println!("{index}: {}", filter.name);
                if !filter.description.is_empty() {
                    println!("   {}", filter.description);
                }
                for rule in &filter.rules {
                    println!("   {} {}", rule.kind, rule.pattern);
                }
            }
        }
        FilterCommand::Remove { index } => {
            let mut controller = ctx.open()?;
            let removed = controller.remove_filter(index)?;
            println!("removed {}", removed.name);
            ctx.save(&controller)?;
        }
        FilterCommand::Clear => {
            let mut controller = ctx.open()?;
            controller.clear_filters();
            println!("cleared filters");
            ctx.save(&controller)?;
        }
        FilterCommand::Show => {
            let controller = ctx.open()?;
            let data = controller.data();
            println!("visible:");
            for file in data.visible_files() {
                println!("  {}", file.path);
            }
            println!("filtered:");
            for file in data.filtered_files() {
                println!("  {}", file.path);
            }
        }
        FilterCommand::Test(spec) => {
            let controller = ctx.open()?;
            let result = controller.test_filter(&spec.to_filter())?;
            println!("matched ({}):", result.matched.len());
            for path in &result.matched {
                println!("  {path}");
            }
            println!("filtered ({}):", result.unmatched.len());
            for path in &result.unmatched {
                println!("  {path}");
            }
        }
        FilterCommand::Preset(cmd) => run_preset(ctx, cmd)?,
    }
    Ok(())
}

fn run_preset(ctx: &Ctx, cmd: PresetCommand) -> Result<()> {
    match cmd {
        PresetCommand::List => {
            let controller = ctx.open()?;
            for preset in controller.list_filter_presets()? {
                println!("{:<28} {:<8} {}", preset.id, preset.location, preset.name);
            }
        }
        PresetCommand::Save { spec, global } => {
            let controller = ctx.open()?;
            let filter = spec.to_filter();
            filter.validate()?;
            let location = if global {
                PresetLocation::Global
            } else {
                PresetLocation::Project
            };
            let preset = controller.save_filter_preset(
                &filter.name,
                &filter.description,
                &filter.rules,
                location,
            )?;
            println!("saved {} ({})", preset.id, preset.location);
        }
        PresetCommand::Apply { id } => {
            let mut controller = ctx.open()?;
            let filter = controller.apply_filter_preset(&id)?;
            println!("applied {}", filter.name);
            report_visibility(&controller);
            ctx.save(&controller)?;
        }
    }
    Ok(())
}

fn report_visibility(controller: &crate::application::Controller) {
    let data = controller.data();
    println!(
        "{} visible, {} filtered",
        data.visible_files().len(),
        data.filtered_files().len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{Cli, Commands};
    use crate::domain::FilterKind;
    use clap::Parser;

    #[test]
    fn repeated_patterns_become_ordered_rules() {
        let cli = Cli::try_parse_from([
            "pr-builder", "filter", "add", "-n", "Src", "-e", "**/*.md", "-i", "src/**", "-e",
            "**/*test*",
        ])
        .unwrap();
        let Commands::Filter(FilterCommand::Add(spec)) = cli.command else {
            panic!("wrong command");
        };
        let filter = spec.to_filter();
        let kinds: Vec<_> = filter.rules.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![FilterKind::Exclude, FilterKind::Exclude, FilterKind::Include]
        );
        assert_eq!(filter.rules[2].order, 2);
    }
}
