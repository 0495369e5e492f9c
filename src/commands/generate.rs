use crate::application::request::export_payload;
use crate::application::{Controller, GenerationOutcome, Separator};
use crate::commands::Ctx;
use crate::infra::app_config::load_config;
use crate::infra::generation::AgentCommandClient;
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Print the compiled payload instead of calling the agent
    #[arg(long)]
    pub export_only: bool,

    /// Payload layout for --export-only: xml, markdown, simple, begin-end or default
    #[arg(long, default_value_t = Separator::Xml)]
    pub separator: Separator,

    /// Write the exported payload to a file instead of stdout
    #[arg(short, long, requires = "export_only")]
    pub output: Option<PathBuf>,

    /// Print the agent's raw answer
    #[arg(long)]
    pub raw: bool,
}

pub async fn run(ctx: &Ctx, args: GenerateArgs) -> Result<()> {
    let controller = ctx.open()?;

    if args.export_only {
        return export(&controller, &args);
    }

    let config = load_config();
    let request = controller.build_generation_request()?;
    let tokens = request.total_tokens();
    if config.over_budget(tokens) {
        log::warn!(
            "request is ~{tokens} tokens, over the configured budget of {}",
            config.token_budget
        );
    }

    let client = AgentCommandClient::new(
        &config.agent_command,
        config.agent_args.clone(),
        Duration::from_secs(config.timeout_secs),
    )?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("interrupt received, stopping the agent");
            on_interrupt.cancel();
        }
    });

    eprintln!("generating with {} (~{tokens} tokens)...", config.agent_command);
    let result = controller.generate(&client, cancel).await;
    watcher.abort();

    print_outcome(&result?, args.raw);
    Ok(())
}

fn export(controller: &Controller, args: &GenerateArgs) -> Result<()> {
    let request = controller.build_generation_request()?;
    let payload = request.compile()?;
    let text = export_payload(&request, &payload, args.separator);
    match &args.output {
        Some(path) => {
            std::fs::write(path, &text)
                .with_context(|| format!("writing payload to {}", path.display()))?;
            eprintln!(
                "wrote {} (~{} tokens)",
                path.display(),
                request.total_tokens()
            );
        }
        None => print!("{text}"),
    }
    Ok(())
}

fn print_outcome(outcome: &GenerationOutcome, raw: bool) {
    match (&outcome.parsed, raw) {
        (Some(parsed), false) => {
            println!("{}\n", parsed.title);
            println!("{}", parsed.body.trim_end());
            if !parsed.changelog.is_empty() {
                println!("\nChangelog:\n{}", parsed.changelog.trim_end());
            }
            if let Some(notes) = &parsed.release_notes {
                println!("\nRelease notes: {}\n{}", notes.title, notes.body.trim_end());
            }
        }
        _ => {
            if let Some(err) = &outcome.parse_error {
                eprintln!("could not parse the answer ({err}), showing it as is");
            }
            println!("{}", outcome.raw.trim_end());
        }
    }
    eprintln!("\nsaved {}", outcome.saved_to.display());
}
