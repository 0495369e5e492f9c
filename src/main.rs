//! pr-builder command-line entry point.

use clap::Parser;
use pr_builder::commands::{self, Cli};

const EXIT_ERROR: i32 = 1;
const EXIT_USER_ERROR: i32 = 2;

/// Initialize logger based on verbose flag
fn init_logger(verbose: bool) {
    let mut log_builder = env_logger::Builder::from_default_env();
    if verbose {
        log_builder.filter_module("pr_builder", log::LevelFilter::Debug);
    } else if std::env::var_os("RUST_LOG").is_none() {
        log_builder.filter_level(log::LevelFilter::Warn);
    }
    log_builder.init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    if let Err(err) = commands::run(cli).await {
        eprintln!("error: {err:#}");
        let code = if commands::is_user_error(&err) {
            EXIT_USER_ERROR
        } else {
            EXIT_ERROR
        };
        std::process::exit(code);
    }
}
