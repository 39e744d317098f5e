use anyhow::Result;
use clap::Parser;
use gesture_pack::cli::Cli;
use gesture_pack::commands;

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize tracing (RUST_LOG wins over --verbose)
    let default_filter = if cli.verbose {
        "gesture_pack=debug,info"
    } else {
        "gesture_pack=info,warn"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    // Execute command
    commands::execute(cli)
}
