//! delistat - Explore Chilean police crime statistics from the command line

use anyhow::Result;
use clap::Parser;
use delistat::{app, cli::Cli};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // --quiet and --verbose override RUST_LOG; logs go to stderr so stdout
    // stays clean for --json output.
    let filter = if cli.quiet || cli.verbose {
        tracing_subscriber::EnvFilter::new(cli.log_directive())
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(cli.log_directive()))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let stdout_is_terminal = is_terminal::is_terminal(std::io::stdout());
    if !stdout_is_terminal {
        colored::control::set_override(false);
    }
    let show_progress = cli.show_progress(is_terminal::is_terminal(std::io::stderr()));

    info!("Running {:?}", cli.command);
    let output = app::run(&cli, show_progress).await?;
    print!("{output}");
    if !output.ends_with('\n') {
        println!();
    }
    Ok(())
}
