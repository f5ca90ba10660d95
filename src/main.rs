//! Concierge CLI entry point.

use anyhow::Result;
use clap::Parser;
use concierge::cli::{commands, Cli, Commands};
use concierge::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let settings = match &cli.config {
        Some(path) => Settings::load_from(Some(&std::path::PathBuf::from(path)))?,
        None => Settings::load()?,
    };

    // Initialize logging; -v flags override the configured level
    let log_level = match cli.verbose {
        0 => settings.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("concierge={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    std::fs::create_dir_all(settings.temp_dir())?;

    match &cli.command {
        Commands::Doctor => {
            commands::run_doctor(&settings)?;
        }

        Commands::Ask {
            prompt,
            show_reasoning,
            model,
            json,
            domain,
        } => {
            commands::run_ask(prompt, *show_reasoning, model.clone(), *json, *domain, settings)
                .await?;
        }

        Commands::Chat {
            show_reasoning,
            model,
            json,
            domain,
        } => {
            commands::run_chat(*show_reasoning, model.clone(), *json, *domain, settings).await?;
        }

        Commands::Serve { host, port } => {
            commands::run_serve(host, *port, settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, settings)?;
        }
    }

    Ok(())
}
