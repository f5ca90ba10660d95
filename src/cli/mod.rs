//! CLI module for Concierge.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use crate::config::{Domain, Settings};
use clap::{Parser, Subcommand};

/// Concierge - a tool-orchestrating assistant
///
/// Summarizes YouTube videos or searches flights and hotels, depending on
/// the configured domain.
#[derive(Parser, Debug)]
#[command(name = "concierge")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check system requirements and configuration
    Doctor,

    /// Answer a single request
    Ask {
        /// The request, e.g. "Summarize https://youtu.be/..."
        prompt: String,

        /// Print tool calls and model output as they happen
        #[arg(short = 'r', long)]
        show_reasoning: bool,

        /// LLM model to use
        #[arg(short, long)]
        model: Option<String>,

        /// Format results as JSON
        #[arg(long)]
        json: bool,

        /// Domain to serve (video, travel)
        #[arg(short, long)]
        domain: Option<Domain>,
    },

    /// Start an interactive multi-turn session
    Chat {
        /// Print tool calls and model output as they happen
        #[arg(short = 'r', long)]
        show_reasoning: bool,

        /// LLM model to use
        #[arg(short, long)]
        model: Option<String>,

        /// Format results as JSON
        #[arg(long)]
        json: bool,

        /// Domain to serve (video, travel)
        #[arg(short, long)]
        domain: Option<Domain>,
    },

    /// Start HTTP API server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "agent.domain")
        key: String,
        /// Configuration value
        value: String,
    },

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}

/// Apply per-invocation overrides from command-line flags.
pub fn apply_overrides(
    settings: &mut Settings,
    model: Option<String>,
    domain: Option<Domain>,
    json: bool,
) {
    if let Some(model) = model {
        settings.model.model = model;
    }
    if let Some(domain) = domain {
        settings.agent.domain = domain;
    }
    if json {
        settings.agent.respond_json = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ask() {
        let cli = Cli::try_parse_from([
            "concierge",
            "ask",
            "Find flights from Oslo to Rome",
            "--domain",
            "travel",
            "--json",
            "-r",
        ])
        .unwrap();

        let Commands::Ask {
            prompt,
            show_reasoning,
            json,
            domain,
            ..
        } = cli.command
        else {
            panic!("Expected ask");
        };
        assert_eq!(prompt, "Find flights from Oslo to Rome");
        assert!(show_reasoning);
        assert!(json);
        assert_eq!(domain, Some(Domain::Travel));
    }

    #[test]
    fn test_apply_overrides() {
        let mut settings = Settings::default();
        apply_overrides(&mut settings, Some("gpt-4o".into()), Some(Domain::Travel), true);
        assert_eq!(settings.model.model, "gpt-4o");
        assert_eq!(settings.agent.domain, Domain::Travel);
        assert!(settings.agent.respond_json);

        apply_overrides(&mut settings, None, None, false);
        assert!(settings.agent.respond_json);
    }

    #[test]
    fn test_parse_chat_json() {
        let cli = Cli::try_parse_from(["concierge", "chat", "--json", "-d", "video"]).unwrap();

        let Commands::Chat { json, domain, show_reasoning, .. } = cli.command else {
            panic!("Expected chat");
        };
        assert!(json);
        assert!(!show_reasoning);
        assert_eq!(domain, Some(Domain::Video));
    }
}
