//! Ask command implementation.

use crate::cli::preflight;
use crate::cli::{apply_overrides, Output};
use crate::config::{Domain, Settings};
use crate::events::ConsoleSink;
use crate::orchestrator::{Orchestrator, Services};
use anyhow::Result;
use std::sync::Arc;

/// Run the ask command.
pub async fn run_ask(
    prompt: &str,
    show_reasoning: bool,
    model: Option<String>,
    json: bool,
    domain: Option<Domain>,
    mut settings: Settings,
) -> Result<()> {
    apply_overrides(&mut settings, model, domain, json);

    // Pre-flight checks
    if let Err(e) = preflight::check(&settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'concierge doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let services = Arc::new(Services::from_settings(&settings)?);
    let mut orchestrator = Orchestrator::new(services).with_sink(Arc::new(ConsoleSink));

    let spinner = (!show_reasoning).then(|| Output::spinner("Working on it..."));

    let result = orchestrator.handle(prompt, show_reasoning).await;

    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    match result {
        Ok(answer) => {
            println!("\n{}\n", answer);
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("Failed to answer: {}", e));
            Err(e.into())
        }
    }
}
