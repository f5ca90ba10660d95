//! Interactive multi-turn session.

use crate::cli::preflight;
use crate::cli::{apply_overrides, Output};
use crate::config::{Domain, Settings};
use crate::events::ConsoleSink;
use crate::orchestrator::{Orchestrator, Services};
use console::style;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

/// Run the interactive chat command.
pub async fn run_chat(
    show_reasoning: bool,
    model: Option<String>,
    json: bool,
    domain: Option<Domain>,
    mut settings: Settings,
) -> anyhow::Result<()> {
    apply_overrides(&mut settings, model, domain, json);

    // Pre-flight checks
    if let Err(e) = preflight::check(&settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'concierge doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let services = Arc::new(Services::from_settings(&settings)?);
    let mut orchestrator = Orchestrator::new(services).with_sink(Arc::new(ConsoleSink));

    println!(
        "\n{} {}",
        style("Concierge Chat").bold().cyan(),
        style(format!("({})", settings.agent.domain)).dim()
    );
    println!(
        "{}\n",
        style("Type your requests, or 'exit' to quit. Use 'clear' to reset conversation.").dim()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }

        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            Output::info("Goodbye!");
            break;
        }

        if input.eq_ignore_ascii_case("clear") {
            orchestrator.reset();
            Output::info("Conversation history cleared.");
            continue;
        }

        let spinner = (!show_reasoning).then(|| Output::spinner("Thinking..."));
        let result = orchestrator.handle(input, show_reasoning).await;
        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }

        match result {
            Ok(answer) => {
                println!("\n{} {}\n", style("Concierge:").cyan().bold(), answer);
            }
            Err(e) => {
                Output::error(&format!("Error: {}", e));
            }
        }
    }

    Ok(())
}
