//! Config command implementation.

use crate::cli::{ConfigAction, Output};
use crate::config::Settings;
use anyhow::{bail, Context, Result};

/// Run the config command.
pub fn run_config(action: &ConfigAction, settings: Settings) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let toml_str = toml::to_string_pretty(&settings)
                .map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))?;
            println!("{}", toml_str);
        }

        ConfigAction::Set { key, value } => {
            let mut settings = settings;
            set_value(&mut settings, key, value)?;
            settings.save()?;
            Output::success(&format!("Set {} = {}", key, value));
        }

        ConfigAction::Edit => {
            let config_path = Settings::default_config_path();

            // Create default config if it doesn't exist
            if !config_path.exists() {
                settings.save()?;
                Output::info(&format!("Created default config at {:?}", config_path));
            }

            // Try to open in editor
            let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vim".to_string());

            Output::info(&format!("Opening config in {}...", editor));

            let status = std::process::Command::new(&editor)
                .arg(&config_path)
                .status();

            match status {
                Ok(s) if s.success() => {
                    Output::success("Config saved.");
                }
                Ok(_) => {
                    Output::warning("Editor exited with non-zero status.");
                }
                Err(e) => {
                    Output::error(&format!("Failed to open editor: {}", e));
                    Output::info(&format!("Config file is at: {:?}", config_path));
                }
            }
        }

        ConfigAction::Path => {
            let config_path = Settings::default_config_path();
            println!("{}", config_path.display());
        }
    }

    Ok(())
}

/// Update a single setting addressed as `section.field`.
fn set_value(settings: &mut Settings, key: &str, value: &str) -> Result<()> {
    match key {
        "general.temp_dir" => settings.general.temp_dir = value.to_string(),
        "general.log_level" => settings.general.log_level = value.to_string(),
        "model.model" => settings.model.model = value.to_string(),
        "model.api_base" => {
            settings.model.api_base = (!value.is_empty()).then(|| value.to_string())
        }
        "model.stream" => settings.model.stream = parse(key, value)?,
        "agent.domain" => {
            settings.agent.domain = value.parse().map_err(|e: String| anyhow::anyhow!(e))?
        }
        "agent.respond_json" => settings.agent.respond_json = parse(key, value)?,
        "agent.relevance_check" => settings.agent.relevance_check = parse(key, value)?,
        "agent.max_iterations" => settings.agent.max_iterations = parse(key, value)?,
        "agent.max_history_turns" => settings.agent.max_history_turns = parse(key, value)?,
        "agent.parallel_tool_calls" => settings.agent.parallel_tool_calls = parse(key, value)?,
        "transcription.model" => settings.transcription.model = value.to_string(),
        "travel.default_currency" => settings.travel.default_currency = value.to_uppercase(),
        _ => bail!("Unknown or read-only config key: {}", key),
    }
    Ok(())
}

fn parse<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse()
        .with_context(|| format!("Invalid value for {}: {}", key, value))
}
