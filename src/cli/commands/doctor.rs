//! Doctor command - verify system requirements and configuration.

use crate::cli::Output;
use crate::config::{Domain, Settings};
use console::style;
use std::process::Command;

#[derive(Debug, PartialEq)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}

/// Outcome of one diagnostic, with an optional fix-it hint.
#[derive(Debug)]
struct CheckResult {
    name: String,
    status: CheckStatus,
    message: String,
    hint: Option<String>,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, message: &str, hint: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.to_string(),
            hint: hint.map(str::to_string),
        }
    }

    fn ok(name: &str, message: &str) -> Self {
        Self::new(name, CheckStatus::Ok, message, None)
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self::new(name, CheckStatus::Warning, message, Some(hint))
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self::new(name, CheckStatus::Error, message, Some(hint))
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };
        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);
        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings) -> anyhow::Result<()> {
    Output::header("Concierge Doctor");
    println!();
    println!(
        "Checking requirements for the {} domain...\n",
        settings.agent.domain
    );

    let mut checks = Vec::new();

    match settings.agent.domain {
        Domain::Video => {
            println!("{}", style("External Tools").bold());
            let tool_checks = vec![
                check_tool("yt-dlp"),
                check_tool("ffmpeg"),
                check_tool("ffprobe"),
            ];
            for check in &tool_checks {
                check.print();
            }
            checks.extend(tool_checks);
            println!();
        }
        Domain::Travel => {
            println!("{}", style("Travel API").bold());
            let credential_checks = vec![
                check_credential(&settings.travel.api_key_env),
                check_credential(&settings.travel.api_secret_env),
            ];
            for check in &credential_checks {
                check.print();
            }
            checks.extend(credential_checks);
            println!();
        }
    }

    // Check API keys
    println!("{}", style("Model Backend").bold());
    let api_check = check_model_api_key(&settings.model.api_key_env);
    api_check.print();
    checks.push(api_check);
    Output::kv("Model", &settings.model.model);
    if let Some(base) = &settings.model.api_base {
        Output::kv("API base", base);
    }

    println!();

    // Check directories
    println!("{}", style("Directories").bold());
    let dir_check = check_temp_dir(settings);
    dir_check.print();
    checks.push(dir_check);

    println!();

    // Check configuration
    println!("{}", style("Configuration").bold());
    let config_check = check_config_file();
    config_check.print();
    checks.push(config_check);

    println!();

    // Summary
    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using Concierge.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!(
            "All checks passed with {} warning(s).",
            warnings
        ));
    } else {
        Output::success("All checks passed! Concierge is ready to use.");
    }

    Ok(())
}

/// Check that an external binary runs, reporting its version line.
fn check_tool(name: &str) -> CheckResult {
    let version_arg = if name == "yt-dlp" { "--version" } else { "-version" };
    let hint = install_hint(name);

    match Command::new(name).arg(version_arg).output() {
        Ok(output) if output.status.success() => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let version: String = stdout
                .lines()
                .next()
                .unwrap_or("installed")
                .trim()
                .chars()
                .take(50)
                .collect();
            CheckResult::ok(name, &version)
        }
        Ok(_) => CheckResult::error(name, "installed but not working", hint),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            CheckResult::error(name, "not found", hint)
        }
        Err(e) => CheckResult::error(name, &format!("error: {}", e), hint),
    }
}

fn install_hint(tool: &str) -> &'static str {
    match tool {
        "yt-dlp" => "Install with: pip install yt-dlp",
        _ => "Install ffmpeg (includes ffprobe) from your package manager",
    }
}

/// Check the model backend API key.
fn check_model_api_key(var: &str) -> CheckResult {
    match std::env::var(var) {
        Ok(key) if key.starts_with("sk-") && key.len() > 20 => {
            CheckResult::ok(var, &format!("configured ({})", mask(&key)))
        }
        Ok(key) if key.is_empty() => CheckResult::error(
            var,
            "empty",
            &format!("Set with: export {}='sk-...'", var),
        ),
        Ok(_) => CheckResult::warning(
            var,
            "set but format looks unusual",
            "Expected format: sk-... (fine for OpenAI-compatible servers)",
        ),
        Err(_) => CheckResult::error(
            var,
            "not set",
            &format!("Set with: export {}='sk-...'", var),
        ),
    }
}

/// Check a travel API credential.
fn check_credential(var: &str) -> CheckResult {
    match std::env::var(var) {
        Ok(value) if !value.is_empty() => {
            CheckResult::ok(var, &format!("configured ({})", mask(&value)))
        }
        Ok(_) => CheckResult::error(var, "empty", &format!("Set with: export {}='...'", var)),
        Err(_) => CheckResult::error(
            var,
            "not set",
            "Create an app at https://developers.amadeus.com to get credentials",
        ),
    }
}

/// Show only the ends of a secret.
fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 11 {
        return "***".to_string();
    }
    let head: String = chars[..7].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Check the scratch directory for downloads.
fn check_temp_dir(settings: &Settings) -> CheckResult {
    let temp_dir = settings.temp_dir();
    if temp_dir.is_dir() {
        CheckResult::ok("Temp directory", &format!("{}", temp_dir.display()))
    } else {
        CheckResult::warning(
            "Temp directory",
            &format!("{} (will be created)", temp_dir.display()),
            "Directory will be created on first use",
        )
    }
}

/// Check if config file exists.
fn check_config_file() -> CheckResult {
    let config_path = Settings::default_config_path();
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: concierge config edit",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_tool_carries_install_hint() {
        let result = check_tool("concierge-test-missing-binary");
        assert_eq!(result.status, CheckStatus::Error);
        assert_eq!(result.message, "not found");
        assert!(result.hint.unwrap().contains("ffmpeg"));
    }

    #[test]
    fn test_mask() {
        assert_eq!(mask("sk-abcdefghijklmnopqrstuvwxyz"), "sk-abcd...wxyz");
        assert_eq!(mask("short"), "***");
    }

    #[test]
    fn test_missing_credential_is_error() {
        let result = check_credential("CONCIERGE_TEST_UNSET_DOCTOR_SECRET");
        assert_eq!(result.status, CheckStatus::Error);
        assert_eq!(result.message, "not set");
    }
}
