//! Pre-flight checks before handling requests.
//!
//! Validates that required tools and credentials are available
//! before a request would otherwise fail halfway through a tool call.

use crate::config::{Domain, Settings};
use crate::error::{ConciergeError, Result};
use std::process::Command;

/// Run pre-flight checks for the configured domain.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(settings: &Settings) -> Result<()> {
    check_env(&settings.model.api_key_env)?;
    match settings.agent.domain {
        Domain::Video => {
            check_tool("yt-dlp")?;
            check_tool("ffmpeg")?;
            check_tool("ffprobe")?;
        }
        Domain::Travel => {
            check_env(&settings.travel.api_key_env)?;
            check_env(&settings.travel.api_secret_env)?;
        }
    }
    Ok(())
}

/// Check that a credential environment variable is set and non-empty.
fn check_env(name: &str) -> Result<()> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Ok(()),
        Ok(_) => Err(ConciergeError::Config(format!(
            "{} is empty. Set it with: export {}='...'",
            name, name
        ))),
        Err(_) => Err(ConciergeError::Config(format!(
            "{} not set. Set it with: export {}='...'",
            name, name
        ))),
    }
}

/// Check if an external tool is available.
fn check_tool(name: &str) -> Result<()> {
    // ffmpeg/ffprobe use -version (single dash), others use --version
    let version_arg = match name {
        "ffmpeg" | "ffprobe" => "-version",
        _ => "--version",
    };
    match Command::new(name).arg(version_arg).output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(ConciergeError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ConciergeError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(ConciergeError::ToolNotFound(format!("{}: {}", name, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_travel_credentials() {
        let mut settings = Settings::default();
        settings.agent.domain = Domain::Travel;
        settings.model.api_key_env = "PATH".to_string();
        settings.travel.api_key_env = "CONCIERGE_TEST_UNSET_AMADEUS_KEY".to_string();

        let err = check(&settings).unwrap_err();
        assert!(matches!(err, ConciergeError::Config(_)));
        assert!(err.to_string().contains("CONCIERGE_TEST_UNSET_AMADEUS_KEY not set"));
    }

    #[test]
    fn test_missing_model_key_checked_first() {
        let mut settings = Settings::default();
        settings.model.api_key_env = "CONCIERGE_TEST_UNSET_PREFLIGHT_KEY".to_string();

        let err = check(&settings).unwrap_err();
        assert!(err.to_string().contains("CONCIERGE_TEST_UNSET_PREFLIGHT_KEY"));
    }
}
