//! Configuration settings for Concierge.

use crate::catalog::ReturnMode;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub model: ModelSettings,
    pub agent: AgentSettings,
    pub transcription: TranscriptionSettings,
    pub travel: TravelSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for downloaded audio and split segments.
    pub temp_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            temp_dir: "/tmp/concierge".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// Language model backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Chat model used for orchestration and relevance checks.
    pub model: String,
    /// OpenAI-compatible API base URL. None = api.openai.com.
    pub api_base: Option<String>,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Stream generations so text can be shown as it arrives.
    pub stream: bool,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            api_base: None,
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 300,
            stream: true,
        }
    }
}

/// The scope an assistant is restricted to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    /// Download, transcribe and summarize videos.
    #[default]
    Video,
    /// Search flights and hotels.
    Travel,
}

impl std::str::FromStr for Domain {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "video" | "youtube" => Ok(Domain::Video),
            "travel" => Ok(Domain::Travel),
            _ => Err(format!("Unknown domain: {}", s)),
        }
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Domain::Video => write!(f, "video"),
            Domain::Travel => write!(f, "travel"),
        }
    }
}

/// Orchestration policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Which domain the assistant serves.
    pub domain: Domain,
    /// Format results as JSON instead of plain text.
    pub respond_json: bool,
    /// Whether formatter output is the final answer or goes back to the model.
    pub formatter_return_mode: ReturnMode,
    /// Run the relevance check on every answer.
    pub relevance_check: bool,
    /// Maximum model calls per request.
    pub max_iterations: usize,
    /// Number of past turns replayed to the model.
    pub max_history_turns: usize,
    /// Execute the tool calls of one turn concurrently.
    pub parallel_tool_calls: bool,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            domain: Domain::Video,
            respond_json: false,
            formatter_return_mode: ReturnMode::ReturnDirect,
            relevance_check: true,
            max_iterations: 15,
            max_history_turns: 10,
            parallel_tool_calls: false,
        }
    }
}

/// Speech-to-text settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    /// Whisper model to use.
    pub model: String,
    /// Duration in seconds for splitting long audio files.
    pub chunk_duration_seconds: u32,
    /// Maximum concurrent chunk transcriptions.
    pub max_concurrent_chunks: usize,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            model: "whisper-1".to_string(),
            chunk_duration_seconds: 600,
            max_concurrent_chunks: 2,
        }
    }
}

/// Travel data backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TravelSettings {
    /// Amadeus API base URL.
    pub base_url: String,
    /// Country lookup service base URL.
    pub countries_url: String,
    /// Environment variable holding the Amadeus client id.
    pub api_key_env: String,
    /// Environment variable holding the Amadeus client secret.
    pub api_secret_env: String,
    /// Currency used when the request names none.
    pub default_currency: String,
    /// Maximum flight offers requested per search.
    pub max_flight_offers: u32,
    /// Maximum hotel ids whose offers are looked up.
    pub max_hotels_scanned: usize,
    /// Stop after this many hotel records.
    pub max_hotel_results: usize,
}

impl Default for TravelSettings {
    fn default() -> Self {
        Self {
            base_url: "https://test.api.amadeus.com".to_string(),
            countries_url: "https://restcountries.com/v3.1".to_string(),
            api_key_env: "AMADEUS_API_KEY".to_string(),
            api_secret_env: "AMADEUS_API_SECRET".to_string(),
            default_currency: "USD".to_string(),
            max_flight_offers: 10,
            max_hotels_scanned: 50,
            max_hotel_results: 15,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::ConciergeError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("concierge")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded temp directory path.
    pub fn temp_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.temp_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [agent]
            domain = "travel"
            formatter_return_mode = "chain_back"

            [travel]
            max_hotel_results = 5
            "#,
        )
        .unwrap();

        assert_eq!(settings.agent.domain, Domain::Travel);
        assert_eq!(settings.agent.formatter_return_mode, ReturnMode::ChainBack);
        assert_eq!(settings.agent.max_iterations, 15);
        assert_eq!(settings.travel.max_hotel_results, 5);
        assert_eq!(settings.travel.max_hotels_scanned, 50);
        assert_eq!(settings.model.api_key_env, "OPENAI_API_KEY");
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut settings = Settings::default();
        settings.agent.respond_json = true;
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert!(loaded.agent.respond_json);
    }

    #[test]
    fn test_domain_from_str() {
        assert_eq!("Travel".parse::<Domain>().unwrap(), Domain::Travel);
        assert_eq!("youtube".parse::<Domain>().unwrap(), Domain::Video);
        assert!("cooking".parse::<Domain>().is_err());
    }
}
