//! Error types for Concierge.

use thiserror::Error;

/// Library-level error type for Concierge operations.
///
/// Only [`ConciergeError::Config`] and [`ConciergeError::Upstream`] ever leave
/// the orchestrator; every other variant is turned into a string and handed
/// back to the model as a tool result.
#[derive(Error, Debug)]
pub enum ConciergeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Model backend unreachable: {0}")]
    Upstream(String),

    #[error("{0}")]
    ToolExecution(String),

    #[error("{0}")]
    Formatting(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },

    #[error("Audio download failed: {0}")]
    AudioDownload(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Travel search failed: {0}")]
    Travel(String),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ConciergeError {
    /// Whether the error must abort the current request instead of being fed
    /// back to the model.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ConciergeError::Config(_) | ConciergeError::Upstream(_))
    }
}

/// Result type alias for Concierge operations.
pub type Result<T> = std::result::Result<T, ConciergeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_config_and_upstream_are_fatal() {
        assert!(ConciergeError::Config("missing key".into()).is_fatal());
        assert!(ConciergeError::Upstream("timeout".into()).is_fatal());
        assert!(!ConciergeError::ToolExecution("boom".into()).is_fatal());
        assert!(!ConciergeError::UnknownTool("teleport".into()).is_fatal());
    }

    #[test]
    fn test_formatting_message_is_verbatim() {
        let err = ConciergeError::Formatting("Error: Input lists must have the same length.".into());
        assert_eq!(err.to_string(), "Error: Input lists must have the same length.");
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_unknown_tool_message() {
        let err = ConciergeError::UnknownTool("teleport".into());
        assert_eq!(err.to_string(), "Unknown tool: teleport");
    }
}
