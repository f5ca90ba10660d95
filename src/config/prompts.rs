//! Prompt templates for Concierge.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use super::Domain;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::OnceLock;

/// Answer substituted when the relevance check rejects a response.
pub const FALLBACK_ANSWER: &str =
    "Seems like I failed to understand your request. Please provide more specific instructions.";

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{\{(\w+)\}\}").expect("Invalid regex"))
}

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Prompts {
    pub video: DomainPrompts,
    pub travel: DomainPrompts,
    pub relevance: RelevancePrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            video: DomainPrompts::video(),
            travel: DomainPrompts::travel(),
            relevance: RelevancePrompts::default(),
            variables: HashMap::new(),
        }
    }
}

/// Prompts that scope the assistant to one domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainPrompts {
    pub system: String,
    /// Wraps every user request. Receives `{{request}}` and `{{refusal}}`.
    pub scope: String,
    /// Sentence used verbatim for out-of-domain requests.
    pub refusal: String,
}

impl Default for DomainPrompts {
    fn default() -> Self {
        Self::video()
    }
}

impl DomainPrompts {
    fn video() -> Self {
        Self {
            system: r#"You are an AI assistant that can use tools to transcribe audio from YouTube videos, create summaries of the video's content, provide contextual information, and answer related questions.

Guidelines:
- Use 'download_youtube_audio' to fetch the audio of every video the user mentions
- Use 'transcribe_audio' on the audio file path returned by the download
- ALWAYS provide summaries, titles, video topics, and video URLs for all successfully transcribed videos
- For failed downloads or transcriptions, return only successful results along with a detailed explanation of errors
- Use 'video_summary_response_formatter' to format the final response whenever you summarize videos"#
                .to_string(),

            scope: r#"You only handle requests about YouTube videos: downloading, transcribing, summarizing, and answering questions about their content.
If the request below is about anything else, reply with exactly this sentence and nothing more: "{{refusal}}"
Be concise.

Request: {{request}}"#
                .to_string(),

            refusal: "I can only help with summarizing and answering questions about YouTube videos."
                .to_string(),
        }
    }

    fn travel() -> Self {
        Self {
            system: r#"You are a travel assistant that finds flights and hotels with the available tools.

Guidelines:
- Use 'flight_search' for direct flights between two cities on a given date
- Use 'hotel_search' for hotel offers in a city; use a 15 km radius when the user gives none
- Dates must be in YYYY-MM-DD format; ask for missing dates instead of guessing
- Report the offers you found and explain clearly any search that failed"#
                .to_string(),

            scope: r#"You only handle requests about finding flights and hotels.
If the request below is about anything else, reply with exactly this sentence and nothing more: "{{refusal}}"
Be concise.

Request: {{request}}"#
                .to_string(),

            refusal: "I can only help with finding flights and hotels.".to_string(),
        }
    }
}

/// Partial domain prompts read from a custom prompt file.
///
/// Unset keys keep the built-in prompt of that domain.
#[derive(Debug, Default, Deserialize)]
struct DomainPromptOverrides {
    system: Option<String>,
    scope: Option<String>,
    refusal: Option<String>,
}

impl DomainPromptOverrides {
    fn apply(self, prompts: &mut DomainPrompts) {
        if let Some(system) = self.system {
            prompts.system = system;
        }
        if let Some(scope) = self.scope {
            prompts.scope = scope;
        }
        if let Some(refusal) = self.refusal {
            prompts.refusal = refusal;
        }
    }
}

/// Prompt for the yes/no relevance judgment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelevancePrompts {
    /// Receives `{{request}}` and `{{response}}`.
    pub judge: String,
}

impl Default for RelevancePrompts {
    fn default() -> Self {
        Self {
            judge: r#"Does the response below address the request? Answer only "yes" or "no".

Request:
{{request}}

Response:
{{response}}"#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let video_path = custom_path.join("video.toml");
            if video_path.exists() {
                let content = std::fs::read_to_string(&video_path)?;
                let overrides: DomainPromptOverrides = toml::from_str(&content)?;
                overrides.apply(&mut prompts.video);
            }

            let travel_path = custom_path.join("travel.toml");
            if travel_path.exists() {
                let content = std::fs::read_to_string(&travel_path)?;
                let overrides: DomainPromptOverrides = toml::from_str(&content)?;
                overrides.apply(&mut prompts.travel);
            }

            let relevance_path = custom_path.join("relevance.toml");
            if relevance_path.exists() {
                let content = std::fs::read_to_string(&relevance_path)?;
                prompts.relevance = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Prompts for the given domain.
    pub fn for_domain(&self, domain: Domain) -> &DomainPrompts {
        match domain {
            Domain::Video => &self.video,
            Domain::Travel => &self.travel,
        }
    }

    /// Render a prompt template with the given variables.
    ///
    /// Substitution is a single pass over the template, so placeholders inside
    /// substituted values are left as they are. Unknown placeholders are kept.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        placeholder_pattern()
            .replace_all(template, |caps: &Captures<'_>| match vars.get(&caps[1]) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}
