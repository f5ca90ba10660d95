//! Configuration module for Concierge.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{DomainPrompts, Prompts, RelevancePrompts, FALLBACK_ANSWER};
pub use settings::{
    AgentSettings, Domain, GeneralSettings, ModelSettings, PromptSettings, Settings,
    TranscriptionSettings, TravelSettings,
};
