//! Concierge - a tool-orchestrating assistant
//!
//! Concierge answers natural-language requests by letting a language model
//! call a small set of tools on the user's behalf, then checks the answer
//! before returning it.
//!
//! # Domains
//!
//! - **video**: download YouTube audio, transcribe it, summarize the videos
//! - **travel**: search direct flights and hotel offers
//!
//! # Architecture
//!
//! - `catalog` - Tool declarations and argument validation
//! - `tools` - Tool adapters and dispatch
//! - `audio` - yt-dlp / ffmpeg helpers
//! - `travel` - Flight and hotel search
//! - `formatter` - Text and JSON rendering of results
//! - `model` - Language model backend
//! - `relevance` - Answer relevance check
//! - `orchestrator` - The request loop and answer policy
//! - `events` - Reasoning events for observers
//!
//! # Example
//!
//! ```rust,no_run
//! use concierge::config::Settings;
//! use concierge::orchestrator::{Orchestrator, Services};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let services = Arc::new(Services::from_settings(&settings)?);
//!     let mut orchestrator = Orchestrator::new(services);
//!
//!     let answer = orchestrator
//!         .handle("Summarize https://www.youtube.com/watch?v=5C_HPTJg5ek", false)
//!         .await?;
//!     println!("{}", answer);
//!
//!     Ok(())
//! }
//! ```

pub mod audio;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod formatter;
pub mod model;
pub mod openai;
pub mod orchestrator;
pub mod relevance;
pub mod tools;
pub mod travel;

#[cfg(test)]
mod testing;

pub use error::{ConciergeError, Result};
