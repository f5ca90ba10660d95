//! Tool adapters and dispatch.
//!
//! Every tool is a variant of [`ToolCall`]. The [`ToolBox`] validates raw
//! model arguments against the catalog, parses them into a variant and runs
//! the matching adapter.

mod media;
pub mod specs;
mod transcribe;

pub use media::{MediaFetcher, YtDlpFetcher};
pub use transcribe::{ensure_audio_file, AudioTranscriber, WhisperTranscriber, AUDIO_EXTENSIONS};

use crate::catalog::{ReturnMode, ToolCatalog};
use crate::config::TravelSettings;
use crate::error::{ConciergeError, Result};
use crate::formatter::{format_videos, OutputMode, VideoBatch, LENGTH_MISMATCH};
use crate::travel::{search_flights, search_hotels, FlightSearchRequest, HotelSearchRequest, TravelApi};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, instrument};

/// A parsed, schema-checked tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum ToolCall {
    /// Download the audio track of a video.
    DownloadYoutubeAudio { url: String },

    /// Transcribe a downloaded audio file.
    TranscribeAudio { audio_file: String },

    /// Render the final multi-video answer.
    VideoSummaryResponseFormatter {
        summaries: Vec<String>,
        titles: Vec<String>,
        topics: Vec<String>,
        urls: Vec<String>,
    },

    FlightSearch(FlightSearchRequest),

    HotelSearch(HotelSearchRequest),
}

/// The adapters available to one domain, plus the catalog describing them.
pub struct ToolBox {
    catalog: ToolCatalog,
    media: Option<Arc<dyn MediaFetcher>>,
    transcriber: Option<Arc<dyn AudioTranscriber>>,
    travel: Option<Arc<dyn TravelApi>>,
    travel_settings: TravelSettings,
    output_mode: OutputMode,
}

impl ToolBox {
    /// Tools for downloading, transcribing and summarizing videos.
    pub fn video(
        media: Arc<dyn MediaFetcher>,
        transcriber: Arc<dyn AudioTranscriber>,
        output_mode: OutputMode,
        formatter_return_mode: ReturnMode,
    ) -> Result<Self> {
        let mut catalog = ToolCatalog::new();
        catalog.register(specs::download_youtube_audio())?;
        catalog.register(specs::transcribe_audio())?;
        catalog.register(specs::video_summary_response_formatter(formatter_return_mode))?;

        Ok(Self {
            catalog,
            media: Some(media),
            transcriber: Some(transcriber),
            travel: None,
            travel_settings: TravelSettings::default(),
            output_mode,
        })
    }

    /// Tools for searching flights and hotels.
    pub fn travel(
        api: Arc<dyn TravelApi>,
        settings: TravelSettings,
        output_mode: OutputMode,
    ) -> Result<Self> {
        let mut catalog = ToolCatalog::new();
        catalog.register(specs::flight_search())?;
        catalog.register(specs::hotel_search())?;

        Ok(Self {
            catalog,
            media: None,
            transcriber: None,
            travel: Some(api),
            travel_settings: settings,
            output_mode,
        })
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    /// Validate raw arguments against the catalog entry for `name`.
    pub fn parse(&self, name: &str, arguments: &Value) -> Result<ToolCall> {
        let spec = self
            .catalog
            .get(name)
            .ok_or_else(|| ConciergeError::UnknownTool(name.to_string()))?;

        let mut object = spec.validate(arguments)?;
        object.insert("name".to_string(), Value::String(name.to_string()));

        serde_json::from_value(Value::Object(object)).map_err(|e| ConciergeError::InvalidArguments {
            tool: name.to_string(),
            reason: e.to_string(),
        })
    }

    /// Parse and execute a tool call by name.
    pub async fn invoke(&self, name: &str, arguments: &Value) -> Result<String> {
        let call = self.parse(name, arguments)?;
        self.execute(&call).await
    }

    /// Execute a parsed tool call.
    #[instrument(skip_all)]
    pub async fn execute(&self, call: &ToolCall) -> Result<String> {
        debug!("Executing {:?}", call);

        match call {
            ToolCall::DownloadYoutubeAudio { url } => {
                let fetched = self.media()?.fetch_audio(url).await?;
                Ok(format!(
                    "Audio file: {}, Title: {}",
                    fetched.path.display(),
                    fetched.title
                ))
            }
            ToolCall::TranscribeAudio { audio_file } => self.execute_transcribe(audio_file).await,
            ToolCall::VideoSummaryResponseFormatter {
                summaries,
                titles,
                topics,
                urls,
            } => {
                let batch = VideoBatch {
                    titles,
                    urls,
                    topics,
                    summaries,
                };
                if batch.records().is_none() {
                    return Err(ConciergeError::Formatting(LENGTH_MISMATCH.to_string()));
                }
                Ok(format_videos(&batch, self.output_mode).into_string())
            }
            ToolCall::FlightSearch(request) => {
                search_flights(self.travel_api()?, request, &self.travel_settings, self.output_mode)
                    .await
            }
            ToolCall::HotelSearch(request) => {
                search_hotels(self.travel_api()?, request, &self.travel_settings, self.output_mode)
                    .await
            }
        }
    }

    async fn execute_transcribe(&self, audio_file: &str) -> Result<String> {
        ensure_audio_file(audio_file).map_err(ConciergeError::ToolExecution)?;

        let transcriber = self
            .transcriber
            .as_ref()
            .ok_or_else(|| unavailable(specs::TRANSCRIBE_AUDIO))?;

        let text = transcriber.transcribe(Path::new(audio_file)).await?;
        if text.trim().is_empty() {
            return Err(ConciergeError::ToolExecution(format!(
                "Transcription failed for {}. Either no word was detected or there is something wrong with the audio file.",
                audio_file
            )));
        }

        Ok(text)
    }

    fn media(&self) -> Result<&dyn MediaFetcher> {
        self.media
            .as_deref()
            .ok_or_else(|| unavailable(specs::DOWNLOAD_YOUTUBE_AUDIO))
    }

    fn travel_api(&self) -> Result<&dyn TravelApi> {
        self.travel
            .as_deref()
            .ok_or_else(|| unavailable("travel search"))
    }
}

fn unavailable(tool: &str) -> ConciergeError {
    ConciergeError::ToolExecution(format!("{} is not available in this configuration", tool))
}
