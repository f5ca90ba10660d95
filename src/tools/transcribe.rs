//! Speech-to-text over OpenAI Whisper.

use crate::audio::split_audio;
use crate::config::{ModelSettings, TranscriptionSettings};
use crate::error::{ConciergeError, Result};
use crate::openai::create_client;
use async_openai::config::OpenAIConfig;
use async_openai::types::{AudioInput, AudioResponseFormat, CreateTranscriptionRequestArgs};
use async_openai::Client;
use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::path::Path;
use tracing::{debug, info, instrument};

/// Extensions accepted by the transcription tool.
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "m4a", "wav", "ogg", "opus", "webm", "flac"];

/// Reject paths that do not name an audio file.
pub fn ensure_audio_file(path: &str) -> std::result::Result<(), String> {
    let is_audio = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| AUDIO_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false);

    if is_audio {
        Ok(())
    } else {
        Err(format!(
            "Audio file must be an audio file ({}): {}",
            AUDIO_EXTENSIONS.join(", "),
            path
        ))
    }
}

/// Turns an audio file into text.
#[async_trait]
pub trait AudioTranscriber: Send + Sync {
    async fn transcribe(&self, audio_path: &Path) -> Result<String>;
}

/// OpenAI Whisper-based transcriber.
pub struct WhisperTranscriber {
    client: Client<OpenAIConfig>,
    model: String,
    chunk_duration_seconds: u32,
    max_concurrent_chunks: usize,
}

impl WhisperTranscriber {
    pub fn new(model: &ModelSettings, settings: &TranscriptionSettings) -> Result<Self> {
        Ok(Self {
            client: create_client(model)?,
            model: settings.model.clone(),
            chunk_duration_seconds: settings.chunk_duration_seconds,
            max_concurrent_chunks: settings.max_concurrent_chunks.max(1),
        })
    }

    /// Transcribe a single audio file (no splitting).
    #[instrument(skip(self), fields(audio_path = %audio_path.display()))]
    async fn transcribe_single(&self, audio_path: &Path) -> Result<String> {
        debug!("Transcribing audio file");

        let file_bytes = tokio::fs::read(audio_path).await?;

        let request = CreateTranscriptionRequestArgs::default()
            .file(AudioInput::from_vec_u8(
                audio_path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("audio.mp3")
                    .to_string(),
                file_bytes,
            ))
            .model(&self.model)
            .response_format(AudioResponseFormat::Json)
            .build()
            .map_err(|e| ConciergeError::Transcription(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .audio()
            .transcribe(request)
            .await
            .map_err(|e| ConciergeError::Transcription(format!("Whisper API error: {}", e)))?;

        Ok(response.text.trim().to_string())
    }
}

#[async_trait]
impl AudioTranscriber for WhisperTranscriber {
    #[instrument(skip(self), fields(audio_path = %audio_path.display()))]
    async fn transcribe(&self, audio_path: &Path) -> Result<String> {
        let temp_dir = tempfile::tempdir()?;
        let chunks = split_audio(audio_path, temp_dir.path(), self.chunk_duration_seconds).await?;

        if chunks.len() == 1 {
            return self.transcribe_single(audio_path).await;
        }

        info!("Processing {} audio chunks with {}", chunks.len(), self.model);

        // `buffered` keeps chunk order while bounding concurrency
        let futures: Vec<_> = chunks
            .iter()
            .map(|chunk| self.transcribe_single(chunk))
            .collect();
        let parts: Vec<String> = stream::iter(futures)
            .buffered(self.max_concurrent_chunks)
            .try_collect()
            .await?;

        Ok(parts
            .into_iter()
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_extensions_accepted() {
        assert!(ensure_audio_file("/tmp/concierge/abc.mp3").is_ok());
        assert!(ensure_audio_file("/tmp/concierge/abc.M4A").is_ok());
        assert!(ensure_audio_file("talk.flac").is_ok());
    }

    #[test]
    fn test_non_audio_rejected_with_path() {
        let err = ensure_audio_file("/tmp/notes.txt").unwrap_err();
        assert_eq!(
            err,
            "Audio file must be an audio file (mp3, m4a, wav, ogg, opus, webm, flac): /tmp/notes.txt"
        );
        assert!(ensure_audio_file("/tmp/no_extension").is_err());
    }
}
