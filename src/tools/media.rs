//! Video audio download.

use crate::audio::{download_audio, FetchedAudio};
use crate::error::Result;
use async_trait::async_trait;
use regex::Regex;
use std::path::PathBuf;

/// Fetches the audio track of a video page.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch_audio(&self, url: &str) -> Result<FetchedAudio>;
}

/// yt-dlp backed fetcher writing into a working directory.
pub struct YtDlpFetcher {
    output_dir: PathBuf,
    video_id_regex: Regex,
}

impl YtDlpFetcher {
    pub fn new(output_dir: PathBuf) -> Self {
        // Bare 11-character YouTube video ids
        let video_id_regex = Regex::new(r"^[a-zA-Z0-9_-]{11}$").expect("Invalid regex");

        Self {
            output_dir,
            video_id_regex,
        }
    }

    /// Expand a bare video id into a watch URL; anything else is passed through.
    fn normalize_url(&self, input: &str) -> String {
        let input = input.trim();
        if self.video_id_regex.is_match(input) {
            format!("https://www.youtube.com/watch?v={}", input)
        } else {
            input.to_string()
        }
    }
}

#[async_trait]
impl MediaFetcher for YtDlpFetcher {
    async fn fetch_audio(&self, url: &str) -> Result<FetchedAudio> {
        download_audio(&self.normalize_url(url), &self.output_dir).await
    }
}
