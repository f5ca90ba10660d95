//! External audio tooling (yt-dlp, ffmpeg, ffprobe).

mod downloader;

pub use downloader::{download_audio, split_audio, FetchedAudio};
