//! Audio download and processing utilities.
//!
//! Downloads go through yt-dlp; conversion, splitting and probing use ffmpeg
//! and ffprobe.

use crate::error::{ConciergeError, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

/// Audio extracted from a video page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedAudio {
    pub path: PathBuf,
    pub title: String,
}

/// Downloads the audio track of a video URL as MP3.
///
/// Every call writes to a fresh uuid-named file under `output_dir`, so two
/// conversations downloading the same video never share a file.
#[instrument(skip(output_dir))]
pub async fn download_audio(url: &str, output_dir: &Path) -> Result<FetchedAudio> {
    std::fs::create_dir_all(output_dir)?;

    let file_id = uuid::Uuid::new_v4().to_string();
    let target_path = output_dir.join(format!("{}.mp3", file_id));
    let template = output_dir.join(format!("{}.%(ext)s", file_id));

    info!("Downloading audio from {}", url);

    let result = Command::new("yt-dlp")
        .arg("--format").arg("bestaudio/best")
        .arg("--extract-audio")
        .arg("--audio-format").arg("mp3")
        .arg("--audio-quality").arg("192K")
        .arg("--output").arg(&template)
        .arg("--print").arg("after_move:title")
        .arg("--no-playlist")
        .arg("--no-warnings")
        .arg(url)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await;

    let output = match result {
        Ok(o) => o,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConciergeError::ToolNotFound("yt-dlp".into()));
        }
        Err(e) => {
            return Err(ConciergeError::AudioDownload(format!("yt-dlp execution failed: {e}")));
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ConciergeError::AudioDownload(format!("yt-dlp failed: {}", stderr.trim())));
    }

    let title = parse_title(&String::from_utf8_lossy(&output.stdout));

    // yt-dlp may leave another container behind; normalize to mp3
    let downloaded = find_audio_file(output_dir, &file_id)?;

    if downloaded != target_path {
        normalize_to_mp3(&downloaded, &target_path).await?;
        let _ = std::fs::remove_file(&downloaded);
    }

    Ok(FetchedAudio {
        path: target_path,
        title,
    })
}

/// Last non-empty line printed by yt-dlp, or a placeholder.
fn parse_title(stdout: &str) -> String {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
        .unwrap_or("Unknown Title")
        .to_string()
}

/// Locates a downloaded audio file by its id.
fn find_audio_file(dir: &Path, file_id: &str) -> Result<PathBuf> {
    for ext in &["mp3", "opus", "m4a", "webm", "ogg"] {
        let candidate = dir.join(format!("{}.{}", file_id, ext));
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    let entries = std::fs::read_dir(dir)
        .map_err(|e| ConciergeError::AudioDownload(format!("Cannot read directory: {e}")))?;

    for entry in entries.flatten() {
        let name = entry.file_name();
        if name.to_string_lossy().starts_with(file_id) {
            return Ok(entry.path());
        }
    }

    Err(ConciergeError::AudioDownload("Audio file not found after download".into()))
}

/// Converts an audio file to MP3 using ffmpeg.
async fn normalize_to_mp3(source: &Path, dest: &Path) -> Result<()> {
    debug!("Converting {:?} to MP3", source);

    let result = Command::new("ffmpeg")
        .arg("-i").arg(source)
        .arg("-vn")
        .arg("-codec:a").arg("libmp3lame")
        .arg("-qscale:a").arg("2")
        .arg("-y")
        .arg("-loglevel").arg("error")
        .arg(dest)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await;

    match result {
        Ok(out) if out.status.success() => Ok(()),
        Ok(out) => {
            let err = String::from_utf8_lossy(&out.stderr);
            Err(ConciergeError::AudioDownload(format!("ffmpeg conversion failed: {err}")))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ConciergeError::ToolNotFound("ffmpeg".into()))
        }
        Err(e) => Err(ConciergeError::AudioDownload(format!("ffmpeg error: {e}"))),
    }
}

/// Splits a long audio file into segments of about `chunk_seconds`.
///
/// Returns the segment paths in playback order. Audio shorter than one chunk
/// comes back as the source path alone.
#[instrument(skip_all)]
pub async fn split_audio(
    source: &Path,
    output_dir: &Path,
    chunk_seconds: u32,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)?;

    let total_duration = probe_duration(source).await?;
    info!("Total audio duration: {:.1}s", total_duration);

    let chunk_len = f64::from(chunk_seconds.max(1));

    if total_duration <= chunk_len {
        return Ok(vec![source.to_path_buf()]);
    }

    let base_name = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("audio");

    let mut segments = Vec::new();
    let mut offset = 0.0;
    let mut idx = 0u32;

    while offset < total_duration {
        let segment_path = output_dir.join(format!("{}_{:04}.mp3", base_name, idx));
        let segment_len = chunk_len.min(total_duration - offset);

        extract_segment(source, &segment_path, offset, segment_len).await?;

        debug!("Created segment {} at offset {:.1}s", idx, offset);
        segments.push(segment_path);

        offset += chunk_len;
        idx += 1;
    }

    info!("Created {} audio segments", segments.len());
    Ok(segments)
}

/// Extracts a time segment from an audio file.
async fn extract_segment(source: &Path, dest: &Path, start: f64, length: f64) -> Result<()> {
    let copy_result = Command::new("ffmpeg")
        .arg("-ss").arg(format!("{:.3}", start))
        .arg("-i").arg(source)
        .arg("-t").arg(format!("{:.3}", length))
        .arg("-c").arg("copy")
        .arg("-y")
        .arg("-loglevel").arg("warning")
        .arg(dest)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;

    if let Ok(status) = copy_result {
        if status.success() && dest.exists() {
            return Ok(());
        }
    }

    warn!("Stream copy failed, re-encoding segment");

    let encode_result = Command::new("ffmpeg")
        .arg("-ss").arg(format!("{:.3}", start))
        .arg("-i").arg(source)
        .arg("-t").arg(format!("{:.3}", length))
        .arg("-codec:a").arg("libmp3lame")
        .arg("-qscale:a").arg("2")
        .arg("-y")
        .arg("-loglevel").arg("error")
        .arg(dest)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await;

    match encode_result {
        Ok(out) if out.status.success() => Ok(()),
        Ok(out) => {
            let err = String::from_utf8_lossy(&out.stderr);
            Err(ConciergeError::Transcription(format!("Segment extraction failed: {err}")))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ConciergeError::ToolNotFound("ffmpeg".into()))
        }
        Err(e) => Err(ConciergeError::Transcription(format!("ffmpeg error: {e}"))),
    }
}

/// Queries the duration of an audio file using ffprobe with JSON output.
async fn probe_duration(path: &Path) -> Result<f64> {
    let result = Command::new("ffprobe")
        .arg("-v").arg("quiet")
        .arg("-print_format").arg("json")
        .arg("-show_format")
        .arg(path)
        .output()
        .await;

    let output = match result {
        Ok(o) => o,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConciergeError::ToolNotFound("ffprobe".into()));
        }
        Err(e) => {
            return Err(ConciergeError::Transcription(format!("ffprobe failed: {e}")));
        }
    };

    if !output.status.success() {
        return Err(ConciergeError::Transcription(format!(
            "ffprobe could not read {}",
            path.display()
        )));
    }

    parse_duration(&String::from_utf8_lossy(&output.stdout))
}

fn parse_duration(ffprobe_json: &str) -> Result<f64> {
    let parsed: serde_json::Value = serde_json::from_str(ffprobe_json)
        .map_err(|_| ConciergeError::Transcription("Invalid ffprobe output".into()))?;

    parsed["format"]["duration"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| ConciergeError::Transcription("Could not determine audio duration".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_title_takes_last_line() {
        assert_eq!(parse_title("\nRust in 100 Seconds\n"), "Rust in 100 Seconds");
        assert_eq!(parse_title(""), "Unknown Title");
    }

    #[test]
    fn test_parse_duration() {
        let json = r#"{"format": {"filename": "a.mp3", "duration": "732.480000"}}"#;
        assert!((parse_duration(json).unwrap() - 732.48).abs() < 1e-6);
        assert!(parse_duration(r#"{"format": {}}"#).is_err());
    }

    #[test]
    fn test_find_audio_file_prefers_known_extensions() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("abc.webm"), b"x").unwrap();
        std::fs::write(dir.path().join("other.mp3"), b"x").unwrap();

        let found = find_audio_file(dir.path(), "abc").unwrap();
        assert_eq!(found, dir.path().join("abc.webm"));
        assert!(find_audio_file(dir.path(), "missing").is_err());
    }
}
