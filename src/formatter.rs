//! Response formatting for video summaries and travel offers.
//!
//! Batches arrive from the model as parallel lists; a length mismatch is
//! reported as a literal error string rather than an `Err`, because the
//! string goes straight back into the conversation.

use serde::Serialize;
use serde_json::{Map, Value};

/// Returned when the parallel lists of a batch differ in length.
pub const LENGTH_MISMATCH: &str = "Error: Input lists must have the same length.";

/// Top-level key of the JSON video envelope.
pub const VIDEO_COLLECTION_KEY: &str = "videos";

/// How formatted output is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    #[default]
    Text,
    Json,
}

impl OutputMode {
    pub fn from_json_flag(respond_json: bool) -> Self {
        if respond_json {
            OutputMode::Json
        } else {
            OutputMode::Text
        }
    }
}

/// A rendered answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormattedResponse {
    PlainText(String),
    StructuredJson(String),
}

impl FormattedResponse {
    pub fn into_string(self) -> String {
        match self {
            FormattedResponse::PlainText(s) | FormattedResponse::StructuredJson(s) => s,
        }
    }
}

/// One summarized video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoRecord {
    #[serde(rename = "video_title")]
    pub title: String,
    pub url: String,
    pub topic: String,
    pub summary: String,
}

/// Parallel lists describing a batch of videos, as produced by the model.
#[derive(Debug, Clone, Default)]
pub struct VideoBatch<'a> {
    pub titles: &'a [String],
    pub urls: &'a [String],
    pub topics: &'a [String],
    pub summaries: &'a [String],
}

impl VideoBatch<'_> {
    /// Zip the lists into records, or `None` if their lengths differ.
    pub fn records(&self) -> Option<Vec<VideoRecord>> {
        let n = self.titles.len();
        if self.urls.len() != n || self.topics.len() != n || self.summaries.len() != n {
            return None;
        }

        Some(
            (0..n)
                .map(|i| VideoRecord {
                    title: self.titles[i].clone(),
                    url: self.urls[i].clone(),
                    topic: self.topics[i].clone(),
                    summary: self.summaries[i].clone(),
                })
                .collect(),
        )
    }
}

/// Render a video batch in the requested mode.
///
/// Mismatched lengths yield [`LENGTH_MISMATCH`] as plain text in both modes.
pub fn format_videos(batch: &VideoBatch<'_>, mode: OutputMode) -> FormattedResponse {
    let Some(records) = batch.records() else {
        return FormattedResponse::PlainText(LENGTH_MISMATCH.to_string());
    };

    match mode {
        OutputMode::Text => FormattedResponse::PlainText(video_text(&records)),
        OutputMode::Json => {
            FormattedResponse::StructuredJson(json_envelope(VIDEO_COLLECTION_KEY, &records))
        }
    }
}

fn video_text(records: &[VideoRecord]) -> String {
    let mut lines = Vec::with_capacity(records.len() * 6);

    for (i, record) in records.iter().enumerate() {
        lines.push(format!("Video {}:", i + 1));
        lines.push(format!("  Title: {}", record.title));
        lines.push(format!("  URL: {}", record.url));
        lines.push(format!("  Topic: {}", record.topic));
        lines.push(format!("  Summary: {}", record.summary));
        lines.push(String::new());
    }

    lines.join("\n")
}

/// Serialize records under a single top-level key with 2-space indentation.
pub fn json_envelope<T: Serialize>(key: &str, records: &[T]) -> String {
    let items = records
        .iter()
        .map(serde_json::to_value)
        .collect::<std::result::Result<Vec<Value>, _>>();

    let mut envelope = Map::new();
    match items {
        Ok(items) => {
            envelope.insert(key.to_string(), Value::Array(items));
        }
        Err(e) => return format!("Error: could not serialize {}: {}", key, e),
    }

    serde_json::to_string_pretty(&Value::Object(envelope))
        .unwrap_or_else(|e| format!("Error: could not serialize {}: {}", key, e))
}

/// A record that can be rendered as a table row.
pub trait TableRecord: Serialize {
    fn headers() -> Vec<String>;
    fn cells(&self) -> Vec<String>;
}

/// Render records as an aligned text table with a header row.
pub fn format_table<R: TableRecord>(records: &[R]) -> String {
    let headers = R::headers();
    let rows: Vec<Vec<String>> = records.iter().map(TableRecord::cells).collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(col, header)| {
            rows.iter()
                .filter_map(|row| row.get(col))
                .map(|cell| cell.chars().count())
                .chain(std::iter::once(header.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let render = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:>width$}", cell, width = *width))
            .collect::<Vec<_>>()
            .join("  ")
    };

    std::iter::once(render(headers.as_slice()))
        .chain(rows.iter().map(|row| render(row.as_slice())))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render records as a table or a JSON envelope under `key`.
pub fn format_records<R: TableRecord>(
    key: &str,
    records: &[R],
    mode: OutputMode,
) -> FormattedResponse {
    match mode {
        OutputMode::Text => FormattedResponse::PlainText(format_table(records)),
        OutputMode::Json => FormattedResponse::StructuredJson(json_envelope(key, records)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_text_mode_numbers_blocks_in_order() {
        let titles = strings(&["Rust in 100 Seconds", "Async Rust"]);
        let urls = strings(&["https://youtu.be/5C_HPTJg5ek", "https://youtu.be/ThjvMReOXYM"]);
        let topics = strings(&["Programming", "Concurrency"]);
        let summaries = strings(&["A fast intro.", "Futures explained."]);
        let batch = VideoBatch {
            titles: &titles,
            urls: &urls,
            topics: &topics,
            summaries: &summaries,
        };

        let text = format_videos(&batch, OutputMode::Text).into_string();
        let expected = "Video 1:\n  Title: Rust in 100 Seconds\n  URL: https://youtu.be/5C_HPTJg5ek\n  Topic: Programming\n  Summary: A fast intro.\n\nVideo 2:\n  Title: Async Rust\n  URL: https://youtu.be/ThjvMReOXYM\n  Topic: Concurrency\n  Summary: Futures explained.\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_text_mode_empty_batch() {
        let batch = VideoBatch::default();
        assert_eq!(format_videos(&batch, OutputMode::Text), FormattedResponse::PlainText(String::new()));
    }

    #[test]
    fn test_mismatched_lengths_in_both_modes() {
        let titles = strings(&["a", "b"]);
        let urls = strings(&["u"]);
        let topics = strings(&["t", "t"]);
        let summaries = strings(&["s", "s"]);
        let batch = VideoBatch {
            titles: &titles,
            urls: &urls,
            topics: &topics,
            summaries: &summaries,
        };

        assert_eq!(format_videos(&batch, OutputMode::Text).into_string(), LENGTH_MISMATCH);
        assert_eq!(format_videos(&batch, OutputMode::Json).into_string(), LENGTH_MISMATCH);
    }

    #[test]
    fn test_json_mode_parses_back_in_order() {
        let titles = strings(&["First", "Second", "Third"]);
        let urls = strings(&["u1", "u2", "u3"]);
        let topics = strings(&["t1", "t2", "t3"]);
        let summaries = strings(&["s1", "s2", "s3"]);
        let batch = VideoBatch {
            titles: &titles,
            urls: &urls,
            topics: &topics,
            summaries: &summaries,
        };

        let json = format_videos(&batch, OutputMode::Json);
        let FormattedResponse::StructuredJson(json) = json else {
            panic!("Expected JSON output");
        };
        assert!(json.contains("\n  \"videos\": ["));

        let parsed: Value = serde_json::from_str(&json).unwrap();
        let videos = parsed["videos"].as_array().unwrap();
        assert_eq!(videos.len(), 3);
        for (i, video) in videos.iter().enumerate() {
            assert_eq!(video["video_title"], titles[i].as_str());
            assert_eq!(video["url"], urls[i].as_str());
            assert_eq!(video["topic"], topics[i].as_str());
            assert_eq!(video["summary"], summaries[i].as_str());
        }
    }

    #[derive(Serialize)]
    struct Row {
        name: String,
        price: String,
    }

    impl TableRecord for Row {
        fn headers() -> Vec<String> {
            vec!["Name".to_string(), "Price".to_string()]
        }

        fn cells(&self) -> Vec<String> {
            vec![self.name.clone(), self.price.clone()]
        }
    }

    #[test]
    fn test_format_table_aligns_columns() {
        let rows = vec![
            Row { name: "Savoy".into(), price: "420.00 GBP".into() },
            Row { name: "Premier Inn".into(), price: "89.50 GBP".into() },
        ];

        let table = format_table(&rows);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "       Name       Price");
        assert_eq!(lines[1], "      Savoy  420.00 GBP");
        assert_eq!(lines[2], "Premier Inn   89.50 GBP");
    }

    #[test]
    fn test_format_records_json_envelope() {
        let rows = vec![Row { name: "Savoy".into(), price: "420".into() }];
        let json = format_records("hotels", &rows, OutputMode::Json).into_string();
        let parsed: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["hotels"][0]["name"], "Savoy");
    }
}
