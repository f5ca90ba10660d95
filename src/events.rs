//! Observation events emitted while a request is being handled.
//!
//! Sinks only observe; nothing they do can change the answer.

use console::style;
use serde::Serialize;
use std::io::Write;
use std::sync::Mutex;

/// Something that happened during a request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// A tool was invoked and produced an output (or an error description).
    ToolCall {
        name: String,
        arguments: serde_json::Value,
        output: String,
        success: bool,
    },
    /// A fragment of text generated by the model.
    TextDelta { text: String },
}

/// Receiver of agent events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: AgentEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: AgentEvent) {}
}

/// Prints events to stdout as they arrive.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl EventSink for ConsoleSink {
    fn emit(&self, event: AgentEvent) {
        let mut stdout = std::io::stdout();
        match event {
            AgentEvent::ToolCall { name, arguments, output, success } => {
                let mark = if success { style("✓").green() } else { style("✗").red() };
                println!(
                    "\n{} {} {} => {}",
                    mark,
                    style(format!("[{}]", name)).dim(),
                    arguments,
                    preview(&output, 300)
                );
            }
            AgentEvent::TextDelta { text } => {
                print!("{}", style(text).dim());
            }
        }
        stdout.flush().ok();
    }
}

/// Collects events in memory, in emission order.
#[derive(Debug, Default)]
pub struct TraceSink {
    events: Mutex<Vec<AgentEvent>>,
}

impl TraceSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the collected events, leaving the sink empty.
    pub fn drain(&self) -> Vec<AgentEvent> {
        match self.events.lock() {
            Ok(mut events) => std::mem::take(&mut *events),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl EventSink for TraceSink {
    fn emit(&self, event: AgentEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

/// Truncate text for display, on a char boundary.
fn preview(text: &str, max_chars: usize) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() <= max_chars {
        flat
    } else {
        format!("{}...", flat.chars().take(max_chars).collect::<String>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_sink_keeps_order() {
        let sink = TraceSink::new();
        sink.emit(AgentEvent::TextDelta { text: "Hel".into() });
        sink.emit(AgentEvent::TextDelta { text: "lo".into() });

        let events = sink.drain();
        assert_eq!(
            events,
            vec![
                AgentEvent::TextDelta { text: "Hel".into() },
                AgentEvent::TextDelta { text: "lo".into() },
            ]
        );
        assert!(sink.drain().is_empty());
    }

    #[test]
    fn test_event_serialization() {
        let event = AgentEvent::ToolCall {
            name: "transcribe_audio".into(),
            arguments: serde_json::json!({"audio_file": "/tmp/a.mp3"}),
            output: "hello".into(),
            success: true,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "tool_call");
        assert_eq!(json["name"], "transcribe_audio");
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        assert_eq!(preview("héllo\nworld", 5), "héllo...");
        assert_eq!(preview("short", 10), "short");
    }
}
