//! Language model backend abstraction.
//!
//! The orchestrator treats the model as an oracle: given the conversation and
//! the tool catalog it either requests tool calls or answers.

mod openai;

pub use openai::OpenAiBackend;

use crate::catalog::ToolCatalog;
use crate::error::Result;
use crate::events::EventSink;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedCall {
    /// Backend-assigned id that ties the result to the request.
    pub id: String,
    pub name: String,
    /// Raw JSON arguments as produced by the model.
    pub arguments: String,
}

/// Backend-neutral conversation message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum ChatMessage {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        content: Option<String>,
        tool_calls: Vec<RequestedCall>,
    },
    Tool {
        call_id: String,
        content: String,
    },
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        ChatMessage::System { content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage::User { content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        ChatMessage::Assistant {
            content: Some(content.into()),
            tool_calls: Vec::new(),
        }
    }

    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        ChatMessage::Tool {
            call_id: call_id.into(),
            content: content.into(),
        }
    }
}

/// One model response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelReply {
    /// Content blocks in generation order.
    pub blocks: Vec<String>,
    /// Tool calls requested by the model, in request order.
    pub tool_calls: Vec<RequestedCall>,
}

impl ModelReply {
    /// A reply with a single text block and no tool calls.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            blocks: vec![content.into()],
            tool_calls: Vec::new(),
        }
    }

    /// A reply requesting tool calls.
    pub fn calls(tool_calls: Vec<RequestedCall>) -> Self {
        Self {
            blocks: Vec::new(),
            tool_calls,
        }
    }

    /// The answer text: the last content block only.
    pub fn final_text(&self) -> &str {
        self.blocks.last().map(String::as_str).unwrap_or_default()
    }

    /// All blocks joined, for keeping the assistant turn in history.
    pub fn joined_text(&self) -> Option<String> {
        if self.blocks.is_empty() {
            None
        } else {
            Some(self.blocks.join("\n"))
        }
    }
}

/// Trait for language model backends.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Run one generation step with the tool catalog available.
    ///
    /// Text is forwarded to `sink` as it is generated.
    async fn generate(
        &self,
        messages: &[ChatMessage],
        tools: &ToolCatalog,
        sink: &dyn EventSink,
    ) -> Result<ModelReply>;

    /// Single-prompt completion without tools.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_final_text_is_last_block() {
        let reply = ModelReply {
            blocks: vec!["Let me think...".into(), "Here is the summary.".into()],
            tool_calls: Vec::new(),
        };
        assert_eq!(reply.final_text(), "Here is the summary.");
        assert_eq!(ModelReply::default().final_text(), "");
    }

    #[test]
    fn test_message_serialization() {
        let msg = ChatMessage::tool_result("call_1", "done");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "tool");
        assert_eq!(json["call_id"], "call_1");
    }
}
