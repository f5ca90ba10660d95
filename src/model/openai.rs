//! OpenAI-compatible chat completions backend.

use super::{ChatMessage, ModelBackend, ModelReply, RequestedCall};
use crate::catalog::ToolCatalog;
use crate::config::ModelSettings;
use crate::error::{ConciergeError, Result};
use crate::events::{AgentEvent, EventSink};
use crate::openai::create_client;
use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionTool, ChatCompletionToolType, CreateChatCompletionRequest,
    CreateChatCompletionRequestArgs, FunctionCall, FunctionObject,
};
use async_openai::Client;
use async_trait::async_trait;
use futures::StreamExt;
use tracing::{debug, instrument};

/// Chat backend speaking the OpenAI chat completions protocol.
///
/// The client is cheap to share: every call carries its own messages.
pub struct OpenAiBackend {
    client: Client<OpenAIConfig>,
    model: String,
    stream: bool,
}

impl OpenAiBackend {
    /// Create a backend from model settings.
    pub fn new(settings: &ModelSettings) -> Result<Self> {
        Ok(Self {
            client: create_client(settings)?,
            model: settings.model.clone(),
            stream: settings.stream,
        })
    }

    fn build_request(
        &self,
        messages: &[ChatMessage],
        tools: &ToolCatalog,
    ) -> Result<CreateChatCompletionRequest> {
        let messages = messages
            .iter()
            .map(to_request_message)
            .collect::<Result<Vec<_>>>()?;

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder.model(&self.model).messages(messages);
        if !tools.is_empty() {
            builder.tools(tool_definitions(tools));
        }

        builder.build().map_err(build_error)
    }

    async fn generate_streaming(
        &self,
        request: CreateChatCompletionRequest,
        sink: &dyn EventSink,
    ) -> Result<ModelReply> {
        let mut stream = self
            .client
            .chat()
            .create_stream(request)
            .await
            .map_err(upstream_error)?;

        let mut text = String::new();
        let mut calls: Vec<RequestedCall> = Vec::new();

        while let Some(item) = stream.next().await {
            let response = item.map_err(upstream_error)?;

            // Only the first choice is ever requested.
            let Some(choice) = response.choices.into_iter().next() else {
                continue;
            };

            if let Some(delta) = choice.delta.content {
                if !delta.is_empty() {
                    sink.emit(AgentEvent::TextDelta { text: delta.clone() });
                    text.push_str(&delta);
                }
            }

            for chunk in choice.delta.tool_calls.unwrap_or_default() {
                let index = chunk.index as usize;
                while calls.len() <= index {
                    calls.push(RequestedCall {
                        id: String::new(),
                        name: String::new(),
                        arguments: String::new(),
                    });
                }

                let slot = &mut calls[index];
                if let Some(id) = chunk.id {
                    slot.id = id;
                }
                if let Some(function) = chunk.function {
                    if let Some(name) = function.name {
                        slot.name.push_str(&name);
                    }
                    if let Some(arguments) = function.arguments {
                        slot.arguments.push_str(&arguments);
                    }
                }
            }
        }

        Ok(reply_from_parts(text, calls))
    }

    async fn generate_once(
        &self,
        request: CreateChatCompletionRequest,
        sink: &dyn EventSink,
    ) -> Result<ModelReply> {
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(upstream_error)?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ConciergeError::Upstream("No response from model".to_string()))?;

        let text = choice.message.content.unwrap_or_default();
        if !text.is_empty() {
            sink.emit(AgentEvent::TextDelta { text: text.clone() });
        }

        let calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| RequestedCall {
                id: call.id,
                name: call.function.name,
                arguments: call.function.arguments,
            })
            .collect();

        Ok(reply_from_parts(text, calls))
    }
}

#[async_trait]
impl ModelBackend for OpenAiBackend {
    #[instrument(skip_all, fields(model = %self.model, messages = messages.len()))]
    async fn generate(
        &self,
        messages: &[ChatMessage],
        tools: &ToolCatalog,
        sink: &dyn EventSink,
    ) -> Result<ModelReply> {
        let request = self.build_request(messages, tools)?;

        let reply = if self.stream {
            self.generate_streaming(request, sink).await?
        } else {
            self.generate_once(request, sink).await?
        };

        debug!(
            "Model replied with {} block(s) and {} tool call(s)",
            reply.blocks.len(),
            reply.tool_calls.len()
        );
        Ok(reply)
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![to_request_message(&ChatMessage::user(prompt))?])
            .build()
            .map_err(build_error)?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(upstream_error)?;

        Ok(response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }
}

fn reply_from_parts(text: String, calls: Vec<RequestedCall>) -> ModelReply {
    let blocks = if text.trim().is_empty() { Vec::new() } else { vec![text] };
    ModelReply {
        blocks,
        tool_calls: calls,
    }
}

fn upstream_error(e: OpenAIError) -> ConciergeError {
    ConciergeError::Upstream(e.to_string())
}

fn build_error(e: OpenAIError) -> ConciergeError {
    ConciergeError::Upstream(format!("Failed to build request: {}", e))
}

/// Convert a backend-neutral message into the OpenAI request type.
fn to_request_message(message: &ChatMessage) -> Result<ChatCompletionRequestMessage> {
    let converted: ChatCompletionRequestMessage = match message {
        ChatMessage::System { content } => ChatCompletionRequestSystemMessageArgs::default()
            .content(content.as_str())
            .build()
            .map_err(build_error)?
            .into(),
        ChatMessage::User { content } => ChatCompletionRequestUserMessageArgs::default()
            .content(content.as_str())
            .build()
            .map_err(build_error)?
            .into(),
        ChatMessage::Assistant { content, tool_calls } => {
            let mut builder = ChatCompletionRequestAssistantMessageArgs::default();
            if let Some(content) = content {
                builder.content(content.as_str());
            }
            if !tool_calls.is_empty() {
                builder.tool_calls(
                    tool_calls
                        .iter()
                        .map(|call| ChatCompletionMessageToolCall {
                            id: call.id.clone(),
                            r#type: ChatCompletionToolType::Function,
                            function: FunctionCall {
                                name: call.name.clone(),
                                arguments: call.arguments.clone(),
                            },
                        })
                        .collect::<Vec<_>>(),
                );
            }
            builder.build().map_err(build_error)?.into()
        }
        ChatMessage::Tool { call_id, content } => ChatCompletionRequestToolMessageArgs::default()
            .tool_call_id(call_id.as_str())
            .content(content.as_str())
            .build()
            .map_err(build_error)?
            .into(),
    };

    Ok(converted)
}

/// Get OpenAI function/tool definitions for a catalog.
fn tool_definitions(catalog: &ToolCatalog) -> Vec<ChatCompletionTool> {
    catalog
        .tools()
        .iter()
        .map(|spec| ChatCompletionTool {
            r#type: ChatCompletionToolType::Function,
            function: FunctionObject {
                name: spec.name.clone(),
                description: Some(spec.description.clone()),
                parameters: Some(spec.json_schema()),
                strict: None,
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ParamSpec, ParamType, ToolSpec};

    #[test]
    fn test_tool_definitions_carry_schema() {
        let mut catalog = ToolCatalog::new();
        catalog
            .register(ToolSpec::new(
                "transcribe_audio",
                "Transcribe an audio file",
                vec![ParamSpec::required("audio_file", ParamType::String, "Path")],
            ))
            .unwrap();

        let tools = tool_definitions(&catalog);
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].function.name, "transcribe_audio");
        let schema = tools[0].function.parameters.as_ref().unwrap();
        assert_eq!(schema["required"][0], "audio_file");
    }

    #[test]
    fn test_assistant_tool_calls_convert() {
        let message = ChatMessage::Assistant {
            content: None,
            tool_calls: vec![RequestedCall {
                id: "call_1".into(),
                name: "flight_search".into(),
                arguments: "{}".into(),
            }],
        };
        let converted = to_request_message(&message).unwrap();
        assert!(matches!(converted, ChatCompletionRequestMessage::Assistant(_)));
    }

    #[test]
    fn test_blank_text_produces_no_block() {
        let reply = reply_from_parts("  \n".into(), Vec::new());
        assert!(reply.blocks.is_empty());
    }
}
