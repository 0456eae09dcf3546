//! Chat Completions wire format and conversions to and from crate types

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    CompletionRequest, ContentBlock, LLMError, Message, MessageContent, Result, Role, StopReason,
    ToolDefinition,
};

#[derive(Debug, Serialize)]
pub(super) struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ChatTool>>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub stream: bool,
}

impl ChatRequest {
    pub(super) fn from_request(request: CompletionRequest, stream: bool) -> Self {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(system) = request.system {
            messages.push(ChatMessage::text("system", system));
        }
        for message in request.messages {
            messages.extend(ChatMessage::from_message(message));
        }

        Self {
            model: request.model,
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            tools: request
                .tools
                .map(|tools| tools.iter().map(ChatTool::from_definition).collect()),
            stream,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct ChatMessage {
    pub role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ChatToolCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    fn text(role: &'static str, text: String) -> Self {
        Self {
            role,
            content: Some(text),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// One crate message may expand to several wire messages: every tool
    /// result becomes its own `tool` message after the main one.
    fn from_message(message: Message) -> Vec<Self> {
        let role = match message.role {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        };

        let blocks = match message.content {
            Some(MessageContent::Text(text)) => return vec![Self::text(role, text)],
            Some(MessageContent::Blocks(blocks)) => blocks,
            None => return vec![Self::text(role, String::new())],
        };

        let mut text = String::new();
        let mut tool_calls = Vec::new();
        let mut results = Vec::new();
        for block in blocks {
            match block {
                ContentBlock::Text { text: t } => text.push_str(&t),
                ContentBlock::ToolUse { id, name, input } => tool_calls.push(ChatToolCall {
                    id,
                    kind: "function",
                    function: ChatFunctionCall {
                        name,
                        arguments: input.to_string(),
                    },
                }),
                ContentBlock::ToolResult {
                    tool_use_id,
                    content,
                    ..
                } => results.push(Self {
                    role: "tool",
                    content: Some(content),
                    tool_calls: Vec::new(),
                    tool_call_id: Some(tool_use_id),
                }),
            }
        }

        let mut out = Vec::with_capacity(results.len() + 1);
        if !text.is_empty() || !tool_calls.is_empty() {
            out.push(Self {
                role,
                content: (!text.is_empty()).then_some(text),
                tool_calls,
                tool_call_id: None,
            });
        }
        out.extend(results);
        out
    }
}

#[derive(Debug, Serialize)]
pub(super) struct ChatTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: ChatFunction,
}

impl ChatTool {
    fn from_definition(tool: &ToolDefinition) -> Self {
        Self {
            kind: "function",
            function: ChatFunction {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.input_schema.clone(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub(super) struct ChatToolCall {
    id: String,
    #[serde(rename = "type")]
    kind: &'static str,
    function: ChatFunctionCall,
}

#[derive(Debug, Serialize)]
struct ChatFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct ChatResponse {
    pub choices: Vec<ChatChoice>,
    #[serde(default)]
    pub usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ChatChoice {
    pub message: ChatResponseMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ChatResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Vec<ChatResponseToolCall>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ChatResponseToolCall {
    pub id: String,
    pub function: ChatResponseFunction,
}

#[derive(Debug, Deserialize)]
pub(super) struct ChatResponseFunction {
    pub name: String,
    pub arguments: String,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct ChatUsage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
}

impl ChatResponseMessage {
    pub(super) fn into_message(self) -> Result<Message> {
        let mut blocks = Vec::new();
        if let Some(text) = self.content.filter(|t| !t.is_empty()) {
            blocks.push(ContentBlock::Text { text });
        }
        for call in self.tool_calls {
            let input = if call.function.arguments.trim().is_empty() {
                serde_json::Value::Object(serde_json::Map::new())
            } else {
                serde_json::from_str(&call.function.arguments).map_err(|e| {
                    LLMError::UnexpectedResponse(format!(
                        "tool call '{}' has invalid arguments: {e}",
                        call.function.name
                    ))
                })?
            };
            blocks.push(ContentBlock::ToolUse {
                id: call.id,
                name: call.function.name,
                input,
            });
        }

        Ok(Message {
            role: Role::Assistant,
            content: Some(MessageContent::Blocks(blocks)),
        })
    }
}

pub(super) fn map_stop_reason(reason: Option<&str>) -> StopReason {
    match reason {
        Some("length") => StopReason::MaxTokens,
        Some("tool_calls") => StopReason::ToolUse,
        Some("stop") | None => StopReason::EndTurn,
        Some(other) => {
            debug!(reason = other, "unmapped finish reason");
            StopReason::EndTurn
        }
    }
}
