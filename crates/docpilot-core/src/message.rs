//! Conversation Messages
//!
//! Normalized message format shared by every provider adapter, and the
//! append-only [`Transcript`] that carries one run's context.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AgentError, Result};

/// Role of a message sender
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System prompt/instructions
    System,
    /// User input
    User,
    /// Assistant (LLM) response
    Assistant,
    /// Tool result (injected as context)
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::Tool => write!(f, "tool"),
        }
    }
}

/// Tool call request from the LLM, normalized across providers
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Call ID, echoed back on the matching tool message
    pub id: String,

    /// Tool identifier
    pub name: String,

    /// Arguments exactly as the model produced them (untrusted JSON text)
    pub arguments_raw: String,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments_raw: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments_raw: arguments_raw.into(),
        }
    }

    /// Parse the raw arguments into a JSON object.
    ///
    /// Empty or whitespace-only text is an empty object. Anything that is not
    /// a JSON object is a `ToolArgument` error.
    pub fn parse_arguments(&self) -> Result<Map<String, Value>> {
        if self.arguments_raw.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str::<Value>(&self.arguments_raw) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(AgentError::ToolArgument(format!(
                "expected a JSON object for '{}', got {}",
                self.name,
                json_kind(&other)
            ))),
            Err(e) => Err(AgentError::ToolArgument(format!(
                "arguments for '{}' are not valid JSON: {e}",
                self.name
            ))),
        }
    }

    /// Parse the raw arguments, falling back to an empty object.
    ///
    /// Malformed model output is logged, not hidden: the tool still runs and
    /// reports the missing parameters back to the model.
    pub fn arguments_or_empty(&self) -> Map<String, Value> {
        self.parse_arguments().unwrap_or_else(|e| {
            tracing::warn!(
                tool = %self.name,
                call_id = %self.id,
                error = %e,
                "malformed tool arguments, using empty object"
            );
            Map::new()
        })
    }
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// A single message in a conversation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Message role
    pub role: Role,

    /// Text content
    pub content: String,

    /// Tool calls requested by an assistant message
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,

    /// Tool call ID (for tool messages)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    /// Create a new message
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create an assistant message that requests tool calls
    pub fn assistant_with_tools(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        let mut msg = Self::new(Role::Assistant, content);
        msg.tool_calls = tool_calls;
        msg
    }

    /// Create a tool result message
    pub fn tool(content: impl Into<String>, tool_call_id: impl Into<String>) -> Self {
        let mut msg = Self::new(Role::Tool, content);
        msg.tool_call_id = Some(tool_call_id.into());
        msg
    }

    /// Whether the model asked for at least one tool invocation
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

fn make_call_ids_unique(calls: &mut [ToolCall]) {
    let mut seen = HashSet::new();
    for call in calls {
        if !seen.contains(&call.id) {
            seen.insert(call.id.clone());
            continue;
        }
        let mut n = 2;
        while seen.contains(&format!("{}_{n}", call.id)) {
            n += 1;
        }
        tracing::warn!(call_id = %call.id, "repeated tool call id renamed");
        call.id = format!("{}_{n}", call.id);
        seen.insert(call.id.clone());
    }
}

/// Ordered message history for one run.
///
/// Append-only: there is no mutable access to past messages. Tool messages
/// are only accepted for call IDs issued by the latest assistant message,
/// at most once each.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    /// Seed a transcript with the system prompt and the user's request
    pub fn seeded(system_prompt: impl Into<String>, user_request: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(system_prompt), Message::user(user_request)],
        }
    }

    /// Get all messages
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Get the last message
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// The system prompt, if the transcript was seeded with one
    pub fn system_prompt(&self) -> Option<&str> {
        self.messages
            .first()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
    }

    /// Append an assistant message and return the tool calls it requests.
    ///
    /// A call ID repeated within the message is renamed (`id_2`, `id_3`, ...)
    /// so that every call can be answered by exactly one tool message.
    pub fn push_assistant(&mut self, mut message: Message) -> Result<&[ToolCall]> {
        if message.role != Role::Assistant {
            return Err(AgentError::Protocol(format!(
                "expected an assistant message, got {}",
                message.role
            )));
        }
        make_call_ids_unique(&mut message.tool_calls);
        self.messages.push(message);
        Ok(self.messages.last().map(|m| m.tool_calls.as_slice()).unwrap_or_default())
    }

    /// Append the result of one tool call.
    ///
    /// Rejected unless `tool_call_id` was issued by the latest assistant
    /// message and has not been answered yet.
    pub fn push_tool_result(&mut self, tool_call_id: &str, content: impl Into<String>) -> Result<()> {
        let (answered, issuer) = self.pending_window();

        let issued = issuer.is_some_and(|m| m.tool_calls.iter().any(|c| c.id == tool_call_id));
        if !issued {
            return Err(AgentError::Protocol(format!(
                "tool result for unknown call id '{tool_call_id}'"
            )));
        }
        if answered.iter().any(|id| *id == tool_call_id) {
            return Err(AgentError::Protocol(format!(
                "tool call '{tool_call_id}' already has a result"
            )));
        }

        self.messages.push(Message::tool(content, tool_call_id));
        Ok(())
    }

    /// Tool call IDs already answered since the latest assistant message,
    /// plus that assistant message.
    fn pending_window(&self) -> (Vec<&str>, Option<&Message>) {
        let mut answered = Vec::new();
        for message in self.messages.iter().rev() {
            match message.role {
                Role::Tool => {
                    if let Some(id) = message.tool_call_id.as_deref() {
                        answered.push(id);
                    }
                }
                Role::Assistant => return (answered, Some(message)),
                _ => break,
            }
        }
        (answered, None)
    }

    /// Number of messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Estimate total tokens in the transcript (rough approximation)
    pub fn estimate_tokens(&self) -> usize {
        // ~4 characters per token, +4 per message for role overhead
        self.messages
            .iter()
            .map(|m| m.content.len() / 4 + 4 + m.tool_calls.iter().map(|c| c.arguments_raw.len() / 4).sum::<usize>())
            .sum()
    }
}
