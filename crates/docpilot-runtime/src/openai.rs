//! OpenAI-compatible Adapter
//!
//! Chat Completions wire format. Also used for local servers (LM Studio,
//! llama.cpp, vLLM, ...) that speak the same protocol, in which case the API
//! key is optional.

use docpilot_core::{
    error::{AgentError, Result},
    message::{Message, Role, ToolCall},
    provider::{HttpRequest, ProviderAdapter, ProviderId},
    tool::ToolRegistry,
};
use serde_json::{Value, json};
use uuid::Uuid;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const LOCAL_DEFAULT_URL: &str = "http://localhost:1234/v1/chat/completions";
pub const LOCAL_DEFAULT_MODEL: &str = "local";

/// Adapter for OpenAI and OpenAI-compatible local servers
#[derive(Clone)]
pub struct OpenAiAdapter {
    id: ProviderId,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAiAdapter {
    /// The hosted OpenAI API
    pub fn openai(api_key: Option<String>) -> Self {
        Self {
            id: ProviderId::OpenAi,
            endpoint: format!("{OPENAI_BASE_URL}/v1/chat/completions"),
            model: OPENAI_DEFAULT_MODEL.into(),
            api_key: api_key.filter(|k| !k.is_empty()),
        }
    }

    /// A local OpenAI-compatible server at `url` (the full completions URL)
    pub fn local(url: impl Into<String>, model: Option<String>, api_key: Option<String>) -> Self {
        Self {
            id: ProviderId::Local,
            endpoint: url.into(),
            model: model
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| LOCAL_DEFAULT_MODEL.into()),
            api_key: api_key.filter(|k| !k.is_empty()),
        }
    }

    /// Point a hosted adapter at another base URL
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.endpoint = format!("{}/v1/chat/completions", base_url.trim_end_matches('/'));
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl std::fmt::Debug for OpenAiAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiAdapter")
            .field("id", &self.id)
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Serialize one message in Chat Completions form
pub(crate) fn wire_message(message: &Message) -> Value {
    let mut wire = json!({
        "role": message.role.to_string(),
        "content": message.content,
    });

    if message.role == Role::Assistant && message.has_tool_calls() {
        wire["tool_calls"] = message
            .tool_calls
            .iter()
            .map(|call| {
                json!({
                    "id": call.id,
                    "type": "function",
                    "function": { "name": call.name, "arguments": call.arguments_raw },
                })
            })
            .collect();
    }
    if let Some(id) = &message.tool_call_id {
        wire["tool_call_id"] = json!(id);
    }

    wire
}

fn parse_tool_call(raw: &Value) -> Option<ToolCall> {
    let function = raw.get("function")?;
    let Some(name) = function.get("name").and_then(Value::as_str) else {
        tracing::warn!("tool call without a function name ignored");
        return None;
    };

    let arguments = match function.get("arguments") {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };

    let id = raw
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map_or_else(|| format!("call_{}", Uuid::new_v4().simple()), String::from);

    Some(ToolCall::new(id, name, arguments))
}

impl ProviderAdapter for OpenAiAdapter {
    fn id(&self) -> ProviderId {
        self.id
    }

    fn build_request(
        &self,
        transcript: &[Message],
        tools: &ToolRegistry,
        model_hint: Option<&str>,
    ) -> Result<HttpRequest> {
        if self.api_key.is_none() && !self.id.key_optional() {
            return Err(AgentError::Config("API key required".into()));
        }

        let mut body = json!({
            "model": model_hint.unwrap_or(&self.model),
            "messages": transcript.iter().map(wire_message).collect::<Vec<_>>(),
        });
        if !tools.is_empty() {
            body["tools"] = Value::Array(tools.function_schemas());
            body["tool_choice"] = json!("auto");
        }

        let mut request = HttpRequest::new(&self.endpoint, body);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }
        Ok(request)
    }

    fn parse_response(&self, raw: &Value) -> Option<Message> {
        let message = raw.get("choices")?.get(0)?.get("message")?;

        let content = message.get("content").and_then(Value::as_str).unwrap_or_default();
        let tool_calls = message
            .get("tool_calls")
            .and_then(Value::as_array)
            .map(|calls| calls.iter().filter_map(parse_tool_call).collect())
            .unwrap_or_default();

        Some(Message::assistant_with_tools(content, tool_calls))
    }
}
