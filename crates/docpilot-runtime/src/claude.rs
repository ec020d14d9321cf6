//! Claude Adapter (Messages API)

use docpilot_core::{
    error::{AgentError, Result},
    message::{Message, Role, ToolCall},
    provider::{HttpRequest, ProviderAdapter, ProviderId},
    tool::ToolRegistry,
};
use serde_json::{Value, json};
use uuid::Uuid;

pub const CLAUDE_BASE_URL: &str = "https://api.anthropic.com";
pub const CLAUDE_DEFAULT_MODEL: &str = "claude-3-haiku-20240307";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const CLAUDE_MAX_TOKENS: u32 = 4096;

#[derive(Clone)]
pub struct ClaudeAdapter {
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl ClaudeAdapter {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            endpoint: format!("{CLAUDE_BASE_URL}/v1/messages"),
            model: CLAUDE_DEFAULT_MODEL.into(),
            api_key: api_key.filter(|k| !k.is_empty()),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.endpoint = format!("{}/v1/messages", base_url.trim_end_matches('/'));
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

impl std::fmt::Debug for ClaudeAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaudeAdapter")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .finish()
    }
}

impl ProviderAdapter for ClaudeAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Claude
    }

    fn build_request(
        &self,
        transcript: &[Message],
        tools: &ToolRegistry,
        model_hint: Option<&str>,
    ) -> Result<HttpRequest> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AgentError::Config("API key required".into()))?;

        let system = transcript
            .iter()
            .find(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .unwrap_or_default();

        let messages: Vec<Value> = transcript
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| {
                let role = if m.role == Role::Assistant { "assistant" } else { "user" };
                json!({ "role": role, "content": m.content })
            })
            .collect();

        let mut body = json!({
            "model": model_hint.unwrap_or(&self.model),
            "max_tokens": CLAUDE_MAX_TOKENS,
            "system": system,
            "messages": messages,
        });
        if !tools.is_empty() {
            body["tools"] = tools
                .descriptors()
                .iter()
                .map(|t| json!({ "name": t.name, "description": t.description, "input_schema": t.parameters }))
                .collect();
        }

        Ok(HttpRequest::new(&self.endpoint, body)
            .header("x-api-key", key)
            .header("anthropic-version", ANTHROPIC_VERSION))
    }

    fn parse_response(&self, raw: &Value) -> Option<Message> {
        let blocks = raw.get("content")?.as_array()?;
        let of_type = |kind: &str| {
            blocks
                .iter()
                .find(|b| b.get("type").and_then(Value::as_str) == Some(kind))
        };

        let text = of_type("text")
            .and_then(|b| b.get("text"))
            .and_then(Value::as_str)
            .unwrap_or_default();

        let call = of_type("tool_use").and_then(|block| {
            let name = block.get("name").and_then(Value::as_str)?;
            let id = block
                .get("id")
                .and_then(Value::as_str)
                .map_or_else(|| format!("toolu_{}", Uuid::new_v4().simple()), String::from);
            let input = match block.get("input") {
                Some(Value::Null) | None => "{}".to_string(),
                Some(input) => input.to_string(),
            };
            Some(ToolCall::new(id, name, input))
        });

        Some(Message::assistant_with_tools(text, call.into_iter().collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_and_body() {
        let adapter = ClaudeAdapter::new(Some("sk-ant".into()));
        let transcript = vec![
            Message::system("be brief"),
            Message::user("go"),
            Message::assistant_with_tools("Reading.", vec![ToolCall::new("toolu_1", "get_document_content", "{}")]),
            Message::tool("{\"success\":true}", "toolu_1"),
        ];

        let req = adapter
            .build_request(&transcript, &ToolRegistry::document_tools(), None)
            .unwrap();

        assert_eq!(req.url, "https://api.anthropic.com/v1/messages");
        assert_eq!(req.header_value("x-api-key"), Some("sk-ant"));
        assert_eq!(req.header_value("anthropic-version"), Some("2023-06-01"));
        assert_eq!(req.header_value("content-type"), Some("application/json"));
        assert!(req.header_value("Authorization").is_none());

        assert_eq!(req.body["system"], "be brief");
        assert_eq!(req.body["max_tokens"], 4096);
        assert_eq!(req.body["model"], "claude-3-haiku-20240307");

        let messages = req.body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1]["role"], "assistant");
        assert_eq!(messages[2]["role"], "user");

        let tools = req.body["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 19);
        assert!(tools[0].get("input_schema").is_some());
    }

    #[test]
    fn absent_system_is_empty_string() {
        let adapter = ClaudeAdapter::new(Some("k".into()));
        let req = adapter
            .build_request(&[Message::user("hi")], &ToolRegistry::new(), None)
            .unwrap();
        assert_eq!(req.body["system"], "");
        assert!(req.body.get("tools").is_none());
    }

    #[test]
    fn missing_key_is_a_config_error() {
        let err = ClaudeAdapter::new(None)
            .build_request(&[Message::user("hi")], &ToolRegistry::new(), None)
            .unwrap_err();
        assert!(matches!(err, AgentError::Config(_)));
    }

    #[test]
    fn tool_use_id_is_kept() {
        let adapter = ClaudeAdapter::new(Some("k".into()));
        let raw = json!({
            "content": [
                { "type": "text", "text": "Deleting." },
                { "type": "tool_use", "id": "toolu_abc", "name": "delete_text", "input": { "text": "x" } },
                { "type": "tool_use", "id": "toolu_def", "name": "get_selection", "input": {} }
            ],
            "stop_reason": "tool_use"
        });

        let message = adapter.parse_response(&raw).unwrap();
        assert_eq!(message.content, "Deleting.");
        assert_eq!(message.tool_calls.len(), 1);
        assert_eq!(message.tool_calls[0].id, "toolu_abc");
        assert_eq!(message.tool_calls[0].arguments_raw, r#"{"text":"x"}"#);
    }

    #[test]
    fn no_content_array_is_none() {
        let adapter = ClaudeAdapter::new(Some("k".into()));
        assert!(adapter.parse_response(&json!({ "type": "error" })).is_none());

        let plain = adapter
            .parse_response(&json!({ "content": [{ "type": "text", "text": "Done" }] }))
            .unwrap();
        assert_eq!(plain.content, "Done");
        assert!(!plain.has_tool_calls());
    }
}
