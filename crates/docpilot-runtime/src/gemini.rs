//! Gemini Adapter
//!
//! `generateContent` wire format. The API key travels in the query string,
//! so URLs must go through [`crate::http::redact_url`] before being logged.

use docpilot_core::{
    error::{AgentError, Result},
    message::{Message, Role, ToolCall},
    provider::{HttpRequest, ProviderAdapter, ProviderId},
    tool::ToolRegistry,
};
use serde_json::{Value, json};
use uuid::Uuid;

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const GEMINI_DEFAULT_MODEL: &str = "gemini-1.5-flash";

#[derive(Clone)]
pub struct GeminiAdapter {
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl GeminiAdapter {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            base_url: GEMINI_BASE_URL.into(),
            model: GEMINI_DEFAULT_MODEL.into(),
            api_key: api_key.filter(|k| !k.is_empty()),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

impl std::fmt::Debug for GeminiAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiAdapter")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .finish()
    }
}

impl ProviderAdapter for GeminiAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Gemini
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
        let model = model_hint.unwrap_or(&self.model);

        let contents: Vec<Value> = transcript
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| {
                let role = if m.role == Role::Assistant { "model" } else { "user" };
                json!({ "role": role, "parts": [{ "text": m.content }] })
            })
            .collect();

        let mut body = json!({ "contents": contents });

        if let Some(system) = transcript.iter().find(|m| m.role == Role::System) {
            body["systemInstruction"] = json!({ "parts": [{ "text": system.content }] });
        }
        if !tools.is_empty() {
            let declarations: Vec<Value> = tools
                .descriptors()
                .iter()
                .map(|t| json!({ "name": t.name, "description": t.description, "parameters": t.parameters }))
                .collect();
            body["tools"] = json!([{ "functionDeclarations": declarations }]);
        }

        Ok(HttpRequest::new(
            format!("{}/v1beta/models/{model}:generateContent?key={key}", self.base_url),
            body,
        ))
    }

    fn parse_response(&self, raw: &Value) -> Option<Message> {
        let candidates = raw.get("candidates")?.as_array()?;
        let parts = candidates
            .first()
            .and_then(|c| c.pointer("/content/parts"))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let text = parts
            .iter()
            .find_map(|p| p.get("text").and_then(Value::as_str).filter(|t| !t.is_empty()))
            .unwrap_or_default();

        // Only the first function call of a turn is honored
        let call = parts.iter().find_map(|p| p.get("functionCall")).and_then(|fc| {
            let name = fc.get("name").and_then(Value::as_str)?;
            let args = match fc.get("args") {
                Some(Value::Null) | None => "{}".to_string(),
                Some(args) => args.to_string(),
            };
            Some(ToolCall::new(format!("g-{}", Uuid::new_v4().simple()), name, args))
        });

        Some(Message::assistant_with_tools(text, call.into_iter().collect()))
    }
}
