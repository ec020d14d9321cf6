//! LLM Provider Strategy Pattern
//!
//! Two layers:
//!
//! - [`ProviderAdapter`] is the pure translation between the normalized
//!   transcript and one backend's wire format. No I/O.
//! - [`LlmProvider`] is what the agent loop calls: one model turn in, at most
//!   one normalized assistant message out. The runtime crate implements it by
//!   pairing an adapter with an HTTP client.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use docpilot_core::provider::LlmProvider;
//!
//! let provider = settings.build_provider()?;
//! let reply = provider.complete(transcript.messages(), &registry).await?;
//! ```

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AgentError, Result};
use crate::message::Message;
use crate::tool::ToolRegistry;

/// Supported model backends
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    #[default]
    OpenAi,
    Gemini,
    Claude,
    Local,
}

impl ProviderId {
    pub const ALL: [Self; 4] = [Self::OpenAi, Self::Gemini, Self::Claude, Self::Local];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Gemini => "gemini",
            Self::Claude => "claude",
            Self::Local => "local",
        }
    }

    /// Whether requests can go out without an API key
    pub const fn key_optional(self) -> bool {
        matches!(self, Self::Local)
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AgentError::Config(format!("unknown provider '{s}'")))
    }
}

/// A fully-built request, ready to POST
#[derive(Clone, Debug, PartialEq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Value,
}

impl HttpRequest {
    pub fn new(url: impl Into<String>, body: Value) -> Self {
        Self {
            url: url.into(),
            headers: vec![("Content-Type".into(), "application/json".into())],
            body,
        }
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Look up a header value by case-insensitive name
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Translation between the normalized message model and one backend's wire protocol
pub trait ProviderAdapter: Send + Sync {
    fn id(&self) -> ProviderId;

    /// Build the backend request for this transcript and tool catalog.
    ///
    /// Fails with `Config` when a required credential is missing, so that no
    /// network call is attempted.
    fn build_request(
        &self,
        transcript: &[Message],
        tools: &ToolRegistry,
        model_hint: Option<&str>,
    ) -> Result<HttpRequest>;

    /// Normalize a successful backend response into one assistant message.
    ///
    /// Returns `None` when the response carries no usable message.
    fn parse_response(&self, raw: &Value) -> Option<Message>;
}

/// Strategy trait for LLM providers
///
/// The agent works exclusively through this interface.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Backend identifier, for logs and progress reporting
    fn id(&self) -> ProviderId;

    /// Run one model turn.
    ///
    /// `Ok(None)` means the backend answered but produced no message.
    async fn complete(&self, transcript: &[Message], tools: &ToolRegistry) -> Result<Option<Message>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_ids_parse_case_insensitively() {
        assert_eq!("Gemini".parse::<ProviderId>().unwrap(), ProviderId::Gemini);
        assert_eq!(" local ".parse::<ProviderId>().unwrap(), ProviderId::Local);
        assert!(matches!("ollama".parse::<ProviderId>(), Err(AgentError::Config(_))));
    }

    #[test]
    fn provider_id_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&ProviderId::OpenAi).unwrap(), "\"openai\"");
        assert_eq!(ProviderId::Claude.to_string(), "claude");
    }

    #[test]
    fn http_request_always_sends_json() {
        let req = HttpRequest::new("http://x", Value::Null).header("x-api-key", "k");
        assert_eq!(req.header_value("content-type"), Some("application/json"));
        assert_eq!(req.header_value("X-API-KEY"), Some("k"));
    }
}
