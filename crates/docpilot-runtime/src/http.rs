//! HTTP Provider
//!
//! Implementation of `LlmProvider` that sends adapter-built requests with
//! `reqwest` and hands the decoded body back to the adapter.

use std::time::Duration;

use async_trait::async_trait;
use docpilot_core::{
    error::{AgentError, Result},
    message::Message,
    provider::{LlmProvider, ProviderAdapter, ProviderId},
    tool::ToolRegistry,
};
use serde_json::Value;

pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Sends one request per model turn through a [`ProviderAdapter`]
pub struct HttpProvider {
    client: reqwest::Client,
    adapter: Box<dyn ProviderAdapter>,
    model: Option<String>,
}

impl HttpProvider {
    /// Create a provider with the default timeout
    pub fn new(adapter: impl ProviderAdapter + 'static) -> Result<Self> {
        Self::with_timeout(adapter, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(adapter: impl ProviderAdapter + 'static, timeout: Duration) -> Result<Self> {
        Self::from_adapter(Box::new(adapter), timeout)
    }

    pub fn from_adapter(adapter: Box<dyn ProviderAdapter>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AgentError::Config(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            adapter,
            model: None,
        })
    }

    /// Override the adapter's default model on every request
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into()).filter(|m| !m.is_empty());
        self
    }

    pub fn adapter(&self) -> &dyn ProviderAdapter {
        self.adapter.as_ref()
    }
}

impl std::fmt::Debug for HttpProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpProvider")
            .field("provider", &self.adapter.id())
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

/// Hide query-string API keys (`key=...`) before a URL is logged
pub fn redact_url(url: &str) -> String {
    let Some((base, query)) = url.split_once('?') else {
        return url.to_string();
    };

    let query = query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some(("key", _)) => "key=***".to_string(),
            _ => pair.to_string(),
        })
        .collect::<Vec<_>>()
        .join("&");

    format!("{base}?{query}")
}

/// Map a non-2xx response to a transport error, preferring the backend's own message
pub fn error_from_response(status: u16, body: &str) -> AgentError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.pointer("/error/message").and_then(Value::as_str).map(String::from))
        .unwrap_or_else(|| format!("API error {status}"));

    AgentError::transport(Some(status), message)
}

#[async_trait]
impl LlmProvider for HttpProvider {
    fn id(&self) -> ProviderId {
        self.adapter.id()
    }

    async fn complete(&self, transcript: &[Message], tools: &ToolRegistry) -> Result<Option<Message>> {
        let request = self
            .adapter
            .build_request(transcript, tools, self.model.as_deref())?;

        tracing::debug!(
            provider = %self.adapter.id(),
            url = %redact_url(&request.url),
            messages = transcript.len(),
            "sending completion request"
        );

        let mut builder = self.client.post(&request.url).json(&request.body);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        // reqwest errors embed the URL, which may carry a key
        let response = builder.send().await.map_err(|e| {
            let e = e.without_url();
            tracing::warn!(provider = %self.adapter.id(), "request failed: {e}");
            AgentError::transport(None, e.to_string())
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AgentError::transport(Some(status.as_u16()), e.without_url().to_string()))?;

        if !status.is_success() {
            let err = error_from_response(status.as_u16(), &body);
            tracing::warn!(
                provider = %self.adapter.id(),
                status = status.as_u16(),
                retryable = err.is_retryable(),
                "{err}"
            );
            return Err(err);
        }

        let raw: Value = serde_json::from_str(&body)
            .map_err(|e| AgentError::Protocol(format!("response is not JSON: {e}")))?;

        Ok(self.adapter.parse_response(&raw))
    }
}
