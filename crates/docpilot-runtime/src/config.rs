//! Provider Settings
//!
//! Which backend to talk to and how, loaded from the environment or from a
//! [`ConfigStore`].

use std::sync::Arc;
use std::time::Duration;

use docpilot_core::{
    error::{AgentError, Result},
    provider::{LlmProvider, ProviderAdapter, ProviderId},
    settings::{ConfigStore, keys},
};

use crate::{
    claude::ClaudeAdapter,
    gemini::GeminiAdapter,
    http::{DEFAULT_TIMEOUT_SECS, HttpProvider},
    openai::{LOCAL_DEFAULT_URL, OpenAiAdapter},
};

/// Provider selection and connection settings
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    pub provider: ProviderId,
    pub api_key: Option<String>,
    /// Model override; each adapter has its own default
    pub model: Option<String>,
    /// Full completions URL of a local OpenAI-compatible server
    pub local_url: Option<String>,
    pub local_model: Option<String>,
    /// Base URL override for the hosted providers
    pub base_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            provider: ProviderId::default(),
            api_key: None,
            model: None,
            local_url: None,
            local_model: None,
            base_url: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl std::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("provider", &self.provider)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("model", &self.model)
            .field("local_url", &self.local_url)
            .field("local_model", &self.local_model)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl ProviderSettings {
    /// Load from `DOCPILOT_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from any variable source, e.g. a map in tests
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let provider = match non_empty(lookup("DOCPILOT_PROVIDER")) {
            Some(name) => name.parse()?,
            None => ProviderId::default(),
        };

        let timeout_secs = match non_empty(lookup("DOCPILOT_TIMEOUT_SECS")) {
            Some(secs) => secs
                .parse()
                .map_err(|_| AgentError::Config(format!("invalid DOCPILOT_TIMEOUT_SECS: {secs}")))?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            provider,
            api_key: non_empty(lookup("DOCPILOT_API_KEY")),
            model: non_empty(lookup("DOCPILOT_MODEL")),
            local_url: non_empty(lookup("DOCPILOT_LOCAL_URL")),
            local_model: non_empty(lookup("DOCPILOT_LOCAL_MODEL")),
            base_url: non_empty(lookup("DOCPILOT_BASE_URL")),
            timeout_secs,
        })
    }

    /// Load the user's saved provider settings
    pub fn from_store(store: &dyn ConfigStore) -> Result<Self> {
        let provider = match store.get_string(keys::PROVIDER)? {
            Some(name) => name.parse()?,
            None => ProviderId::default(),
        };

        Ok(Self {
            provider,
            api_key: store.get_string(keys::API_KEY)?,
            model: store.get_string(keys::MODEL)?,
            local_url: store.get_string(keys::LOCAL_URL)?,
            local_model: store.get_string(keys::LOCAL_MODEL)?,
            ..Self::default()
        })
    }

    /// The wire adapter for the selected provider
    pub fn adapter(&self) -> Box<dyn ProviderAdapter> {
        let key = self.api_key.clone();
        let base = self.base_url.as_deref();

        match self.provider {
            ProviderId::OpenAi => {
                let adapter = OpenAiAdapter::openai(key);
                Box::new(match base {
                    Some(base) => adapter.with_base_url(base),
                    None => adapter,
                })
            }
            ProviderId::Gemini => {
                let adapter = GeminiAdapter::new(key);
                Box::new(match base {
                    Some(base) => adapter.with_base_url(base),
                    None => adapter,
                })
            }
            ProviderId::Claude => {
                let adapter = ClaudeAdapter::new(key);
                Box::new(match base {
                    Some(base) => adapter.with_base_url(base),
                    None => adapter,
                })
            }
            ProviderId::Local => Box::new(OpenAiAdapter::local(
                self.local_url.as_deref().unwrap_or(LOCAL_DEFAULT_URL),
                self.local_model.clone(),
                key,
            )),
        }
    }

    /// Build the provider the agent talks to.
    ///
    /// A missing key is not an error here; the first request reports it.
    pub fn build_provider(&self) -> Result<Arc<dyn LlmProvider>> {
        let mut provider = HttpProvider::from_adapter(self.adapter(), Duration::from_secs(self.timeout_secs))?;
        if let Some(model) = &self.model {
            provider = provider.with_model(model.clone());
        }

        tracing::info!(provider = %self.provider, model = ?self.model, "provider configured");
        Ok(Arc::new(provider))
    }
}
