//! # docpilot-runtime
//!
//! Model backends for the docpilot agent.
//!
//! ## Providers
//!
//! - **OpenAI** (default): Chat Completions API
//! - **Gemini**: `generateContent` API
//! - **Claude**: Messages API
//! - **Local**: any OpenAI-compatible server (LM Studio, llama.cpp, vLLM)
//!
//! Each backend is a [`ProviderAdapter`](docpilot_core::ProviderAdapter) that
//! only translates wire formats; [`HttpProvider`] does the sending.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use docpilot_runtime::ProviderSettings;
//!
//! let provider = ProviderSettings::from_env()?.build_provider()?;
//! let agent = Agent::builder()
//!     .provider(provider)
//!     .document(document)
//!     .build()?;
//! ```

pub mod claude;
pub mod config;
pub mod gemini;
pub mod http;
pub mod openai;

pub use claude::ClaudeAdapter;
pub use config::ProviderSettings;
pub use gemini::GeminiAdapter;
pub use http::HttpProvider;
pub use openai::OpenAiAdapter;

// Re-export core types for convenience
pub use docpilot_core::{Agent, AgentError, LlmProvider, Message, ProviderId, Result, Role, ToolRegistry};
