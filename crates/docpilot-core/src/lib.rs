//! # docpilot-core
//!
//! Provider-agnostic tool-calling loop for natural-language document editing.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Agent                               │
//! │  ┌─────────────┐  ┌──────────────────┐  ┌─────────────────┐  │
//! │  │  Reasoning  │  │  ToolDispatcher  │  │   LlmProvider   │  │
//! │  │    Loop     │──│  (ToolRegistry)  │──│   (Strategy)    │  │
//! │  └─────────────┘  └────────┬─────────┘  └─────────────────┘  │
//! └────────────────────────────┼─────────────────────────────────┘
//!                              ▼
//!                        dyn Document
//! ```
//!
//! The `LlmProvider` trait enables swapping between OpenAI, Gemini, Claude
//! or a local OpenAI-compatible server without changing agent logic. The
//! `Document` trait does the same for the editing surface.

pub mod dispatch;
pub mod document;
pub mod error;
pub mod history;
pub mod message;
pub mod prompt;
pub mod provider;
pub mod reasoning;
pub mod session;
pub mod settings;
pub mod tool;

pub use dispatch::ToolDispatcher;
pub use document::{Document, DocumentError, RangeHandle};
pub use error::{AgentError, Result};
pub use history::{ChangeHistory, ChangeRecord};
pub use message::{Message, Role, ToolCall, Transcript};
pub use prompt::PromptBuilder;
pub use provider::{HttpRequest, LlmProvider, ProviderAdapter, ProviderId};
pub use reasoning::{Agent, AgentBuilder, AgentConfig, RunEvent, RunOutcome, RunReporter, RunRequest, RunStatus};
pub use session::{RunGate, RunPermit};
pub use settings::{ConfigStore, JsonFileConfigStore, MemoryConfigStore, PersistencePolicy, SettingsManager};
pub use tool::{ToolDescriptor, ToolRegistry, ToolResult};
