//! Error Types

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Agent error types
///
/// Tool-level variants (`ToolArgument`, `ToolNotFound`, `DocumentMutation`)
/// are converted into a failed `ToolResult` by the dispatcher and never abort
/// a run. `Config`, `Transport` and `Protocol` abort the current run.
#[derive(Error, Debug)]
pub enum AgentError {
    /// Missing credential or invalid provider configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP or network failure talking to the model backend.
    ///
    /// Displays the backend's own error text verbatim.
    #[error("{message}")]
    Transport {
        status: Option<u16>,
        message: String,
    },

    /// Backend answered, but not with anything we can normalize
    #[error("Provider protocol error: {0}")]
    Protocol(String),

    /// Malformed or missing tool arguments
    #[error("Invalid tool arguments: {0}")]
    ToolArgument(String),

    /// Tool name not present in the registry
    #[error("Unknown tool: {0}")]
    ToolNotFound(String),

    /// The document collaborator reported a failure
    #[error("Document error: {0}")]
    DocumentMutation(String),

    /// The run was cancelled by the caller
    #[error("Run cancelled")]
    Cancelled,

    /// Another run already holds the document
    #[error("A run is already in progress for this document")]
    RunInProgress,

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other/unknown error
    #[error("{0}")]
    Other(String),
}

impl AgentError {
    /// Build a transport error from an HTTP status and message
    pub fn transport(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Transport {
            status,
            message: message.into(),
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { status: None, .. } | Self::Io(_) => true,
            Self::Transport {
                status: Some(code), ..
            } => *code == 429 || *code >= 500,
            _ => false,
        }
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::Config(msg) => format!("Check your settings: {msg}"),
            Self::Transport { message, .. } => format!("The AI service returned an error: {message}"),
            Self::Protocol(_) => "The AI service returned a response that could not be understood.".into(),
            Self::ToolNotFound(name) => format!("The tool '{name}' is not available."),
            Self::ToolArgument(msg) => format!("Invalid tool input: {msg}"),
            Self::DocumentMutation(msg) => format!("The document could not be edited: {msg}"),
            Self::Cancelled => "The request was cancelled.".into(),
            Self::RunInProgress => "Another request is still editing this document. Please wait.".into(),
            _ => "An unexpected error occurred.".into(),
        }
    }
}

impl From<anyhow::Error> for AgentError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
