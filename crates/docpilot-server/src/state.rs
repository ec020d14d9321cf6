//! Application State

use std::sync::Arc;

use docpilot_core::{
    Agent, ChangeHistory, LlmProvider, PromptBuilder, Result, RunGate, RunRequest, SettingsManager,
};
use docpilot_document::InMemoryDocument;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Agent wired to the provider and the document
    pub agent: Arc<Agent>,

    /// The document being edited
    pub document: Arc<InMemoryDocument>,

    /// Recorded replacements, newest first
    pub history: Arc<ChangeHistory>,

    /// One run at a time against the document
    pub gate: RunGate,

    pub settings: Arc<SettingsManager>,
}

impl AppState {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        document: Arc<InMemoryDocument>,
        settings: Arc<SettingsManager>,
    ) -> Result<Self> {
        let history = Arc::new(ChangeHistory::new());
        let agent = Agent::builder()
            .provider(provider)
            .document(document.clone())
            .history(history.clone())
            .build()?;

        Ok(Self {
            agent: Arc::new(agent),
            document,
            history,
            gate: RunGate::new(),
            settings,
        })
    }

    /// Build a run from the user's text and the current settings
    pub fn run_request(
        &self,
        user_text: &str,
        instructions: Option<&str>,
        include_context: Option<bool>,
    ) -> Result<RunRequest> {
        let saved = self.settings.load()?;

        let mut prompt = PromptBuilder::new()
            .glossary(&saved.glossary_replace)
            .avoid(&saved.glossary_avoid)
            .custom(saved.custom_prompt);
        if let Some(instructions) = instructions {
            prompt = prompt.instructions(instructions);
        }

        Ok(RunRequest {
            user_text: user_text.to_string(),
            system_prompt: Some(prompt.build(self.agent.tools())),
            include_context: Some(match include_context {
                Some(include) => include,
                None => self.settings.context_awareness()?,
            }),
        })
    }
}
