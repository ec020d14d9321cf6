//! Reasoning Loop
//!
//! Drives one editing run: ask the model, execute the tools it requests
//! against the document, feed the results back, and stop when the model
//! answers without tool calls or the iteration budget runs out.
//!
//! ```text
//! INIT ─► AWAITING_MODEL ─► HAS_TOOL_CALLS ─► EXECUTING_TOOLS ─┐
//!              ▲                                               │
//!              └───────────────────────────────────────────────┘
//!         AWAITING_MODEL ─► NO_TOOL_CALLS ─► DONE
//! ```
//!
//! Tool calls of one turn run strictly one after another, in the order the
//! model listed them.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::dispatch::ToolDispatcher;
use crate::document::{Document, context_excerpt};
use crate::error::{AgentError, Result};
use crate::history::ChangeHistory;
use crate::message::Transcript;
use crate::prompt::{PromptBuilder, opening_message};
use crate::provider::LlmProvider;
use crate::tool::{ToolRegistry, ToolResult};

/// Characters of tool arguments shown in progress events
const ARGUMENT_PREVIEW_CHARS: usize = 60;

/// Agent configuration
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// System prompt; built from the tool catalog when unset
    pub system_prompt: Option<String>,

    /// Maximum model round-trips per run
    pub max_iterations: usize,

    /// Seed the first user message with an excerpt of the document
    pub include_context: bool,

    /// Length of that excerpt, in characters
    pub context_chars: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: None,
            max_iterations: 20,
            include_context: true,
            context_chars: 5000,
        }
    }
}

/// One editing request
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RunRequest {
    pub user_text: String,

    /// Replaces the configured system prompt for this run
    #[serde(default)]
    pub system_prompt: Option<String>,

    /// Overrides [`AgentConfig::include_context`] for this run
    #[serde(default)]
    pub include_context: Option<bool>,
}

impl RunRequest {
    pub fn new(user_text: impl Into<String>) -> Self {
        Self {
            user_text: user_text.into(),
            ..Default::default()
        }
    }
}

/// How a run that reached a normal end finished
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// The model answered without requesting tools
    Done,
    /// The iteration budget ran out; applied edits stay applied
    BudgetExceeded,
}

/// Mutable state of a run in progress
#[derive(Debug)]
struct RunState {
    transcript: Transcript,
    iteration: usize,
}

/// Result of a run that reached a normal end
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunOutcome {
    pub status: RunStatus,

    /// The model's closing text (empty if the budget ran out first)
    pub final_text: String,

    pub iterations: usize,

    pub transcript: Transcript,
}

/// Progress of a run, in order of occurrence
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    Started,
    Iteration { n: usize },
    ToolStarted { name: String, arguments: String },
    ToolFinished { name: String, result: ToolResult },
    Completed { final_text: String },
    BudgetExceeded { iterations: usize },
    Failed { message: String },
    Cancelled,
}

/// Receives run progress
pub trait RunReporter: Send + Sync {
    fn report(&self, event: RunEvent);
}

/// Discards all events
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopReporter;

impl RunReporter for NoopReporter {
    fn report(&self, _event: RunEvent) {}
}

impl RunReporter for mpsc::UnboundedSender<RunEvent> {
    fn report(&self, event: RunEvent) {
        // A closed channel only means nobody is watching any more
        let _ = self.send(event);
    }
}

/// The main Agent struct
pub struct Agent {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    dispatcher: Arc<ToolDispatcher>,
    config: AgentConfig,
}

impl Agent {
    /// Create a new agent offering the full document tool catalog
    pub fn new(provider: Arc<dyn LlmProvider>, dispatcher: Arc<ToolDispatcher>, config: AgentConfig) -> Self {
        Self {
            provider,
            tools: Arc::new(ToolRegistry::document_tools()),
            dispatcher,
            config,
        }
    }

    pub fn builder() -> AgentBuilder {
        AgentBuilder::new()
    }

    /// The system prompt used when a request does not bring its own
    pub fn system_prompt(&self) -> String {
        self.config
            .system_prompt
            .clone()
            .unwrap_or_else(|| PromptBuilder::new().build(&self.tools))
    }

    /// Run without progress reporting or cancellation
    pub async fn ask(&self, user_text: &str) -> Result<RunOutcome> {
        self.run(RunRequest::new(user_text), &NoopReporter, &CancellationToken::new())
            .await
    }

    /// Execute one request to completion.
    ///
    /// Every run starts from a fresh transcript. Edits applied before a
    /// failure, cancellation or budget exhaustion are not undone.
    pub async fn run(
        &self,
        request: RunRequest,
        reporter: &dyn RunReporter,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome> {
        reporter.report(RunEvent::Started);

        let include_context = request.include_context.unwrap_or(self.config.include_context);
        let context = if include_context {
            context_excerpt(self.dispatcher.document().as_ref(), self.config.context_chars).await
        } else {
            String::new()
        };

        let system_prompt = request.system_prompt.unwrap_or_else(|| self.system_prompt());
        let transcript = Transcript::seeded(system_prompt, opening_message(&request.user_text, &context));
        let mut state = RunState {
            transcript,
            iteration: 0,
        };

        match self.drive(&mut state, reporter, cancel).await {
            Ok((status, final_text)) => {
                match status {
                    RunStatus::BudgetExceeded => {
                        tracing::warn!(iterations = state.iteration, "iteration budget exhausted");
                        reporter.report(RunEvent::BudgetExceeded {
                            iterations: state.iteration,
                        });
                    }
                    RunStatus::Done => {
                        tracing::info!(
                            iterations = state.iteration,
                            provider = %self.provider.id(),
                            "run completed"
                        );
                        reporter.report(RunEvent::Completed {
                            final_text: final_text.clone(),
                        });
                    }
                }

                Ok(RunOutcome {
                    status,
                    final_text,
                    iterations: state.iteration,
                    transcript: state.transcript,
                })
            }
            Err(AgentError::Cancelled) => {
                tracing::info!(iterations = state.iteration, "run cancelled");
                reporter.report(RunEvent::Cancelled);
                Err(AgentError::Cancelled)
            }
            Err(e) => {
                tracing::warn!(iterations = state.iteration, error = %e, "run failed");
                reporter.report(RunEvent::Failed { message: e.to_string() });
                Err(e)
            }
        }
    }

    /// The loop proper. Returns how the run ended and the model's closing text.
    async fn drive(
        &self,
        state: &mut RunState,
        reporter: &dyn RunReporter,
        cancel: &CancellationToken,
    ) -> Result<(RunStatus, String)> {
        while state.iteration < self.config.max_iterations {
            if cancel.is_cancelled() {
                return Err(AgentError::Cancelled);
            }

            state.iteration += 1;
            reporter.report(RunEvent::Iteration { n: state.iteration });
            tracing::debug!(
                iteration = state.iteration,
                messages = state.transcript.len(),
                approx_tokens = state.transcript.estimate_tokens(),
                "awaiting model"
            );

            let reply = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(AgentError::Cancelled),
                reply = self.provider.complete(state.transcript.messages(), &self.tools) => reply?,
            };
            let Some(reply) = reply else {
                return Err(AgentError::Protocol("No response".into()));
            };

            if !reply.has_tool_calls() {
                let final_text = reply.content.trim().to_string();
                state.transcript.push_assistant(reply)?;
                return Ok((RunStatus::Done, final_text));
            }

            let calls = state.transcript.push_assistant(reply)?.to_vec();
            for call in &calls {
                if cancel.is_cancelled() {
                    return Err(AgentError::Cancelled);
                }

                tracing::debug!(tool = %call.name, call_id = %call.id, "executing tool");
                reporter.report(RunEvent::ToolStarted {
                    name: call.name.clone(),
                    arguments: call.arguments_raw.chars().take(ARGUMENT_PREVIEW_CHARS).collect(),
                });

                let result = self.dispatcher.execute(call).await;
                state.transcript.push_tool_result(&call.id, result.to_json())?;

                reporter.report(RunEvent::ToolFinished {
                    name: call.name.clone(),
                    result,
                });
            }
        }

        Ok((RunStatus::BudgetExceeded, String::new()))
    }

    /// Get the tool registry
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn dispatcher(&self) -> &Arc<ToolDispatcher> {
        &self.dispatcher
    }

    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    /// Get configuration
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }
}

/// Builder for Agent configuration
pub struct AgentBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    document: Option<Arc<dyn Document>>,
    history: Option<Arc<ChangeHistory>>,
    tools: ToolRegistry,
    config: AgentConfig,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            document: None,
            history: None,
            tools: ToolRegistry::document_tools(),
            config: AgentConfig::default(),
        }
    }

    #[must_use]
    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    #[must_use]
    pub fn document(mut self, document: Arc<dyn Document>) -> Self {
        self.document = Some(document);
        self
    }

    #[must_use]
    pub fn history(mut self, history: Arc<ChangeHistory>) -> Self {
        self.history = Some(history);
        self
    }

    /// Offer a different tool catalog to the model
    #[must_use]
    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    #[must_use]
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    #[must_use]
    pub const fn max_iterations(mut self, max: usize) -> Self {
        self.config.max_iterations = max;
        self
    }

    #[must_use]
    pub const fn include_context(mut self, include: bool) -> Self {
        self.config.include_context = include;
        self
    }

    #[must_use]
    pub const fn context_chars(mut self, chars: usize) -> Self {
        self.config.context_chars = chars;
        self
    }

    #[must_use]
    pub fn config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<Agent> {
        let provider = self
            .provider
            .ok_or_else(|| AgentError::Config("Provider is required".into()))?;
        let document = self
            .document
            .ok_or_else(|| AgentError::Config("Document is required".into()))?;
        if self.config.max_iterations == 0 {
            return Err(AgentError::Config("max_iterations must be at least 1".into()));
        }

        let mut dispatcher = ToolDispatcher::new(document);
        if let Some(history) = self.history {
            dispatcher = dispatcher.with_history(history);
        }

        Ok(Agent {
            provider,
            tools: Arc::new(self.tools),
            dispatcher: Arc::new(dispatcher),
            config: self.config,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::document::{
        BreakKind, DocResult, DocumentStats, FontFormat, InsertLocation, ListKind,
        ParagraphFormat, RangeHandle, RowPosition, SearchOptions,
    };
    use crate::message::{Message, Role, ToolCall};
    use crate::provider::ProviderId;

    /// Replies with a fixed script, then repeats the last entry
    struct ScriptedProvider {
        replies: Mutex<VecDeque<Message>>,
        seen: Mutex<Vec<Vec<Message>>>,
    }

    impl ScriptedProvider {
        fn new(replies: Vec<Message>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn id(&self) -> ProviderId {
            ProviderId::Local
        }

        async fn complete(&self, transcript: &[Message], _tools: &ToolRegistry) -> Result<Option<Message>> {
            self.seen.lock().unwrap().push(transcript.to_vec());
            let mut replies = self.replies.lock().unwrap();
            let reply = if replies.len() > 1 {
                replies.pop_front()
            } else {
                replies.front().cloned()
            };
            Ok(reply)
        }
    }

    struct StringDoc(Mutex<String>);

    #[async_trait]
    impl Document for StringDoc {
        async fn read_text(&self) -> DocResult<String> {
            Ok(self.0.lock().unwrap().clone())
        }
        async fn selection_text(&self) -> DocResult<String> {
            Ok(String::new())
        }
        async fn search(&self, text: &str, _: SearchOptions) -> DocResult<Vec<RangeHandle>> {
            let body = self.0.lock().unwrap();
            Ok(body
                .match_indices(text)
                .map(|(i, m)| RangeHandle::new(i, i + m.len()))
                .collect())
        }
        async fn replace_range(&self, range: RangeHandle, text: &str) -> DocResult<()> {
            self.0.lock().unwrap().replace_range(range.start()..range.end(), text);
            Ok(())
        }
        async fn set_font(&self, _: RangeHandle, _: &FontFormat) -> DocResult<()> {
            Ok(())
        }
        async fn clear_formatting(&self, _: RangeHandle) -> DocResult<()> {
            Ok(())
        }
        async fn format_paragraph(&self, _: RangeHandle, _: &ParagraphFormat) -> DocResult<()> {
            Ok(())
        }
        async fn set_list(&self, _: RangeHandle, _: Option<ListKind>) -> DocResult<()> {
            Ok(())
        }
        async fn apply_style(&self, _: RangeHandle, _: &str) -> DocResult<()> {
            Ok(())
        }
        async fn insert_comment(&self, _: RangeHandle, _: &str) -> DocResult<()> {
            Ok(())
        }
        async fn insert_text(&self, text: &str, _: InsertLocation) -> DocResult<()> {
            self.0.lock().unwrap().push_str(text);
            Ok(())
        }
        async fn insert_break(&self, _: BreakKind) -> DocResult<()> {
            Ok(())
        }
        async fn table_count(&self) -> DocResult<usize> {
            Ok(0)
        }
        async fn insert_table(&self, _: usize, _: usize, _: &[Vec<String>]) -> DocResult<()> {
            Ok(())
        }
        async fn format_table(&self, _: usize, _: Option<&str>, _: bool) -> DocResult<()> {
            Ok(())
        }
        async fn set_table_cell(&self, _: usize, _: usize, _: usize, _: &str) -> DocResult<()> {
            Ok(())
        }
        async fn add_table_row(&self, _: usize, _: RowPosition, _: &[String]) -> DocResult<()> {
            Ok(())
        }
        async fn stats(&self) -> DocResult<DocumentStats> {
            Ok(DocumentStats::default())
        }
    }

    fn doc(text: &str) -> Arc<StringDoc> {
        Arc::new(StringDoc(Mutex::new(text.to_string())))
    }

    fn call(id: &str, name: &str, args: &str) -> ToolCall {
        ToolCall::new(id, name, args)
    }

    #[tokio::test]
    async fn replace_then_done_takes_two_iterations() {
        let document = doc("foo and foo");
        let provider = ScriptedProvider::new(vec![
            Message::assistant_with_tools(
                "",
                vec![call("c1", "replace_text", r#"{"find":"foo","replace":"bar"}"#)],
            ),
            Message::assistant("Done"),
        ]);
        let agent = Agent::builder()
            .provider(provider.clone())
            .document(document.clone())
            .build()
            .unwrap();

        let outcome = agent.ask("Replace all 'foo' with 'bar'").await.unwrap();

        assert_eq!(outcome.status, RunStatus::Done);
        assert_eq!(outcome.iterations, 2);
        assert_eq!(outcome.final_text, "Done");
        assert_eq!(*document.0.lock().unwrap(), "bar and bar");

        let tool_msg = &outcome.transcript.messages()[3];
        assert_eq!(tool_msg.role, Role::Tool);
        let result: ToolResult = serde_json::from_str(&tool_msg.content).unwrap();
        assert!(result.success);
        assert_eq!(result.count, Some(2));

        // The second request saw the tool result
        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen[1].len(), 4);
        assert!(seen[0][1].content.contains("foo and foo"));
    }

    #[tokio::test]
    async fn every_call_gets_one_tool_message_in_order() {
        let provider = ScriptedProvider::new(vec![
            Message::assistant_with_tools(
                "working",
                vec![
                    call("a", "find_text", r#"{"searchText":"x"}"#),
                    call("b", "no_such_tool", "{}"),
                    call("c", "delete_text", "{broken"),
                ],
            ),
            Message::assistant("ok"),
        ]);
        let agent = Agent::builder()
            .provider(provider)
            .document(doc("x"))
            .build()
            .unwrap();

        let outcome = agent.ask("go").await.unwrap();

        let ids: Vec<_> = outcome
            .transcript
            .messages()
            .iter()
            .filter(|m| m.role == Role::Tool)
            .filter_map(|m| m.tool_call_id.as_deref())
            .collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn always_calling_tools_hits_the_budget() {
        let provider = ScriptedProvider::new(vec![Message::assistant_with_tools(
            "",
            vec![call("loop", "get_document_info", "{}")],
        )]);
        let agent = Agent::builder()
            .provider(provider)
            .document(doc("text"))
            .max_iterations(3)
            .build()
            .unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let outcome = agent
            .run(RunRequest::new("go"), &tx, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.status, RunStatus::BudgetExceeded);
        assert_eq!(outcome.iterations, 3);
        assert!(outcome.final_text.is_empty());

        drop(tx);
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert_eq!(events.first(), Some(&RunEvent::Started));
        assert_eq!(events.last(), Some(&RunEvent::BudgetExceeded { iterations: 3 }));
        let finished = events
            .iter()
            .filter(|e| matches!(e, RunEvent::ToolFinished { .. }))
            .count();
        assert_eq!(finished, 3);
    }

    #[tokio::test]
    async fn zero_match_delete_keeps_the_loop_going() {
        let document = doc("hello");
        let provider = ScriptedProvider::new(vec![
            Message::assistant_with_tools("", vec![call("d", "delete_text", r#"{"text":"xyz"}"#)]),
            Message::assistant("Nothing to delete"),
        ]);
        let agent = Agent::builder()
            .provider(provider)
            .document(document.clone())
            .build()
            .unwrap();

        let outcome = agent.ask("delete xyz").await.unwrap();

        assert_eq!(outcome.status, RunStatus::Done);
        let result: ToolResult = serde_json::from_str(&outcome.transcript.messages()[3].content).unwrap();
        assert_eq!(result.count, Some(0));
        assert_eq!(*document.0.lock().unwrap(), "hello");
    }

    #[tokio::test]
    async fn missing_reply_is_a_protocol_error() {
        let provider = ScriptedProvider::new(Vec::new());
        let agent = Agent::builder()
            .provider(provider)
            .document(doc(""))
            .build()
            .unwrap();

        let err = agent.ask("go").await.unwrap_err();
        assert!(matches!(err, AgentError::Protocol(ref m) if m == "No response"));
    }

    #[tokio::test]
    async fn cancelled_token_stops_before_the_model_is_called() {
        let provider = ScriptedProvider::new(vec![Message::assistant("never")]);
        let agent = Agent::builder()
            .provider(provider.clone())
            .document(doc(""))
            .build()
            .unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = agent
            .run(RunRequest::new("go"), &NoopReporter, &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, AgentError::Cancelled));
        assert!(provider.seen.lock().unwrap().is_empty());
    }

    /// Counts calls and never answers
    struct StallingProvider(AtomicUsize);

    #[async_trait]
    impl LlmProvider for StallingProvider {
        fn id(&self) -> ProviderId {
            ProviderId::Local
        }

        async fn complete(&self, _: &[Message], _: &ToolRegistry) -> Result<Option<Message>> {
            self.0.fetch_add(1, Ordering::SeqCst);
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn cancellation_abandons_a_pending_model_call() {
        let provider = Arc::new(StallingProvider(AtomicUsize::new(0)));
        let agent = Agent::builder()
            .provider(provider.clone())
            .document(doc("text"))
            .build()
            .unwrap();

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let (tx, mut rx) = mpsc::unbounded_channel();
        let err = agent.run(RunRequest::new("go"), &tx, &cancel).await.unwrap_err();

        assert!(matches!(err, AgentError::Cancelled));
        assert_eq!(provider.0.load(Ordering::SeqCst), 1);
        drop(tx);
        let mut last = None;
        while let Some(event) = rx.recv().await {
            last = Some(event);
        }
        assert_eq!(last, Some(RunEvent::Cancelled));
    }

    /// Cancels the run as soon as the first tool has finished
    struct CancelAfterFirstTool(CancellationToken);

    impl RunReporter for CancelAfterFirstTool {
        fn report(&self, event: RunEvent) {
            if matches!(event, RunEvent::ToolFinished { .. }) {
                self.0.cancel();
            }
        }
    }

    #[tokio::test]
    async fn cancellation_between_tool_calls_keeps_applied_edits() {
        let document = doc("a b c");
        let provider = ScriptedProvider::new(vec![
            Message::assistant_with_tools(
                "",
                vec![
                    call("1", "replace_text", r#"{"find":"a","replace":"A"}"#),
                    call("2", "replace_text", r#"{"find":"b","replace":"B"}"#),
                    call("3", "replace_text", r#"{"find":"c","replace":"C"}"#),
                ],
            ),
            Message::assistant("Done"),
        ]);
        let agent = Agent::builder()
            .provider(provider.clone())
            .document(document.clone())
            .build()
            .unwrap();

        let cancel = CancellationToken::new();
        let err = agent
            .run(RunRequest::new("capitalize"), &CancelAfterFirstTool(cancel.clone()), &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, AgentError::Cancelled));
        assert_eq!(*document.0.lock().unwrap(), "A b c");
        assert_eq!(provider.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn repeated_call_ids_still_get_one_result_each() {
        let document = doc("a b");
        let provider = ScriptedProvider::new(vec![
            Message::assistant_with_tools(
                "",
                vec![
                    call("call_0", "replace_text", r#"{"find":"a","replace":"x"}"#),
                    call("call_0", "replace_text", r#"{"find":"b","replace":"y"}"#),
                ],
            ),
            Message::assistant("Done"),
        ]);
        let agent = Agent::builder()
            .provider(provider)
            .document(document.clone())
            .build()
            .unwrap();

        let outcome = agent.ask("swap letters").await.unwrap();

        assert_eq!(outcome.status, RunStatus::Done);
        assert_eq!(*document.0.lock().unwrap(), "x y");
        let ids: Vec<_> = outcome
            .transcript
            .messages()
            .iter()
            .filter_map(|m| m.tool_call_id.as_deref())
            .collect();
        assert_eq!(ids, ["call_0", "call_0_2"]);
    }

    #[tokio::test]
    async fn context_can_be_disabled_per_request() {
        let provider = ScriptedProvider::new(vec![Message::assistant("fine")]);
        let agent = Agent::builder()
            .provider(provider.clone())
            .document(doc("secret body"))
            .build()
            .unwrap();

        let request = RunRequest {
            user_text: "summarize".into(),
            system_prompt: Some("custom".into()),
            include_context: Some(false),
        };
        agent
            .run(request, &NoopReporter, &CancellationToken::new())
            .await
            .unwrap();

        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen[0][0].content, "custom");
        assert_eq!(seen[0][1].content, "summarize");
    }

    #[test]
    fn builder_requires_provider_and_document() {
        assert!(matches!(AgentBuilder::new().build(), Err(AgentError::Config(_))));
    }
}
