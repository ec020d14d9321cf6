//! System Prompt Assembly

use crate::tool::ToolRegistry;

const PREAMBLE: &str = "You are an AI assistant that DIRECTLY EDITS documents. You MUST use the provided tools to make changes - the user will see changes appear in their document in real-time.";

const RULES: &str = "CRITICAL RULES:
1. ALWAYS call get_document_content FIRST to see what's in the document
2. Make ALL edits using the tools - your text responses are just confirmations
3. For formatting: use format_text with the exact text to format
4. For rewrites: use replace_text with old text and new text
5. Be thorough - process the entire document as requested";

/// Task used when the request names none
pub const DEFAULT_TASK: &str = "Carry out the user's editing request.";

/// Builds the system prompt that seeds every run
#[derive(Clone, Debug, Default)]
pub struct PromptBuilder {
    task: Option<String>,
    instructions: Option<String>,
    replacements: Vec<(String, String)>,
    avoid: Vec<String>,
    custom: Option<String>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn task(mut self, task: impl Into<String>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Per-action instructions
    #[must_use]
    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into()).filter(|s: &String| !s.trim().is_empty());
        self
    }

    /// Glossary replacements, one `old → new` (or `old -> new`) pair per line.
    /// Lines without both sides are skipped.
    #[must_use]
    pub fn glossary(mut self, lines: &str) -> Self {
        self.replacements = lines
            .lines()
            .filter_map(|line| {
                let (old, new) = line.split_once('→').or_else(|| line.split_once("->"))?;
                let (old, new) = (old.trim(), new.trim());
                (!old.is_empty() && !new.is_empty()).then(|| (old.to_string(), new.to_string()))
            })
            .collect();
        self
    }

    /// Words to avoid, one per line
    #[must_use]
    pub fn avoid(mut self, lines: &str) -> Self {
        self.avoid = lines
            .lines()
            .map(str::trim)
            .filter(|w| !w.is_empty())
            .map(String::from)
            .collect();
        self
    }

    /// Free-form user instructions appended last
    #[must_use]
    pub fn custom(mut self, custom: impl Into<String>) -> Self {
        self.custom = Some(custom.into()).filter(|s: &String| !s.trim().is_empty());
        self
    }

    pub fn build(&self, tools: &ToolRegistry) -> String {
        let mut prompt = String::with_capacity(1024);
        prompt.push_str(PREAMBLE);
        prompt.push_str("\n\nTASK: ");
        prompt.push_str(self.task.as_deref().unwrap_or(DEFAULT_TASK));
        prompt.push_str("\n\n");
        prompt.push_str(&tools.generate_prompt_section());
        prompt.push('\n');
        prompt.push_str(RULES);
        prompt.push('\n');

        if let Some(instructions) = &self.instructions {
            prompt.push_str(&format!("\nSPECIFIC INSTRUCTIONS: {instructions}\n"));
        }
        if !self.replacements.is_empty() {
            prompt.push_str("\nWORD REPLACEMENTS:\n");
            for (old, new) in &self.replacements {
                prompt.push_str(&format!("- \"{old}\" → \"{new}\"\n"));
            }
        }
        if !self.avoid.is_empty() {
            prompt.push_str(&format!("\nWORDS TO AVOID: {}\n", self.avoid.join(", ")));
        }
        if let Some(custom) = &self.custom {
            prompt.push_str(&format!("\nUSER INSTRUCTIONS: {custom}\n"));
        }

        prompt
    }
}

/// The first user message of a run
pub fn opening_message(request: &str, context: &str) -> String {
    let request = request.trim();
    match (context.is_empty(), request.is_empty()) {
        (false, false) => format!("Document content:\n\n{context}\n\n{request}"),
        (false, true) => format!("Document content:\n\n{context}\n\nPlease proceed with the task."),
        (true, false) => request.to_string(),
        (true, true) => "Please read the document and proceed.".to_string(),
    }
}
