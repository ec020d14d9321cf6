//! Tool System
//!
//! Provider-agnostic tool descriptors and the static catalog of document
//! editing tools offered to the model on every request.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Tool definition schema (for LLM function calling)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Unique tool identifier
    pub name: String,

    /// Human-readable description (shown to LLM)
    pub description: String,

    /// JSON Schema object describing the arguments
    pub parameters: Value,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// The OpenAI-style function schema every adapter projects from:
    /// `{type: "function", function: {name, description, parameters}}`
    pub fn function_schema(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters,
            }
        })
    }
}

/// Result from tool execution.
///
/// Same shape for every tool and every provider; serialized into the `tool`
/// message content.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether execution succeeded
    pub success: bool,

    /// Human-readable outcome (success message or error)
    pub message: String,

    /// Number of ranges affected or found
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,

    /// Text payload for reading tools
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Structured data (document statistics)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<Value>,
}

impl ToolResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            ..Default::default()
        }
    }

    /// A search-driven tool matched nothing
    pub fn not_found(search: &str) -> Self {
        Self::failure(format!("\"{search}\" not found")).with_count(0)
    }

    #[must_use]
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    #[must_use]
    pub fn with_info(mut self, info: Value) -> Self {
        self.info = Some(info);
        self
    }

    /// Serialize for the transcript
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"success":{},"message":"unserializable tool result"}}"#, self.success)
        })
    }
}

/// Ordered catalog of tools offered to the model
#[derive(Clone, Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new tool, replacing any existing tool with the same name
    pub fn register(&mut self, tool: ToolDescriptor) {
        if let Some(existing) = self.tools.iter_mut().find(|t| t.name == tool.name) {
            *existing = tool;
        } else {
            self.tools.push(tool);
        }
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.iter().find(|t| t.name == name)
    }

    /// All descriptors, in registration order
    pub fn descriptors(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    /// Get tool names
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }

    /// OpenAI-style function schemas for every tool
    pub fn function_schemas(&self) -> Vec<Value> {
        self.tools.iter().map(ToolDescriptor::function_schema).collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Generate system prompt section listing the available tools
    pub fn generate_prompt_section(&self) -> String {
        let mut prompt = String::from("AVAILABLE TOOLS:\n");
        for tool in &self.tools {
            let summary = tool.description.split(". ").next().unwrap_or(&tool.description);
            prompt.push_str(&format!("- {}: {}\n", tool.name, summary.trim_end_matches('.')));
        }
        prompt
    }

    /// The full document editing catalog
    pub fn document_tools() -> Self {
        let mut registry = Self::new();
        for tool in document_tool_catalog() {
            registry.register(tool);
        }
        registry
    }
}

// ============================================================================
// Document Tools
// ============================================================================

fn object(properties: Value, required: &[&str]) -> Value {
    if required.is_empty() {
        json!({ "type": "object", "properties": properties })
    } else {
        json!({ "type": "object", "properties": properties, "required": required })
    }
}

#[allow(clippy::too_many_lines)]
fn document_tool_catalog() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::new(
            "get_document_content",
            "Read the entire document text. ALWAYS call this first before making edits.",
            object(json!({}), &[]),
        ),
        ToolDescriptor::new(
            "get_selection",
            "Get the currently selected text in the document.",
            object(json!({}), &[]),
        ),
        ToolDescriptor::new(
            "replace_text",
            "Find and replace text throughout the document.",
            object(
                json!({
                    "find": { "type": "string", "description": "Text to find" },
                    "replace": { "type": "string", "description": "Replacement text" },
                    "matchCase": { "type": "boolean", "description": "Case sensitive match" }
                }),
                &["find", "replace"],
            ),
        ),
        ToolDescriptor::new(
            "insert_text",
            "Insert text at a position (start, end, or replace selection).",
            object(
                json!({
                    "text": { "type": "string" },
                    "position": { "type": "string", "enum": ["start", "end", "replace_selection"] }
                }),
                &["text", "position"],
            ),
        ),
        ToolDescriptor::new(
            "delete_text",
            "Delete all instances of specific text.",
            object(json!({ "text": { "type": "string" } }), &["text"]),
        ),
        ToolDescriptor::new(
            "format_text",
            "Apply font formatting to specific text. Can set bold, italic, underline, strikethrough, subscript, superscript, font name, size, color, highlight.",
            object(
                json!({
                    "searchText": { "type": "string", "description": "Text to format (required)" },
                    "bold": { "type": "boolean" },
                    "italic": { "type": "boolean" },
                    "underline": { "type": "string", "enum": ["none", "single", "double", "dotted", "dashed", "wave"] },
                    "strikethrough": { "type": "boolean" },
                    "subscript": { "type": "boolean" },
                    "superscript": { "type": "boolean" },
                    "fontName": { "type": "string", "description": "Font family name like Arial, Times New Roman, Calibri" },
                    "fontSize": { "type": "number", "description": "Font size in points" },
                    "fontColor": { "type": "string", "description": "Color name or hex like red, blue, #FF0000" },
                    "highlightColor": {
                        "type": "string",
                        "enum": ["yellow", "green", "cyan", "magenta", "blue", "red", "darkBlue", "darkCyan", "darkGreen", "darkMagenta", "darkRed", "darkYellow", "gray25", "gray50", "black", "none"]
                    },
                    "allCaps": { "type": "boolean" },
                    "smallCaps": { "type": "boolean" }
                }),
                &["searchText"],
            ),
        ),
        ToolDescriptor::new(
            "clear_formatting",
            "Remove all formatting from specific text, returning it to default.",
            object(json!({ "searchText": { "type": "string" } }), &["searchText"]),
        ),
        ToolDescriptor::new(
            "format_paragraph",
            "Format paragraphs containing specific text. Set alignment, line spacing, indentation, spacing before/after.",
            object(
                json!({
                    "searchText": { "type": "string", "description": "Text within the paragraph to format" },
                    "alignment": { "type": "string", "enum": ["left", "center", "right", "justified"] },
                    "lineSpacing": { "type": "number", "description": "Line spacing (1, 1.5, 2, etc.)" },
                    "spaceBefore": { "type": "number", "description": "Space before paragraph in points" },
                    "spaceAfter": { "type": "number", "description": "Space after paragraph in points" },
                    "firstLineIndent": { "type": "number", "description": "First line indent in points" },
                    "leftIndent": { "type": "number", "description": "Left indent in points" },
                    "rightIndent": { "type": "number", "description": "Right indent in points" }
                }),
                &["searchText"],
            ),
        ),
        ToolDescriptor::new(
            "create_list",
            "Convert text/paragraphs into a bulleted or numbered list.",
            object(
                json!({
                    "searchText": { "type": "string", "description": "Text to convert to list" },
                    "listType": { "type": "string", "enum": ["bullet", "number"], "description": "Bullet or numbered list" }
                }),
                &["searchText", "listType"],
            ),
        ),
        ToolDescriptor::new(
            "remove_list",
            "Remove list formatting from text.",
            object(json!({ "searchText": { "type": "string" } }), &["searchText"]),
        ),
        ToolDescriptor::new(
            "apply_style",
            "Apply a built-in style to text/paragraph.",
            object(
                json!({
                    "searchText": { "type": "string" },
                    "styleName": {
                        "type": "string",
                        "enum": ["Normal", "Heading1", "Heading2", "Heading3", "Heading4", "Title", "Subtitle", "Quote", "IntenseQuote", "ListParagraph", "NoSpacing"],
                        "description": "Style to apply"
                    }
                }),
                &["searchText", "styleName"],
            ),
        ),
        ToolDescriptor::new(
            "add_comment",
            "Add a comment to specific text in the document margin.",
            object(
                json!({
                    "searchText": { "type": "string" },
                    "comment": { "type": "string" }
                }),
                &["searchText", "comment"],
            ),
        ),
        ToolDescriptor::new(
            "insert_table",
            "Insert a table at the end of the document.",
            object(
                json!({
                    "rows": { "type": "number", "description": "Number of rows" },
                    "columns": { "type": "number", "description": "Number of columns" },
                    "data": {
                        "type": "array",
                        "items": { "type": "array", "items": { "type": "string" } },
                        "description": "2D array of cell contents, e.g. [[\"A1\",\"B1\"],[\"A2\",\"B2\"]]"
                    }
                }),
                &["rows", "columns"],
            ),
        ),
        ToolDescriptor::new(
            "format_table",
            "Format an existing table (by index, 0 = first table).",
            object(
                json!({
                    "tableIndex": { "type": "number", "description": "Table index (0 = first)" },
                    "style": { "type": "string", "enum": ["TableGrid", "TableGridLight", "PlainTable1", "PlainTable2", "GridTable1Light", "GridTable4"] },
                    "headerRow": { "type": "boolean", "description": "Format first row as header" }
                }),
                &["tableIndex"],
            ),
        ),
        ToolDescriptor::new(
            "update_table_cell",
            "Update content of a specific table cell.",
            object(
                json!({
                    "tableIndex": { "type": "number" },
                    "rowIndex": { "type": "number" },
                    "columnIndex": { "type": "number" },
                    "content": { "type": "string" }
                }),
                &["tableIndex", "rowIndex", "columnIndex", "content"],
            ),
        ),
        ToolDescriptor::new(
            "add_table_row",
            "Add a row to a table.",
            object(
                json!({
                    "tableIndex": { "type": "number" },
                    "position": { "type": "string", "enum": ["start", "end"] },
                    "values": { "type": "array", "items": { "type": "string" }, "description": "Cell values for new row" }
                }),
                &["tableIndex", "position"],
            ),
        ),
        ToolDescriptor::new(
            "insert_break",
            "Insert a page break or section break.",
            object(
                json!({
                    "breakType": { "type": "string", "enum": ["page", "line", "sectionNext", "sectionContinuous"] }
                }),
                &["breakType"],
            ),
        ),
        ToolDescriptor::new(
            "find_text",
            "Find all instances of text and return their count and context.",
            object(
                json!({
                    "searchText": { "type": "string" },
                    "matchCase": { "type": "boolean" }
                }),
                &["searchText"],
            ),
        ),
        ToolDescriptor::new(
            "get_document_info",
            "Get document metadata and statistics.",
            object(json!({}), &[]),
        ),
    ]
}
