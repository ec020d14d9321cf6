//! Tool Dispatcher
//!
//! Routes a tool name plus parsed arguments to the [`Document`] and folds
//! every outcome, including failures, into a [`ToolResult`]. Nothing crosses
//! this boundary as an error: the model sees what went wrong and can recover
//! within the same run.

use std::sync::Arc;

use serde::de::{self, DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::document::{
    Alignment, BreakKind, Document, FontFormat, Highlight, InsertLocation, ListKind,
    ParagraphFormat, RangeHandle, RowPosition, SearchOptions, Underline,
};
use crate::error::{AgentError, Result};
use crate::history::ChangeHistory;
use crate::message::ToolCall;
use crate::tool::ToolResult;

/// Longest document text handed back by `get_document_content`, in characters
pub const MAX_CONTENT_CHARS: usize = 20_000;

/// Routes tool calls to a document
pub struct ToolDispatcher {
    document: Arc<dyn Document>,
    history: Option<Arc<ChangeHistory>>,
}

impl ToolDispatcher {
    pub fn new(document: Arc<dyn Document>) -> Self {
        Self {
            document,
            history: None,
        }
    }

    /// Record successful replacements into `history`
    #[must_use]
    pub fn with_history(mut self, history: Arc<ChangeHistory>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn document(&self) -> &Arc<dyn Document> {
        &self.document
    }

    pub fn history(&self) -> Option<&Arc<ChangeHistory>> {
        self.history.as_ref()
    }

    /// Execute one model-issued tool call.
    ///
    /// Malformed argument text falls back to an empty object, so the tool
    /// reports its missing parameters instead of the call being dropped.
    /// Replacements that changed something are recorded in the history.
    pub async fn execute(&self, call: &ToolCall) -> ToolResult {
        let args = call.arguments_or_empty();
        let result = self.dispatch(&call.name, &args).await;

        if call.name == "replace_text" && result.success && result.count.unwrap_or(0) > 0 {
            if let Some(history) = &self.history {
                let find = args.get("find").and_then(Value::as_str).unwrap_or_default();
                let replace = args.get("replace").and_then(Value::as_str).unwrap_or_default();
                history.record(&call.name, find, replace);
            }
        }

        result
    }

    /// Route `name` with `args` to the document. Never fails.
    pub async fn dispatch(&self, name: &str, args: &Map<String, Value>) -> ToolResult {
        tracing::debug!(tool = %name, "dispatching tool");

        match self.route(name, args).await {
            Ok(result) => result,
            Err(e) => {
                tracing::debug!(tool = %name, error = %e, "tool failed");
                match e {
                    AgentError::DocumentMutation(message) => ToolResult::failure(message),
                    other => ToolResult::failure(other.to_string()),
                }
            }
        }
    }

    async fn route(&self, name: &str, args: &Map<String, Value>) -> Result<ToolResult> {
        match name {
            "get_document_content" => self.get_document_content().await,
            "get_selection" => self.get_selection().await,
            "get_document_info" => self.get_document_info().await,
            "replace_text" => self.replace_text(parse(args)?).await,
            "insert_text" => self.insert_text(parse(args)?).await,
            "delete_text" => self.delete_text(parse(args)?).await,
            "find_text" => self.find_text(parse(args)?).await,
            "format_text" => self.format_text(parse(args)?).await,
            "clear_formatting" => self.clear_formatting(parse(args)?).await,
            "format_paragraph" => self.format_paragraph(parse(args)?).await,
            "create_list" => self.create_list(parse(args)?).await,
            "remove_list" => self.remove_list(parse(args)?).await,
            "apply_style" => self.apply_style(parse(args)?).await,
            "add_comment" => self.add_comment(parse(args)?).await,
            "insert_table" => self.insert_table(parse(args)?).await,
            "format_table" => self.format_table(parse(args)?).await,
            "update_table_cell" => self.update_table_cell(parse(args)?).await,
            "add_table_row" => self.add_table_row(parse(args)?).await,
            "insert_break" => self.insert_break(parse(args)?).await,
            other => Err(AgentError::ToolNotFound(other.to_string())),
        }
    }

    async fn search(&self, text: &str, match_case: bool) -> Result<Vec<RangeHandle>> {
        if text.is_empty() {
            return Err(AgentError::ToolArgument("search text must not be empty".into()));
        }
        Ok(self.document.search(text, SearchOptions::match_case(match_case)).await?)
    }

    async fn get_document_content(&self) -> Result<ToolResult> {
        let text = self.document.read_text().await?;
        let total = text.chars().count();
        let content: String = text.chars().take(MAX_CONTENT_CHARS).collect();
        Ok(ToolResult::success(format!("Read {total} chars")).with_content(content))
    }

    async fn get_selection(&self) -> Result<ToolResult> {
        let selected = self.document.selection_text().await?;
        if selected.is_empty() {
            return Ok(ToolResult::success("No selection").with_content(""));
        }
        let preview: String = selected.chars().take(100).collect();
        Ok(ToolResult::success(format!("Selected: \"{preview}...\"")).with_content(selected))
    }

    async fn get_document_info(&self) -> Result<ToolResult> {
        let stats = self.document.stats().await?;
        Ok(ToolResult::success("Document info").with_info(json!(stats)))
    }

    async fn replace_text(&self, args: ReplaceTextArgs) -> Result<ToolResult> {
        let ranges = self.search(&args.find, args.match_case).await?;
        if ranges.is_empty() {
            return Ok(ToolResult::not_found(&args.find));
        }
        for range in ranges.iter().rev() {
            self.document.replace_range(*range, &args.replace).await?;
        }
        Ok(ToolResult::success(format!("Replaced {} instance(s)", ranges.len())).with_count(ranges.len()))
    }

    async fn insert_text(&self, args: InsertTextArgs) -> Result<ToolResult> {
        self.document.insert_text(&args.text, args.position).await?;
        let at = match args.position {
            InsertLocation::Start => "start",
            InsertLocation::End => "end",
            InsertLocation::ReplaceSelection => "replace_selection",
        };
        Ok(ToolResult::success(format!("Inserted text at {at}")))
    }

    async fn delete_text(&self, args: DeleteTextArgs) -> Result<ToolResult> {
        let ranges = self.search(&args.text, false).await?;
        if ranges.is_empty() {
            return Ok(ToolResult::not_found(&args.text));
        }
        for range in ranges.iter().rev() {
            self.document.replace_range(*range, "").await?;
        }
        Ok(ToolResult::success(format!("Deleted {} instance(s)", ranges.len())).with_count(ranges.len()))
    }

    async fn find_text(&self, args: FindTextArgs) -> Result<ToolResult> {
        let ranges = self.search(&args.search_text, args.match_case).await?;
        Ok(ToolResult::success(format!(
            "Found {} instance(s) of \"{}\"",
            ranges.len(),
            args.search_text
        ))
        .with_count(ranges.len()))
    }

    async fn format_text(&self, args: FormatTextArgs) -> Result<ToolResult> {
        let ranges = self.search(&args.search_text, false).await?;
        if ranges.is_empty() {
            return Ok(ToolResult::not_found(&args.search_text));
        }
        let font = args.font();
        for range in &ranges {
            self.document.set_font(*range, &font).await?;
        }
        Ok(ToolResult::success(format!("Formatted {} instance(s)", ranges.len())).with_count(ranges.len()))
    }

    async fn clear_formatting(&self, args: SearchArgs) -> Result<ToolResult> {
        let ranges = self.search(&args.search_text, false).await?;
        if ranges.is_empty() {
            return Ok(ToolResult::not_found(&args.search_text));
        }
        for range in &ranges {
            self.document.clear_formatting(*range).await?;
        }
        Ok(ToolResult::success(format!("Cleared formatting on {} instance(s)", ranges.len()))
            .with_count(ranges.len()))
    }

    async fn format_paragraph(&self, args: FormatParagraphArgs) -> Result<ToolResult> {
        let ranges = self.search(&args.search_text, false).await?;
        if ranges.is_empty() {
            return Ok(ToolResult::not_found(&args.search_text));
        }
        let format = args.paragraph_format();
        for range in &ranges {
            self.document.format_paragraph(*range, &format).await?;
        }
        Ok(ToolResult::success(format!(
            "Formatted paragraph(s) containing \"{}\"",
            args.search_text
        ))
        .with_count(ranges.len()))
    }

    async fn create_list(&self, args: CreateListArgs) -> Result<ToolResult> {
        let ranges = self.search(&args.search_text, false).await?;
        if ranges.is_empty() {
            return Ok(ToolResult::not_found(&args.search_text));
        }
        for range in &ranges {
            self.document.set_list(*range, Some(args.list_type)).await?;
        }
        let kind = match args.list_type {
            ListKind::Bullet => "bullet",
            ListKind::Number => "number",
        };
        Ok(ToolResult::success(format!("Applied {kind} list formatting")).with_count(ranges.len()))
    }

    async fn remove_list(&self, args: SearchArgs) -> Result<ToolResult> {
        let ranges = self.search(&args.search_text, false).await?;
        if ranges.is_empty() {
            return Ok(ToolResult::not_found(&args.search_text));
        }
        for range in &ranges {
            self.document.set_list(*range, None).await?;
        }
        Ok(ToolResult::success("Removed list formatting").with_count(ranges.len()))
    }

    async fn apply_style(&self, args: ApplyStyleArgs) -> Result<ToolResult> {
        let ranges = self.search(&args.search_text, false).await?;
        if ranges.is_empty() {
            return Ok(ToolResult::not_found(&args.search_text));
        }
        for range in &ranges {
            self.document.apply_style(*range, &args.style_name).await?;
        }
        Ok(ToolResult::success(format!("Applied {} style", args.style_name)).with_count(ranges.len()))
    }

    async fn add_comment(&self, args: AddCommentArgs) -> Result<ToolResult> {
        let ranges = self.search(&args.search_text, false).await?;
        let Some(first) = ranges.first() else {
            return Ok(ToolResult::not_found(&args.search_text));
        };
        self.document.insert_comment(*first, &args.comment).await?;
        Ok(ToolResult::success(format!("Added comment to \"{}\"", args.search_text)))
    }

    async fn insert_table(&self, args: InsertTableArgs) -> Result<ToolResult> {
        if args.rows == 0 || args.columns == 0 {
            return Err(AgentError::ToolArgument("rows and columns must be at least 1".into()));
        }
        self.document.insert_table(args.rows, args.columns, &args.data).await?;
        Ok(ToolResult::success(format!("Inserted {}x{} table", args.rows, args.columns)))
    }

    /// Fails with "Table not found" when `index` is past the last table
    async fn require_table(&self, index: usize) -> Result<Option<ToolResult>> {
        if index >= self.document.table_count().await? {
            return Ok(Some(ToolResult::failure("Table not found")));
        }
        Ok(None)
    }

    async fn format_table(&self, args: FormatTableArgs) -> Result<ToolResult> {
        if let Some(missing) = self.require_table(args.table_index).await? {
            return Ok(missing);
        }
        self.document
            .format_table(args.table_index, args.style.as_deref(), args.header_row)
            .await?;
        Ok(ToolResult::success("Table formatted"))
    }

    async fn update_table_cell(&self, args: UpdateCellArgs) -> Result<ToolResult> {
        if let Some(missing) = self.require_table(args.table_index).await? {
            return Ok(missing);
        }
        self.document
            .set_table_cell(args.table_index, args.row_index, args.column_index, &args.content)
            .await?;
        Ok(ToolResult::success(format!(
            "Updated cell [{},{}]",
            args.row_index, args.column_index
        )))
    }

    async fn add_table_row(&self, args: AddRowArgs) -> Result<ToolResult> {
        if let Some(missing) = self.require_table(args.table_index).await? {
            return Ok(missing);
        }
        self.document
            .add_table_row(args.table_index, args.position, &args.values)
            .await?;
        Ok(ToolResult::success("Added row to table"))
    }

    async fn insert_break(&self, args: InsertBreakArgs) -> Result<ToolResult> {
        self.document.insert_break(args.break_type).await?;
        let kind = match args.break_type {
            BreakKind::Page => "page",
            BreakKind::Line => "line",
            BreakKind::SectionNext => "sectionNext",
            BreakKind::SectionContinuous => "sectionContinuous",
        };
        Ok(ToolResult::success(format!("Inserted {kind} break")))
    }
}

fn parse<T: DeserializeOwned>(args: &Map<String, Value>) -> Result<T> {
    serde_json::from_value(Value::Object(args.clone())).map_err(|e| AgentError::ToolArgument(e.to_string()))
}

/// Models send `"number"` parameters as `3` or `3.0`; accept both.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn index<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<usize, D::Error> {
    let value = Value::deserialize(deserializer)?;
    let n = value
        .as_u64()
        .or_else(|| {
            value
                .as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= u32::MAX as f64)
                .map(|f| f as u64)
        })
        .ok_or_else(|| de::Error::custom(format!("expected a non-negative integer, got {value}")))?;
    usize::try_from(n).map_err(de::Error::custom)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReplaceTextArgs {
    find: String,
    replace: String,
    #[serde(default)]
    match_case: bool,
}

#[derive(Deserialize)]
struct InsertTextArgs {
    text: String,
    position: InsertLocation,
}

#[derive(Deserialize)]
struct DeleteTextArgs {
    text: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FindTextArgs {
    search_text: String,
    #[serde(default)]
    match_case: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchArgs {
    search_text: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FormatTextArgs {
    search_text: String,
    bold: Option<bool>,
    italic: Option<bool>,
    underline: Option<Underline>,
    strikethrough: Option<bool>,
    subscript: Option<bool>,
    superscript: Option<bool>,
    font_name: Option<String>,
    font_size: Option<f64>,
    font_color: Option<String>,
    highlight_color: Option<String>,
    all_caps: Option<bool>,
    small_caps: Option<bool>,
}

impl FormatTextArgs {
    fn font(&self) -> FontFormat {
        FontFormat {
            bold: self.bold,
            italic: self.italic,
            underline: self.underline,
            strikethrough: self.strikethrough,
            subscript: self.subscript,
            superscript: self.superscript,
            name: self.font_name.clone().filter(|n| !n.is_empty()),
            size: self.font_size.filter(|s| *s > 0.0),
            color: self.font_color.clone().filter(|c| !c.is_empty()),
            highlight: self.highlight_color.as_deref().map(highlight),
            all_caps: self.all_caps,
            small_caps: self.small_caps,
        }
    }
}

/// Map a tool highlight name to the document's highlight palette
fn highlight(name: &str) -> Highlight {
    let mapped = match name {
        "none" => return Highlight::Clear,
        "yellow" => "Yellow",
        "green" => "BrightGreen",
        "cyan" => "Turquoise",
        "magenta" => "Pink",
        "blue" => "Blue",
        "red" => "Red",
        "darkBlue" => "DarkBlue",
        "darkCyan" => "DarkCyan",
        "darkGreen" => "DarkGreen",
        "darkMagenta" => "DarkMagenta",
        "darkRed" => "DarkRed",
        "darkYellow" => "DarkYellow",
        "gray25" => "Gray25",
        "gray50" => "Gray50",
        "black" => "Black",
        other => other,
    };
    Highlight::Color(mapped.to_string())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FormatParagraphArgs {
    search_text: String,
    alignment: Option<Alignment>,
    line_spacing: Option<f64>,
    space_before: Option<f64>,
    space_after: Option<f64>,
    first_line_indent: Option<f64>,
    left_indent: Option<f64>,
    right_indent: Option<f64>,
}

/// Points per line at the default 12pt body size
const POINTS_PER_LINE: f64 = 12.0;

impl FormatParagraphArgs {
    fn paragraph_format(&self) -> ParagraphFormat {
        ParagraphFormat {
            alignment: self.alignment,
            line_spacing: self
                .line_spacing
                .filter(|l| *l > 0.0)
                .map(|lines| lines * POINTS_PER_LINE),
            space_before: self.space_before,
            space_after: self.space_after,
            first_line_indent: self.first_line_indent,
            left_indent: self.left_indent,
            right_indent: self.right_indent,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateListArgs {
    search_text: String,
    list_type: ListKind,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApplyStyleArgs {
    search_text: String,
    style_name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddCommentArgs {
    search_text: String,
    comment: String,
}

#[derive(Deserialize)]
struct InsertTableArgs {
    #[serde(deserialize_with = "index")]
    rows: usize,
    #[serde(deserialize_with = "index")]
    columns: usize,
    #[serde(default)]
    data: Vec<Vec<String>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FormatTableArgs {
    #[serde(deserialize_with = "index")]
    table_index: usize,
    style: Option<String>,
    #[serde(default)]
    header_row: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateCellArgs {
    #[serde(deserialize_with = "index")]
    table_index: usize,
    #[serde(deserialize_with = "index")]
    row_index: usize,
    #[serde(deserialize_with = "index")]
    column_index: usize,
    content: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddRowArgs {
    #[serde(deserialize_with = "index")]
    table_index: usize,
    position: RowPosition,
    #[serde(default)]
    values: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertBreakArgs {
    break_type: BreakKind,
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::document::{DocResult, DocumentError, DocumentStats};

    /// Plain-text document that records the order of range mutations
    #[derive(Default)]
    struct TextDoc {
        text: Mutex<String>,
        replaced_at: Mutex<Vec<usize>>,
        tables: Mutex<usize>,
    }

    impl TextDoc {
        fn with_text(text: &str) -> Arc<Self> {
            Arc::new(Self {
                text: Mutex::new(text.to_string()),
                ..Default::default()
            })
        }

        fn text(&self) -> String {
            self.text.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Document for TextDoc {
        async fn read_text(&self) -> DocResult<String> {
            Ok(self.text())
        }

        async fn selection_text(&self) -> DocResult<String> {
            Ok(String::new())
        }

        async fn search(&self, text: &str, options: SearchOptions) -> DocResult<Vec<RangeHandle>> {
            let (hay, needle) = if options.match_case {
                (self.text(), text.to_string())
            } else {
                (self.text().to_lowercase(), text.to_lowercase())
            };
            Ok(hay
                .match_indices(&needle)
                .map(|(i, m)| RangeHandle::new(i, i + m.len()))
                .collect())
        }

        async fn replace_range(&self, range: RangeHandle, text: &str) -> DocResult<()> {
            self.replaced_at.lock().unwrap().push(range.start());
            self.text.lock().unwrap().replace_range(range.start()..range.end(), text);
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
            Err(DocumentError::Unavailable("comments are disabled".into()))
        }

        async fn insert_text(&self, text: &str, location: InsertLocation) -> DocResult<()> {
            let mut body = self.text.lock().unwrap();
            match location {
                InsertLocation::Start => body.insert_str(0, text),
                _ => body.push_str(text),
            }
            Ok(())
        }

        async fn insert_break(&self, _: BreakKind) -> DocResult<()> {
            Ok(())
        }

        async fn table_count(&self) -> DocResult<usize> {
            Ok(*self.tables.lock().unwrap())
        }

        async fn insert_table(&self, _: usize, _: usize, _: &[Vec<String>]) -> DocResult<()> {
            *self.tables.lock().unwrap() += 1;
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
            Ok(DocumentStats {
                characters: self.text().chars().count(),
                ..Default::default()
            })
        }
    }

    fn args(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[tokio::test]
    async fn replace_text_rewrites_every_match_last_first() {
        let doc = TextDoc::with_text("foo and foo");
        let dispatcher = ToolDispatcher::new(doc.clone());

        let result = dispatcher
            .dispatch("replace_text", &args(json!({"find": "foo", "replace": "bar"})))
            .await;

        assert!(result.success);
        assert_eq!(result.count, Some(2));
        assert_eq!(result.message, "Replaced 2 instance(s)");
        assert_eq!(doc.text(), "bar and bar");
        assert_eq!(*doc.replaced_at.lock().unwrap(), [8, 0]);
    }

    #[tokio::test]
    async fn delete_with_no_match_reports_zero() {
        let doc = TextDoc::with_text("hello");
        let dispatcher = ToolDispatcher::new(doc.clone());

        let result = dispatcher.dispatch("delete_text", &args(json!({"text": "xyz"}))).await;

        assert!(!result.success);
        assert_eq!(result.count, Some(0));
        assert_eq!(doc.text(), "hello");
    }

    #[tokio::test]
    async fn find_text_with_no_match_succeeds() {
        let dispatcher = ToolDispatcher::new(TextDoc::with_text("hello"));
        let result = dispatcher.dispatch("find_text", &args(json!({"searchText": "xyz"}))).await;
        assert!(result.success);
        assert_eq!(result.count, Some(0));
    }

    #[tokio::test]
    async fn unknown_tools_and_bad_arguments_become_failures() {
        let dispatcher = ToolDispatcher::new(TextDoc::with_text("hello"));

        let unknown = dispatcher.dispatch("launch_rockets", &Map::new()).await;
        assert!(!unknown.success);
        assert_eq!(unknown.message, "Unknown tool: launch_rockets");

        let missing = dispatcher.dispatch("replace_text", &args(json!({"find": "hello"}))).await;
        assert!(!missing.success);
        assert!(missing.message.contains("replace"));
    }

    #[tokio::test]
    async fn document_failures_become_failures() {
        let dispatcher = ToolDispatcher::new(TextDoc::with_text("hello"));
        let result = dispatcher
            .dispatch("add_comment", &args(json!({"searchText": "hello", "comment": "hi"})))
            .await;
        assert!(!result.success);
        assert_eq!(result.message, "Document unavailable: comments are disabled");
    }

    #[tokio::test]
    async fn content_is_truncated() {
        let long = "a".repeat(MAX_CONTENT_CHARS + 10);
        let dispatcher = ToolDispatcher::new(TextDoc::with_text(&long));
        let result = dispatcher.dispatch("get_document_content", &Map::new()).await;
        assert_eq!(result.content.unwrap().len(), MAX_CONTENT_CHARS);
        assert_eq!(result.message, format!("Read {} chars", MAX_CONTENT_CHARS + 10));
    }

    #[tokio::test]
    async fn table_tools_accept_float_indices() {
        let dispatcher = ToolDispatcher::new(TextDoc::with_text(""));

        let missing = dispatcher.dispatch("format_table", &args(json!({"tableIndex": 0}))).await;
        assert_eq!(missing.message, "Table not found");

        let inserted = dispatcher
            .dispatch("insert_table", &args(json!({"rows": 2.0, "columns": 3})))
            .await;
        assert_eq!(inserted.message, "Inserted 2x3 table");

        let formatted = dispatcher
            .dispatch("format_table", &args(json!({"tableIndex": 0.0, "headerRow": true})))
            .await;
        assert!(formatted.success);
    }

    #[tokio::test]
    async fn execute_records_replacements_in_history() {
        let history = Arc::new(ChangeHistory::new());
        let dispatcher = ToolDispatcher::new(TextDoc::with_text("colour")).with_history(history.clone());

        dispatcher
            .execute(&ToolCall::new("c1", "replace_text", r#"{"find":"colour","replace":"color"}"#))
            .await;
        dispatcher
            .execute(&ToolCall::new("c2", "replace_text", r#"{"find":"absent","replace":"x"}"#))
            .await;

        let entries = history.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].before, "colour");
        assert_eq!(entries[0].after, "color");
    }

    #[test]
    fn highlight_names_map_to_palette() {
        assert_eq!(highlight("green"), Highlight::Color("BrightGreen".into()));
        assert_eq!(highlight("none"), Highlight::Clear);
        assert_eq!(highlight("Teal"), Highlight::Color("Teal".into()));
    }
}
