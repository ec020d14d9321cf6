//! Document Mutation Contract
//!
//! The editing surface the tools ultimately drive. Implementations live
//! outside this crate (an in-memory document, an editor bridge, ...); the
//! agent only ever talks to a document through this trait.
//!
//! When an operation resolves to several matching ranges and mutates them,
//! callers apply the mutations in reverse order so that editing one match
//! never shifts the position of a match still waiting to be processed.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::AgentError;

/// Result type for document operations
pub type DocResult<T> = std::result::Result<T, DocumentError>;

/// Errors reported by a document implementation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Range {start}..{end} is not valid for this document")]
    InvalidRange { start: usize, end: usize },

    #[error("{0}")]
    OutOfBounds(String),

    #[error("Document unavailable: {0}")]
    Unavailable(String),

    #[error("{0}")]
    Other(String),
}

impl From<DocumentError> for AgentError {
    fn from(err: DocumentError) -> Self {
        Self::DocumentMutation(err.to_string())
    }
}

/// Opaque handle to a contiguous range returned by [`Document::search`].
///
/// Only meaningful to the document that produced it, and only until that
/// document is next mutated in front of the range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RangeHandle {
    start: usize,
    end: usize,
}

impl RangeHandle {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub const fn start(&self) -> usize {
        self.start
    }

    pub const fn end(&self) -> usize {
        self.end
    }
}

/// Search options
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SearchOptions {
    pub match_case: bool,
}

impl SearchOptions {
    pub const fn match_case(match_case: bool) -> Self {
        Self { match_case }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Underline {
    None,
    Single,
    Double,
    Dotted,
    Dashed,
    Wave,
}

/// Highlight instruction: a named highlight color, or removal
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Highlight {
    Color(String),
    Clear,
}

/// Character formatting; `None` fields are left untouched
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FontFormat {
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<Underline>,
    pub strikethrough: Option<bool>,
    pub subscript: Option<bool>,
    pub superscript: Option<bool>,
    pub name: Option<String>,
    pub size: Option<f64>,
    pub color: Option<String>,
    pub highlight: Option<Highlight>,
    pub all_caps: Option<bool>,
    pub small_caps: Option<bool>,
}

impl FontFormat {
    /// Whether applying this format would change anything
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Overlay `other` on top of `self`
    pub fn merge(&mut self, other: &Self) {
        macro_rules! overlay {
            ($($field:ident),*) => {
                $(if other.$field.is_some() { self.$field.clone_from(&other.$field); })*
            };
        }
        overlay!(
            bold, italic, underline, strikethrough, subscript, superscript, name, size, color,
            highlight, all_caps, small_caps
        );
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    Center,
    Right,
    Justified,
}

/// Paragraph formatting; `None` fields are left untouched. Measurements in points.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ParagraphFormat {
    pub alignment: Option<Alignment>,
    pub line_spacing: Option<f64>,
    pub space_before: Option<f64>,
    pub space_after: Option<f64>,
    pub first_line_indent: Option<f64>,
    pub left_indent: Option<f64>,
    pub right_indent: Option<f64>,
}

impl ParagraphFormat {
    /// Overlay `other` on top of `self`
    pub fn merge(&mut self, other: &Self) {
        macro_rules! overlay {
            ($($field:ident),*) => {
                $(if other.$field.is_some() { self.$field = other.$field; })*
            };
        }
        overlay!(
            alignment, line_spacing, space_before, space_after, first_line_indent, left_indent,
            right_indent
        );
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    Bullet,
    Number,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertLocation {
    Start,
    End,
    ReplaceSelection,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BreakKind {
    Page,
    Line,
    SectionNext,
    SectionContinuous,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowPosition {
    Start,
    End,
}

/// Document statistics
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentStats {
    pub characters: usize,
    pub words: usize,
    pub paragraphs: usize,
    pub tables: usize,
}

/// The document editing API consumed by the tool dispatcher.
///
/// Every operation is fallible and asynchronous.
#[async_trait]
pub trait Document: Send + Sync {
    /// Full body text
    async fn read_text(&self) -> DocResult<String>;

    /// Currently selected text (empty when nothing is selected)
    async fn selection_text(&self) -> DocResult<String>;

    /// All ranges matching `text`, in document order
    async fn search(&self, text: &str, options: SearchOptions) -> DocResult<Vec<RangeHandle>>;

    /// Replace the text of a range (empty `text` deletes it)
    async fn replace_range(&self, range: RangeHandle, text: &str) -> DocResult<()>;

    async fn set_font(&self, range: RangeHandle, font: &FontFormat) -> DocResult<()>;

    /// Reset character formatting of a range to defaults
    async fn clear_formatting(&self, range: RangeHandle) -> DocResult<()>;

    /// Format the paragraph containing the start of `range`
    async fn format_paragraph(&self, range: RangeHandle, format: &ParagraphFormat) -> DocResult<()>;

    /// Attach the paragraph containing `range` to a list, or detach it with `None`
    async fn set_list(&self, range: RangeHandle, list: Option<ListKind>) -> DocResult<()>;

    /// Apply a built-in style to the paragraph containing `range`
    async fn apply_style(&self, range: RangeHandle, style: &str) -> DocResult<()>;

    /// Attach a margin comment to a range
    async fn insert_comment(&self, range: RangeHandle, comment: &str) -> DocResult<()>;

    async fn insert_text(&self, text: &str, location: InsertLocation) -> DocResult<()>;

    /// Insert a break at the end of the document
    async fn insert_break(&self, kind: BreakKind) -> DocResult<()>;

    async fn table_count(&self) -> DocResult<usize>;

    /// Append a `rows` x `columns` table, filling cells from `data` where given
    async fn insert_table(&self, rows: usize, columns: usize, data: &[Vec<String>]) -> DocResult<()>;

    async fn format_table(&self, table: usize, style: Option<&str>, header_row: bool) -> DocResult<()>;

    async fn set_table_cell(&self, table: usize, row: usize, column: usize, content: &str) -> DocResult<()>;

    async fn add_table_row(&self, table: usize, position: RowPosition, values: &[String]) -> DocResult<()>;

    async fn stats(&self) -> DocResult<DocumentStats>;
}

/// First `limit` characters of the document, or empty if it cannot be read
pub async fn context_excerpt(document: &dyn Document, limit: usize) -> String {
    match document.read_text().await {
        Ok(text) => text.chars().take(limit).collect(),
        Err(e) => {
            tracing::warn!(error = %e, "could not read document context");
            String::new()
        }
    }
}
