//! In-Memory Document
//!
//! A plain-text body with formatting, comments, paragraph properties and
//! tables kept alongside it. Used by the server and by tests.

use std::ops::Range;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use docpilot_core::document::{
    BreakKind, DocResult, Document, DocumentError, DocumentStats, FontFormat, InsertLocation,
    ListKind, ParagraphFormat, RangeHandle, RowPosition, SearchOptions,
};

use crate::model::{
    BreakMark, Comment, DocumentSnapshot, FormatRun, ParagraphProps, SelectionView, Table, cut_runs,
    paragraph_start, shift_end, shift_selection, shift_start,
};
use crate::search::find_all;

#[derive(Debug, Default)]
struct DocState {
    text: String,
    selection: Range<usize>,
    runs: Vec<FormatRun>,
    paragraphs: Vec<ParagraphProps>,
    comments: Vec<Comment>,
    tables: Vec<Table>,
    breaks: Vec<BreakMark>,
}

impl DocState {
    fn check(&self, range: &Range<usize>) -> DocResult<()> {
        let valid = range.start <= range.end
            && range.end <= self.text.len()
            && self.text.is_char_boundary(range.start)
            && self.text.is_char_boundary(range.end);

        if valid {
            Ok(())
        } else {
            Err(DocumentError::InvalidRange {
                start: range.start,
                end: range.end,
            })
        }
    }

    /// Replace `range` with `text` and move every anchor along
    fn splice(&mut self, range: Range<usize>, text: &str) -> DocResult<()> {
        self.check(&range)?;
        self.text.replace_range(range.clone(), text);
        let inserted = text.len();

        for run in &mut self.runs {
            run.shift(&range, inserted);
        }
        self.runs.retain(|run| run.start < run.end);

        for comment in &mut self.comments {
            comment.start = shift_start(comment.start, &range, inserted);
            comment.end = shift_end(comment.end, &range, inserted);
        }
        self.comments.retain(|c| c.start < c.end);

        for mark in &mut self.breaks {
            mark.offset = shift_start(mark.offset, &range, inserted);
        }

        self.selection = shift_selection(&self.selection, &range, inserted);

        self.realign_paragraphs(&range, inserted);
        Ok(())
    }

    /// Re-anchor paragraph properties on actual paragraph starts, first one wins
    fn realign_paragraphs(&mut self, edit: &Range<usize>, inserted: usize) {
        let mut realigned: Vec<ParagraphProps> = Vec::with_capacity(self.paragraphs.len());
        for mut props in std::mem::take(&mut self.paragraphs) {
            let shifted = shift_start(props.start, edit, inserted).min(self.text.len());
            props.start = paragraph_start(&self.text, shifted);
            if !realigned.iter().any(|p| p.start == props.start) {
                realigned.push(props);
            }
        }
        self.paragraphs = realigned;
    }

    /// Properties of the paragraph containing `pos`, created on first use
    fn paragraph_mut(&mut self, pos: usize) -> &mut ParagraphProps {
        let start = paragraph_start(&self.text, pos);
        let index = match self.paragraphs.iter().position(|p| p.start == start) {
            Some(index) => index,
            None => {
                self.paragraphs.push(ParagraphProps {
                    start,
                    ..ParagraphProps::default()
                });
                self.paragraphs.len() - 1
            }
        };
        &mut self.paragraphs[index]
    }

    fn table_mut(&mut self, index: usize) -> DocResult<&mut Table> {
        self.tables
            .get_mut(index)
            .ok_or_else(|| DocumentError::NotFound(format!("Table {index}")))
    }

    fn stats(&self) -> DocumentStats {
        DocumentStats {
            characters: self.text.chars().count(),
            words: self.text.split_whitespace().count(),
            paragraphs: self.text.split('\n').count(),
            tables: self.tables.len(),
        }
    }
}

fn span(range: RangeHandle) -> Range<usize> {
    range.start()..range.end()
}

/// Thread-safe document held entirely in memory
#[derive(Debug, Default)]
pub struct InMemoryDocument {
    state: RwLock<DocState>,
}

impl InMemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        let doc = Self::new();
        doc.write().text = text.into();
        doc
    }

    fn read(&self) -> RwLockReadGuard<'_, DocState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, DocState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn text(&self) -> String {
        self.read().text.clone()
    }

    /// Replace the whole body, dropping all formatting, comments and tables
    pub fn set_text(&self, text: impl Into<String>) {
        let mut state = self.write();
        *state = DocState {
            text: text.into(),
            ..DocState::default()
        };
        tracing::debug!(chars = state.text.len(), "document replaced");
    }

    /// Select a byte range of the body
    pub fn select(&self, start: usize, end: usize) -> DocResult<()> {
        let mut state = self.write();
        state.check(&(start..end))?;
        state.selection = start..end;
        Ok(())
    }

    /// Select the first case-sensitive occurrence of `text`. Returns whether it was found.
    pub fn select_text(&self, text: &str) -> bool {
        let mut state = self.write();
        match find_all(&state.text, text, true).into_iter().next() {
            Some(range) => {
                state.selection = range;
                true
            }
            None => false,
        }
    }

    /// Effective character formatting at byte offset `pos`
    pub fn font_at(&self, pos: usize) -> FontFormat {
        let state = self.read();
        let mut font = FontFormat::default();
        for run in state.runs.iter().filter(|r| r.covers(pos)) {
            font.merge(&run.font);
        }
        font
    }

    /// Properties of the paragraph containing byte offset `pos`
    pub fn paragraph_at(&self, pos: usize) -> Option<ParagraphProps> {
        let state = self.read();
        let start = paragraph_start(&state.text, pos.min(state.text.len()));
        state.paragraphs.iter().find(|p| p.start == start).cloned()
    }

    pub fn comments(&self) -> Vec<Comment> {
        self.read().comments.clone()
    }

    pub fn tables(&self) -> Vec<Table> {
        self.read().tables.clone()
    }

    pub fn breaks(&self) -> Vec<BreakMark> {
        self.read().breaks.clone()
    }

    pub fn snapshot(&self) -> DocumentSnapshot {
        let state = self.read();
        let mut paragraphs = state.paragraphs.clone();
        paragraphs.sort_by_key(|p| p.start);

        DocumentSnapshot {
            text: state.text.clone(),
            selection: SelectionView {
                start: state.selection.start,
                end: state.selection.end,
                text: state.text[state.selection.clone()].to_string(),
            },
            runs: state.runs.clone(),
            paragraphs,
            comments: state.comments.clone(),
            tables: state.tables.clone(),
            breaks: state.breaks.clone(),
            stats: state.stats(),
        }
    }
}

#[async_trait]
impl Document for InMemoryDocument {
    async fn read_text(&self) -> DocResult<String> {
        Ok(self.text())
    }

    async fn selection_text(&self) -> DocResult<String> {
        let state = self.read();
        Ok(state.text[state.selection.clone()].to_string())
    }

    async fn search(&self, text: &str, options: SearchOptions) -> DocResult<Vec<RangeHandle>> {
        Ok(find_all(&self.read().text, text, options.match_case)
            .into_iter()
            .map(|r| RangeHandle::new(r.start, r.end))
            .collect())
    }

    async fn replace_range(&self, range: RangeHandle, text: &str) -> DocResult<()> {
        self.write().splice(span(range), text)?;
        tracing::debug!(start = range.start(), end = range.end(), "range replaced");
        Ok(())
    }

    async fn set_font(&self, range: RangeHandle, font: &FontFormat) -> DocResult<()> {
        let mut state = self.write();
        let range = span(range);
        state.check(&range)?;
        if !font.is_empty() && !range.is_empty() {
            state.runs.push(FormatRun {
                start: range.start,
                end: range.end,
                font: font.clone(),
            });
        }
        Ok(())
    }

    async fn clear_formatting(&self, range: RangeHandle) -> DocResult<()> {
        let mut state = self.write();
        let range = span(range);
        state.check(&range)?;
        let runs = std::mem::take(&mut state.runs);
        state.runs = cut_runs(runs, &range);
        Ok(())
    }

    async fn format_paragraph(&self, range: RangeHandle, format: &ParagraphFormat) -> DocResult<()> {
        let mut state = self.write();
        state.check(&span(range))?;
        state.paragraph_mut(range.start()).format.merge(format);
        Ok(())
    }

    async fn set_list(&self, range: RangeHandle, list: Option<ListKind>) -> DocResult<()> {
        let mut state = self.write();
        state.check(&span(range))?;
        state.paragraph_mut(range.start()).list = list;
        Ok(())
    }

    async fn apply_style(&self, range: RangeHandle, style: &str) -> DocResult<()> {
        let mut state = self.write();
        state.check(&span(range))?;
        state.paragraph_mut(range.start()).style = Some(style.to_string());
        Ok(())
    }

    async fn insert_comment(&self, range: RangeHandle, comment: &str) -> DocResult<()> {
        let mut state = self.write();
        let range = span(range);
        state.check(&range)?;
        state.comments.push(Comment::new(&range, comment));
        Ok(())
    }

    async fn insert_text(&self, text: &str, location: InsertLocation) -> DocResult<()> {
        let mut state = self.write();
        match location {
            InsertLocation::Start => state.splice(0..0, text),
            InsertLocation::End => {
                let end = state.text.len();
                state.splice(end..end, text)
            }
            InsertLocation::ReplaceSelection => {
                let selection = state.selection.clone();
                state.splice(selection.clone(), text)?;
                state.selection = selection.start..selection.start + text.len();
                Ok(())
            }
        }
    }

    async fn insert_break(&self, kind: BreakKind) -> DocResult<()> {
        let mut state = self.write();
        let offset = state.text.len();
        state.splice(offset..offset, "\n")?;
        state.breaks.push(BreakMark { offset, kind });
        Ok(())
    }

    async fn table_count(&self) -> DocResult<usize> {
        Ok(self.read().tables.len())
    }

    async fn insert_table(&self, rows: usize, columns: usize, data: &[Vec<String>]) -> DocResult<()> {
        if rows == 0 || columns == 0 {
            return Err(DocumentError::OutOfBounds("A table needs at least one row and one column".into()));
        }
        self.write().tables.push(Table::new(rows, columns, data));
        Ok(())
    }

    async fn format_table(&self, table: usize, style: Option<&str>, header_row: bool) -> DocResult<()> {
        let mut state = self.write();
        let table = state.table_mut(table)?;
        if let Some(style) = style {
            table.style = Some(style.to_string());
        }
        if header_row {
            table.header_rows = 1;
        }
        Ok(())
    }

    async fn set_table_cell(&self, table: usize, row: usize, column: usize, content: &str) -> DocResult<()> {
        self.write().table_mut(table)?.set_cell(row, column, content)
    }

    async fn add_table_row(&self, table: usize, position: RowPosition, values: &[String]) -> DocResult<()> {
        self.write().table_mut(table)?.add_row(position, values);
        Ok(())
    }

    async fn stats(&self) -> DocResult<DocumentStats> {
        Ok(self.read().stats())
    }
}

#[cfg(test)]
mod tests {
    use docpilot_core::document::{Alignment, Underline};

    use super::*;

    async fn ranges(doc: &InMemoryDocument, text: &str) -> Vec<RangeHandle> {
        doc.search(text, SearchOptions::default()).await.unwrap()
    }

    #[tokio::test]
    async fn reverse_order_replacement_keeps_ranges_valid() {
        let doc = InMemoryDocument::from_text("foo and foo and FOO");
        let found = ranges(&doc, "foo").await;
        assert_eq!(found.len(), 3);

        for range in found.iter().rev() {
            doc.replace_range(*range, "quux").await.unwrap();
        }
        assert_eq!(doc.text(), "quux and quux and quux");
    }

    #[tokio::test]
    async fn stale_range_is_rejected() {
        let doc = InMemoryDocument::from_text("héllo");
        let err = doc.replace_range(RangeHandle::new(1, 2), "x").await.unwrap_err();
        assert_eq!(err, DocumentError::InvalidRange { start: 1, end: 2 });

        let err = doc.replace_range(RangeHandle::new(0, 99), "x").await.unwrap_err();
        assert!(matches!(err, DocumentError::InvalidRange { .. }));
    }

    #[tokio::test]
    async fn formatting_follows_the_text() {
        let doc = InMemoryDocument::from_text("make this bold please");
        let target = ranges(&doc, "bold").await[0];
        let font = FontFormat {
            bold: Some(true),
            underline: Some(Underline::Double),
            ..FontFormat::default()
        };
        doc.set_font(target, &font).await.unwrap();

        // insert in front, then check the run moved with the word
        doc.insert_text(">> ", InsertLocation::Start).await.unwrap();
        let moved = ranges(&doc, "bold").await[0];
        assert_eq!(doc.font_at(moved.start()).bold, Some(true));
        assert_eq!(doc.font_at(0).bold, None);

        doc.clear_formatting(moved).await.unwrap();
        assert!(doc.font_at(moved.start()).is_empty());
    }

    #[tokio::test]
    async fn paragraph_properties_attach_to_the_containing_paragraph() {
        let doc = InMemoryDocument::from_text("Title\nFirst item\nSecond item");
        let item = ranges(&doc, "First").await[0];

        doc.set_list(item, Some(ListKind::Bullet)).await.unwrap();
        doc.apply_style(item, "Heading2").await.unwrap();
        doc.format_paragraph(
            item,
            &ParagraphFormat {
                alignment: Some(Alignment::Center),
                line_spacing: Some(18.0),
                ..ParagraphFormat::default()
            },
        )
        .await
        .unwrap();

        let props = doc.paragraph_at(item.start() + 3).unwrap();
        assert_eq!(props.start, 6);
        assert_eq!(props.list, Some(ListKind::Bullet));
        assert_eq!(props.style.as_deref(), Some("Heading2"));
        assert_eq!(props.format.alignment, Some(Alignment::Center));
        assert!(doc.paragraph_at(0).is_none());

        // an edit in the title moves the paragraph anchor with it
        doc.insert_text("The ", InsertLocation::Start).await.unwrap();
        assert_eq!(doc.paragraph_at(10).map(|p| p.start), Some(10));

        doc.set_list(ranges(&doc, "First").await[0], None).await.unwrap();
        assert_eq!(doc.paragraph_at(10).and_then(|p| p.list), None);
    }

    #[tokio::test]
    async fn replace_selection_and_selection_text() {
        let doc = InMemoryDocument::from_text("Hello cruel world");
        assert_eq!(doc.selection_text().await.unwrap(), "");

        assert!(doc.select_text("cruel"));
        assert_eq!(doc.selection_text().await.unwrap(), "cruel");

        doc.insert_text("kind", InsertLocation::ReplaceSelection).await.unwrap();
        assert_eq!(doc.text(), "Hello kind world");
        assert_eq!(doc.selection_text().await.unwrap(), "kind");

        doc.insert_text("!", InsertLocation::End).await.unwrap();
        assert_eq!(doc.text(), "Hello kind world!");
        assert!(!doc.select_text("cruel"));
    }

    #[tokio::test]
    async fn cursor_moves_behind_text_inserted_at_it() {
        let doc = InMemoryDocument::from_text("hello");
        doc.insert_text(">> ", InsertLocation::Start).await.unwrap();
        assert_eq!(doc.text(), ">> hello");
        assert_eq!(doc.selection_text().await.unwrap(), "");
        assert_eq!(doc.snapshot().selection.start, 3);

        doc.select(8, 8).unwrap();
        doc.insert_break(BreakKind::Page).await.unwrap();
        let snapshot = doc.snapshot();
        assert_eq!((snapshot.selection.start, snapshot.selection.end), (9, 9));
        assert_eq!(snapshot.selection.text, "");

        // a cursor placed after the insert is carried along too
        doc.insert_text("x", InsertLocation::ReplaceSelection).await.unwrap();
        assert_eq!(doc.text(), ">> hello\nx");
    }

    #[tokio::test]
    async fn comments_are_anchored_and_dropped_with_their_text() {
        let doc = InMemoryDocument::from_text("check this claim");
        let claim = ranges(&doc, "claim").await[0];
        doc.insert_comment(claim, "source?").await.unwrap();

        let comments = doc.comments();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].text, "source?");
        assert_eq!((comments[0].start, comments[0].end), (11, 16));

        doc.replace_range(claim, "").await.unwrap();
        assert!(doc.comments().is_empty());
    }

    #[tokio::test]
    async fn tables() {
        let doc = InMemoryDocument::new();
        assert_eq!(doc.table_count().await.unwrap(), 0);

        doc.insert_table(2, 2, &[vec!["Name".into(), "Qty".into()]]).await.unwrap();
        doc.format_table(0, Some("GridTable4_Accent1"), true).await.unwrap();
        doc.set_table_cell(0, 1, 0, "Apples").await.unwrap();
        doc.add_table_row(0, RowPosition::End, &["Pears".into(), "3".into()]).await.unwrap();

        let table = &doc.tables()[0];
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[0], vec!["Name", "Qty"]);
        assert_eq!(table.rows[1][0], "Apples");
        assert_eq!(table.rows[2], vec!["Pears", "3"]);
        assert_eq!(table.style.as_deref(), Some("GridTable4_Accent1"));
        assert_eq!(table.header_rows, 1);

        let err = doc.format_table(4, None, false).await.unwrap_err();
        assert_eq!(err.to_string(), "Table 4 not found");
        assert!(doc.set_table_cell(0, 9, 9, "x").await.is_err());
        assert!(doc.insert_table(0, 3, &[]).await.is_err());
    }

    #[tokio::test]
    async fn breaks_and_stats() {
        let doc = InMemoryDocument::from_text("One two three");
        doc.insert_break(BreakKind::Page).await.unwrap();
        doc.insert_text("Four", InsertLocation::End).await.unwrap();
        doc.insert_table(1, 1, &[]).await.unwrap();

        assert_eq!(doc.breaks(), vec![BreakMark { offset: 13, kind: BreakKind::Page }]);

        let stats = doc.stats().await.unwrap();
        assert_eq!(stats.words, 4);
        assert_eq!(stats.paragraphs, 2);
        assert_eq!(stats.characters, 18);
        assert_eq!(stats.tables, 1);
    }

    #[tokio::test]
    async fn snapshot_serializes() {
        let doc = InMemoryDocument::from_text("abc");
        doc.select(0, 2).unwrap();
        let snapshot = serde_json::to_value(doc.snapshot()).unwrap();
        assert_eq!(snapshot["text"], "abc");
        assert_eq!(snapshot["selection"]["text"], "ab");
        assert_eq!(snapshot["stats"]["characters"], 3);

        doc.set_text("fresh");
        assert_eq!(doc.snapshot().selection.end, 0);
    }
}
