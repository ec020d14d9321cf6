//! Document Model
//!
//! Everything attached to the body text (formatting runs, comments,
//! paragraph properties, breaks) is anchored by byte offsets and moved along
//! by [`shift_start`] / [`shift_end`] whenever the text is edited.

use std::ops::Range;

use chrono::{DateTime, Utc};
use docpilot_core::document::{
    BreakKind, DocResult, DocumentError, DocumentStats, FontFormat, ListKind, ParagraphFormat,
    RowPosition,
};
use serde::Serialize;
use uuid::Uuid;

/// New position of a range start after `edit` was replaced by `inserted` bytes.
///
/// Text inserted exactly at the anchor lands in front of it.
pub const fn shift_start(pos: usize, edit: &Range<usize>, inserted: usize) -> usize {
    if pos < edit.start {
        pos
    } else if pos >= edit.end {
        pos + inserted - (edit.end - edit.start)
    } else {
        edit.start
    }
}

/// New position of a range end after `edit` was replaced by `inserted` bytes.
///
/// A range ending inside the edit grows to cover the inserted text.
pub const fn shift_end(pos: usize, edit: &Range<usize>, inserted: usize) -> usize {
    if pos <= edit.start {
        pos
    } else if pos >= edit.end {
        pos + inserted - (edit.end - edit.start)
    } else {
        edit.start + inserted
    }
}

/// New selection after `edit` was replaced by `inserted` bytes.
///
/// A collapsed selection is a cursor and moves as one point, ending up behind
/// text inserted at its position.
pub fn shift_selection(selection: &Range<usize>, edit: &Range<usize>, inserted: usize) -> Range<usize> {
    let start = shift_start(selection.start, edit, inserted);
    if selection.is_empty() {
        return start..start;
    }
    start..shift_end(selection.end, edit, inserted).max(start)
}

/// Offset of the paragraph containing `pos`
pub fn paragraph_start(text: &str, pos: usize) -> usize {
    text[..pos].rfind('\n').map_or(0, |i| i + 1)
}

/// Character formatting applied to `start..end`
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FormatRun {
    pub start: usize,
    pub end: usize,
    pub font: FontFormat,
}

impl FormatRun {
    pub fn shift(&mut self, edit: &Range<usize>, inserted: usize) {
        self.start = shift_start(self.start, edit, inserted);
        self.end = shift_end(self.end, edit, inserted);
    }

    pub const fn covers(&self, pos: usize) -> bool {
        self.start <= pos && pos < self.end
    }
}

/// Remove `cut` from every run, splitting runs that straddle it
pub fn cut_runs(runs: Vec<FormatRun>, cut: &Range<usize>) -> Vec<FormatRun> {
    let mut kept = Vec::with_capacity(runs.len());
    for run in runs {
        if run.end <= cut.start || run.start >= cut.end {
            kept.push(run);
            continue;
        }
        if run.start < cut.start {
            kept.push(FormatRun {
                start: run.start,
                end: cut.start,
                font: run.font.clone(),
            });
        }
        if run.end > cut.end {
            kept.push(FormatRun {
                start: cut.end,
                end: run.end,
                font: run.font,
            });
        }
    }
    kept
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    pub start: usize,
    pub end: usize,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(range: &Range<usize>, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            start: range.start,
            end: range.end,
            text: text.into(),
            created_at: Utc::now(),
        }
    }
}

/// Properties of the paragraph starting at `start`
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParagraphProps {
    pub start: usize,
    #[serde(flatten)]
    pub format: ParagraphFormat,
    pub list: Option<ListKind>,
    pub style: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct BreakMark {
    pub offset: usize,
    pub kind: BreakKind,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub rows: Vec<Vec<String>>,
    pub style: Option<String>,
    pub header_rows: usize,
}

impl Table {
    /// A `rows` x `columns` table filled from `data`; extra data is ignored
    pub fn new(rows: usize, columns: usize, data: &[Vec<String>]) -> Self {
        let rows = (0..rows)
            .map(|r| {
                (0..columns)
                    .map(|c| {
                        data.get(r)
                            .and_then(|row| row.get(c))
                            .cloned()
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .collect();

        Self {
            rows,
            style: None,
            header_rows: 0,
        }
    }

    pub fn columns(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    pub fn set_cell(&mut self, row: usize, column: usize, content: &str) -> DocResult<()> {
        let cell = self
            .rows
            .get_mut(row)
            .and_then(|r| r.get_mut(column))
            .ok_or_else(|| DocumentError::OutOfBounds(format!("Cell [{row},{column}] is outside the table")))?;
        content.clone_into(cell);
        Ok(())
    }

    pub fn add_row(&mut self, position: RowPosition, values: &[String]) {
        let row: Vec<String> = (0..self.columns())
            .map(|c| values.get(c).cloned().unwrap_or_default())
            .collect();

        match position {
            RowPosition::Start => self.rows.insert(0, row),
            RowPosition::End => self.rows.push(row),
        }
    }
}

/// Selected range, with its text
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SelectionView {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

/// Serializable view of the whole document
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DocumentSnapshot {
    pub text: String,
    pub selection: SelectionView,
    pub runs: Vec<FormatRun>,
    pub paragraphs: Vec<ParagraphProps>,
    pub comments: Vec<Comment>,
    pub tables: Vec<Table>,
    pub breaks: Vec<BreakMark>,
    pub stats: DocumentStats,
}
