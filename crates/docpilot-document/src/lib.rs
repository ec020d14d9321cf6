//! # docpilot-document
//!
//! In-memory implementation of the [`Document`](docpilot_core::Document)
//! editing contract.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  body text    "Hello world\nNext para"       │
//! ├──────────────────────────────────────────────┤
//! │  runs         [6..11) bold                   │
//! │  paragraphs   @0 center, @12 bullet list     │
//! │  comments     [6..11) "which world?"         │
//! │  breaks       @21 page                       │
//! ├──────────────────────────────────────────────┤
//! │  tables       kept beside the body text      │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Ranges are byte offsets into the body. Every anchor moves with the text
//! when the body is edited, so ranges found before a mutation stay valid as
//! long as mutations are applied back to front.

pub mod memory;
pub mod model;
pub mod search;

pub use memory::InMemoryDocument;
pub use model::{BreakMark, Comment, DocumentSnapshot, FormatRun, ParagraphProps, Table};
