//! Change History
//!
//! Records text replacements applied by the agent so a user can undo them one
//! at a time. Reverting is a manual inverse replacement, not a rollback.

use std::collections::VecDeque;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::dispatch::ToolDispatcher;
use crate::tool::ToolResult;

/// Entries kept before the oldest is dropped
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// One recorded replacement
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub id: Uuid,

    /// Tool that produced the change
    pub tool: String,

    /// Text that was searched for
    pub before: String,

    /// Text it was replaced with
    pub after: String,

    pub recorded_at: DateTime<Utc>,
}

/// Bounded, newest-first list of replacements
#[derive(Debug)]
pub struct ChangeHistory {
    entries: RwLock<VecDeque<ChangeRecord>>,
    capacity: usize,
}

impl Default for ChangeHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeHistory {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity: capacity.max(1),
        }
    }

    /// Record a change, evicting the oldest entry when full
    pub fn record(&self, tool: &str, before: &str, after: &str) -> ChangeRecord {
        let record = ChangeRecord {
            id: Uuid::new_v4(),
            tool: tool.to_string(),
            before: before.to_string(),
            after: after.to_string(),
            recorded_at: Utc::now(),
        };

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.push_front(record.clone());
        entries.truncate(self.capacity);

        tracing::debug!(id = %record.id, tool = %tool, "change recorded");
        record
    }

    /// Snapshot of all entries, newest first
    pub fn entries(&self) -> Vec<ChangeRecord> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.iter().cloned().collect()
    }

    pub fn get(&self, id: Uuid) -> Option<ChangeRecord> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.iter().find(|r| r.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.write().unwrap_or_else(PoisonError::into_inner).clear();
    }

    /// Undo one change by replacing its `after` text with its `before` text.
    ///
    /// Returns `None` if no entry has this id. The entry stays in the history,
    /// and the inverse replacement is not itself recorded.
    pub async fn revert(&self, id: Uuid, dispatcher: &ToolDispatcher) -> Option<ToolResult> {
        let record = self.get(id)?;

        let mut args = Map::new();
        args.insert("find".into(), Value::String(record.after.clone()));
        args.insert("replace".into(), Value::String(record.before.clone()));

        let result = dispatcher.dispatch("replace_text", &args).await;
        tracing::info!(id = %id, success = result.success, "change reverted");
        Some(result)
    }
}
