//! Browser history bridge.
//!
//! Entries record the path a navigation committed to, after default-child
//! expansion, plus its synced params. A direct hit on a structural node is
//! therefore never an entry of its own, and going back from the expanded
//! leaf lands on whatever preceded the hit.

use serde::{Deserialize, Serialize};

use crate::route::{ResolvedRoute, format_url};
use crate::tree::Params;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub path: String,
    pub synced_params: Params,
    /// Structural path that was expanded into `path`, if any.
    pub expanded_from: Option<String>,
}

impl HistoryEntry {
    pub fn url(&self) -> String {
        format_url(&self.path, &self.synced_params)
    }
}

impl From<&ResolvedRoute> for HistoryEntry {
    fn from(route: &ResolvedRoute) -> Self {
        Self {
            path: route.path.clone(),
            synced_params: route.synced_params.clone(),
            expanded_from: route.expanded_from.clone(),
        }
    }
}

/// Linear history with a cursor, like a browser tab.
#[derive(Debug, Clone, Default)]
pub struct HistoryAdapter {
    entries: Vec<HistoryEntry>,
    cursor: Option<usize>,
}

impl HistoryAdapter {
    /// Record a new entry, dropping anything forward of the cursor.
    pub fn push(&mut self, entry: HistoryEntry) {
        let keep = self.cursor.map_or(0, |c| c + 1);
        self.entries.truncate(keep);
        self.entries.push(entry);
        self.cursor = Some(self.entries.len() - 1);
    }

    /// Overwrite the current entry, or record the first one.
    pub fn replace(&mut self, entry: HistoryEntry) {
        match self.cursor {
            Some(cursor) => self.entries[cursor] = entry,
            None => self.push(entry),
        }
    }

    pub fn current(&self) -> Option<&HistoryEntry> {
        self.cursor.map(|c| &self.entries[c])
    }

    pub fn can_go_back(&self) -> bool {
        self.cursor.is_some_and(|c| c > 0)
    }

    pub fn can_go_forward(&self) -> bool {
        self.cursor.is_some_and(|c| c + 1 < self.entries.len())
    }

    /// Move the cursor back and return the entry to restore.
    pub fn back(&mut self) -> Option<&HistoryEntry> {
        if !self.can_go_back() {
            return None;
        }
        let cursor = self.cursor.map(|c| c - 1)?;
        self.cursor = Some(cursor);
        self.entries.get(cursor)
    }

    pub fn forward(&mut self) -> Option<&HistoryEntry> {
        if !self.can_go_forward() {
            return None;
        }
        let cursor = self.cursor.map(|c| c + 1)?;
        self.cursor = Some(cursor);
        self.entries.get(cursor)
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
