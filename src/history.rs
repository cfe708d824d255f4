//! Linear undo/redo log of full scene snapshots.
//!
//! DESIGN
//! ======
//! Each entry is an owned deep copy of the element list plus the selection at
//! the moment of a commit. The cursor always points at the entry matching the
//! live scene. Committing after an undo drops every entry beyond the cursor,
//! so the abandoned redo branch becomes unreachable.

#[cfg(test)]
#[path = "history_test.rs"]
mod history_test;

use crate::doc::{CanvasElement, ElementId};

/// An immutable snapshot of one side's scene.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub elements: Vec<CanvasElement>,
    pub selected: Option<ElementId>,
}

/// Snapshot sequence plus cursor.
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<HistoryEntry>,
    cursor: usize,
}

impl History {
    /// A history whose first (and floor) entry is `initial`.
    #[must_use]
    pub fn new(initial: HistoryEntry) -> Self {
        Self { entries: vec![initial], cursor: 0 }
    }

    /// Append a deep copy of `elements` and `selected`, pruning any redo
    /// branch beyond the cursor.
    pub fn save(&mut self, elements: &[CanvasElement], selected: Option<ElementId>) {
        self.entries.truncate(self.cursor + 1);
        self.entries.push(HistoryEntry { elements: elements.to_vec(), selected });
        self.cursor = self.entries.len() - 1;
    }

    /// Step back one entry. Returns the entry to restore, or `None` at the floor.
    pub fn undo(&mut self) -> Option<&HistoryEntry> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        self.entries.get(self.cursor)
    }

    /// Step forward one entry. Returns the entry to restore, or `None` at the tip.
    pub fn redo(&mut self) -> Option<&HistoryEntry> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        self.entries.get(self.cursor)
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    /// The entry the live scene corresponds to.
    #[must_use]
    pub fn current(&self) -> Option<&HistoryEntry> {
        self.entries.get(self.cursor)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(HistoryEntry { elements: Vec::new(), selected: None })
    }
}
