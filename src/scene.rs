//! Per-side scene: elements, selection, z counter, and that side's history.

#[cfg(test)]
#[path = "scene_test.rs"]
mod scene_test;

use crate::doc::{CanvasElement, DocStore, ElementId};
use crate::history::{History, HistoryEntry};

/// Everything placed on one product side.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub doc: DocStore,
    selected: Option<ElementId>,
    max_z_index: i64,
    history: History,
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the scene with `elements` and make that state the undo floor.
    pub fn seed(&mut self, elements: Vec<CanvasElement>) {
        self.doc.load_snapshot(elements);
        self.selected = None;
        self.max_z_index = self.doc.max_z_index().unwrap_or(0).max(0);
        self.history = History::new(HistoryEntry { elements: self.doc.snapshot(), selected: None });
    }

    /// Record the current elements and selection as a new history entry.
    pub fn commit(&mut self) {
        self.history.save(&self.doc.snapshot(), self.selected);
    }

    /// Restore the previous history entry. Returns false at the floor.
    pub fn undo(&mut self) -> bool {
        let Some(entry) = self.history.undo() else {
            return false;
        };
        self.doc.load_snapshot(entry.elements.clone());
        self.selected = entry.selected;
        self.sync_max_z();
        true
    }

    /// Re-apply the next history entry. Returns false at the tip.
    pub fn redo(&mut self) -> bool {
        let Some(entry) = self.history.redo() else {
            return false;
        };
        self.doc.load_snapshot(entry.elements.clone());
        self.selected = entry.selected;
        self.sync_max_z();
        true
    }

    /// Drop uncommitted changes by reloading the current history entry.
    /// The selection survives if the element still exists.
    pub fn revert(&mut self) {
        let Some(entry) = self.history.current() else {
            return;
        };
        self.doc.load_snapshot(entry.elements.clone());
        self.select(self.selected);
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Reserve the next z-index above everything placed so far.
    pub fn next_z_index(&mut self) -> i64 {
        self.max_z_index += 1;
        self.max_z_index
    }

    #[must_use]
    pub fn max_z_index(&self) -> i64 {
        self.max_z_index
    }

    #[must_use]
    pub fn selected(&self) -> Option<ElementId> {
        self.selected
    }

    #[must_use]
    pub fn selected_element(&self) -> Option<&CanvasElement> {
        self.selected.and_then(|id| self.doc.get(&id))
    }

    /// Select an element. Selecting an unknown id clears the selection.
    pub fn select(&mut self, id: Option<ElementId>) {
        self.selected = id.filter(|id| self.doc.get(id).is_some());
    }

    fn sync_max_z(&mut self) {
        if let Some(z) = self.doc.max_z_index() {
            self.max_z_index = self.max_z_index.max(z);
        }
    }
}
