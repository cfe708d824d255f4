//! Document model: canvas elements, typed sparse updates, and the store.
//!
//! This module defines what sits on one product side (`CanvasElement`,
//! `ElementKind`), an explicit builder for incremental edits
//! (`ElementPatch`), and the runtime store that owns the live elements of a
//! side (`DocStore`).
//!
//! Coordinates are design-area-relative: `(0, 0)` is the top-left of the
//! printable region. The renderer reads from `DocStore` via
//! `sorted_elements` to determine paint order.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::camera::Point;
use crate::geometry::Rect;

/// Unique identifier for a canvas element.
pub type ElementId = Uuid;

/// The kind of a canvas element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    /// Raster image; `content` is a URL or data URI.
    Image,
    /// Literal text; `content` is the string to display.
    Text,
}

/// An element placed on one product side.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasElement {
    /// Stable identifier for the element's lifetime.
    pub id: ElementId,
    /// Image or text.
    pub kind: ElementKind,
    /// Image URL / data URI, or literal text.
    pub content: String,
    /// Left edge of the unrotated bounding box.
    pub x: f64,
    /// Top edge of the unrotated bounding box.
    pub y: f64,
    /// Always positive.
    pub width: f64,
    /// Always positive.
    pub height: f64,
    /// Clockwise rotation in degrees around the bounding-box center.
    pub rotation: f64,
    /// Stacking order; lower values are painted beneath higher values.
    pub z_index: i64,
    /// `width / height` at creation or after the last non-distorting resize.
    pub aspect_ratio: f64,
    /// Excluded from every transform; still selectable.
    pub locked: bool,
    /// Mirrored horizontally when painted.
    pub flip_h: bool,
    /// Mirrored vertically when painted.
    pub flip_v: bool,
    /// Excluded from painting and hit-testing.
    pub hidden: bool,
}

impl CanvasElement {
    /// Build an unlocked, unrotated element occupying `rect`.
    #[must_use]
    pub fn new(kind: ElementKind, content: impl Into<String>, rect: Rect, z_index: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            content: content.into(),
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            rotation: 0.0,
            z_index,
            aspect_ratio: rect.width / rect.height,
            locked: false,
            flip_h: false,
            flip_v: false,
            hidden: false,
        }
    }

    /// The unrotated bounding box.
    #[must_use]
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    #[must_use]
    pub fn center(&self) -> Point {
        self.rect().center()
    }

    #[must_use]
    pub fn is_image(&self) -> bool {
        self.kind == ElementKind::Image
    }

    /// The recorded aspect ratio, or the current one if the record is unusable.
    #[must_use]
    pub fn effective_aspect(&self) -> f64 {
        if self.aspect_ratio.is_finite() && self.aspect_ratio > 0.0 {
            self.aspect_ratio
        } else {
            self.width / self.height
        }
    }
}

/// Sparse update for a canvas element. Only present fields are applied.
///
/// Built with chained setters so every call site states which fields it
/// touches:
///
/// ```
/// use print_canvas::doc::ElementPatch;
/// let patch = ElementPatch::new().position(10.0, 20.0).rotation(90.0);
/// assert_eq!(patch.x, Some(10.0));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z_index: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flip_h: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flip_v: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
}

impl ElementPatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn position(mut self, x: f64, y: f64) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self
    }

    #[must_use]
    pub fn x(mut self, x: f64) -> Self {
        self.x = Some(x);
        self
    }

    #[must_use]
    pub fn y(mut self, y: f64) -> Self {
        self.y = Some(y);
        self
    }

    #[must_use]
    pub fn size(mut self, width: f64, height: f64) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Position and size from a rectangle.
    #[must_use]
    pub fn rect(self, rect: Rect) -> Self {
        self.position(rect.x, rect.y).size(rect.width, rect.height)
    }

    #[must_use]
    pub fn rotation(mut self, deg: f64) -> Self {
        self.rotation = Some(deg);
        self
    }

    #[must_use]
    pub fn z_index(mut self, z: i64) -> Self {
        self.z_index = Some(z);
        self
    }

    #[must_use]
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    #[must_use]
    pub fn aspect_ratio(mut self, ratio: f64) -> Self {
        self.aspect_ratio = Some(ratio);
        self
    }

    #[must_use]
    pub fn locked(mut self, locked: bool) -> Self {
        self.locked = Some(locked);
        self
    }

    #[must_use]
    pub fn flip_h(mut self, flip: bool) -> Self {
        self.flip_h = Some(flip);
        self
    }

    #[must_use]
    pub fn flip_v(mut self, flip: bool) -> Self {
        self.flip_v = Some(flip);
        self
    }

    #[must_use]
    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = Some(hidden);
        self
    }

    /// Whether the patch touches position or size.
    #[must_use]
    pub fn touches_geometry(&self) -> bool {
        self.x.is_some()
            || self.y.is_some()
            || self.width.is_some()
            || self.height.is_some()
            || self.rotation.is_some()
    }
}

/// In-memory store of the elements on one product side.
///
/// Elements are kept in insertion order so `z_index` ties paint in the order
/// the elements were added.
#[derive(Debug, Clone, Default)]
pub struct DocStore {
    elements: Vec<CanvasElement>,
}

impl DocStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self { elements: Vec::new() }
    }

    /// Insert or replace an element. An existing element with the same `id`
    /// is overwritten in place, keeping its insertion slot.
    pub fn insert(&mut self, element: CanvasElement) {
        if let Some(existing) = self.get_mut(&element.id) {
            *existing = element;
        } else {
            self.elements.push(element);
        }
    }

    /// Remove an element by id, returning it if it was present.
    pub fn remove(&mut self, id: &ElementId) -> Option<CanvasElement> {
        let idx = self.elements.iter().position(|e| e.id == *id)?;
        Some(self.elements.remove(idx))
    }

    /// Return a reference to an element by id.
    #[must_use]
    pub fn get(&self, id: &ElementId) -> Option<&CanvasElement> {
        self.elements.iter().find(|e| e.id == *id)
    }

    pub fn get_mut(&mut self, id: &ElementId) -> Option<&mut CanvasElement> {
        self.elements.iter_mut().find(|e| e.id == *id)
    }

    /// Apply a patch to an existing element. Returns false if the element
    /// doesn't exist.
    ///
    /// Non-positive or non-finite sizes are ignored so an element can never
    /// reach a degenerate box through a patch.
    pub fn apply_patch(&mut self, id: &ElementId, patch: &ElementPatch) -> bool {
        let Some(el) = self.get_mut(id) else {
            return false;
        };
        if let Some(x) = patch.x.filter(|v| v.is_finite()) {
            el.x = x;
        }
        if let Some(y) = patch.y.filter(|v| v.is_finite()) {
            el.y = y;
        }
        if let Some(w) = patch.width.filter(|v| v.is_finite() && *v > 0.0) {
            el.width = w;
        }
        if let Some(h) = patch.height.filter(|v| v.is_finite() && *v > 0.0) {
            el.height = h;
        }
        if let Some(r) = patch.rotation.filter(|v| v.is_finite()) {
            el.rotation = r;
        }
        if let Some(z) = patch.z_index {
            el.z_index = z;
        }
        if let Some(ref content) = patch.content {
            el.content.clone_from(content);
        }
        if let Some(a) = patch.aspect_ratio.filter(|v| v.is_finite() && *v > 0.0) {
            el.aspect_ratio = a;
        }
        if let Some(locked) = patch.locked {
            el.locked = locked;
        }
        if let Some(flip) = patch.flip_h {
            el.flip_h = flip;
        }
        if let Some(flip) = patch.flip_v {
            el.flip_v = flip;
        }
        if let Some(hidden) = patch.hidden {
            el.hidden = hidden;
        }
        true
    }

    /// Replace all elements with a snapshot.
    pub fn load_snapshot(&mut self, elements: Vec<CanvasElement>) {
        self.elements = elements;
    }

    /// Owned copy of every element, in insertion order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<CanvasElement> {
        self.elements.clone()
    }

    /// Return all elements sorted by `z_index` for paint order. Ties keep
    /// insertion order.
    #[must_use]
    pub fn sorted_elements(&self) -> Vec<&CanvasElement> {
        let mut els: Vec<&CanvasElement> = self.elements.iter().collect();
        els.sort_by_key(|e| e.z_index);
        els
    }

    /// Highest `z_index` currently present, if any.
    #[must_use]
    pub fn max_z_index(&self) -> Option<i64> {
        self.elements.iter().map(|e| e.z_index).max()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CanvasElement> {
        self.elements.iter()
    }

    /// Number of elements currently in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns `true` if the store contains no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}
