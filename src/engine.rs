//! Engine: scene model operations, gesture dispatch, and async guards.
//!
//! DESIGN
//! ======
//! `EngineCore` owns both product sides, the active design area, the gesture
//! state machine, the crop session, and the single background-removal slot.
//! It has no browser dependencies so every operation is testable natively.
//! `Engine` wraps it with the canvas element and an image cache for drawing.
//!
//! Mutations come in three flavors:
//! - live gesture frames, applied without a history commit;
//! - discrete operations (toolbar, keyboard, attribute panel), which commit
//!   once when they change something;
//! - async completions (removal, image probes), which are queued while a
//!   gesture is live and committed right after the gesture's own commit.
//!
//! Guard refusals are ordinary control flow: the operation returns `false`
//! (or `None`) and logs at debug level.

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use std::collections::HashMap;
use std::mem;

use serde::Serialize;
use tracing::{debug, info, warn};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement};

use crate::assets::{encode_data_uri, sniff_mime};
use crate::camera::{Camera, Point};
use crate::catalog::{Catalog, DesignAreaConfig, Side};
use crate::config::EditorConfig;
use crate::consts::BASE_PRINT_DPI;
use crate::crop::{self, AspectPreset, CropBox, CropError, CropOutput, CropSession};
use crate::doc::{CanvasElement, ElementId, ElementKind, ElementPatch};
use crate::geometry::{Rect, is_partially_visible, pointer_angle_deg, snap_back_if_outside};
use crate::hit::{self, CropHit, HitPart, ResizeAnchor};
use crate::input::{Button, InputState, Key, Modifiers, Notice, NoticeKind, UiState};
use crate::removal::RemovalError;
use crate::render;
use crate::scene::Scene;
use crate::transform;

/// Actions returned from input handlers for the host to process.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    RenderNeeded,
    SetCursor(String),
    SelectionChanged(Option<ElementId>),
    HistoryCommitted,
}

/// Alignment targets within the design area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Right,
    Top,
    Bottom,
    CenterH,
    CenterV,
}

/// Numeric fields of the attribute panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute {
    Width,
    Height,
    Rotation,
    /// Percent of the element's current size.
    Scale,
}

/// The element a background removal is running for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RemovalTarget {
    pub side: Side,
    pub id: ElementId,
}

/// Work handed to the removal pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct RemovalJob {
    pub target: RemovalTarget,
    pub content: String,
}

/// Work handed to the crop pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct CropJob {
    pub side: Side,
    pub id: ElementId,
    pub content: String,
    /// Element size on screen, in design-area units.
    pub displayed: (f64, f64),
    pub crop: CropBox,
    pub flip_h: bool,
    pub flip_v: bool,
}

/// A mutation that arrived while a gesture was live.
#[derive(Debug, Clone)]
enum Deferred {
    Patch { side: Side, id: ElementId, patch: ElementPatch },
    Insert { side: Side, element: CanvasElement },
}

/// Crop state as presented to the host.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CropView {
    pub element_id: ElementId,
    pub crop: CropBox,
    pub preset: &'static str,
    pub error: Option<String>,
    pub applying: bool,
}

/// Read-only snapshot for presentation.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Serialize)]
pub struct SceneView {
    pub side: Side,
    pub elements: Vec<CanvasElement>,
    pub selected: Option<ElementId>,
    pub out_of_bounds: bool,
    pub guide_v: bool,
    pub guide_h: bool,
    pub crop: Option<CropView>,
    pub removing: Option<ElementId>,
    pub snap_to_grid: bool,
    pub design_area: DesignAreaConfig,
    pub color: Option<String>,
    pub can_undo: bool,
    pub can_redo: bool,
    pub notices: Vec<Notice>,
}

/// Core engine state: every rule that does not need the canvas element.
///
/// Separated from `Engine` so it can be tested without WASM/browser dependencies.
pub struct EngineCore {
    pub config: EditorConfig,
    pub camera: Camera,
    pub ui: UiState,
    pub input: InputState,
    front: Scene,
    back: Scene,
    side: Side,
    front_area: DesignAreaConfig,
    back_area: DesignAreaConfig,
    color: Option<String>,
    snap_to_grid: bool,
    crop: Option<CropSession>,
    removing: Option<RemovalTarget>,
    deferred: Vec<Deferred>,
}

impl Default for EngineCore {
    fn default() -> Self {
        Self::with_config(EditorConfig::default())
    }
}

impl EngineCore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(config: EditorConfig) -> Self {
        Self {
            config,
            camera: Camera::default(),
            ui: UiState::default(),
            input: InputState::default(),
            front: Scene::new(),
            back: Scene::new(),
            side: Side::Front,
            front_area: DesignAreaConfig::default(),
            back_area: DesignAreaConfig { side: Side::Back, ..DesignAreaConfig::default() },
            color: None,
            snap_to_grid: false,
            crop: None,
            removing: None,
            deferred: Vec::new(),
        }
    }

    // --- Scenes and areas ---

    #[must_use]
    pub fn side(&self) -> Side {
        self.side
    }

    #[must_use]
    pub fn scene(&self) -> &Scene {
        self.scene_on(self.side)
    }

    #[must_use]
    pub fn scene_on(&self, side: Side) -> &Scene {
        match side {
            Side::Front => &self.front,
            Side::Back => &self.back,
        }
    }

    fn scene_mut(&mut self) -> &mut Scene {
        self.scene_on_mut(self.side)
    }

    fn scene_on_mut(&mut self, side: Side) -> &mut Scene {
        match side {
            Side::Front => &mut self.front,
            Side::Back => &mut self.back,
        }
    }

    /// The active side's design area.
    #[must_use]
    pub fn design_area(&self) -> &DesignAreaConfig {
        match self.side {
            Side::Front => &self.front_area,
            Side::Back => &self.back_area,
        }
    }

    fn area_rect(&self) -> Rect {
        self.design_area().local_rect()
    }

    /// Install the design area for the side named in `config`.
    pub fn set_design_area(&mut self, config: DesignAreaConfig) {
        match config.side {
            Side::Front => self.front_area = config,
            Side::Back => self.back_area = config,
        }
        if self.color.as_deref().is_some_and(|id| self.design_area().color(id).is_none()) {
            self.color = None;
        }
    }

    /// Activate a product's design areas. Products without a back area
    /// reuse the front geometry for the back.
    pub fn select_product(&mut self, catalog: &Catalog, product_id: &str) -> bool {
        let Some(product) = catalog.product(product_id) else {
            debug!(product_id, "unknown product");
            return false;
        };
        let Some(front) = product.area(Side::Front).cloned() else {
            debug!(product_id, "product has no front design area");
            return false;
        };
        let back = product
            .area(Side::Back)
            .cloned()
            .unwrap_or_else(|| DesignAreaConfig { side: Side::Back, ..front.clone() });

        self.leave_modes();
        self.flush_deferred();
        self.scene_mut().select(None);
        self.color = front.colors.first().map(|c| c.id.clone());
        self.front_area = front;
        self.back_area = back;
        info!(product_id, "product selected");
        true
    }

    /// Switch the active product side. Clears the selection.
    pub fn switch_side(&mut self, side: Side) -> bool {
        if side == self.side {
            return false;
        }
        self.leave_modes();
        self.flush_deferred();
        self.scene_mut().select(None);
        self.side = side;
        self.scene_mut().select(None);
        info!(side = ?side, "side switched");
        true
    }

    /// Choose a product color offered by the active design area.
    pub fn select_color(&mut self, color_id: &str) -> bool {
        if self.design_area().color(color_id).is_none() {
            debug!(color_id, "color not offered by design area");
            return false;
        }
        self.color = Some(color_id.to_string());
        true
    }

    #[must_use]
    pub fn color(&self) -> Option<&str> {
        self.color.as_deref()
    }

    // --- Queries ---

    /// Elements of the active side in paint order.
    #[must_use]
    pub fn elements(&self) -> Vec<&CanvasElement> {
        self.scene().doc.sorted_elements()
    }

    #[must_use]
    pub fn element(&self, id: &ElementId) -> Option<&CanvasElement> {
        self.scene().doc.get(id)
    }

    #[must_use]
    pub fn selected_element(&self) -> Option<&CanvasElement> {
        self.scene().selected_element()
    }

    #[must_use]
    pub fn selection(&self) -> Option<ElementId> {
        self.scene().selected()
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.scene().can_undo()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.scene().can_redo()
    }

    #[must_use]
    pub fn is_out_of_bounds(&self) -> bool {
        self.ui.out_of_bounds
    }

    #[must_use]
    pub fn is_cropping(&self) -> bool {
        self.crop.is_some()
    }

    #[must_use]
    pub fn crop_session(&self) -> Option<&CropSession> {
        self.crop.as_ref()
    }

    #[must_use]
    pub fn crop_box(&self) -> Option<CropBox> {
        self.crop.as_ref().map(|s| s.crop)
    }

    #[must_use]
    pub fn removing(&self) -> Option<RemovalTarget> {
        self.removing
    }

    /// The element on the active side whose background is being removed.
    #[must_use]
    pub fn removing_id(&self) -> Option<ElementId> {
        self.removing.filter(|t| t.side == self.side).map(|t| t.id)
    }

    #[must_use]
    pub fn snap_to_grid(&self) -> bool {
        self.snap_to_grid
    }

    #[must_use]
    pub fn notices(&self) -> &[Notice] {
        &self.ui.notices
    }

    /// Approximate print resolution of an element relative to the design area.
    #[must_use]
    pub fn effective_dpi(&self, id: &ElementId) -> Option<f64> {
        let el = self.element(id)?;
        let area = self.area_rect();
        if area.width <= 0.0 || area.height <= 0.0 {
            return None;
        }
        let factor = (el.width / area.width).min(el.height / area.height);
        Some((BASE_PRINT_DPI * factor * 10.0).round() / 10.0)
    }

    /// Snapshot of everything the presentation layer draws.
    #[must_use]
    pub fn view(&self) -> SceneView {
        SceneView {
            side: self.side,
            elements: self.elements().into_iter().cloned().collect(),
            selected: self.selection(),
            out_of_bounds: self.ui.out_of_bounds,
            guide_v: self.ui.guide_v,
            guide_h: self.ui.guide_h,
            crop: self.crop.as_ref().map(|s| CropView {
                element_id: s.element_id,
                crop: s.crop,
                preset: s.preset.label(),
                error: s.error.clone(),
                applying: s.applying,
            }),
            removing: self.removing_id(),
            snap_to_grid: self.snap_to_grid,
            design_area: self.design_area().clone(),
            color: self.color.clone(),
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
            notices: self.ui.notices.clone(),
        }
    }

    // --- Guards ---

    fn is_busy(&self, id: ElementId) -> bool {
        self.removing.is_some_and(|t| t.side == self.side && t.id == id)
    }

    fn is_cropping_element(&self, id: ElementId) -> bool {
        self.crop.as_ref().is_some_and(|s| s.element_id == id)
    }

    fn gesture_live(&self) -> bool {
        self.input.is_element_gesture()
    }

    /// The selected element if discrete edits may touch it.
    fn selected_editable(&self) -> Option<CanvasElement> {
        if self.gesture_live() {
            debug!("edit refused: gesture in progress");
            return None;
        }
        let el = self.selected_element()?;
        if el.locked {
            debug!(id = %el.id, "edit refused: element locked");
            return None;
        }
        Some(el.clone())
    }

    // --- Commits ---

    fn commit(&mut self) {
        self.scene_mut().commit();
    }

    /// Apply `patch` and commit, unless it changes nothing.
    fn update_committed(&mut self, id: ElementId, patch: &ElementPatch) -> bool {
        let Some(before) = self.element(&id).cloned() else {
            return false;
        };
        self.scene_mut().doc.apply_patch(&id, patch);
        if self.element(&id) == Some(&before) {
            return false;
        }
        self.commit();
        true
    }

    fn insert_and_select(&mut self, side: Side, element: CanvasElement) {
        let id = element.id;
        let scene = self.scene_on_mut(side);
        scene.doc.insert(element);
        scene.select(Some(id));
        scene.commit();
    }

    /// Apply and commit everything that was held back during a gesture.
    fn flush_deferred(&mut self) {
        for item in mem::take(&mut self.deferred) {
            match item {
                Deferred::Patch { side, id, patch } => {
                    let scene = self.scene_on_mut(side);
                    if scene.doc.apply_patch(&id, &patch) {
                        scene.commit();
                    } else {
                        debug!(%id, "deferred update dropped: element gone");
                    }
                }
                Deferred::Insert { side, element } => self.insert_and_select(side, element),
            }
        }
    }

    /// Abandon any live gesture, dropping its uncommitted geometry. Work
    /// queued during the gesture stays queued; callers flush it once their
    /// own change is in place.
    fn abandon_gesture(&mut self) {
        if mem::take(&mut self.input).is_element_gesture() {
            self.scene_mut().revert();
        }
        self.ui.clear_gesture_flags();
    }

    fn leave_modes(&mut self) {
        self.abandon_gesture();
        self.cancel_cropping();
    }

    // --- Scene model ---

    /// Seed a side with elements; that state becomes its undo floor.
    pub fn seed(&mut self, side: Side, elements: Vec<CanvasElement>) {
        self.scene_on_mut(side).seed(elements);
    }

    /// Place the initial image of a session, centered on the active side, as
    /// the undo floor.
    pub fn load_default_image(&mut self, content: impl Into<String>, natural: Option<(u32, u32)>) -> ElementId {
        let element = self.build_element(ElementKind::Image, content.into(), None, natural);
        let id = element.id;
        self.scene_mut().seed(vec![element]);
        id
    }

    fn build_element(
        &mut self,
        kind: ElementKind,
        content: String,
        drop: Option<Point>,
        natural: Option<(u32, u32)>,
    ) -> CanvasElement {
        let (width, height) = match kind {
            ElementKind::Image => {
                let (nw, nh) = natural
                    .filter(|(w, h)| *w > 0 && *h > 0)
                    .unwrap_or(self.config.fallback_image_size);
                let aspect = f64::from(nw) / f64::from(nh);
                (self.config.default_image_width, self.config.default_image_width / aspect)
            }
            ElementKind::Text => self.config.default_text_size,
        };

        let area = self.area_rect();
        let pos = match drop {
            Some(p) => snap_back_if_outside(&Rect::new(p.x, p.y, width, height), &area, self.config.snap_back_inset),
            None => Point::new((area.width - width) / 2.0, (area.height - height) / 2.0),
        };
        let z = self.scene_mut().next_z_index();
        CanvasElement::new(kind, content, Rect::new(pos.x, pos.y, width, height), z)
    }

    /// Insert a new element, select it, and commit.
    ///
    /// Images are sized from their natural dimensions (`None` when the probe
    /// failed). Without a drop position the element is centered; a drop
    /// position is pulled back if it would leave the element stranded.
    pub fn add_element(
        &mut self,
        kind: ElementKind,
        content: impl Into<String>,
        drop: Option<Point>,
        natural: Option<(u32, u32)>,
    ) -> ElementId {
        let element = self.build_element(kind, content.into(), drop, natural);
        let id = element.id;
        if self.gesture_live() {
            debug!(%id, "gesture in progress; deferring insert");
            self.deferred.push(Deferred::Insert { side: self.side, element });
            return id;
        }
        self.cancel_cropping();
        self.insert_and_select(self.side, element);
        info!(%id, kind = ?kind, "element added");
        id
    }

    /// Live update without a history entry. Locked elements refuse changes
    /// to geometry and flips.
    pub fn update_element(&mut self, id: &ElementId, patch: &ElementPatch) -> bool {
        let Some(el) = self.element(id) else {
            return false;
        };
        if el.locked && (patch.touches_geometry() || patch.flip_h.is_some() || patch.flip_v.is_some()) {
            debug!(%id, "update refused: element locked");
            return false;
        }
        self.scene_mut().doc.apply_patch(id, patch)
    }

    /// Update and commit.
    pub fn update_element_with_history(&mut self, id: &ElementId, patch: &ElementPatch) -> bool {
        if self.gesture_live() {
            debug!(%id, "update refused: gesture in progress");
            return false;
        }
        if !self.update_element(id, patch) {
            return false;
        }
        self.commit();
        true
    }

    /// Remove an element and commit with no selection.
    ///
    /// Refused while the element is locked or has a background removal in
    /// flight. Deleting the element being cropped ends crop mode first.
    pub fn delete_element(&mut self, id: &ElementId) -> bool {
        if self.gesture_live() {
            return false;
        }
        let Some(el) = self.element(id) else {
            return false;
        };
        if el.locked {
            debug!(%id, "delete refused: element locked");
            return false;
        }
        if self.is_busy(*id) {
            debug!(%id, "delete refused: background removal in flight");
            return false;
        }
        if self.is_cropping_element(*id) {
            self.cancel_cropping();
        }

        let scene = self.scene_mut();
        scene.doc.remove(id);
        scene.select(None);
        scene.commit();
        info!(%id, "element deleted");
        true
    }

    /// Select an element (or clear the selection). Selecting a different
    /// element ends crop mode.
    pub fn select(&mut self, id: Option<ElementId>) -> bool {
        let before = self.selection();
        if self.crop.as_ref().is_some_and(|s| Some(s.element_id) != id) {
            self.cancel_cropping();
        }
        self.scene_mut().select(id);
        self.selection() != before
    }

    pub fn clear_selection(&mut self) -> bool {
        self.select(None)
    }

    /// Raise an element above everything else without committing.
    pub fn bring_to_front(&mut self, id: &ElementId) -> bool {
        let Some(z) = self.element(id).map(|e| e.z_index) else {
            return false;
        };
        if self.scene().doc.iter().all(|e| e.id == *id || e.z_index < z) {
            return false;
        }
        let scene = self.scene_mut();
        let next = scene.next_z_index();
        scene.doc.apply_patch(id, &ElementPatch::new().z_index(next))
    }

    /// Move an element one step up the paint order and commit.
    pub fn bring_forward(&mut self, id: &ElementId) -> bool {
        self.reorder(id, |idx, len| (idx + 1).min(len - 1))
    }

    /// Move an element one step down the paint order and commit.
    pub fn send_backward(&mut self, id: &ElementId) -> bool {
        self.reorder(id, |idx, _| idx.saturating_sub(1))
    }

    /// Move an element to the bottom of the paint order and commit.
    pub fn send_to_back(&mut self, id: &ElementId) -> bool {
        self.reorder(id, |_, _| 0)
    }

    fn reorder(&mut self, id: &ElementId, target: impl FnOnce(usize, usize) -> usize) -> bool {
        if self.gesture_live() {
            return false;
        }
        let mut order: Vec<ElementId> = self.elements().iter().map(|e| e.id).collect();
        let Some(idx) = order.iter().position(|e| e == id) else {
            return false;
        };
        let new_idx = target(idx, order.len());
        if new_idx == idx {
            return false;
        }
        let moved = order.remove(idx);
        order.insert(new_idx, moved);

        let scene = self.scene_mut();
        for (z, el_id) in (1_i64..).zip(order.iter()) {
            scene.doc.apply_patch(el_id, &ElementPatch::new().z_index(z));
        }
        scene.commit();
        true
    }

    /// Flip the selected element's lock. Works on locked elements.
    pub fn toggle_lock(&mut self) -> bool {
        if self.gesture_live() {
            return false;
        }
        let Some(el) = self.selected_element() else {
            return false;
        };
        let (id, locked) = (el.id, el.locked);
        if !locked && self.is_cropping_element(id) {
            self.cancel_cropping();
        }
        self.update_committed(id, &ElementPatch::new().locked(!locked))
    }

    /// Show or hide an element. Hiding the selected element clears the selection.
    pub fn toggle_visibility(&mut self, id: &ElementId) -> bool {
        if self.gesture_live() {
            return false;
        }
        let Some(hidden) = self.element(id).map(|e| e.hidden) else {
            return false;
        };
        if !hidden {
            if self.is_cropping_element(*id) {
                self.cancel_cropping();
            }
            if self.selection() == Some(*id) {
                self.scene_mut().select(None);
            }
        }
        self.update_committed(*id, &ElementPatch::new().hidden(!hidden))
    }

    /// Copy the selected element, offset it, select the copy, and commit.
    pub fn duplicate_element(&mut self) -> Option<ElementId> {
        if self.gesture_live() {
            return None;
        }
        let mut copy = self.selected_element()?.clone();
        copy.id = uuid::Uuid::new_v4();
        copy.x += self.config.duplicate_offset;
        copy.y += self.config.duplicate_offset;
        copy.z_index = self.scene_mut().next_z_index();
        let id = copy.id;
        self.cancel_cropping();
        self.insert_and_select(self.side, copy);
        Some(id)
    }

    /// Move the selected element flush with an edge or center line of the design area.
    pub fn align(&mut self, alignment: Alignment) -> bool {
        let Some(el) = self.selected_editable() else {
            return false;
        };
        let area = self.area_rect();
        let patch = match alignment {
            Alignment::Left => ElementPatch::new().x(0.0),
            Alignment::Right => ElementPatch::new().x(area.width - el.width),
            Alignment::Top => ElementPatch::new().y(0.0),
            Alignment::Bottom => ElementPatch::new().y(area.height - el.height),
            Alignment::CenterH => ElementPatch::new().x((area.width - el.width) / 2.0),
            Alignment::CenterV => ElementPatch::new().y((area.height - el.height) / 2.0),
        };
        self.update_committed(el.id, &patch)
    }

    pub fn align_left(&mut self) -> bool {
        self.align(Alignment::Left)
    }

    pub fn align_right(&mut self) -> bool {
        self.align(Alignment::Right)
    }

    pub fn align_top(&mut self) -> bool {
        self.align(Alignment::Top)
    }

    pub fn align_bottom(&mut self) -> bool {
        self.align(Alignment::Bottom)
    }

    pub fn align_center_h(&mut self) -> bool {
        self.align(Alignment::CenterH)
    }

    pub fn align_center_v(&mut self) -> bool {
        self.align(Alignment::CenterV)
    }

    /// Center the selected element on both axes.
    pub fn center_element(&mut self) -> bool {
        let Some(el) = self.selected_editable() else {
            return false;
        };
        let area = self.area_rect();
        let patch = ElementPatch::new().position((area.width - el.width) / 2.0, (area.height - el.height) / 2.0);
        self.update_committed(el.id, &patch)
    }

    pub fn flip_horizontal(&mut self) -> bool {
        let Some(el) = self.selected_editable() else {
            return false;
        };
        self.update_committed(el.id, &ElementPatch::new().flip_h(!el.flip_h))
    }

    pub fn flip_vertical(&mut self) -> bool {
        let Some(el) = self.selected_editable() else {
            return false;
        };
        self.update_committed(el.id, &ElementPatch::new().flip_v(!el.flip_v))
    }

    pub fn reset_rotation(&mut self) -> bool {
        let Some(el) = self.selected_editable() else {
            return false;
        };
        self.update_committed(el.id, &ElementPatch::new().rotation(0.0))
    }

    /// Apply an attribute-panel entry to the selected element.
    ///
    /// Malformed, non-finite, or non-positive sizes are ignored. With
    /// `aspect_locked`, width and height edits keep the element's aspect ratio.
    pub fn set_attribute(&mut self, attribute: Attribute, raw: &str, aspect_locked: bool) -> bool {
        let Ok(value) = raw.trim().parse::<f64>() else {
            return false;
        };
        if !value.is_finite() {
            return false;
        }
        let Some(el) = self.selected_editable() else {
            return false;
        };
        let aspect = el.effective_aspect();

        let patch = match attribute {
            Attribute::Rotation => ElementPatch::new().rotation(value),
            _ if value <= 0.0 => return false,
            Attribute::Width if aspect_locked => ElementPatch::new().size(value, value / aspect),
            Attribute::Width => ElementPatch::new().size(value, el.height),
            Attribute::Height if aspect_locked => ElementPatch::new().size(value * aspect, value),
            Attribute::Height => ElementPatch::new().size(el.width, value),
            Attribute::Scale => {
                let factor = value / 100.0;
                ElementPatch::new().size(el.height * aspect * factor, el.height * factor)
            }
        };
        self.update_committed(el.id, &patch)
    }

    /// Swap an image's content, keeping its width and adopting the new
    /// image's aspect ratio.
    pub fn replace_image(&mut self, id: &ElementId, content: impl Into<String>, natural: Option<(u32, u32)>) -> bool {
        if self.gesture_live() {
            return false;
        }
        let Some(el) = self.element(id) else {
            return false;
        };
        if !el.is_image() || el.locked {
            return false;
        }
        if self.is_busy(*id) {
            debug!(%id, "replace refused: background removal in flight");
            return false;
        }
        let (nw, nh) = natural
            .filter(|(w, h)| *w > 0 && *h > 0)
            .unwrap_or(self.config.fallback_image_size);
        let aspect = f64::from(nw) / f64::from(nh);
        let width = el.width;
        if self.is_cropping_element(*id) {
            self.cancel_cropping();
        }
        let patch = ElementPatch::new().content(content).size(width, width / aspect).aspect_ratio(aspect);
        self.update_committed(*id, &patch)
    }

    pub fn set_snap_to_grid(&mut self, enabled: bool) {
        self.snap_to_grid = enabled;
    }

    pub fn toggle_snap_to_grid(&mut self) -> bool {
        self.snap_to_grid = !self.snap_to_grid;
        self.snap_to_grid
    }

    pub fn dismiss_notice(&mut self, index: usize) -> bool {
        if index >= self.ui.notices.len() {
            return false;
        }
        self.ui.notices.remove(index);
        true
    }

    fn notify(&mut self, kind: NoticeKind, message: String) {
        self.ui.notices.push(Notice { kind, message });
    }

    // --- History ---

    /// Step the active side back one commit. Ends crop mode and abandons any
    /// live gesture first; results that arrived during that gesture are
    /// committed on top of the undone state.
    pub fn undo(&mut self) -> bool {
        self.leave_modes();
        let undone = self.scene_mut().undo();
        self.flush_deferred();
        undone
    }

    /// Re-apply the next commit on the active side.
    pub fn redo(&mut self) -> bool {
        self.leave_modes();
        let redone = self.scene_mut().redo();
        self.flush_deferred();
        redone
    }

    // --- Crop ---

    /// Enter crop mode on the selected image.
    pub fn start_cropping(&mut self) -> bool {
        let Some(el) = self.selected_editable() else {
            return false;
        };
        if !el.is_image() || el.hidden {
            return false;
        }
        if self.is_busy(el.id) {
            debug!(id = %el.id, "crop refused: background removal in flight");
            return false;
        }
        self.crop = Some(CropSession::new(el.id, el.width, el.height));
        true
    }

    /// Leave crop mode without touching the element.
    pub fn cancel_cropping(&mut self) -> bool {
        if matches!(self.input, InputState::MovingCrop { .. } | InputState::ResizingCrop { .. }) {
            self.input = InputState::Idle;
        }
        self.crop.take().is_some()
    }

    fn crop_bounds(&self) -> Option<(f64, f64)> {
        let session = self.crop.as_ref()?;
        self.element(&session.element_id).map(|e| (e.width, e.height))
    }

    /// Reshape the crop box to a preset ratio around its center.
    pub fn set_crop_preset(&mut self, preset: AspectPreset) -> bool {
        let Some(bounds) = self.crop_bounds() else {
            return false;
        };
        let min = self.config.min_element_size;
        let Some(session) = self.crop.as_mut().filter(|s| !s.applying) else {
            return false;
        };
        if let Some(ratio) = preset.ratio() {
            let Some(reshaped) = crop::apply_ratio(&session.crop, ratio, bounds, min) else {
                debug!(preset = preset.label(), "crop preset refused: no box of that ratio fits");
                return false;
            };
            session.crop = reshaped;
        }
        session.preset = preset;
        session.error = None;
        true
    }

    pub fn set_crop_width(&mut self, width: f64) -> bool {
        self.edit_crop(|c, bounds, ratio, min| crop::set_width(c, width, bounds, ratio, min))
    }

    pub fn set_crop_height(&mut self, height: f64) -> bool {
        self.edit_crop(|c, bounds, ratio, min| crop::set_height(c, height, bounds, ratio, min))
    }

    fn edit_crop(
        &mut self,
        edit: impl FnOnce(&CropBox, (f64, f64), Option<f64>, f64) -> Option<CropBox>,
    ) -> bool {
        let Some(bounds) = self.crop_bounds() else {
            return false;
        };
        let min = self.config.min_element_size;
        let Some(session) = self.crop.as_mut().filter(|s| !s.applying) else {
            return false;
        };
        let Some(next) = edit(&session.crop, bounds, session.preset.ratio(), min) else {
            return false;
        };
        session.crop = next;
        session.error = None;
        true
    }

    /// Snapshot the crop for rasterization. Returns `None` when not cropping
    /// or an apply is already running.
    pub fn begin_apply_crop(&mut self) -> Option<CropJob> {
        let side = self.side;
        let session = self.crop.as_ref().filter(|s| !s.applying)?;
        let el = self.scene().doc.get(&session.element_id)?;
        let job = CropJob {
            side,
            id: el.id,
            content: el.content.clone(),
            displayed: (el.width, el.height),
            crop: session.crop,
            flip_h: el.flip_h,
            flip_v: el.flip_v,
        };
        if let Some(session) = self.crop.as_mut() {
            session.applying = true;
            session.error = None;
        }
        Some(job)
    }

    /// Finish a crop apply. On success the element takes the cropped image
    /// and the crop box geometry, history commits, and crop mode ends. On
    /// failure crop mode stays active with the error recorded.
    pub fn finish_apply_crop(&mut self, job: &CropJob, result: Result<CropOutput, CropError>) -> bool {
        let current = self.crop.as_ref().is_some_and(|s| s.element_id == job.id) && self.side == job.side;
        if !current {
            debug!(id = %job.id, "crop result dropped: crop mode ended");
            return false;
        }

        match result {
            Ok(output) => {
                let Some(el) = self.element(&job.id) else {
                    self.crop = None;
                    return false;
                };
                let c = job.crop;
                let patch = ElementPatch::new()
                    .content(output.data_uri)
                    .rect(Rect::new(el.x + c.x, el.y + c.y, c.width, c.height))
                    .aspect_ratio(c.width / c.height);
                self.crop = None;
                self.scene_mut().doc.apply_patch(&job.id, &patch);
                self.commit();
                info!(id = %job.id, width = output.width, height = output.height, "crop applied");
                true
            }
            Err(e) => {
                warn!(id = %job.id, error = %e, "crop apply failed");
                let message = format!("Crop failed: {e}");
                if let Some(session) = self.crop.as_mut() {
                    session.applying = false;
                    session.error = Some(message.clone());
                }
                self.notify(NoticeKind::CropFailed, message);
                false
            }
        }
    }

    // --- Background removal ---

    /// Claim the global removal slot for the selected image.
    pub fn begin_remove_background(&mut self) -> Option<RemovalJob> {
        if let Some(target) = self.removing {
            debug!(id = %target.id, "removal refused: another removal in flight");
            return None;
        }
        let el = self.selected_element()?;
        if !el.is_image() {
            return None;
        }
        if self.is_cropping_element(el.id) {
            debug!(id = %el.id, "removal refused: element is being cropped");
            return None;
        }
        let target = RemovalTarget { side: self.side, id: el.id };
        let job = RemovalJob { target, content: el.content.clone() };
        self.removing = Some(target);
        info!(id = %target.id, "background removal started");
        Some(job)
    }

    /// Release the removal slot and apply the result.
    ///
    /// Success replaces the element's content and commits, after the live
    /// gesture if one is in progress. Failure leaves the content untouched
    /// and raises a notice.
    pub fn finish_remove_background(&mut self, job: &RemovalJob, result: Result<Vec<u8>, RemovalError>) -> bool {
        if self.removing == Some(job.target) {
            self.removing = None;
        }
        let RemovalTarget { side, id } = job.target;

        let bytes = match result {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(%id, error = %e, "background removal failed");
                self.notify(NoticeKind::BackgroundRemovalFailed, format!("Background removal failed: {e}"));
                return false;
            }
        };

        if self.scene_on(side).doc.get(&id).is_none() {
            debug!(%id, "removal result dropped: element gone");
            return false;
        }
        let content = encode_data_uri(&bytes, sniff_mime(&bytes).unwrap_or("image/png"));
        let patch = ElementPatch::new().content(content);

        if self.gesture_live() {
            debug!(%id, "gesture in progress; deferring removal result");
            self.deferred.push(Deferred::Patch { side, id, patch });
            return true;
        }
        let scene = self.scene_on_mut(side);
        scene.doc.apply_patch(&id, &patch);
        scene.commit();
        info!(%id, "background removed");
        true
    }

    // --- Pointer input ---

    fn local_point(&self, screen: Point) -> Point {
        self.camera.screen_to_local(screen, self.design_area().origin())
    }

    pub fn on_pointer_down(&mut self, screen: Point, button: Button, _modifiers: Modifiers) -> Vec<Action> {
        if button != Button::Primary || !matches!(self.input, InputState::Idle) {
            return Vec::new();
        }
        let pt = self.local_point(screen);

        if let Some((id, crop, applying)) = self.crop.as_ref().map(|s| (s.element_id, s.crop, s.applying)) {
            return self.crop_pointer_down(pt, id, crop, applying);
        }

        let before = self.selection();
        let Some(hit) = hit::hit_test(pt, &self.scene().doc, self.camera.zoom, before) else {
            self.scene_mut().select(None);
            return if before.is_some() {
                vec![Action::SelectionChanged(None), Action::RenderNeeded]
            } else {
                Vec::new()
            };
        };

        let id = hit.element_id;
        self.scene_mut().select(Some(id));
        let mut actions = Vec::new();
        if before != Some(id) {
            actions.push(Action::SelectionChanged(Some(id)));
        }

        let Some(el) = self.element(&id).cloned() else {
            return actions;
        };
        if el.locked || self.is_busy(id) {
            actions.push(Action::RenderNeeded);
            return actions;
        }

        self.input = match hit.part {
            HitPart::Body => {
                self.bring_to_front(&id);
                InputState::DraggingElement { id, start: pt, orig: Point::new(el.x, el.y) }
            }
            HitPart::ResizeHandle(anchor) => {
                InputState::ResizingElement { id, anchor, start: pt, orig: el.rect(), aspect: el.effective_aspect() }
            }
            HitPart::RotateHandle => {
                let center = el.center();
                InputState::RotatingElement {
                    id,
                    center,
                    start_angle: pointer_angle_deg(center, pt),
                    orig_rotation: el.rotation,
                }
            }
        };
        actions.push(Action::SetCursor(cursor_for(hit.part).into()));
        actions.push(Action::RenderNeeded);
        actions
    }

    fn crop_pointer_down(&mut self, pt: Point, id: ElementId, crop: CropBox, applying: bool) -> Vec<Action> {
        if applying {
            return Vec::new();
        }
        let Some(el) = self.element(&id) else {
            return Vec::new();
        };
        let local = hit::to_element_local(pt, el);
        self.input = match hit::hit_test_crop(local, &crop, self.camera.zoom) {
            Some(CropHit::Body) => InputState::MovingCrop { start: local, orig: crop },
            Some(CropHit::Handle(handle)) => InputState::ResizingCrop { handle, start: local, orig: crop },
            None => return Vec::new(),
        };
        vec![Action::RenderNeeded]
    }

    pub fn on_pointer_move(&mut self, screen: Point, _modifiers: Modifiers) -> Vec<Action> {
        let pt = self.local_point(screen);
        match self.input.clone() {
            InputState::Idle => self.hover(pt),
            InputState::DraggingElement { id, start, orig } => {
                let Some(size) = self.element(&id).map(|e| (e.width, e.height)) else {
                    return Vec::new();
                };
                let frame =
                    transform::drag_frame(orig, size, start, pt, &self.area_rect(), &self.config, self.snap_to_grid);
                self.scene_mut().doc.apply_patch(&id, &ElementPatch::new().position(frame.pos.x, frame.pos.y));
                self.ui.guide_v = frame.guide_v;
                self.ui.guide_h = frame.guide_h;
                self.ui.out_of_bounds = frame.out_of_bounds;
                vec![Action::RenderNeeded]
            }
            InputState::ResizingElement { id, anchor, start, orig, aspect } => {
                let Some(rotation) = self.element(&id).map(|e| e.rotation) else {
                    return Vec::new();
                };
                let rect = transform::resize_frame(&orig, anchor, aspect, rotation, start, pt, &self.config);
                self.scene_mut().doc.apply_patch(&id, &ElementPatch::new().rect(rect));
                self.ui.out_of_bounds = !is_partially_visible(&rect, &self.area_rect());
                vec![Action::RenderNeeded]
            }
            InputState::RotatingElement { id, center, start_angle, orig_rotation } => {
                let deg = transform::rotate_frame(center, start_angle, orig_rotation, pt, &self.config);
                self.scene_mut().doc.apply_patch(&id, &ElementPatch::new().rotation(deg));
                vec![Action::RenderNeeded]
            }
            InputState::MovingCrop { start, orig } => {
                self.crop_frame(pt, |local, bounds, _, _| {
                    crop::move_box(&orig, local.x - start.x, local.y - start.y, bounds)
                })
            }
            InputState::ResizingCrop { handle, start, orig } => {
                self.crop_frame(pt, |local, bounds, ratio, min| {
                    crop::resize_box(&orig, handle, local.x - start.x, local.y - start.y, bounds, ratio, min)
                })
            }
        }
    }

    fn crop_frame(
        &mut self,
        pt: Point,
        next: impl FnOnce(Point, (f64, f64), Option<f64>, f64) -> CropBox,
    ) -> Vec<Action> {
        let min = self.config.min_element_size;
        let Some(el) = self.crop.as_ref().and_then(|s| self.element(&s.element_id)) else {
            return Vec::new();
        };
        let local = hit::to_element_local(pt, el);
        let bounds = (el.width, el.height);
        let Some(session) = self.crop.as_mut() else {
            return Vec::new();
        };
        session.crop = next(local, bounds, session.preset.ratio(), min);
        session.error = None;
        vec![Action::RenderNeeded]
    }

    fn hover(&self, pt: Point) -> Vec<Action> {
        if self.crop.is_some() {
            return Vec::new();
        }
        let cursor = hit::hit_test(pt, &self.scene().doc, self.camera.zoom, self.selection())
            .filter(|h| self.element(&h.element_id).is_some_and(|e| !e.locked))
            .map_or("default", |h| cursor_for(h.part));
        vec![Action::SetCursor(cursor.into())]
    }

    pub fn on_pointer_up(&mut self, _screen: Point, _button: Button, _modifiers: Modifiers) -> Vec<Action> {
        let input = mem::take(&mut self.input);
        let committed = match input {
            InputState::Idle => return Vec::new(),
            InputState::MovingCrop { .. } | InputState::ResizingCrop { .. } => {
                return vec![Action::RenderNeeded];
            }
            InputState::DraggingElement { id, orig, .. } => self.release_box(id, |el| Point::new(el.x, el.y) != orig),
            InputState::ResizingElement { id, orig, .. } => self.release_box(id, |el| el.rect() != orig),
            InputState::RotatingElement { id, orig_rotation, .. } => {
                let changed = self.element(&id).is_some_and(|el| (el.rotation - orig_rotation).abs() > f64::EPSILON);
                if changed {
                    self.commit();
                }
                changed
            }
        };

        self.ui.clear_gesture_flags();
        self.flush_deferred();

        let mut actions = vec![Action::SetCursor("default".into()), Action::RenderNeeded];
        if committed {
            actions.push(Action::HistoryCommitted);
        }
        actions
    }

    /// Snap a dragged or resized element back inside the area and commit.
    fn release_box(&mut self, id: ElementId, changed: impl FnOnce(&CanvasElement) -> bool) -> bool {
        let Some(el) = self.element(&id).cloned() else {
            return false;
        };
        if !changed(&el) {
            return false;
        }
        let pos = transform::release_position(&el.rect(), &self.area_rect(), &self.config);
        let patch = ElementPatch::new().position(pos.x, pos.y).aspect_ratio(el.width / el.height);
        self.scene_mut().doc.apply_patch(&id, &patch);
        self.commit();
        true
    }

    // --- Keyboard input ---

    pub fn on_key_down(&mut self, key: Key, modifiers: Modifiers) -> Vec<Action> {
        let handled = match key.0.as_str() {
            "Escape" => {
                if self.gesture_live() {
                    self.abandon_gesture();
                    self.flush_deferred();
                    true
                } else if self.cancel_cropping() {
                    true
                } else {
                    self.clear_selection()
                }
            }
            "z" | "Z" if modifiers.command() => {
                if modifiers.shift {
                    self.redo()
                } else {
                    self.undo()
                }
            }
            "y" | "Y" if modifiers.command() => self.redo(),
            "Delete" | "Backspace" => match self.selection() {
                Some(id) if self.crop.is_none() => self.delete_element(&id),
                _ => false,
            },
            "ArrowUp" | "ArrowDown" | "ArrowLeft" | "ArrowRight" => self.nudge(key.0.as_str(), modifiers.shift),
            _ => false,
        };
        if handled { vec![Action::RenderNeeded] } else { Vec::new() }
    }

    fn nudge(&mut self, key: &str, large: bool) -> bool {
        if self.crop.is_some() {
            return false;
        }
        let Some(el) = self.selected_editable() else {
            return false;
        };
        let step = if large { self.config.nudge_step_large } else { self.config.nudge_step };
        let (dx, dy) = match key {
            "ArrowUp" => (0.0, -step),
            "ArrowDown" => (0.0, step),
            "ArrowLeft" => (-step, 0.0),
            _ => (step, 0.0),
        };
        let pos = transform::nudge_position(&el.rect(), dx, dy, &self.area_rect(), &self.config, self.snap_to_grid);
        self.update_committed(el.id, &ElementPatch::new().position(pos.x, pos.y))
    }
}

fn cursor_for(part: HitPart) -> &'static str {
    match part {
        HitPart::Body => "move",
        HitPart::RotateHandle => "grab",
        HitPart::ResizeHandle(ResizeAnchor::N | ResizeAnchor::S) => "ns-resize",
        HitPart::ResizeHandle(ResizeAnchor::E | ResizeAnchor::W) => "ew-resize",
        HitPart::ResizeHandle(ResizeAnchor::Nw | ResizeAnchor::Se) => "nwse-resize",
        HitPart::ResizeHandle(ResizeAnchor::Ne | ResizeAnchor::Sw) => "nesw-resize",
    }
}

/// Decoded images keyed by element content.
pub type ImageCache = HashMap<String, HtmlImageElement>;

/// The full canvas engine. Wraps `EngineCore` and owns the browser canvas element.
pub struct Engine {
    canvas: HtmlCanvasElement,
    images: ImageCache,
    pub core: EngineCore,
    pub dpr: f64,
}

impl Engine {
    /// Create a new engine bound to the given canvas element.
    #[must_use]
    pub fn new(canvas: HtmlCanvasElement) -> Self {
        Self { canvas, images: ImageCache::new(), core: EngineCore::new(), dpr: 1.0 }
    }

    // --- Input events ---

    pub fn on_pointer_down(&mut self, screen: Point, button: Button, modifiers: Modifiers) -> Vec<Action> {
        self.core.on_pointer_down(screen, button, modifiers)
    }

    pub fn on_pointer_move(&mut self, screen: Point, modifiers: Modifiers) -> Vec<Action> {
        self.core.on_pointer_move(screen, modifiers)
    }

    pub fn on_pointer_up(&mut self, screen: Point, button: Button, modifiers: Modifiers) -> Vec<Action> {
        self.core.on_pointer_up(screen, button, modifiers)
    }

    pub fn on_key_down(&mut self, key: Key, modifiers: Modifiers) -> Vec<Action> {
        self.core.on_key_down(key, modifiers)
    }

    // --- Render ---

    /// Start decoding any image content not yet in the cache and forget
    /// content no element uses any more.
    fn sync_images(&mut self) -> Result<(), JsValue> {
        let mut wanted: Vec<String> = [Side::Front, Side::Back]
            .into_iter()
            .flat_map(|side| self.core.scene_on(side).doc.iter())
            .filter(|el| el.is_image())
            .map(|el| el.content.clone())
            .collect();
        let background = &self.core.design_area().background;
        if !background.is_empty() {
            wanted.push(background.clone());
        }
        self.images.retain(|content, _| wanted.contains(content));
        for content in wanted {
            if !self.images.contains_key(&content) {
                let img = HtmlImageElement::new()?;
                img.set_cross_origin(Some("anonymous"));
                img.set_src(&content);
                self.images.insert(content, img);
            }
        }
        Ok(())
    }

    /// Draw the current state to the canvas.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the 2D context is unavailable or a draw call fails.
    pub fn render(&mut self) -> Result<(), JsValue> {
        self.sync_images()?;
        let ctx = self
            .canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("2d context unavailable"))?
            .dyn_into::<CanvasRenderingContext2d>()?;
        let width = f64::from(self.canvas.width()) / self.dpr;
        let height = f64::from(self.canvas.height()) / self.dpr;
        render::draw(&ctx, &self.core, &self.images, width, height, self.dpr)
    }
}
