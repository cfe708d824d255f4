//! Input model: modifier keys, mouse buttons, UI flags, and the gesture state machine.
//!
//! `Modifiers` and `Button` capture the user's intent at the time of a
//! pointer event. `InputState` is the active gesture being tracked between
//! pointer-down and pointer-up, carrying all context needed to compute
//! per-frame geometry and to commit the result on release.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use serde::Serialize;

use crate::camera::Point;
use crate::crop::CropBox;
use crate::doc::ElementId;
use crate::geometry::Rect;
use crate::hit::ResizeAnchor;

/// Keyboard/mouse modifier keys held during an event.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default)]
pub struct Modifiers {
    /// Shift key is held.
    pub shift: bool,
    /// Ctrl key is held.
    pub ctrl: bool,
    /// Alt / Option key is held.
    pub alt: bool,
    /// Meta / Command key is held.
    pub meta: bool,
}

impl Modifiers {
    /// Ctrl on most platforms, Command on macOS.
    #[must_use]
    pub fn command(self) -> bool {
        self.ctrl || self.meta
    }
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    /// Left mouse button (or single-finger tap).
    Primary,
    /// Middle mouse button (scroll wheel click).
    Middle,
    /// Right mouse button (or two-finger tap).
    Secondary,
}

/// A keyboard key.
///
/// The inner string holds the key name as reported by the browser (e.g. `"Delete"`, `"ArrowUp"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key(pub String);

/// What a notice is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    BackgroundRemovalFailed,
    CropFailed,
}

/// A dismissible, non-fatal message for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

/// Persistent UI state visible to the renderer.
#[derive(Debug, Clone, Default)]
pub struct UiState {
    /// The element being transformed has no overlap with the design area.
    pub out_of_bounds: bool,
    /// A vertical guide through the design-area center is shown.
    pub guide_v: bool,
    /// A horizontal guide through the design-area center is shown.
    pub guide_h: bool,
    /// Pending user notifications, oldest first.
    pub notices: Vec<Notice>,
}

impl UiState {
    /// Reset the transient gesture indicators.
    pub fn clear_gesture_flags(&mut self) {
        self.out_of_bounds = false;
        self.guide_v = false;
        self.guide_h = false;
    }
}

/// Internal state for the input state machine.
///
/// Each active variant carries gesture context needed to compute deltas and
/// commit on pointer-up. Element gestures are measured against the geometry
/// captured at pointer-down, so every frame is computed from the start
/// state rather than accumulated.
#[derive(Debug, Clone, Default)]
pub enum InputState {
    /// No gesture in progress; waiting for the next pointer-down.
    #[default]
    Idle,
    /// The user is moving an element.
    DraggingElement {
        /// Id of the element being dragged.
        id: ElementId,
        /// Design-area pointer position at pointer-down.
        start: Point,
        /// Element top-left at pointer-down.
        orig: Point,
    },
    /// The user is resizing an element by one of its eight handles.
    ResizingElement {
        /// Id of the element being resized.
        id: ElementId,
        /// Which corner/edge handle is being dragged.
        anchor: ResizeAnchor,
        /// Design-area pointer position at pointer-down.
        start: Point,
        /// Element bounding box at pointer-down.
        orig: Rect,
        /// Aspect ratio preserved throughout the gesture.
        aspect: f64,
    },
    /// The user is rotating an element by its rotate handle.
    RotatingElement {
        /// Id of the element being rotated.
        id: ElementId,
        /// Bounding-box center at pointer-down; the rotation pivot.
        center: Point,
        /// Pointer angle in degrees at pointer-down.
        start_angle: f64,
        /// Rotation in degrees at pointer-down.
        orig_rotation: f64,
    },
    /// The user is dragging the crop box body.
    MovingCrop {
        /// Element-local pointer position at pointer-down.
        start: Point,
        /// Crop box at pointer-down.
        orig: CropBox,
    },
    /// The user is resizing the crop box by one of its handles.
    ResizingCrop {
        /// Which crop handle is being dragged.
        handle: ResizeAnchor,
        /// Element-local pointer position at pointer-down.
        start: Point,
        /// Crop box at pointer-down.
        orig: CropBox,
    },
}

impl InputState {
    /// Whether a drag/resize/rotate of an element is in progress.
    #[must_use]
    pub fn is_element_gesture(&self) -> bool {
        matches!(
            self,
            Self::DraggingElement { .. } | Self::ResizingElement { .. } | Self::RotatingElement { .. }
        )
    }
}
